// Copyright 2023 Greptime Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Object types and the decoders turning raw column bytes into field maps.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use snafu::{ensure, OptionExt};

use crate::document_index::error::{DecodeObjectSnafu, DecoderNotFoundSnafu, Result};

/// Key under which a plain text value is indexed.
pub const TEXT_KEY: &str = "text";

/// Declared type of a complex column, resolved to a decoder before any
/// index state is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectType {
    /// Flat string-to-scalar map, serialized as a JSON object.
    Map,

    /// Arbitrarily nested document, serialized as a JSON object.
    Document,

    /// Plain UTF-8 text.
    Text,

    /// An application-registered type.
    Custom(String),
}

impl ObjectType {
    /// Parses a metadata type tag, case-insensitively. Unrecognized tags
    /// become [`ObjectType::Custom`] and resolve only if a decoder was
    /// registered under that name.
    pub fn parse(tag: &str) -> ObjectType {
        match tag.to_ascii_lowercase().as_str() {
            "map" => ObjectType::Map,
            "document" | "json" => ObjectType::Document,
            "text" => ObjectType::Text,
            _ => ObjectType::Custom(tag.to_string()),
        }
    }
}

/// Decodes one raw column value into the field map handed to the
/// document-indexing engine.
pub trait ObjectDecoder: Send + Sync {
    fn decode(&self, raw: &[u8]) -> Result<Map<String, Value>>;
}

/// Decoder for [`ObjectType::Map`]: a JSON object with scalar values only.
pub struct MapObjectDecoder;

impl ObjectDecoder for MapObjectDecoder {
    fn decode(&self, raw: &[u8]) -> Result<Map<String, Value>> {
        let map = parse_json_object(raw)?;
        ensure!(
            map.values().all(|v| !matches!(v, Value::Object(_) | Value::Array(_))),
            DecodeObjectSnafu {
                reason: "map value must be a scalar",
            }
        );
        Ok(map)
    }
}

/// Decoder for [`ObjectType::Document`]: any JSON object.
pub struct DocumentObjectDecoder;

impl ObjectDecoder for DocumentObjectDecoder {
    fn decode(&self, raw: &[u8]) -> Result<Map<String, Value>> {
        parse_json_object(raw)
    }
}

/// Decoder for [`ObjectType::Text`]: UTF-8 bytes indexed under
/// [`TEXT_KEY`].
pub struct TextObjectDecoder;

impl ObjectDecoder for TextObjectDecoder {
    fn decode(&self, raw: &[u8]) -> Result<Map<String, Value>> {
        let text = std::str::from_utf8(raw).map_err(|e| {
            DecodeObjectSnafu {
                reason: format!("invalid utf-8 text: {e}"),
            }
            .build()
        })?;
        let mut map = Map::with_capacity(1);
        map.insert(TEXT_KEY.to_string(), Value::String(text.to_string()));
        Ok(map)
    }
}

fn parse_json_object(raw: &[u8]) -> Result<Map<String, Value>> {
    match serde_json::from_slice(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => DecodeObjectSnafu {
            reason: format!("expected a JSON object, got {other}"),
        }
        .fail(),
        Err(e) => DecodeObjectSnafu {
            reason: format!("invalid JSON: {e}"),
        }
        .fail(),
    }
}

/// Maps object types to decoders. Ships the built-in decoders; custom
/// types are registered by the application.
pub struct DecoderRegistry {
    decoders: HashMap<ObjectType, Arc<dyn ObjectDecoder>>,
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        let mut decoders: HashMap<ObjectType, Arc<dyn ObjectDecoder>> = HashMap::new();
        decoders.insert(ObjectType::Map, Arc::new(MapObjectDecoder));
        decoders.insert(ObjectType::Document, Arc::new(DocumentObjectDecoder));
        decoders.insert(ObjectType::Text, Arc::new(TextObjectDecoder));
        Self { decoders }
    }
}

impl DecoderRegistry {
    pub fn register(&mut self, object_type: ObjectType, decoder: Arc<dyn ObjectDecoder>) {
        self.decoders.insert(object_type, decoder);
    }

    pub fn resolve(&self, object_type: &ObjectType) -> Result<Arc<dyn ObjectDecoder>> {
        self.decoders
            .get(object_type)
            .cloned()
            .context(DecoderNotFoundSnafu {
                object_type: format!("{object_type:?}"),
            })
    }
}
