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

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use snafu::{OptionExt, ResultExt};
use tantivy::schema::{
    IndexRecordOption, JsonObjectOptions, Schema, TextFieldIndexing, FAST, INDEXED,
};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, TextAnalyzer};
use tantivy::{Index, SingleSegmentIndexWriter, TantivyDocument};

use crate::document_index::error::{
    FinishedSnafu, IoSnafu, Result, TantivyDocSnafu, TantivySnafu,
};
use crate::document_index::{Analyzer, Config};

/// Field holding the originating row id of each document.
pub const ROWID_FIELD_NAME: &str = "__rowid";

/// Json field holding the decoded object fields of each document.
pub const DATA_FIELD_NAME: &str = "__data";

/// Name the per-index tokenizer is registered under.
pub(crate) const INDEX_TOKENIZER_NAME: &str = "index_tokenizer";

const MIN_MEMORY_LIMIT: usize = 15_000_000;
const MAX_MEMORY_LIMIT: usize = 4_000_000_000;

/// `DocumentIndexCreator` builds the document index of one complex column.
#[mockall::automock]
#[async_trait]
pub trait DocumentIndexCreator: Send {
    /// Pushes the decoded fields of the next row. Rows arrive in row order;
    /// the engine-local document id therefore equals the row id.
    async fn push(&mut self, fields: &Map<String, Value>) -> Result<()>;

    /// Finalizes the index on disk.
    async fn finish(&mut self) -> Result<()>;

    /// Drops all state and removes the partially built index.
    async fn abort(&mut self) -> Result<()>;
}

/// Tantivy-backed document index creator writing a single-segment index
/// directory.
pub struct TantivyDocumentIndexCreator {
    writer: Option<SingleSegmentIndexWriter>,
    schema: Schema,
    path: PathBuf,
    next_rowid: u64,
}

impl TantivyDocumentIndexCreator {
    pub async fn new(
        path: impl AsRef<Path>,
        config: Config,
        memory_limit: usize,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&path).await.context(IoSnafu)?;

        let mut schema_builder = Schema::builder();
        schema_builder.add_u64_field(ROWID_FIELD_NAME, FAST | INDEXED);
        let data_options = JsonObjectOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(INDEX_TOKENIZER_NAME)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        );
        schema_builder.add_json_field(DATA_FIELD_NAME, data_options);
        let schema = schema_builder.build();

        let index = Index::create_in_dir(&path, schema.clone()).context(TantivySnafu)?;
        index
            .tokenizers()
            .register(INDEX_TOKENIZER_NAME, build_tokenizer(&config));

        let memory_limit = memory_limit.clamp(MIN_MEMORY_LIMIT, MAX_MEMORY_LIMIT);
        let writer = SingleSegmentIndexWriter::new(index, memory_limit).context(TantivySnafu)?;

        Ok(Self {
            writer: Some(writer),
            schema,
            path,
            next_rowid: 0,
        })
    }
}

#[async_trait]
impl DocumentIndexCreator for TantivyDocumentIndexCreator {
    async fn push(&mut self, fields: &Map<String, Value>) -> Result<()> {
        let writer = self.writer.as_mut().context(FinishedSnafu)?;

        let json = serde_json::json!({
            ROWID_FIELD_NAME: self.next_rowid,
            DATA_FIELD_NAME: fields,
        });
        let doc = TantivyDocument::parse_json(&self.schema, &json.to_string())
            .context(TantivyDocSnafu)?;
        writer.add_document(doc).context(TantivySnafu)?;

        self.next_rowid += 1;
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        let writer = self.writer.take().context(FinishedSnafu)?;
        writer.finalize().context(TantivySnafu)?;
        Ok(())
    }

    async fn abort(&mut self) -> Result<()> {
        if self.writer.take().is_some() {
            tokio::fs::remove_dir_all(&self.path).await.context(IoSnafu)?;
        }
        Ok(())
    }
}

/// Builds the tokenizer matching the index config. The searcher registers
/// the same tokenizer when reopening the index.
pub(crate) fn build_tokenizer(config: &Config) -> TextAnalyzer {
    let mut builder = match config.analyzer {
        Analyzer::English => TextAnalyzer::builder(SimpleTokenizer::default()).dynamic(),
        Analyzer::Chinese => TextAnalyzer::builder(tantivy_jieba::JiebaTokenizer {}).dynamic(),
    };
    if !config.case_sensitive {
        builder = builder.filter_dynamic(LowerCaser);
    }
    builder.build()
}
