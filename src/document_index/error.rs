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

use snafu::{Location, Snafu};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("IO error"))]
    Io {
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Tantivy error"))]
    Tantivy {
        source: tantivy::TantivyError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Tantivy parser error"))]
    TantivyParser {
        source: tantivy::query::QueryParserError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Tantivy document error"))]
    TantivyDoc {
        source: tantivy::schema::DocParsingError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Operate on a finished creator"))]
    Finished {
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("No decoder registered for object type {object_type:?}"))]
    DecoderNotFound {
        object_type: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to decode object value: {reason}"))]
    DecodeObject {
        reason: String,
        #[snafu(implicit)]
        location: Location,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
