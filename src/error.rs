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

use std::path::PathBuf;

use snafu::{Location, Snafu};

use crate::directory::IndexType;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Failed to operate on build marker, path: {}", path.display()))]
    MarkerIo {
        path: PathBuf,
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to access segment directory, path: {}", path.display()))]
    DirectoryIo {
        path: PathBuf,
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Index {index_type:?} not found for column {column}"))]
    IndexNotFound {
        column: String,
        index_type: IndexType,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Corrupted consolidated index file: {reason}"))]
    CorruptedConsolidatedFile {
        reason: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to archive index directory, path: {}", path.display()))]
    Archive {
        path: PathBuf,
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to read forward index of column {column}"))]
    ReadForwardIndex {
        column: String,
        source: crate::forward_index::error::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to build bitmap posting index for column {column}"))]
    BuildPostingIndex {
        column: String,
        source: crate::inverted_index::error::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to build document index for column {column}"))]
    BuildDocumentIndex {
        column: String,
        source: crate::document_index::error::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display(
        "Multi-valued columns are not supported for complex object types, column: {column}"
    ))]
    MultiValueObjectColumn {
        column: String,
        #[snafu(implicit)]
        location: Location,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
