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

use crate::DictId;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("IO error"))]
    CommonIo {
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to operate on intermediate file, path: {}", path.display()))]
    TempFile {
        path: PathBuf,
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Unexpected intermediate file magic: {actual:?}"))]
    InvalidIntermediateMagic {
        actual: Vec<u8>,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Dictionary id {dict_id} out of bounds, cardinality: {cardinality}"))]
    DictIdOutOfBounds {
        dict_id: DictId,
        cardinality: u32,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Posting stream yielded dictionary id {dict_id} out of order"))]
    OutOfOrderPosting {
        dict_id: DictId,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Invalid posting file: {reason}"))]
    InvalidPostingFile {
        reason: String,
        #[snafu(implicit)]
        location: Location,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
