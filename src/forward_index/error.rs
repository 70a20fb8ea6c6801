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
    #[snafu(display(
        "Forward index buffer too small, expected at least {expected} bytes, got {actual}"
    ))]
    TruncatedBuffer {
        expected: usize,
        actual: usize,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Row {row} out of bounds, total docs: {total_docs}"))]
    RowOutOfBounds {
        row: u32,
        total_docs: u32,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Invalid bit width {bits}, expected 1..=32"))]
    InvalidBitWidth {
        bits: u32,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Row {row} holds {count} values, caller buffer holds {capacity}"))]
    BufferTooSmall {
        row: u32,
        count: u32,
        capacity: usize,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Invalid forward index header: {reason}"))]
    InvalidHeader {
        reason: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Non-sequential read of row {requested}, expected row {expected}"))]
    NonSequentialRead {
        requested: u32,
        expected: u32,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Unsupported forward index encoding: {reason}"))]
    UnsupportedEncoding {
        reason: String,
        #[snafu(implicit)]
        location: Location,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
