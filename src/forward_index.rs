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

//! Row-indexed access to a column's physical forward index.
//!
//! The physical layout is selected once from column metadata, never by
//! inspecting bytes. The only access pattern this subsystem needs is a
//! monotonically increasing scan over rows `0..total_docs`.

pub mod error;
mod fixed_bit;
mod multi_value;
pub(crate) mod var_chunk;

use bytes::Bytes;

pub use crate::forward_index::fixed_bit::FixedBitReader;
pub use crate::forward_index::multi_value::FixedBitMultiValueReader;
pub use crate::forward_index::var_chunk::VarChunkReader;

use crate::forward_index::error::{Result, UnsupportedEncodingSnafu};
use crate::metadata::ColumnMetadata;

/// Decoder over one column's forward-index buffer, tagged by physical layout.
pub enum ForwardIndexReader {
    /// Fixed-bit dictionary ids, one per row.
    FixedBit(FixedBitReader),

    /// Fixed-bit dictionary ids, a bounded variable count per row.
    FixedBitMultiValue(FixedBitMultiValueReader),

    /// Variable-length raw byte values grouped into chunks, one per row.
    VarChunk(VarChunkReader),
}

impl ForwardIndexReader {
    /// Selects the reader variant for the column and validates the buffer's
    /// framing against the metadata.
    pub fn from_column(buffer: Bytes, meta: &ColumnMetadata) -> Result<ForwardIndexReader> {
        match (meta.single_value, meta.has_dictionary) {
            (true, true) => Ok(ForwardIndexReader::FixedBit(FixedBitReader::new(
                buffer,
                meta.total_docs,
                meta.bits_per_element,
            )?)),
            (false, true) => Ok(ForwardIndexReader::FixedBitMultiValue(
                FixedBitMultiValueReader::new(
                    buffer,
                    meta.total_docs,
                    meta.total_entries,
                    meta.bits_per_element,
                )?,
            )),
            (true, false) => Ok(ForwardIndexReader::VarChunk(VarChunkReader::new(
                buffer,
                meta.total_docs,
            )?)),
            (false, false) => UnsupportedEncodingSnafu {
                reason: format!(
                    "multi-valued column {} without dictionary",
                    meta.column_name
                ),
            }
            .fail(),
        }
    }
}
