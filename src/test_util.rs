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

//! Encoders for forward-index fixtures. Production segments are written by
//! the segment creator, which is outside this crate; tests build the same
//! byte layouts here.

use crate::forward_index::var_chunk::VAR_CHUNK_MAGIC;
use crate::metadata::ColumnMetadata;

/// Packs values LSB-first into a little-endian bit stream at `bits` per
/// value, the layout `FixedBitReader` decodes.
pub(crate) fn pack_fixed_bit(values: &[u32], bits: u32) -> Vec<u8> {
    let mut out = vec![0u8; (values.len() * bits as usize + 7) / 8];
    for (i, value) in values.iter().enumerate() {
        for k in 0..bits as usize {
            if (value >> k) & 1 == 1 {
                let bit = i * bits as usize + k;
                out[bit / 8] |= 1 << (bit % 8);
            }
        }
    }
    out
}

/// Encodes a multi-valued column: cumulative `u32` entry counts followed by
/// the flattened ids packed at `bits` per id.
pub(crate) fn encode_multi_value(rows: &[Vec<u32>], bits: u32) -> Vec<u8> {
    let mut out = Vec::new();
    let mut total = 0u32;
    out.extend_from_slice(&total.to_le_bytes());
    for row in rows {
        total += row.len() as u32;
        out.extend_from_slice(&total.to_le_bytes());
    }

    let flattened: Vec<u32> = rows.iter().flatten().copied().collect();
    out.extend_from_slice(&pack_fixed_bit(&flattened, bits));
    out
}

/// Encodes a variable-length chunked column: header, absolute chunk
/// offsets, then per-row `u32` length + bytes grouped into chunks.
pub(crate) fn encode_var_chunk(rows: &[&[u8]], rows_per_chunk: u32) -> Vec<u8> {
    let num_chunks = (rows.len() as u64).div_ceil(rows_per_chunk as u64) as u32;
    let table_end = 12 + num_chunks as usize * 8;

    let mut chunk_offsets = Vec::with_capacity(num_chunks as usize);
    let mut data = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        if i as u32 % rows_per_chunk == 0 {
            chunk_offsets.push((table_end + data.len()) as u64);
        }
        data.extend_from_slice(&(row.len() as u32).to_le_bytes());
        data.extend_from_slice(row);
    }

    let mut out = Vec::with_capacity(table_end + data.len());
    out.extend_from_slice(VAR_CHUNK_MAGIC);
    out.extend_from_slice(&rows_per_chunk.to_le_bytes());
    out.extend_from_slice(&num_chunks.to_le_bytes());
    for offset in chunk_offsets {
        out.extend_from_slice(&offset.to_le_bytes());
    }
    out.extend_from_slice(&data);
    out
}

/// Metadata for a single-valued dictionary-encoded scalar column.
pub(crate) fn column_metadata(
    name: &str,
    total_docs: u32,
    cardinality: u32,
    bits_per_element: u32,
) -> ColumnMetadata {
    ColumnMetadata {
        column_name: name.to_string(),
        total_docs,
        single_value: true,
        has_dictionary: true,
        cardinality,
        bits_per_element,
        max_values_per_row: 1,
        total_entries: total_docs as u64,
        sorted: false,
        object_type: None,
    }
}
