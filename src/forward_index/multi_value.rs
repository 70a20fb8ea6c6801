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

use bytes::Bytes;
use snafu::ensure;

use crate::forward_index::error::{
    BufferTooSmallSnafu, InvalidHeaderSnafu, Result, RowOutOfBoundsSnafu, TruncatedBufferSnafu,
};
use crate::forward_index::fixed_bit::BitUnpacker;
use crate::DictId;

/// Forward index reader for multi-valued dictionary-encoded columns.
///
/// Layout: `total_docs + 1` little-endian `u32` cumulative entry counts,
/// followed by all dictionary ids packed at a fixed bit width. Row `i` owns
/// entries `counts[i]..counts[i + 1]` of the packed region.
pub struct FixedBitMultiValueReader {
    data: Bytes,
    total_docs: u32,
    header_len: usize,
    unpacker: BitUnpacker,
}

impl FixedBitMultiValueReader {
    pub fn new(
        data: Bytes,
        total_docs: u32,
        total_entries: u64,
        bits_per_element: u32,
    ) -> Result<FixedBitMultiValueReader> {
        let unpacker = BitUnpacker::new(bits_per_element)?;
        let header_len = (total_docs as usize + 1) * 4;
        let expected = header_len + unpacker.packed_len(total_entries);
        ensure!(
            data.len() >= expected,
            TruncatedBufferSnafu {
                expected,
                actual: data.len(),
            }
        );

        let reader = FixedBitMultiValueReader {
            data,
            total_docs,
            header_len,
            unpacker,
        };
        let last = reader.cumulative_count(total_docs);
        ensure!(
            last as u64 == total_entries,
            InvalidHeaderSnafu {
                reason: format!(
                    "last cumulative count {last} does not match total entries {total_entries}"
                ),
            }
        );
        Ok(reader)
    }

    fn cumulative_count(&self, index: u32) -> u32 {
        let at = index as usize * 4;
        u32::from_le_bytes(self.data[at..at + 4].try_into().unwrap())
    }

    /// Decodes row `row` into `buf`, returning the number of values filled.
    /// The caller sizes `buf` to the column's declared per-row maximum.
    pub fn get_dict_ids(&self, row: u32, buf: &mut [DictId]) -> Result<usize> {
        ensure!(
            row < self.total_docs,
            RowOutOfBoundsSnafu {
                row,
                total_docs: self.total_docs,
            }
        );

        let start = self.cumulative_count(row);
        let end = self.cumulative_count(row + 1);
        ensure!(
            start <= end,
            InvalidHeaderSnafu {
                reason: format!("cumulative counts decrease at row {row}"),
            }
        );
        let count = end - start;
        ensure!(
            count as usize <= buf.len(),
            BufferTooSmallSnafu {
                row,
                count,
                capacity: buf.len(),
            }
        );

        let packed = &self.data[self.header_len..];
        for (slot, entry) in buf.iter_mut().zip(start..end) {
            *slot = self.unpacker.get(packed, entry as u64)?;
        }
        Ok(count as usize)
    }
}
