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
    InvalidBitWidthSnafu, Result, RowOutOfBoundsSnafu, TruncatedBufferSnafu,
};
use crate::DictId;

/// Extracts fixed-width values from a little-endian bit stream: value `i`
/// occupies `bits` bits starting at bit offset `i * bits`, LSB first.
#[derive(Clone, Copy)]
pub(crate) struct BitUnpacker {
    bits: u32,
    mask: u64,
}

impl BitUnpacker {
    pub(crate) fn new(bits: u32) -> Result<BitUnpacker> {
        ensure!((1..=32).contains(&bits), InvalidBitWidthSnafu { bits });
        Ok(BitUnpacker {
            bits,
            mask: (1u64 << bits) - 1,
        })
    }

    /// Number of bytes needed to hold `count` packed values.
    pub(crate) fn packed_len(&self, count: u64) -> usize {
        ((count * self.bits as u64 + 7) / 8) as usize
    }

    pub(crate) fn get(&self, data: &[u8], index: u64) -> Result<DictId> {
        let bit_offset = index * self.bits as u64;
        let byte_offset = (bit_offset / 8) as usize;
        let shift = (bit_offset % 8) as u32;

        let needed = ((shift + self.bits + 7) / 8) as usize;
        ensure!(
            byte_offset + needed <= data.len(),
            TruncatedBufferSnafu {
                expected: byte_offset + needed,
                actual: data.len(),
            }
        );

        let mut window = [0u8; 8];
        let end = (byte_offset + 8).min(data.len());
        window[..end - byte_offset].copy_from_slice(&data[byte_offset..end]);
        let value = (u64::from_le_bytes(window) >> shift) & self.mask;
        Ok(value as DictId)
    }
}

/// Forward index reader for single-valued dictionary-encoded columns: row
/// `i`'s dictionary id sits at bit offset `i * bits_per_element`.
pub struct FixedBitReader {
    data: Bytes,
    total_docs: u32,
    unpacker: BitUnpacker,
}

impl FixedBitReader {
    pub fn new(data: Bytes, total_docs: u32, bits_per_element: u32) -> Result<FixedBitReader> {
        let unpacker = BitUnpacker::new(bits_per_element)?;
        let expected = unpacker.packed_len(total_docs as u64);
        ensure!(
            data.len() >= expected,
            TruncatedBufferSnafu {
                expected,
                actual: data.len(),
            }
        );
        Ok(FixedBitReader {
            data,
            total_docs,
            unpacker,
        })
    }

    /// Decodes row `row`'s dictionary id.
    pub fn get_dict_id(&self, row: u32) -> Result<DictId> {
        ensure!(
            row < self.total_docs,
            RowOutOfBoundsSnafu {
                row,
                total_docs: self.total_docs,
            }
        );
        self.unpacker.get(&self.data, row as u64)
    }
}
