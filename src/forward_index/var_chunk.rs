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
    InvalidHeaderSnafu, NonSequentialReadSnafu, Result, RowOutOfBoundsSnafu, TruncatedBufferSnafu,
};

/// Magic bytes of the variable-length chunked forward index.
pub const VAR_CHUNK_MAGIC: &[u8; 4] = b"vbc1";

/// Forward index reader for single-valued columns without a dictionary.
///
/// Layout: magic, `rows_per_chunk: u32`, `num_chunks: u32`, `num_chunks`
/// absolute `u64` chunk offsets, then the chunks. Within a chunk each row is
/// a `u32` length followed by that many raw bytes. Only a monotonically
/// increasing row scan is supported; the offset table seats the cursor at
/// each chunk start.
pub struct VarChunkReader {
    data: Bytes,
    total_docs: u32,
    rows_per_chunk: u32,
    chunk_offsets: Vec<u64>,
    next_row: u32,
    cursor: usize,
}

impl VarChunkReader {
    pub fn new(data: Bytes, total_docs: u32) -> Result<VarChunkReader> {
        ensure!(
            data.len() >= 12,
            TruncatedBufferSnafu {
                expected: 12usize,
                actual: data.len(),
            }
        );
        ensure!(
            &data[0..4] == VAR_CHUNK_MAGIC,
            InvalidHeaderSnafu {
                reason: "bad magic",
            }
        );
        let rows_per_chunk = u32::from_le_bytes(data[4..8].try_into().unwrap());
        let num_chunks = u32::from_le_bytes(data[8..12].try_into().unwrap());
        ensure!(
            rows_per_chunk > 0,
            InvalidHeaderSnafu {
                reason: "rows per chunk is zero",
            }
        );

        let expected_chunks = (total_docs as u64).div_ceil(rows_per_chunk as u64);
        ensure!(
            num_chunks as u64 == expected_chunks,
            InvalidHeaderSnafu {
                reason: format!(
                    "chunk count {num_chunks} does not cover {total_docs} rows \
                     at {rows_per_chunk} rows per chunk"
                ),
            }
        );

        let table_end = 12 + num_chunks as usize * 8;
        ensure!(
            data.len() >= table_end,
            TruncatedBufferSnafu {
                expected: table_end,
                actual: data.len(),
            }
        );
        let chunk_offsets = (0..num_chunks as usize)
            .map(|i| u64::from_le_bytes(data[12 + i * 8..20 + i * 8].try_into().unwrap()))
            .collect();

        Ok(VarChunkReader {
            data,
            total_docs,
            rows_per_chunk,
            chunk_offsets,
            next_row: 0,
            cursor: 0,
        })
    }

    /// Decodes row `row`'s raw bytes. Rows must be requested in strictly
    /// increasing order starting from zero.
    pub fn get_bytes(&mut self, row: u32) -> Result<Bytes> {
        ensure!(
            row < self.total_docs,
            RowOutOfBoundsSnafu {
                row,
                total_docs: self.total_docs,
            }
        );
        ensure!(
            row == self.next_row,
            NonSequentialReadSnafu {
                requested: row,
                expected: self.next_row,
            }
        );

        if row % self.rows_per_chunk == 0 {
            self.cursor = self.chunk_offsets[(row / self.rows_per_chunk) as usize] as usize;
        }

        ensure!(
            self.cursor + 4 <= self.data.len(),
            TruncatedBufferSnafu {
                expected: self.cursor + 4,
                actual: self.data.len(),
            }
        );
        let len =
            u32::from_le_bytes(self.data[self.cursor..self.cursor + 4].try_into().unwrap())
                as usize;
        let start = self.cursor + 4;
        ensure!(
            start + len <= self.data.len(),
            TruncatedBufferSnafu {
                expected: start + len,
                actual: self.data.len(),
            }
        );

        self.cursor = start + len;
        self.next_row += 1;
        Ok(self.data.slice(start..start + len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::encode_var_chunk;

    #[test]
    fn test_var_chunk_sequential_scan() {
        let rows: Vec<&[u8]> = vec![b"alpha", b"", b"b", b"gamma-gamma", b"d"];
        let data = Bytes::from(encode_var_chunk(&rows, 2));
        let mut reader = VarChunkReader::new(data, 5).unwrap();

        for (row, expected) in rows.iter().enumerate() {
            assert_eq!(&reader.get_bytes(row as u32).unwrap()[..], *expected);
        }
    }

    #[test]
    fn test_var_chunk_rejects_non_sequential() {
        let rows: Vec<&[u8]> = vec![b"a", b"b", b"c"];
        let data = Bytes::from(encode_var_chunk(&rows, 2));
        let mut reader = VarChunkReader::new(data, 3).unwrap();

        let _ = reader.get_bytes(0).unwrap();
        assert!(matches!(
            reader.get_bytes(2),
            Err(crate::forward_index::error::Error::NonSequentialRead { .. })
        ));
    }

    #[test]
    fn test_var_chunk_bad_magic() {
        let res = VarChunkReader::new(Bytes::from_static(&[0u8; 16]), 1);
        assert!(matches!(
            res,
            Err(crate::forward_index::error::Error::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_var_chunk_chunk_count_mismatch() {
        let rows: Vec<&[u8]> = vec![b"a", b"b", b"c"];
        let data = Bytes::from(encode_var_chunk(&rows, 2));
        // 3 rows at 2 rows per chunk needs 2 chunks; claim 10 rows instead
        let res = VarChunkReader::new(data, 10);
        assert!(matches!(
            res,
            Err(crate::forward_index::error::Error::InvalidHeader { .. })
        ));
    }
}
