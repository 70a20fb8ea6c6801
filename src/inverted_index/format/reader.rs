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
use roaring::RoaringBitmap;
use snafu::{ensure, ResultExt};

use crate::inverted_index::error::{
    CommonIoSnafu, DictIdOutOfBoundsSnafu, InvalidPostingFileSnafu, Result,
};
use crate::inverted_index::format::{FOOTER_SIZE, POSTING_FILE_MAGIC};
use crate::DictId;

/// Reads posting sets back out of a serialized posting file.
pub struct PostingFileReader {
    data: Bytes,
    cardinality: u32,
    total_docs: u32,
    offset_table_pos: u64,
}

impl PostingFileReader {
    pub fn new(data: Bytes) -> Result<PostingFileReader> {
        ensure!(
            data.len() >= FOOTER_SIZE,
            InvalidPostingFileSnafu {
                reason: format!("file too short: {} bytes", data.len()),
            }
        );
        let footer = &data[data.len() - FOOTER_SIZE..];
        ensure!(
            &footer[16..20] == POSTING_FILE_MAGIC,
            InvalidPostingFileSnafu {
                reason: "bad magic",
            }
        );
        let cardinality = u32::from_le_bytes(footer[0..4].try_into().unwrap());
        let total_docs = u32::from_le_bytes(footer[4..8].try_into().unwrap());
        let offset_table_pos = u64::from_le_bytes(footer[8..16].try_into().unwrap());

        let expected_len =
            offset_table_pos + (cardinality as u64 + 1) * 8 + FOOTER_SIZE as u64;
        ensure!(
            expected_len == data.len() as u64,
            InvalidPostingFileSnafu {
                reason: format!(
                    "length mismatch: expected {expected_len} bytes, got {}",
                    data.len()
                ),
            }
        );

        Ok(PostingFileReader {
            data,
            cardinality,
            total_docs,
            offset_table_pos,
        })
    }

    pub fn cardinality(&self) -> u32 {
        self.cardinality
    }

    pub fn total_docs(&self) -> u32 {
        self.total_docs
    }

    /// Returns the row-id set of `dict_id`. Equal adjacent offsets denote an
    /// empty posting set.
    pub fn get(&self, dict_id: DictId) -> Result<RoaringBitmap> {
        ensure!(
            dict_id < self.cardinality,
            DictIdOutOfBoundsSnafu {
                dict_id,
                cardinality: self.cardinality,
            }
        );

        let start = self.offset(dict_id as usize)?;
        let end = self.offset(dict_id as usize + 1)?;
        if start == end {
            return Ok(RoaringBitmap::new());
        }
        ensure!(
            start < end && end <= self.offset_table_pos,
            InvalidPostingFileSnafu {
                reason: format!("bitmap span {start}..{end} out of bounds"),
            }
        );

        RoaringBitmap::deserialize_from(&self.data[start as usize..end as usize])
            .context(CommonIoSnafu)
    }

    fn offset(&self, index: usize) -> Result<u64> {
        let pos = self.offset_table_pos as usize + index * 8;
        // new() verified the table fits the buffer
        let bytes = self.data[pos..pos + 8]
            .try_into()
            .map_err(|_| {
                InvalidPostingFileSnafu {
                    reason: "offset table truncated",
                }
                .build()
            })?;
        Ok(u64::from_le_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use futures::stream;

    use super::*;
    use crate::inverted_index::create::PostingStream;
    use crate::inverted_index::error::Error;
    use crate::inverted_index::format::writer::PostingFileWriter;

    async fn write(items: Vec<(DictId, Vec<u32>)>, cardinality: u32, total_docs: u32) -> Bytes {
        let postings: PostingStream = Box::new(stream::iter(items.into_iter().map(
            |(id, rows)| Ok((id, rows.into_iter().collect::<RoaringBitmap>())),
        )));
        let mut out = Vec::new();
        PostingFileWriter::new(&mut out, cardinality, total_docs, postings)
            .write()
            .await
            .unwrap();
        Bytes::from(out)
    }

    #[tokio::test]
    async fn test_roundtrip_with_gaps() {
        let data = write(vec![(1, vec![0, 2]), (3, vec![1])], 5, 3).await;
        let reader = PostingFileReader::new(data).unwrap();

        assert_eq!(reader.cardinality(), 5);
        assert_eq!(reader.total_docs(), 3);
        assert!(reader.get(0).unwrap().is_empty());
        assert_eq!(reader.get(1).unwrap().iter().collect::<Vec<_>>(), [0, 2]);
        assert!(reader.get(2).unwrap().is_empty());
        assert_eq!(reader.get(3).unwrap().iter().collect::<Vec<_>>(), [1]);
        assert!(reader.get(4).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_out_of_bounds() {
        let data = write(vec![(0, vec![0])], 1, 1).await;
        let reader = PostingFileReader::new(data).unwrap();
        assert!(matches!(
            reader.get(1),
            Err(Error::DictIdOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_rejects_short_file() {
        let res = PostingFileReader::new(Bytes::from_static(&[0u8; 8]));
        assert!(matches!(res, Err(Error::InvalidPostingFile { .. })));
    }

    #[tokio::test]
    async fn test_rejects_bad_magic() {
        let data = write(vec![(0, vec![0])], 1, 1).await;
        let mut corrupted = data.to_vec();
        let len = corrupted.len();
        corrupted[len - 1] ^= 0xff;
        let res = PostingFileReader::new(Bytes::from(corrupted));
        assert!(matches!(res, Err(Error::InvalidPostingFile { .. })));
    }

    #[tokio::test]
    async fn test_rejects_truncated_file() {
        let data = write(vec![(0, vec![0, 1, 2])], 2, 3).await;
        let res = PostingFileReader::new(data.slice(4..));
        assert!(matches!(res, Err(Error::InvalidPostingFile { .. })));
    }
}
