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

use futures::{AsyncWrite, AsyncWriteExt, StreamExt};
use snafu::{ensure, ResultExt};

use crate::inverted_index::create::PostingStream;
use crate::inverted_index::error::{
    CommonIoSnafu, DictIdOutOfBoundsSnafu, OutOfOrderPostingSnafu, Result,
};
use crate::inverted_index::format::{FOOTER_SIZE, POSTING_FILE_MAGIC};

/// Drains a posting stream into the on-disk posting file layout.
pub struct PostingFileWriter<W> {
    writer: W,
    cardinality: u32,
    total_docs: u32,
    postings: PostingStream,
}

impl<W: AsyncWrite + Send + Unpin> PostingFileWriter<W> {
    pub fn new(
        writer: W,
        cardinality: u32,
        total_docs: u32,
        postings: PostingStream,
    ) -> PostingFileWriter<W> {
        PostingFileWriter {
            writer,
            cardinality,
            total_docs,
            postings,
        }
    }

    /// Writes bitmaps, the offset table and the footer, returning the total
    /// file size in bytes. Dictionary ids absent from the stream get an
    /// empty posting set.
    pub async fn write(mut self) -> Result<u64> {
        let mut offsets = Vec::with_capacity(self.cardinality as usize + 1);
        let mut position = 0u64;
        let mut serialized = Vec::new();

        while let Some(posting) = self.postings.next().await {
            let (dict_id, bitmap) = posting?;
            ensure!(
                dict_id < self.cardinality,
                DictIdOutOfBoundsSnafu {
                    dict_id,
                    cardinality: self.cardinality,
                }
            );
            ensure!(
                offsets.len() <= dict_id as usize,
                OutOfOrderPostingSnafu { dict_id }
            );

            // ids skipped by the stream keep empty spans
            while offsets.len() <= dict_id as usize {
                offsets.push(position);
            }

            serialized.clear();
            bitmap.serialize_into(&mut serialized).context(CommonIoSnafu)?;
            self.writer
                .write_all(&serialized)
                .await
                .context(CommonIoSnafu)?;
            position += serialized.len() as u64;
        }
        while offsets.len() <= self.cardinality as usize {
            offsets.push(position);
        }

        for offset in &offsets {
            self.writer
                .write_all(&offset.to_le_bytes())
                .await
                .context(CommonIoSnafu)?;
        }

        self.writer
            .write_all(&self.cardinality.to_le_bytes())
            .await
            .context(CommonIoSnafu)?;
        self.writer
            .write_all(&self.total_docs.to_le_bytes())
            .await
            .context(CommonIoSnafu)?;
        self.writer
            .write_all(&position.to_le_bytes())
            .await
            .context(CommonIoSnafu)?;
        self.writer
            .write_all(POSTING_FILE_MAGIC)
            .await
            .context(CommonIoSnafu)?;
        self.writer.flush().await.context(CommonIoSnafu)?;

        Ok(position + offsets.len() as u64 * 8 + FOOTER_SIZE as u64)
    }
}
