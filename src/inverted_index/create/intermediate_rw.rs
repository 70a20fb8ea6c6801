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

//! Intermediate file read/write. An intermediate file holds one dumped
//! posting buffer: the codec magic followed by `(dictionary id, bitmap)`
//! frames in ascending dictionary-id order.

mod codec_v1;

use std::collections::BTreeMap;

use asynchronous_codec::{FramedRead, FramedWrite};
use futures::{stream, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, SinkExt, Stream};
use roaring::RoaringBitmap;
use snafu::{ensure, ResultExt};

use crate::inverted_index::error::{
    CommonIoSnafu, InvalidIntermediateMagicSnafu, Result,
};
use crate::DictId;

pub struct IntermediateWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> IntermediateWriter<W> {
    pub fn new(writer: W) -> IntermediateWriter<W> {
        IntermediateWriter { writer }
    }

    /// Serializes the magic and all postings, then flushes and closes the
    /// underlying writer.
    pub async fn write_all(mut self, values: BTreeMap<DictId, RoaringBitmap>) -> Result<()> {
        self.writer
            .write_all(codec_v1::INTERMEDIATE_MAGIC_V1)
            .await
            .context(CommonIoSnafu)?;

        let mut framed = FramedWrite::new(&mut self.writer, codec_v1::IntermediateItemEncoderV1);
        framed
            .send_all(&mut stream::iter(values.into_iter().map(Ok)))
            .await?;
        framed.close().await?;
        Ok(())
    }
}

pub struct IntermediateReader<R> {
    reader: R,
}

impl<R: AsyncRead + Unpin + Send> IntermediateReader<R> {
    pub fn new(reader: R) -> IntermediateReader<R> {
        IntermediateReader { reader }
    }

    /// Validates the magic and returns the stream of postings.
    pub async fn into_stream(
        mut self,
    ) -> Result<impl Stream<Item = Result<(DictId, RoaringBitmap)>> + Send + Unpin> {
        let mut magic = [0u8; codec_v1::INTERMEDIATE_MAGIC_V1.len()];
        self.reader
            .read_exact(&mut magic)
            .await
            .context(CommonIoSnafu)?;
        ensure!(
            &magic == codec_v1::INTERMEDIATE_MAGIC_V1,
            InvalidIntermediateMagicSnafu {
                actual: magic.to_vec(),
            }
        );

        Ok(FramedRead::new(
            self.reader,
            codec_v1::IntermediateItemDecoderV1,
        ))
    }
}

#[cfg(test)]
mod tests {
    use futures::io::Cursor;
    use futures::TryStreamExt;

    use super::*;
    use crate::inverted_index::error::Error;

    fn bitmap(rows: &[u32]) -> RoaringBitmap {
        rows.iter().copied().collect()
    }

    #[tokio::test]
    async fn test_intermediate_roundtrip() {
        let values = BTreeMap::from_iter([
            (0u32, bitmap(&[1, 5])),
            (3, bitmap(&[0])),
            (7, bitmap(&[2, 3, 4])),
        ]);

        let mut buf = Vec::new();
        IntermediateWriter::new(&mut buf)
            .write_all(values.clone())
            .await
            .unwrap();

        let stream = IntermediateReader::new(Cursor::new(buf))
            .into_stream()
            .await
            .unwrap();
        let decoded: Vec<_> = stream.try_collect().await.unwrap();
        assert_eq!(decoded, values.into_iter().collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_intermediate_empty() {
        let mut buf = Vec::new();
        IntermediateWriter::new(&mut buf)
            .write_all(BTreeMap::new())
            .await
            .unwrap();

        let stream = IntermediateReader::new(Cursor::new(buf))
            .into_stream()
            .await
            .unwrap();
        let decoded: Vec<_> = stream.try_collect().await.unwrap();
        assert!(decoded.is_empty());
    }

    #[tokio::test]
    async fn test_intermediate_bad_magic() {
        let res = IntermediateReader::new(Cursor::new(b"nope".to_vec()))
            .into_stream()
            .await;
        assert!(matches!(
            res.err(),
            Some(Error::InvalidIntermediateMagic { .. })
        ));
    }
}
