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

use std::io;

use asynchronous_codec::{BytesMut, Decoder, Encoder};
use bytes::{Buf, BufMut};
use roaring::RoaringBitmap;
use snafu::ResultExt;

use crate::inverted_index::error::{CommonIoSnafu, Error, Result};
use crate::DictId;

const U32_LENGTH: usize = std::mem::size_of::<u32>();
const U64_LENGTH: usize = std::mem::size_of::<u64>();

/// Magic bytes for this intermediate codec version
pub const INTERMEDIATE_MAGIC_V1: &[u8; 4] = b"pim1";

/// Serializes items of posting intermediate files.
pub struct IntermediateItemEncoderV1;

/// [`FramedWrite`] requires the [`Encoder`] trait to be implemented.
impl Encoder for IntermediateItemEncoderV1 {
    type Item<'a> = (DictId, RoaringBitmap);
    type Error = Error;

    fn encode(&mut self, item: (DictId, RoaringBitmap), dst: &mut BytesMut) -> Result<()> {
        let bitmap_size = item.1.serialized_size();

        dst.reserve(U32_LENGTH + U64_LENGTH + bitmap_size);
        dst.put_u32_le(item.0);
        dst.put_u64_le(bitmap_size as u64);
        item.1
            .serialize_into(&mut dst.writer())
            .context(CommonIoSnafu)?;

        Ok(())
    }
}

/// Deserializes items of posting intermediate files.
pub struct IntermediateItemDecoderV1;

/// [`FramedRead`] requires the [`Decoder`] trait to be implemented.
impl Decoder for IntermediateItemDecoderV1 {
    type Item = (DictId, RoaringBitmap);
    type Error = Error;

    /// Decodes the `src` into `(DictId, RoaringBitmap)`. Returns `None` if
    /// the `src` does not contain enough data for a complete item.
    ///
    /// Only after successful decoding, the `src` is advanced. Otherwise,
    /// it is left untouched to wait for filling more data and retrying.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        // [dict id][bitmap len][bitmap]
        //    [4]       [8]       [?]

        if src.len() < U32_LENGTH + U64_LENGTH {
            return Ok(None);
        }
        let (dict_id, buf) = src.split_at(U32_LENGTH);
        let dict_id = u32::from_le_bytes(dict_id.try_into().unwrap());

        let (bitmap_len, buf) = buf.split_at(U64_LENGTH);
        let bitmap_len = u64::from_le_bytes(bitmap_len.try_into().unwrap()) as usize;

        if buf.len() < bitmap_len {
            return Ok(None);
        }
        let bitmap =
            RoaringBitmap::deserialize_from(&buf[..bitmap_len]).context(CommonIoSnafu)?;

        src.advance(U32_LENGTH + U64_LENGTH + bitmap_len);
        Ok(Some((dict_id, bitmap)))
    }
}

/// Required for [`Encoder`] and [`Decoder`] implementations.
impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Err::<(), io::Error>(error)
            .context(CommonIoSnafu)
            .unwrap_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitmap(rows: &[u32]) -> RoaringBitmap {
        rows.iter().copied().collect()
    }

    #[test]
    fn test_intermediate_codec_basic() {
        let mut encoder = IntermediateItemEncoderV1;
        let mut buf = BytesMut::new();

        let item = (4u32, bitmap(&[0, 2, 3]));
        encoder.encode(item.clone(), &mut buf).unwrap();

        let mut decoder = IntermediateItemDecoderV1;
        assert_eq!(decoder.decode(&mut buf).unwrap().unwrap(), item);
        assert_eq!(decoder.decode(&mut buf).unwrap(), None);

        let item1 = (7u32, bitmap(&[1]));
        encoder.encode(item.clone(), &mut buf).unwrap();
        encoder.encode(item1.clone(), &mut buf).unwrap();
        assert_eq!(decoder.decode(&mut buf).unwrap().unwrap(), item);
        assert_eq!(decoder.decode(&mut buf).unwrap().unwrap(), item1);
        assert_eq!(decoder.decode(&mut buf).unwrap(), None);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_intermediate_codec_empty_bitmap() {
        let mut encoder = IntermediateItemEncoderV1;
        let mut buf = BytesMut::new();

        let item = (0u32, bitmap(&[]));
        encoder.encode(item.clone(), &mut buf).unwrap();

        let mut decoder = IntermediateItemDecoderV1;
        assert_eq!(decoder.decode(&mut buf).unwrap().unwrap(), item);
        assert_eq!(decoder.decode(&mut buf).unwrap(), None);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_intermediate_codec_partial() {
        let mut encoder = IntermediateItemEncoderV1;
        let mut buf = BytesMut::new();

        let item = (1u32, bitmap(&[5, 6, 7]));
        encoder.encode(item.clone(), &mut buf).unwrap();

        let partial_length = U32_LENGTH + U64_LENGTH + 3;
        let mut partial_bytes = buf.split_to(partial_length);

        let mut decoder = IntermediateItemDecoderV1;
        assert_eq!(decoder.decode(&mut partial_bytes).unwrap(), None); // not enough data
        partial_bytes.extend_from_slice(&buf[..]);
        assert_eq!(decoder.decode(&mut partial_bytes).unwrap().unwrap(), item);
        assert_eq!(decoder.decode(&mut partial_bytes).unwrap(), None);
        assert!(partial_bytes.is_empty());
    }
}
