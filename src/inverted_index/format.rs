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

//! Bitmap posting file format:
//!
//! ```text
//! bitmap_0 .. bitmap_{c-1}    serialized roaring bitmaps, ascending dict id;
//!                             an empty posting set occupies zero bytes
//! offset table                (c + 1) little-endian u64 byte offsets;
//!                             bitmap i spans offsets[i]..offsets[i+1]
//! footer                      cardinality: u32, total docs: u32,
//!                             offset table position: u64, magic
//! ```

pub mod reader;
pub mod writer;

/// Magic bytes closing a posting file.
pub const POSTING_FILE_MAGIC: &[u8; 4] = b"bpi1";

/// Byte size of the posting file footer.
pub const FOOTER_SIZE: usize = 20;
