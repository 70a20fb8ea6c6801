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

//! Construction of secondary (inverted) indices over immutable columnar
//! segments.
//!
//! A segment stores, per column, a forward index (row → value). This crate
//! derives the reverse mapping (value → row set) and persists it back into
//! the segment with a marker-file protocol that makes the whole operation
//! idempotent and safe to re-run after a crash.

pub mod archive;
pub mod directory;
pub mod document_index;
pub mod error;
pub mod forward_index;
pub mod indexer;
pub mod inverted_index;
pub mod metadata;
#[cfg(test)]
mod test_util;

/// Row position within a segment, `0..total_docs`.
pub type RowId = u32;

/// Compact integer substitute for a raw column value in a
/// dictionary-encoded column, `0..cardinality`.
pub type DictId = u32;
