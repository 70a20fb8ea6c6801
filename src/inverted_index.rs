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

//! Bitmap posting lists for dictionary-encoded scalar columns.
//!
//! The builder accepts `(row, dictionary id)` pairs in row order and
//! produces, per distinct id, a sorted duplicate-free row-id set. The
//! in-memory buffer is bounded; crossing the memory threshold spills it to
//! intermediate files which are merge-sorted back at seal time.

pub mod create;
pub mod error;
pub mod format;
