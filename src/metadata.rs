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

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// On-disk layout version of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StorageLayout {
    /// Legacy layout, one file (or directory) per column index.
    #[default]
    MultiFile,

    /// Consolidated layout, all index artifacts packed into a single file.
    SingleFile,
}

/// Read-only description of one column of a segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    /// Column name, unique within the segment.
    pub column_name: String,

    /// Total number of rows in the segment.
    pub total_docs: u32,

    /// Whether each row holds exactly one value.
    pub single_value: bool,

    /// Whether the column is dictionary-encoded.
    pub has_dictionary: bool,

    /// Number of distinct values; dictionary ids range over `0..cardinality`.
    pub cardinality: u32,

    /// Bit width of one dictionary id in the forward index.
    pub bits_per_element: u32,

    /// Upper bound on the number of values in one row of a multi-valued
    /// column. `1` for single-valued columns.
    pub max_values_per_row: u32,

    /// Total number of stored entries across all rows. Equals `total_docs`
    /// for single-valued columns.
    pub total_entries: u64,

    /// Whether rows are stored sorted by this column's value. Sorted columns
    /// are never indexed by this subsystem.
    pub sorted: bool,

    /// Tag marking the column as a complex object type (for example `"map"`,
    /// `"document"` or `"text"`). `None` for plain scalar columns.
    pub object_type: Option<String>,
}

/// Read-only description of a whole segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentMetadata {
    /// Segment name, used for log correlation only.
    pub segment_name: String,

    /// Storage layout version of the segment.
    pub layout: StorageLayout,

    /// Per-column metadata, keyed by column name.
    pub columns: HashMap<String, ColumnMetadata>,
}

impl SegmentMetadata {
    /// Looks up the metadata of the named column.
    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns.get(name)
    }
}
