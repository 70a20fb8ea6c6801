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

//! Access to the per-segment store of index artifacts.
//!
//! The index builders only talk to [`SegmentDirectoryWriter`]; how artifacts
//! are laid out on disk is the directory's own concern. [`FsSegmentDirectory`]
//! is a filesystem-backed implementation that keeps one file per index in the
//! legacy layout and a single container file in the consolidated layout.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use snafu::{ensure, ResultExt};

use crate::error::{
    CorruptedConsolidatedFileSnafu, DirectoryIoSnafu, IndexNotFoundSnafu, Result,
};

/// Name of the consolidated container file within a segment directory.
pub const CONSOLIDATED_FILE_NAME: &str = "segment.cfi";

/// File name suffix of a forward index in the multi-file layout.
pub const FORWARD_INDEX_FILE_EXTENSION: &str = ".fwd";

/// File name suffix of a bitmap inverted index in the multi-file layout.
pub const BITMAP_INDEX_FILE_EXTENSION: &str = ".bitmap.inv";

/// Kind of a per-column index artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    Forward,
    Inverted,
}

impl IndexType {
    fn as_u8(&self) -> u8 {
        match self {
            IndexType::Forward => 0,
            IndexType::Inverted => 1,
        }
    }

    fn from_u8(code: u8) -> Option<IndexType> {
        match code {
            0 => Some(IndexType::Forward),
            1 => Some(IndexType::Inverted),
            _ => None,
        }
    }

    fn file_extension(&self) -> &'static str {
        match self {
            IndexType::Forward => FORWARD_INDEX_FILE_EXTENSION,
            IndexType::Inverted => BITMAP_INDEX_FILE_EXTENSION,
        }
    }
}

/// Writable handle to a segment's index store.
#[mockall::automock]
#[async_trait]
pub trait SegmentDirectoryWriter: Send + Sync {
    /// Returns whether an index of the given type exists for the column.
    async fn has_index_for(&self, column: &str, index_type: IndexType) -> Result<bool>;

    /// Returns the read-only buffer backing the column's index. The buffer
    /// is borrowed; callers must not assume they own the backing storage.
    async fn get_index_for(&self, column: &str, index_type: IndexType) -> Result<Bytes>;

    /// Registers `source` as the column's index artifact in the consolidated
    /// layout and removes the source file afterwards.
    async fn write_index_as_single_file(
        &mut self,
        column: &str,
        source: &Path,
        index_type: IndexType,
    ) -> Result<()>;
}

/// Filesystem-backed [`SegmentDirectoryWriter`].
///
/// Consolidated entries are appended to `segment.cfi` as
/// `[name_len u16][name][index_type u8][data_len u64][data]`, all integers
/// little-endian. The entry table is rebuilt by scanning the container on
/// open; segments are immutable so the scan happens once.
pub struct FsSegmentDirectory {
    dir: PathBuf,
    entries: HashMap<(String, IndexType), (u64, u64)>,
}

impl FsSegmentDirectory {
    /// Opens the segment directory, scanning the consolidated container if
    /// one is present.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let container = dir.join(CONSOLIDATED_FILE_NAME);

        let mut entries = HashMap::new();
        if path_exists(&container).await? {
            let data = tokio::fs::read(&container)
                .await
                .context(DirectoryIoSnafu { path: &container })?;
            entries = Self::scan_container(&data)?;
        }

        Ok(Self { dir, entries })
    }

    /// Walks the container bytes and collects the offset and length of each
    /// entry's payload.
    fn scan_container(data: &[u8]) -> Result<HashMap<(String, IndexType), (u64, u64)>> {
        let mut entries = HashMap::new();
        let mut pos = 0usize;
        while pos < data.len() {
            let header_end = pos + 2;
            ensure!(
                header_end <= data.len(),
                CorruptedConsolidatedFileSnafu {
                    reason: "truncated entry name length",
                }
            );
            let name_len = u16::from_le_bytes(data[pos..header_end].try_into().unwrap()) as usize;
            pos = header_end;

            ensure!(
                pos + name_len + 1 + 8 <= data.len(),
                CorruptedConsolidatedFileSnafu {
                    reason: "truncated entry header",
                }
            );
            let name = std::str::from_utf8(&data[pos..pos + name_len])
                .ok()
                .map(str::to_string);
            let Some(name) = name else {
                return CorruptedConsolidatedFileSnafu {
                    reason: "entry name is not valid UTF-8",
                }
                .fail();
            };
            pos += name_len;

            let index_type = IndexType::from_u8(data[pos]);
            let Some(index_type) = index_type else {
                return CorruptedConsolidatedFileSnafu {
                    reason: format!("unknown index type code {}", data[pos]),
                }
                .fail();
            };
            pos += 1;

            let data_len = u64::from_le_bytes(data[pos..pos + 8].try_into().unwrap());
            pos += 8;

            ensure!(
                pos as u64 + data_len <= data.len() as u64,
                CorruptedConsolidatedFileSnafu {
                    reason: "truncated entry payload",
                }
            );
            entries.insert((name, index_type), (pos as u64, data_len));
            pos += data_len as usize;
        }
        Ok(entries)
    }

    fn multi_file_path(&self, column: &str, index_type: IndexType) -> PathBuf {
        self.dir
            .join(format!("{column}{}", index_type.file_extension()))
    }

    fn container_path(&self) -> PathBuf {
        self.dir.join(CONSOLIDATED_FILE_NAME)
    }
}

#[async_trait]
impl SegmentDirectoryWriter for FsSegmentDirectory {
    async fn has_index_for(&self, column: &str, index_type: IndexType) -> Result<bool> {
        if self.entries.contains_key(&(column.to_string(), index_type)) {
            return Ok(true);
        }
        path_exists(&self.multi_file_path(column, index_type)).await
    }

    async fn get_index_for(&self, column: &str, index_type: IndexType) -> Result<Bytes> {
        if let Some((offset, len)) = self.entries.get(&(column.to_string(), index_type)) {
            let container = self.container_path();
            let data = tokio::fs::read(&container)
                .await
                .context(DirectoryIoSnafu { path: &container })?;
            let start = *offset as usize;
            let end = start + *len as usize;
            ensure!(
                end <= data.len(),
                CorruptedConsolidatedFileSnafu {
                    reason: "entry payload out of bounds",
                }
            );
            return Ok(Bytes::from(data).slice(start..end));
        }

        let path = self.multi_file_path(column, index_type);
        if !path_exists(&path).await? {
            return IndexNotFoundSnafu { column, index_type }.fail();
        }
        let data = tokio::fs::read(&path)
            .await
            .context(DirectoryIoSnafu { path: &path })?;
        Ok(Bytes::from(data))
    }

    async fn write_index_as_single_file(
        &mut self,
        column: &str,
        source: &Path,
        index_type: IndexType,
    ) -> Result<()> {
        let data = tokio::fs::read(source)
            .await
            .context(DirectoryIoSnafu { path: source })?;

        let container = self.container_path();
        let existing_len = match tokio::fs::metadata(&container).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => {
                return Err(e).context(DirectoryIoSnafu { path: &container });
            }
        };

        let mut entry = Vec::with_capacity(2 + column.len() + 1 + 8 + data.len());
        entry.extend_from_slice(&(column.len() as u16).to_le_bytes());
        entry.extend_from_slice(column.as_bytes());
        entry.push(index_type.as_u8());
        entry.extend_from_slice(&(data.len() as u64).to_le_bytes());
        let payload_offset = existing_len + entry.len() as u64;
        entry.extend_from_slice(&data);

        use tokio::io::AsyncWriteExt;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&container)
            .await
            .context(DirectoryIoSnafu { path: &container })?;
        file.write_all(&entry)
            .await
            .context(DirectoryIoSnafu { path: &container })?;
        file.flush()
            .await
            .context(DirectoryIoSnafu { path: &container })?;

        self.entries.insert(
            (column.to_string(), index_type),
            (payload_offset, data.len() as u64),
        );

        tokio::fs::remove_file(source)
            .await
            .context(DirectoryIoSnafu { path: source })?;
        Ok(())
    }
}

async fn path_exists(path: &Path) -> Result<bool> {
    tokio::fs::try_exists(path)
        .await
        .context(DirectoryIoSnafu { path })
}
