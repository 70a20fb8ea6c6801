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

//! Packaging of a directory-based index into a single blob.
//!
//! The consolidated storage layout stores one artifact per column, so a
//! directory produced by the document index engine has to be packed into one
//! file before registration. The blob format is the archiver's own concern;
//! this subsystem never looks inside it again.

use std::path::Path;

use async_trait::async_trait;
use snafu::ResultExt;
use tracing::warn;

use crate::error::{ArchiveSnafu, Result};

/// Magic bytes prefixing a flat archive blob.
const FLAT_ARCHIVE_MAGIC: &[u8; 4] = b"far1";

/// Packs a directory of index files into a single blob file.
#[mockall::automock]
#[async_trait]
pub trait IndexArchiver: Send + Sync {
    /// Archives the contents of `src_dir` into the file `dst`, returning the
    /// size of the written blob in bytes.
    async fn archive_dir(&self, src_dir: &Path, dst: &Path) -> Result<u64>;
}

/// [`IndexArchiver`] that concatenates the files of a flat directory into
/// one length-prefixed blob: `magic ([name_len u16][name][len u64][data])*`,
/// entries ordered by file name. Subdirectories are not expected in engine
/// output and are skipped with a warning.
#[derive(Default)]
pub struct FlatIndexArchiver;

#[async_trait]
impl IndexArchiver for FlatIndexArchiver {
    async fn archive_dir(&self, src_dir: &Path, dst: &Path) -> Result<u64> {
        let mut names = Vec::new();
        let mut read_dir = tokio::fs::read_dir(src_dir)
            .await
            .context(ArchiveSnafu { path: src_dir })?;
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .context(ArchiveSnafu { path: src_dir })?
        {
            let file_type = entry
                .file_type()
                .await
                .context(ArchiveSnafu { path: entry.path() })?;
            if file_type.is_dir() {
                warn!("Unexpected directory in index output: {:?}", entry.path());
                continue;
            }
            names.push(entry.file_name());
        }
        names.sort();

        let mut blob = Vec::from(*FLAT_ARCHIVE_MAGIC);
        for name in names {
            let path = src_dir.join(&name);
            let data = tokio::fs::read(&path)
                .await
                .context(ArchiveSnafu { path: &path })?;
            let name = name.to_string_lossy();
            blob.extend_from_slice(&(name.len() as u16).to_le_bytes());
            blob.extend_from_slice(name.as_bytes());
            blob.extend_from_slice(&(data.len() as u64).to_le_bytes());
            blob.extend_from_slice(&data);
        }

        let size = blob.len() as u64;
        tokio::fs::write(dst, blob)
            .await
            .context(ArchiveSnafu { path: dst })?;
        Ok(size)
    }
}
