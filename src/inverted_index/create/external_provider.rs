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

use std::path::PathBuf;

use async_trait::async_trait;
use futures::{AsyncRead, AsyncWrite};
use snafu::ResultExt;
use tokio_util::compat::{TokioAsyncReadCompatExt, TokioAsyncWriteCompatExt};
use tracing::debug;

use crate::inverted_index::error::{Result, TempFileSnafu};

/// Source of intermediate files that hold dumped posting buffers.
#[mockall::automock]
#[async_trait]
pub trait ExternalTempFileProvider: Send + Sync {
    /// Creates a new intermediate file for `column_name`. `file_id` must be
    /// unique within the column.
    async fn create(
        &self,
        column_name: &str,
        file_id: &str,
    ) -> Result<Box<dyn AsyncWrite + Unpin + Send>>;

    /// Opens every intermediate file previously created for `column_name`.
    async fn read_all(&self, column_name: &str)
        -> Result<Vec<Box<dyn AsyncRead + Unpin + Send>>>;

    /// Removes all intermediate files of `column_name`.
    async fn cleanup(&self, column_name: &str) -> Result<()>;
}

/// Stores intermediate files under `{root}/{column_name}/{file_id}.im`.
pub struct FsTempFileProvider {
    root: PathBuf,
}

impl FsTempFileProvider {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn column_dir(&self, column_name: &str) -> PathBuf {
        self.root.join(column_name)
    }
}

#[async_trait]
impl ExternalTempFileProvider for FsTempFileProvider {
    async fn create(
        &self,
        column_name: &str,
        file_id: &str,
    ) -> Result<Box<dyn AsyncWrite + Unpin + Send>> {
        let dir = self.column_dir(column_name);
        tokio::fs::create_dir_all(&dir)
            .await
            .context(TempFileSnafu { path: &dir })?;

        let path = dir.join(format!("{file_id}.im"));
        debug!("Creating intermediate file: {}", path.display());
        let file = tokio::fs::File::create(&path)
            .await
            .context(TempFileSnafu { path: &path })?;
        Ok(Box::new(file.compat_write()))
    }

    async fn read_all(
        &self,
        column_name: &str,
    ) -> Result<Vec<Box<dyn AsyncRead + Unpin + Send>>> {
        let dir = self.column_dir(column_name);
        if !dir.exists() {
            return Ok(vec![]);
        }

        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .context(TempFileSnafu { path: &dir })?;
        let mut readers: Vec<Box<dyn AsyncRead + Unpin + Send>> = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .context(TempFileSnafu { path: &dir })?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "im") {
                let file = tokio::fs::File::open(&path)
                    .await
                    .context(TempFileSnafu { path: &path })?;
                readers.push(Box::new(file.compat()));
            }
        }
        Ok(readers)
    }

    async fn cleanup(&self, column_name: &str) -> Result<()> {
        let dir = self.column_dir(column_name);
        if dir.exists() {
            tokio::fs::remove_dir_all(&dir)
                .await
                .context(TempFileSnafu { path: &dir })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    #[tokio::test]
    async fn test_fs_provider_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FsTempFileProvider::new(dir.path().join("intm"));

        let mut w = provider.create("col", "000000000001").await.unwrap();
        w.write_all(b"first").await.unwrap();
        w.close().await.unwrap();
        let mut w = provider.create("col", "000000000002").await.unwrap();
        w.write_all(b"second").await.unwrap();
        w.close().await.unwrap();

        let readers = provider.read_all("col").await.unwrap();
        assert_eq!(readers.len(), 2);
        let mut contents = Vec::new();
        for mut reader in readers {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).await.unwrap();
            contents.push(buf);
        }
        contents.sort();
        assert_eq!(contents, vec![b"first".to_vec(), b"second".to_vec()]);

        provider.cleanup("col").await.unwrap();
        assert!(provider.read_all("col").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fs_provider_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FsTempFileProvider::new(dir.path().join("intm"));
        assert!(provider.read_all("absent").await.unwrap().is_empty());
        provider.cleanup("absent").await.unwrap();
    }
}
