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

use std::path::{Path, PathBuf};

use snafu::ResultExt;

use crate::error::{MarkerIoSnafu, Result};

/// File name suffix of a build marker.
const MARKER_FILE_EXTENSION: &str = ".inv.inprogress";

/// Zero-length file signalling an index build in progress.
///
/// Created before the first output byte, removed only after the artifact is
/// fully finalized. A marker found at the start of a run therefore proves
/// the previous attempt died mid-build and its output cannot be trusted.
pub(crate) struct BuildMarker {
    path: PathBuf,
}

impl BuildMarker {
    pub fn for_column(segment_dir: &Path, column_name: &str) -> BuildMarker {
        BuildMarker {
            path: segment_dir.join(format!("{column_name}{MARKER_FILE_EXTENSION}")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> Result<bool> {
        tokio::fs::try_exists(&self.path)
            .await
            .context(MarkerIoSnafu { path: &self.path })
    }

    /// Creates the marker. Fails if it already exists, so two concurrent
    /// builds of the same column cannot both proceed.
    pub async fn create(&self) -> Result<()> {
        tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await
            .map(|_| ())
            .context(MarkerIoSnafu { path: &self.path })
    }

    pub async fn remove(&self) -> Result<()> {
        tokio::fs::remove_file(&self.path)
            .await
            .context(MarkerIoSnafu { path: &self.path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_marker_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let marker = BuildMarker::for_column(dir.path(), "host");

        assert!(!marker.exists().await.unwrap());
        marker.create().await.unwrap();
        assert!(marker.exists().await.unwrap());
        assert!(marker.path().ends_with("host.inv.inprogress"));

        // second create must fail while the first marker is alive
        assert!(marker.create().await.is_err());

        marker.remove().await.unwrap();
        assert!(!marker.exists().await.unwrap());
    }
}
