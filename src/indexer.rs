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

//! Per-segment orchestration of inverted index builds.
//!
//! [`SegmentIndexer`] walks the configured columns of one immutable segment
//! and builds, per column, either a bitmap posting index (dictionary-encoded
//! scalars) or a document index (complex objects). Each column build is
//! bracketed by a zero-length marker file: the marker is created before the
//! first output byte and removed only after layout-specific finalization, so
//! an interrupted build is detected and redone on the next run while a
//! finished build is never repeated.

mod marker;
mod statistics;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use snafu::{ensure, ResultExt};
use tokio_util::compat::TokioAsyncWriteCompatExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::archive::IndexArchiver;
use crate::directory::{IndexType, SegmentDirectoryWriter, BITMAP_INDEX_FILE_EXTENSION};
use crate::document_index::create::{DocumentIndexCreator, TantivyDocumentIndexCreator};
use crate::document_index::object::{DecoderRegistry, ObjectDecoder, ObjectType};
use crate::error::{
    BuildDocumentIndexSnafu, BuildPostingIndexSnafu, DirectoryIoSnafu,
    MultiValueObjectColumnSnafu, ReadForwardIndexSnafu, Result,
};
use crate::forward_index::error::UnsupportedEncodingSnafu;
use crate::forward_index::{ForwardIndexReader, VarChunkReader};
use crate::indexer::marker::BuildMarker;
use crate::indexer::statistics::Statistics;
use crate::inverted_index::create::external_provider::{
    ExternalTempFileProvider, FsTempFileProvider,
};
use crate::inverted_index::create::BitmapIndexCreator;
use crate::metadata::{ColumnMetadata, SegmentMetadata, StorageLayout};

/// Directory name suffix of a document index in the multi-file layout.
pub const DOC_INDEX_DIR_EXTENSION: &str = ".doc.inv";

/// Suffix of the transient archive blob a document index becomes on the
/// consolidated path.
const DOC_INDEX_BLOB_EXTENSION: &str = ".doc.blob";

/// Segment-local directory holding intermediate spill files.
const INTERMEDIATE_DIR: &str = "__intm";

/// Configuration of one index build run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexBuildConfig {
    /// Columns to build inverted indexes for.
    pub columns: Vec<String>,

    /// Memory threshold of the bitmap posting buffer; crossing it spills
    /// the buffer to an intermediate file.
    pub memory_usage_threshold: usize,

    /// Memory budget of the document-indexing engine.
    pub document_memory_limit: usize,

    /// Analyzer configuration applied to document indexes.
    pub document_index: crate::document_index::Config,
}

impl Default for IndexBuildConfig {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            memory_usage_threshold: 64 * 1024 * 1024,
            document_memory_limit: 50 * 1024 * 1024,
            document_index: crate::document_index::Config::default(),
        }
    }
}

/// How one column's build ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// A new index was built and finalized.
    Built,

    /// A finished index was already in place.
    UpToDate,

    /// The column was skipped because its object type has no decoder.
    Skipped,
}

/// Per-column result of a build run.
#[derive(Debug)]
pub struct ColumnIndexOutput {
    pub column_name: String,
    pub outcome: BuildOutcome,
    /// Rows fed to the index. Zero unless `outcome` is [`BuildOutcome::Built`].
    pub rows: usize,
    /// Size of the finished artifact in bytes.
    pub bytes: u64,
}

/// Builds the inverted indexes of one segment, column by column.
pub struct SegmentIndexer {
    segment_dir: PathBuf,
    layout: StorageLayout,
    config: IndexBuildConfig,
    decoders: DecoderRegistry,
    archiver: Box<dyn IndexArchiver>,
    columns: Vec<ColumnMetadata>,
}

impl SegmentIndexer {
    /// Creates an indexer over `segment_dir`, keeping only the eligible
    /// columns: configured, present in the metadata, not sorted, and (for
    /// scalars) dictionary-encoded.
    pub fn new(
        segment_dir: impl Into<PathBuf>,
        metadata: &SegmentMetadata,
        config: IndexBuildConfig,
        decoders: DecoderRegistry,
        archiver: Box<dyn IndexArchiver>,
    ) -> SegmentIndexer {
        let mut columns = Vec::with_capacity(config.columns.len());
        for name in &config.columns {
            let Some(column) = metadata.column(name) else {
                debug!(
                    "Column {name} is not present in segment {}, skipping",
                    metadata.segment_name
                );
                continue;
            };
            if column.sorted {
                debug!("Column {name} is sorted, its sorted order serves lookups, skipping");
                continue;
            }
            if column.object_type.is_none() && !column.has_dictionary {
                debug!("Column {name} is a raw scalar without dictionary, skipping");
                continue;
            }
            columns.push(column.clone());
        }

        SegmentIndexer {
            segment_dir: segment_dir.into(),
            layout: metadata.layout,
            config,
            decoders,
            archiver,
            columns,
        }
    }

    /// Builds all eligible columns sequentially, stopping at the first fatal
    /// error. Finished sibling artifacts are kept in that case; the failing
    /// column's marker stays in place so the next run rebuilds it.
    pub async fn build(
        &self,
        directory: &mut dyn SegmentDirectoryWriter,
    ) -> Result<Vec<ColumnIndexOutput>> {
        let temp_root = self
            .segment_dir
            .join(INTERMEDIATE_DIR)
            .join(Uuid::new_v4().to_string());
        let temp_provider = Arc::new(FsTempFileProvider::new(temp_root.clone()));

        let mut outputs = Vec::with_capacity(self.columns.len());
        let mut first_error = None;
        for column in &self.columns {
            let built = if column.object_type.is_some() {
                self.build_document_index(column, directory).await
            } else {
                self.build_bitmap_index(column, directory, temp_provider.clone())
                    .await
            };
            match built {
                Ok(output) => outputs.push(output),
                Err(e) => {
                    first_error = Some(e);
                    break;
                }
            }
        }

        if let Err(e) = tokio::fs::remove_dir_all(&temp_root).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    "Failed to remove intermediate directory {}: {e}",
                    temp_root.display()
                );
            }
        }
        // drop the shared spill area too once no other run holds it
        let _ = tokio::fs::remove_dir(self.segment_dir.join(INTERMEDIATE_DIR)).await;

        match first_error {
            Some(e) => Err(e),
            None => Ok(outputs),
        }
    }

    async fn build_bitmap_index(
        &self,
        column: &ColumnMetadata,
        directory: &mut dyn SegmentDirectoryWriter,
        temp_provider: Arc<FsTempFileProvider>,
    ) -> Result<ColumnIndexOutput> {
        let column_name = column.column_name.as_str();
        let marker = BuildMarker::for_column(&self.segment_dir, column_name);
        let output_path = self
            .segment_dir
            .join(format!("{column_name}{BITMAP_INDEX_FILE_EXTENSION}"));

        if marker.exists().await? {
            info!("Found a stale build marker for column {column_name}, discarding partial output");
            remove_file_if_exists(&output_path).await;
        } else {
            if directory
                .has_index_for(column_name, IndexType::Inverted)
                .await?
            {
                info!("Bitmap index for column {column_name} already exists, skipping");
                return Ok(ColumnIndexOutput {
                    column_name: column_name.to_string(),
                    outcome: BuildOutcome::UpToDate,
                    rows: 0,
                    bytes: 0,
                });
            }
            marker.create().await?;
        }

        let mut stats = Statistics::new("bitmap", column_name.to_string());
        let buffer = directory
            .get_index_for(column_name, IndexType::Forward)
            .await?;
        let reader = ForwardIndexReader::from_column(buffer, column)
            .context(ReadForwardIndexSnafu { column: column_name })?;
        let mut creator = BitmapIndexCreator::new(
            column_name.to_string(),
            column.cardinality,
            column.total_docs,
            temp_provider.clone(),
            self.config.memory_usage_threshold,
        );

        {
            let mut guard = stats.record_update();
            match reader {
                ForwardIndexReader::FixedBit(fixed) => {
                    for row in 0..column.total_docs {
                        let dict_id = fixed
                            .get_dict_id(row)
                            .context(ReadForwardIndexSnafu { column: column_name })?;
                        creator
                            .push(row, dict_id)
                            .await
                            .context(BuildPostingIndexSnafu { column: column_name })?;
                    }
                }
                ForwardIndexReader::FixedBitMultiValue(multi) => {
                    let mut ids = vec![0u32; column.max_values_per_row as usize];
                    for row in 0..column.total_docs {
                        let count = multi
                            .get_dict_ids(row, &mut ids)
                            .context(ReadForwardIndexSnafu { column: column_name })?;
                        creator
                            .push_many(row, &ids[..count])
                            .await
                            .context(BuildPostingIndexSnafu { column: column_name })?;
                    }
                }
                ForwardIndexReader::VarChunk(_) => {
                    // eligibility keeps raw columns off the bitmap path
                    return UnsupportedEncodingSnafu {
                        reason: "raw byte column on the bitmap path",
                    }
                    .fail()
                    .context(ReadForwardIndexSnafu { column: column_name });
                }
            }
            guard.inc_row_count(column.total_docs as usize);
        }

        {
            let mut guard = stats.record_finish();
            let file = tokio::fs::File::create(&output_path)
                .await
                .context(DirectoryIoSnafu { path: &output_path })?;
            let mut writer = file.compat_write();
            let size = creator
                .finish(&mut writer)
                .await
                .context(BuildPostingIndexSnafu { column: column_name })?;
            guard.inc_byte_count(size);
        }

        {
            let _guard = stats.record_cleanup();
            if let Err(e) = temp_provider.cleanup(column_name).await {
                warn!("Failed to clean up intermediate files of column {column_name}: {e}");
            }
        }

        if self.layout == StorageLayout::SingleFile {
            directory
                .write_index_as_single_file(column_name, &output_path, IndexType::Inverted)
                .await?;
        }
        marker.remove().await?;

        Ok(ColumnIndexOutput {
            column_name: column_name.to_string(),
            outcome: BuildOutcome::Built,
            rows: stats.row_count(),
            bytes: stats.byte_count(),
        })
    }

    async fn build_document_index(
        &self,
        column: &ColumnMetadata,
        directory: &mut dyn SegmentDirectoryWriter,
    ) -> Result<ColumnIndexOutput> {
        let column_name = column.column_name.as_str();

        // shape and decoder resolution precede any marker or output
        ensure!(
            column.single_value,
            MultiValueObjectColumnSnafu { column: column_name }
        );
        let tag = column.object_type.as_deref().unwrap_or_default();
        let object_type = ObjectType::parse(tag);
        let decoder = match self.decoders.resolve(&object_type) {
            Ok(decoder) => decoder,
            Err(e) => {
                warn!("No decoder for column {column_name} (object type {tag}), skipping: {e}");
                return Ok(ColumnIndexOutput {
                    column_name: column_name.to_string(),
                    outcome: BuildOutcome::Skipped,
                    rows: 0,
                    bytes: 0,
                });
            }
        };

        let marker = BuildMarker::for_column(&self.segment_dir, column_name);
        let output_dir = self
            .segment_dir
            .join(format!("{column_name}{DOC_INDEX_DIR_EXTENSION}"));
        let blob_path = self
            .segment_dir
            .join(format!("{column_name}{DOC_INDEX_BLOB_EXTENSION}"));

        if marker.exists().await? {
            info!("Found a stale build marker for column {column_name}, discarding partial output");
            remove_dir_if_exists(&output_dir).await;
            remove_file_if_exists(&blob_path).await;
        } else {
            let built = directory
                .has_index_for(column_name, IndexType::Inverted)
                .await?
                || tokio::fs::try_exists(&output_dir)
                    .await
                    .context(DirectoryIoSnafu { path: &output_dir })?;
            if built {
                info!("Document index for column {column_name} already exists, skipping");
                return Ok(ColumnIndexOutput {
                    column_name: column_name.to_string(),
                    outcome: BuildOutcome::UpToDate,
                    rows: 0,
                    bytes: 0,
                });
            }
            marker.create().await?;
        }

        let mut stats = Statistics::new("document", column_name.to_string());
        let buffer = directory
            .get_index_for(column_name, IndexType::Forward)
            .await?;
        let reader = ForwardIndexReader::from_column(buffer, column)
            .context(ReadForwardIndexSnafu { column: column_name })?;
        let ForwardIndexReader::VarChunk(reader) = reader else {
            return UnsupportedEncodingSnafu {
                reason: "complex column must store raw byte values",
            }
            .fail()
            .context(ReadForwardIndexSnafu { column: column_name });
        };

        let mut creator = TantivyDocumentIndexCreator::new(
            &output_dir,
            self.config.document_index.clone(),
            self.config.document_memory_limit,
        )
        .await
        .context(BuildDocumentIndexSnafu { column: column_name })?;

        let fed = {
            let mut guard = stats.record_update();
            let fed = feed_documents(column, reader, decoder.as_ref(), &mut creator).await;
            if fed.is_ok() {
                guard.inc_row_count(column.total_docs as usize);
            }
            fed
        };
        if let Err(e) = fed {
            if let Err(abort_err) = creator.abort().await {
                warn!("Failed to abort document index of column {column_name}: {abort_err}");
            }
            return Err(e);
        }

        let bytes = {
            let mut guard = stats.record_finish();
            creator
                .finish()
                .await
                .context(BuildDocumentIndexSnafu { column: column_name })?;

            let size = match self.layout {
                StorageLayout::SingleFile => {
                    let size = self.archiver.archive_dir(&output_dir, &blob_path).await?;
                    directory
                        .write_index_as_single_file(column_name, &blob_path, IndexType::Inverted)
                        .await?;
                    remove_dir_if_exists(&output_dir).await;
                    size
                }
                StorageLayout::MultiFile => dir_size(&output_dir).await?,
            };
            guard.inc_byte_count(size);
            size
        };

        marker.remove().await?;

        Ok(ColumnIndexOutput {
            column_name: column_name.to_string(),
            outcome: BuildOutcome::Built,
            rows: stats.row_count(),
            bytes,
        })
    }
}

/// Feeds every row of the column to the document index, in row order so the
/// engine-assigned document id equals the row id.
async fn feed_documents(
    column: &ColumnMetadata,
    mut reader: VarChunkReader,
    decoder: &dyn ObjectDecoder,
    creator: &mut dyn DocumentIndexCreator,
) -> Result<()> {
    let column_name = column.column_name.as_str();
    for row in 0..column.total_docs {
        let raw = reader
            .get_bytes(row)
            .context(ReadForwardIndexSnafu { column: column_name })?;
        let fields = decoder
            .decode(&raw)
            .context(BuildDocumentIndexSnafu { column: column_name })?;
        creator
            .push(&fields)
            .await
            .context(BuildDocumentIndexSnafu { column: column_name })?;
    }
    Ok(())
}

async fn dir_size(dir: &Path) -> Result<u64> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .context(DirectoryIoSnafu { path: dir })?;
    let mut total = 0;
    while let Some(entry) = entries
        .next_entry()
        .await
        .context(DirectoryIoSnafu { path: dir })?
    {
        let meta = entry
            .metadata()
            .await
            .context(DirectoryIoSnafu { path: dir })?;
        if meta.is_file() {
            total += meta.len();
        }
    }
    Ok(total)
}

async fn remove_file_if_exists(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove {}: {e}", path.display());
        }
    }
}

async fn remove_dir_if_exists(path: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove {}: {e}", path.display());
        }
    }
}
