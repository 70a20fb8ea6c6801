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

pub mod external_provider;
mod intermediate_rw;
mod merge_stream;

use std::collections::BTreeMap;
use std::mem;
use std::sync::Arc;

use futures::{stream, AsyncWrite, Stream};
use roaring::RoaringBitmap;
use snafu::ensure;

use crate::inverted_index::create::external_provider::ExternalTempFileProvider;
use crate::inverted_index::create::intermediate_rw::{IntermediateReader, IntermediateWriter};
use crate::inverted_index::create::merge_stream::MergeSortedStream;
use crate::inverted_index::error::{DictIdOutOfBoundsSnafu, Result};
use crate::inverted_index::format::writer::PostingFileWriter;
use crate::{DictId, RowId};

/// Stream of `(dictionary id, row-id set)` pairs, yielded in ascending
/// dictionary-id order.
pub type PostingStream = Box<dyn Stream<Item = Result<(DictId, RoaringBitmap)>> + Send + Unpin>;

/// Approximate heap cost of one new posting entry in the buffer.
const ENTRY_OVERHEAD: usize = 48;

/// Approximate heap cost of one row id added to a posting set.
const ROW_ID_COST: usize = 4;

/// Builds the bitmap posting lists of one dictionary-encoded column.
///
/// Accepts rows in ascending row order. The in-memory buffer is dumped to an
/// intermediate file through the [`ExternalTempFileProvider`] whenever the
/// estimated memory usage crosses the threshold, keeping resident state
/// bounded regardless of cardinality.
pub struct BitmapIndexCreator {
    /// Column this creator builds postings for, also the key of its
    /// intermediate files.
    column_name: String,

    /// Number of distinct dictionary ids; ids must fall in `0..cardinality`.
    cardinality: u32,

    /// Total number of rows, recorded in the posting file footer.
    total_docs: u32,

    /// Manages creation and access of intermediate spill files.
    temp_file_provider: Arc<dyn ExternalTempFileProvider>,

    /// In-memory postings awaiting a dump or the final merge.
    values_buffer: BTreeMap<DictId, RoaringBitmap>,

    /// Count of rows pushed so far, used to name intermediate files.
    rows_pushed: u32,

    /// Estimated heap usage of `values_buffer`.
    current_memory_usage: usize,

    /// Usage level at which the buffer is dumped to an intermediate file.
    memory_usage_threshold: usize,
}

impl BitmapIndexCreator {
    pub fn new(
        column_name: String,
        cardinality: u32,
        total_docs: u32,
        temp_file_provider: Arc<dyn ExternalTempFileProvider>,
        memory_usage_threshold: usize,
    ) -> Self {
        Self {
            column_name,
            cardinality,
            total_docs,
            temp_file_provider,
            values_buffer: BTreeMap::new(),
            rows_pushed: 0,
            current_memory_usage: 0,
            memory_usage_threshold,
        }
    }

    /// Records that `row_id` contains the value `dict_id`.
    pub async fn push(&mut self, row_id: RowId, dict_id: DictId) -> Result<()> {
        self.rows_pushed = self.rows_pushed.max(row_id + 1);
        let memory_diff = self.record(row_id, dict_id)?;
        self.may_dump_buffer(memory_diff).await
    }

    /// Records every dictionary id of a multi-valued row. Duplicate ids
    /// within one row collapse to a single posting.
    pub async fn push_many(&mut self, row_id: RowId, dict_ids: &[DictId]) -> Result<()> {
        self.rows_pushed = self.rows_pushed.max(row_id + 1);
        let mut memory_diff = 0;
        for dict_id in dict_ids {
            memory_diff += self.record(row_id, *dict_id)?;
        }
        self.may_dump_buffer(memory_diff).await
    }

    /// Merges the live buffer with all intermediate files and writes the
    /// posting file, returning its size in bytes.
    pub async fn finish(
        &mut self,
        writer: impl AsyncWrite + Send + Unpin,
    ) -> Result<u64> {
        let readers = self
            .temp_file_provider
            .read_all(&self.column_name)
            .await?;

        let buffered = mem::take(&mut self.values_buffer).into_iter();
        let mut merged: PostingStream = Box::new(stream::iter(buffered.map(Ok)));
        for reader in readers {
            let intermediate = IntermediateReader::new(reader).into_stream().await?;
            merged = MergeSortedStream::merge(merged, Box::new(intermediate));
        }

        PostingFileWriter::new(writer, self.cardinality, self.total_docs, merged)
            .write()
            .await
    }

    fn record(&mut self, row_id: RowId, dict_id: DictId) -> Result<usize> {
        ensure!(
            dict_id < self.cardinality,
            DictIdOutOfBoundsSnafu {
                dict_id,
                cardinality: self.cardinality,
            }
        );

        let mut diff = 0;
        let bitmap = self.values_buffer.entry(dict_id).or_insert_with(|| {
            diff += ENTRY_OVERHEAD;
            RoaringBitmap::new()
        });
        if bitmap.insert(row_id) {
            diff += ROW_ID_COST;
        }
        Ok(diff)
    }

    /// Dumps the buffer to a new intermediate file once usage crosses the
    /// threshold.
    async fn may_dump_buffer(&mut self, memory_diff: usize) -> Result<()> {
        self.current_memory_usage += memory_diff;
        if self.current_memory_usage < self.memory_usage_threshold || self.values_buffer.is_empty()
        {
            return Ok(());
        }

        let values = mem::take(&mut self.values_buffer);
        let file_id = format!("{:012}", self.rows_pushed);
        let writer = self
            .temp_file_provider
            .create(&self.column_name, &file_id)
            .await?;
        IntermediateWriter::new(writer).write_all(values).await?;

        self.current_memory_usage = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;
    use crate::inverted_index::create::external_provider::{
        FsTempFileProvider, MockExternalTempFileProvider,
    };
    use crate::inverted_index::format::reader::PostingFileReader;

    async fn build_and_read(
        rows: &[Vec<DictId>],
        cardinality: u32,
        threshold: usize,
    ) -> Vec<Vec<RowId>> {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(FsTempFileProvider::new(dir.path().join("intm")));

        let mut creator = BitmapIndexCreator::new(
            "test".to_string(),
            cardinality,
            rows.len() as u32,
            provider,
            threshold,
        );
        for (row, dict_ids) in rows.iter().enumerate() {
            creator.push_many(row as RowId, dict_ids).await.unwrap();
        }

        let mut out = Vec::new();
        creator.finish(&mut out).await.unwrap();

        let reader = PostingFileReader::new(bytes::Bytes::from(out)).unwrap();
        assert_eq!(reader.cardinality(), cardinality);
        (0..cardinality)
            .map(|id| reader.get(id).unwrap().iter().collect())
            .collect()
    }

    #[tokio::test]
    async fn test_single_value_postings() {
        // rows [2, 0, 2, 1] => {0: [1], 1: [3], 2: [0, 2]}
        let rows = vec![vec![2], vec![0], vec![2], vec![1]];
        let postings = build_and_read(&rows, 3, usize::MAX).await;
        assert_eq!(postings, vec![vec![1], vec![3], vec![0, 2]]);
    }

    #[tokio::test]
    async fn test_multi_value_postings() {
        // rows [{0,1}, {1}, {0}] => {0: [0, 2], 1: [0, 1]}
        let rows = vec![vec![0, 1], vec![1], vec![0]];
        let postings = build_and_read(&rows, 2, usize::MAX).await;
        assert_eq!(postings, vec![vec![0, 2], vec![0, 1]]);
    }

    #[tokio::test]
    async fn test_duplicate_ids_in_row_yield_set() {
        let rows = vec![vec![1, 1, 1], vec![1]];
        let postings = build_and_read(&rows, 2, usize::MAX).await;
        assert_eq!(postings, vec![vec![], vec![0, 1]]);
    }

    #[tokio::test]
    async fn test_unindexed_ids_get_empty_postings() {
        let rows = vec![vec![4], vec![4]];
        let postings = build_and_read(&rows, 6, usize::MAX).await;
        assert_eq!(
            postings,
            vec![vec![], vec![], vec![], vec![], vec![0, 1], vec![]]
        );
    }

    #[tokio::test]
    async fn test_spill_equivalence() {
        let mut rng = rand::thread_rng();
        let cardinality = 17u32;
        let rows: Vec<Vec<DictId>> = (0..500)
            .map(|_| {
                let n = rng.gen_range(0..4);
                (0..n).map(|_| rng.gen_range(0..cardinality)).collect()
            })
            .collect();

        // in-memory only, spill-every-row, and mixed must agree
        let in_memory = build_and_read(&rows, cardinality, usize::MAX).await;
        let spilled = build_and_read(&rows, cardinality, 0).await;
        let mixed = build_and_read(&rows, cardinality, 512).await;
        assert_eq!(in_memory, spilled);
        assert_eq!(in_memory, mixed);
    }

    #[tokio::test]
    async fn test_dict_id_out_of_bounds() {
        let mut provider = MockExternalTempFileProvider::new();
        provider.expect_create().never();
        let mut creator =
            BitmapIndexCreator::new("test".to_string(), 3, 1, Arc::new(provider), usize::MAX);

        let res = creator.push(0, 3).await;
        assert!(matches!(
            res,
            Err(crate::inverted_index::error::Error::DictIdOutOfBounds { .. })
        ));
    }

    #[tokio::test]
    async fn test_no_dump_below_threshold() {
        let mut provider = MockExternalTempFileProvider::new();
        provider.expect_create().never();
        provider.expect_read_all().returning(|_| Ok(vec![]));

        let mut creator =
            BitmapIndexCreator::new("test".to_string(), 4, 3, Arc::new(provider), usize::MAX);
        for (row, id) in [(0u32, 1u32), (1, 2), (2, 1)] {
            creator.push(row, id).await.unwrap();
        }

        let mut out = Vec::new();
        creator.finish(&mut out).await.unwrap();
        let reader = PostingFileReader::new(bytes::Bytes::from(out)).unwrap();
        assert_eq!(
            reader.get(1).unwrap().iter().collect::<Vec<_>>(),
            vec![0, 2]
        );
    }
}
