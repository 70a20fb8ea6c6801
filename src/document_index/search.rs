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

use std::collections::BTreeSet;
use std::path::Path;

use async_trait::async_trait;
use snafu::ResultExt;
use tantivy::collector::DocSetCollector;
use tantivy::query::QueryParser;
use tantivy::{Index, IndexReader};

use crate::document_index::create::{
    build_tokenizer, DATA_FIELD_NAME, INDEX_TOKENIZER_NAME, ROWID_FIELD_NAME,
};
use crate::document_index::error::{Result, TantivyParserSnafu, TantivySnafu};
use crate::document_index::Config;
use crate::RowId;

/// `DocumentIndexSearcher` searches a finished document index.
#[async_trait]
pub trait DocumentIndexSearcher: Send + Sync {
    async fn search(&self, query: &str) -> Result<BTreeSet<RowId>>;
}

/// Tantivy-backed searcher over an index directory written by the creator.
pub struct TantivyDocumentIndexSearcher {
    index: Index,
    reader: IndexReader,
}

impl TantivyDocumentIndexSearcher {
    /// Opens the index at `path`. `config` must match the one the index was
    /// created with so query terms tokenize the same way.
    pub fn new(path: impl AsRef<Path>, config: Config) -> Result<Self> {
        let index = Index::open_in_dir(path).context(TantivySnafu)?;
        index
            .tokenizers()
            .register(INDEX_TOKENIZER_NAME, build_tokenizer(&config));
        let reader = index.reader().context(TantivySnafu)?;
        Ok(Self { index, reader })
    }
}

#[async_trait]
impl DocumentIndexSearcher for TantivyDocumentIndexSearcher {
    async fn search(&self, query: &str) -> Result<BTreeSet<RowId>> {
        let searcher = self.reader.searcher();
        let data_field = self
            .index
            .schema()
            .get_field(DATA_FIELD_NAME)
            .context(TantivySnafu)?;

        let parser = QueryParser::for_index(&self.index, vec![data_field]);
        let query = parser.parse_query(query).context(TantivyParserSnafu)?;
        let doc_addrs = searcher
            .search(&query, &DocSetCollector)
            .context(TantivySnafu)?;

        let mut row_ids = BTreeSet::new();
        for doc_addr in doc_addrs {
            let segment_reader = searcher.segment_reader(doc_addr.segment_ord);
            let rowid_column = segment_reader
                .fast_fields()
                .u64(ROWID_FIELD_NAME)
                .context(TantivySnafu)?;
            if let Some(rowid) = rowid_column.first(doc_addr.doc_id) {
                row_ids.insert(rowid as RowId);
            }
        }
        Ok(row_ids)
    }
}
