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

use serde_json::{json, Map, Value};
use tempfile::TempDir;

use crate::document_index::create::{DocumentIndexCreator, TantivyDocumentIndexCreator};
use crate::document_index::search::{DocumentIndexSearcher, TantivyDocumentIndexSearcher};
use crate::document_index::{Analyzer, Config};
use crate::RowId;

fn fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => unreachable!("test documents are objects"),
    }
}

fn texts(texts: Vec<&str>) -> Vec<Map<String, Value>> {
    texts
        .into_iter()
        .map(|t| fields(json!({ "text": t })))
        .collect()
}

async fn create_index(docs: Vec<Map<String, Value>>, config: Config) -> TempDir {
    let tempdir = tempfile::tempdir().unwrap();

    let mut creator =
        TantivyDocumentIndexCreator::new(tempdir.path(), config, 1024 * 1024)
            .await
            .unwrap();
    for doc in docs {
        creator.push(&doc).await.unwrap();
    }
    creator.finish().await.unwrap();
    tempdir
}

async fn test_search(
    config: Config,
    docs: Vec<Map<String, Value>>,
    query: &str,
    expected: impl IntoIterator<Item = RowId>,
) {
    let index_path = create_index(docs, config.clone()).await;

    let searcher = TantivyDocumentIndexSearcher::new(index_path.path(), config).unwrap();
    let results = searcher.search(query).await.unwrap();

    let expected = expected.into_iter().collect::<BTreeSet<_>>();
    assert_eq!(results, expected);
}

#[tokio::test]
async fn test_simple_term() {
    test_search(
        Config::default(),
        texts(vec![
            "This is a sample text containing Barack Obama",
            "Another document mentioning Barack",
        ]),
        "text:Barack",
        [0, 1],
    )
    .await;
}

#[tokio::test]
async fn test_negative_term() {
    test_search(
        Config::default(),
        texts(vec!["apple is a fruit", "I like apple", "fruit is healthy"]),
        "text:apple -text:fruit",
        [1],
    )
    .await;
}

#[tokio::test]
async fn test_must_term() {
    test_search(
        Config::default(),
        texts(vec![
            "apple is tasty",
            "I love apples and fruits",
            "apple and fruit are good",
        ]),
        "+text:apple +text:fruit",
        [2],
    )
    .await;
}

#[tokio::test]
async fn test_phrase_term() {
    test_search(
        Config::default(),
        texts(vec![
            "This is a sample text containing Barack Obama",
            "Another document mentioning Barack",
        ]),
        "text:\"Barack Obama\"",
        [0],
    )
    .await;
}

#[tokio::test]
async fn test_multiple_fields() {
    let docs = vec![
        fields(json!({ "title": "intro to storage", "author": "ann" })),
        fields(json!({ "title": "query planning", "author": "bob" })),
        fields(json!({ "title": "storage internals", "author": "bob" })),
    ];
    test_search(Config::default(), docs.clone(), "title:storage", [0, 2]).await;
    test_search(Config::default(), docs.clone(), "author:bob", [1, 2]).await;
    test_search(
        Config::default(),
        docs,
        "+title:storage +author:bob",
        [2],
    )
    .await;
}

#[tokio::test]
async fn test_nested_fields() {
    let docs = vec![
        fields(json!({ "meta": { "lang": "rust" }, "body": "parser" })),
        fields(json!({ "meta": { "lang": "go" }, "body": "scheduler" })),
    ];
    test_search(Config::default(), docs, "meta.lang:rust", [0]).await;
}

#[tokio::test]
async fn test_rows_preserve_push_order() {
    let docs = texts(vec!["z last", "m middle", "a first"]);
    test_search(Config::default(), docs, "text:first", [2]).await;
}

#[tokio::test]
async fn test_config_english_analyzer_case_insensitive() {
    test_search(
        Config {
            case_sensitive: false,
            ..Config::default()
        },
        texts(vec!["Banana is a fruit", "I like apple", "Fruit is healthy"]),
        "text:banana",
        [0],
    )
    .await;
}

#[tokio::test]
async fn test_config_english_analyzer_case_sensitive() {
    test_search(
        Config {
            case_sensitive: true,
            ..Config::default()
        },
        texts(vec!["Banana is a fruit", "I like apple", "Fruit is healthy"]),
        "text:banana",
        [],
    )
    .await;
}

#[tokio::test]
async fn test_config_chinese_analyzer() {
    test_search(
        Config {
            analyzer: Analyzer::Chinese,
            ..Default::default()
        },
        texts(vec!["苹果是一种水果", "我喜欢苹果", "水果很健康"]),
        "text:苹果",
        [0, 1],
    )
    .await;
}

#[tokio::test]
async fn test_abort_removes_index_dir() {
    let tempdir = tempfile::tempdir().unwrap();
    let index_dir = tempdir.path().join("doc_index");

    let mut creator =
        TantivyDocumentIndexCreator::new(&index_dir, Config::default(), 1024 * 1024)
            .await
            .unwrap();
    creator.push(&fields(json!({ "text": "doomed" }))).await.unwrap();
    creator.abort().await.unwrap();

    assert!(!index_dir.exists());
}
