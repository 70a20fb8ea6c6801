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

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{ready, Stream, StreamExt};
use roaring::RoaringBitmap;

use crate::inverted_index::create::PostingStream;
use crate::inverted_index::error::Result;
use crate::DictId;

/// Merges two ascending posting streams into one, unioning the row-id sets
/// of equal dictionary ids.
pub struct MergeSortedStream {
    lhs: Option<PostingStream>,
    rhs: Option<PostingStream>,

    lhs_item: Option<(DictId, RoaringBitmap)>,
    rhs_item: Option<(DictId, RoaringBitmap)>,
}

impl MergeSortedStream {
    pub fn merge(lhs: PostingStream, rhs: PostingStream) -> PostingStream {
        Box::new(MergeSortedStream {
            lhs: Some(lhs),
            rhs: Some(rhs),
            lhs_item: None,
            rhs_item: None,
        })
    }
}

impl Stream for MergeSortedStream {
    type Item = Result<(DictId, RoaringBitmap)>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        if this.lhs_item.is_none() {
            if let Some(stream) = this.lhs.as_mut() {
                match ready!(stream.poll_next_unpin(cx)) {
                    Some(Ok(item)) => this.lhs_item = Some(item),
                    Some(Err(e)) => return Poll::Ready(Some(Err(e))),
                    None => this.lhs = None, // exhausted
                }
            }
        }
        if this.rhs_item.is_none() {
            if let Some(stream) = this.rhs.as_mut() {
                match ready!(stream.poll_next_unpin(cx)) {
                    Some(Ok(item)) => this.rhs_item = Some(item),
                    Some(Err(e)) => return Poll::Ready(Some(Err(e))),
                    None => this.rhs = None, // exhausted
                }
            }
        }

        Poll::Ready(match (this.lhs_item.take(), this.rhs_item.take()) {
            (Some((lhs_id, lhs_map)), Some((rhs_id, rhs_map))) => match lhs_id.cmp(&rhs_id) {
                std::cmp::Ordering::Less => {
                    this.rhs_item = Some((rhs_id, rhs_map));
                    Some(Ok((lhs_id, lhs_map)))
                }
                std::cmp::Ordering::Greater => {
                    this.lhs_item = Some((lhs_id, lhs_map));
                    Some(Ok((rhs_id, rhs_map)))
                }
                std::cmp::Ordering::Equal => Some(Ok((lhs_id, lhs_map | rhs_map))),
            },
            (Some(lhs_item), None) => Some(Ok(lhs_item)),
            (None, Some(rhs_item)) => Some(Ok(rhs_item)),
            (None, None) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use futures::{stream, TryStreamExt};

    use super::*;

    fn postings(items: Vec<(DictId, Vec<u32>)>) -> PostingStream {
        Box::new(stream::iter(items.into_iter().map(|(id, rows)| {
            Ok((id, rows.into_iter().collect::<RoaringBitmap>()))
        })))
    }

    async fn collect(stream: PostingStream) -> Vec<(DictId, Vec<u32>)> {
        stream
            .map_ok(|(id, map)| (id, map.iter().collect()))
            .try_collect()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_merge_disjoint() {
        let merged = MergeSortedStream::merge(
            postings(vec![(0, vec![1]), (4, vec![2])]),
            postings(vec![(2, vec![0]), (6, vec![3])]),
        );
        assert_eq!(
            collect(merged).await,
            vec![(0, vec![1]), (2, vec![0]), (4, vec![2]), (6, vec![3])]
        );
    }

    #[tokio::test]
    async fn test_merge_unions_equal_ids() {
        let merged = MergeSortedStream::merge(
            postings(vec![(1, vec![0, 2]), (3, vec![5])]),
            postings(vec![(1, vec![2, 4]), (2, vec![1])]),
        );
        assert_eq!(
            collect(merged).await,
            vec![(1, vec![0, 2, 4]), (2, vec![1]), (3, vec![5])]
        );
    }

    #[tokio::test]
    async fn test_merge_one_side_empty() {
        let merged = MergeSortedStream::merge(
            postings(vec![]),
            postings(vec![(0, vec![0]), (1, vec![1])]),
        );
        assert_eq!(collect(merged).await, vec![(0, vec![0]), (1, vec![1])]);
    }

    #[tokio::test]
    async fn test_merge_both_empty() {
        let merged = MergeSortedStream::merge(postings(vec![]), postings(vec![]));
        assert!(collect(merged).await.is_empty());
    }
}
