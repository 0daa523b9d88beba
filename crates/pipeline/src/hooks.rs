use crate::{Pipeline, PipelineError};
use core_types::{ContentKey, PostRecord, SlotId};
use semantic_index::{SelfMatch, SemanticError};
use tracing::{debug, error};

impl Pipeline {
    /// Pre-render hook: embed the post's raw content, attach the vector as
    /// `embedding_vector`, and index it under the post's path.
    pub async fn before_post_render(&self, post: &mut PostRecord) -> Result<SlotId, PipelineError> {
        let vector = self.embed_post(post).await?;
        self.attach_and_index(post, vector)
    }

    pub(crate) async fn embed_post(&self, post: &PostRecord) -> Result<Vec<f32>, PipelineError> {
        self.embedder
            .embed(&post.content)
            .await
            .map_err(|source| PipelineError::Embed {
                key: post.path.clone(),
                source,
            })
    }

    /// A vector of the wrong length is dropped. Any other indexing failure
    /// keeps the vector attached, so the post can still be given related posts
    /// at render time.
    pub(crate) fn attach_and_index(
        &self,
        post: &mut PostRecord,
        vector: Vec<f32>,
    ) -> Result<SlotId, PipelineError> {
        let indexed = self.index.lock().index_content(&post.path, &vector);
        match indexed {
            Ok(slot) => {
                post.embedding_vector = Some(vector);
                debug!(key = %post.path, %slot, "post indexed");
                Ok(slot)
            }
            Err(source) => {
                if !matches!(source, SemanticError::DimensionMismatch { .. }) {
                    post.embedding_vector = Some(vector);
                }
                Err(PipelineError::Index {
                    key: post.path.clone(),
                    source,
                })
            }
        }
    }

    /// Related-content query: nearest posts to this one, closest first,
    /// attached as `related_posts`. A post without an embedding gets none.
    pub fn related_posts<'p>(&self, post: &'p mut PostRecord) -> Result<&'p [String], PipelineError> {
        let Some(query) = post.embedding_vector.as_deref() else {
            debug!(key = %post.path, "no embedding; skipping related posts");
            post.related_posts.clear();
            return Ok(&post.related_posts);
        };

        let found = {
            let index = self.index.lock();
            let self_match = index
                .slot_of(&post.path)
                .map_or(SelfMatch::None, SelfMatch::Slot);
            index.find_related(query, self.neighbors, self_match)
        };

        match found {
            Ok(keys) => {
                post.related_posts = keys.into_iter().map(ContentKey::into_string).collect();
                Ok(&post.related_posts)
            }
            Err(source) => {
                let err = PipelineError::Related {
                    key: post.path.clone(),
                    source,
                };
                if err.is_consistency_violation() {
                    error!(key = %post.path, error = %err, "related-content index is inconsistent");
                }
                post.related_posts.clear();
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use core_types::config::Metric;
    use embedder::{EmbedError, Embedder};
    use semantic_index::RelatedIndex;
    use std::sync::Arc;

    /// Reads the vector straight out of the content, e.g. "1,0".
    struct LiteralEmbedder;

    #[async_trait]
    impl Embedder for LiteralEmbedder {
        fn name(&self) -> &'static str {
            "literal"
        }

        fn dimensions(&self) -> usize {
            2
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
            text.split(',')
                .map(|p| {
                    p.trim()
                        .parse::<f32>()
                        .map_err(|e| EmbedError::Malformed(e.to_string()))
                })
                .collect()
        }
    }

    fn pipeline(capacity: usize, neighbors: usize) -> Pipeline {
        Pipeline::new(
            Arc::new(LiteralEmbedder),
            RelatedIndex::flat(2, capacity, Metric::L2),
            neighbors,
        )
    }

    #[tokio::test]
    async fn pre_render_attaches_vector_and_assigns_slots() {
        let p = pipeline(3, 2);
        let mut a = PostRecord::new("a", "1,0");
        let mut b = PostRecord::new("b", "0,1");

        assert_eq!(p.before_post_render(&mut a).await.unwrap(), SlotId(0));
        assert_eq!(p.before_post_render(&mut b).await.unwrap(), SlotId(1));
        assert_eq!(a.embedding_vector.as_deref(), Some(&[1.0, 0.0][..]));
        assert_eq!(p.indexed(), 2);

        // Same path again reuses the slot.
        let mut a2 = PostRecord::new("a", "0,0");
        assert_eq!(p.before_post_render(&mut a2).await.unwrap(), SlotId(0));
        assert_eq!(p.indexed(), 2);
    }

    #[tokio::test]
    async fn related_posts_excludes_the_post_itself() {
        let p = pipeline(3, 3);
        let mut posts = vec![
            PostRecord::new("a", "1,0"),
            PostRecord::new("b", "0,1"),
            PostRecord::new("c", "1,1"),
        ];
        for post in &mut posts {
            p.before_post_render(post).await.unwrap();
        }

        let related = p.related_posts(&mut posts[0]).unwrap().to_vec();
        assert_eq!(related, vec!["c".to_string(), "b".to_string()]);
        assert_eq!(posts[0].related_posts, related);
    }

    #[test]
    fn missing_embedding_yields_empty_list() {
        let p = pipeline(3, 5);
        let mut post = PostRecord::new("draft", "");
        post.related_posts = vec!["stale".into()];
        assert!(p.related_posts(&mut post).unwrap().is_empty());
        assert!(post.related_posts.is_empty());
    }

    #[tokio::test]
    async fn over_capacity_post_keeps_vector_but_is_not_registered() {
        let p = pipeline(1, 2);
        let mut a = PostRecord::new("a", "1,0");
        let mut b = PostRecord::new("b", "0,1");
        p.before_post_render(&mut a).await.unwrap();

        let err = p.before_post_render(&mut b).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Index {
                source: SemanticError::CapacityExceeded { capacity: 1 },
                ..
            }
        ));
        assert!(b.embedding_vector.is_some());
        assert_eq!(p.indexed(), 1);

        // Unregistered posts exclude nothing and still see their neighbours.
        assert_eq!(p.related_posts(&mut b).unwrap(), ["a".to_string()]);
    }

    #[tokio::test]
    async fn embed_failure_leaves_post_untouched() {
        let p = pipeline(2, 2);
        let mut post = PostRecord::new("bad", "not,a,vector");
        let err = p.before_post_render(&mut post).await.unwrap_err();
        assert!(matches!(err, PipelineError::Embed { .. }));
        assert!(post.embedding_vector.is_none());
        assert_eq!(p.indexed(), 0);
    }

    #[tokio::test]
    async fn wrong_length_vector_is_a_dimension_error() {
        let p = pipeline(2, 2);
        let mut post = PostRecord::new("3d", "1,2,3");
        let err = p.before_post_render(&mut post).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Index {
                source: SemanticError::DimensionMismatch {
                    expected: 2,
                    actual: 3
                },
                ..
            }
        ));
        assert!(post.embedding_vector.is_none());
        assert_eq!(p.indexed(), 0);
    }
}
