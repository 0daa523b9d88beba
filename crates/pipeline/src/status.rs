use crate::batch::Stage;
use serde::Serialize;

/// Outcome of one build over a set of posts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    pub posts: usize,
    pub indexed: usize,
    pub failures: Vec<PostFailure>,
    /// Posts that reached the related stage without an embedding.
    pub missing_embeddings: usize,
    /// Index invariant breaches; these also appear in `failures`.
    pub consistency_violations: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostFailure {
    pub path: String,
    pub stage: Stage,
    pub reason: String,
}

impl BuildReport {
    /// No post failed at any stage.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} posts, {} indexed, {} failed, {} without embedding, {} consistency violations in {} ms",
            self.posts,
            self.indexed,
            self.failures.len(),
            self.missing_embeddings,
            self.consistency_violations,
            self.elapsed_ms
        )
    }
}
