use crate::status::{BuildReport, PostFailure};
use crate::{Pipeline, PipelineError};
use core_types::PostRecord;
use futures::{StreamExt, stream};
use serde::Serialize;
use std::time::Instant;
use tracing::{info, warn};

/// Build phase a post has just finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Index,
    Related,
}

impl Pipeline {
    /// Run both hooks over every post: pre-render for all posts first, then
    /// related posts. A failing post is recorded and skipped; the rest of the
    /// batch carries on.
    pub async fn process_posts(&self, posts: &mut [PostRecord]) -> BuildReport {
        self.process_posts_with(posts, |_, _| {}).await
    }

    /// Like [`Pipeline::process_posts`], calling `on_step` after each post
    /// completes a stage (used for progress reporting).
    ///
    /// Embeddings are computed concurrently, but posts are indexed in input
    /// order so slot assignment is reproducible.
    pub async fn process_posts_with<F>(&self, posts: &mut [PostRecord], mut on_step: F) -> BuildReport
    where
        F: FnMut(Stage, &PostRecord),
    {
        let started = Instant::now();
        let mut report = BuildReport {
            posts: posts.len(),
            ..BuildReport::default()
        };

        let mut embedded = stream::iter(posts.iter_mut())
            .map(|post| async move {
                let vector = self.embed_post(post).await;
                (post, vector)
            })
            .buffered(self.concurrency);

        while let Some((post, vector)) = embedded.next().await {
            match vector.and_then(|v| self.attach_and_index(post, v)) {
                Ok(_) => report.indexed += 1,
                Err(err) => record_failure(&mut report, Stage::Index, &post.path, &err),
            }
            on_step(Stage::Index, post);
        }
        drop(embedded);

        for post in posts.iter_mut() {
            let has_embedding = post.embedding_vector.is_some();
            match self.related_posts(post) {
                Ok(_) if !has_embedding => report.missing_embeddings += 1,
                Ok(_) => {}
                Err(err) => record_failure(&mut report, Stage::Related, &post.path, &err),
            }
            on_step(Stage::Related, post);
        }

        report.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            posts = report.posts,
            indexed = report.indexed,
            failed = report.failures.len(),
            missing_embeddings = report.missing_embeddings,
            consistency_violations = report.consistency_violations,
            elapsed_ms = report.elapsed_ms,
            "related-content build finished"
        );
        report
    }
}

fn record_failure(report: &mut BuildReport, stage: Stage, path: &str, err: &PipelineError) {
    if err.is_consistency_violation() {
        report.consistency_violations += 1;
    } else {
        warn!(key = path, ?stage, error = %err, "post skipped");
    }
    report.failures.push(PostFailure {
        path: path.to_owned(),
        stage,
        reason: err.to_string(),
    });
}
