use super::Classifier;
use crate::types::{FinalClassification, ImagePayload};
use crate::Result;
use futures::StreamExt;

pub const DEFAULT_BATCH_CONCURRENCY: usize = 4;

impl Classifier {
    /// Classify many images, up to `concurrency` at a time.
    ///
    /// Requests are independent; each still tries its providers one by one.
    /// Results come back in input order. `None` uses `WILDID_BATCH_CONCURRENCY`
    /// or [`DEFAULT_BATCH_CONCURRENCY`].
    pub async fn classify_batch(
        &self,
        images: &[ImagePayload],
        concurrency: Option<usize>,
    ) -> Vec<Result<FinalClassification>> {
        if images.is_empty() {
            return Vec::new();
        }
        let limit = concurrency
            .or_else(|| {
                std::env::var("WILDID_BATCH_CONCURRENCY")
                    .ok()?
                    .parse::<usize>()
                    .ok()
            })
            .unwrap_or(DEFAULT_BATCH_CONCURRENCY)
            .max(1);

        tracing::debug!(images = images.len(), concurrency = limit, "batch started");

        let mut results: Vec<(usize, Result<FinalClassification>)> =
            futures::stream::iter(images.iter().enumerate())
                .map(|(idx, image)| async move { (idx, self.classify(image).await) })
                .buffer_unordered(limit)
                .collect()
                .await;

        results.sort_by_key(|(idx, _)| *idx);
        results.into_iter().map(|(_, r)| r).collect()
    }
}
