//! Batch processor: snapshot, bounded dispatch, join, fold.

use crate::config::ProcessorConfig;
use crate::error::{BatchError, ItemError};
use crate::outcome::{BatchResult, ItemOutcome};
use crate::pool::WorkerPool;
use itemflow_core::{Item, ItemId, ItemRepository};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Moves every stored item to `PROCESSED`.
pub struct BatchProcessor {
    repository: Arc<dyn ItemRepository>,
    pool: WorkerPool,
    config: ProcessorConfig,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for BatchProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchProcessor")
            .field("pool", &self.pool)
            .field("config", &self.config)
            .field("shutdown", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl BatchProcessor {
    /// Create a processor over a repository, running units on `pool`.
    #[must_use]
    pub fn new(
        repository: Arc<dyn ItemRepository>,
        pool: WorkerPool,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            repository,
            pool,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Use `token` as the parent of every batch's cancellation token, so that
    /// cancelling it interrupts all running batches.
    #[must_use]
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// The pool units run on.
    #[must_use]
    pub const fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Token that cancels every batch started by this processor.
    #[must_use]
    pub const fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Process every item present when the call starts.
    ///
    /// Dropping the returned future cancels the units it dispatched.
    ///
    /// # Errors
    /// Returns `BatchError::Item` naming the first failed id in snapshot
    /// order, `BatchError::Listing` if the snapshot fails, or
    /// `BatchError::PoolClosed` if the pool was shut down.
    pub async fn process_all(&self) -> Result<BatchResult, BatchError> {
        self.run_batch(self.shutdown.child_token()).await
    }

    /// Run a batch on the runtime and return a handle to it.
    #[must_use]
    pub fn spawn(self: &Arc<Self>) -> BatchHandle {
        let cancel = self.shutdown.child_token();
        let processor = Arc::clone(self);
        let token = cancel.clone();
        let handle = tokio::spawn(async move { processor.run_batch(token).await });
        BatchHandle { handle, cancel }
    }

    async fn run_batch(&self, cancel: CancellationToken) -> Result<BatchResult, BatchError> {
        // Units stop at their next suspension point if this future is dropped.
        let _guard = cancel.clone().drop_guard();
        let started = Instant::now();

        if self.pool.is_shutdown() {
            return Err(BatchError::PoolClosed);
        }

        let ids = self
            .repository
            .list_ids()
            .await
            .map_err(BatchError::Listing)?;

        info!(
            items = ids.len(),
            workers = self.pool.size(),
            "Starting batch"
        );

        let mut outcomes: Vec<Option<ItemOutcome>> = ids.iter().map(|_| None).collect();
        let mut units = Vec::with_capacity(ids.len());

        for (index, &id) in ids.iter().enumerate() {
            let slot = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    outcomes[index] = Some(ItemOutcome::Failed(ItemError::Cancelled));
                    break;
                }
                slot = self.pool.acquire() => match slot {
                    Ok(slot) => slot,
                    Err(_) => {
                        outcomes[index] = Some(ItemOutcome::Failed(ItemError::PoolClosed));
                        break;
                    }
                },
            };

            let repository = Arc::clone(&self.repository);
            let delay = self.config.processing_delay;
            let token = cancel.clone();
            let handle = tokio::spawn(async move {
                let _slot = slot;
                process_item(repository.as_ref(), id, delay, &token).await
            });
            units.push((index, handle));
        }

        // Join every dispatched unit before looking at any outcome.
        for (index, handle) in units {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) if e.is_panic() => ItemOutcome::Failed(ItemError::Panicked(e.to_string())),
                Err(_) => ItemOutcome::Failed(ItemError::Cancelled),
            };
            if let ItemOutcome::Failed(e) = &outcome {
                warn!(id = %ids[index], error = %e, "Item failed");
            }
            outcomes[index] = Some(outcome);
        }

        let result = BatchResult::fold(ids.into_iter().zip(outcomes));

        match &result {
            Ok(batch) => info!(
                processed = batch.len(),
                skipped = batch.skipped(),
                elapsed = ?started.elapsed(),
                "Batch completed"
            ),
            Err(e) => warn!(error = %e, "Batch failed"),
        }

        result
    }
}

async fn process_item(
    repository: &dyn ItemRepository,
    id: ItemId,
    delay: Duration,
    cancel: &CancellationToken,
) -> ItemOutcome {
    match run_unit(repository, id, delay, cancel).await {
        Ok(Some(item)) => ItemOutcome::Processed(item),
        Ok(None) => ItemOutcome::Skipped,
        Err(e) => ItemOutcome::Failed(e),
    }
}

async fn run_unit(
    repository: &dyn ItemRepository,
    id: ItemId,
    delay: Duration,
    cancel: &CancellationToken,
) -> Result<Option<Item>, ItemError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(ItemError::Cancelled),
        () = tokio::time::sleep(delay) => {}
    }

    let found = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(ItemError::Cancelled),
        found = repository.find_by_id(id) => found.map_err(ItemError::Fetch)?,
    };

    let Some(mut item) = found else {
        debug!(id = %id, "Item vanished before processing, skipping");
        return Ok(None);
    };

    item.mark_processed();

    let saved = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(ItemError::Cancelled),
        saved = repository.save(item) => saved.map_err(ItemError::Persistence)?,
    };

    debug!(id = %id, "Processed item");
    Ok(Some(saved))
}

/// Handle to a batch started with [`BatchProcessor::spawn`].
///
/// Awaiting the handle yields the batch result. Dropping it detaches the
/// batch; use [`BatchHandle::cancel`] to interrupt it.
#[derive(Debug)]
pub struct BatchHandle {
    handle: JoinHandle<Result<BatchResult, BatchError>>,
    cancel: CancellationToken,
}

impl BatchHandle {
    /// Request cancellation. Running units report `Cancelled`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the batch task has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Future for BatchHandle {
    type Output = Result<BatchResult, BatchError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle)
            .poll(cx)
            .map(|joined| joined.map_err(BatchError::from).and_then(|result| result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRepository;
    use itemflow_core::STATUS_PROCESSED;
    use pretty_assertions::assert_eq;

    const FAST: Duration = Duration::from_millis(5);

    fn processor(repository: &Arc<MockRepository>, workers: usize) -> BatchProcessor {
        let config = ProcessorConfig::default()
            .with_worker_pool_size(workers)
            .with_processing_delay(FAST);
        BatchProcessor::new(
            Arc::clone(repository) as Arc<dyn ItemRepository>,
            WorkerPool::new(config.worker_pool_size),
            config,
        )
    }

    fn ids(result: &BatchResult) -> Vec<u64> {
        result.items().iter().map(|item| item.id.0).collect()
    }

    #[tokio::test]
    async fn test_processes_every_item() {
        let repo = Arc::new(MockRepository::with_items(1..=3));

        let result = processor(&repo, 10).process_all().await.unwrap();

        assert_eq!(ids(&result), vec![1, 2, 3]);
        assert!(result.items().iter().all(|i| i.status == STATUS_PROCESSED));
        assert_eq!(repo.list_calls(), 1);
        assert_eq!(repo.fetch_calls(), 3);
        assert_eq!(repo.save_calls(), 3);
        assert!(repo.stored(2).unwrap().is_processed());
    }

    #[tokio::test]
    async fn test_returns_item_from_repository() {
        let repo = Arc::new(MockRepository::with_items(1..=1).normalize_on_save());

        let result = processor(&repo, 2).process_all().await.unwrap();

        assert_eq!(result.items()[0].name, "ITEM 1");
    }

    #[tokio::test]
    async fn test_missing_item_is_skipped() {
        let repo = Arc::new(MockRepository::with_items(1..=3).without_item(2));

        let result = processor(&repo, 10).process_all().await.unwrap();

        assert_eq!(ids(&result), vec![1, 3]);
        assert_eq!(result.skipped(), 1);
        assert_eq!(repo.fetch_calls(), 3);
        assert_eq!(repo.save_calls(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_result_follows_dispatch_order() {
        let repo = Arc::new(
            MockRepository::with_items(1..=3)
                .fetch_delay(1, Duration::from_millis(80))
                .fetch_delay(2, Duration::from_millis(40)),
        );

        let result = processor(&repo, 10).process_all().await.unwrap();

        assert_eq!(repo.completion_order(), vec![3, 2, 1]);
        assert_eq!(ids(&result), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_save_failure_fails_batch() {
        let repo = Arc::new(MockRepository::with_items(1..=3).failing_save(2));

        let err = processor(&repo, 10).process_all().await.unwrap_err();

        assert_eq!(err.item_id(), Some(ItemId(2)));
        assert!(matches!(
            err,
            BatchError::Item {
                source: ItemError::Persistence(_),
                ..
            }
        ));
        assert!(err.to_string().contains("id 2"));
        // Every unit still ran to completion before the failure surfaced.
        assert_eq!(repo.save_calls(), 3);
    }

    #[tokio::test]
    async fn test_fetch_failure_fails_batch() {
        let repo = Arc::new(MockRepository::with_items(1..=2).failing_fetch(2));

        let err = processor(&repo, 10).process_all().await.unwrap_err();

        assert!(matches!(
            err,
            BatchError::Item {
                id: ItemId(2),
                source: ItemError::Fetch(_)
            }
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_first_failure_is_by_dispatch_order() {
        let repo = Arc::new(
            MockRepository::with_items(1..=3)
                .failing_fetch(2)
                .fetch_delay(2, Duration::from_millis(60))
                .failing_save(3),
        );

        let err = processor(&repo, 10).process_all().await.unwrap_err();

        assert_eq!(err.item_id(), Some(ItemId(2)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cancelled_fetch_fails_batch() {
        let repo = Arc::new(MockRepository::with_items(1..=2).hanging_fetch(2));
        let processor = Arc::new(processor(&repo, 10));

        let handle = processor.spawn();
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.cancel();

        let err = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("cancelled batch must not hang")
            .unwrap_err();

        assert_eq!(err.item_id(), Some(ItemId(2)));
        assert!(err.is_cancelled());
        assert!(err.to_string().contains("id 2"));
        assert!(repo.stored(1).unwrap().is_processed());
    }

    #[tokio::test]
    async fn test_shutdown_token_cancels_batches() {
        let repo = Arc::new(MockRepository::with_items(1..=3));
        let shutdown = CancellationToken::new();
        let processor = processor(&repo, 10).with_shutdown(shutdown.clone());

        shutdown.cancel();
        let err = processor.process_all().await.unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(repo.save_calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_dropping_batch_interrupts_units() {
        let repo = Arc::new(MockRepository::with_items(1..=4).hanging_fetch(3));
        let processor = processor(&repo, 2);

        let timed_out = tokio::time::timeout(Duration::from_millis(100), processor.process_all())
            .await
            .is_err();
        assert!(timed_out);

        // The hanging unit observes cancellation and gives its slot back.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(processor.pool().available(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrency_is_bounded_by_pool() {
        let mut repo = MockRepository::with_items(1..=12);
        for id in 1..=12 {
            repo = repo
                .fetch_delay(id, Duration::from_millis(10))
                .save_delay(id, Duration::from_millis(10));
        }
        let repo = Arc::new(repo);
        let processor = Arc::new(processor(&repo, 3));

        let batch = processor.spawn();
        let mut lowest_available = processor.pool().size();
        while !batch.is_finished() {
            lowest_available = lowest_available.min(processor.pool().available());
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        let result = batch.await.unwrap();

        assert_eq!(result.len(), 12);
        assert_eq!(lowest_available, 0);
        assert_eq!(processor.pool().available(), 3);
        assert!(repo.peak_in_flight() <= 3, "peak {}", repo.peak_in_flight());
        assert!(repo.peak_in_flight() > 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_shared_pool_bounds_concurrent_batches() {
        let mut repo = MockRepository::with_items(1..=8);
        for id in 1..=8 {
            repo = repo.fetch_delay(id, Duration::from_millis(20));
        }
        let repo = Arc::new(repo);
        let pool = WorkerPool::new(2);
        let config = ProcessorConfig::default().with_processing_delay(FAST);
        let first = BatchProcessor::new(repo.clone(), pool.clone(), config.clone());
        let second = BatchProcessor::new(repo.clone(), pool, config);

        let (a, b) = tokio::join!(first.process_all(), second.process_all());

        assert_eq!(a.unwrap().len(), 8);
        assert_eq!(b.unwrap().len(), 8);
        assert!(repo.peak_in_flight() <= 2, "peak {}", repo.peak_in_flight());
    }

    #[tokio::test]
    async fn test_rerun_over_processed_items_succeeds() {
        let repo = Arc::new(MockRepository::with_items(1..=3));
        let processor = processor(&repo, 10);

        processor.process_all().await.unwrap();
        let again = processor.process_all().await.unwrap();

        assert_eq!(ids(&again), vec![1, 2, 3]);
        assert!(again.items().iter().all(Item::is_processed));
        assert_eq!(repo.save_calls(), 6);
    }

    #[tokio::test]
    async fn test_empty_repository() {
        let repo = Arc::new(MockRepository::with_items(std::iter::empty()));

        let result = processor(&repo, 10).process_all().await.unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_listing_failure() {
        let repo = Arc::new(MockRepository::with_items(1..=2).failing_list());

        let err = processor(&repo, 10).process_all().await.unwrap_err();

        assert!(matches!(err, BatchError::Listing(_)));
        assert_eq!(repo.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn test_shut_down_pool_rejects_batch() {
        let repo = Arc::new(MockRepository::with_items(1..=2));
        let processor = processor(&repo, 10);
        processor.pool().shutdown();

        let err = processor.process_all().await.unwrap_err();

        assert!(matches!(err, BatchError::PoolClosed));
        assert_eq!(repo.list_calls(), 0);
    }

    #[tokio::test]
    async fn test_panicking_unit_fails_batch() {
        let repo = Arc::new(MockRepository::with_items(1..=2).panicking_fetch(1));

        let err = processor(&repo, 10).process_all().await.unwrap_err();

        assert!(matches!(
            err,
            BatchError::Item {
                id: ItemId(1),
                source: ItemError::Panicked(_)
            }
        ));
    }

    #[tokio::test]
    async fn test_spawned_batch_completes() {
        let repo = Arc::new(MockRepository::with_items(1..=2));
        let processor = Arc::new(processor(&repo, 10));

        let result = processor.spawn().await.unwrap();

        assert_eq!(ids(&result), vec![1, 2]);
    }
}
