//! Bounded-concurrency helpers.
//!
//! Work is processed in fixed-size chunks with a barrier between them:
//! every operation of a chunk runs concurrently, and the next chunk only
//! starts once the whole chunk has settled. This caps in-flight requests
//! against rate-limited public endpoints at the chunk size.

use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use log::debug;

use crate::error::{FetchError, Result};

/// Run `op` over `items` in chunks of `chunk_size`, pausing `pause`
/// between chunks. Results come back in input order.
///
/// # Example
///
/// ```ignore
/// let names = process_in_chunks(addresses, 4, Duration::ZERO, |addr| async move {
///     registry.collection_name(&addr).await
/// })
/// .await;
/// ```
pub async fn process_in_chunks<T, R, F, Fut>(
    items: Vec<T>,
    chunk_size: usize,
    pause: Duration,
    op: F,
) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    let chunk_size = chunk_size.max(1);
    let total = items.len();
    let chunks = chunk_count(total, chunk_size);
    let mut results = Vec::with_capacity(total);
    let mut pending = items.into_iter().peekable();
    let mut chunk_index = 0;

    while pending.peek().is_some() {
        if chunk_index > 0 && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }

        let chunk: Vec<T> = pending.by_ref().take(chunk_size).collect();
        debug!(
            "Processing chunk {}/{} ({} of {} items)",
            chunk_index + 1,
            chunks,
            chunk.len(),
            total
        );
        results.extend(join_all(chunk.into_iter().map(&op)).await);
        chunk_index += 1;
    }

    results
}

/// Number of chunks `len` items split into.
pub fn chunk_count(len: usize, chunk_size: usize) -> usize {
    len.div_ceil(chunk_size.max(1))
}

/// Race `fut` against a timer; the loser is abandoned.
pub async fn with_timeout<T, Fut>(limit: Duration, fut: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(limit).into()),
    }
}
