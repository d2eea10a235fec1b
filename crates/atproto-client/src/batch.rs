//! Bounded-concurrency fan-out over independent items

use std::future::Future;

use futures::stream::{self, StreamExt};

/// Run `f` over every item with at most `limit` futures in flight.
///
/// Output order matches input order. All items run to completion before this
/// returns; item-level failure handling belongs to the closure (best-effort
/// callers return a `Result` and collect the errors).
pub async fn map_concurrent<T, R, F, Fut>(items: Vec<T>, limit: usize, f: F) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    let limit = limit.max(1);
    stream::iter(items.into_iter().map(f))
        .buffered(limit)
        .collect()
        .await
}
