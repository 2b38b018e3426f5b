// ── Bounded, ordered fan-out ──
//
// Issues one request per key with at most `max_in_flight` outstanding,
// writes each result into the slot of its key, and returns the slots in
// key order once every request has settled. The first failure wins:
// returning early drops the stream, which cancels whatever is still
// in flight.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::StreamExt;
use futures_util::stream;
use tracing::trace;

/// Monotonic token identifying the latest selection.
///
/// Bumped on every selection or organization change; a load captures the
/// value when it starts and commits only if it is still current.
#[derive(Debug, Default)]
pub struct Generation(AtomicU64);

impl Generation {
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Advance the token, returning the new value.
    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, token: u64) -> bool {
        self.current() == token
    }
}

/// Run `fetch` for every key, at most `max_in_flight` at a time, and
/// return the results in key order regardless of completion order.
///
/// Each fetch owns its key, so the returned future borrows nothing from
/// the key list and can be spawned.
pub async fn ordered_fan_out<K, T, E, F, Fut>(
    keys: impl IntoIterator<Item = K>,
    max_in_flight: usize,
    fetch: F,
) -> Result<Vec<T>, E>
where
    F: Fn(K) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let keys: Vec<K> = keys.into_iter().collect();
    let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(keys.len()).collect();

    let mut pending = stream::iter(keys.into_iter().enumerate())
        .map(|(slot, key)| {
            let fut = fetch(key);
            async move { (slot, fut.await) }
        })
        .buffer_unordered(max_in_flight.max(1));

    while let Some((slot, result)) = pending.next().await {
        trace!(slot, ok = result.is_ok(), "fan-out slot settled");
        slots[slot] = Some(result?);
    }

    Ok(slots.into_iter().flatten().collect())
}
