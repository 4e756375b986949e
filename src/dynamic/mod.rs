mod lane;
mod registry;
mod workers;

pub use self::lane::Lane;

use std::{
    fmt::Debug,
    future::Future,
    hash::{BuildHasher, Hash, RandomState},
};

use futures::{Stream, StreamExt};
use tokio::task::Id;

use self::{lane::LaneSender, registry::Registry, workers::Workers};
use crate::{DemuxConfig, SendError};

/// Registry entry: the write end of a key's lane and the worker reading from it.
struct Route<T> {
    sender: LaneSender<T>,
    worker: Id,
}

/// Demultiplexes `input` into one lane per key with the default configuration and hasher ([`RandomState`]).
///
/// Every item is classified with `classify`. The first item seen for a key starts a new worker by calling
/// `consume(key, lane)` and spawning the returned future; that item and every later item with the same key are
/// delivered to the worker's [`Lane`] in input order.
///
/// The default configuration places no bound on the number of live lanes and hands every item over synchronously, so
/// a slow worker holds up routing for all keys.
///
/// The returned future resolves once `input` is exhausted, every lane has been closed and every worker has returned.
/// Workers must therefore return once their lane reports closure.
///
/// # Panics
///
/// A panic in `classify` unwinds through this call. A panic in a worker is re-raised here once it is observed, and
/// the remaining workers are aborted.
pub async fn dynamic_demux<T, K, I, C, F, Fut>(input: I, classify: C, consume: F)
where
    T: Send + 'static,
    K: Hash + Eq + Clone + Debug + Send + 'static,
    I: Stream<Item = T> + Unpin,
    C: FnMut(&T) -> K,
    F: FnMut(K, Lane<T>) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    dynamic_demux_with_config(input, classify, consume, DemuxConfig::default()).await
}

/// Demultiplexes `input` into one lane per key with the given configuration and the default hasher
/// ([`RandomState`]).
///
/// See [`dynamic_demux`] for the routing contract. With [`max_channels`](DemuxConfig::with_max_channels) set, a new
/// key arriving while that many lanes are live first closes the lane whose key was routed to least recently. The
/// evicted worker drains what it already received and returns; if the key shows up again a fresh worker is started.
pub async fn dynamic_demux_with_config<T, K, I, C, F, Fut>(
    input: I,
    classify: C,
    consume: F,
    config: DemuxConfig,
) where
    T: Send + 'static,
    K: Hash + Eq + Clone + Debug + Send + 'static,
    I: Stream<Item = T> + Unpin,
    C: FnMut(&T) -> K,
    F: FnMut(K, Lane<T>) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    dynamic_demux_with_hasher(input, classify, consume, config, RandomState::new()).await
}

/// Demultiplexes `input` into one lane per key with the given configuration and a [`BuildHasher`] for the key
/// registry.
///
/// See [`dynamic_demux`] and [`dynamic_demux_with_config`].
pub async fn dynamic_demux_with_hasher<T, K, I, C, F, Fut, S>(
    mut input: I,
    mut classify: C,
    mut consume: F,
    config: DemuxConfig,
    build_hasher: S,
) where
    T: Send + 'static,
    K: Hash + Eq + Clone + Debug + Send + 'static,
    I: Stream<Item = T> + Unpin,
    C: FnMut(&T) -> K,
    F: FnMut(K, Lane<T>) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
    S: BuildHasher,
{
    let mut registry = Registry::<K, Route<T>, S>::with_hasher(config.max_channels(), build_hasher);
    let mut workers = Workers::new();
    let mut evictions = 0usize;

    while let Some(item) = input.next().await {
        let key = classify(&item);

        let (worker, delivered) = match registry.touch(&key) {
            Some(route) => {
                tracing::trace!(key = ?key, "routing item");
                (route.worker, route.sender.deliver(item).await)
            }
            None => {
                let evicted = if registry.is_full() {
                    registry.evict_lru()
                } else {
                    None
                };

                if let Some((evicted_key, evicted_route)) = evicted {
                    drop(evicted_route);
                    evictions += 1;
                    tracing::debug!(key = ?evicted_key, "evicted least recently used lane");
                    workers.reap();
                }

                let (sender, lane) = lane::lane(config.buffer_size());
                let worker = workers.spawn(&key, consume(key.clone(), lane));
                tracing::debug!(key = ?key, live_lanes = registry.len() + 1, "spawned worker");

                let delivered = sender.deliver(item).await;
                if delivered.is_ok() {
                    registry.insert(key.clone(), Route { sender, worker });
                }
                (worker, delivered)
            }
        };

        if let Err(SendError::Closed(_)) = delivered {
            // Settle the worker before retiring its key so a panic surfaces here rather than at the final join.
            workers.wait_for(worker).await;
            workers.reap();

            tracing::warn!(key = ?key, "worker is no longer receiving, item dropped");
            registry.remove(&key);
        }
    }

    if !registry.is_empty() {
        tracing::debug!(lanes = registry.len(), "input exhausted, closing lanes");
    }
    registry.drain().for_each(drop);

    let spawned = workers.spawned();
    workers.join_all().await;

    tracing::debug!(workers = spawned, evictions, "demux complete");
}
