mod sink;

pub use self::sink::Sink;

use std::{
    collections::HashMap,
    fmt::Debug,
    hash::{BuildHasher, Hash},
};

use futures::{Stream, StreamExt};

/// Routes every item of `input` to the sink registered for its key.
///
/// `classify` is called once per item. Items whose key has no sink in `sinks` are dropped without blocking and
/// without being reported. Items for a sink whose receiving half is gone are dropped as well.
///
/// Once `input` is exhausted every sink is dropped, which closes the channels behind them. A channel registered under
/// several keys (through cloned senders) closes once the last of its senders is dropped.
///
/// No workers are spawned and no eviction takes place; the sink set is fixed for the whole run.
pub async fn static_demux<T, K, I, C, S, H>(mut input: I, mut classify: C, sinks: HashMap<K, S, H>)
where
    K: Hash + Eq + Debug,
    I: Stream<Item = T> + Unpin,
    C: FnMut(&T) -> K,
    S: Sink<T>,
    H: BuildHasher,
{
    while let Some(item) = input.next().await {
        let key = classify(&item);

        let Some(sink) = sinks.get(&key) else {
            continue;
        };

        if sink.deliver(item).await.is_err() {
            tracing::debug!(key = ?key, "sink closed, item dropped");
        }
    }

    tracing::debug!(sinks = sinks.len(), "input exhausted, closing sinks");
    drop(sinks);
}
