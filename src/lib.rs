//! A keyed demultiplexer for Tokio that fans a single stream out to per-key workers.
//!
//! This crate splits one ordered stream of items into many per-key lanes. Every key gets its own worker task, spawned
//! the first time the key is seen, and that worker receives the key's items in input order. This is useful when
//! related items (per tenant, per connection, per partition) must be processed sequentially while unrelated items are
//! processed concurrently, without managing worker lifecycles and channels by hand.
//!
//! # Key Features
//!
//! - **Per-key ordering**: items with the same key reach their worker in the order they appeared on the input
//! - **Bounded lanes**: an optional limit on live lanes, enforced by closing the least recently used lane
//! - **Drain on close**: a closed lane still yields every item it buffered before reporting closure
//! - **Completion barrier**: the demux call resolves only after every worker it started has returned
//! - **Static routing**: a simpler router forwarding to a fixed, caller-owned set of channels
//!
//! # Routers
//!
//! ## Dynamic Demux
//!
//! ```rust
//! use std::{
//!     collections::HashMap,
//!     sync::{Arc, Mutex},
//! };
//!
//! use tokio_demux::{DemuxConfig, dynamic_demux_with_config};
//!
//! #[tokio::main]
//! async fn main() {
//!     let input = futures::stream::iter(vec![(1, "a"), (2, "b"), (1, "c"), (2, "d")]);
//!     let seen = Arc::new(Mutex::new(HashMap::new()));
//!
//!     let config = DemuxConfig::default()
//!         .with_max_channels(16)
//!         .with_buffer_size(8);
//!
//!     dynamic_demux_with_config(
//!         input,
//!         |(key, _)| *key,
//!         |key, mut lane| {
//!             let seen = seen.clone();
//!             async move {
//!                 let mut items = Vec::new();
//!                 while let Some((_, value)) = lane.recv().await {
//!                     items.push(value);
//!                 }
//!                 seen.lock().unwrap().insert(key, items);
//!             }
//!         },
//!         config,
//!     )
//!     .await;
//!
//!     // Every worker has returned by now.
//!     let seen = seen.lock().unwrap();
//!     assert_eq!(seen[&1], vec!["a", "c"]);
//!     assert_eq!(seen[&2], vec!["b", "d"]);
//! }
//! ```
//!
//! ## Static Demux
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! use tokio_demux::static_demux;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (even_tx, mut even_rx) = tokio::sync::mpsc::channel(8);
//!     let (odd_tx, mut odd_rx) = tokio::sync::mpsc::channel(8);
//!
//!     let sinks = HashMap::from([("even", even_tx), ("odd", odd_tx)]);
//!     let input = futures::stream::iter(1..=4);
//!
//!     static_demux(input, |n| if n % 2 == 0 { "even" } else { "odd" }, sinks).await;
//!
//!     assert_eq!(even_rx.recv().await, Some(2));
//!     assert_eq!(even_rx.recv().await, Some(4));
//!     assert_eq!(even_rx.recv().await, None);
//!     assert_eq!(odd_rx.recv().await, Some(1));
//!     assert_eq!(odd_rx.recv().await, Some(3));
//!     assert_eq!(odd_rx.recv().await, None);
//! }
//! ```
//!
//! # Architecture
//!
//! The dynamic demux is a single routing loop:
//!
//! 1. **Classify**: compute the key of the next input item
//! 2. **Look up**: find the key's lane in a registry ordered by recency of use, marking it most recently used
//! 3. **Admit**: for an unknown key, close the least recently used lane if the bound is reached, then open a lane
//!    and spawn a worker for it
//! 4. **Deliver**: send the item into the key's lane
//!
//! When the input is exhausted, every remaining lane is closed and the call waits for all workers, including the ones
//! whose lanes were evicted earlier.
//!
//! The registry belongs to the routing loop alone. Workers only ever see the receiving end of their own lane, and
//! closing that lane is the only signal a worker gets.
//!
//! # Performance Considerations
//!
//! - **Global backpressure**: a full lane stalls the routing loop, and with it delivery to every other key
//! - **Synchronous handoff**: with a buffer size of `0` each delivery waits until the worker has taken the item
//! - **Eviction churn**: a lane bound smaller than the working set of keys restarts workers frequently

mod config;
mod dynamic;
mod error;
mod fixed;


pub use self::{
    config::DemuxConfig,
    dynamic::{Lane, dynamic_demux, dynamic_demux_with_config, dynamic_demux_with_hasher},
    error::{SendError, TryRecvError},
    fixed::{Sink, static_demux},
};
