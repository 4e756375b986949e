use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures::Stream;
use tokio::sync::mpsc::{Receiver as MpscReceiver, Sender as MpscSender};

use crate::{SendError, TryRecvError};

/// Creates the two ends of a lane able to buffer `buffer_size` items.
///
/// Tokio's bounded channel needs at least one slot, so a zero-sized lane is backed by a single slot and the sending
/// end waits for that slot to be released after each delivery.
pub(crate) fn lane<T>(buffer_size: usize) -> (LaneSender<T>, Lane<T>) {
    let (sender, receiver) = tokio::sync::mpsc::channel(buffer_size.max(1));

    (
        LaneSender {
            sender,
            handoff: buffer_size == 0,
        },
        Lane { receiver },
    )
}

/// Write end of a lane. Owned by the router; dropping it closes the lane.
pub(crate) struct LaneSender<T> {
    sender: MpscSender<T>,
    handoff: bool,
}

impl<T> LaneSender<T> {
    /// Delivers `item` to the lane's worker, waiting while the lane is full.
    ///
    /// For zero-sized lanes this returns only after the worker has received the item.
    pub(crate) async fn deliver(&self, item: T) -> Result<(), SendError<T>> {
        self.sender
            .send(item)
            .await
            .map_err(|err| SendError::Closed(err.0))?;

        if self.handoff {
            // A worker that exits right after taking the item closes the lane; the item still got through.
            let _ = self.sender.reserve().await;
        }

        Ok(())
    }
}

/// Receive items routed to a single key.
///
/// A `Lane` is handed to the consume function together with its key. It yields items in the order they appeared on
/// the input stream. Once the router closes the lane (because the key was evicted or the input ended), the lane keeps
/// yielding every item that was already buffered and then reports closure.
///
/// `Lane` also implements [`Stream`], so it can be used with [`StreamExt`](futures::StreamExt) combinators.
pub struct Lane<T> {
    receiver: MpscReceiver<T>,
}

impl<T> Lane<T> {
    /// Receives the next item routed to this key.
    ///
    /// Returns `None` once the lane is closed and drained. The router closes a lane when its key is evicted to make
    /// room for another key, or when the input stream ends; either way every item routed here before that point is
    /// still returned first. A worker should return once it sees `None`: the demux call waits for it.
    ///
    /// While the lane is open and empty this waits for the next item. With a buffer size of `0`, taking an item is
    /// what lets the router move on to the next input item.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. If `recv` is used in a `tokio::select!` and another branch completes first, no
    /// item was taken from the lane.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Takes up to `limit` items that are ready, appending them to `buffer`, and returns how many were added.
    ///
    /// Waits like [`recv`](Lane::recv) while the lane is open and empty. Returns `0` only when `limit` is `0` or the
    /// lane is closed and drained.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe.
    pub async fn recv_many(&mut self, buffer: &mut Vec<T>, limit: usize) -> usize {
        self.receiver.recv_many(buffer, limit).await
    }

    /// Takes the next item if one is buffered, without waiting.
    ///
    /// Fails with [`Empty`](TryRecvError::Empty) while the lane is open, and with
    /// [`Disconnected`](TryRecvError::Disconnected) once it was closed (by eviction, end of input or
    /// [`close`](Lane::close)) and drained.
    pub fn try_recv(&mut self) -> Result<T, TryRecvError> {
        self.receiver.try_recv().map_err(|err| match err {
            tokio::sync::mpsc::error::TryRecvError::Empty => TryRecvError::Empty,
            tokio::sync::mpsc::error::TryRecvError::Disconnected => TryRecvError::Disconnected,
        })
    }

    /// Stops accepting items for this key while keeping the buffered ones readable.
    ///
    /// The next item routed to the key is dropped. The router then waits for this worker to return before it retires
    /// the key, so return promptly after closing; a later item for the key starts a fresh worker.
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

impl<T> Stream for Lane<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use futures::{FutureExt, StreamExt};

    use super::*;

    #[tokio::test]
    async fn handoff_waits_for_receiver() {
        let (sender, mut lane) = lane::<u32>(0);

        let delivery = tokio::spawn(async move {
            let result = sender.deliver(7).await;
            (sender, result)
        });

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!delivery.is_finished(), "delivery completed before the item was taken");

        assert_eq!(lane.recv().await, Some(7));

        let (sender, result) = delivery.await.unwrap();
        assert_eq!(result, Ok(()));

        drop(sender);
        assert_eq!(lane.recv().await, None);
    }

    #[tokio::test]
    async fn buffered_lane_accepts_up_to_capacity() {
        let (sender, mut lane) = lane::<u32>(2);

        assert_eq!(sender.deliver(1).now_or_never(), Some(Ok(())));
        assert_eq!(sender.deliver(2).now_or_never(), Some(Ok(())));
        assert_eq!(sender.deliver(3).now_or_never(), None);

        assert_eq!(lane.try_recv(), Ok(1));
        assert_eq!(sender.deliver(4).now_or_never(), Some(Ok(())));
    }

    #[tokio::test]
    async fn closed_lane_drains_before_reporting_closure() {
        let (sender, mut lane) = lane::<u32>(4);

        sender.deliver(1).await.unwrap();
        sender.deliver(2).await.unwrap();
        assert_eq!(lane.try_recv(), Ok(1));
        drop(sender);

        assert_eq!(lane.recv().await, Some(2));
        assert_eq!(lane.recv().await, None);
        assert_eq!(lane.try_recv(), Err(TryRecvError::Disconnected));
    }

    #[tokio::test]
    async fn try_recv_on_open_empty_lane() {
        let (_sender, mut lane) = lane::<u32>(1);
        assert_eq!(lane.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn delivery_after_worker_close_returns_item() {
        let (sender, mut lane) = lane::<String>(4);

        sender.deliver("kept".to_string()).await.unwrap();
        lane.close();

        let err = sender.deliver("rejected".to_string()).await.unwrap_err();
        assert_eq!(err.into_inner(), "rejected");

        assert_eq!(lane.recv().await.as_deref(), Some("kept"));
        assert_eq!(lane.recv().await, None);
    }

    #[tokio::test]
    async fn delivery_after_worker_dropped_lane_fails() {
        let (sender, lane) = lane::<u32>(0);
        drop(lane);

        assert_eq!(sender.deliver(1).await, Err(SendError::Closed(1)));
    }

    #[tokio::test]
    async fn recv_many_and_stream() {
        let (sender, mut lane) = lane::<u32>(8);

        for n in 0..6 {
            sender.deliver(n).await.unwrap();
        }
        drop(sender);

        let mut buffer = Vec::new();
        assert_eq!(lane.recv_many(&mut buffer, 0).await, 0);
        assert_eq!(lane.recv_many(&mut buffer, 4).await, 4);
        assert_eq!(buffer, vec![0, 1, 2, 3]);

        let rest: Vec<u32> = lane.collect().await;
        assert_eq!(rest, vec![4, 5]);
    }
}
