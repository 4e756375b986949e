use std::future::Future;

use tokio::sync::mpsc::{Sender as MpscSender, UnboundedSender as MpscUnboundedSender};

use crate::SendError;

/// Caller-owned destination for [`static_demux`](crate::static_demux).
///
/// A sink is closed by dropping it. `static_demux` drops every sink it was given once its input is exhausted.
pub trait Sink<T> {
    /// Delivers `item`, waiting if the sink applies backpressure.
    ///
    /// Returns [`SendError::Closed`] with the item if the receiving half is gone.
    fn deliver(&self, item: T) -> impl Future<Output = Result<(), SendError<T>>> + Send;
}

impl<T> Sink<T> for MpscSender<T>
where
    T: Send,
{
    fn deliver(&self, item: T) -> impl Future<Output = Result<(), SendError<T>>> + Send {
        async move {
            self.send(item)
                .await
                .map_err(|err| SendError::Closed(err.0))
        }
    }
}

impl<T> Sink<T> for MpscUnboundedSender<T>
where
    T: Send,
{
    fn deliver(&self, item: T) -> impl Future<Output = Result<(), SendError<T>>> + Send {
        let result = self.send(item).map_err(|err| SendError::Closed(err.0));
        async move { result }
    }
}
