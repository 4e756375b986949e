/// Error type for receiving items through [`Lane::try_recv`](crate::Lane::try_recv).
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TryRecvError {
    /// The lane is empty but still open.
    #[error("lane is empty")]
    Empty,

    /// The lane has been closed and every buffered item has been received.
    #[error("lane is disconnected")]
    Disconnected,
}

/// Error type for delivering items through a [`Sink`](crate::Sink) or an internal lane.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SendError<T> {
    /// The receiving half was dropped or closed before the item could be delivered. The error carries the item back
    /// to the caller.
    #[error("channel closed")]
    Closed(T),
}

impl<T> SendError<T> {
    /// Consumes the error, returning the undelivered item.
    pub fn into_inner(self) -> T {
        match self {
            SendError::Closed(item) => item,
        }
    }
}
