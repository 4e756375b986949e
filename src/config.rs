use std::num::NonZeroUsize;

/// Configuration for [`dynamic_demux_with_config`](crate::dynamic_demux_with_config).
///
/// The default configuration places no limit on the number of live lanes and uses a buffer size of `0`, i.e. every
/// item is handed over synchronously to its worker.
///
/// ```rust
/// use tokio_demux::DemuxConfig;
///
/// let config = DemuxConfig::default().with_max_channels(64).with_buffer_size(16);
///
/// assert_eq!(config.max_channels().map(|max| max.get()), Some(64));
/// assert_eq!(config.buffer_size(), 16);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemuxConfig {
    max_channels: Option<NonZeroUsize>,
    buffer_size: usize,
}

impl DemuxConfig {
    /// Creates the default configuration (unbounded lanes, synchronous handoff).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the upper bound on simultaneously live lanes.
    ///
    /// When a new key arrives and this many lanes are already live, the least recently used lane is closed first.
    /// A value of `0` removes the bound; it is accepted rather than rejected.
    pub fn with_max_channels(mut self, max_channels: usize) -> Self {
        self.max_channels = NonZeroUsize::new(max_channels);
        self
    }

    /// Sets the number of items each newly created lane can buffer before the router waits on its worker.
    ///
    /// A value of `0` makes every delivery a synchronous handoff: routing resumes only once the worker has taken the
    /// item.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Returns the lane bound, or `None` when lanes are unbounded.
    pub fn max_channels(&self) -> Option<NonZeroUsize> {
        self.max_channels
    }

    /// Returns the per-lane buffer size.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Returns `true` if lanes are subject to LRU eviction.
    pub fn is_bounded(&self) -> bool {
        self.max_channels.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_unbounded_with_synchronous_handoff() {
        let config = DemuxConfig::default();
        assert_eq!(config.max_channels(), None);
        assert_eq!(config.buffer_size(), 0);
        assert!(!config.is_bounded());
        assert_eq!(config, DemuxConfig::new());
    }

    #[test]
    fn zero_max_channels_means_unbounded() {
        let config = DemuxConfig::default().with_max_channels(3).with_max_channels(0);
        assert_eq!(config.max_channels(), None);
        assert!(!config.is_bounded());
    }

    #[test]
    fn values_are_used_as_given() {
        let config = DemuxConfig::default().with_max_channels(1).with_buffer_size(128);
        assert_eq!(config.max_channels(), NonZeroUsize::new(1));
        assert_eq!(config.buffer_size(), 128);
        assert!(config.is_bounded());
    }
}
