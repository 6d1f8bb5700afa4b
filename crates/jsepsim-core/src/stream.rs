//! Inert media stream handles.

use std::{cell::Cell, fmt, rc::Rc};

/// Handle to a simulated media stream.
///
/// Clones refer to the same stream. Equality is identity, not label: two
/// streams created with the same label are different streams.
#[derive(Clone)]
pub struct MediaStream {
    inner: Rc<StreamInner>,
}

struct StreamInner {
    label: String,
    stops: Cell<u32>,
}

impl MediaStream {
    /// Create a new stream.
    pub fn new(label: impl Into<String>) -> Self {
        Self { inner: Rc::new(StreamInner { label: label.into(), stops: Cell::new(0) }) }
    }

    /// Label given at creation.
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Stop the stream. Stopping twice is allowed and counted.
    pub fn stop(&self) {
        self.inner.stops.set(self.inner.stops.get() + 1);
    }

    /// Whether `stop` has been called at least once.
    pub fn is_stopped(&self) -> bool {
        self.inner.stops.get() > 0
    }

    /// Number of times `stop` was called.
    pub fn stop_count(&self) -> u32 {
        self.inner.stops.get()
    }
}

impl PartialEq for MediaStream {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for MediaStream {}

impl fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStream")
            .field("label", &self.inner.label)
            .field("stops", &self.inner.stops.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_identity() {
        let a = MediaStream::new("camera");
        let b = MediaStream::new("camera");

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn stop_is_shared_between_clones() {
        let stream = MediaStream::new("mic");
        let handle = stream.clone();

        handle.stop();
        assert!(stream.is_stopped());
        assert_eq!(stream.stop_count(), 1);
    }
}
