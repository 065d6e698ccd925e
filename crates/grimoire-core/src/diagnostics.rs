//! Non-fatal warning sink.
//!
//! Warnings are recognized-but-informational conditions: an embedded item
//! type the sorter has no bucket for, a melee item missing its weapon type,
//! a `system.slug` that no longer matches the document name. They never
//! abort a run. A [`Diagnostics`] value counts them and, when enabled,
//! forwards them to `log::warn!`.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Thread-safe warning counter and emitter.
#[derive(Debug)]
pub struct Diagnostics {
    enabled: bool,
    count: AtomicUsize,
}

impl Diagnostics {
    /// Create a sink. When `enabled` is false warnings are counted but not logged.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            count: AtomicUsize::new(0),
        }
    }

    /// A sink that never logs.
    pub fn silent() -> Self {
        Self::new(false)
    }

    /// Record a warning.
    pub fn warn(&self, message: impl AsRef<str>) {
        self.count.fetch_add(1, Ordering::Relaxed);
        if self.enabled {
            log::warn!("{}", message.as_ref());
        }
    }

    /// Number of warnings recorded so far.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    /// Whether warnings are forwarded to the logger.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_when_silent() {
        let diagnostics = Diagnostics::silent();
        diagnostics.warn("one");
        diagnostics.warn(String::from("two"));
        assert_eq!(diagnostics.count(), 2);
        assert!(!diagnostics.is_enabled());
    }

    #[test]
    fn test_default_is_enabled() {
        assert!(Diagnostics::default().is_enabled());
    }
}
