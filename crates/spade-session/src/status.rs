//! Transient status banners.
//!
//! A banner shows immediately and clears itself after a fixed delay. Each
//! `show` bumps an epoch; the deferred clear only fires when its epoch is
//! still current, so a banner shown over an older one is never wiped out
//! by the older one's timer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::events::UiEvent;

struct Inner {
    epoch: AtomicU64,
    clear_after: Duration,
    events: mpsc::UnboundedSender<UiEvent>,
}

/// Status banner with auto-clear. Cheap to clone.
#[derive(Clone)]
pub struct StatusBanner {
    inner: Arc<Inner>,
}

impl StatusBanner {
    /// Banner clearing itself after `clear_after_ms`, emitting on `events`.
    #[must_use]
    pub fn new(clear_after_ms: u64, events: mpsc::UnboundedSender<UiEvent>) -> Self {
        Self {
            inner: Arc::new(Inner {
                epoch: AtomicU64::new(0),
                clear_after: Duration::from_millis(clear_after_ms),
                events,
            }),
        }
    }

    /// Show a banner and schedule its clear.
    ///
    /// Must be called from within a tokio runtime.
    pub fn show(&self, text: impl Into<String>) {
        let epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.inner.events.send(UiEvent::Status { text: text.into() });

        let inner = Arc::clone(&self.inner);
        let _ = tokio::spawn(async move {
            tokio::time::sleep(inner.clear_after).await;
            if inner.epoch.load(Ordering::SeqCst) == epoch {
                let _ = inner.events.send(UiEvent::StatusCleared);
            }
        });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn banner_shows_then_clears() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let banner = StatusBanner::new(50, tx);

        banner.show("Player alice connected");

        assert_matches!(
            rx.recv().await.unwrap(),
            UiEvent::Status { text } if text == "Player alice connected"
        );
        let cleared = tokio::time::timeout(Duration::from_millis(500), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_matches!(cleared, UiEvent::StatusCleared);
    }

    #[tokio::test]
    async fn newer_banner_suppresses_older_clear() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let banner = StatusBanner::new(80, tx);

        banner.show("first");
        tokio::time::sleep(Duration::from_millis(30)).await;
        banner.show("second");

        assert_matches!(rx.recv().await.unwrap(), UiEvent::Status { text } if text == "first");
        assert_matches!(rx.recv().await.unwrap(), UiEvent::Status { text } if text == "second");

        // Only the second banner's timer clears; exactly one StatusCleared.
        let cleared = tokio::time::timeout(Duration::from_millis(500), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_matches!(cleared, UiEvent::StatusCleared);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(rx.try_recv().is_err());
    }
}
