//! Position source subscription.
//!
//! This is the only asynchronous boundary of the tracker. The platform side
//! pushes fixes into a [`PositionFeed`]; the tracking side pulls them from a
//! [`Subscription`] one at a time, so each fix runs through the whole
//! pipeline before the next one is looked at.
//!
//! Unsubscribing closes the channel and drops anything still buffered, so no
//! fix delivered after `unsubscribe()` can reach a session.

use std::future::Future;
use std::time::Duration;

use futures::Stream;
use log::{debug, info, warn};
use tokio::sync::mpsc;

use crate::session::StopAction;
use crate::{
    GeoPoint, RawFix, Result, Route, ShopRegistry, TrackerConfig, TrackerError, TrackingSession,
    TrackingUpdate, WatchOptions,
};

/// Default buffer between the platform callback and the tracking loop.
const FEED_CAPACITY: usize = 32;

/// Platform-facing end of a subscription.
#[derive(Debug, Clone)]
pub struct PositionFeed {
    tx: mpsc::Sender<RawFix>,
}

impl PositionFeed {
    /// Deliver one fix. Returns an error once the subscriber is gone.
    ///
    /// A full buffer drops the fix (a missed sample, never a blocked callback).
    pub fn deliver(&self, fix: RawFix) -> Result<()> {
        match self.tx.try_send(fix) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("[PositionFeed] Buffer full, dropping fix");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(TrackerError::PositionUnavailable {
                message: "subscription closed".to_string(),
            }),
        }
    }

    /// True once the tracking side has unsubscribed.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Tracking-side end of a subscription.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::Receiver<RawFix>,
    options: WatchOptions,
    active: bool,
}

/// Open a subscription with the given watch options.
///
/// The returned feed is handed to the platform position callback.
pub fn subscribe(options: WatchOptions) -> (PositionFeed, Subscription) {
    let (tx, rx) = mpsc::channel(FEED_CAPACITY);
    info!(
        "[Subscription] Opened (high_accuracy={}, timeout={}ms, max_age={}ms)",
        options.high_accuracy, options.timeout_ms, options.max_age_ms
    );
    (
        PositionFeed { tx },
        Subscription {
            rx,
            options,
            active: true,
        },
    )
}

/// Open a subscription with the watch options of `config`.
pub fn subscribe_with_config(config: &TrackerConfig) -> (PositionFeed, Subscription) {
    subscribe(config.watch)
}

impl Subscription {
    pub fn options(&self) -> WatchOptions {
        self.options
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Wait for the next fix. `None` after unsubscribe or when the feed is dropped.
    pub async fn next_fix(&mut self) -> Option<RawFix> {
        if !self.active {
            return None;
        }
        self.rx.recv().await
    }

    /// Close the subscription synchronously, discarding buffered fixes.
    pub fn unsubscribe(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.rx.close();

        let mut dropped = 0usize;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        info!("[Subscription] Closed ({} buffered fixes dropped)", dropped);
    }

    /// Adapt into a `Stream` of fixes.
    pub fn into_stream(self) -> impl Stream<Item = RawFix> {
        futures::stream::unfold(self, |mut sub| async move {
            sub.next_fix().await.map(|fix| (fix, sub))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.active = false;
        self.rx.close();
    }
}

/// Feed fixes from `subscription` through `session` until it ends.
///
/// Fixes are processed strictly one at a time in arrival order. Invalid fixes
/// are logged and skipped; they never end the loop. Returns the number of
/// fixes processed.
///
/// The loop holds `session` and `subscription` for as long as it runs and
/// only returns once the feed is dropped. To stop while the feed is still
/// live, race it against a stop signal (e.g. `tokio::select!`) and call
/// [`stop_tracking`] after the drive future has been dropped.
pub async fn drive<F>(
    session: &mut TrackingSession,
    subscription: &mut Subscription,
    registry: &ShopRegistry,
    mut on_update: F,
) -> usize
where
    F: FnMut(TrackingUpdate),
{
    let mut processed = 0;
    while let Some(fix) = subscription.next_fix().await {
        match session.on_fix(fix, registry) {
            Ok(update) => {
                processed += 1;
                on_update(update);
            }
            Err(e) => warn!("[Subscription] Skipping fix: {}", e),
        }
    }
    debug!("[Subscription] Drive loop ended after {} fixes", processed);
    processed
}

/// Stop tracking: unsubscribe first, then finalize or discard.
///
/// Needs the same `&mut` borrows as [`drive`], so any drive loop over this
/// subscription must have returned or been dropped.
pub fn stop_tracking(
    session: &mut TrackingSession,
    subscription: &mut Subscription,
    action: StopAction,
) -> Result<Option<Route>> {
    subscription.unsubscribe();
    session.stop(action)
}

/// Await a single-shot fix, bounded by `timeout`.
pub async fn request_fix<F>(request: F, timeout: Duration) -> Result<RawFix>
where
    F: Future<Output = Result<RawFix>>,
{
    match tokio::time::timeout(timeout, request).await {
        Ok(result) => result,
        Err(_) => Err(TrackerError::PositionTimeout {
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

/// Single-shot fix that fails soft to `fallback`.
///
/// Timeouts, unavailable positions and invalid coordinates all yield the
/// fallback location instead of an error.
pub async fn current_fix_or_fallback<F>(request: F, timeout: Duration, fallback: GeoPoint) -> GeoPoint
where
    F: Future<Output = Result<RawFix>>,
{
    match request_fix(request, timeout).await {
        Ok(fix) if fix.point().is_valid() => fix.point(),
        Ok(fix) => {
            warn!(
                "[PositionSource] Invalid fix ({}, {}), using fallback",
                fix.lat, fix.lng
            );
            fallback
        }
        Err(e) => {
            warn!("[PositionSource] {}, using fallback", e);
            fallback
        }
    }
}

/// Single-shot fix bounded by `config.fix_timeout()`, falling back to
/// `config.fallback_location`.
pub async fn current_fix_with_config<F>(request: F, config: &TrackerConfig) -> GeoPoint
where
    F: Future<Output = Result<RawFix>>,
{
    current_fix_or_fallback(request, config.fix_timeout(), config.fallback_location).await
}
