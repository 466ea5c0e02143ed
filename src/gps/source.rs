// src/gps/source.rs
//! Position source abstraction.
//!
//! A source hands readings to a [`FixSink`] either once
//! ([`PositionSource::current_position`]) or continuously
//! ([`PositionSource::watch_position`]). Continuous delivery lasts until the
//! returned [`WatchHandle`] is cancelled or dropped.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use log::debug;
use tokio::task::JoinHandle;

use super::data::Fix;
use crate::error::LocationError;
use crate::sync::lock;

/// A single delivery from a source: a reading or a failure to get one
pub type PositionEvent = std::result::Result<Fix, LocationError>;

/// Callback target for position events
#[derive(Clone)]
pub struct FixSink {
    deliver: Arc<dyn Fn(PositionEvent) + Send + Sync>,
}

impl FixSink {
    pub fn new<F>(deliver: F) -> Self
    where
        F: Fn(PositionEvent) + Send + Sync + 'static,
    {
        Self {
            deliver: Arc::new(deliver),
        }
    }

    pub fn deliver(&self, event: PositionEvent) {
        (self.deliver)(event)
    }
}

impl fmt::Debug for FixSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FixSink")
    }
}

/// Keeps a continuous subscription alive
#[derive(Debug)]
pub struct WatchHandle {
    running: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl WatchHandle {
    /// Subscription driven by a background reader task
    pub fn with_task(running: Arc<AtomicBool>, task: JoinHandle<()>) -> Self {
        Self {
            running,
            task: Some(task),
        }
    }

    /// Subscription fed by someone else; cancelling only flips the flag
    pub fn detached(running: Arc<AtomicBool>) -> Self {
        Self {
            running,
            task: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// An observable device location feed
pub trait PositionSource: Send + Sync {
    /// Short name for logs and the live display
    fn name(&self) -> &str;

    /// Request one reading. The result, or a failure, arrives on `sink`.
    fn current_position(&self, sink: FixSink);

    /// Subscribe to continuous readings delivered on `sink`.
    fn watch_position(&self, sink: FixSink) -> Result<WatchHandle, LocationError>;
}

#[derive(Default)]
struct PendingInner {
    next_id: u64,
    sinks: Vec<(u64, FixSink)>,
}

/// One-shot position requests waiting for the next reading of a feed.
///
/// Used by sources whose device can only be read by one consumer at a time.
/// A request that is not served within its timeout receives
/// [`LocationError::Timeout`].
#[derive(Clone, Default)]
pub struct PendingRequests {
    inner: Arc<Mutex<PendingInner>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, sink: FixSink, timeout: Duration) {
        let id = {
            let mut inner = lock(&self.inner);
            let id = inner.next_id;
            inner.next_id += 1;
            inner.sinks.push((id, sink));
            id
        };

        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let pending = self.clone();
            runtime.spawn(async move {
                tokio::time::sleep(timeout).await;
                if let Some(sink) = pending.remove(id) {
                    debug!("one-shot position request {} timed out", id);
                    sink.deliver(Err(LocationError::Timeout));
                }
            });
        }
    }

    /// Answer every waiting request with `event`
    pub fn serve(&self, event: &PositionEvent) {
        let sinks: Vec<FixSink> = {
            let mut inner = lock(&self.inner);
            inner.sinks.drain(..).map(|(_, sink)| sink).collect()
        };
        for sink in sinks {
            sink.deliver(event.clone());
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: u64) -> Option<FixSink> {
        let mut inner = lock(&self.inner);
        let index = inner.sinks.iter().position(|(key, _)| *key == id)?;
        Some(inner.sinks.remove(index).1)
    }
}

#[derive(Default)]
struct ManualInner {
    available: bool,
    pending: Vec<FixSink>,
    watchers: Vec<(Arc<AtomicBool>, FixSink)>,
}

/// A source fed by the host application.
///
/// Every pushed event goes to all waiting one-shot requests and all active
/// watchers, in push order.
pub struct ManualSource {
    inner: Mutex<ManualInner>,
}

impl ManualSource {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ManualInner {
                available: true,
                ..ManualInner::default()
            }),
        }
    }

    /// A source standing in for a device without location capability
    pub fn unavailable() -> Self {
        Self {
            inner: Mutex::new(ManualInner::default()),
        }
    }

    pub fn push(&self, event: PositionEvent) {
        let sinks: Vec<FixSink> = {
            let mut inner = lock(&self.inner);
            inner
                .watchers
                .retain(|(running, _)| running.load(Ordering::Relaxed));
            let mut sinks: Vec<FixSink> = inner.pending.drain(..).collect();
            sinks.extend(inner.watchers.iter().map(|(_, sink)| sink.clone()));
            sinks
        };

        for sink in sinks {
            sink.deliver(event.clone());
        }
    }

    pub fn push_fix(&self, fix: Fix) {
        self.push(Ok(fix));
    }

    pub fn push_error(&self, error: LocationError) {
        self.push(Err(error));
    }

    pub fn active_watchers(&self) -> usize {
        lock(&self.inner)
            .watchers
            .iter()
            .filter(|(running, _)| running.load(Ordering::Relaxed))
            .count()
    }

    pub fn pending_requests(&self) -> usize {
        lock(&self.inner).pending.len()
    }
}

impl Default for ManualSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionSource for ManualSource {
    fn name(&self) -> &str {
        "manual"
    }

    fn current_position(&self, sink: FixSink) {
        let mut inner = lock(&self.inner);
        if inner.available {
            inner.pending.push(sink);
        } else {
            drop(inner);
            sink.deliver(Err(LocationError::Unsupported));
        }
    }

    fn watch_position(&self, sink: FixSink) -> Result<WatchHandle, LocationError> {
        let mut inner = lock(&self.inner);
        if !inner.available {
            return Err(LocationError::Unsupported);
        }
        let running = Arc::new(AtomicBool::new(true));
        inner.watchers.push((Arc::clone(&running), sink));
        Ok(WatchHandle::detached(running))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn collecting_sink() -> (FixSink, Arc<Mutex<Vec<PositionEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let target = Arc::clone(&events);
        let sink = FixSink::new(move |event| target.lock().unwrap().push(event));
        (sink, events)
    }

    #[test]
    fn test_manual_source_delivers_to_watchers() {
        let source = ManualSource::new();
        let (sink, events) = collecting_sink();
        let handle = source.watch_position(sink).unwrap();

        source.push_fix(Fix::new(1.0, 2.0, Utc::now()));
        source.push_error(LocationError::Timeout);

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[0].is_ok());
        assert_eq!(events[1], Err(LocationError::Timeout));
        assert!(handle.is_active());
    }

    #[test]
    fn test_cancelled_watch_stops_delivery() {
        let source = ManualSource::new();
        let (sink, events) = collecting_sink();
        let handle = source.watch_position(sink).unwrap();
        handle.cancel();

        source.push_fix(Fix::new(1.0, 2.0, Utc::now()));

        assert!(events.lock().unwrap().is_empty());
        assert_eq!(source.active_watchers(), 0);
    }

    #[test]
    fn test_one_shot_request_is_served_once() {
        let source = ManualSource::new();
        let (sink, events) = collecting_sink();
        source.current_position(sink);
        assert_eq!(source.pending_requests(), 1);

        source.push_fix(Fix::new(1.0, 2.0, Utc::now()));
        source.push_fix(Fix::new(3.0, 4.0, Utc::now()));

        assert_eq!(events.lock().unwrap().len(), 1);
        assert_eq!(source.pending_requests(), 0);
    }

    #[test]
    fn test_unavailable_source() {
        let source = ManualSource::unavailable();
        let (sink, events) = collecting_sink();

        assert_eq!(
            source.watch_position(sink.clone()).unwrap_err(),
            LocationError::Unsupported
        );
        source.current_position(sink);
        assert_eq!(
            events.lock().unwrap().as_slice(),
            &[Err(LocationError::Unsupported)]
        );
    }

    #[test]
    fn test_pending_requests_serve_all() {
        let pending = PendingRequests::new();
        let (first, first_events) = collecting_sink();
        let (second, second_events) = collecting_sink();
        pending.register(first, Duration::from_secs(60));
        pending.register(second, Duration::from_secs(60));
        assert_eq!(pending.len(), 2);

        pending.serve(&Ok(Fix::new(1.0, 2.0, Utc::now())));

        assert!(pending.is_empty());
        assert_eq!(first_events.lock().unwrap().len(), 1);
        assert_eq!(second_events.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_request_times_out() {
        let pending = PendingRequests::new();
        let (sink, events) = collecting_sink();
        pending.register(sink, Duration::from_secs(5));

        tokio::time::sleep(Duration::from_secs(6)).await;

        assert!(pending.is_empty());
        assert_eq!(
            events.lock().unwrap().as_slice(),
            &[Err(LocationError::Timeout)]
        );
    }
}
