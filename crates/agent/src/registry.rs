//! Per-call tracker registry
//!
//! Webhook deliveries for the same call can arrive concurrently or be
//! retried. Handing out one `Arc<Mutex<StateTracker>>` per call id keeps a
//! single writer per context. A call is finished through a [`CloseGuard`]:
//! only one delivery holds it at a time, and the id is marked closed only
//! when the guard is committed. Idle trackers and old closed ids are swept
//! by [`TrackerRegistry::cleanup_expired`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;

use dispatch_agent_config::TrackerConfig;

use crate::context::ConversationContext;
use crate::tracker::StateTracker;

pub type SharedTracker = Arc<Mutex<StateTracker>>;

struct Slot {
    tracker: SharedTracker,
    last_activity: Mutex<Instant>,
}

impl Slot {
    fn touch(&self) -> SharedTracker {
        *self.last_activity.lock() = Instant::now();
        self.tracker.clone()
    }

    fn is_idle(&self, timeout: Duration) -> bool {
        self.last_activity.lock().elapsed() >= timeout
    }
}

/// Tracker registry keyed by call id
pub struct TrackerRegistry {
    trackers: RwLock<HashMap<String, Slot>>,
    closing: Mutex<HashSet<String>>,
    closed: RwLock<HashMap<String, Instant>>,
    limits: TrackerConfig,
}

impl TrackerRegistry {
    pub fn new(limits: TrackerConfig) -> Self {
        Self {
            trackers: RwLock::new(HashMap::new()),
            closing: Mutex::new(HashSet::new()),
            closed: RwLock::new(HashMap::new()),
            limits,
        }
    }

    pub fn limits(&self) -> TrackerConfig {
        self.limits
    }

    /// Existing tracker for `call_id`, or a fresh one
    pub fn open(&self, call_id: &str) -> SharedTracker {
        self.open_with(call_id, ConversationContext::new)
    }

    /// Existing tracker for `call_id`, or one resumed from `init()`
    pub fn open_with<F>(&self, call_id: &str, init: F) -> SharedTracker
    where
        F: FnOnce() -> ConversationContext,
    {
        if let Some(slot) = self.trackers.read().get(call_id) {
            return slot.touch();
        }

        let mut trackers = self.trackers.write();
        trackers
            .entry(call_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(call_id, "Opening state tracker");
                Slot {
                    tracker: Arc::new(Mutex::new(
                        StateTracker::from_context(init(), self.limits).with_call_id(call_id),
                    )),
                    last_activity: Mutex::new(Instant::now()),
                }
            })
            .touch()
    }

    pub fn get(&self, call_id: &str) -> Option<SharedTracker> {
        self.trackers.read().get(call_id).map(Slot::touch)
    }

    /// Exclusive right to finish `call_id`.
    ///
    /// `None` when the call is already closed or another delivery is
    /// finishing it. Dropping the guard without [`CloseGuard::commit`]
    /// leaves the call open for a retry.
    pub fn begin_close(&self, call_id: &str) -> Option<CloseGuard<'_>> {
        let mut closing = self.closing.lock();
        if self.is_closed(call_id) || !closing.insert(call_id.to_string()) {
            return None;
        }
        Some(CloseGuard {
            registry: self,
            call_id: call_id.to_string(),
            committed: false,
        })
    }

    /// Remove the tracker and mark the call closed
    pub fn close(&self, call_id: &str) -> Option<SharedTracker> {
        self.closed.write().insert(call_id.to_string(), Instant::now());
        self.closing.lock().remove(call_id);
        let removed = self.trackers.write().remove(call_id).map(|slot| slot.tracker);
        if removed.is_some() {
            tracing::debug!(call_id, "Closed state tracker");
        }
        removed
    }

    pub fn is_closed(&self, call_id: &str) -> bool {
        self.closed.read().contains_key(call_id)
    }

    /// Number of open trackers
    pub fn count(&self) -> usize {
        self.trackers.read().len()
    }

    /// Number of remembered closed call ids
    pub fn closed_count(&self) -> usize {
        self.closed.read().len()
    }

    /// Drop idle trackers and forget closed ids past retention.
    /// Returns the number of trackers removed.
    pub fn cleanup_expired(&self) -> usize {
        let idle_timeout = Duration::from_secs(self.limits.idle_timeout_secs);
        let retention = Duration::from_secs(self.limits.closed_retention_secs);

        let removed = {
            let mut trackers = self.trackers.write();
            let before = trackers.len();
            trackers.retain(|call_id, slot| {
                let idle = slot.is_idle(idle_timeout);
                if idle {
                    tracing::debug!(call_id = %call_id, "Dropping idle state tracker");
                }
                !idle
            });
            before - trackers.len()
        };

        self.closed.write().retain(|_, closed_at| closed_at.elapsed() < retention);
        removed
    }

    /// Run [`cleanup_expired`](Self::cleanup_expired) every
    /// `cleanup_interval_secs` until `true` is sent on the returned channel.
    pub fn start_cleanup_task(self: &Arc<Self>) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let registry = Arc::clone(self);
        let period = Duration::from_secs(self.limits.cleanup_interval_secs.max(1));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let removed = registry.cleanup_expired();
                        if removed > 0 {
                            tracing::info!(
                                "Tracker cleanup: removed {} idle trackers ({} remaining)",
                                removed,
                                registry.count()
                            );
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("Tracker cleanup task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }
}

impl Default for TrackerRegistry {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

/// Held while one delivery finishes a call
pub struct CloseGuard<'a> {
    registry: &'a TrackerRegistry,
    call_id: String,
    committed: bool,
}

impl CloseGuard<'_> {
    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    /// Mark the call closed and drop its tracker
    pub fn commit(mut self) {
        self.committed = true;
        self.registry.close(&self.call_id);
    }
}

impl Drop for CloseGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.registry.closing.lock().remove(&self.call_id);
            tracing::debug!(call_id = %self.call_id, "Released close guard, call stays open");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ConversationState;

    fn limits(idle_timeout_secs: u64, closed_retention_secs: u64) -> TrackerConfig {
        TrackerConfig {
            idle_timeout_secs,
            closed_retention_secs,
            ..TrackerConfig::default()
        }
    }

    #[test]
    fn test_open_returns_same_tracker() {
        let registry = TrackerRegistry::default();
        let a = registry.open("call-1");
        let b = registry.open("call-1");
        assert!(Arc::ptr_eq(&a, &b));

        a.lock().transition(ConversationState::GatheringStatus);
        assert_eq!(b.lock().state(), ConversationState::GatheringStatus);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_close_marks_duplicate() {
        let registry = TrackerRegistry::default();
        registry.open("call-1");
        assert!(!registry.is_closed("call-1"));

        assert!(registry.close("call-1").is_some());
        assert!(registry.is_closed("call-1"));
        assert!(registry.get("call-1").is_none());
        assert!(registry.close("call-1").is_none());
    }

    #[test]
    fn test_open_with_resumes_context() {
        let registry = TrackerRegistry::default();
        let tracker = registry.open_with("call-2", || ConversationContext {
            uncooperative_count: 2,
            ..ConversationContext::new()
        });
        assert_eq!(tracker.lock().context().uncooperative_count, 2);

        // init is ignored once open
        let again = registry.open_with("call-2", ConversationContext::new);
        assert_eq!(again.lock().context().uncooperative_count, 2);
    }

    #[test]
    fn test_close_guard_is_exclusive() {
        let registry = TrackerRegistry::default();
        registry.open("call-1");

        let guard = registry.begin_close("call-1").unwrap();
        assert!(registry.begin_close("call-1").is_none());

        guard.commit();
        assert!(registry.is_closed("call-1"));
        assert_eq!(registry.count(), 0);
        assert!(registry.begin_close("call-1").is_none());
    }

    #[test]
    fn test_dropped_guard_allows_retry() {
        let registry = TrackerRegistry::default();
        registry.open("call-1");

        drop(registry.begin_close("call-1").unwrap());

        assert!(!registry.is_closed("call-1"));
        assert_eq!(registry.count(), 1);
        assert!(registry.begin_close("call-1").is_some());
    }

    #[test]
    fn test_cleanup_drops_idle_trackers() {
        let registry = TrackerRegistry::new(limits(0, 86400));
        registry.open("call-1");
        registry.open("call-2");

        assert_eq!(registry.cleanup_expired(), 2);
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_cleanup_keeps_active_trackers() {
        let registry = TrackerRegistry::default();
        registry.open("call-1");

        assert_eq!(registry.cleanup_expired(), 0);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_closed_ids_age_out() {
        let registry = TrackerRegistry::new(limits(3600, 0));
        registry.open("call-1");
        registry.close("call-1");
        assert_eq!(registry.closed_count(), 1);

        registry.cleanup_expired();
        assert_eq!(registry.closed_count(), 0);
        assert!(!registry.is_closed("call-1"));

        let kept = TrackerRegistry::default();
        kept.close("call-2");
        kept.cleanup_expired();
        assert!(kept.is_closed("call-2"));
    }

    #[tokio::test]
    async fn test_cleanup_task_stops_on_shutdown() {
        let registry = Arc::new(TrackerRegistry::new(TrackerConfig {
            idle_timeout_secs: 0,
            cleanup_interval_secs: 1,
            ..TrackerConfig::default()
        }));
        registry.open("call-1");

        let shutdown = registry.start_cleanup_task();
        // the first interval tick fires immediately
        tokio::time::timeout(Duration::from_secs(2), async {
            while registry.count() > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("idle tracker swept");

        assert!(shutdown.send(true).is_ok());
    }
}
