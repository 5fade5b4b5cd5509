//! Periodic identifier rotation.
//!
//! Two independent timers run while rotation is enabled: the primary tick,
//! which generates (and optionally applies) a fresh identifier every interval,
//! and a one-second countdown tick that only refreshes observers. A primary
//! tick that fires while the previous apply is still in flight is dropped,
//! never queued. Once an apply completes, the next tick is due one full
//! interval later. Stopping leaves an in-flight apply running; `drain` waits
//! for it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::domain::entities::Identifier;
use crate::domain::ports::notification::StatusLevel;
use crate::DEFAULT_ROTATION_MINUTES;

const COUNTDOWN_PERIOD: Duration = Duration::from_secs(1);
const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Capabilities the scheduler needs from the layer that owns it.
#[async_trait]
pub trait RotationHooks: Send + Sync {
    /// Produce the next identifier.
    fn generate(&self) -> Identifier {
        Identifier::generate()
    }

    /// Hand a freshly generated identifier to the consumer, whether or not it
    /// will be applied.
    fn offer(&self, identifier: &Identifier);

    /// Apply the identifier. Errors are reported, never propagated.
    async fn apply(&self, identifier: &Identifier) -> crate::Result<()>;

    /// Convert the configured interval text into a period.
    fn interval_from(&self, raw: &str) -> Duration {
        minutes_to_duration(raw)
    }

    fn report_status(&self, message: &str, level: StatusLevel);

    /// Redraw the countdown; `None` once rotation is stopped.
    fn refresh_countdown(&self, remaining: Option<Duration>);
}

/// Parameters for one rotation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationOptions {
    pub auto_apply: bool,
    /// Interval text, in minutes unless the hooks say otherwise.
    pub interval: String,
}

impl Default for RotationOptions {
    fn default() -> Self {
        Self {
            auto_apply: true,
            interval: DEFAULT_ROTATION_MINUTES.to_string(),
        }
    }
}

/// Default interval converter: leading integer minutes; anything malformed or
/// non-positive falls back to five minutes.
pub fn minutes_to_duration(raw: &str) -> Duration {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();

    match digits.parse::<u64>() {
        Ok(minutes) if minutes > 0 => Duration::from_secs(minutes.saturating_mul(60)),
        _ => Duration::from_secs(DEFAULT_ROTATION_MINUTES * 60),
    }
}

// ============================================================================
// RUN STATE
// ============================================================================

/// State of one start..stop run. A restart gets a fresh run, so a tick still
/// in flight from an earlier run can never touch the current one.
struct RunState {
    applying: AtomicBool,
    active: AtomicBool,
    deadline: Mutex<Option<Instant>>,
    /// Handle of the most recently spawned tick.
    tick: Mutex<Option<JoinHandle<()>>>,
}

impl RunState {
    fn new(deadline: Instant) -> Self {
        Self {
            applying: AtomicBool::new(false),
            active: AtomicBool::new(true),
            deadline: Mutex::new(Some(deadline)),
            tick: Mutex::new(None),
        }
    }

    fn deadline(&self) -> Option<Instant> {
        *self.deadline.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_deadline(&self, deadline: Option<Instant>) {
        *self.deadline.lock().unwrap_or_else(|e| e.into_inner()) = deadline;
    }

    fn remaining(&self) -> Option<Duration> {
        if !self.active.load(Ordering::Acquire) {
            return None;
        }
        self.deadline()
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Marks the run inactive and hands back the last tick, if any.
    fn cancel(&self) -> Option<JoinHandle<()>> {
        self.active.store(false, Ordering::Release);
        self.applying.store(false, Ordering::Release);
        self.set_deadline(None);
        self.tick.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

/// Clears the applying flag however the tick ends, panics included.
struct ApplyingGuard {
    run: Arc<RunState>,
}

impl Drop for ApplyingGuard {
    fn drop(&mut self) {
        self.run.applying.store(false, Ordering::Release);
    }
}

// ============================================================================
// SCHEDULER
// ============================================================================

/// Owns the rotation timers and their state. Must be used inside a tokio
/// runtime.
pub struct RotationScheduler {
    hooks: Arc<dyn RotationHooks>,
    run: Option<Arc<RunState>>,
    primary: Option<JoinHandle<()>>,
    countdown: Option<JoinHandle<()>>,
    /// Ticks of stopped runs that were still applying.
    pending: Vec<JoinHandle<()>>,
}

impl RotationScheduler {
    pub fn new(hooks: Arc<dyn RotationHooks>) -> Self {
        Self {
            hooks,
            run: None,
            primary: None,
            countdown: None,
            pending: Vec::new(),
        }
    }

    /// Replace the hooks. Takes effect on the next `start`; does not arm timers.
    pub fn configure(&mut self, hooks: Arc<dyn RotationHooks>) {
        self.hooks = hooks;
    }

    /// Start (or restart) rotation. Any previous run is stopped first, so at
    /// most one primary timer is ever armed. Changing the interval means
    /// calling this again.
    pub fn start(&mut self, options: RotationOptions) {
        self.stop();

        let mut interval = self.hooks.interval_from(&options.interval);
        if interval < MIN_INTERVAL {
            warn!(?interval, "rotation interval too short, clamping");
            interval = MIN_INTERVAL;
        }

        let run = Arc::new(RunState::new(Instant::now() + interval));
        self.run = Some(run.clone());

        self.primary = Some(tokio::spawn(primary_loop(
            self.hooks.clone(),
            run.clone(),
            interval,
            options.auto_apply,
        )));
        self.countdown = Some(tokio::spawn(countdown_loop(self.hooks.clone(), run.clone())));

        info!(?interval, auto_apply = options.auto_apply, "rotation started");
        self.hooks.refresh_countdown(run.remaining());
    }

    /// Cancel both timers. Safe to call when already stopped. A tick already
    /// applying runs to completion and still reports its outcome; await
    /// [`drain`](Self::drain) before shutting the runtime down.
    pub fn stop(&mut self) {
        let was_running = self.primary.is_some();

        if let Some(handle) = self.primary.take() {
            handle.abort();
        }
        if let Some(handle) = self.countdown.take() {
            handle.abort();
        }
        if let Some(run) = self.run.take() {
            if let Some(tick) = run.cancel() {
                self.pending.push(tick);
            }
        }
        self.pending.retain(|tick| !tick.is_finished());

        if was_running {
            info!("rotation stopped");
        }
        self.hooks.refresh_countdown(None);
    }

    /// True while the primary timer is armed.
    pub fn is_enabled(&self) -> bool {
        self.primary.is_some()
    }

    /// When the next primary tick is due; `None` when stopped.
    pub fn deadline(&self) -> Option<Instant> {
        self.run.as_ref().and_then(|run| run.deadline())
    }

    /// Time left until the next primary tick; `None` when stopped.
    pub fn remaining(&self) -> Option<Duration> {
        self.run.as_ref().and_then(|run| run.remaining())
    }

    /// True while a stopped run still has an apply in flight.
    pub fn has_pending(&self) -> bool {
        self.pending.iter().any(|tick| !tick.is_finished())
    }

    /// Wait for applies left running by `stop`.
    pub async fn drain(&mut self) {
        for tick in std::mem::take(&mut self.pending) {
            if let Err(e) = tick.await {
                warn!(error = %e, "rotation tick ended abnormally");
            }
        }
    }

    /// True while a tick's apply is in flight.
    pub fn is_applying(&self) -> bool {
        self.run
            .as_ref()
            .map_or(false, |run| run.applying.load(Ordering::Acquire))
    }
}

impl Drop for RotationScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.primary.take() {
            handle.abort();
        }
        if let Some(handle) = self.countdown.take() {
            handle.abort();
        }
    }
}

async fn primary_loop(
    hooks: Arc<dyn RotationHooks>,
    run: Arc<RunState>,
    interval: Duration,
    auto_apply: bool,
) {
    loop {
        let Some(due) = run.deadline() else {
            return;
        };
        tokio::time::sleep_until(due).await;

        // a completed apply pushed the deadline out; wait for the new one
        if run.deadline() != Some(due) {
            continue;
        }
        run.set_deadline(Some(Instant::now() + interval));

        if run
            .applying
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("rotation tick dropped, previous apply still in flight");
            continue;
        }

        // detached so that stop() cannot cut an apply short. Spawned under the
        // slot lock so stop() either sees the handle or the loop sees the stop.
        {
            let mut slot = run.tick.lock().unwrap_or_else(|e| e.into_inner());
            if !run.active.load(Ordering::Acquire) {
                return;
            }
            *slot = Some(tokio::spawn(run_tick(hooks.clone(), run.clone(), interval, auto_apply)));
        }
    }
}

async fn run_tick(
    hooks: Arc<dyn RotationHooks>,
    run: Arc<RunState>,
    interval: Duration,
    auto_apply: bool,
) {
    let guard = ApplyingGuard { run: run.clone() };

    let identifier = hooks.generate();
    debug!(%identifier, auto_apply, "rotation tick");
    hooks.offer(&identifier);

    if auto_apply {
        if let Err(e) = hooks.apply(&identifier).await {
            warn!(%identifier, error = %e, "auto-apply failed");
            hooks.report_status(&format!("Auto-apply failed: {}", e), StatusLevel::Error);
        }
    }

    drop(guard);

    // next deadline counts from completion, so slow applies stretch the period
    if run.active.load(Ordering::Acquire) {
        run.set_deadline(Some(Instant::now() + interval));
        hooks.refresh_countdown(run.remaining());
    }
}

async fn countdown_loop(hooks: Arc<dyn RotationHooks>, run: Arc<RunState>) {
    let mut ticker = tokio::time::interval_at(Instant::now() + COUNTDOWN_PERIOD, COUNTDOWN_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        hooks.refresh_countdown(run.remaining());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PoserError;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct RecordingHooks {
        apply_delay: Duration,
        fail_apply: bool,
        interval: Option<Duration>,
        offered: Mutex<Vec<Identifier>>,
        applies_started: AtomicUsize,
        applies_finished: AtomicUsize,
        statuses: Mutex<Vec<(String, StatusLevel)>>,
        refreshes: Mutex<Vec<Option<Duration>>>,
    }

    impl RecordingHooks {
        fn with_interval(interval: Duration) -> Self {
            Self {
                interval: Some(interval),
                ..Default::default()
            }
        }

        fn started(&self) -> usize {
            self.applies_started.load(Ordering::SeqCst)
        }

        fn finished(&self) -> usize {
            self.applies_finished.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RotationHooks for RecordingHooks {
        fn offer(&self, identifier: &Identifier) {
            self.offered.lock().unwrap().push(*identifier);
        }

        async fn apply(&self, _identifier: &Identifier) -> crate::Result<()> {
            self.applies_started.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.apply_delay).await;
            self.applies_finished.fetch_add(1, Ordering::SeqCst);
            if self.fail_apply {
                Err(PoserError::PermissionDenied("User did not grant permission.".into()))
            } else {
                Ok(())
            }
        }

        fn interval_from(&self, raw: &str) -> Duration {
            self.interval.unwrap_or_else(|| minutes_to_duration(raw))
        }

        fn report_status(&self, message: &str, level: StatusLevel) {
            self.statuses.lock().unwrap().push((message.to_string(), level));
        }

        fn refresh_countdown(&self, remaining: Option<Duration>) {
            self.refreshes.lock().unwrap().push(remaining);
        }
    }

    const INTERVAL: Duration = Duration::from_secs(10);

    fn scheduler(hooks: &Arc<RecordingHooks>) -> RotationScheduler {
        RotationScheduler::new(hooks.clone())
    }

    #[test]
    fn test_minutes_to_duration() {
        assert_eq!(minutes_to_duration("1"), Duration::from_secs(60));
        assert_eq!(minutes_to_duration(" 15 "), Duration::from_secs(900));
        assert_eq!(minutes_to_duration("10min"), Duration::from_secs(600));
        assert_eq!(minutes_to_duration("abc"), Duration::from_secs(300));
        assert_eq!(minutes_to_duration(""), Duration::from_secs(300));
        assert_eq!(minutes_to_duration("0"), Duration::from_secs(300));
        assert_eq!(minutes_to_duration("-3"), Duration::from_secs(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_apply_every_interval() {
        let hooks = Arc::new(RecordingHooks::with_interval(INTERVAL));
        let mut rotation = scheduler(&hooks);
        rotation.start(RotationOptions::default());
        assert!(rotation.is_enabled());

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(hooks.started(), 3);
        assert_eq!(hooks.offered.lock().unwrap().len(), 3);
        assert!(hooks
            .offered
            .lock()
            .unwrap()
            .iter()
            .all(|id| id.is_locally_administered() && id.is_unicast()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_keeps_single_timer_and_resets_deadline() {
        let hooks = Arc::new(RecordingHooks::with_interval(INTERVAL));
        let mut rotation = scheduler(&hooks);

        rotation.start(RotationOptions::default());
        tokio::time::sleep(Duration::from_secs(4)).await;
        rotation.start(RotationOptions::default());

        assert!(rotation.is_enabled());
        assert_eq!(rotation.deadline(), Some(Instant::now() + INTERVAL));

        // one timer armed at t=4s: ticks at 14, 24, 34
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(hooks.started(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_apply_drops_overlapping_tick() {
        let hooks = Arc::new(RecordingHooks {
            apply_delay: INTERVAL * 3 / 2,
            interval: Some(INTERVAL),
            ..Default::default()
        });
        let mut rotation = scheduler(&hooks);
        rotation.start(RotationOptions::default());

        tokio::time::sleep(INTERVAL * 3 + Duration::from_secs(1)).await;
        // tick at 10s applies until 25s, the 20s tick is dropped and the
        // deadline is re-armed from completion to 35s
        assert!(hooks.started() <= 2);
        assert_eq!(hooks.started(), 1);
        assert_eq!(hooks.offered.lock().unwrap().len(), 1);
        assert_eq!(rotation.remaining(), Some(Duration::from_secs(4)));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(hooks.started(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_counts_from_completion() {
        let hooks = Arc::new(RecordingHooks {
            apply_delay: Duration::from_secs(4),
            interval: Some(INTERVAL),
            ..Default::default()
        });
        let mut rotation = scheduler(&hooks);
        rotation.start(RotationOptions::default());

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(hooks.finished(), 1);
        // apply finished at 14s, so the next deadline is 24s, not 20s
        assert_eq!(rotation.remaining(), Some(Duration::from_secs(9)));
        assert!(!rotation.is_applying());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_clears_state_and_halts_ticks() {
        let hooks = Arc::new(RecordingHooks::with_interval(INTERVAL));
        let mut rotation = scheduler(&hooks);
        rotation.start(RotationOptions::default());
        rotation.stop();

        assert!(!rotation.is_enabled());
        assert_eq!(rotation.deadline(), None);
        assert_eq!(rotation.remaining(), None);
        assert_eq!(hooks.refreshes.lock().unwrap().last(), Some(&None));

        tokio::time::sleep(INTERVAL * 2).await;
        assert_eq!(hooks.started(), 0);

        // stopping twice is harmless
        rotation.stop();
        assert!(!rotation.is_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_apply_is_reported_and_rotation_continues() {
        let hooks = Arc::new(RecordingHooks {
            fail_apply: true,
            interval: Some(INTERVAL),
            ..Default::default()
        });
        let mut rotation = scheduler(&hooks);
        rotation.start(RotationOptions::default());

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(hooks.started(), 2);
        assert!(rotation.is_enabled());

        let statuses = hooks.statuses.lock().unwrap();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].1, StatusLevel::Error);
        assert!(statuses[0].0.starts_with("Auto-apply failed: "));
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_auto_apply_only_offers() {
        let hooks = Arc::new(RecordingHooks::with_interval(INTERVAL));
        let mut rotation = scheduler(&hooks);
        rotation.start(RotationOptions {
            auto_apply: false,
            interval: "1".to_string(),
        });

        tokio::time::sleep(Duration::from_secs(21)).await;
        assert_eq!(hooks.started(), 0);
        assert_eq!(hooks.offered.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_apply_still_reports_but_keeps_deadline_clear() {
        let hooks = Arc::new(RecordingHooks {
            apply_delay: Duration::from_secs(5),
            fail_apply: true,
            interval: Some(INTERVAL),
            ..Default::default()
        });
        let mut rotation = scheduler(&hooks);
        rotation.start(RotationOptions::default());

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(hooks.started(), 1);
        rotation.stop();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(hooks.finished(), 1);
        assert_eq!(hooks.statuses.lock().unwrap().len(), 1);
        assert_eq!(rotation.deadline(), None);
        assert_eq!(hooks.refreshes.lock().unwrap().last(), Some(&None));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_waits_for_apply_left_by_stop() {
        let hooks = Arc::new(RecordingHooks {
            apply_delay: Duration::from_millis(300),
            fail_apply: true,
            interval: Some(Duration::from_millis(100)),
            ..Default::default()
        });
        let mut rotation = scheduler(&hooks);
        rotation.start(RotationOptions::default());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(rotation.is_applying());
        rotation.stop();
        assert!(rotation.has_pending());
        assert_eq!(hooks.finished(), 0);

        rotation.drain().await;
        assert_eq!(hooks.finished(), 1);
        assert_eq!(hooks.statuses.lock().unwrap().len(), 1);
        assert!(!rotation.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_without_ticks_returns_immediately() {
        let hooks = Arc::new(RecordingHooks::with_interval(INTERVAL));
        let mut rotation = scheduler(&hooks);
        rotation.start(RotationOptions::default());
        rotation.stop();

        let before = Instant::now();
        rotation.drain().await;
        assert_eq!(Instant::now(), before);
        assert!(!rotation.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_refreshes_every_second() {
        let hooks = Arc::new(RecordingHooks::with_interval(Duration::from_secs(60)));
        let mut rotation = scheduler(&hooks);
        rotation.start(RotationOptions::default());
        let primed = hooks.refreshes.lock().unwrap().len();

        tokio::time::sleep(Duration::from_millis(3500)).await;
        let refreshes = hooks.refreshes.lock().unwrap();
        assert_eq!(refreshes.len() - primed, 3);
        assert_eq!(refreshes.last(), Some(&Some(Duration::from_secs(57))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_configure_replaces_hooks_on_next_start() {
        let first = Arc::new(RecordingHooks::with_interval(INTERVAL));
        let second = Arc::new(RecordingHooks::with_interval(INTERVAL));
        let mut rotation = scheduler(&first);
        rotation.configure(second.clone());
        assert!(!rotation.is_enabled());

        rotation.start(RotationOptions::default());
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(first.started(), 0);
        assert_eq!(second.started(), 1);
    }
}
