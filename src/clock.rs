//! Countdown clocks: the game clock and the stats-mode shot clock.
//!
//! Both clocks are cooperative 1 Hz tickers running as cancellable tokio
//! tasks. Pausing, resetting, or dropping a clock aborts its ticker, so a
//! torn-down view can never leave an orphaned timer double-decrementing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Shot clock value after a full possession reset.
pub const SHOT_CLOCK_FULL_SECS: u32 = 24;
/// Shot clock value after a continuation reset (offensive rebound).
pub const SHOT_CLOCK_CONTINUATION_SECS: u32 = 14;
/// Shortest configurable game clock duration.
pub const MIN_GAME_CLOCK_MINUTES: u32 = 1;
/// Longest configurable game clock duration.
pub const MAX_GAME_CLOCK_MINUTES: u32 = 30;

/// Run state of a countdown clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    /// Not counting; remaining time holds its last value.
    Stopped,
    /// Counting down once per real second.
    Running,
    /// Counting suspended, remaining time frozen.
    Paused,
}

/// Expiry notifications observed by the UI layer. No state-machine effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSignal {
    /// The game clock reached zero.
    GameClockExpired,
    /// The shot clock reached zero.
    ShotClockExpired,
}

struct Shared {
    remaining: Mutex<u32>,
    remaining_tx: watch::Sender<u32>,
}

impl Shared {
    fn remaining(&self) -> MutexGuard<'_, u32> {
        self.remaining.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cancellable 1 Hz countdown shared by both clock flavors.
struct Countdown {
    shared: Arc<Shared>,
    state: ClockState,
    ticker: Option<JoinHandle<()>>,
    signal: ClockSignal,
    signals: mpsc::UnboundedSender<ClockSignal>,
}

impl Countdown {
    fn new(
        initial_secs: u32,
        signal: ClockSignal,
        signals: mpsc::UnboundedSender<ClockSignal>,
    ) -> (Self, watch::Receiver<u32>) {
        let (remaining_tx, remaining_rx) = watch::channel(initial_secs);
        let countdown = Self {
            shared: Arc::new(Shared {
                remaining: Mutex::new(initial_secs),
                remaining_tx,
            }),
            state: ClockState::Stopped,
            ticker: None,
            signal,
            signals,
        };
        (countdown, remaining_rx)
    }

    fn state(&self) -> ClockState {
        self.state
    }

    fn remaining_secs(&self) -> u32 {
        *self.shared.remaining()
    }

    fn start(&mut self) {
        if self.state == ClockState::Running || self.remaining_secs() == 0 {
            return;
        }
        self.state = ClockState::Running;
        let shared = Arc::clone(&self.shared);
        let signal = self.signal;
        let signals = self.signals.clone();
        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a tokio interval fires immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let remaining = {
                    let mut remaining = shared.remaining();
                    *remaining = remaining.saturating_sub(1);
                    *remaining
                };
                let _ = shared.remaining_tx.send(remaining);
                if remaining == 0 {
                    let _ = signals.send(signal);
                    return;
                }
            }
        }));
        // The ticker cannot flip `state` back; expiry is observed lazily.
    }

    fn pause(&mut self) {
        if self.state != ClockState::Running {
            return;
        }
        self.cancel_ticker();
        self.state = ClockState::Paused;
    }

    fn stop(&mut self) {
        self.cancel_ticker();
        self.state = ClockState::Stopped;
    }

    fn reset(&mut self, secs: u32) {
        self.cancel_ticker();
        self.state = ClockState::Stopped;
        *self.shared.remaining() = secs;
        let _ = self.shared.remaining_tx.send(secs);
    }

    /// Reconcile `state` with a ticker that expired on its own.
    fn settle(&mut self) {
        if self.state == ClockState::Running && self.remaining_secs() == 0 {
            self.state = ClockState::Stopped;
            self.ticker = None;
        }
    }

    fn cancel_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.cancel_ticker();
    }
}

/// The main countdown clock, configurable in whole minutes.
pub struct GameClock {
    countdown: Countdown,
    duration_minutes: u32,
}

impl GameClock {
    /// Build a stopped clock at the given duration, clamped to the bounds.
    pub fn new(
        duration_minutes: u32,
        signals: mpsc::UnboundedSender<ClockSignal>,
    ) -> (Self, watch::Receiver<u32>) {
        let duration_minutes = clamp_minutes(duration_minutes);
        let (countdown, remaining_rx) = Countdown::new(
            duration_minutes * 60,
            ClockSignal::GameClockExpired,
            signals,
        );
        (Self { countdown, duration_minutes }, remaining_rx)
    }

    /// Current run state, folding in self-expiry.
    pub fn state(&mut self) -> ClockState {
        self.countdown.settle();
        self.countdown.state()
    }

    /// Seconds left on the clock.
    pub fn remaining_secs(&self) -> u32 {
        self.countdown.remaining_secs()
    }

    /// Configured duration in minutes.
    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    /// Begin (or resume) counting down.
    pub fn start(&mut self) {
        self.countdown.settle();
        self.countdown.start();
    }

    /// Freeze the clock, keeping the remaining time.
    pub fn pause(&mut self) {
        self.countdown.settle();
        self.countdown.pause();
    }

    /// Stop and reload the configured duration. Used on quarter transitions.
    pub fn reset(&mut self) {
        self.countdown.reset(self.duration_minutes * 60);
    }

    /// Change the configured duration.
    ///
    /// The new value is clamped to the allowed range and only reloads the
    /// display when the clock is not running.
    pub fn set_duration_minutes(&mut self, minutes: u32) {
        self.duration_minutes = clamp_minutes(minutes);
        self.countdown.settle();
        if self.countdown.state() != ClockState::Running {
            self.countdown.reset(self.duration_minutes * 60);
        }
    }
}

/// Possession clock used by the stats scoreboard.
pub struct ShotClock {
    countdown: Countdown,
}

impl ShotClock {
    /// Build a stopped shot clock loaded with the full reset value.
    pub fn new(signals: mpsc::UnboundedSender<ClockSignal>) -> (Self, watch::Receiver<u32>) {
        let (countdown, remaining_rx) =
            Countdown::new(SHOT_CLOCK_FULL_SECS, ClockSignal::ShotClockExpired, signals);
        (Self { countdown }, remaining_rx)
    }

    /// Current run state, folding in self-expiry.
    pub fn state(&mut self) -> ClockState {
        self.countdown.settle();
        self.countdown.state()
    }

    /// Seconds left on the shot clock.
    pub fn remaining_secs(&self) -> u32 {
        self.countdown.remaining_secs()
    }

    /// Begin (or resume) counting down.
    pub fn start(&mut self) {
        self.countdown.settle();
        self.countdown.start();
    }

    /// Stop the shot clock without changing the remaining time.
    pub fn stop(&mut self) {
        self.countdown.stop();
    }

    /// Full possession reset (defensive rebound, steal, quarter change).
    ///
    /// Keeps counting if the clock was already running.
    pub fn reset_full(&mut self) {
        self.reload(SHOT_CLOCK_FULL_SECS);
    }

    /// Continuation reset to the reduced value (offensive rebound kept alive).
    pub fn reset_continuation(&mut self) {
        self.reload(SHOT_CLOCK_CONTINUATION_SECS);
    }

    fn reload(&mut self, secs: u32) {
        self.countdown.settle();
        let was_running = self.countdown.state() == ClockState::Running;
        self.countdown.reset(secs);
        if was_running {
            self.countdown.start();
        }
    }
}

fn clamp_minutes(minutes: u32) -> u32 {
    minutes.clamp(MIN_GAME_CLOCK_MINUTES, MAX_GAME_CLOCK_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{Duration, advance};

    fn signals() -> (
        mpsc::UnboundedSender<ClockSignal>,
        mpsc::UnboundedReceiver<ClockSignal>,
    ) {
        mpsc::unbounded_channel()
    }

    /// Step paused time one second at a time so each interval tick is
    /// observed by the ticker task before the next one fires.
    async fn run_secs(n: u64) {
        tokio::task::yield_now().await;
        for _ in 0..n {
            advance(Duration::from_secs(1)).await;
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn game_clock_decrements_once_per_second() {
        let (tx, _rx) = signals();
        let (mut clock, _remaining) = GameClock::new(10, tx);
        assert_eq!(clock.remaining_secs(), 600);

        clock.start();
        run_secs(3).await;
        assert_eq!(clock.remaining_secs(), 597);
        assert_eq!(clock.state(), ClockState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_clock_ignores_elapsed_time() {
        let (tx, _rx) = signals();
        let (mut clock, _remaining) = GameClock::new(5, tx);
        clock.start();
        run_secs(10).await;
        clock.pause();
        assert_eq!(clock.state(), ClockState::Paused);
        let frozen = clock.remaining_secs();

        run_secs(30).await;
        assert_eq!(clock.remaining_secs(), frozen);

        clock.start();
        run_secs(2).await;
        assert_eq!(clock.remaining_secs(), frozen - 2);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_stops_clock_and_raises_signal() {
        let (tx, mut rx) = signals();
        let (mut clock, _remaining) = GameClock::new(1, tx);
        clock.start();
        run_secs(60).await;

        assert_eq!(clock.remaining_secs(), 0);
        assert_eq!(clock.state(), ClockState::Stopped);
        assert_eq!(rx.try_recv().unwrap(), ClockSignal::GameClockExpired);
        // No further ticks after expiry.
        run_secs(5).await;
        assert_eq!(clock.remaining_secs(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn duration_change_only_reloads_when_not_running() {
        let (tx, _rx) = signals();
        let (mut clock, _remaining) = GameClock::new(10, tx);
        clock.start();
        run_secs(5).await;

        clock.set_duration_minutes(8);
        // Running: display untouched, new duration takes effect on reset.
        assert_eq!(clock.remaining_secs(), 595);
        clock.reset();
        assert_eq!(clock.remaining_secs(), 480);
        assert_eq!(clock.state(), ClockState::Stopped);

        clock.set_duration_minutes(12);
        assert_eq!(clock.remaining_secs(), 720);
    }

    #[tokio::test(start_paused = true)]
    async fn duration_is_clamped_to_bounds() {
        let (tx, _rx) = signals();
        let (mut clock, _remaining) = GameClock::new(99, tx);
        assert_eq!(clock.duration_minutes(), MAX_GAME_CLOCK_MINUTES);
        clock.set_duration_minutes(0);
        assert_eq!(clock.duration_minutes(), MIN_GAME_CLOCK_MINUTES);
    }

    #[tokio::test(start_paused = true)]
    async fn shot_clock_resets_keep_it_running() {
        let (tx, _rx) = signals();
        let (mut clock, _remaining) = ShotClock::new(tx);
        clock.start();
        run_secs(10).await;
        assert_eq!(clock.remaining_secs(), 14);

        clock.reset_full();
        assert_eq!(clock.remaining_secs(), SHOT_CLOCK_FULL_SECS);
        assert_eq!(clock.state(), ClockState::Running);

        clock.reset_continuation();
        assert_eq!(clock.remaining_secs(), SHOT_CLOCK_CONTINUATION_SECS);
        run_secs(2).await;
        assert_eq!(clock.remaining_secs(), 12);
    }

    #[tokio::test(start_paused = true)]
    async fn shot_clock_expiry_raises_signal_only() {
        let (tx, mut rx) = signals();
        let (mut shot, _remaining) = ShotClock::new(tx.clone());
        let (mut game, _remaining) = GameClock::new(10, tx);
        game.start();
        shot.start();

        run_secs(24).await;
        assert_eq!(rx.try_recv().unwrap(), ClockSignal::ShotClockExpired);
        // The game clock keeps running regardless.
        assert_eq!(game.state(), ClockState::Running);
        assert_eq!(game.remaining_secs(), 576);
    }

    #[tokio::test(start_paused = true)]
    async fn watch_channel_publishes_remaining_seconds() {
        let (tx, _rx) = signals();
        let (mut clock, remaining) = GameClock::new(2, tx);
        clock.start();
        run_secs(4).await;
        assert_eq!(*remaining.borrow(), 116);
    }
}
