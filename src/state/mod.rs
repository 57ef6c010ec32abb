//! Shared session state: the authoritative game, its clocks, and the store.

pub mod game;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{RwLock, mpsc, watch};
use tracing::{info, warn};

use crate::clock::{ClockSignal, ClockState, GameClock, ShotClock};
use crate::dao::models::GameSnapshot;
use crate::dao::storage::StorageResult;
use crate::dao::store::DurableStore;
use crate::error::GameError;
use crate::services::outbox;
use crate::state::game::{
    EventKind, GameEvent, GameMode, GameState, GameStatus, Player, TeamSide,
};

/// Shared handle to the scoreboard session.
pub type SharedScoreboard = Arc<Scoreboard>;

struct Clocks {
    game: GameClock,
    shot: ShotClock,
}

/// Central session state for one live scoreboard.
///
/// Holds the authoritative [`GameState`] behind a lock, the two countdown
/// clocks, and the durable store handle. All game mutations run to
/// completion under the lock; persistence and sync failures are logged and
/// absorbed since the in-memory game is the source of truth for the active
/// session.
pub struct Scoreboard {
    store: Arc<dyn DurableStore>,
    game: RwLock<GameState>,
    clocks: Mutex<Clocks>,
    remaining_game: watch::Receiver<u32>,
    remaining_shot: watch::Receiver<u32>,
    signals: Mutex<Option<mpsc::UnboundedReceiver<ClockSignal>>>,
    location: Option<String>,
}

impl Scoreboard {
    /// Create a fresh session in `Setup`.
    pub fn new(
        store: Arc<dyn DurableStore>,
        mode: GameMode,
        timer_minutes: u32,
        location: Option<String>,
    ) -> SharedScoreboard {
        Self::with_game(store, GameState::new(mode, timer_minutes), location)
    }

    /// Rebuild a session from a recovered snapshot.
    pub fn resume(
        store: Arc<dyn DurableStore>,
        snapshot: GameSnapshot,
        location: Option<String>,
    ) -> SharedScoreboard {
        info!(game_id = %snapshot.id, "resuming interrupted game");
        Self::with_game(store, snapshot.into(), location)
    }

    fn with_game(
        store: Arc<dyn DurableStore>,
        game: GameState,
        location: Option<String>,
    ) -> SharedScoreboard {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (game_clock, remaining_game) = GameClock::new(game.timer_minutes, signal_tx.clone());
        let (shot_clock, remaining_shot) = ShotClock::new(signal_tx);
        Arc::new(Self {
            store,
            game: RwLock::new(game),
            clocks: Mutex::new(Clocks { game: game_clock, shot: shot_clock }),
            remaining_game,
            remaining_shot,
            signals: Mutex::new(Some(signal_rx)),
            location,
        })
    }

    /// The authoritative game record.
    pub fn game(&self) -> &RwLock<GameState> {
        &self.game
    }

    /// Take the clock expiry signal receiver. The UI layer consumes it;
    /// expiry has no state-machine side effect.
    pub fn take_clock_signals(&self) -> Option<mpsc::UnboundedReceiver<ClockSignal>> {
        self.lock_signals().take()
    }

    /// Watchers for the remaining seconds of (game clock, shot clock).
    pub fn clock_watchers(&self) -> (watch::Receiver<u32>, watch::Receiver<u32>) {
        (self.remaining_game.clone(), self.remaining_shot.clone())
    }

    /// Transition `Setup` to `Live`; requires both team names.
    pub async fn start_game(&self) -> Result<(), GameError> {
        self.game.write().await.start_game()
    }

    /// Set the team names while in `Setup`.
    pub async fn set_teams(&self, home: String, away: String) {
        let mut game = self.game.write().await;
        if game.status == GameStatus::Setup {
            game.home_team = home;
            game.away_team = away;
        }
    }

    /// Apply a signed score delta, floored at zero per the scoring rules.
    pub async fn add_score(&self, team: TeamSide, delta: i32) {
        self.game.write().await.add_score(team, delta);
    }

    /// Increment a team foul.
    pub async fn add_foul(&self, team: TeamSide) {
        self.game.write().await.add_foul(team);
    }

    /// Decrement a team foul.
    pub async fn remove_foul(&self, team: TeamSide) {
        self.game.write().await.remove_foul(team);
    }

    /// Record an attributable event (stats mode) and apply its clock rules:
    /// defensive rebounds and steals fully reset the shot clock.
    pub async fn record_event(
        &self,
        team: TeamSide,
        kind: EventKind,
        points: u32,
        player: Option<Player>,
        shot_detail: Option<String>,
    ) {
        let recorded = self
            .game
            .write()
            .await
            .record_event(team, kind, points, player, shot_detail);
        if recorded.is_some()
            && matches!(kind, EventKind::Steal | EventKind::Rebound { defensive: true })
        {
            self.lock_clocks().shot.reset_full();
        }
    }

    /// Undo the most recent event while its quarter is still open.
    pub async fn undo_last_event(&self) -> Result<Option<GameEvent>, GameError> {
        self.game.write().await.undo_last_event()
    }

    /// Close the open quarter and progress the game. Both clocks reset on a
    /// quarter transition; a game that just went `Final` is finalized.
    pub async fn advance_quarter(&self) -> Result<GameStatus, GameError> {
        let status = {
            let mut game = self.game.write().await;
            game.advance_quarter()?
        };
        {
            let mut clocks = self.lock_clocks();
            clocks.game.reset();
            clocks.shot.stop();
            clocks.shot.reset_full();
        }
        if status == GameStatus::Final {
            self.finalize().await;
        }
        Ok(status)
    }

    /// Force the game `Final` and run the finalize protocol. Idempotent for
    /// games that already ended.
    pub async fn finish_game(&self) {
        let newly_final = {
            let mut game = self.game.write().await;
            let was_in_progress = game.is_in_progress();
            game.end_game();
            was_in_progress && game.status == GameStatus::Final
        };
        if newly_final {
            self.finalize().await;
        }
    }

    /// Discard the session and return to `Setup`.
    ///
    /// The confirmation gate is owned by the caller: this method assumes the
    /// user already confirmed the discard.
    pub async fn reset(&self, keep_teams: bool) {
        self.game.write().await.reset(keep_teams);
        {
            let mut clocks = self.lock_clocks();
            clocks.game.reset();
            clocks.shot.stop();
            clocks.shot.reset_full();
        }
        if let Err(err) = self.store.clear_current().await {
            warn!(error = %err, "failed to clear current-game slot after reset");
        }
    }

    /// Snapshot the current game for persistence.
    pub async fn snapshot(&self) -> GameSnapshot {
        GameSnapshot::from(&*self.game.read().await)
    }

    /// Write the current snapshot to the store while the game is in progress.
    ///
    /// The game lock is held across the write, so a finish or reset that
    /// clears the current-game slot cannot land between the status check and
    /// the write. Returns whether a snapshot was written.
    pub async fn persist_if_in_progress(&self) -> StorageResult<bool> {
        let game = self.game.read().await;
        if !game.is_in_progress() {
            return Ok(false);
        }
        let snapshot = GameSnapshot::from(&*game);
        self.store.write_current(snapshot).await?;
        Ok(true)
    }

    /// Whether autosave should be writing (status `Live` or `Overtime`).
    pub async fn is_in_progress(&self) -> bool {
        self.game.read().await.is_in_progress()
    }

    /// Start or resume the game clock.
    pub fn start_clock(&self) {
        self.lock_clocks().game.start();
    }

    /// Pause the game clock, keeping the remaining time.
    pub fn pause_clock(&self) {
        self.lock_clocks().game.pause();
    }

    /// Current run state of the game clock.
    pub fn clock_state(&self) -> ClockState {
        self.lock_clocks().game.state()
    }

    /// Change the configured game clock duration (clamped); reloads the
    /// display only while the clock is not running.
    pub async fn set_clock_minutes(&self, minutes: u32) {
        let clamped = {
            let mut clocks = self.lock_clocks();
            clocks.game.set_duration_minutes(minutes);
            clocks.game.duration_minutes()
        };
        self.game.write().await.timer_minutes = clamped;
    }

    /// Start or resume the shot clock (stats mode).
    pub fn start_shot_clock(&self) {
        self.lock_clocks().shot.start();
    }

    /// Stop the shot clock without resetting it.
    pub fn stop_shot_clock(&self) {
        self.lock_clocks().shot.stop();
    }

    /// Explicit continuation trigger: reload the reduced shot clock value.
    pub fn shot_clock_continuation(&self) {
        self.lock_clocks().shot.reset_continuation();
    }

    /// Finalize protocol for a game that reached `Final`: copy to history,
    /// clear the current slot, and enqueue the remote writes. Every failure
    /// here degrades to "keep playing locally".
    async fn finalize(&self) {
        let (snapshot, items) = {
            let game = self.game.read().await;
            (
                GameSnapshot::from(&*game),
                outbox::items_for_finished_game(&game, self.location.clone()),
            )
        };
        {
            let mut clocks = self.lock_clocks();
            clocks.game.pause();
            clocks.shot.stop();
        }
        info!(game_id = %snapshot.id, "finalizing game");
        if let Err(err) = self.store.append_history(snapshot.clone()).await {
            warn!(error = %err, "failed to append finished game to history");
        }
        if let Err(err) = self.store.clear_current().await {
            warn!(error = %err, "failed to clear current-game slot");
        }
        if let Err(err) = outbox::enqueue(self.store.as_ref(), items).await {
            warn!(error = %err, "failed to enqueue sync outbox items");
        }
    }

    fn lock_clocks(&self) -> MutexGuard<'_, Clocks> {
        self.clocks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_signals(&self) -> MutexGuard<'_, Option<mpsc::UnboundedReceiver<ClockSignal>>> {
        self.signals.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
