//! Authoritative in-memory game model and the scoring/progression/undo rules.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GameError;

/// Team fouls are clamped to this ceiling within a quarter.
pub const MAX_TEAM_FOULS: u8 = 5;
/// Last regulation quarter; anything beyond is overtime.
pub const REGULATION_QUARTERS: u32 = 4;

/// Scoreboard variant the session was opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Score, fouls, and clock only.
    Basic,
    /// Adds the event ledger, player attribution, and the shot clock.
    Stats,
}

/// Side of the scoreboard an operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamSide {
    /// The home team.
    Home,
    /// The away team.
    Away,
}

/// Lifecycle status of a game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Teams editable, no score recorded yet.
    Setup,
    /// Regulation quarters 1 through 4.
    Live,
    /// Quarters 5 and up, entered only on a tie after quarter 4.
    Overtime,
    /// Terminal; no further mutation except an explicit reset.
    Final,
}

/// Closed-quarter entry in the locked ledger. Never mutated once appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuarterScore {
    /// Quarter this entry closed (1-based; 5+ are overtime periods).
    pub quarter: u32,
    /// Home points scored within that quarter.
    pub home: u32,
    /// Away points scored within that quarter.
    pub away: u32,
}

/// Kind of attributable action recorded in stats mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Made shot worth 1, 2, or 3 points.
    Basket,
    /// Missed shot attempt.
    MissedShot,
    /// Rebound; defensive rebounds fully reset the shot clock.
    Rebound {
        /// Whether the rebound changed possession.
        defensive: bool,
    },
    /// Assist on a made shot.
    Assist,
    /// Steal; fully resets the shot clock.
    Steal,
    /// Blocked shot.
    Block,
    /// Turnover.
    Turnover,
    /// Personal foul; increments the team foul counter.
    Foul,
}

/// Player attribution attached to a recorded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Display name.
    pub name: String,
    /// Jersey number as printed ("00" and "0" are distinct).
    pub jersey: String,
}

/// One attributable action in the event ledger, tagged with its quarter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameEvent {
    /// Stable identifier, used by the sync layer.
    pub id: Uuid,
    /// Team the event is credited to.
    pub team: TeamSide,
    /// What happened.
    pub kind: EventKind,
    /// Point value applied to the score (0 for non-scoring events).
    pub points: u32,
    /// Quarter the event occurred in.
    pub quarter: u32,
    /// Player the event is attributed to, when known.
    pub player: Option<Player>,
    /// Optional shot-type detail (e.g. "layup", "corner three").
    pub shot_detail: Option<String>,
}

/// Authoritative session record for one game on one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    /// Opaque session identifier, assigned at creation.
    pub id: Uuid,
    /// Scoreboard variant this session belongs to.
    pub mode: GameMode,
    /// Home team name; must be non-empty before the game may start.
    pub home_team: String,
    /// Away team name; must be non-empty before the game may start.
    pub away_team: String,
    /// Open quarter, 1-based; `4 + overtime_count` during overtime.
    pub quarter_index: u32,
    /// Number of overtime periods opened so far.
    pub overtime_count: u32,
    /// Home points in the open quarter only.
    pub current_quarter_home: u32,
    /// Away points in the open quarter only.
    pub current_quarter_away: u32,
    /// Locked ledger of closed quarters, append-only.
    pub quarter_scores: Vec<QuarterScore>,
    /// Event ledger; append-only except for tail pops via undo.
    pub events: Vec<GameEvent>,
    /// Home team fouls in the open quarter, clamped to [0, 5].
    pub home_fouls: u8,
    /// Away team fouls in the open quarter, clamped to [0, 5].
    pub away_fouls: u8,
    /// Lifecycle status.
    pub status: GameStatus,
    /// Configured game clock duration in minutes.
    pub timer_minutes: u32,
    /// Updated on every mutation; drives the recovery windows.
    pub last_modified: SystemTime,
}

impl GameState {
    /// Create a fresh session in `Setup` with empty team names.
    pub fn new(mode: GameMode, timer_minutes: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            mode,
            home_team: String::new(),
            away_team: String::new(),
            quarter_index: 1,
            overtime_count: 0,
            current_quarter_home: 0,
            current_quarter_away: 0,
            quarter_scores: Vec::new(),
            events: Vec::new(),
            home_fouls: 0,
            away_fouls: 0,
            status: GameStatus::Setup,
            timer_minutes,
            last_modified: SystemTime::now(),
        }
    }

    /// Total score for a team: closed ledger plus the open quarter.
    pub fn total(&self, team: TeamSide) -> u32 {
        let closed: u32 = self
            .quarter_scores
            .iter()
            .map(|quarter| match team {
                TeamSide::Home => quarter.home,
                TeamSide::Away => quarter.away,
            })
            .sum();
        closed
            + match team {
                TeamSide::Home => self.current_quarter_home,
                TeamSide::Away => self.current_quarter_away,
            }
    }

    /// Winning side, or `None` while tied.
    pub fn winner(&self) -> Option<TeamSide> {
        let home = self.total(TeamSide::Home);
        let away = self.total(TeamSide::Away);
        match home.cmp(&away) {
            std::cmp::Ordering::Greater => Some(TeamSide::Home),
            std::cmp::Ordering::Less => Some(TeamSide::Away),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Whether a session is in progress (autosave only runs in these states).
    pub fn is_in_progress(&self) -> bool {
        matches!(self.status, GameStatus::Live | GameStatus::Overtime)
    }

    fn touch(&mut self) {
        self.last_modified = SystemTime::now();
    }

    fn ensure_teams_named(&self) -> Result<(), GameError> {
        if self.home_team.trim().is_empty() || self.away_team.trim().is_empty() {
            return Err(GameError::Validation(
                "both team names must be set before the game can progress".into(),
            ));
        }
        Ok(())
    }

    /// Transition `Setup` to `Live`. No-op if the game already started.
    pub fn start_game(&mut self) -> Result<(), GameError> {
        if self.status != GameStatus::Setup {
            return Ok(());
        }
        self.ensure_teams_named()?;
        self.status = GameStatus::Live;
        self.touch();
        Ok(())
    }

    /// Apply a signed score delta to the open quarter, floored at zero.
    ///
    /// No-op once `Final`. Auto-starts the game on the first score when the
    /// team names are already set; with unnamed teams the points still count
    /// but the session stays in `Setup`.
    pub fn add_score(&mut self, team: TeamSide, delta: i32) {
        if self.status == GameStatus::Final {
            return;
        }
        if self.status == GameStatus::Setup {
            // Ignore the validation outcome: scoring is never rejected.
            let _ = self.start_game();
        }
        let slot = match team {
            TeamSide::Home => &mut self.current_quarter_home,
            TeamSide::Away => &mut self.current_quarter_away,
        };
        *slot = slot.saturating_add_signed(delta);
        self.touch();
    }

    /// Increment a team's quarter foul count, clamped at [`MAX_TEAM_FOULS`].
    pub fn add_foul(&mut self, team: TeamSide) {
        if self.status == GameStatus::Final {
            return;
        }
        let slot = match team {
            TeamSide::Home => &mut self.home_fouls,
            TeamSide::Away => &mut self.away_fouls,
        };
        *slot = (*slot + 1).min(MAX_TEAM_FOULS);
        self.touch();
    }

    /// Decrement a team's quarter foul count, floored at zero.
    pub fn remove_foul(&mut self, team: TeamSide) {
        if self.status == GameStatus::Final {
            return;
        }
        let slot = match team {
            TeamSide::Home => &mut self.home_fouls,
            TeamSide::Away => &mut self.away_fouls,
        };
        *slot = slot.saturating_sub(1);
        self.touch();
    }

    /// Record an attributable event in the open quarter (stats mode).
    ///
    /// Baskets apply their point value through the clamped scoring path and
    /// fouls increment the team foul counter, so the ledger and the counters
    /// stay consistent. No-op once `Final`. Returns the event id.
    pub fn record_event(
        &mut self,
        team: TeamSide,
        kind: EventKind,
        points: u32,
        player: Option<Player>,
        shot_detail: Option<String>,
    ) -> Option<Uuid> {
        if self.status == GameStatus::Final {
            return None;
        }
        if self.status == GameStatus::Setup {
            let _ = self.start_game();
        }
        let points = if kind == EventKind::Basket { points } else { 0 };
        let event = GameEvent {
            id: Uuid::new_v4(),
            team,
            kind,
            points,
            quarter: self.quarter_index,
            player,
            shot_detail,
        };
        if points > 0 {
            self.add_score(team, points as i32);
        }
        if kind == EventKind::Foul {
            self.add_foul(team);
        }
        let id = event.id;
        self.events.push(event);
        self.touch();
        Some(id)
    }

    /// Undo the most recent event, permitted only while its quarter is open.
    ///
    /// Reverses the score delta (floored at zero) and any team foul the event
    /// applied, then pops it off the ledger. Returns the removed event, or
    /// `None` when there is nothing to undo.
    pub fn undo_last_event(&mut self) -> Result<Option<GameEvent>, GameError> {
        if self.status == GameStatus::Final {
            return Ok(None);
        }
        let event_quarter = match self.events.last() {
            None => return Ok(None),
            Some(last) => last.quarter,
        };
        if event_quarter != self.quarter_index {
            return Err(GameError::LockedQuarter {
                event_quarter,
                live_quarter: self.quarter_index,
            });
        }
        let Some(event) = self.events.pop() else {
            return Ok(None);
        };
        if event.points > 0 {
            let slot = match event.team {
                TeamSide::Home => &mut self.current_quarter_home,
                TeamSide::Away => &mut self.current_quarter_away,
            };
            *slot = slot.saturating_sub(event.points);
        }
        if event.kind == EventKind::Foul {
            let slot = match event.team {
                TeamSide::Home => &mut self.home_fouls,
                TeamSide::Away => &mut self.away_fouls,
            };
            *slot = slot.saturating_sub(1);
        }
        self.touch();
        Ok(Some(event))
    }

    /// Close the open quarter into the ledger and progress the game.
    ///
    /// Quarters 1–3 roll into the next regulation quarter. Closing quarter 4
    /// (or an overtime period) compares totals: tied games open another
    /// overtime period, otherwise the game goes `Final`.
    pub fn advance_quarter(&mut self) -> Result<GameStatus, GameError> {
        if self.status == GameStatus::Final {
            return Ok(GameStatus::Final);
        }
        self.ensure_teams_named()?;
        self.close_current_quarter();

        if self.quarter_index < REGULATION_QUARTERS {
            self.quarter_index += 1;
            self.status = GameStatus::Live;
        } else if self.total(TeamSide::Home) == self.total(TeamSide::Away) {
            self.overtime_count += 1;
            self.quarter_index = REGULATION_QUARTERS + self.overtime_count;
            self.status = GameStatus::Overtime;
        } else {
            self.status = GameStatus::Final;
        }
        self.touch();
        Ok(self.status)
    }

    /// Force closure of the open quarter and freeze the game. Idempotent.
    pub fn end_game(&mut self) {
        if !self.is_in_progress() {
            return;
        }
        self.close_current_quarter();
        self.status = GameStatus::Final;
        self.touch();
    }

    /// Discard all score, event, and quarter state and return to `Setup`.
    ///
    /// The caller owns the user-confirmation gate; this method assumes the
    /// discard was already confirmed. A fresh session id is assigned since
    /// the previous session is abandoned, not finalized.
    pub fn reset(&mut self, keep_teams: bool) {
        let (home_team, away_team) = if keep_teams {
            (self.home_team.clone(), self.away_team.clone())
        } else {
            (String::new(), String::new())
        };
        *self = Self::new(self.mode, self.timer_minutes);
        self.home_team = home_team;
        self.away_team = away_team;
    }

    fn close_current_quarter(&mut self) {
        self.quarter_scores.push(QuarterScore {
            quarter: self.quarter_index,
            home: self.current_quarter_home,
            away: self.current_quarter_away,
        });
        self.current_quarter_home = 0;
        self.current_quarter_away = 0;
        self.home_fouls = 0;
        self.away_fouls = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named_game() -> GameState {
        let mut game = GameState::new(GameMode::Stats, 10);
        game.home_team = "Hawks".into();
        game.away_team = "Comets".into();
        game
    }

    #[test]
    fn start_requires_both_team_names() {
        let mut game = GameState::new(GameMode::Basic, 10);
        assert!(matches!(
            game.start_game(),
            Err(GameError::Validation(_))
        ));
        game.home_team = "Hawks".into();
        assert!(game.start_game().is_err());
        game.away_team = "Comets".into();
        game.start_game().unwrap();
        assert_eq!(game.status, GameStatus::Live);
        // Starting again is a no-op.
        game.start_game().unwrap();
        assert_eq!(game.status, GameStatus::Live);
    }

    #[test]
    fn scores_never_go_negative() {
        let mut game = named_game();
        game.add_score(TeamSide::Home, 2);
        game.add_score(TeamSide::Home, -3);
        assert_eq!(game.current_quarter_home, 0);
        assert_eq!(game.total(TeamSide::Home), 0);
        game.add_score(TeamSide::Away, -1);
        assert_eq!(game.total(TeamSide::Away), 0);
    }

    #[test]
    fn first_score_auto_starts_named_game() {
        let mut game = named_game();
        game.add_score(TeamSide::Away, 3);
        assert_eq!(game.status, GameStatus::Live);
        assert_eq!(game.total(TeamSide::Away), 3);
    }

    #[test]
    fn fouls_clamped_to_bounds() {
        let mut game = named_game();
        for _ in 0..8 {
            game.add_foul(TeamSide::Home);
        }
        assert_eq!(game.home_fouls, MAX_TEAM_FOULS);
        for _ in 0..8 {
            game.remove_foul(TeamSide::Home);
        }
        assert_eq!(game.home_fouls, 0);
    }

    #[test]
    fn advance_rolls_ledger_and_resets_counters() {
        let mut game = named_game();
        game.add_score(TeamSide::Home, 20);
        game.add_score(TeamSide::Away, 18);
        game.add_foul(TeamSide::Home);
        let status = game.advance_quarter().unwrap();
        assert_eq!(status, GameStatus::Live);
        assert_eq!(game.quarter_index, 2);
        assert_eq!(
            game.quarter_scores,
            vec![QuarterScore { quarter: 1, home: 20, away: 18 }]
        );
        assert_eq!(game.current_quarter_home, 0);
        assert_eq!(game.home_fouls, 0);
        assert_eq!(game.total(TeamSide::Home), 20);
    }

    #[test]
    fn advance_requires_team_names() {
        let mut game = GameState::new(GameMode::Basic, 10);
        assert!(game.advance_quarter().is_err());
        assert!(game.quarter_scores.is_empty());
    }

    #[test]
    fn tied_fourth_quarter_opens_overtime() {
        let mut game = named_game();
        for (home, away) in [(20, 18), (15, 20), (18, 18), (12, 9)] {
            game.add_score(TeamSide::Home, home);
            game.add_score(TeamSide::Away, away);
            game.advance_quarter().unwrap();
        }
        // 65-65 after four quarters.
        assert_eq!(game.status, GameStatus::Overtime);
        assert_eq!(game.quarter_index, 5);
        assert_eq!(game.overtime_count, 1);
    }

    #[test]
    fn decided_fourth_quarter_goes_final() {
        let mut game = named_game();
        for (home, away) in [(20, 18), (15, 20), (18, 18), (12, 10)] {
            game.add_score(TeamSide::Home, home);
            game.add_score(TeamSide::Away, away);
            game.advance_quarter().unwrap();
        }
        // 65-66: away wins in regulation.
        assert_eq!(game.status, GameStatus::Final);
        assert_eq!(game.winner(), Some(TeamSide::Away));
    }

    #[test]
    fn tied_overtime_opens_another_period() {
        let mut game = named_game();
        for _ in 0..4 {
            game.add_score(TeamSide::Home, 10);
            game.add_score(TeamSide::Away, 10);
            game.advance_quarter().unwrap();
        }
        assert_eq!(game.status, GameStatus::Overtime);
        game.add_score(TeamSide::Home, 5);
        game.add_score(TeamSide::Away, 5);
        game.advance_quarter().unwrap();
        assert_eq!(game.status, GameStatus::Overtime);
        assert_eq!(game.quarter_index, 6);
        game.add_score(TeamSide::Home, 7);
        game.advance_quarter().unwrap();
        assert_eq!(game.status, GameStatus::Final);
        assert_eq!(game.winner(), Some(TeamSide::Home));
    }

    #[test]
    fn basket_event_applies_points_and_undo_reverses_them() {
        let mut game = named_game();
        let player = Player { name: "J. Ayodele".into(), jersey: "23".into() };
        game.record_event(
            TeamSide::Home,
            EventKind::Basket,
            3,
            Some(player),
            Some("corner three".into()),
        );
        assert_eq!(game.total(TeamSide::Home), 3);
        assert_eq!(game.events.len(), 1);

        let undone = game.undo_last_event().unwrap().unwrap();
        assert_eq!(undone.points, 3);
        assert_eq!(game.total(TeamSide::Home), 0);
        assert!(game.events.is_empty());
    }

    #[test]
    fn foul_event_increments_and_undo_decrements() {
        let mut game = named_game();
        game.record_event(TeamSide::Away, EventKind::Foul, 0, None, None);
        assert_eq!(game.away_fouls, 1);
        game.undo_last_event().unwrap();
        assert_eq!(game.away_fouls, 0);
    }

    #[test]
    fn undo_across_closed_quarter_is_rejected_without_mutation() {
        let mut game = named_game();
        game.record_event(TeamSide::Home, EventKind::Basket, 2, None, None);
        game.advance_quarter().unwrap();

        let before = game.clone();
        let err = game.undo_last_event().unwrap_err();
        assert!(matches!(
            err,
            GameError::LockedQuarter { event_quarter: 1, live_quarter: 2 }
        ));
        // Rejection is idempotent: nothing moved.
        assert_eq!(game.events, before.events);
        assert_eq!(game.quarter_scores, before.quarter_scores);
        assert!(game.undo_last_event().is_err());
    }

    #[test]
    fn undo_with_empty_ledger_is_a_noop() {
        let mut game = named_game();
        assert!(game.undo_last_event().unwrap().is_none());
    }

    #[test]
    fn end_game_closes_quarter_and_is_idempotent() {
        let mut game = named_game();
        game.add_score(TeamSide::Home, 12);
        game.add_score(TeamSide::Away, 9);
        game.end_game();
        assert_eq!(game.status, GameStatus::Final);
        assert_eq!(game.quarter_scores.len(), 1);
        assert_eq!(game.total(TeamSide::Home), 12);
        game.end_game();
        assert_eq!(game.quarter_scores.len(), 1);
    }

    #[test]
    fn final_game_ignores_further_mutation() {
        let mut game = named_game();
        game.add_score(TeamSide::Home, 2);
        game.end_game();
        game.add_score(TeamSide::Home, 3);
        game.add_foul(TeamSide::Home);
        assert!(game.record_event(TeamSide::Home, EventKind::Basket, 2, None, None).is_none());
        assert_eq!(game.total(TeamSide::Home), 2);
        assert_eq!(game.home_fouls, 0);
    }

    #[test]
    fn reset_returns_to_setup() {
        let mut game = named_game();
        let old_id = game.id;
        game.add_score(TeamSide::Home, 10);
        game.advance_quarter().unwrap();

        game.reset(true);
        assert_eq!(game.status, GameStatus::Setup);
        assert_eq!(game.home_team, "Hawks");
        assert_eq!(game.quarter_index, 1);
        assert!(game.quarter_scores.is_empty());
        assert_ne!(game.id, old_id);

        game.reset(false);
        assert!(game.home_team.is_empty());
        assert!(game.away_team.is_empty());
    }
}
