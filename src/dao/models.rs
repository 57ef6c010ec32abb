//! Persisted entities and their conversions to and from runtime types.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::game::{
    EventKind, GameEvent, GameMode, GameState, GameStatus, Player, QuarterScore, TeamSide,
};

/// Closed-quarter ledger entry as persisted and as sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarterScoreEntity {
    /// Quarter index the entry closed.
    pub quarter: u32,
    /// Home points within that quarter.
    pub home: u32,
    /// Away points within that quarter.
    pub away: u32,
}

/// Event ledger entry as persisted and as sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEventEntity {
    /// Stable event identifier.
    pub id: Uuid,
    /// Team the event is credited to.
    pub team: TeamSide,
    /// What happened.
    pub kind: EventKind,
    /// Point value applied to the score.
    pub points: u32,
    /// Quarter the event occurred in.
    pub quarter: u32,
    /// Attributed player name, when known.
    pub player_name: Option<String>,
    /// Attributed jersey number, when known.
    pub player_jersey: Option<String>,
    /// Optional shot-type detail.
    pub shot_detail: Option<String>,
}

/// Whole-game snapshot written to the current-game slot and the history ring.
///
/// Scores are persisted as per-team totals plus the closed ledger; the open
/// quarter's running scores are re-derived on recovery as
/// `total − sum(closed quarters)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// Session identifier.
    pub id: Uuid,
    /// Scoreboard variant the snapshot belongs to; recovery never offers a
    /// snapshot to a different variant.
    pub mode: GameMode,
    /// Home team name.
    pub home_team: String,
    /// Away team name.
    pub away_team: String,
    /// Lifecycle status at snapshot time.
    pub status: GameStatus,
    /// Open quarter index.
    pub quarter_index: u32,
    /// Overtime periods opened so far.
    pub overtime_count: u32,
    /// Aggregate home score (ledger plus open quarter).
    pub total_home: u32,
    /// Aggregate away score (ledger plus open quarter).
    pub total_away: u32,
    /// Closed-quarter ledger.
    pub quarter_scores: Vec<QuarterScoreEntity>,
    /// Event ledger.
    pub events: Vec<GameEventEntity>,
    /// Home fouls in the open quarter.
    pub home_fouls: u8,
    /// Away fouls in the open quarter.
    pub away_fouls: u8,
    /// Configured game clock duration in minutes.
    pub timer_minutes: u32,
    /// Timestamp of the snapshot write; drives the recovery windows.
    pub last_modified: SystemTime,
}

/// Pending remote-write intent stored in the sync outbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxItemEntity {
    /// Identifier of the queue entry itself.
    pub id: Uuid,
    /// The remote write to perform.
    pub action: SyncAction,
    /// When the item entered the queue.
    pub enqueued_at: SystemTime,
    /// Failed delivery attempts so far.
    pub retry_count: u32,
}

/// One logical remote write. Each variant maps to a single backend endpoint
/// and is independently retryable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SyncAction {
    /// `POST /games` — create the game record.
    CreateGame {
        /// Aggregate record for the finished game.
        game: GameRecord,
    },
    /// `POST /games/{id}/quarters` — append one closed quarter.
    AppendQuarter {
        /// Game the quarter belongs to.
        game_id: Uuid,
        /// The closed-quarter entry.
        quarter: QuarterScoreEntity,
    },
    /// `POST /games/{id}/events` — append one recorded event.
    AppendEvent {
        /// Game the event belongs to.
        game_id: Uuid,
        /// The event entry.
        event: GameEventEntity,
    },
}

/// Aggregate body for the game-creation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Client-generated identifier; the backend stores the game under it so
    /// quarter and event writes need no id remapping.
    pub id: Uuid,
    /// Home team name.
    pub home_team: String,
    /// Away team name.
    pub away_team: String,
    /// Final home score.
    pub total_home: u32,
    /// Final away score.
    pub total_away: u32,
    /// Quarter index the game ended in.
    pub quarter_index: u32,
    /// Overtime periods played.
    pub overtime_count: u32,
    /// Scoreboard variant.
    pub mode: GameMode,
    /// Lifecycle status (always `Final` for synced games).
    pub status: GameStatus,
    /// Date the game was played.
    pub date: SystemTime,
    /// Venue, when known.
    pub location: Option<String>,
}

impl From<QuarterScore> for QuarterScoreEntity {
    fn from(value: QuarterScore) -> Self {
        Self {
            quarter: value.quarter,
            home: value.home,
            away: value.away,
        }
    }
}

impl From<QuarterScoreEntity> for QuarterScore {
    fn from(value: QuarterScoreEntity) -> Self {
        Self {
            quarter: value.quarter,
            home: value.home,
            away: value.away,
        }
    }
}

impl From<GameEvent> for GameEventEntity {
    fn from(value: GameEvent) -> Self {
        let (player_name, player_jersey) = match value.player {
            Some(player) => (Some(player.name), Some(player.jersey)),
            None => (None, None),
        };
        Self {
            id: value.id,
            team: value.team,
            kind: value.kind,
            points: value.points,
            quarter: value.quarter,
            player_name,
            player_jersey,
            shot_detail: value.shot_detail,
        }
    }
}

impl From<GameEventEntity> for GameEvent {
    fn from(value: GameEventEntity) -> Self {
        let player = match (value.player_name, value.player_jersey) {
            (Some(name), Some(jersey)) => Some(Player { name, jersey }),
            (Some(name), None) => Some(Player { name, jersey: String::new() }),
            _ => None,
        };
        Self {
            id: value.id,
            team: value.team,
            kind: value.kind,
            points: value.points,
            quarter: value.quarter,
            player,
            shot_detail: value.shot_detail,
        }
    }
}

impl From<&GameState> for GameSnapshot {
    fn from(state: &GameState) -> Self {
        Self {
            id: state.id,
            mode: state.mode,
            home_team: state.home_team.clone(),
            away_team: state.away_team.clone(),
            status: state.status,
            quarter_index: state.quarter_index,
            overtime_count: state.overtime_count,
            total_home: state.total(TeamSide::Home),
            total_away: state.total(TeamSide::Away),
            quarter_scores: state.quarter_scores.iter().copied().map(Into::into).collect(),
            events: state.events.iter().cloned().map(Into::into).collect(),
            home_fouls: state.home_fouls,
            away_fouls: state.away_fouls,
            timer_minutes: state.timer_minutes,
            last_modified: state.last_modified,
        }
    }
}

impl From<GameSnapshot> for GameState {
    fn from(snapshot: GameSnapshot) -> Self {
        let closed_home: u32 = snapshot.quarter_scores.iter().map(|q| q.home).sum();
        let closed_away: u32 = snapshot.quarter_scores.iter().map(|q| q.away).sum();
        Self {
            id: snapshot.id,
            mode: snapshot.mode,
            home_team: snapshot.home_team,
            away_team: snapshot.away_team,
            quarter_index: snapshot.quarter_index,
            overtime_count: snapshot.overtime_count,
            current_quarter_home: snapshot.total_home.saturating_sub(closed_home),
            current_quarter_away: snapshot.total_away.saturating_sub(closed_away),
            quarter_scores: snapshot.quarter_scores.into_iter().map(Into::into).collect(),
            events: snapshot.events.into_iter().map(Into::into).collect(),
            home_fouls: snapshot.home_fouls,
            away_fouls: snapshot.away_fouls,
            status: snapshot.status,
            timer_minutes: snapshot.timer_minutes,
            last_modified: snapshot.last_modified,
        }
    }
}

impl GameRecord {
    /// Build the creation body from a finalized game.
    pub fn from_state(state: &GameState, location: Option<String>) -> Self {
        Self {
            id: state.id,
            home_team: state.home_team.clone(),
            away_team: state.away_team.clone(),
            total_home: state.total(TeamSide::Home),
            total_away: state.total(TeamSide::Away),
            quarter_index: state.quarter_index,
            overtime_count: state.overtime_count,
            mode: state.mode,
            status: state.status,
            date: state.last_modified,
            location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::game::GameMode;

    #[test]
    fn snapshot_round_trip_rederives_open_quarter_scores() {
        let mut game = GameState::new(GameMode::Basic, 10);
        game.home_team = "Hawks".into();
        game.away_team = "Comets".into();
        game.add_score(TeamSide::Home, 20);
        game.add_score(TeamSide::Away, 18);
        game.advance_quarter().unwrap();
        game.add_score(TeamSide::Home, 7);
        game.add_score(TeamSide::Away, 11);

        let snapshot = GameSnapshot::from(&game);
        assert_eq!(snapshot.total_home, 27);
        assert_eq!(snapshot.total_away, 29);

        let restored = GameState::from(snapshot);
        assert_eq!(restored.current_quarter_home, 7);
        assert_eq!(restored.current_quarter_away, 11);
        assert_eq!(restored, game);
    }

    #[test]
    fn snapshot_survives_json_round_trip() {
        let mut game = GameState::new(GameMode::Stats, 12);
        game.home_team = "Hawks".into();
        game.away_team = "Comets".into();
        game.record_event(
            TeamSide::Home,
            EventKind::Basket,
            2,
            Some(Player { name: "J. Ayodele".into(), jersey: "23".into() }),
            Some("layup".into()),
        );
        game.record_event(TeamSide::Away, EventKind::Rebound { defensive: true }, 0, None, None);

        let snapshot = GameSnapshot::from(&game);
        let encoded = serde_json::to_string(&snapshot).unwrap();
        let decoded: GameSnapshot = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, snapshot);
    }
}
