//! Snapshot persistence for the active session.
//!
//! The whole session is written as a single JSON record after every change.
//! Loading normalizes older records: missing totals default to zero, history
//! entries without a `recordType` are score events, and missing sequence
//! numbers are assigned in timestamp order.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    ledger::{EventKind, EventStamp, Ledger, ScoreEvent},
    models::{truncate_points, BonusBreakdown, BonusCategory, PlayerColor, ScoreBreakdown, ScoreCategory},
    session::{Player, PlayerId, Session, SessionPhase},
};

/// Directory under the user's data directory that holds the snapshot.
pub const DEFAULT_SAVE_DIR: &str = "meeple-tally";

/// File name of the snapshot.
pub const SNAPSHOT_FILE: &str = "session.json";

/// Reasons a stored snapshot cannot be turned back into a session.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The payload is not valid snapshot JSON.
    #[error("failed to parse snapshot: {0}")]
    Parse(#[from] serde_json::Error),
    /// Player ids must be positive.
    #[error("invalid player id {0}")]
    InvalidPlayerId(PlayerId),
    /// Two players share an id.
    #[error("duplicate player id {0}")]
    DuplicatePlayer(PlayerId),
    /// A history entry lacks the category its kind requires.
    #[error("history entry {event} of player {player} has no {expected}")]
    MissingCategory {
        /// Owner of the entry.
        player: PlayerId,
        /// Stored entry id.
        event: String,
        /// Field that was expected.
        expected: &'static str,
    },
}

/// Persisted discriminator of a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    /// Board feature points.
    Score,
    /// Trade goods.
    Bonus,
    /// Endgame award.
    Endgame,
}

/// Serialized form of a whole session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    session_phase: SessionPhase,
    #[serde(default)]
    players: Vec<PlayerRecord>,
    #[serde(default)]
    roster_size: usize,
    #[serde(default)]
    endgame_applied: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    next_seq: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerRecord {
    id: PlayerId,
    #[serde(default)]
    name: String,
    color: PlayerColor,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    score_breakdown: ScoreBreakdown,
    #[serde(default)]
    bonus_breakdown: BonusBreakdown,
    #[serde(default)]
    endgame_bonus: i64,
    #[serde(default, alias = "scoreHistory")]
    history: Vec<EventRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventRecord {
    #[serde(default)]
    id: String,
    #[serde(default, deserialize_with = "deserialize_number")]
    timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    seq: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    record_type: Option<RecordType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    score_type: Option<ScoreCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bonus_type: Option<BonusCategory>,
    #[serde(default, deserialize_with = "deserialize_number")]
    points: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl EventRecord {
    fn capture(event: &ScoreEvent) -> Self {
        let stamp = event.stamp();
        let mut record = Self {
            id: event.id().to_string(),
            timestamp: stamp.timestamp,
            seq: Some(stamp.seq),
            record_type: None,
            score_type: None,
            bonus_type: None,
            points: event.points(),
            description: None,
        };
        match event.kind() {
            EventKind::Score { category, .. } => {
                record.record_type = Some(RecordType::Score);
                record.score_type = Some(*category);
            }
            EventKind::Bonus { category, .. } => {
                record.record_type = Some(RecordType::Bonus);
                record.bonus_type = Some(*category);
            }
            EventKind::Endgame {
                category,
                description,
                ..
            } => {
                record.record_type = Some(RecordType::Endgame);
                record.bonus_type = Some(*category);
                record.description = Some(description.clone());
            }
        }
        record
    }

    fn into_event(self, player: PlayerId, seq: u64) -> Result<ScoreEvent, SnapshotError> {
        let missing = |expected| SnapshotError::MissingCategory {
            player,
            event: self.id.clone(),
            expected,
        };
        let kind = match self.record_type.unwrap_or(RecordType::Score) {
            RecordType::Score => EventKind::Score {
                category: self.score_type.ok_or_else(|| missing("scoreType"))?,
                points: self.points,
            },
            RecordType::Bonus => EventKind::Bonus {
                category: self.bonus_type.ok_or_else(|| missing("bonusType"))?,
                points: self.points,
            },
            RecordType::Endgame => {
                let category = self.bonus_type.ok_or_else(|| missing("bonusType"))?;
                EventKind::Endgame {
                    category,
                    points: self.points,
                    description: self.description.clone().unwrap_or_else(|| {
                        format!("Endgame bonus: most {}", category.label().to_lowercase())
                    }),
                }
            }
        };
        let stamp = EventStamp {
            timestamp: self.timestamp,
            seq,
        };
        let id = if self.id.trim().is_empty() {
            format!("{}-{}", stamp.timestamp, stamp.seq)
        } else {
            self.id
        };
        Ok(ScoreEvent::from_parts(id, stamp, kind))
    }
}

impl Snapshot {
    /// Capture the full state of `session`.
    pub fn capture(session: &Session) -> Self {
        let players = session
            .players()
            .iter()
            .map(|player| PlayerRecord {
                id: player.id(),
                name: player.name().to_string(),
                color: player.color(),
                score: player.score(),
                score_breakdown: *player.score_breakdown(),
                bonus_breakdown: *player.bonus_breakdown(),
                endgame_bonus: player.endgame_bonus(),
                history: player.history().iter().map(EventRecord::capture).collect(),
            })
            .collect();
        Self {
            session_phase: session.phase(),
            players,
            roster_size: session.roster_size(),
            endgame_applied: session.endgame_applied(),
            next_seq: Some(session.clock().next_seq()),
        }
    }

    /// Parse a snapshot without normalizing it.
    pub fn from_json(input: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Pretty-printed JSON representation.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Normalize the snapshot and rebuild the session it describes.
    pub fn into_session(self) -> Result<Session, SnapshotError> {
        let mut seen = HashSet::new();
        for record in &self.players {
            if record.id == 0 {
                return Err(SnapshotError::InvalidPlayerId(record.id));
            }
            if !seen.insert(record.id) {
                return Err(SnapshotError::DuplicatePlayer(record.id));
            }
        }

        let sequences = assign_sequences(&self.players);
        let mut players = Vec::with_capacity(self.players.len());
        for (record, seqs) in self.players.into_iter().zip(sequences) {
            let id = record.id;
            let history = record
                .history
                .into_iter()
                .zip(seqs)
                .map(|(event, seq)| event.into_event(id, seq))
                .collect::<Result<Vec<_>, _>>()?;
            let ledger = Ledger::restore(
                record.score_breakdown,
                record.bonus_breakdown,
                record.endgame_bonus,
                history,
            );
            if ledger.score() != record.score {
                debug!(id, stored = record.score, derived = ledger.score(), "score recomputed");
            }
            players.push(Player::restore(id, record.name, record.color, ledger));
        }

        Ok(Session::restore(
            self.session_phase,
            players,
            self.roster_size,
            self.endgame_applied,
            self.next_seq.unwrap_or(0),
        ))
    }
}

/// Sequence numbers per player and history position.
///
/// Stored numbers are kept when every entry has one and none repeat; otherwise
/// every entry is renumbered by timestamp, falling back to storage order.
fn assign_sequences(players: &[PlayerRecord]) -> Vec<Vec<u64>> {
    let mut seen = HashSet::new();
    let intact = players
        .iter()
        .flat_map(|player| player.history.iter())
        .all(|event| event.seq.map(|seq| seen.insert(seq)).unwrap_or(false));
    if intact {
        return players
            .iter()
            .map(|player| player.history.iter().filter_map(|event| event.seq).collect())
            .collect();
    }

    let mut order = players
        .iter()
        .enumerate()
        .flat_map(|(index, player)| {
            player
                .history
                .iter()
                .enumerate()
                .map(move |(position, event)| {
                    (event.timestamp, event.seq.unwrap_or(u64::MAX), index, position)
                })
        })
        .collect::<Vec<_>>();
    order.sort_unstable();

    let mut sequences = players
        .iter()
        .map(|player| vec![0; player.history.len()])
        .collect::<Vec<_>>();
    for (seq, (_, _, index, position)) in order.into_iter().enumerate() {
        sequences[index][position] = seq as u64;
    }
    sequences
}

fn deserialize_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawNumber {
        Int(i64),
        Float(f64),
    }

    Ok(match RawNumber::deserialize(deserializer)? {
        RawNumber::Int(value) => value,
        RawNumber::Float(value) => truncate_points(value),
    })
}

/// Decode a stored snapshot into a session.
pub fn decode(input: &str) -> Result<Session, SnapshotError> {
    Snapshot::from_json(input)?.into_session()
}

/// Encode `session` as snapshot JSON.
pub fn encode(session: &Session) -> Result<String, SnapshotError> {
    Snapshot::capture(session).to_json()
}

/// Reads and writes the snapshot file.
#[derive(Debug, Clone)]
pub struct SaveManager {
    path: PathBuf,
}

impl SaveManager {
    /// Create a manager for the snapshot at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default snapshot location under the user's data directory.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_SAVE_DIR)
            .join(SNAPSHOT_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored session, `Ok(None)` when no snapshot exists.
    pub fn read(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let session = decode(&content)
            .with_context(|| format!("failed to restore {}", self.path.display()))?;
        Ok(Some(session))
    }

    /// Restore the stored session, falling back to a fresh one.
    pub fn load_or_fresh(&self) -> Session {
        match self.read() {
            Ok(Some(session)) => session,
            Ok(None) => Session::new(),
            Err(err) => {
                warn!("Discarding unreadable snapshot: {err:#}");
                Session::new()
            }
        }
    }

    /// Overwrite the snapshot with the current state of `session`.
    pub fn store(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let serialised = encode(session).context("failed to serialize session")?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, serialised)
            .with_context(|| format!("failed to write {}", staging.display()))?;
        fs::rename(&staging, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_session() -> Session {
        let mut session = Session::new();
        session.choose_roster_size(3);
        session.create_roster(3, &[PlayerColor::Red, PlayerColor::Green, PlayerColor::Black]);
        session.rename(2, "Mo");
        session.add_score(1, ScoreCategory::Castle, 12);
        session.add_score(2, ScoreCategory::Road, 3);
        session.add_score(2, ScoreCategory::Road, -5);
        session.add_bonus(1, BonusCategory::Barrel, 4);
        session.add_bonus(3, BonusCategory::Barrel, 4);
        session.add_bonus(2, BonusCategory::Cloth, 2);
        session.apply_endgame_bonus();
        session
    }

    #[test]
    fn round_trip_preserves_derived_fields() -> Result<()> {
        let session = sample_session();
        let restored = decode(&encode(&session)?)?;
        assert_eq!(restored, session);
        assert_eq!(restored.players()[0].endgame_bonus(), 10);
        assert_eq!(restored.players()[1].score_breakdown().road, 0);
        assert!(restored.endgame_applied());
        Ok(())
    }

    #[test]
    fn legacy_records_default_to_score_events() -> Result<()> {
        let legacy = r#"{
            "sessionPhase": "playing",
            "players": [
                {
                    "id": 1,
                    "name": "Ana",
                    "score": 7,
                    "color": "blue",
                    "scoreBreakdown": { "castle": 4, "road": 3 },
                    "scoreHistory": [
                        { "id": "a", "timestamp": 20, "scoreType": "road", "points": 3 },
                        { "id": "b", "timestamp": 10, "scoreType": "castle", "points": 4.0 }
                    ]
                },
                { "id": 2, "name": "", "color": "red" }
            ]
        }"#;
        let session = decode(legacy)?;
        let ana = session.player(1).expect("player 1");
        assert_eq!(ana.score(), 7);
        assert_eq!(ana.bonus_breakdown(), &BonusBreakdown::default());
        assert_eq!(ana.endgame_bonus(), 0);
        assert!(ana
            .history()
            .iter()
            .all(|event| event.kind().record_type() == "score"));
        assert_eq!(session.player(2).map(Player::name), Some("Player 2"));
        assert_eq!(session.roster_size(), 2);
        assert!(!session.endgame_applied());

        // Sequence numbers follow timestamps, so the castle entry is older.
        let latest = session.latest_event().expect("latest event");
        assert_eq!(latest.event.id(), "a");
        Ok(())
    }

    #[test]
    fn structurally_invalid_snapshots_are_rejected() {
        let missing_category = r#"{ "players": [ { "id": 1, "color": "red",
            "history": [ { "id": "x", "timestamp": 1, "recordType": "bonus", "points": 2 } ] } ] }"#;
        assert!(matches!(
            decode(missing_category),
            Err(SnapshotError::MissingCategory { player: 1, .. })
        ));

        let duplicate = r#"{ "players": [ { "id": 1, "color": "red" }, { "id": 1, "color": "blue" } ] }"#;
        assert!(matches!(
            decode(duplicate),
            Err(SnapshotError::DuplicatePlayer(1))
        ));

        assert!(matches!(decode("not json"), Err(SnapshotError::Parse(_))));
    }

    #[test]
    fn oversized_stored_values_decode_without_overflow() -> Result<()> {
        let stored = r#"{
            "nextSeq": 18446744073709551615,
            "players": [
                {
                    "id": 1,
                    "color": "red",
                    "scoreBreakdown": { "castle": 9223372036854775807, "road": 1 },
                    "endgameBonus": 9223372036854775807
                }
            ]
        }"#;
        let mut session = decode(stored)?;
        let player = session.player(1).expect("player 1");
        assert_eq!(player.score(), i64::MAX);

        assert!(session.add_score(1, ScoreCategory::Field, 5));
        assert_eq!(session.player(1).map(Player::score), Some(i64::MAX));
        Ok(())
    }

    #[test]
    fn store_and_reload() -> Result<()> {
        let dir = tempdir()?;
        let manager = SaveManager::new(dir.path().join("nested").join(SNAPSHOT_FILE));
        assert!(manager.read()?.is_none());

        let session = sample_session();
        manager.store(&session)?;
        assert_eq!(manager.load_or_fresh(), session);
        Ok(())
    }

    #[test]
    fn corrupt_snapshot_falls_back_to_fresh_session() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(SNAPSHOT_FILE);
        fs::write(&path, "{ \"players\": [ {")?;
        let manager = SaveManager::new(&path);
        assert!(manager.read().is_err());
        assert_eq!(manager.load_or_fresh(), Session::new());
        Ok(())
    }

    #[test]
    fn restored_clock_does_not_reuse_sequence_numbers() -> Result<()> {
        let mut session = sample_session();
        session.undo_latest();
        let mut restored = decode(&encode(&session)?)?;
        let before = restored.clone();
        restored.add_score(3, ScoreCategory::Garden, 1);
        let added = restored.latest_event().expect("new event");
        assert!(before
            .history()
            .iter()
            .all(|entry| entry.event.stamp().seq < added.event.stamp().seq));
        assert!(added.event.stamp().seq >= session.clock().next_seq());
        Ok(())
    }
}
