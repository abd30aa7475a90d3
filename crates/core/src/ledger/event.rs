//! Score events and the clock that stamps them.

use chrono::Utc;

use crate::models::{BonusCategory, ScoreCategory};

/// Points awarded to every leader of a bonus category at game end.
pub const ENDGAME_BONUS_POINTS: i64 = 10;

/// Total-order position of an event within a session.
///
/// Timestamps are non-decreasing; `seq` is unique per session and breaks ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventStamp {
    /// Wall-clock milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Session-wide sequence number.
    pub seq: u64,
}

/// Payload of a recorded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Points scored for a board feature.
    Score {
        category: ScoreCategory,
        points: i64,
    },
    /// Trade goods collected.
    Bonus {
        category: BonusCategory,
        points: i64,
    },
    /// Award granted by the endgame pass.
    Endgame {
        category: BonusCategory,
        points: i64,
        description: String,
    },
}

impl EventKind {
    /// Signed points carried by the event.
    pub fn points(&self) -> i64 {
        match self {
            EventKind::Score { points, .. }
            | EventKind::Bonus { points, .. }
            | EventKind::Endgame { points, .. } => *points,
        }
    }

    /// Persisted discriminator.
    pub fn record_type(&self) -> &'static str {
        match self {
            EventKind::Score { .. } => "score",
            EventKind::Bonus { .. } => "bonus",
            EventKind::Endgame { .. } => "endgame",
        }
    }

    /// Label and glyph of the event's category.
    pub fn display(&self) -> (&'static str, &'static str) {
        match self {
            EventKind::Score { category, .. } => (category.label(), category.icon()),
            EventKind::Bonus { category, .. } | EventKind::Endgame { category, .. } => {
                (category.label(), category.icon())
            }
        }
    }
}

/// Immutable entry in a player's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreEvent {
    id: String,
    stamp: EventStamp,
    kind: EventKind,
}

impl ScoreEvent {
    /// Points scored for a board feature.
    pub fn score(stamp: EventStamp, category: ScoreCategory, points: i64) -> Self {
        Self::new(stamp, EventKind::Score { category, points })
    }

    /// Trade goods collected.
    pub fn bonus(stamp: EventStamp, category: BonusCategory, points: i64) -> Self {
        Self::new(stamp, EventKind::Bonus { category, points })
    }

    /// Endgame award for leading `category`.
    pub fn endgame(stamp: EventStamp, category: BonusCategory) -> Self {
        Self::new(
            stamp,
            EventKind::Endgame {
                category,
                points: ENDGAME_BONUS_POINTS,
                description: format!("Endgame bonus: most {}", category.label().to_lowercase()),
            },
        )
    }

    pub(crate) fn from_parts(id: String, stamp: EventStamp, kind: EventKind) -> Self {
        Self { id, stamp, kind }
    }

    fn new(stamp: EventStamp, kind: EventKind) -> Self {
        Self {
            id: format!("{}-{}", stamp.timestamp, stamp.seq),
            stamp,
            kind,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stamp(&self) -> EventStamp {
        self.stamp
    }

    pub fn timestamp(&self) -> i64 {
        self.stamp.timestamp
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn points(&self) -> i64 {
        self.kind.points()
    }

    pub fn is_endgame(&self) -> bool {
        matches!(self.kind, EventKind::Endgame { .. })
    }

    /// Human readable description, present on endgame awards.
    pub fn description(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Endgame { description, .. } => Some(description),
            _ => None,
        }
    }
}

/// Issues stamps for new events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventClock {
    last_timestamp: i64,
    next_seq: u64,
}

impl EventClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue after the largest of the given stamps.
    pub fn resume_after(stamps: impl IntoIterator<Item = EventStamp>) -> Self {
        stamps
            .into_iter()
            .fold(Self::default(), |clock, stamp| Self {
                last_timestamp: clock.last_timestamp.max(stamp.timestamp),
                next_seq: clock.next_seq.max(stamp.seq.saturating_add(1)),
            })
    }

    /// Sequence number the next stamp will carry.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Skip ahead so no sequence number below `next_seq` is issued again.
    pub(crate) fn skip_to(&mut self, next_seq: u64) {
        self.next_seq = self.next_seq.max(next_seq);
    }

    /// Stamp for an event created now.
    pub fn next_stamp(&mut self) -> EventStamp {
        self.next_stamp_at(Utc::now().timestamp_millis())
    }

    /// Stamp for an event created at `now_millis`; never moves backwards.
    pub fn next_stamp_at(&mut self, now_millis: i64) -> EventStamp {
        let timestamp = now_millis.max(self.last_timestamp);
        self.last_timestamp = timestamp;
        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        EventStamp { timestamp, seq }
    }
}
