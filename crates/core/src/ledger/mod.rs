#![allow(missing_docs)]

//! Per-player event logs and the folds that derive totals from them.
//!
//! Every bucket is clamped at zero at the moment an event is applied or
//! reversed. Clamping discards information, so reversing a clamped event is
//! an approximation rather than an exact inverse.

mod event;

pub use event::{EventClock, EventKind, EventStamp, ScoreEvent, ENDGAME_BONUS_POINTS};

use tracing::debug;

use crate::models::{BonusBreakdown, BonusCategory, ScoreBreakdown};

/// Event history of a single player together with the totals derived from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    score_breakdown: ScoreBreakdown,
    bonus_breakdown: BonusBreakdown,
    endgame_bonus: i64,
    score: i64,
    history: Vec<ScoreEvent>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from stored totals, flooring negative buckets.
    pub(crate) fn restore(
        score_breakdown: ScoreBreakdown,
        bonus_breakdown: BonusBreakdown,
        endgame_bonus: i64,
        history: Vec<ScoreEvent>,
    ) -> Self {
        let mut ledger = Self {
            score_breakdown,
            bonus_breakdown,
            endgame_bonus: endgame_bonus.max(0),
            score: 0,
            history,
        };
        for (category, value) in score_breakdown.iter() {
            *ledger.score_breakdown.get_mut(category) = value.max(0);
        }
        for (category, value) in bonus_breakdown.iter() {
            *ledger.bonus_breakdown.get_mut(category) = value.max(0);
        }
        ledger.recompute_score();
        ledger
    }

    pub fn score_breakdown(&self) -> &ScoreBreakdown {
        &self.score_breakdown
    }

    pub fn bonus_breakdown(&self) -> &BonusBreakdown {
        &self.bonus_breakdown
    }

    pub fn endgame_bonus(&self) -> i64 {
        self.endgame_bonus
    }

    /// Grand total: score buckets plus endgame awards.
    pub fn score(&self) -> i64 {
        self.score
    }

    /// Events in the order they were applied.
    pub fn history(&self) -> &[ScoreEvent] {
        &self.history
    }

    pub fn has_endgame(&self) -> bool {
        self.history.iter().any(ScoreEvent::is_endgame)
    }

    /// Append `event` and fold it into the affected bucket.
    pub fn apply(&mut self, event: ScoreEvent) {
        match event.kind() {
            EventKind::Score { category, points } => {
                let bucket = self.score_breakdown.get_mut(*category);
                *bucket = clamp_add(*bucket, *points);
            }
            EventKind::Bonus { category, points } => {
                let bucket = self.bonus_breakdown.get_mut(*category);
                *bucket = clamp_add(*bucket, *points);
            }
            EventKind::Endgame { points, .. } => {
                self.endgame_bonus = clamp_add(self.endgame_bonus, *points);
            }
        }
        self.history.push(event);
        self.recompute_score();
    }

    /// Remove the event at `position` and subtract its contribution.
    fn remove(&mut self, position: usize) -> ScoreEvent {
        let event = self.history.remove(position);
        match event.kind() {
            EventKind::Score { category, points } => {
                let bucket = self.score_breakdown.get_mut(*category);
                *bucket = clamp_add(*bucket, points.saturating_neg());
            }
            EventKind::Bonus { category, points } => {
                let bucket = self.bonus_breakdown.get_mut(*category);
                *bucket = clamp_add(*bucket, points.saturating_neg());
            }
            EventKind::Endgame { points, .. } => {
                self.endgame_bonus = clamp_add(self.endgame_bonus, points.saturating_neg());
            }
        }
        self.recompute_score();
        event
    }

    fn latest(&self) -> Option<(usize, EventStamp)> {
        self.history
            .iter()
            .enumerate()
            .max_by_key(|(position, event)| (event.stamp(), *position))
            .map(|(position, event)| (position, event.stamp()))
    }

    fn recompute_score(&mut self) {
        self.score = self.score_breakdown.total().saturating_add(self.endgame_bonus);
    }
}

fn clamp_add(value: i64, delta: i64) -> i64 {
    value.saturating_add(delta).max(0)
}

/// Result of removing the most recent event in a roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoOutcome {
    /// Roster index of the player that owned the event.
    pub index: usize,
    /// The removed event.
    pub event: ScoreEvent,
    /// Whether any endgame award is still present anywhere in the roster.
    pub endgame_remaining: bool,
}

/// Endgame award granted to one player for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndgameAward {
    /// Roster index of the awarded player.
    pub index: usize,
    pub category: BonusCategory,
}

/// Remove the latest event across every ledger in `roster` and reverse it.
///
/// Returns `None` when the roster holds no events at all.
pub fn undo_latest<L>(roster: &mut [L]) -> Option<UndoOutcome>
where
    L: AsRef<Ledger> + AsMut<Ledger>,
{
    let (index, position, stamp) = roster
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            entry
                .as_ref()
                .latest()
                .map(|(position, stamp)| (index, position, stamp))
        })
        .max_by_key(|(index, position, stamp)| (*stamp, *index, *position))?;

    let event = roster[index].as_mut().remove(position);
    let endgame_remaining = roster.iter().any(|entry| entry.as_ref().has_endgame());
    debug!(
        index,
        seq = stamp.seq,
        kind = event.kind().record_type(),
        points = event.points(),
        "undid latest event"
    );
    Some(UndoOutcome {
        index,
        event,
        endgame_remaining,
    })
}

/// Award the endgame bonus to every leader of every bonus category.
///
/// Does nothing when `applied` is already set; otherwise sets it. A category
/// whose maximum is not positive has no leaders.
pub fn apply_endgame_bonus<L>(
    roster: &mut [L],
    applied: &mut bool,
    clock: &mut EventClock,
) -> Vec<EndgameAward>
where
    L: AsRef<Ledger> + AsMut<Ledger>,
{
    if *applied {
        return Vec::new();
    }

    let mut awards = Vec::new();
    for category in BonusCategory::ALL {
        let max_value = roster
            .iter()
            .map(|entry| entry.as_ref().bonus_breakdown().get(category))
            .max()
            .unwrap_or(0);
        if max_value <= 0 {
            continue;
        }
        for (index, entry) in roster.iter_mut().enumerate() {
            if entry.as_ref().bonus_breakdown().get(category) == max_value {
                let event = ScoreEvent::endgame(clock.next_stamp(), category);
                entry.as_mut().apply(event);
                awards.push(EndgameAward { index, category });
            }
        }
    }

    *applied = true;
    awards
}

impl AsRef<Ledger> for Ledger {
    fn as_ref(&self) -> &Ledger {
        self
    }
}

impl AsMut<Ledger> for Ledger {
    fn as_mut(&mut self) -> &mut Ledger {
        self
    }
}
