#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use crate::{
    ledger::{Ledger, ScoreEvent},
    models::{BonusBreakdown, BonusCategory, PlayerColor, ScoreBreakdown},
};

/// Identifier assigned to a player when the roster is formed.
pub type PlayerId = u32;

/// Screen the session is currently on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionPhase {
    #[default]
    Setup,
    ColorSelection,
    Playing,
    History,
}

impl SessionPhase {
    /// Phases in which a roster exists.
    pub fn has_roster(self) -> bool {
        matches!(self, SessionPhase::Playing | SessionPhase::History)
    }
}

/// Roster member with their ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    id: PlayerId,
    name: String,
    color: PlayerColor,
    ledger: Ledger,
}

impl Player {
    pub fn new(id: PlayerId, color: PlayerColor) -> Self {
        Self {
            id,
            name: default_name(id),
            color,
            ledger: Ledger::new(),
        }
    }

    pub(crate) fn restore(id: PlayerId, name: String, color: PlayerColor, ledger: Ledger) -> Self {
        let name = if name.trim().is_empty() {
            default_name(id)
        } else {
            name
        };
        Self {
            id,
            name,
            color,
            ledger,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> PlayerColor {
        self.color
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn score(&self) -> i64 {
        self.ledger.score()
    }

    pub fn score_breakdown(&self) -> &ScoreBreakdown {
        self.ledger.score_breakdown()
    }

    pub fn bonus_breakdown(&self) -> &BonusBreakdown {
        self.ledger.bonus_breakdown()
    }

    pub fn endgame_bonus(&self) -> i64 {
        self.ledger.endgame_bonus()
    }

    pub fn history(&self) -> &[ScoreEvent] {
        self.ledger.history()
    }

    /// Replace the display name; blank names are rejected and `false` returned.
    pub(crate) fn rename(&mut self, new_name: &str) -> bool {
        let trimmed = new_name.trim();
        if trimmed.is_empty() {
            return false;
        }
        self.name = trimmed.to_string();
        true
    }
}

impl AsRef<Ledger> for Player {
    fn as_ref(&self) -> &Ledger {
        &self.ledger
    }
}

impl AsMut<Ledger> for Player {
    fn as_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }
}

/// Placeholder name given to new players.
pub fn default_name(id: PlayerId) -> String {
    format!("Player {id}")
}

/// Event in the merged history view, tagged with its owner.
#[derive(Debug, Clone, Copy)]
pub struct HistoryEntry<'a> {
    pub player_id: PlayerId,
    pub player_name: &'a str,
    pub player_color: PlayerColor,
    pub event: &'a ScoreEvent,
}

/// Current leaders of one bonus category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BonusLeaders {
    pub category: BonusCategory,
    /// Highest value held, floored at zero.
    pub max_points: i64,
    /// Names of every player holding `max_points`.
    pub leader_names: Vec<String>,
}
