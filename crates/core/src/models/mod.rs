//! Shared domain models: categories, colours and fixed-category breakdowns.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a category or colour name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseNameError {
    kind: &'static str,
    value: String,
}

impl ParseNameError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Scoring feature completed on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreCategory {
    /// Completed or unfinished city.
    Castle,
    /// Road segment.
    Road,
    /// Monastery and its surroundings.
    Monastery,
    /// Garden tile.
    Garden,
    /// Farmer field.
    Field,
}

impl ScoreCategory {
    /// Every score category in display order.
    pub const ALL: [ScoreCategory; 5] = [
        ScoreCategory::Castle,
        ScoreCategory::Road,
        ScoreCategory::Monastery,
        ScoreCategory::Garden,
        ScoreCategory::Field,
    ];

    /// Persisted lower-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            ScoreCategory::Castle => "castle",
            ScoreCategory::Road => "road",
            ScoreCategory::Monastery => "monastery",
            ScoreCategory::Garden => "garden",
            ScoreCategory::Field => "field",
        }
    }

    /// Human readable label.
    pub fn label(self) -> &'static str {
        match self {
            ScoreCategory::Castle => "Castle",
            ScoreCategory::Road => "Road",
            ScoreCategory::Monastery => "Monastery",
            ScoreCategory::Garden => "Garden",
            ScoreCategory::Field => "Field",
        }
    }

    /// Glyph shown next to the label.
    pub fn icon(self) -> &'static str {
        match self {
            ScoreCategory::Castle => "🏰",
            ScoreCategory::Road => "🛣️",
            ScoreCategory::Monastery => "⛪",
            ScoreCategory::Garden => "🌸",
            ScoreCategory::Field => "🌾",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ScoreCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoreCategory {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ParseNameError::new("score category", s))
    }
}

/// Trade good collected during play; only counts through the endgame bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BonusCategory {
    /// Wine barrels.
    Barrel,
    /// Wheat sheaves.
    Wheat,
    /// Cloth bolts.
    Cloth,
}

impl BonusCategory {
    /// Every bonus category in display order.
    pub const ALL: [BonusCategory; 3] = [
        BonusCategory::Barrel,
        BonusCategory::Wheat,
        BonusCategory::Cloth,
    ];

    /// Persisted lower-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            BonusCategory::Barrel => "barrel",
            BonusCategory::Wheat => "wheat",
            BonusCategory::Cloth => "cloth",
        }
    }

    /// Human readable label.
    pub fn label(self) -> &'static str {
        match self {
            BonusCategory::Barrel => "Barrel",
            BonusCategory::Wheat => "Wheat",
            BonusCategory::Cloth => "Cloth",
        }
    }

    /// Glyph shown next to the label.
    pub fn icon(self) -> &'static str {
        match self {
            BonusCategory::Barrel => "🍷",
            BonusCategory::Wheat => "🌾",
            BonusCategory::Cloth => "🧵",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for BonusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BonusCategory {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ParseNameError::new("bonus category", s))
    }
}

/// Meeple colour picked for a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerColor {
    /// Red meeples.
    Red,
    /// Blue meeples.
    Blue,
    /// Green meeples.
    Green,
    /// Yellow meeples.
    Yellow,
    /// Black meeples.
    Black,
}

impl PlayerColor {
    /// Every selectable colour.
    pub const ALL: [PlayerColor; 5] = [
        PlayerColor::Red,
        PlayerColor::Blue,
        PlayerColor::Green,
        PlayerColor::Yellow,
        PlayerColor::Black,
    ];

    /// Persisted lower-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            PlayerColor::Red => "red",
            PlayerColor::Blue => "blue",
            PlayerColor::Green => "green",
            PlayerColor::Yellow => "yellow",
            PlayerColor::Black => "black",
        }
    }

    /// RGB triple used when rendering the colour.
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            PlayerColor::Red => (220, 38, 38),
            PlayerColor::Blue => (59, 130, 246),
            PlayerColor::Green => (34, 197, 94),
            PlayerColor::Yellow => (234, 179, 8),
            PlayerColor::Black => (61, 65, 73),
        }
    }
}

impl fmt::Display for PlayerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlayerColor {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|color| color.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ParseNameError::new("colour", s))
    }
}

/// Per-category running totals for the five score categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreBreakdown {
    /// Castle points.
    pub castle: i64,
    /// Road points.
    pub road: i64,
    /// Monastery points.
    pub monastery: i64,
    /// Garden points.
    pub garden: i64,
    /// Field points.
    pub field: i64,
}

impl ScoreBreakdown {
    /// Value held for `category`.
    pub fn get(&self, category: ScoreCategory) -> i64 {
        self.as_array()[category.index()]
    }

    /// Mutable bucket for `category`.
    pub fn get_mut(&mut self, category: ScoreCategory) -> &mut i64 {
        match category {
            ScoreCategory::Castle => &mut self.castle,
            ScoreCategory::Road => &mut self.road,
            ScoreCategory::Monastery => &mut self.monastery,
            ScoreCategory::Garden => &mut self.garden,
            ScoreCategory::Field => &mut self.field,
        }
    }

    /// Sum across all categories, saturating at the `i64` bounds.
    pub fn total(&self) -> i64 {
        self.as_array().into_iter().fold(0i64, i64::saturating_add)
    }

    /// Iterate `(category, value)` pairs in display order.
    pub fn iter(&self) -> impl Iterator<Item = (ScoreCategory, i64)> + '_ {
        ScoreCategory::ALL
            .into_iter()
            .map(move |category| (category, self.get(category)))
    }

    fn as_array(&self) -> [i64; 5] {
        [
            self.castle,
            self.road,
            self.monastery,
            self.garden,
            self.field,
        ]
    }
}

/// Per-category running totals for the three bonus categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BonusBreakdown {
    /// Barrels collected.
    pub barrel: i64,
    /// Wheat collected.
    pub wheat: i64,
    /// Cloth collected.
    pub cloth: i64,
}

impl BonusBreakdown {
    /// Value held for `category`.
    pub fn get(&self, category: BonusCategory) -> i64 {
        self.as_array()[category.index()]
    }

    /// Mutable bucket for `category`.
    pub fn get_mut(&mut self, category: BonusCategory) -> &mut i64 {
        match category {
            BonusCategory::Barrel => &mut self.barrel,
            BonusCategory::Wheat => &mut self.wheat,
            BonusCategory::Cloth => &mut self.cloth,
        }
    }

    /// Sum across all categories, saturating at the `i64` bounds.
    pub fn total(&self) -> i64 {
        self.as_array().into_iter().fold(0i64, i64::saturating_add)
    }

    /// Iterate `(category, value)` pairs in display order.
    pub fn iter(&self) -> impl Iterator<Item = (BonusCategory, i64)> + '_ {
        BonusCategory::ALL
            .into_iter()
            .map(move |category| (category, self.get(category)))
    }

    fn as_array(&self) -> [i64; 3] {
        [self.barrel, self.wheat, self.cloth]
    }
}

/// Truncate free-form numeric input toward zero.
///
/// Non-finite values collapse to zero; out-of-range values saturate.
pub fn truncate_points(raw: f64) -> i64 {
    if raw.is_finite() {
        raw.trunc() as i64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("Castle".parse(), Ok(ScoreCategory::Castle));
        assert_eq!(" wheat ".parse(), Ok(BonusCategory::Wheat));
        assert_eq!("BLACK".parse(), Ok(PlayerColor::Black));
        assert!("purple".parse::<PlayerColor>().is_err());
    }

    #[test]
    fn breakdown_accessors_cover_every_category() {
        let mut breakdown = ScoreBreakdown::default();
        for (offset, category) in ScoreCategory::ALL.into_iter().enumerate() {
            *breakdown.get_mut(category) = offset as i64 + 1;
        }
        assert_eq!(breakdown.get(ScoreCategory::Field), 5);
        assert_eq!(breakdown.total(), 15);
        assert_eq!(breakdown.iter().count(), 5);

        let mut bonus = BonusBreakdown::default();
        *bonus.get_mut(BonusCategory::Cloth) = 4;
        assert_eq!(bonus.get(BonusCategory::Cloth), 4);
        assert_eq!(bonus.total(), 4);
    }

    #[test]
    fn totals_saturate_instead_of_overflowing() {
        let breakdown = ScoreBreakdown {
            castle: i64::MAX,
            road: 1,
            ..ScoreBreakdown::default()
        };
        assert_eq!(breakdown.total(), i64::MAX);

        let bonus = BonusBreakdown {
            barrel: i64::MAX,
            wheat: i64::MAX,
            cloth: 3,
        };
        assert_eq!(bonus.total(), i64::MAX);
    }

    #[test]
    fn truncates_fractional_points() {
        assert_eq!(truncate_points(4.9), 4);
        assert_eq!(truncate_points(-3.7), -3);
        assert_eq!(truncate_points(f64::NAN), 0);
    }

    #[test]
    fn serializes_lowercase_names() -> serde_json::Result<()> {
        assert_eq!(serde_json::to_string(&ScoreCategory::Monastery)?, "\"monastery\"");
        assert_eq!(serde_json::to_string(&PlayerColor::Yellow)?, "\"yellow\"");
        Ok(())
    }
}
