#![allow(missing_docs)]

use tracing::{debug, info, warn};

use crate::{
    ledger::{self, EventClock, ScoreEvent},
    models::{BonusCategory, PlayerColor, ScoreCategory},
};

use super::models::{BonusLeaders, HistoryEntry, Player, PlayerId, SessionPhase};

/// Command accepted from the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ChooseRosterSize(usize),
    CreateRoster(Vec<PlayerColor>),
    Rename {
        id: PlayerId,
        name: String,
    },
    AddScore {
        id: PlayerId,
        category: ScoreCategory,
        points: i64,
    },
    AddBonus {
        id: PlayerId,
        category: BonusCategory,
        points: i64,
    },
    ApplyEndgameBonus,
    UndoLatest,
    ShowHistory,
    ShowScoreboard,
    Reset,
}

/// Complete state of one scoring session.
///
/// The caller owns the value and threads it through every command; nothing is
/// kept in global state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    phase: SessionPhase,
    players: Vec<Player>,
    roster_size: usize,
    endgame_applied: bool,
    clock: EventClock,
}

impl Session {
    /// Fresh session waiting for a roster size.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn restore(
        phase: SessionPhase,
        players: Vec<Player>,
        roster_size: usize,
        endgame_applied: bool,
        next_seq: u64,
    ) -> Self {
        let mut clock = EventClock::resume_after(
            players
                .iter()
                .flat_map(|player| player.history().iter().map(ScoreEvent::stamp)),
        );
        clock.skip_to(next_seq);
        let endgame_present = players.iter().any(|player| player.ledger().has_endgame());
        let phase = if players.is_empty() && phase.has_roster() {
            SessionPhase::Setup
        } else {
            phase
        };
        Self {
            phase,
            roster_size: if players.is_empty() {
                roster_size
            } else {
                players.len()
            },
            players,
            endgame_applied: endgame_applied || endgame_present,
            clock,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Number of players chosen for the roster.
    pub fn roster_size(&self) -> usize {
        self.roster_size
    }

    pub fn endgame_applied(&self) -> bool {
        self.endgame_applied
    }

    pub(crate) fn clock(&self) -> &EventClock {
        &self.clock
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|player| player.id() == id)
    }

    fn player_mut(players: &mut [Player], id: PlayerId) -> Option<&mut Player> {
        let player = players.iter_mut().find(|player| player.id() == id);
        if player.is_none() {
            warn!(id, "ignoring command for unknown player");
        }
        player
    }

    /// Apply `command`, returning whether any state changed.
    pub fn dispatch(&mut self, command: Command) -> bool {
        debug!(?command, "dispatching command");
        match command {
            Command::ChooseRosterSize(count) => self.choose_roster_size(count),
            Command::CreateRoster(colors) => {
                self.create_roster(colors.len(), &colors);
                true
            }
            Command::Rename { id, name } => self.rename(id, &name),
            Command::AddScore {
                id,
                category,
                points,
            } => self.add_score(id, category, points),
            Command::AddBonus {
                id,
                category,
                points,
            } => self.add_bonus(id, category, points),
            Command::ApplyEndgameBonus => {
                let was_applied = self.endgame_applied;
                self.apply_endgame_bonus();
                was_applied != self.endgame_applied
            }
            Command::UndoLatest => self.undo_latest().is_some(),
            Command::ShowHistory => self.show_history(),
            Command::ShowScoreboard => self.show_scoreboard(),
            Command::Reset => {
                let changed = *self != Self::new();
                self.reset();
                changed
            }
        }
    }

    /// Record the chosen player count and move on to colour selection.
    pub fn choose_roster_size(&mut self, count: usize) -> bool {
        if self.phase != SessionPhase::Setup && self.phase != SessionPhase::ColorSelection {
            return false;
        }
        self.roster_size = count;
        self.phase = SessionPhase::ColorSelection;
        true
    }

    /// Build `count` players with ids `1..=count`, one per colour.
    ///
    /// `colors` must hold exactly `count` distinct colours.
    pub fn create_roster(&mut self, count: usize, colors: &[PlayerColor]) {
        debug_assert_eq!(colors.len(), count, "one colour per player");
        debug_assert!(
            colors
                .iter()
                .enumerate()
                .all(|(index, color)| !colors[..index].contains(color)),
            "colours must be distinct"
        );
        self.players = (1..)
            .zip(colors.iter().take(count))
            .map(|(id, color)| Player::new(id, *color))
            .collect();
        self.roster_size = count;
        self.endgame_applied = false;
        self.phase = SessionPhase::Playing;
        info!(players = self.players.len(), "roster created");
    }

    /// Rename a player; blank names keep the previous name.
    pub fn rename(&mut self, id: PlayerId, new_name: &str) -> bool {
        let Some(player) = Self::player_mut(&mut self.players, id) else {
            return false;
        };
        let renamed = player.rename(new_name);
        if !renamed {
            debug!(id, "rejected blank player name");
        }
        renamed
    }

    pub fn add_score(&mut self, id: PlayerId, category: ScoreCategory, points: i64) -> bool {
        let Some(player) = Self::player_mut(&mut self.players, id) else {
            return false;
        };
        let stamp = self.clock.next_stamp();
        player
            .as_mut()
            .apply(ScoreEvent::score(stamp, category, points));
        debug!(id, %category, points, score = player.score(), "score recorded");
        true
    }

    pub fn add_bonus(&mut self, id: PlayerId, category: BonusCategory, points: i64) -> bool {
        let Some(player) = Self::player_mut(&mut self.players, id) else {
            return false;
        };
        let stamp = self.clock.next_stamp();
        player
            .as_mut()
            .apply(ScoreEvent::bonus(stamp, category, points));
        debug!(id, %category, points, "bonus recorded");
        true
    }

    /// Award the endgame bonus once; returns the `(player, category)` awards.
    pub fn apply_endgame_bonus(&mut self) -> Vec<(PlayerId, BonusCategory)> {
        if self.players.is_empty() {
            return Vec::new();
        }
        if self.endgame_applied {
            debug!("endgame bonus already applied");
            return Vec::new();
        }
        let awards =
            ledger::apply_endgame_bonus(&mut self.players, &mut self.endgame_applied, &mut self.clock)
                .into_iter()
                .map(|award| (self.players[award.index].id(), award.category))
                .collect::<Vec<_>>();
        info!(awards = awards.len(), "endgame bonus applied");
        awards
    }

    /// Remove the most recent event in the whole roster.
    ///
    /// Clears the endgame flag once the last endgame award is removed.
    pub fn undo_latest(&mut self) -> Option<(PlayerId, ScoreEvent)> {
        let outcome = ledger::undo_latest(&mut self.players)?;
        if outcome.event.is_endgame() && !outcome.endgame_remaining {
            self.endgame_applied = false;
        }
        let id = self.players[outcome.index].id();
        info!(
            id,
            event = outcome.event.id(),
            endgame_applied = self.endgame_applied,
            "latest event undone"
        );
        Some((id, outcome.event))
    }

    pub fn show_history(&mut self) -> bool {
        if self.phase != SessionPhase::Playing {
            return false;
        }
        self.phase = SessionPhase::History;
        true
    }

    pub fn show_scoreboard(&mut self) -> bool {
        if self.phase != SessionPhase::History {
            return false;
        }
        self.phase = SessionPhase::Playing;
        true
    }

    /// Discard the roster and return to setup.
    pub fn reset(&mut self) {
        *self = Self::new();
        info!("session reset");
    }

    /// Every event across the roster, newest first.
    pub fn history(&self) -> Vec<HistoryEntry<'_>> {
        let mut keyed = self
            .players
            .iter()
            .enumerate()
            .flat_map(|(index, player)| {
                player
                    .history()
                    .iter()
                    .enumerate()
                    .map(move |(position, event)| {
                        let entry = HistoryEntry {
                            player_id: player.id(),
                            player_name: player.name(),
                            player_color: player.color(),
                            event,
                        };
                        ((event.stamp(), index, position), entry)
                    })
            })
            .collect::<Vec<_>>();
        // Same ordering key as `ledger::undo_latest`, newest first.
        keyed.sort_by(|(a, _), (b, _)| b.cmp(a));
        keyed.into_iter().map(|(_, entry)| entry).collect()
    }

    /// The event `undo_latest` would remove.
    pub fn latest_event(&self) -> Option<HistoryEntry<'_>> {
        self.history().into_iter().next()
    }

    /// Per bonus category, the highest value and everyone holding it.
    pub fn bonus_leaders(&self) -> Vec<BonusLeaders> {
        BonusCategory::ALL
            .into_iter()
            .map(|category| {
                let max_points = self
                    .players
                    .iter()
                    .map(|player| player.bonus_breakdown().get(category))
                    .max()
                    .unwrap_or(0)
                    .max(0);
                let leader_names = self
                    .players
                    .iter()
                    .filter(|player| player.bonus_breakdown().get(category) == max_points)
                    .map(|player| player.name().to_string())
                    .collect();
                BonusLeaders {
                    category,
                    max_points,
                    leader_names,
                }
            })
            .collect()
    }

    /// Players ordered by score, highest first; ties keep roster order.
    pub fn standings(&self) -> Vec<&Player> {
        let mut standings = self.players.iter().collect::<Vec<_>>();
        standings.sort_by(|a, b| b.score().cmp(&a.score()).then(a.id().cmp(&b.id())));
        standings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing(count: usize) -> Session {
        let mut session = Session::new();
        session.choose_roster_size(count);
        session.create_roster(count, &PlayerColor::ALL[..count]);
        session
    }

    #[test]
    fn roster_gets_sequential_ids_and_colours() {
        let session = playing(3);
        assert_eq!(session.phase(), SessionPhase::Playing);
        assert_eq!(session.roster_size(), 3);
        let ids: Vec<_> = session.players().iter().map(Player::id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(session.players()[1].color(), PlayerColor::Blue);
        assert_eq!(session.players()[2].name(), "Player 3");
        assert!(session.players().iter().all(|player| player.score() == 0));
    }

    #[test]
    fn blank_rename_keeps_previous_name() {
        let mut session = playing(2);
        assert!(session.rename(1, "  Ada "));
        assert_eq!(session.player(1).map(Player::name), Some("Ada"));
        assert!(!session.rename(1, "   "));
        assert_eq!(session.player(1).map(Player::name), Some("Ada"));
        assert!(!session.rename(9, "Ghost"));
    }

    #[test]
    fn unknown_player_commands_are_noops() {
        let mut session = playing(2);
        let before = session.clone();
        assert!(!session.add_score(7, ScoreCategory::Road, 4));
        assert!(!session.add_bonus(0, BonusCategory::Cloth, 1));
        assert_eq!(session.players(), before.players());
    }

    #[test]
    fn endgame_flag_follows_last_award() {
        let mut session = playing(2);
        session.add_bonus(1, BonusCategory::Barrel, 3);
        session.add_bonus(2, BonusCategory::Wheat, 2);
        let awards = session.apply_endgame_bonus();
        assert_eq!(
            awards,
            vec![(1, BonusCategory::Barrel), (2, BonusCategory::Wheat)]
        );
        assert!(session.endgame_applied());
        assert!(session.apply_endgame_bonus().is_empty());

        session.undo_latest();
        assert!(session.endgame_applied());
        let (id, event) = session.undo_latest().expect("barrel award");
        assert_eq!(id, 1);
        assert!(event.is_endgame());
        assert!(!session.endgame_applied());

        // A fresh pass is allowed again.
        assert_eq!(session.apply_endgame_bonus().len(), 2);
    }

    #[test]
    fn history_is_merged_newest_first() {
        let mut session = playing(2);
        session.add_score(1, ScoreCategory::Castle, 4);
        session.add_score(2, ScoreCategory::Road, 2);
        session.add_bonus(1, BonusCategory::Cloth, 1);
        let owners: Vec<_> = session
            .history()
            .iter()
            .map(|entry| entry.player_id)
            .collect();
        assert_eq!(owners, vec![1, 2, 1]);
        let latest = session.latest_event().expect("latest event");
        assert_eq!(latest.event.kind().record_type(), "bonus");
    }

    #[test]
    fn latest_event_matches_undo_target_on_tied_stamps() {
        use crate::ledger::{EventKind, EventStamp, Ledger};

        let stamp = EventStamp {
            timestamp: 5,
            seq: 0,
        };
        let players = [(1, PlayerColor::Red, "a"), (2, PlayerColor::Blue, "b")]
            .into_iter()
            .map(|(id, color, event_id)| {
                let event = ScoreEvent::from_parts(
                    event_id.to_string(),
                    stamp,
                    EventKind::Score {
                        category: ScoreCategory::Road,
                        points: 1,
                    },
                );
                let mut ledger = Ledger::new();
                ledger.apply(event);
                Player::restore(id, String::new(), color, ledger)
            })
            .collect();
        let mut session = Session::restore(SessionPhase::Playing, players, 2, false, 1);

        let latest = session.latest_event().expect("latest event");
        assert_eq!((latest.player_id, latest.event.id()), (2, "b"));
        let owners: Vec<_> = session.history().iter().map(|entry| entry.player_id).collect();
        assert_eq!(owners, vec![2, 1]);

        let (id, event) = session.undo_latest().expect("event to undo");
        assert_eq!((id, event.id()), (2, "b"));
    }

    #[test]
    fn redundant_endgame_request_changes_nothing() {
        let mut session = playing(2);
        session.add_bonus(2, BonusCategory::Cloth, 4);
        assert_eq!(session.apply_endgame_bonus(), vec![(2, BonusCategory::Cloth)]);
        let after_first = session.clone();
        assert!(session.apply_endgame_bonus().is_empty());
        assert_eq!(session, after_first);
    }

    #[test]
    fn bonus_leaders_include_ties() {
        let mut session = playing(3);
        session.rename(1, "Ada");
        session.rename(2, "Bo");
        session.add_bonus(1, BonusCategory::Barrel, 5);
        session.add_bonus(2, BonusCategory::Barrel, 5);
        let leaders = session.bonus_leaders();
        assert_eq!(leaders[0].max_points, 5);
        assert_eq!(leaders[0].leader_names, vec!["Ada", "Bo"]);
        assert_eq!(leaders[1].max_points, 0);
        assert_eq!(leaders[1].leader_names.len(), 3);
    }

    #[test]
    fn standings_order_by_score() {
        let mut session = playing(3);
        session.add_score(3, ScoreCategory::Field, 9);
        session.add_score(2, ScoreCategory::Field, 9);
        session.add_score(1, ScoreCategory::Field, 1);
        let order: Vec<_> = session.standings().iter().map(|p| p.id()).collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn dispatch_reports_changes() {
        let mut session = Session::new();
        assert!(session.dispatch(Command::ChooseRosterSize(2)));
        assert_eq!(session.phase(), SessionPhase::ColorSelection);
        assert!(session.dispatch(Command::CreateRoster(vec![
            PlayerColor::Green,
            PlayerColor::Black
        ])));
        assert!(!session.dispatch(Command::UndoLatest));
        assert!(session.dispatch(Command::AddScore {
            id: 2,
            category: ScoreCategory::Monastery,
            points: 9,
        }));
        assert!(session.dispatch(Command::ShowHistory));
        assert!(!session.dispatch(Command::ShowHistory));
        assert!(session.dispatch(Command::ShowScoreboard));
        assert!(session.dispatch(Command::ApplyEndgameBonus));
        assert!(!session.dispatch(Command::ApplyEndgameBonus));
        assert!(session.dispatch(Command::Reset));
        assert_eq!(session, Session::new());
        assert!(!session.dispatch(Command::Reset));
    }
}
