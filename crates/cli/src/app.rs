use std::io::{BufRead, Write};

use anyhow::{anyhow, Result};
use chrono::{Local, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use tally_core::{
    models::truncate_points,
    save::{self, SaveManager},
    session::HistoryEntry,
    AppConfig, BonusCategory, Command, PlayerColor, ScoreCategory, Session, SessionPhase,
};
use tracing::{error, info};

const HELP: &str = "\
commands:
  players <n>                  choose the number of players
  colors <c1> <c2> ...         pick one colour per player and start
  rename <id> <name>           rename a player
  score <id> <category> <pts>  castle | road | monastery | garden | field
  bonus <id> <category> <pts>  barrel | wheat | cloth
  endgame                      award the endgame bonus
  undo                         remove the latest event
  history | board              switch between history and scoreboard
  leaders                      show bonus leaders
  show                         print the scoreboard
  dump                         print the stored snapshot
  reset                        start over
  quit";

static SCORE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(score|bonus)\s+(\d+)\s+([A-Za-z]+)\s+([+-]?\d+(?:\.\d*)?)$")
        .expect("failed to compile score command regex")
});

static RENAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^rename\s+(\d+)\s+(.*)$").expect("failed to compile rename command regex")
});

static PLAYERS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^players\s+(\d+)$").expect("failed to compile players regex"));

/// One parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Command(Command),
    Show,
    Leaders,
    Dump,
    Help,
    Quit,
}

/// Line-oriented front end driving a [`Session`].
pub struct TallyApp {
    config: AppConfig,
    saves: SaveManager,
    session: Session,
}

impl TallyApp {
    pub fn new(config: AppConfig, saves: SaveManager, session: Session) -> Self {
        Self {
            config,
            saves,
            session,
        }
    }

    /// Read commands from `input` until it ends or `quit` is entered.
    pub fn run(&mut self, input: impl BufRead, mut output: impl Write) -> Result<()> {
        writeln!(output, "{}", self.prompt())?;
        for line in input.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match self.parse(trimmed) {
                Ok(Input::Quit) => break,
                Ok(parsed) => self.handle(parsed, &mut output)?,
                Err(err) => writeln!(output, "{err}")?,
            }
            writeln!(output, "{}", self.prompt())?;
        }
        info!("Session closed");
        Ok(())
    }

    fn prompt(&self) -> String {
        match self.session.phase() {
            SessionPhase::Setup => format!(
                "How many players? ({}-{}) > ",
                self.config.min_players, self.config.max_players
            ),
            SessionPhase::ColorSelection => format!(
                "Pick {} colours from: {} > ",
                self.session.roster_size(),
                PlayerColor::ALL.map(PlayerColor::as_str).join(" ")
            ),
            SessionPhase::Playing => "scoreboard > ".to_string(),
            SessionPhase::History => "history > ".to_string(),
        }
    }

    fn parse(&self, line: &str) -> Result<Input> {
        if let Some(caps) = SCORE_RE.captures(line) {
            let id = caps[2].parse()?;
            let points = truncate_points(caps[4].parse::<f64>()?);
            let command = if &caps[1] == "score" {
                Command::AddScore {
                    id,
                    category: caps[3].parse::<ScoreCategory>()?,
                    points,
                }
            } else {
                Command::AddBonus {
                    id,
                    category: caps[3].parse::<BonusCategory>()?,
                    points,
                }
            };
            return Ok(Input::Command(command));
        }

        if let Some(caps) = RENAME_RE.captures(line) {
            return Ok(Input::Command(Command::Rename {
                id: caps[1].parse()?,
                name: caps[2].to_string(),
            }));
        }

        if let Some(caps) = PLAYERS_RE.captures(line) {
            let count: usize = caps[1].parse()?;
            if !self.config.roster_sizes().contains(&count) {
                return Err(anyhow!(
                    "choose between {} and {} players",
                    self.config.min_players,
                    self.config.max_players
                ));
            }
            return Ok(Input::Command(Command::ChooseRosterSize(count)));
        }

        if let Some(rest) = line.strip_prefix("colors") {
            let colors = rest
                .split_whitespace()
                .map(str::parse::<PlayerColor>)
                .collect::<Result<Vec<_>, _>>()?;
            self.check_colors(&colors)?;
            return Ok(Input::Command(Command::CreateRoster(colors)));
        }

        let input = match line {
            "endgame" => Input::Command(Command::ApplyEndgameBonus),
            "undo" => Input::Command(Command::UndoLatest),
            "history" => Input::Command(Command::ShowHistory),
            "board" => Input::Command(Command::ShowScoreboard),
            "reset" => Input::Command(Command::Reset),
            "show" => Input::Show,
            "leaders" => Input::Leaders,
            "dump" => Input::Dump,
            "help" | "?" => Input::Help,
            "quit" | "exit" => Input::Quit,
            other => return Err(anyhow!("unrecognised command '{other}', try 'help'")),
        };
        Ok(input)
    }

    fn check_colors(&self, colors: &[PlayerColor]) -> Result<()> {
        if self.session.phase() != SessionPhase::ColorSelection {
            return Err(anyhow!("choose the number of players first"));
        }
        let expected = self.session.roster_size();
        if colors.len() != expected {
            return Err(anyhow!("pick exactly {expected} colours"));
        }
        for (index, color) in colors.iter().enumerate() {
            if colors[..index].contains(color) {
                return Err(anyhow!("{color} was picked twice"));
            }
        }
        Ok(())
    }

    fn handle(&mut self, input: Input, output: &mut impl Write) -> Result<()> {
        match input {
            Input::Command(command) => {
                let shows_history = command == Command::ShowHistory;
                if self.session.dispatch(command) {
                    self.persist();
                }
                if shows_history || self.session.phase() == SessionPhase::History {
                    self.render_history(output)?;
                } else {
                    self.render_board(output)?;
                }
            }
            Input::Show => self.render_board(output)?,
            Input::Leaders => self.render_leaders(output)?,
            Input::Dump => writeln!(output, "{}", save::encode(&self.session)?)?,
            Input::Help => writeln!(output, "{HELP}")?,
            Input::Quit => {}
        }
        Ok(())
    }

    fn persist(&self) {
        if let Err(err) = self.saves.store(&self.session) {
            error!("Failed to store session: {err:#}");
        }
    }

    fn render_board(&self, output: &mut impl Write) -> Result<()> {
        if self.session.players().is_empty() {
            return Ok(());
        }
        for player in self.session.standings() {
            let breakdown = player
                .score_breakdown()
                .iter()
                .map(|(category, value)| format!("{}{value}", category.icon()))
                .collect::<Vec<_>>()
                .join(" ");
            let bonus = player
                .bonus_breakdown()
                .iter()
                .map(|(category, value)| format!("{}{value}", category.icon()))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(
                output,
                "#{} {:<12} {:<6} {:>4} | {breakdown} | {bonus} | endgame {}",
                player.id(),
                player.name(),
                player.color().as_str(),
                player.score(),
                player.endgame_bonus()
            )?;
        }
        if self.session.endgame_applied() {
            writeln!(output, "endgame bonus applied")?;
        }
        Ok(())
    }

    fn render_history(&self, output: &mut impl Write) -> Result<()> {
        let history = self.session.history();
        if history.is_empty() {
            writeln!(output, "no scores recorded yet")?;
            return Ok(());
        }
        for (index, entry) in history.iter().enumerate() {
            let marker = if index == 0 { "*" } else { " " };
            writeln!(output, "{marker} {}", format_entry(entry))?;
        }
        writeln!(output, "'undo' removes the entry marked *")?;
        Ok(())
    }

    fn render_leaders(&self, output: &mut impl Write) -> Result<()> {
        for leaders in self.session.bonus_leaders() {
            writeln!(
                output,
                "{} {:<7} {:>3}  {}",
                leaders.category.icon(),
                leaders.category.label(),
                leaders.max_points,
                leaders.leader_names.join(", ")
            )?;
        }
        Ok(())
    }
}

fn format_entry(entry: &HistoryEntry<'_>) -> String {
    let time = Local
        .timestamp_millis_opt(entry.event.timestamp())
        .single()
        .map(|time| time.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string());
    let (label, icon) = entry.event.kind().display();
    let mut line = format!(
        "{time} {} ({}) {icon} {label} {:+}",
        entry.player_name,
        entry.player_color,
        entry.event.points()
    );
    if let Some(description) = entry.event.description() {
        line.push_str(" - ");
        line.push_str(description);
    }
    line
}
