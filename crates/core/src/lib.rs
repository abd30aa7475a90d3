#![warn(clippy::all, missing_docs)]

//! Core scoring engine for meeple-tally.
//!
//! This crate hosts the per-player ledger, the session controller that owns
//! the roster, configuration handling and snapshot persistence used by the
//! command-line front end and any future frontends.

pub mod config;
pub mod ledger;
pub mod models;
pub mod save;
pub mod session;

pub use config::AppConfig;
pub use ledger::{EventKind, Ledger, ScoreEvent};
pub use models::{BonusCategory, PlayerColor, ScoreCategory};
pub use save::{SaveManager, Snapshot, SnapshotError};
pub use session::{Command, Player, PlayerId, Session, SessionPhase};
