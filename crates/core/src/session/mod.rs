#![allow(missing_docs)]

//! Session controller: roster, session flags and command dispatch.

mod controller;
mod models;

pub use controller::{Command, Session};
pub use models::{default_name, BonusLeaders, HistoryEntry, Player, PlayerId, SessionPhase};
