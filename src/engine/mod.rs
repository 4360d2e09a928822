//! Tournament materialization
//!
//! This module turns a tournament snapshot into brackets with teams, seeding
//! and start readiness. Brackets not yet created are previewed with the
//! configured [`BracketGenerator`].

pub mod bracket;
pub mod generator;
pub mod replays;
pub mod settings;
pub mod tournament;

// Re-export commonly used types
pub use bracket::{Bracket, SourcedTeams};
pub use generator::{BracketGenerator, StandardBracketGenerator};
pub use replays::{avoid_replays, Encounters};
pub use settings::{GeneratorSettings, GrandFinal};
pub use tournament::{Tournament, TournamentEngine};
