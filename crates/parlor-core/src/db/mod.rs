//! Local database layer for Parlor

mod attempt_repository;
mod connection;
mod migrations;
mod puzzle_repository;

pub use attempt_repository::{AttemptRepository, LibSqlAttemptRepository};
pub use connection::Database;
pub use puzzle_repository::{LibSqlPuzzleRepository, PuzzleRepository};
