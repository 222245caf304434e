//! Small personal productivity tools behind one command line: a fuzzy autocompleting command
//! entry, an append-only to-do log, a time tracker, a line triage session and a countdown timer.
//!
//! The reusable part is [matcher], subsequence matching and ranking of a query against a fixed
//! vocabulary, and [entry], the UI independent command entry built on top of it.

pub mod cli;
pub mod config;
pub mod entry;
pub mod fs;
pub mod matcher;
pub mod timer;
pub mod todo;
pub mod tracker;
pub mod triage;
pub mod utils;
