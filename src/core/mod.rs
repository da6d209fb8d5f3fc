//! Core plumbing shared by the contract store and the CLI.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod schemas;
pub mod time;
