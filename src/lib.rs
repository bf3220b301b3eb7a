//! taskdeck - local task management library
//!
//! This library provides the core functionality for the td CLI: a task
//! store with observer notifications, lenient persistence over a key-value
//! backend, and status-grouped views for listing and the terminal board.
//!
//! # Core Concepts
//!
//! - **Tasks**: titled records with a status (pending, in progress,
//!   completed) and a `completed` flag kept in lockstep with it
//! - **Store**: the in-memory collection; every mutation is saved and then
//!   broadcast to subscribers
//! - **Persistence**: JSON under a primary key, with read-only fallback to
//!   legacy keys and per-record normalization of malformed data
//! - **Views**: search, status filters and grouping by status
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `config.toml`
//! - `error`: Error types and result aliases
//! - `lock`: File locking and atomic writes
//! - `output`: Human and JSON output envelopes
//! - `persistence`: Load/save of the task collection
//! - `storage`: Key-value backends (files on disk, in-memory)
//! - `store`: The task store and its change notifications
//! - `task`: Task model and status rules
//! - `ui`: Interactive terminal board
//! - `view`: Search, filtering and status grouping

pub mod cli;
pub mod config;
pub mod error;
pub mod lock;
pub mod output;
pub mod persistence;
pub mod storage;
pub mod store;
pub mod task;
pub mod ui;
pub mod view;

pub use error::{Error, Result};
