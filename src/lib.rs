// Eventvault - Business Event Archive Exporter
// Copyright (c) 2025 Eventvault Contributors
// Licensed under the MIT License

//! # Eventvault - incremental business-event archiver
//!
//! Eventvault exports event records produced by business integrations from
//! a remote, query-only event store into durable, partitioned archives in
//! object storage, tracking per-integration checkpoints so each run resumes
//! exactly where the previous run stopped.
//!
//! ## Architecture
//!
//! The crate follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (pager, archive writer, window pipeline,
//!   orchestrator, checkpoint state)
//! - [`adapters`] - External integrations (query protocol, object storage)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Processing model
//!
//! One pipeline per integration walks hour-aligned windows from the last
//! checkpoint towards a safety horizon one hour behind "now". Each window
//! is counted, paged, written into size-bounded compressed archive parts,
//! and uploaded; the checkpoint advances to the window end only after every
//! part of that window is durably stored. Delivery is therefore
//! at-least-once: a crash between upload and checkpoint reprocesses the
//! window on the next run, never skips it.
//!
//! ```rust,no_run
//! use eventvault::adapters::query::{QueryClient, TokenProvider};
//! use eventvault::config::load_config;
//! # async fn example() -> anyhow::Result<()> {
//! let config = load_config("eventvault.toml")?;
//! let tokens = std::sync::Arc::new(TokenProvider::new(config.oauth.clone()));
//! let client = QueryClient::new(&config.query, tokens);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error handling
//!
//! All fallible paths return [`domain::ExportError`]; failures in one
//! integration's pipeline never cancel its siblings, and the process exit
//! code is `0` only when every integration completed cleanly.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
