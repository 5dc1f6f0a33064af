//! # Magic Buddy - reading progression core for young English learners
//!
//! Magic Buddy tracks a child's journey across a story map. Every finished story
//! earns magic power, which makes a companion character (the buddy) evolve.
//! Progress can move between devices as a short text payload rendered as a QR code.
//!
//! ## Features
//!
//! - **Story Map**: Regions of nodes linked by prerequisites, validated as an acyclic graph at load time.
//! - **Unlock Evaluation**: Pure functions decide which nodes are playable and apply completions exactly once.
//! - **Buddy Evolution**: Stage derived from a single magic-power threshold table.
//! - **Reading Streaks & Achievements**: Calendar-day streaks and data-driven achievement triggers.
//! - **Offline Storage**: Sled-backed persistence with schema-versioned records.
//! - **QR Sync**: Checksummed, tagged payloads that reject any tampered or damaged input.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use magic_buddy::buddy::{
//!     load_or_initialize, BuddySession, BuddyStore, ContentCatalog, ProgressReporter,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = BuddyStore::open("./data/buddy.db")?;
//!     let catalog = ContentCatalog::canonical()?;
//!     load_or_initialize(&store, &catalog, &ProgressReporter::silent()).await?;
//!
//!     let mut session = BuddySession::open(store, Arc::new(catalog), "Mia", "Sparky")?;
//!     session.complete_node("node_l1_1")?;
//!     println!("{}", session.export_sync(chrono::Utc::now())?);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`buddy`] - Content catalog, unlock rules, progress, storage, initialization and sync
//! - [`config`] - Configuration management
//! - [`validation`] - Reader and buddy name validation
//! - [`logutil`] - Single-line log escaping for untrusted text
//! - [`metrics`] - Process-local counters

pub mod buddy;
pub mod config;
pub mod logutil;
pub mod metrics;
pub mod validation;
