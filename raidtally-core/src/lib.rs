//! Clan-wide raid completion aggregation over the Bungie API.
//!
//! A single-shot batch pipeline: resolve a clan's member list, enumerate
//! every member's characters, fetch per-character aggregate activity stats
//! concurrently under one global in-flight budget, and reduce everything
//! into per-member completion totals grouped by canonical raid.
//!
//! # Key Types
//!
//! - [`ApiClient`] - Rate-limited, retrying fetch client
//! - [`ClanApi`] - Trait seam between the client and the pipeline
//! - [`RaidTable`] - Canonical raid identity grouping
//! - [`pipeline::run`] - The fan-out/fan-in orchestration
//! - [`Report`] - The terminal output artifact

pub mod aggregate;
pub mod bungie;
pub mod client;
pub mod error;
pub mod pipeline;
pub mod raids;
pub mod report;
pub mod retry;

// Re-exports
pub use aggregate::{Aggregator, PerCharacterResult};
pub use bungie::{ClanApi, Member, UNKNOWN_DISPLAY_NAME};
pub use client::{ApiClient, DEFAULT_BASE_URL, DEFAULT_CONCURRENCY};
pub use error::{Error, Result};
pub use raids::{BUILTIN_RAIDS, RaidGroup, RaidTable};
pub use report::{Completions, MemberTotal, Report};
pub use retry::RetryPolicy;
