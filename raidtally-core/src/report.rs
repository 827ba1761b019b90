//! Final report structure.
//!
//! The report is the terminal artifact of a run: written once, never
//! mutated. Raid names appear in table order both in the `raids` block and
//! in every member's completion map, so the two custom `Serialize` impls
//! below emit JSON maps in insertion order.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::raids::RaidTable;

/// Per-member completion counts keyed by canonical raid name, in table
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completions(Vec<(String, u64)>);

impl Completions {
    pub fn new(entries: Vec<(String, u64)>) -> Self {
        Self(entries)
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.0
            .iter()
            .find(|(raid, _)| raid == name)
            .map(|&(_, count)| count)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(name, count)| (name.as_str(), *count))
    }

    /// Sum of every bucket.
    pub fn total(&self) -> u64 {
        self.0.iter().map(|&(_, count)| count).sum()
    }
}

impl Serialize for Completions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, count) in &self.0 {
            map.serialize_entry(name, count)?;
        }
        map.end()
    }
}

/// One member's aggregated totals. Invariant: `total` equals the sum of
/// `completions`.
#[derive(Debug, Clone, Serialize)]
pub struct MemberTotal {
    #[serde(rename = "membershipId")]
    pub membership_id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    pub completions: Completions,
    pub total: u64,
}

/// The `raids` block: canonical name to name-and-hashes, in table order.
#[derive(Debug, Clone)]
pub struct RaidsBlock(Vec<RaidsEntry>);

#[derive(Debug, Clone, Serialize)]
struct RaidsEntry {
    name: String,
    hashes: Vec<u32>,
}

impl RaidsBlock {
    fn from_table(table: &RaidTable) -> Self {
        Self(
            table
                .groups()
                .iter()
                .map(|group| RaidsEntry {
                    name: group.name.clone(),
                    hashes: group.hashes.iter().copied().collect(),
                })
                .collect(),
        )
    }
}

impl Serialize for RaidsBlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for entry in &self.0 {
            map.serialize_entry(&entry.name, entry)?;
        }
        map.end()
    }
}

/// The finished report.
#[derive(Debug, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub group_id: String,
    pub raids: RaidsBlock,
    pub members: Vec<MemberTotal>,
}

impl Report {
    /// Assemble and timestamp the final structure. This is the emitter
    /// boundary: everything upstream of it is deterministic.
    pub fn assemble(group_id: impl Into<String>, table: &RaidTable, members: Vec<MemberTotal>) -> Self {
        Self {
            generated_at: Utc::now(),
            group_id: group_id.into(),
            raids: RaidsBlock::from_table(table),
            members,
        }
    }
}
