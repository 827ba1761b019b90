//! Fan-in aggregation of per-character results into per-member totals.
//!
//! The aggregator runs on a single control-flow thread; fetch concurrency
//! never touches it. Counts only ever increase, and addition commutes, so
//! the result is independent of the order per-character results arrive in.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::bungie::Member;
use crate::raids::RaidTable;
use crate::report::{Completions, MemberTotal};

/// Completion counts one character contributed, keyed by activity hash and
/// restricted to the identifiers a run asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerCharacterResult(HashMap<u32, u64>);

impl PerCharacterResult {
    /// The absorb-failure sentinel: every wanted identifier at 0. Also the
    /// starting point for a successful collection.
    pub fn zeroed(wanted: &HashSet<u32>) -> Self {
        Self(wanted.iter().map(|&hash| (hash, 0)).collect())
    }

    /// Accumulate a count. An identifier appearing several times in the
    /// raw response sums rather than overwrites.
    pub fn add(&mut self, hash: u32, count: u64) {
        *self.0.entry(hash).or_insert(0) += count;
    }

    pub fn get(&self, hash: u32) -> Option<u64> {
        self.0.get(&hash).copied()
    }

    pub fn counts(&self) -> impl Iterator<Item = (u32, u64)> + '_ {
        self.0.iter().map(|(&hash, &count)| (hash, count))
    }
}

struct MemberState {
    display_name: String,
    buckets: Vec<u64>,
}

/// Reduces the full fan-in into one [`MemberTotal`] per member.
///
/// Every resolved member is seeded at construction, so members that never
/// produce a result (no characters, or all fetches absorbed) still appear
/// in the report with all-zero counts.
pub struct Aggregator<'a> {
    table: &'a RaidTable,
    order: Vec<String>,
    states: HashMap<String, MemberState>,
}

impl<'a> Aggregator<'a> {
    pub fn new(table: &'a RaidTable, members: &[Member]) -> Self {
        let mut order = Vec::with_capacity(members.len());
        let mut states = HashMap::with_capacity(members.len());
        for member in members {
            order.push(member.membership_id.clone());
            states.insert(
                member.membership_id.clone(),
                MemberState {
                    display_name: member.display_name.clone(),
                    buckets: vec![0; table.len()],
                },
            );
        }
        Self {
            table,
            order,
            states,
        }
    }

    /// Fold one character's counts into its owner's buckets. Hashes
    /// outside the table are ignored.
    pub fn record(&mut self, membership_id: &str, result: &PerCharacterResult) {
        let Some(state) = self.states.get_mut(membership_id) else {
            warn!(member = membership_id, "result for unknown member, dropping");
            return;
        };
        for (hash, count) in result.counts() {
            if let Some(slot) = self.table.group_index(hash) {
                state.buckets[slot] += count;
            }
        }
    }

    /// Produce the final totals in member-resolution order.
    pub fn finish(mut self) -> Vec<MemberTotal> {
        let mut totals = Vec::with_capacity(self.order.len());
        for membership_id in &self.order {
            let Some(state) = self.states.remove(membership_id) else {
                continue;
            };
            let completions = Completions::new(
                self.table
                    .groups()
                    .iter()
                    .zip(&state.buckets)
                    .map(|(group, &count)| (group.name.clone(), count))
                    .collect(),
            );
            let total = completions.total();
            totals.push(MemberTotal {
                membership_id: membership_id.clone(),
                display_name: state.display_name,
                completions,
                total,
            });
        }
        totals
    }
}
