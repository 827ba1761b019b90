//! Raid identity table.
//!
//! A raid is addressed by several historical activity hashes across game
//! versions and difficulties. The table groups hashes under one canonical
//! raid name, preserving the order names first appear in; that order is
//! visible in the final report.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::warn;

use crate::error::{Error, Result};

/// Known raid activity hashes, in display order. One hash per historical
/// release or difficulty of a raid.
pub const BUILTIN_RAIDS: &[(u32, &str)] = &[
    (1044919065, "The Desert Perpetual"),
    (940375169, "Salvation's Edge"),
    (1541433876, "Salvation's Edge"),
    (2192826039, "Salvation's Edge"),
    (4129614942, "Salvation's Edge"),
    (4179289725, "Crota's End"),
    (1566480315, "Crota's End"),
    (107319834, "Crota's End"),
    (156253568, "Crota's End"),
    (1507509200, "Crota's End"),
    (548750096, "Root of Nightmares"),
    (2918919505, "Root of Nightmares"),
    (3257594522, "Kingsfall"),
    (1374392663, "Kingsfall"),
    (2897223272, "Kingsfall"),
    (1661734046, "Kingsfall"),
    (2906950631, "Vow of the Disciple"),
    (1441982566, "Vow of the Disciple"),
    (3889634515, "Vow of the Disciple"),
    (4217492330, "Vow of the Disciple"),
    (3881495763, "Vault of Glass"),
    (1485585878, "Vault of Glass"),
    (3022541210, "Vault of Glass"),
    (3711931140, "Vault of Glass"),
    (1681562271, "Vault of Glass"),
    (3976949817, "Deep Stone Crypt"),
    (910380154, "Deep Stone Crypt"),
    (1042180643, "Garden of Salvation"),
    (3458480158, "Garden of Salvation"),
    (2497200493, "Garden of Salvation"),
    (2659723068, "Garden of Salvation"),
    (3845997235, "Garden of Salvation"),
    (2122313384, "Last Wish"),
];

/// One canonical raid and the hashes that collapse into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaidGroup {
    pub name: String,
    pub hashes: BTreeSet<u32>,
}

/// Order-preserving mapping from canonical raid name to its hash set,
/// with an inverse hash index for O(1) lookup during aggregation. Built
/// once before any fetch starts and read-only afterwards.
#[derive(Debug, Clone)]
pub struct RaidTable {
    groups: Vec<RaidGroup>,
    index: HashMap<u32, usize>,
}

impl RaidTable {
    /// Group `entries` by name, preserving first-seen name order. A hash
    /// appearing in more than one entry is a data-entry defect and is
    /// rejected rather than resolved last-write-wins.
    pub fn from_entries(entries: &[(u32, &str)]) -> Result<Self> {
        let mut groups: Vec<RaidGroup> = Vec::new();
        let mut slot_by_name: HashMap<String, usize> = HashMap::new();
        let mut index: HashMap<u32, usize> = HashMap::new();

        for &(hash, name) in entries {
            if let Some(&slot) = index.get(&hash) {
                return Err(Error::DuplicateActivityHash {
                    hash,
                    first: groups[slot].name.clone(),
                    second: name.to_string(),
                });
            }
            let slot = *slot_by_name.entry(name.to_string()).or_insert_with(|| {
                groups.push(RaidGroup {
                    name: name.to_string(),
                    hashes: BTreeSet::new(),
                });
                groups.len() - 1
            });
            groups[slot].hashes.insert(hash);
            index.insert(hash, slot);
        }

        Ok(Self { groups, index })
    }

    /// The built-in table.
    pub fn builtin() -> Self {
        Self::from_entries(BUILTIN_RAIDS).expect("built-in raid table contains no duplicate hashes")
    }

    /// Canonical raids in first-seen order.
    pub fn groups(&self) -> &[RaidGroup] {
        &self.groups
    }

    /// Number of canonical raids.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Index into [`groups`](Self::groups) for a hash.
    pub fn group_index(&self, hash: u32) -> Option<usize> {
        self.index.get(&hash).copied()
    }

    pub fn contains(&self, hash: u32) -> bool {
        self.index.contains_key(&hash)
    }

    /// Every known hash, in table order.
    pub fn all_hashes(&self) -> impl Iterator<Item = u32> + '_ {
        self.groups
            .iter()
            .flat_map(|group| group.hashes.iter().copied())
    }

    /// The identifier set a run aggregates over: the explicit subset when
    /// one is given (unknown hashes are dropped with a warning), otherwise
    /// every known hash.
    pub fn wanted_set(&self, explicit: &[u32]) -> HashSet<u32> {
        if explicit.is_empty() {
            return self.all_hashes().collect();
        }
        let mut wanted = HashSet::new();
        for &hash in explicit {
            if self.contains(hash) {
                wanted.insert(hash);
            } else {
                warn!(hash, "requested activity hash is not in the raid table, ignoring");
            }
        }
        wanted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_builds_and_groups_by_name() {
        let table = RaidTable::builtin();
        assert!(!table.is_empty());

        let names: Vec<&str> = table.groups().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names[0], "The Desert Perpetual");
        assert_eq!(names[1], "Salvation's Edge");
        assert!(names.contains(&"Vault of Glass"));

        // No name appears twice.
        let mut deduped = names.clone();
        deduped.dedup();
        assert_eq!(names, deduped);

        let vault = table
            .groups()
            .iter()
            .find(|g| g.name == "Vault of Glass")
            .unwrap();
        assert_eq!(vault.hashes.len(), 5);
        assert!(vault.hashes.contains(&3881495763));
    }

    #[test]
    fn grouping_is_idempotent() {
        let first = RaidTable::from_entries(BUILTIN_RAIDS).unwrap();
        let second = RaidTable::from_entries(BUILTIN_RAIDS).unwrap();
        assert_eq!(first.groups(), second.groups());
    }

    #[test]
    fn duplicate_hash_is_rejected() {
        let entries = [
            (100, "Vault of Glass"),
            (200, "Kingsfall"),
            (100, "Last Wish"),
        ];
        let err = RaidTable::from_entries(&entries).unwrap_err();
        match err {
            Error::DuplicateActivityHash { hash, first, second } => {
                assert_eq!(hash, 100);
                assert_eq!(first, "Vault of Glass");
                assert_eq!(second, "Last Wish");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_hash_under_same_name_is_also_rejected() {
        let entries = [(100, "Vault of Glass"), (100, "Vault of Glass")];
        assert!(RaidTable::from_entries(&entries).is_err());
    }

    #[test]
    fn inverse_index_resolves_every_hash() {
        let table = RaidTable::builtin();
        for hash in table.all_hashes() {
            let slot = table.group_index(hash).unwrap();
            assert!(table.groups()[slot].hashes.contains(&hash));
        }
        assert_eq!(table.group_index(1), None);
    }

    #[test]
    fn wanted_set_defaults_to_all_hashes() {
        let table = RaidTable::builtin();
        let wanted = table.wanted_set(&[]);
        assert_eq!(wanted.len(), BUILTIN_RAIDS.len());
    }

    #[test]
    fn wanted_set_filters_unknown_hashes() {
        let table = RaidTable::builtin();
        let wanted = table.wanted_set(&[3881495763, 1]);
        assert_eq!(wanted.len(), 1);
        assert!(wanted.contains(&3881495763));
    }
}
