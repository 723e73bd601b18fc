//! Ancestor/descendant package accounting (spec §3 `PackageEntry`,
//! §4.5 selection loop).
//!
//! The mempool keeps a flat table of entries plus a parent/child adjacency
//! map; ancestor and descendant sets are derived by walking that adjacency
//! rather than held as owning references, so a cycle (which cannot occur in
//! a valid chain of spends, but which a buggy caller could otherwise
//! construct) can't leak memory. Entries are addressed by transaction hash,
//! which doubles as the "arena index" the specification describes.

use std::collections::{HashMap, HashSet};

use hive_chain::transaction;

/// A single mempool entry together with its ancestor-package totals
/// (spec §3 `PackageEntry`).
#[derive(Debug, Clone)]
pub struct PackageEntry {
    pub hash: transaction::Hash,
    /// Serialized size in bytes, standing in for BIP141 weight (this node
    /// has no witness data, so weight is simply `4 * size`).
    pub size: u64,
    /// The transaction's own fee, in satoshis.
    pub fee: i64,
    pub sigop_cost: i64,

    pub size_with_ancestors: u64,
    pub fee_with_ancestors: i64,
    pub sigop_cost_with_ancestors: i64,
}

impl PackageEntry {
    fn new(hash: transaction::Hash, size: u64, fee: i64, sigop_cost: i64) -> Self {
        PackageEntry {
            hash,
            size,
            fee,
            sigop_cost,
            size_with_ancestors: size,
            fee_with_ancestors: fee,
            sigop_cost_with_ancestors: sigop_cost,
        }
    }

    /// `max(feerate, ancestor-group feerate)`, the priority key package
    /// selection sorts by (glossary: "Ancestor score").
    pub fn ancestor_score(&self) -> f64 {
        let own_feerate = self.fee as f64 / self.size.max(1) as f64;
        let package_feerate = self.fee_with_ancestors as f64 / self.size_with_ancestors.max(1) as f64;
        own_feerate.max(package_feerate)
    }
}

/// A shadow copy of an entry's ancestor totals, used while the block
/// assembler's selection loop shrinks them as ancestors get included
/// (spec §4.5 step 8). Looked up in preference to the primary entry once
/// present.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModifiedEntry {
    pub size_with_ancestors: u64,
    pub fee_with_ancestors: i64,
    pub sigop_cost_with_ancestors: i64,
}

impl ModifiedEntry {
    pub fn ancestor_score(&self, own_size: u64, own_fee: i64) -> f64 {
        let own_feerate = own_fee as f64 / own_size.max(1) as f64;
        let package_feerate =
            self.fee_with_ancestors as f64 / self.size_with_ancestors.max(1) as f64;
        own_feerate.max(package_feerate)
    }
}

/// The secondary index the selection loop consults once ancestor inclusion
/// has shrunk an entry's package totals.
#[derive(Debug, Default)]
pub struct ModifiedEntries {
    entries: HashMap<transaction::Hash, ModifiedEntry>,
}

impl ModifiedEntries {
    pub fn new() -> Self {
        ModifiedEntries {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, hash: &transaction::Hash) -> Option<&ModifiedEntry> {
        self.entries.get(hash)
    }

    pub fn contains(&self, hash: &transaction::Hash) -> bool {
        self.entries.contains_key(hash)
    }

    pub fn erase(&mut self, hash: &transaction::Hash) {
        self.entries.remove(hash);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Subtracts `included`'s size/fee/sigop-cost from `descendant`'s
    /// ancestor totals, creating the shadow entry from `base` if absent
    /// (spec §4.5 step 8).
    pub fn subtract_included_ancestor(
        &mut self,
        descendant: transaction::Hash,
        base: &PackageEntry,
        included: &PackageEntry,
    ) {
        let entry = self.entries.entry(descendant).or_insert(ModifiedEntry {
            size_with_ancestors: base.size_with_ancestors,
            fee_with_ancestors: base.fee_with_ancestors,
            sigop_cost_with_ancestors: base.sigop_cost_with_ancestors,
        });
        entry.size_with_ancestors = entry.size_with_ancestors.saturating_sub(included.size);
        entry.fee_with_ancestors -= included.fee;
        entry.sigop_cost_with_ancestors -= included.sigop_cost;
    }

    pub fn iter(&self) -> impl Iterator<Item = (&transaction::Hash, &ModifiedEntry)> {
        self.entries.iter()
    }
}

/// The ancestor/descendant-aware package-accounting mempool the Block
/// Assembler (spec §4.5) walks.
#[derive(Debug, Default)]
pub struct Mempool {
    entries: HashMap<transaction::Hash, PackageEntry>,
    parents: HashMap<transaction::Hash, HashSet<transaction::Hash>>,
    children: HashMap<transaction::Hash, HashSet<transaction::Hash>>,
}

impl Mempool {
    pub fn new() -> Self {
        Mempool {
            entries: HashMap::new(),
            parents: HashMap::new(),
            children: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, hash: &transaction::Hash) -> bool {
        self.entries.contains_key(hash)
    }

    pub fn get(&self, hash: &transaction::Hash) -> Option<&PackageEntry> {
        self.entries.get(hash)
    }

    /// Every entry currently held, in no particular order — the block
    /// assembler's primary selection stream scans this directly (spec
    /// §4.5 step 1) rather than the mempool maintaining its own sorted
    /// ancestor-score index.
    pub fn iter(&self) -> impl Iterator<Item = (&transaction::Hash, &PackageEntry)> {
        self.entries.iter()
    }

    pub fn parents_of(&self, hash: &transaction::Hash) -> impl Iterator<Item = &transaction::Hash> {
        self.parents.get(hash).into_iter().flatten()
    }

    pub fn children_of(&self, hash: &transaction::Hash) -> impl Iterator<Item = &transaction::Hash> {
        self.children.get(hash).into_iter().flatten()
    }

    /// The full ancestor set of `hash` (not including itself), walked
    /// transitively through `parents` (spec §4.5 step 5).
    pub fn ancestors(&self, hash: &transaction::Hash) -> HashSet<transaction::Hash> {
        let mut seen = HashSet::new();
        let mut stack: Vec<_> = self.parents_of(hash).copied().collect();
        while let Some(next) = stack.pop() {
            if seen.insert(next) {
                stack.extend(self.parents_of(&next).copied());
            }
        }
        seen
    }

    /// The full descendant set of `hash` (not including itself).
    pub fn descendants(&self, hash: &transaction::Hash) -> HashSet<transaction::Hash> {
        let mut seen = HashSet::new();
        let mut stack: Vec<_> = self.children_of(hash).copied().collect();
        while let Some(next) = stack.pop() {
            if seen.insert(next) {
                stack.extend(self.children_of(&next).copied());
            }
        }
        seen
    }

    /// Inserts `hash` as a mempool entry with in-mempool `parents`,
    /// computing its ancestor-package totals from the current state of
    /// those parents (which must already be present).
    pub fn insert(
        &mut self,
        hash: transaction::Hash,
        size: u64,
        fee: i64,
        sigop_cost: i64,
        parents: impl IntoIterator<Item = transaction::Hash>,
    ) {
        let parents: HashSet<_> = parents.into_iter().collect();
        let mut entry = PackageEntry::new(hash, size, fee, sigop_cost);

        let ancestor_hashes = {
            self.parents.insert(hash, parents.clone());
            self.ancestors(&hash)
        };
        for ancestor_hash in &ancestor_hashes {
            if let Some(ancestor) = self.entries.get(ancestor_hash) {
                entry.size_with_ancestors += ancestor.size;
                entry.fee_with_ancestors += ancestor.fee;
                entry.sigop_cost_with_ancestors += ancestor.sigop_cost;
            }
        }

        for parent in &parents {
            self.children.entry(*parent).or_default().insert(hash);
        }

        self.entries.insert(hash, entry);
    }

    /// Removes `hash`, unlinking it from its parents' and children's
    /// adjacency sets. Does not update descendants' cached ancestor totals
    /// (callers removing a confirmed/evicted package should recompute
    /// affected descendants, mirroring `CTxMemPool::removeUnchecked`'s
    /// `UpdateAncestorsOf` pass).
    pub fn remove(&mut self, hash: &transaction::Hash) -> Option<PackageEntry> {
        let removed = self.entries.remove(hash)?;
        if let Some(parents) = self.parents.remove(hash) {
            for parent in parents {
                if let Some(children) = self.children.get_mut(&parent) {
                    children.remove(hash);
                }
            }
        }
        if let Some(children) = self.children.remove(hash) {
            for child in children {
                if let Some(parents) = self.parents.get_mut(&child) {
                    parents.remove(hash);
                }
            }
        }
        Some(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(byte: u8) -> transaction::Hash {
        transaction::Hash([byte; 32])
    }

    #[test]
    fn ancestor_totals_accumulate_through_chain() {
        hive_test::init();
        let mut mempool = Mempool::new();
        mempool.insert(hash(1), 200, 1000, 4, []);
        mempool.insert(hash(2), 200, 500, 4, [hash(1)]);

        let child = mempool.get(&hash(2)).unwrap();
        assert_eq!(child.size_with_ancestors, 400);
        assert_eq!(child.fee_with_ancestors, 1500);
    }

    #[test]
    fn descendants_include_grandchildren() {
        hive_test::init();
        let mut mempool = Mempool::new();
        mempool.insert(hash(1), 200, 1000, 4, []);
        mempool.insert(hash(2), 200, 500, 4, [hash(1)]);
        mempool.insert(hash(3), 200, 500, 4, [hash(2)]);

        let descendants = mempool.descendants(&hash(1));
        assert!(descendants.contains(&hash(2)));
        assert!(descendants.contains(&hash(3)));
    }

    #[test]
    fn modified_entries_shrink_on_ancestor_inclusion() {
        hive_test::init();
        let mut mempool = Mempool::new();
        mempool.insert(hash(1), 200, 1000, 4, []);
        mempool.insert(hash(2), 200, 500, 4, [hash(1)]);

        let mut modified = ModifiedEntries::new();
        let parent = mempool.get(&hash(1)).unwrap().clone();
        let child = mempool.get(&hash(2)).unwrap().clone();
        modified.subtract_included_ancestor(hash(2), &child, &parent);

        let shadow = modified.get(&hash(2)).unwrap();
        assert_eq!(shadow.fee_with_ancestors, 500);
        assert_eq!(shadow.size_with_ancestors, 200);
    }
}
