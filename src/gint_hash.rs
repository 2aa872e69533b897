//! GintHash: process-local extendible hash table for `Gint` keys and values.
//!
//! The directory holds `2^level` bucket references. A bucket with local
//! level `l` is referenced from every slot whose low `l` bits match, that
//! is from `2^(level - l)` slots. An overflowing bucket splits on its next
//! bit; when its local level already equals the global level the directory
//! doubles first. Level 0 is never used; a fresh table starts at level 1.
//!
//! Buckets live in an arena and the directory stores arena ids. Bucket
//! demand is budgeted in pools, one per directory growth step, each sized
//! to the number of slots that step added. Since every bucket is reachable
//! from at least one slot, the pools never run dry.

use crate::config::Config;
use crate::error::{AllocTarget, Error, Result};
use crate::hash::scramble;
use crate::Gint;
use slotmap::{DefaultKey, SlotMap};

/// Key/value pairs a bucket holds between operations.
pub const BUCKET_CAPACITY: usize = 3;

type BucketId = DefaultKey;

#[inline]
fn slot_hash(key: Gint) -> usize {
    scramble(key) as usize
}

#[derive(Clone, Debug)]
struct Bucket {
    level: u32,
    fill: usize,
    // One slot beyond capacity holds the pair that triggers a split.
    entries: [(Gint, Gint); BUCKET_CAPACITY + 1],
}

impl Bucket {
    fn new(level: u32) -> Self {
        Self {
            level,
            fill: 0,
            entries: [(0, 0); BUCKET_CAPACITY + 1],
        }
    }

    fn push(&mut self, key: Gint, value: Gint) {
        debug_assert!(self.fill <= BUCKET_CAPACITY, "bucket overflow slot in use");
        self.entries[self.fill] = (key, value);
        self.fill += 1;
    }

    fn take(&mut self, idx: usize) -> (Gint, Gint) {
        let e = self.entries[idx];
        self.entries.copy_within(idx + 1..self.fill, idx);
        self.fill -= 1;
        e
    }

    fn get(&self, key: Gint) -> Option<Gint> {
        self.entries[..self.fill]
            .iter()
            .find(|(k, _)| *k == key)
            .map(|&(_, v)| v)
    }

    fn is_overfull(&self) -> bool {
        self.fill > BUCKET_CAPACITY
    }

    /// Whether every entry scrambles to the same word, so that no number of
    /// splits can separate them.
    fn is_unsplittable(&self) -> bool {
        let first = slot_hash(self.entries[0].0);
        self.entries[1..self.fill]
            .iter()
            .all(|&(k, _)| slot_hash(k) == first)
    }

    /// Raise the local level and move every entry whose scrambled key has
    /// `bit` set into a new sibling bucket. Relative order is kept on both
    /// sides.
    fn split_off(&mut self, bit: usize) -> Bucket {
        self.level += 1;
        let mut sibling = Bucket::new(self.level);
        let mut i = 0;
        while i < self.fill {
            if slot_hash(self.entries[i].0) & bit != 0 {
                let (k, v) = self.take(i);
                sibling.push(k, v);
            } else {
                i += 1;
            }
        }
        sibling
    }
}

#[derive(Copy, Clone, Debug)]
struct Pool {
    size: usize,
    issued: usize,
}

/// Shape of a table at a point in time.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Stats {
    /// Global directory level.
    pub level: u32,
    /// Directory length, `2^level`.
    pub directory_slots: usize,
    /// Buckets allocated so far.
    pub buckets: usize,
    /// Stored key/value pairs.
    pub entries: usize,
    /// Fill of the fullest bucket.
    pub max_fill: usize,
}

/// Extendible hash table mapping `Gint` keys to `Gint` values.
///
/// Keys need not be unique: inserting a key twice stores two pairs and
/// lookups return one of them. There is no removal and no iteration.
pub struct GintHash {
    level: u32,
    directory: Vec<Option<BucketId>>,
    buckets: SlotMap<BucketId, Bucket>,
    pools: Vec<Pool>,
    free_pool: usize,
    len: usize,
    config: Config,
}

impl GintHash {
    /// Creates a table at level 1 with the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    /// Creates a table at level 1.
    ///
    /// Fails if the initial directory or bucket pool cannot be allocated,
    /// or if `config` leaves no usable level.
    pub fn with_config(config: Config) -> Result<Self> {
        let mut table = Self {
            level: 0,
            directory: Vec::new(),
            buckets: SlotMap::with_key(),
            pools: Vec::new(),
            free_pool: 0,
            len: 0,
            config,
        };
        table.grow()?;
        Ok(table)
    }

    /// Number of stored pairs.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Global directory level.
    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stats(&self) -> Stats {
        Stats {
            level: self.level,
            directory_slots: self.directory.len(),
            buckets: self.buckets.len(),
            entries: self.len,
            max_fill: self.buckets.values().map(|b| b.fill).max().unwrap_or(0),
        }
    }

    #[inline]
    fn slot_of(&self, key: Gint) -> usize {
        slot_hash(key) & (self.directory.len() - 1)
    }

    /// Value stored for `key`, if any.
    pub fn get(&self, key: Gint) -> Option<Gint> {
        let id = self.directory[self.slot_of(key)]?;
        self.buckets[id].get(key)
    }

    pub fn contains_key(&self, key: Gint) -> bool {
        self.get(key).is_some()
    }

    /// Add a key/value pair, splitting buckets and growing the directory as
    /// needed.
    ///
    /// On failure the pair is not stored and every previously stored pair
    /// stays reachable. Splits completed before the failure are kept.
    pub fn insert(&mut self, key: Gint, value: Gint) -> Result<()> {
        let slot = self.slot_of(key);
        let Some(mut id) = self.directory[slot] else {
            self.claim_bucket()?;
            let mut bucket = Bucket::new(self.level);
            bucket.push(key, value);
            self.directory[slot] = Some(self.buckets.insert(bucket));
            self.len += 1;
            return Ok(());
        };

        self.buckets[id].push(key, value);
        // All overflowing pairs land on one side of a split, so at most one
        // bucket is overfull at any time and it holds the new pair.
        while self.buckets[id].is_overfull() {
            if self.buckets[id].is_unsplittable() {
                // Splitting would only double the directory up to the ceiling.
                self.withdraw(id, key, value);
                log::warn!("gint hash: more than {BUCKET_CAPACITY} pairs share key hash of {key}");
                return Err(Error::CapacityExceeded {
                    max_level: self.config.max_level,
                });
            }
            match self.split(id) {
                Ok(sibling) => {
                    if self.buckets[sibling].is_overfull() {
                        id = sibling;
                    }
                }
                Err(e) => {
                    self.withdraw(id, key, value);
                    return Err(e);
                }
            }
        }
        self.len += 1;
        Ok(())
    }

    /// Drop the pair being inserted from the overfull bucket `id`.
    fn withdraw(&mut self, id: BucketId, key: Gint, value: Gint) {
        let bucket = &mut self.buckets[id];
        let pos = bucket.entries[..bucket.fill]
            .iter()
            .rposition(|&e| e == (key, value));
        if let Some(idx) = pos {
            bucket.take(idx);
        }
        debug_assert!(!bucket.is_overfull());
    }

    /// Split bucket `id` on its next bit and return the new sibling.
    ///
    /// On failure no bucket has changed. The directory may already have
    /// doubled, which leaves every slot pointing at the same bucket as before.
    fn split(&mut self, id: BucketId) -> Result<BucketId> {
        if self.buckets[id].level == self.level {
            self.grow()?;
        }
        self.claim_bucket()?;

        let bucket = &mut self.buckets[id];
        let bit = 1usize << bucket.level;
        let low_bits = slot_hash(bucket.entries[0].0) & (bit - 1);
        let sibling = bucket.split_off(bit);
        let stride = 1usize << sibling.level;
        let sibling = self.buckets.insert(sibling);

        // The bucket was referenced from every slot congruent to `low_bits`
        // modulo `bit`; those with `bit` set now belong to the sibling.
        for slot in ((low_bits | bit)..self.directory.len()).step_by(stride) {
            debug_assert_eq!(self.directory[slot], Some(id));
            self.directory[slot] = Some(sibling);
        }
        Ok(sibling)
    }

    /// Take one bucket out of the pool budget.
    ///
    /// Cannot fail right after a successful `grow`, which always adds a pool
    /// with room.
    fn claim_bucket(&mut self) -> Result<()> {
        let pool = self
            .pools
            .get_mut(self.free_pool)
            .ok_or(Error::Alloc(AllocTarget::Bucket))?;
        pool.issued += 1;
        if pool.issued >= pool.size {
            self.free_pool += 1;
        }
        Ok(())
    }

    /// Double the directory and reserve a bucket pool for the new slots.
    ///
    /// Leaves the table untouched on failure.
    fn grow(&mut self) -> Result<()> {
        let new_level = self.level + 1;
        if new_level >= self.config.max_level {
            log::warn!(
                "gint hash: maximum level {} exceeded",
                self.config.max_level
            );
            return Err(Error::CapacityExceeded {
                max_level: self.config.max_level,
            });
        }

        // The level 1 pool covers both initial slots; later pools match the
        // number of slots each doubling adds.
        let pool_size = if self.level == 0 {
            2
        } else {
            self.directory.len()
        };

        let added = (1usize << new_level) - self.directory.len();
        self.directory
            .try_reserve_exact(added)
            .map_err(|_| Error::Alloc(AllocTarget::Directory))?;
        self.pools
            .try_reserve(1)
            .map_err(|_| Error::Alloc(AllocTarget::BucketPool))?;
        // Arena capacity covers every pool, so issuing a bucket never allocates.
        let budget: usize = self.pools.iter().map(|p| p.size).sum::<usize>() + pool_size;
        self.buckets
            .try_reserve(budget - self.buckets.len())
            .map_err(|_| Error::Alloc(AllocTarget::BucketPool))?;

        if self.level == 0 {
            self.directory.extend([None, None]);
        } else {
            self.directory.extend_from_within(..);
        }
        self.pools.push(Pool {
            size: pool_size,
            issued: 0,
        });
        self.level = new_level;

        log::trace!(
            "gint hash grown to level {new_level}, {} slots, {} buckets in use",
            self.directory.len(),
            self.buckets.len()
        );
        Ok(())
    }

    /// Check the structural invariants, describing the first violation.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> core::result::Result<(), String> {
        if self.directory.len() != 1 << self.level {
            return Err(format!(
                "directory has {} slots at level {}",
                self.directory.len(),
                self.level
            ));
        }
        if self.buckets.len() > self.directory.len() {
            return Err(format!("{} buckets exceed slot count", self.buckets.len()));
        }

        let mut refs = std::collections::HashMap::new();
        for (slot, id) in self.directory.iter().enumerate() {
            let Some(id) = *id else { continue };
            let b = self
                .buckets
                .get(id)
                .ok_or_else(|| format!("slot {slot} holds a dead bucket id"))?;
            if b.fill > BUCKET_CAPACITY {
                return Err(format!("slot {slot}: fill {} over capacity", b.fill));
            }
            if b.level > self.level {
                return Err(format!("slot {slot}: local level {} above global", b.level));
            }
            let mask = (1usize << b.level) - 1;
            for other in ((slot & mask)..self.directory.len()).step_by(mask + 1) {
                if self.directory[other] != Some(id) {
                    return Err(format!("slot {slot}: bucket not reachable from slot {other}"));
                }
            }
            for &(k, _) in &b.entries[..b.fill] {
                if slot_hash(k) & mask != slot & mask {
                    return Err(format!("slot {slot}: key {k} placed in the wrong bucket"));
                }
            }
            *refs.entry(id).or_insert(0usize) += 1;
        }

        let mut stored = 0;
        for (id, b) in self.buckets.iter() {
            let expected = 1usize << (self.level - b.level);
            match refs.get(&id) {
                Some(&n) if n == expected => {}
                n => {
                    return Err(format!(
                        "bucket at level {} referenced {:?} times, expected {expected}",
                        b.level, n
                    ))
                }
            }
            stored += b.fill;
        }
        if stored != self.len {
            return Err(format!("len {} but {stored} pairs stored", self.len));
        }
        Ok(())
    }
}

impl core::fmt::Debug for GintHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GintHash")
            .field("level", &self.level)
            .field("buckets", &self.buckets.len())
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    /// Invariant: a fresh table sits at level 1 with two empty slots.
    #[test]
    fn fresh_table_is_level_one() {
        let t = GintHash::new().unwrap();
        assert_eq!(t.level(), 1);
        assert_eq!(t.bucket_count(), 0);
        assert!(t.is_empty());
        assert_eq!(t.get(0), None);
        assert_eq!(t.get(12345), None);
        assert_eq!(
            t.stats(),
            Stats {
                level: 1,
                directory_slots: 2,
                buckets: 0,
                entries: 0,
                max_fill: 0,
            }
        );
        t.check_invariants().unwrap();
    }

    /// Invariant: a configuration without a usable level fails creation.
    #[test]
    fn creation_fails_without_usable_level() {
        for max in [0, 1] {
            match GintHash::with_config(Config::new().max_level(max)) {
                Err(Error::CapacityExceeded { max_level }) => assert_eq!(max_level, max),
                other => panic!("unexpected result: {:?}", other),
            }
        }
        assert!(GintHash::with_config(Config::new().max_level(2)).is_ok());
        // An oversized ceiling is clamped, not rejected.
        let t = GintHash::with_config(Config::new().max_level(u32::MAX)).unwrap();
        assert_eq!(t.config().get_max_level(), usize::BITS - 1);
    }

    /// Invariant: found-with-zero is distinct from not found.
    #[test]
    fn zero_value_is_found() {
        let mut t = GintHash::new().unwrap();
        t.insert(77, 0).unwrap();
        assert_eq!(t.get(77), Some(0));
        assert!(t.contains_key(77));
        assert_eq!(t.get(78), None);
    }

    /// Invariant: duplicate keys are stored, not rejected; lookups stay stable.
    #[test]
    fn duplicate_keys_are_kept() {
        let mut t = GintHash::new().unwrap();
        t.insert(5, 1).unwrap();
        t.insert(5, 2).unwrap();
        assert_eq!(t.len(), 2);
        let first = t.get(5);
        assert!(first == Some(1) || first == Some(2));
        assert_eq!(t.get(5), first);
        t.check_invariants().unwrap();
    }

    /// Invariant: every inserted pair is retrievable after many splits, and
    /// the structure stays consistent after each insert.
    #[test]
    fn splits_preserve_pairs() {
        let mut t = GintHash::new().unwrap();
        for k in 0..500 {
            t.insert(k * 8, k).unwrap();
            t.check_invariants().unwrap();
        }
        for k in 0..500 {
            assert_eq!(t.get(k * 8), Some(k), "key {}", k * 8);
        }
        assert_eq!(t.get(4), None);
        assert!(t.level() > 1);
        assert!(t.stats().max_fill <= BUCKET_CAPACITY);
    }

    /// Invariant: more duplicates of one key than a bucket holds fail at once
    /// instead of growing the directory to the ceiling.
    #[test]
    fn excess_duplicates_fail_early() {
        let mut t = GintHash::new().unwrap();
        for v in 0..BUCKET_CAPACITY as Gint {
            t.insert(42, v).unwrap();
        }
        assert_eq!(
            t.insert(42, 99),
            Err(Error::CapacityExceeded {
                max_level: crate::config::DEFAULT_MAX_LEVEL
            })
        );
        assert_eq!(t.level(), 1);
        assert_eq!(t.len(), BUCKET_CAPACITY);
        assert_eq!(t.get(42), Some(0));
        t.insert(43, 1).unwrap();
        t.check_invariants().unwrap();
    }

    /// Invariant: negative keys and extreme values hash and store like any other.
    #[test]
    fn extreme_keys() {
        let mut t = GintHash::new().unwrap();
        let keys = [Gint::MIN, -1, 0, 1, Gint::MAX];
        for (i, &k) in keys.iter().enumerate() {
            t.insert(k, i as Gint).unwrap();
        }
        for (i, &k) in keys.iter().enumerate() {
            assert_eq!(t.get(k), Some(i as Gint));
        }
        t.check_invariants().unwrap();
    }

    /// Invariant: hitting the level ceiling reports CapacityExceeded, keeps
    /// earlier pairs, and does not store the rejected pair.
    #[test]
    fn level_ceiling_is_reported() {
        let mut t = GintHash::with_config(Config::new().max_level(6)).unwrap();
        let mut stored = Vec::new();
        let mut failed = None;
        for k in 0..10_000 {
            match t.insert(k * 8, k) {
                Ok(()) => stored.push(k),
                Err(e) => {
                    failed = Some((k, e));
                    break;
                }
            }
        }
        let (k, e) = failed.expect("ceiling must be reached");
        assert_eq!(e, Error::CapacityExceeded { max_level: 6 });
        assert_eq!(t.get(k * 8), None);
        assert!(t.level() < 6);
        assert_eq!(t.len(), stored.len());
        for &s in &stored {
            assert_eq!(t.get(s * 8), Some(s));
        }
        t.check_invariants().unwrap();
    }

    /// Invariant: pool accounting never issues more buckets than slots.
    #[test]
    fn pools_cover_bucket_demand() {
        let mut t = GintHash::new().unwrap();
        for k in 0..2_000 {
            t.insert(k, -k).unwrap();
        }
        let reserved: usize = t.pools.iter().map(|p| p.size).sum();
        assert_eq!(reserved, t.directory.len());
        assert!(t.bucket_count() <= reserved);
        let issued: usize = t.pools.iter().map(|p| p.issued).sum();
        assert_eq!(issued, t.bucket_count());
    }

    /// Invariant: a bucket can always be issued right after the directory
    /// grows, even when every earlier pool is used up.
    #[test]
    fn grow_leaves_a_free_pool() {
        let mut t = GintHash::new().unwrap();
        for _ in 0..5 {
            while t.claim_bucket().is_ok() {}
            assert_eq!(t.claim_bucket(), Err(Error::Alloc(AllocTarget::Bucket)));
            let slots = t.directory.len();
            t.grow().unwrap();
            assert_eq!(t.directory.len(), 2 * slots);
            assert!(t.claim_bucket().is_ok());
            assert!(t.buckets.capacity() >= t.directory.len());
        }
    }

    /// Invariant: bucket splitting keeps the insertion order on both sides.
    #[test]
    fn split_off_keeps_order() {
        let mut b = Bucket::new(1);
        for k in 0..4 {
            b.push(k, k * 10);
        }
        let bit = 1usize << b.level;
        let sib = b.split_off(bit);
        assert_eq!(b.level, 2);
        assert_eq!(sib.level, 2);
        assert_eq!(b.fill + sib.fill, 4);
        let stay: Vec<_> = b.entries[..b.fill].iter().map(|e| e.0).collect();
        let moved: Vec<_> = sib.entries[..sib.fill].iter().map(|e| e.0).collect();
        let mut expect_stay = Vec::new();
        let mut expect_moved = Vec::new();
        for k in 0..4 {
            if slot_hash(k) & bit != 0 {
                expect_moved.push(k);
            } else {
                expect_stay.push(k);
            }
        }
        assert_eq!(stay, expect_stay);
        assert_eq!(moved, expect_moved);
    }
}
