//! HashTable: separate-chaining map over a power-of-two bucket array.
//!
//! Nodes live in a `SlotMap` arena; a bucket is the `DefaultKey` of its
//! chain head and every node links to the next node of the same bucket.
//! New keys are linked at the head of their chain. Each node caches the
//! spread hash of its key, so growing the bucket array relinks nodes
//! without calling `K: Hash` again.
//!
//! Growth is triggered only by inserting a new key: once `len` exceeds
//! `threshold = floor(bucket_count * load_factor)` the bucket count is
//! doubled until the threshold covers `len` again. Updating the value of
//! an existing key is not a structural change and never resizes.

use crate::error::ContainerError;
use crate::revision::{CursorState, FailFast, Revision};
use crate::sized::{ElementCount, SizedContainer};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, BuildHasherDefault, Hash};
use core::marker::PhantomData;
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::DefaultHasher;

pub const DEFAULT_BUCKET_COUNT: usize = 16;
pub const DEFAULT_LOAD_FACTOR: f64 = 0.75;

/// Fixed-key SipHash: traversal order is reproducible across runs.
pub type DefaultHashBuilder = BuildHasherDefault<DefaultHasher>;

/// Fold high bits into the low bits used by the bucket mask.
#[inline]
fn spread(hash: u64) -> u64 {
    let h = hash ^ (hash >> 32);
    h ^ (h >> 16)
}

#[inline]
fn threshold_for(bucket_count: usize, load_factor: f64) -> usize {
    (bucket_count as f64 * load_factor) as usize
}

fn vacant_buckets(n: usize) -> Box<[Option<DefaultKey>]> {
    vec![None; n].into_boxed_slice()
}

#[derive(Debug, Clone)]
struct Node<K, V> {
    hash: u64,
    key: K,
    value: V,
    next: Option<DefaultKey>,
}

/// Traversal position: the bucket being walked and the node to yield next.
#[derive(Copy, Clone, Debug)]
struct Position {
    bucket: usize,
    next: Option<DefaultKey>,
}

/// Nodes of one chain, head first.
struct Chain<'a, K, V> {
    nodes: &'a SlotMap<DefaultKey, Node<K, V>>,
    cur: Option<DefaultKey>,
}

impl<'a, K, V> Iterator for Chain<'a, K, V> {
    type Item = (DefaultKey, &'a Node<K, V>);
    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.cur?;
        let node = self.nodes.get(slot)?;
        self.cur = node.next;
        Some((slot, node))
    }
}

pub struct HashTable<K, V, S = DefaultHashBuilder> {
    hasher: S,
    buckets: Box<[Option<DefaultKey>]>,
    nodes: SlotMap<DefaultKey, Node<K, V>>,
    load_factor: f64,
    threshold: usize,
    count: ElementCount,
    revision: Revision,
}

impl<K, V> HashTable<K, V> {
    /// 16 buckets, load factor 0.75, default hasher.
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }

    /// `bucket_count` is rounded up to the next power of two.
    pub fn with_capacity(bucket_count: usize) -> Result<Self, ContainerError> {
        Self::with_capacity_load_factor_and_hasher(
            bucket_count,
            DEFAULT_LOAD_FACTOR,
            Default::default(),
        )
    }

    pub fn with_capacity_and_load_factor(
        bucket_count: usize,
        load_factor: f64,
    ) -> Result<Self, ContainerError> {
        Self::with_capacity_load_factor_and_hasher(bucket_count, load_factor, Default::default())
    }
}

impl<K, V, S> HashTable<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            buckets: vacant_buckets(DEFAULT_BUCKET_COUNT),
            nodes: SlotMap::with_key(),
            load_factor: DEFAULT_LOAD_FACTOR,
            threshold: threshold_for(DEFAULT_BUCKET_COUNT, DEFAULT_LOAD_FACTOR),
            count: ElementCount::new(),
            revision: Revision::new(),
        }
    }

    /// Validate and build. The bucket count must be positive and its power
    /// of two must fit in `usize`; the load factor must lie in `(0, 1]`.
    pub fn with_capacity_load_factor_and_hasher(
        bucket_count: usize,
        load_factor: f64,
        hasher: S,
    ) -> Result<Self, ContainerError> {
        if bucket_count == 0 {
            return Err(ContainerError::InvalidArgument("bucket count must be > 0"));
        }
        if !(load_factor > 0.0 && load_factor <= 1.0) {
            return Err(ContainerError::InvalidArgument(
                "load factor must be in (0, 1]",
            ));
        }
        let bucket_count = bucket_count
            .checked_next_power_of_two()
            .ok_or(ContainerError::InvalidArgument("bucket count too large"))?;
        Ok(Self {
            hasher,
            buckets: vacant_buckets(bucket_count),
            nodes: SlotMap::with_key(),
            load_factor,
            threshold: threshold_for(bucket_count, load_factor),
            count: ElementCount::new(),
            revision: Revision::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.count.get()
    }
    pub fn is_empty(&self) -> bool {
        self.count.get() == 0
    }
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
    pub fn load_factor(&self) -> f64 {
        self.load_factor
    }
    pub fn threshold(&self) -> usize {
        self.threshold
    }
    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    #[inline]
    fn bucket_index(&self, hash: u64) -> usize {
        (hash as usize) & (self.buckets.len() - 1)
    }

    fn chain(&self, bucket: usize) -> Chain<'_, K, V> {
        Chain {
            nodes: &self.nodes,
            cur: self.buckets[bucket],
        }
    }

    /// Drop every entry. The bucket array keeps its size.
    pub fn clear(&mut self) {
        let dropped = self.len();
        for head in self.buckets.iter_mut() {
            *head = None;
        }
        self.nodes.clear();
        self.count.reset();
        self.revision.bump();
        tracing::trace!(dropped, buckets = self.buckets.len(), "cleared hash table");
    }

    /// Linear scan over every chain; values are not indexed.
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.values().any(|v| v == value)
    }

    /// Double the bucket array until the threshold covers `len`, then relink
    /// every node using its cached hash.
    fn grow(&mut self) {
        let old_bucket_count = self.buckets.len();
        let mut new_bucket_count = old_bucket_count;
        while threshold_for(new_bucket_count, self.load_factor) < self.len() {
            match new_bucket_count.checked_mul(2) {
                Some(n) => new_bucket_count = n,
                None => break,
            }
        }
        if new_bucket_count == old_bucket_count {
            return;
        }

        let mask = new_bucket_count - 1;
        let mut buckets = vacant_buckets(new_bucket_count);
        let mut moved = 0usize;
        for head in self.buckets.iter() {
            let mut cur = *head;
            while let Some(slot) = cur {
                let Some(node) = self.nodes.get_mut(slot) else {
                    break;
                };
                cur = node.next;
                let index = (node.hash as usize) & mask;
                node.next = buckets[index];
                buckets[index] = Some(slot);
                moved += 1;
            }
        }
        self.buckets = buckets;
        self.threshold = threshold_for(new_bucket_count, self.load_factor);
        tracing::debug!(
            old_buckets = old_bucket_count,
            new_buckets = new_bucket_count,
            moved,
            threshold = self.threshold,
            "rehashed hash table"
        );
    }

    /// Unlink a node from its chain and free it.
    fn unlink(&mut self, slot: DefaultKey) -> Option<(K, V)> {
        let hash = self.nodes.get(slot)?.hash;
        let index = self.bucket_index(hash);
        let mut prev: Option<DefaultKey> = None;
        let mut cur = self.buckets[index];
        while let Some(c) = cur {
            let next = self.nodes.get(c)?.next;
            if c == slot {
                match prev {
                    None => self.buckets[index] = next,
                    Some(p) => {
                        if let Some(prev_node) = self.nodes.get_mut(p) {
                            prev_node.next = next;
                        }
                    }
                }
                let node = self.nodes.remove(slot)?;
                self.count.decrease();
                self.revision.bump();
                return Some((node.key, node.value));
            }
            prev = Some(c);
            cur = next;
        }
        None
    }

    /// Position of the first node in bucket `from` or later.
    fn seek(&self, from: usize) -> Position {
        for (bucket, head) in self.buckets.iter().enumerate().skip(from) {
            if head.is_some() {
                return Position { bucket, next: *head };
            }
        }
        Position {
            bucket: self.buckets.len(),
            next: None,
        }
    }

    fn advance(&self, pos: &mut Position) -> Option<(DefaultKey, &Node<K, V>)> {
        let slot = pos.next?;
        let node = self.nodes.get(slot)?;
        *pos = match node.next {
            Some(next) => Position {
                bucket: pos.bucket,
                next: Some(next),
            },
            None => self.seek(pos.bucket + 1),
        };
        Some((slot, node))
    }

    /// Entries in bucket order, chain order within a bucket.
    pub fn iter(&self) -> Iter<'_, K, V, S> {
        Iter {
            table: self,
            pos: self.seek(0),
            remaining: self.len(),
        }
    }

    pub fn keys(&self) -> Keys<'_, K, V, S> {
        Keys { inner: self.iter() }
    }

    pub fn values(&self) -> Values<'_, K, V, S> {
        Values { inner: self.iter() }
    }

    /// Mutable values in arena order.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            it: self.nodes.values_mut(),
        }
    }

    /// Fail-fast cursor over `(key, value)` pairs.
    pub fn entries_cursor(&self) -> TableCursor<K, V> {
        TableCursor {
            pos: self.seek(0),
            last: None,
            fail_fast: FailFast::new(&self.revision),
            _pd: PhantomData,
        }
    }

    pub fn keys_cursor(&self) -> KeyCursor<K, V> {
        KeyCursor {
            inner: self.entries_cursor(),
        }
    }

    pub fn values_cursor(&self) -> ValueCursor<K, V> {
        ValueCursor {
            inner: self.entries_cursor(),
        }
    }

    /// Length of every chain, indexed by bucket.
    #[cfg(feature = "bench_internal")]
    pub fn chain_lengths(&self) -> Vec<usize> {
        (0..self.buckets.len())
            .map(|b| self.chain(b).count())
            .collect()
    }
}

impl<K, V, S> HashTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        spread(self.hasher.hash_one(q))
    }

    fn locate<Q>(&self, hash: u64, q: &Q) -> Option<DefaultKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        self.chain(self.bucket_index(hash))
            .find(|(_, node)| node.hash == hash && node.key.borrow() == q)
            .map(|(slot, _)| slot)
    }

    /// Insert or update. Returns the previous value when `key` was present;
    /// only a new key bumps the revision and may grow the table.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.make_hash(&key);
        if let Some(slot) = self.locate(hash, &key) {
            if let Some(node) = self.nodes.get_mut(slot) {
                return Some(core::mem::replace(&mut node.value, value));
            }
        }

        let index = self.bucket_index(hash);
        let slot = self.nodes.insert(Node {
            hash,
            key,
            value,
            next: self.buckets[index],
        });
        self.buckets[index] = Some(slot);
        self.count.increase();
        self.revision.bump();
        if self.len() > self.threshold {
            self.grow();
        }
        None
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get_key_value(q).map(|(_, v)| v)
    }

    pub fn get_key_value<Q>(&self, q: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let slot = self.locate(self.make_hash(q), q)?;
        self.nodes.get(slot).map(|n| (&n.key, &n.value))
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let slot = self.locate(self.make_hash(q), q)?;
        self.nodes.get_mut(slot).map(|n| &mut n.value)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.locate(self.make_hash(q), q).is_some()
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.remove_entry(q).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let slot = self.locate(self.make_hash(q), q)?;
        self.unlink(slot)
    }
}

impl<K, V, S: Default> Default for HashTable<K, V, S> {
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> SizedContainer for HashTable<K, V, S> {
    fn len(&self) -> usize {
        HashTable::len(self)
    }
    fn clear(&mut self) {
        HashTable::clear(self)
    }
}

impl<K: Clone, V: Clone, S: Clone> Clone for HashTable<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            hasher: self.hasher.clone(),
            buckets: self.buckets.clone(),
            nodes: self.nodes.clone(),
            load_factor: self.load_factor,
            threshold: self.threshold,
            count: self.count,
            revision: Revision::new(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for HashTable<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: fmt::Display, V: fmt::Display, S> fmt::Display for HashTable<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        f.write_str("}")
    }
}

impl<K, V, S> Extend<(K, V)> for HashTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for HashTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::default();
        table.extend(iter);
        table
    }
}

impl<'a, K, V, S> IntoIterator for &'a HashTable<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, S>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Borrowing iterator over entries.
pub struct Iter<'a, K, V, S> {
    table: &'a HashTable<K, V, S>,
    pos: Position,
    remaining: usize,
}

impl<'a, K, V, S> Iterator for Iter<'a, K, V, S> {
    type Item = (&'a K, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let (_, node) = self.table.advance(&mut self.pos)?;
        self.remaining = self.remaining.saturating_sub(1);
        Some((&node.key, &node.value))
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, S> ExactSizeIterator for Iter<'_, K, V, S> {}

pub struct Keys<'a, K, V, S> {
    inner: Iter<'a, K, V, S>,
}

impl<'a, K, V, S> Iterator for Keys<'a, K, V, S> {
    type Item = &'a K;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

pub struct Values<'a, K, V, S> {
    inner: Iter<'a, K, V, S>,
}

impl<'a, K, V, S> Iterator for Values<'a, K, V, S> {
    type Item = &'a V;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

pub struct ValuesMut<'a, K, V> {
    it: slotmap::basic::ValuesMut<'a, DefaultKey, Node<K, V>>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|n| &mut n.value)
    }
}

/// Detached, fail-fast cursor over the entries of a `HashTable`.
///
/// Traversal order matches `HashTable::iter`. Inserting a new key,
/// removing a key or clearing the table other than through this cursor's
/// `remove` invalidates it; updating the value of an existing key does not.
pub struct TableCursor<K, V> {
    pos: Position,
    last: Option<DefaultKey>,
    fail_fast: FailFast,
    _pd: PhantomData<fn() -> (K, V)>,
}

impl<K, V> TableCursor<K, V> {
    pub fn state(&self) -> CursorState {
        self.fail_fast.state()
    }

    pub fn next<'a, S>(
        &mut self,
        table: &'a HashTable<K, V, S>,
    ) -> Result<Option<(&'a K, &'a V)>, ContainerError> {
        self.fail_fast.check(&table.revision)?;
        match table.advance(&mut self.pos) {
            Some((slot, node)) => {
                self.last = Some(slot);
                self.fail_fast.yielded();
                Ok(Some((&node.key, &node.value)))
            }
            None => {
                self.last = None;
                self.fail_fast.exhausted();
                Ok(None)
            }
        }
    }

    /// Remove the entry most recently yielded by `next` and return it.
    pub fn remove<S>(&mut self, table: &mut HashTable<K, V, S>) -> Result<(K, V), ContainerError> {
        self.fail_fast.check(&table.revision)?;
        let slot = self.last.take().ok_or(ContainerError::IllegalState)?;
        let entry = table.unlink(slot).ok_or(ContainerError::IllegalState)?;
        self.fail_fast.refresh(&table.revision);
        Ok(entry)
    }
}

impl<K, V> fmt::Debug for TableCursor<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableCursor")
            .field("bucket", &self.pos.bucket)
            .field("state", &self.fail_fast.state())
            .finish()
    }
}

/// Key projection of `TableCursor`.
#[derive(Debug)]
pub struct KeyCursor<K, V> {
    inner: TableCursor<K, V>,
}

impl<K, V> KeyCursor<K, V> {
    pub fn state(&self) -> CursorState {
        self.inner.state()
    }

    pub fn next<'a, S>(
        &mut self,
        table: &'a HashTable<K, V, S>,
    ) -> Result<Option<&'a K>, ContainerError> {
        Ok(self.inner.next(table)?.map(|(k, _)| k))
    }

    pub fn remove<S>(&mut self, table: &mut HashTable<K, V, S>) -> Result<(K, V), ContainerError> {
        self.inner.remove(table)
    }
}

/// Value projection of `TableCursor`.
#[derive(Debug)]
pub struct ValueCursor<K, V> {
    inner: TableCursor<K, V>,
}

impl<K, V> ValueCursor<K, V> {
    pub fn state(&self) -> CursorState {
        self.inner.state()
    }

    pub fn next<'a, S>(
        &mut self,
        table: &'a HashTable<K, V, S>,
    ) -> Result<Option<&'a V>, ContainerError> {
        Ok(self.inner.next(table)?.map(|(_, v)| v))
    }

    pub fn remove<S>(&mut self, table: &mut HashTable<K, V, S>) -> Result<(K, V), ContainerError> {
        self.inner.remove(table)
    }
}

#[cfg(test)]
impl<K, V, S> HashTable<K, V, S> {
    /// Structural invariants: power-of-two buckets, every node reachable
    /// exactly once from the bucket its cached hash selects, count parity,
    /// and a settled table never exceeds its threshold.
    pub(crate) fn check_invariants(&self) {
        let bucket_count = self.buckets.len();
        assert!(bucket_count.is_power_of_two());
        let mut reached = 0usize;
        for bucket in 0..bucket_count {
            for (_, node) in self.chain(bucket) {
                assert_eq!(self.bucket_index(node.hash), bucket);
                reached += 1;
            }
        }
        assert_eq!(reached, self.nodes.len());
        assert_eq!(reached, self.len());
        assert!(self.len() <= self.threshold);
        assert_eq!(self.threshold, threshold_for(bucket_count, self.load_factor));
    }

    pub(crate) fn revision_count(&self) -> u64 {
        self.revision.count()
    }
}
