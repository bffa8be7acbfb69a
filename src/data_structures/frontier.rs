use std::fmt::Debug;

use nonmax::NonMaxUsize;

use crate::float_cost::FloatCost;
use crate::heap_primitives::best_children;
use crate::heap_primitives::index_parent;

/// The ranking tuple shared by every engine.
///
/// Compared lexicographically. `primary` is the usual f-value (or `k1` for
/// incremental engines), `secondary` breaks ties towards lower g so we stay
/// close to the start, and `sequence` makes the remaining ties follow
/// insertion order so runs are deterministic.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rank {
    pub primary: FloatCost,
    pub secondary: FloatCost,
    pub sequence: i64,
}

impl Rank {
    #[inline(always)]
    pub fn new(primary: f64, secondary: f64, sequence: i64) -> Self {
        Self {
            primary: FloatCost::new(primary),
            secondary: FloatCost::new(secondary),
            sequence,
        }
    }

    /// Rank for `f = g + h`, tie-breaking on `g`.
    #[inline(always)]
    pub fn f(g: f64, h: f64, sequence: i64) -> Self {
        Self::new(g + h, g, sequence)
    }

    /// Rank of something that can never be popped.
    pub fn infinity() -> Self {
        Self {
            primary: FloatCost::infinity(),
            secondary: FloatCost::infinity(),
            sequence: i64::MAX,
        }
    }
}

const HEAP_ARITY: usize = 4usize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct FrontierEntry<K> {
    key: K,
    id: usize,
}

/// An indexed d-ary min-heap.
///
/// Entries are addressed by a dense integer id (a cell index, or an abstract
/// node), and `positions[id]` tracks where the entry sits in the heap. That
/// makes membership tests O(1) and decrease-key, increase-key and removal
/// O(log n), without the lazy-deletion duplicates a `BinaryHeap` needs.
///
/// ```pseudocode
/// for (i, e) in self.heap.enumerate():
///   assert_eq(self.positions[e.id], i)
/// ```
#[derive(Clone)]
pub struct Frontier<K = Rank> {
    heap: Vec<FrontierEntry<K>>,
    positions: Vec<Option<NonMaxUsize>>,
}

impl<K> Frontier<K>
where
    K: Copy + Ord + Debug,
{
    pub fn new() -> Self {
        Self {
            heap: vec![],
            positions: vec![],
        }
    }

    /// Pre-allocates room for ids in `0..ids`.
    pub fn with_capacity(ids: usize) -> Self {
        Self {
            heap: Vec::with_capacity(ids.min(4096)),
            positions: vec![None; ids],
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.heap.len()
    }
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    #[inline(always)]
    fn position(&self, id: usize) -> Option<usize> {
        self.positions.get(id).copied().flatten().map(|p| p.get())
    }

    #[inline(always)]
    pub fn contains(&self, id: usize) -> bool {
        self.position(id).is_some()
    }

    pub fn key_of(&self, id: usize) -> Option<K> {
        self.position(id).map(|p| self.heap[p].key)
    }

    pub fn peek(&self) -> Option<(usize, K)> {
        self.heap.first().map(|e| (e.id, e.key))
    }

    /// Inserts `id`, or moves it to its new key if it was already queued.
    ///
    /// Returns whether the id was newly inserted.
    pub fn push_or_update(&mut self, id: usize, key: K) -> bool {
        self.verify_heap();
        let inserted = match self.position(id) {
            Some(p) => {
                let old = self.heap[p].key;
                self.heap[p].key = key;
                if key < old {
                    self.sift_up(p);
                } else if key > old {
                    self.sift_down(p);
                }
                false
            }
            None => {
                if id >= self.positions.len() {
                    self.positions.resize(id + 1, None);
                }
                let p = self.heap.len();
                self.heap.push(FrontierEntry { key, id });
                self.set_position(p);
                self.sift_up(p);
                true
            }
        };
        self.verify_heap();
        inserted
    }

    pub fn pop(&mut self) -> Option<(usize, K)> {
        self.verify_heap();
        let top = self.remove_at(0)?;
        self.verify_heap();
        Some(top)
    }

    /// Drops `id` from the frontier, returning its key if it was queued.
    pub fn remove(&mut self, id: usize) -> Option<K> {
        let p = self.position(id)?;
        let (_, key) = self.remove_at(p)?;
        self.verify_heap();
        Some(key)
    }

    pub fn clear(&mut self) {
        for e in &self.heap {
            self.positions[e.id] = None;
        }
        self.heap.clear();
    }

    /// Recomputes every key and restores the heap in O(n).
    ///
    /// Needed when the heuristic changes under queued entries (moving goals,
    /// learned heuristics).
    pub fn rekey_all<F>(&mut self, mut f: F)
    where
        F: FnMut(usize, K) -> K,
    {
        for e in self.heap.iter_mut() {
            e.key = f(e.id, e.key);
        }
        for p in (0..self.heap.len() / HEAP_ARITY + 1).rev() {
            if p < self.heap.len() {
                self.sift_down(p);
            }
        }
        self.verify_heap();
    }

    /// Ids currently queued, in heap order.
    pub fn ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.heap.iter().map(|e| e.id)
    }

    // Implementation details

    fn remove_at(&mut self, p: usize) -> Option<(usize, K)> {
        let last = self.heap.len().checked_sub(1)?;
        self.heap.swap(p, last);
        let removed = self.heap.pop()?;
        self.positions[removed.id] = None;

        if p < self.heap.len() {
            self.set_position(p);
            // The moved entry may need to go either way.
            let p = self.sift_up(p);
            self.sift_down(p);
        }
        Some((removed.id, removed.key))
    }

    #[inline(always)]
    fn set_position(&mut self, p: usize) {
        let id = self.heap[p].id;
        self.positions[id] = NonMaxUsize::new(p);
    }

    #[inline(always)]
    fn swap(&mut self, l: usize, r: usize) {
        self.heap.swap(l, r);
        self.set_position(l);
        self.set_position(r);
    }

    /// Raises an entry. Returns its new position.
    fn sift_up(&mut self, mut p: usize) -> usize {
        while p > 0 {
            let parent = index_parent::<HEAP_ARITY>(p);
            if self.heap[parent] <= self.heap[p] {
                break;
            }
            self.swap(parent, p);
            p = parent;
        }
        p
    }

    /// Lowers an entry. Returns its new position.
    fn sift_down(&mut self, mut p: usize) -> usize {
        let len = self.heap.len();
        while let Some(child) = best_children::<HEAP_ARITY, _>(&self.heap, p, len) {
            if self.heap[p] <= self.heap[child] {
                break;
            }
            self.swap(p, child);
            p = child;
        }
        p
    }

    #[inline(always)]
    #[cfg(not(feature = "verify"))]
    pub(crate) fn verify_heap(&self) {
        // All good... (hopefully)
    }

    #[inline(always)]
    #[cfg(feature = "verify")]
    pub(crate) fn verify_heap(&self) {
        // Every entry,
        for (i, e) in self.heap.iter().enumerate() {
            // - Has its position tracked.
            assert_eq!(self.position(e.id), Some(i));

            // - Goes after its parent entry, if any.
            if i == 0 {
                continue;
            }
            let p = index_parent::<HEAP_ARITY>(i);
            assert!(
                self.heap[p] <= self.heap[i],
                "Entry[{p}]={:?} !<= child [{i}]={:?}. Out of heap of len={}",
                self.heap[p],
                self.heap[i],
                self.heap.len(),
            );
        }
        // - And nothing else is tracked.
        let tracked = self.positions.iter().filter(|p| p.is_some()).count();
        assert_eq!(tracked, self.heap.len());
    }
}

impl<K> Default for Frontier<K>
where
    K: Copy + Ord + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> std::fmt::Debug for Frontier<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Frontier{{({} entries)}}", self.heap.len())
    }
}
