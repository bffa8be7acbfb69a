// Heap intrinsic operations implemented externally.
//
// A d-ary heap is a tree where every subtree's root ranks better than all the
// other nodes in the subtree, stored flat in an array. For `A = 4`,
//
// ```text
//                            0
//        1             2              3             4
//   5  6  7  8    9 10 11 12    13 14 15 16   17 18 19 20
// ```
//
// The last level will often be incomplete.
//
//   - Up:          `(i-1)//A`
//   - First child: `A*i + 1`
//   - Last child:  `A*(i+1)`

/// The parent node
///
/// ```
/// use gridpath::heap_primitives::index_parent;
/// assert_eq!(index_parent::<2>(1), 0);
/// assert_eq!(index_parent::<2>(2), 0);
/// assert_eq!(index_parent::<2>(25), 12);
/// assert_eq!(index_parent::<4>(4), 0);
/// assert_eq!(index_parent::<4>(5), 1);
/// assert_eq!(index_parent::<4>(20), 4);
/// ```
#[inline(always)]
#[must_use]
pub fn index_parent<const A: usize>(i: usize) -> usize {
    debug_assert!(i > 0, "The root has no parent");
    (i - 1) / A
}

/// The first (left-most) child
///
/// ```
/// use gridpath::heap_primitives::index_first_children;
/// assert_eq!(index_first_children::<2>(0), 1);
/// assert_eq!(index_first_children::<2>(11), 23);
/// assert_eq!(index_first_children::<4>(0), 1);
/// assert_eq!(index_first_children::<4>(1), 5);
/// ```
#[inline(always)]
#[must_use]
pub fn index_first_children<const A: usize>(i: usize) -> usize {
    (A * i) + 1
}

/// The last (right-most) child
///
/// ```
/// use gridpath::heap_primitives::index_last_children;
/// assert_eq!(index_last_children::<2>(0), 2);
/// assert_eq!(index_last_children::<2>(6), 14);
/// assert_eq!(index_last_children::<4>(1), 8);
/// ```
#[inline(always)]
#[must_use]
pub fn index_last_children<const A: usize>(i: usize) -> usize {
    A * (i + 1)
}

/// Finds the best child of `i` among the `len` first elements of `a`.
///
/// Ties go to the left-most child, which keeps sift-downs stable.
///
/// ```
/// use gridpath::heap_primitives::best_children;
/// let heap = [0, 5, 3, 3, 9];
/// assert_eq!(best_children::<4, _>(&heap, 0, heap.len()), Some(2));
/// assert_eq!(best_children::<4, _>(&heap, 1, heap.len()), None);
/// ```
#[inline(always)]
#[must_use]
pub fn best_children<const A: usize, T: PartialOrd>(a: &[T], i: usize, len: usize) -> Option<usize> {
    let first = index_first_children::<A>(i);
    if first >= len {
        return None;
    }
    let last = std::cmp::min(index_last_children::<A>(i), len - 1);

    let mut best = first;
    for child in (first + 1)..=last {
        if a[child] < a[best] {
            best = child;
        }
    }
    Some(best)
}
