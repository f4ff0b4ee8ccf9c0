//! Fenwick tree (binary indexed tree) over item extents.
//!
//! Each entry holds the extent of one item; prefix sums give item offsets.
//! The tree grows one item at a time in O(log n), so an append-only log never
//! needs a rebuild.
//!
//! | Operation | Time |
//! |-----------|------|
//! | `push` | O(log n) |
//! | `set` | O(log n) |
//! | `prefix` | O(log n) |
//! | `count_within` | O(log n) |
//! | `truncate` | O(1) amortised |
//!
//! Invariant: `tree[i]` (1-indexed) is the sum of `values[i - lowbit(i) .. i]`.
//! That range only reaches backwards, so dropping a suffix keeps the rest
//! valid.

#[derive(Debug, Clone, Default)]
pub struct FenwickTree {
    /// 1-indexed, `tree[0]` unused.
    tree: Vec<u64>,
    values: Vec<u32>,
}

impl FenwickTree {
    pub fn new() -> Self {
        Self {
            tree: vec![0],
            values: vec![],
        }
    }

    pub fn from_values(values: &[u32]) -> Self {
        let n = values.len();
        let mut tree = vec![0u64; n + 1];
        for (i, &v) in values.iter().enumerate() {
            tree[i + 1] = u64::from(v);
        }
        for i in 1..=n {
            let parent = i + lowbit(i);
            if parent <= n {
                tree[parent] += tree[i];
            }
        }
        Self {
            tree,
            values: values.to_vec(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<u32> {
        self.values.get(i).copied()
    }

    /// Appends one value.
    pub fn push(&mut self, value: u32) {
        if self.tree.is_empty() {
            self.tree.push(0);
        }
        let i = self.values.len() + 1;
        let stop = i - lowbit(i);
        let mut sum = u64::from(value);
        let mut j = i - 1;
        while j > stop {
            sum += self.tree[j];
            j -= lowbit(j);
        }
        self.tree.push(sum);
        self.values.push(value);
    }

    /// Keeps the first `n` values.
    pub fn truncate(&mut self, n: usize) {
        if n < self.values.len() {
            self.values.truncate(n);
            self.tree.truncate(n + 1);
        }
    }

    /// Replaces the value at `i`. Out of range indices are ignored.
    pub fn set(&mut self, i: usize, value: u32) {
        let Some(current) = self.values.get_mut(i) else {
            return;
        };
        let old = std::mem::replace(current, value);
        if old == value {
            return;
        }
        let n = self.values.len();
        let mut idx = i + 1;
        while idx <= n {
            self.tree[idx] = self.tree[idx] - u64::from(old) + u64::from(value);
            idx += lowbit(idx);
        }
    }

    /// Sum of the first `count` values.
    pub fn prefix(&self, count: usize) -> u64 {
        let mut sum = 0;
        let mut idx = count.min(self.values.len());
        while idx > 0 {
            sum += self.tree[idx];
            idx -= lowbit(idx);
        }
        sum
    }

    pub fn total(&self) -> u64 {
        self.prefix(self.values.len())
    }

    /// Largest `k` such that the sum of the first `k` values is `<= target`.
    pub fn count_within(&self, target: u64) -> usize {
        let n = self.values.len();
        let mut pos = 0;
        let mut remaining = target;
        let mut step = most_significant_bit(n);
        while step > 0 {
            let next = pos + step;
            if next <= n && self.tree[next] <= remaining {
                remaining -= self.tree[next];
                pos = next;
            }
            step >>= 1;
        }
        pos
    }
}

#[inline]
fn lowbit(x: usize) -> usize {
    x & x.wrapping_neg()
}

fn most_significant_bit(n: usize) -> usize {
    if n == 0 {
        0
    } else {
        1 << (usize::BITS - 1 - n.leading_zeros())
    }
}
