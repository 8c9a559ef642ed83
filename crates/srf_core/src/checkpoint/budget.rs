//! Cache budget management for checkpoint placement.
//!
//! Lets a caller say "use at most X KB of working memory" and derive the
//! checkpoint/tile interval from that instead of passing `K` explicitly.

/// Smallest tile size a budget can produce.
pub const MIN_TILE_SIZE: usize = 2;

/// Working-memory budget for checkpoint and tile storage.
///
/// A budget of zero bytes means "unused": interval derivation falls back
/// to the explicitly configured interval.
///
/// # Example
///
/// ```rust
/// use srf_core::checkpoint::CacheBudget;
///
/// // 32 KB of 8-byte cells: floor(sqrt(32768 / 8)) = 64
/// let budget = CacheBudget::from_kb(32);
/// assert_eq!(budget.suggest_tile_size(8, 20), 64);
///
/// // Unused budget returns the fallback
/// assert_eq!(CacheBudget::unused().suggest_tile_size(8, 20), 20);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheBudget {
    /// Maximum working memory in bytes (0 = unused).
    max_bytes: usize,
}

impl CacheBudget {
    /// Creates a budget with the specified maximum in bytes.
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    /// Creates a budget from kilobytes.
    #[inline]
    pub fn from_kb(kb: usize) -> Self {
        Self::new(kb.saturating_mul(1024))
    }

    /// A budget that is not in use.
    #[inline]
    pub fn unused() -> Self {
        Self::new(0)
    }

    /// Returns the maximum memory in bytes.
    #[inline]
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Returns `true` if a budget was given.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.max_bytes > 0
    }

    /// Derives a tile/checkpoint interval from the budget.
    ///
    /// `B = floor(sqrt(budget_bytes / cell_size))`, clamped to at least
    /// [`MIN_TILE_SIZE`]. Returns `fallback` when the budget is unused.
    /// Non-decreasing in the budget for a fixed cell size.
    ///
    /// # Arguments
    ///
    /// * `cell_size` - Bytes per stored DP cell (treated as 1 if zero)
    /// * `fallback` - Interval to use when no budget is set
    pub fn suggest_tile_size(&self, cell_size: usize, fallback: usize) -> usize {
        if !self.is_active() {
            return fallback;
        }
        let cells = self.max_bytes / cell_size.max(1);
        integer_sqrt(cells).max(MIN_TILE_SIZE)
    }
}

/// Largest `r` with `r * r <= n`.
fn integer_sqrt(n: usize) -> usize {
    if n < 2 {
        return n;
    }
    let mut r = (n as f64).sqrt() as usize;
    while r.saturating_mul(r) > n {
        r -= 1;
    }
    while (r + 1).saturating_mul(r + 1) <= n {
        r += 1;
    }
    r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_kb() {
        assert_eq!(CacheBudget::from_kb(4).max_bytes(), 4096);
    }

    #[test]
    fn test_unused_returns_fallback() {
        let budget = CacheBudget::unused();
        assert!(!budget.is_active());
        assert_eq!(budget.suggest_tile_size(4, 17), 17);
    }

    #[test]
    fn test_tiny_budget_clamps_to_minimum() {
        let budget = CacheBudget::new(10);
        assert_eq!(budget.suggest_tile_size(8, 20), MIN_TILE_SIZE);
    }

    #[test]
    fn test_suggest_tile_size_values() {
        // 1 KB of 4-byte cells: 256 cells, sqrt = 16
        assert_eq!(CacheBudget::from_kb(1).suggest_tile_size(4, 0), 16);
        // 2 KB of 4-byte cells: 512 cells, floor(sqrt) = 22
        assert_eq!(CacheBudget::from_kb(2).suggest_tile_size(4, 0), 22);
    }

    #[test]
    fn test_integer_sqrt() {
        assert_eq!(integer_sqrt(0), 0);
        assert_eq!(integer_sqrt(1), 1);
        assert_eq!(integer_sqrt(15), 3);
        assert_eq!(integer_sqrt(16), 4);
        assert_eq!(integer_sqrt(17), 4);
    }
}
