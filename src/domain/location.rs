use std::fmt::{self, Display};

/// A point on a (implied) reference genome.
///
/// Locations order by chromosome first, then by 0-based position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GenomicLocation {
    pub chrom: i32,
    pub position: u64,
}

impl GenomicLocation {
    pub fn new(chrom: i32, position: u64) -> Self {
        Self { chrom, position }
    }

    /// Same chromosome and positions at most `tolerance` bases apart.
    pub fn is_near(&self, other: &GenomicLocation, tolerance: u64) -> bool {
        self.chrom == other.chrom && self.position.abs_diff(other.position) <= tolerance
    }
}

impl Display for GenomicLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chrom, self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orders_by_chromosome_then_position() {
        let a = GenomicLocation::new(1, 5_000);
        let b = GenomicLocation::new(2, 10);
        let c = GenomicLocation::new(2, 20);

        assert!(a < b);
        assert!(b < c);
        assert!(c > a);
        assert!(!(b < b));
        assert!(!(b > b));
    }

    #[test]
    fn test_default_is_origin() {
        let loc = GenomicLocation::default();
        assert_eq!(loc.chrom, 0);
        assert_eq!(loc.position, 0);
    }

    #[test]
    fn test_is_near_respects_chromosome() {
        let a = GenomicLocation::new(1, 100);
        assert!(a.is_near(&GenomicLocation::new(1, 150), 50));
        assert!(!a.is_near(&GenomicLocation::new(1, 151), 50));
        assert!(!a.is_near(&GenomicLocation::new(3, 100), 50));
    }
}
