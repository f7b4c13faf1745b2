//! Set operations over event sequences.
//!
//! The plain operations compare by reference identity (the same allocated
//! event), the `fuzzy_*` ones by [`SomaticEvent::is_equal_to`].

use std::cmp::Ordering;
use std::rc::Rc;

use crate::domain::{EventRef, SomaticEvent};

/// Events of `a` that are not in `b`, keeping the order of `a`.
pub fn difference(a: &[EventRef], b: &[EventRef]) -> Vec<EventRef> {
    a.iter()
        .filter(|event| !b.iter().any(|other| Rc::ptr_eq(event, other)))
        .cloned()
        .collect()
}

/// Every event of `b` also appears in `a`.
pub fn contains(a: &[EventRef], b: &[EventRef]) -> bool {
    b.iter().all(|event| a.iter().any(|other| Rc::ptr_eq(event, other)))
}

/// Orders event sequences by cardinality. Use with a stable sort.
pub fn size_ascending<T>(a: &[T], b: &[T]) -> Ordering {
    a.len().cmp(&b.len())
}

/// `a` holds an event equal, within `tolerance`, to each event of `b`.
pub fn fuzzy_contains(a: &[EventRef], b: &[EventRef], tolerance: u64) -> bool {
    b.iter().all(|event| contains_match(a, event, tolerance))
}

/// One set fuzzily contains the other.
pub fn fuzzy_comparable(a: &[EventRef], b: &[EventRef], tolerance: u64) -> bool {
    fuzzy_contains(a, b, tolerance) || fuzzy_contains(b, a, tolerance)
}

/// Each set fuzzily contains the other.
pub fn fuzzy_equivalent(a: &[EventRef], b: &[EventRef], tolerance: u64) -> bool {
    fuzzy_contains(a, b, tolerance) && fuzzy_contains(b, a, tolerance)
}

fn contains_match(set: &[EventRef], event: &SomaticEvent, tolerance: u64) -> bool {
    set.iter().any(|other| other.is_equal_to(event, tolerance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GenomicRange, BOUNDARY_RESOLUTION};

    fn cnv(chrom: i32, position: u64) -> EventRef {
        Rc::new(SomaticEvent::cnv(GenomicRange::new(chrom, position, 1_000), 0.5))
    }

    #[test]
    fn test_difference_ignores_lookalikes() {
        // Same coordinates, different allocation
        let a = cnv(1, 100);
        let twin = cnv(1, 100);

        let diff = difference(&[a.clone()], &[twin]);
        assert_eq!(diff.len(), 1);
        assert!(Rc::ptr_eq(&diff[0], &a));
    }

    #[test]
    fn test_fuzzy_contains_tolerates_shifted_breakpoints() {
        let a = cnv(1, 100_000);
        let shifted = cnv(1, 100_500);

        assert!(!contains(&[a.clone()], &[shifted.clone()]));
        assert!(fuzzy_contains(&[a.clone()], &[shifted.clone()], BOUNDARY_RESOLUTION));
        assert!(!fuzzy_contains(&[a], &[shifted], 0));
    }

    #[test]
    fn test_fuzzy_comparable_and_equivalent() {
        let a = cnv(1, 0);
        let b = cnv(2, 0);
        let c = cnv(3, 0);

        let ab = vec![a.clone(), b.clone()];
        let ac = vec![a.clone(), c];

        assert!(fuzzy_comparable(&ab, &[a.clone()], 0));
        assert!(fuzzy_comparable(&[], &ab, 0));
        assert!(!fuzzy_comparable(&ab, &ac, 0));
        assert!(fuzzy_equivalent(&ab, &[b, a], 0));
    }
}
