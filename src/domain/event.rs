//! Somatic events: the lineage markers carried by subclones.

use std::fmt::{self, Display};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::domain::GenomicLocation;

/// Default tolerance, in bases, within which two breakpoints are the same.
pub const BOUNDARY_RESOLUTION: u64 = 1000;

/// Shared, non-owning handle to an event. Identity is the allocation.
pub type EventRef = Rc<SomaticEvent>;

/// A contiguous segment on one chromosome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GenomicRange {
    pub chrom: i32,
    /// 0-based start position
    pub position: u64,
    pub length: u64,
}

impl GenomicRange {
    pub fn new(chrom: i32, position: u64, length: u64) -> Self {
        Self {
            chrom,
            position,
            length,
        }
    }

    pub fn start(&self) -> GenomicLocation {
        GenomicLocation::new(self.chrom, self.position)
    }

    pub fn end(&self) -> GenomicLocation {
        GenomicLocation::new(self.chrom, self.position.saturating_add(self.length))
    }

    /// Both breakpoints lie within `tolerance` bases of the other range's.
    pub fn is_near(&self, other: &GenomicRange, tolerance: u64) -> bool {
        self.start().is_near(&other.start(), tolerance) && self.end().is_near(&other.end(), tolerance)
    }
}

impl Display for GenomicRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chrom, self.position, self.end().position)
    }
}

/// Variant tag of a [`SomaticEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    CopyNumberVariant,
    LossOfHeterozygosity,
    SingleNucleotideVariant,
}

impl Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            EventKind::CopyNumberVariant => "cnv",
            EventKind::LossOfHeterozygosity => "loh",
            EventKind::SingleNucleotideVariant => "snv",
        };
        write!(f, "{}", tag)
    }
}

/// An acquired DNA alteration observed at some cell frequency.
#[derive(Debug, Clone, PartialEq)]
pub enum SomaticEvent {
    CopyNumberVariant { range: GenomicRange, frequency: f64 },
    LossOfHeterozygosity { range: GenomicRange, frequency: f64 },
    SingleNucleotideVariant { location: GenomicLocation, frequency: f64 },
}

impl SomaticEvent {
    pub fn cnv(range: GenomicRange, frequency: f64) -> Self {
        SomaticEvent::CopyNumberVariant { range, frequency }
    }

    pub fn loh(range: GenomicRange, frequency: f64) -> Self {
        SomaticEvent::LossOfHeterozygosity { range, frequency }
    }

    pub fn snv(location: GenomicLocation, frequency: f64) -> Self {
        SomaticEvent::SingleNucleotideVariant {
            location,
            frequency,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            SomaticEvent::CopyNumberVariant { .. } => EventKind::CopyNumberVariant,
            SomaticEvent::LossOfHeterozygosity { .. } => EventKind::LossOfHeterozygosity,
            SomaticEvent::SingleNucleotideVariant { .. } => EventKind::SingleNucleotideVariant,
        }
    }

    pub fn frequency(&self) -> f64 {
        match self {
            SomaticEvent::CopyNumberVariant { frequency, .. }
            | SomaticEvent::LossOfHeterozygosity { frequency, .. }
            | SomaticEvent::SingleNucleotideVariant { frequency, .. } => *frequency,
        }
    }

    /// Segment covered by the event; an SNV covers a single base.
    pub fn range(&self) -> GenomicRange {
        match self {
            SomaticEvent::CopyNumberVariant { range, .. }
            | SomaticEvent::LossOfHeterozygosity { range, .. } => *range,
            SomaticEvent::SingleNucleotideVariant { location, .. } => {
                GenomicRange::new(location.chrom, location.position, 1)
            }
        }
    }

    /// Tolerance-aware equality.
    ///
    /// Events of different variant tags are never equal. Segmental events
    /// compare both breakpoints, SNVs compare their single position; the
    /// frequency plays no part.
    pub fn is_equal_to(&self, other: &SomaticEvent, tolerance: u64) -> bool {
        match (self, other) {
            (
                SomaticEvent::CopyNumberVariant { range: a, .. },
                SomaticEvent::CopyNumberVariant { range: b, .. },
            )
            | (
                SomaticEvent::LossOfHeterozygosity { range: a, .. },
                SomaticEvent::LossOfHeterozygosity { range: b, .. },
            ) => a.is_near(b, tolerance),
            (
                SomaticEvent::SingleNucleotideVariant { location: a, .. },
                SomaticEvent::SingleNucleotideVariant { location: b, .. },
            ) => a.is_near(b, tolerance),
            _ => false,
        }
    }

    /// [`is_equal_to`](Self::is_equal_to) at [`BOUNDARY_RESOLUTION`].
    pub fn matches(&self, other: &SomaticEvent) -> bool {
        self.is_equal_to(other, BOUNDARY_RESOLUTION)
    }
}

impl Display for SomaticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SomaticEvent::SingleNucleotideVariant { location, .. } => {
                write!(f, "{} {}", self.kind(), location)
            }
            _ => write!(f, "{} {}", self.kind(), self.range()),
        }
    }
}
