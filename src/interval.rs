//! Genomic intervals.
//!
//! Positions are computed on as plain numbers, but every interval handed out
//! by the crate is an [`Interval`] in the 1-based, fully-closed coordinate
//! system of `omics`. Intervals always lie on the positive strand of the
//! reference.

use omics::coordinate::Coordinate;
use omics::coordinate::Strand;
use omics::coordinate::position::Number;
use omics::coordinate::position::base;
use omics::coordinate::system::Base;

pub use omics::coordinate::interval::base::Interval;
pub use omics::coordinate::interval::Error;

use crate::Position;

/// A [`Result`](std::result::Result) with an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Attempts to create a positive-strand interval spanning `[start, end]`.
///
/// # Examples
///
/// ```
/// use viewpoints::interval;
/// use viewpoints::interval::Bounds as _;
///
/// let interval = interval::try_new("chr1", 11, 20)?;
/// assert_eq!(interval.first(), 11);
/// assert_eq!(interval.last(), 20);
/// assert_eq!(interval.length(), 10);
///
/// assert!(interval::try_new("chr1", 0, 20).is_err());
/// assert!(interval::try_new("chr1", 21, 20).is_err());
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn try_new(contig: &str, start: Position, end: Position) -> Result<Interval> {
    let start = base::Position::try_new(start as Number).map_err(Error::Position)?;
    let end = base::Position::try_new(end as Number).map_err(Error::Position)?;

    Interval::try_new(
        Coordinate::<Base>::new(contig, Strand::Positive, start),
        Coordinate::<Base>::new(contig, Strand::Positive, end),
    )
}

/// Numeric access to the bounds of an [`Interval`].
pub trait Bounds {
    /// Gets the 1-based start position.
    fn first(&self) -> Position;

    /// Gets the 1-based, inclusive end position.
    fn last(&self) -> Position;

    /// Gets the number of bases.
    fn length(&self) -> usize;
}

impl Bounds for Interval {
    fn first(&self) -> Position {
        self.start().position().get() as Position
    }

    fn last(&self) -> Position {
        self.end().position().get() as Position
    }

    fn length(&self) -> usize {
        self.count_entities() as usize
    }
}
