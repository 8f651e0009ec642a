//! Building the segments surrounding a genomic anchor.

use crate::Position;
use crate::enzyme;
use crate::enzyme::EnzymeSet;
use crate::provider::SequenceProvider;
use crate::provider::sequence;
use crate::segment;
use crate::segment::Segment;

/// The factor by which the requested distances are widened when deriving
/// segments, so that a viewpoint can later be zoomed out without rebuilding
/// them.
pub const ZOOM: usize = 3;

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to a [`SegmentFactory`].
#[derive(Debug)]
pub enum Error {
    /// The anchor does not fall on the contig (or the contig is empty or
    /// unknown).
    InvalidLocus {
        /// The contig.
        contig: String,
        /// The anchor position.
        position: Position,
        /// The length of the contig.
        length: usize,
    },

    /// The window sequence could not be read.
    Sequence(sequence::Error),

    /// A segment could not be created.
    Segment(segment::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidLocus {
                contig,
                position,
                length,
            } => write!(
                f,
                "invalid locus: position {position} does not fall on contig {contig} (length \
                 {length})"
            ),
            Error::Sequence(err) => write!(f, "sequence error: {err}"),
            Error::Segment(err) => write!(f, "segment error: {err}"),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////
// Segments
////////////////////////////////////////////////////////////////////////////////////////

/// The segments derived around an anchor.
#[derive(Clone, Debug)]
pub struct Segments {
    /// The contiguous, ordered segments.
    segments: Vec<Segment>,

    /// The 1-based start of the search window.
    window_start: Position,

    /// The 1-based, inclusive end of the search window.
    window_end: Position,

    /// Whether at least one cut site fell within the window.
    cut_sites_found: bool,
}

impl Segments {
    /// Gets the segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Consumes `self` to return the segments.
    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }

    /// Gets the 1-based start of the search window.
    pub fn window_start(&self) -> Position {
        self.window_start
    }

    /// Gets the 1-based, inclusive end of the search window.
    pub fn window_end(&self) -> Position {
        self.window_end
    }

    /// Gets whether at least one cut site fell within the window.
    pub fn cut_sites_found(&self) -> bool {
        self.cut_sites_found
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Factory
////////////////////////////////////////////////////////////////////////////////////////

/// Derives restriction fragments from a reference sequence.
#[derive(Clone, Copy)]
pub struct SegmentFactory<'a> {
    /// The reference sequence.
    sequence: &'a dyn SequenceProvider,

    /// The enzymes used in the digest.
    enzymes: &'a EnzymeSet,

    /// The margin size given to every segment.
    margin_size: usize,
}

impl std::fmt::Debug for SegmentFactory<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentFactory")
            .field("enzymes", &self.enzymes)
            .field("margin_size", &self.margin_size)
            .finish_non_exhaustive()
    }
}

impl<'a> SegmentFactory<'a> {
    /// Creates a new [`SegmentFactory`].
    pub fn new(
        sequence: &'a dyn SequenceProvider,
        enzymes: &'a EnzymeSet,
        margin_size: usize,
    ) -> Self {
        Self {
            sequence,
            enzymes,
            margin_size,
        }
    }

    /// Gets the enzymes.
    pub fn enzymes(&self) -> &EnzymeSet {
        self.enzymes
    }

    /// Gets the margin size.
    pub fn margin_size(&self) -> usize {
        self.margin_size
    }

    /// Builds the segments around `position`, looking up the length of the
    /// contig from the sequence provider.
    ///
    /// The distances are genomic: `max_distance_left` extends toward lower
    /// coordinates and `max_distance_right` toward higher coordinates.
    ///
    /// # Examples
    ///
    /// ```
    /// use viewpoints::enzyme;
    /// use viewpoints::provider::sequence::InMemory;
    /// use viewpoints::segment::SegmentFactory;
    ///
    /// let provider = InMemory::default().with_contig("chr1", "AAAAGATCAAAAGATCAAAA");
    /// let enzymes = enzyme::resolve(["DpnII"])?;
    /// let factory = SegmentFactory::new(&provider, &enzymes, 2);
    ///
    /// let segments = factory.build("chr1", 10, 100, 100)?;
    /// let bounds = segments
    ///     .segments()
    ///     .iter()
    ///     .map(|s| (s.start(), s.end()))
    ///     .collect::<Vec<_>>();
    ///
    /// assert_eq!(bounds, vec![(1, 4), (5, 12), (13, 20)]);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn build(
        &self,
        contig: &str,
        position: Position,
        max_distance_left: usize,
        max_distance_right: usize,
    ) -> Result<Segments> {
        let length = self.sequence.contig_length(contig).unwrap_or(0);
        self.build_with_length(contig, position, max_distance_left, max_distance_right, length)
    }

    /// Builds the segments around `position` on a contig of the given
    /// length.
    ///
    /// The search window spans [`ZOOM`] times the requested distances on
    /// either side of the anchor and is clipped to the contig. Cut sites
    /// strictly after the first base of the window split it into contiguous
    /// segments. When no cut site falls within the window, a single segment
    /// spans it.
    pub fn build_with_length(
        &self,
        contig: &str,
        position: Position,
        max_distance_left: usize,
        max_distance_right: usize,
        length: usize,
    ) -> Result<Segments> {
        if length == 0 || position == 0 || position > length {
            return Err(Error::InvalidLocus {
                contig: contig.to_string(),
                position,
                length,
            });
        }

        let window_start = position
            .saturating_sub(max_distance_left.saturating_mul(ZOOM))
            .max(1);
        let window_end = position
            .saturating_add(max_distance_right.saturating_mul(ZOOM))
            .min(length);

        let window = self
            .sequence
            .subsequence(contig, window_start, window_end)
            .map_err(Error::Sequence)?;

        let boundaries = enzyme::find_cut_sites(&window, self.enzymes, window_start)
            .into_iter()
            .filter(|site| *site > window_start && *site <= window_end)
            .collect::<Vec<_>>();

        let cut_sites_found = !boundaries.is_empty();

        let starts = std::iter::once(window_start).chain(boundaries.iter().copied());
        let ends = boundaries
            .iter()
            .map(|site| site - 1)
            .chain(std::iter::once(window_end));

        let segments = starts
            .zip(ends)
            .map(|(start, end)| {
                let sequence = &window[start - window_start..end - window_start + 1];
                Segment::try_new(contig, start, end, self.margin_size, sequence)
            })
            .collect::<segment::Result<Vec<_>>>()
            .map_err(Error::Segment)?;

        Ok(Segments {
            segments,
            window_start,
            window_end,
            cut_sites_found,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::sequence::InMemory;

    /// Builds a contig of the given length with `GATC` at each 1-based
    /// position.
    fn contig_with_gatc_at(positions: &[usize], length: usize) -> String {
        let mut bases = vec![b'A'; length];

        for position in positions {
            bases[position - 1..position + 3].copy_from_slice(b"GATC");
        }

        String::from_utf8(bases).unwrap()
    }

    #[test]
    fn test_segments_are_adjacent_and_contained(
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let length = 2_000;
        let provider = InMemory::default().with_contig(
            "chr1",
            contig_with_gatc_at(&[100, 350, 351, 700, 1_200, 1_900], length),
        );
        let enzymes = enzyme::resolve(["DpnII"])?;
        let factory = SegmentFactory::new(&provider, &enzymes, 50);

        let segments = factory.build("chr1", 800, 1_000, 1_000)?;
        let segments = segments.segments();

        assert!(segments.len() > 1);
        assert_eq!(segments.first().unwrap().start(), 1);
        assert_eq!(segments.last().unwrap().end(), length);

        for segment in segments {
            assert!(1 <= segment.start());
            assert!(segment.start() <= segment.end());
            assert!(segment.end() <= length);
        }

        for pair in segments.windows(2) {
            assert_eq!(pair[0].end() + 1, pair[1].start());
        }

        Ok(())
    }

    #[test]
    fn test_edge_clipping() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let provider =
            InMemory::default().with_contig("chr1", contig_with_gatc_at(&[40, 400], 1_000));
        let enzymes = enzyme::resolve(["DpnII"])?;
        let factory = SegmentFactory::new(&provider, &enzymes, 10);

        // The upstream distance exceeds the anchor, so the window clamps at 1.
        let segments = factory.build("chr1", 50, 100, 10)?;

        assert_eq!(segments.window_start(), 1);
        assert_eq!(segments.window_end(), 80);
        assert_eq!(segments.segments()[0].start(), 1);
        assert_eq!(segments.segments().last().unwrap().end(), 80);

        let segments = factory.build("chr1", 990, 10, 100)?;
        assert_eq!(segments.window_start(), 960);
        assert_eq!(segments.window_end(), 1_000);

        Ok(())
    }

    #[test]
    fn test_no_cut_sites() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let provider = InMemory::default().with_contig("chr1", "A".repeat(500));
        let enzymes = enzyme::resolve(["HindIII"])?;
        let factory = SegmentFactory::new(&provider, &enzymes, 10);

        let segments = factory.build("chr1", 250, 20, 20)?;

        assert!(!segments.cut_sites_found());
        assert_eq!(segments.segments().len(), 1);
        assert_eq!(segments.segments()[0].start(), 190);
        assert_eq!(segments.segments()[0].end(), 310);

        Ok(())
    }

    #[test]
    fn test_zero_margin_size() {
        let provider = InMemory::default().with_contig("chr1", contig_with_gatc_at(&[100], 500));
        let enzymes = enzyme::resolve(["DpnII"]).unwrap();
        let factory = SegmentFactory::new(&provider, &enzymes, 0);

        assert!(matches!(
            factory.build("chr1", 250, 50, 50),
            Err(Error::Segment(segment::Error::ZeroMarginSize))
        ));
    }

    #[test]
    fn test_invalid_locus() {
        let provider = InMemory::default().with_contig("chr1", "ACGT");
        let enzymes = enzyme::resolve(["DpnII"]).unwrap();
        let factory = SegmentFactory::new(&provider, &enzymes, 10);

        let err = factory.build("chr1", 5, 1, 1).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid locus: position 5 does not fall on contig chr1 (length 4)"
        );

        assert!(matches!(
            factory.build("chr1", 0, 1, 1),
            Err(Error::InvalidLocus { .. })
        ));
        assert!(matches!(
            factory.build("chrUn", 1, 1, 1),
            Err(Error::InvalidLocus { length: 0, .. })
        ));
        assert!(matches!(
            factory.build_with_length("chr1", 1, 1, 1, 0),
            Err(Error::InvalidLocus { .. })
        ));
    }
}
