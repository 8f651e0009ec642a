//! Restriction fragments ("segments") and their margins.
//!
//! A segment is the stretch of reference sequence between two adjacent
//! restriction cut sites (or between a cut site and the edge of the search
//! window). Capture probes are only ever placed near the ends of a segment,
//! within its two *margins*:
//!
//! ```text
//!  start                                                  end
//!    |<-- upstream margin -->|                |<-- downstream margin -->|
//!    [=======================-----------------=========================]
//! ```
//!
//! When a segment is no longer than twice the margin size, both margins cover
//! the entire segment and are one and the same interval.

use std::sync::OnceLock;

use crate::Position;
use crate::interval;
use crate::interval::Bounds as _;
use crate::interval::Interval;
use crate::provider::AlignabilityTrack;

pub mod bait;
pub mod factory;

pub use bait::Bait;
pub use bait::BaitParameters;
pub use factory::SegmentFactory;

/// The default margin size.
pub const DEFAULT_MARGIN_SIZE: usize = 250;

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to a [`Segment`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// The start position is zero or lies after the end position.
    InvalidInterval(Position, Position),

    /// The margin size is zero.
    ZeroMarginSize,

    /// The sequence does not have the length of the segment.
    SequenceLength {
        /// The length of the segment.
        expected: usize,
        /// The length of the provided sequence.
        found: usize,
    },

    /// Too few probes qualified within a margin.
    InsufficientBaits {
        /// The number of qualifying probes.
        found: usize,
        /// The minimum number of probes required.
        required: usize,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidInterval(start, end) => {
                write!(f, "invalid segment interval: [{start}, {end}]")
            }
            Error::ZeroMarginSize => write!(f, "margin size must be greater than zero"),
            Error::SequenceLength { expected, found } => write!(
                f,
                "segment sequence has {found} bases, but the segment spans {expected} bases"
            ),
            Error::InsufficientBaits { found, required } => write!(
                f,
                "insufficient baits: found {found} qualifying probes, but {required} are required"
            ),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////
// Sequence metrics
////////////////////////////////////////////////////////////////////////////////////////

/// Gets the fraction of G or C bases (case-insensitive) in a sequence.
pub(crate) fn gc_fraction(sequence: &str) -> f64 {
    if sequence.is_empty() {
        return 0.0;
    }

    let gc = sequence
        .bytes()
        .filter(|b| matches!(b, b'G' | b'C' | b'g' | b'c'))
        .count();

    gc as f64 / sequence.len() as f64
}

/// Gets the fraction of repeat-masked (lowercase) bases in a sequence.
pub(crate) fn repeat_fraction(sequence: &str) -> f64 {
    if sequence.is_empty() {
        return 0.0;
    }

    let lowercase = sequence.bytes().filter(u8::is_ascii_lowercase).count();
    lowercase as f64 / sequence.len() as f64
}

////////////////////////////////////////////////////////////////////////////////////////
// Margins
////////////////////////////////////////////////////////////////////////////////////////

/// An interval at one end of a segment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Margin(Interval);

impl Margin {
    /// Attempts to create a new [`Margin`] spanning `[start, end]`.
    pub fn try_new(contig: &str, start: Position, end: Position) -> interval::Result<Self> {
        interval::try_new(contig, start, end).map(Self)
    }

    /// Gets the 1-based start position.
    pub fn start(&self) -> Position {
        self.0.first()
    }

    /// Gets the 1-based, inclusive end position.
    pub fn end(&self) -> Position {
        self.0.last()
    }

    /// Gets the length.
    pub fn length(&self) -> usize {
        self.0.length()
    }

    /// Gets the interval.
    pub fn interval(&self) -> &Interval {
        &self.0
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Segments
////////////////////////////////////////////////////////////////////////////////////////

/// A restriction fragment.
#[derive(Clone, Debug)]
pub struct Segment {
    /// The interval spanned by the segment.
    interval: Interval,

    /// The margin size.
    margin_size: usize,

    /// The (mixed-case) sequence of the segment.
    sequence: String,

    /// Whether the segment is part of the viewpoint.
    selected: bool,

    /// Whether the segment may be selected.
    selectable: bool,

    /// Whether the segment is covered by the viewpoint without carrying
    /// baits.
    patched: bool,

    /// The baits placed within the upstream margin.
    baits_upstream: Vec<Bait>,

    /// The baits placed within the downstream margin.
    baits_downstream: Vec<Bait>,

    /// Whether enough baits were placed within the upstream margin.
    upstream_usable: bool,

    /// Whether enough baits were placed within the downstream margin.
    downstream_usable: bool,

    /// The cached GC content.
    gc_content: OnceLock<f64>,

    /// The cached repeat content.
    repeat_content: OnceLock<f64>,
}

impl Segment {
    /// Attempts to create a new [`Segment`].
    ///
    /// # Examples
    ///
    /// ```
    /// use viewpoints::segment::Segment;
    ///
    /// let segment = Segment::try_new("chr1", 11, 18, 2, "ACgtACGT")?;
    /// assert_eq!(segment.length(), 8);
    /// assert_eq!(segment.repeat_content(), 0.25);
    /// assert_eq!(segment.gc_content(), 0.5);
    ///
    /// assert!(Segment::try_new("chr1", 11, 18, 2, "ACGT").is_err());
    /// assert!(Segment::try_new("chr1", 11, 18, 0, "ACgtACGT").is_err());
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn try_new(
        contig: impl Into<String>,
        start: Position,
        end: Position,
        margin_size: usize,
        sequence: impl Into<String>,
    ) -> Result<Self> {
        let contig = contig.into();
        let interval = interval::try_new(&contig, start, end)
            .map_err(|_| Error::InvalidInterval(start, end))?;

        if margin_size == 0 {
            return Err(Error::ZeroMarginSize);
        }

        let sequence = sequence.into();
        let expected = interval.length();

        if sequence.len() != expected {
            return Err(Error::SequenceLength {
                expected,
                found: sequence.len(),
            });
        }

        Ok(Self {
            interval,
            margin_size,
            sequence,
            selected: false,
            selectable: true,
            patched: false,
            baits_upstream: Vec::new(),
            baits_downstream: Vec::new(),
            upstream_usable: false,
            downstream_usable: false,
            gc_content: OnceLock::new(),
            repeat_content: OnceLock::new(),
        })
    }

    /// Gets the contig.
    pub fn contig(&self) -> &str {
        self.interval.contig().as_str()
    }

    /// Gets the interval.
    pub fn interval(&self) -> &Interval {
        &self.interval
    }

    /// Gets the 1-based start position.
    pub fn start(&self) -> Position {
        self.interval.first()
    }

    /// Gets the 1-based, inclusive end position.
    pub fn end(&self) -> Position {
        self.interval.last()
    }

    /// Gets the length.
    pub fn length(&self) -> usize {
        self.interval.length()
    }

    /// Gets the midpoint.
    pub fn midpoint(&self) -> Position {
        self.start() + (self.end() - self.start()) / 2
    }

    /// Gets whether a position falls within the segment.
    pub fn contains(&self, position: Position) -> bool {
        self.start() <= position && position <= self.end()
    }

    /// Gets the margin size.
    pub fn margin_size(&self) -> usize {
        self.margin_size
    }

    /// Gets the sequence.
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    /// Gets whether the segment is selected.
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Gets whether the segment may be selected.
    pub fn is_selectable(&self) -> bool {
        self.selectable
    }

    /// Gets whether the segment is patched.
    pub fn is_patched(&self) -> bool {
        self.patched
    }

    /// Gets whether the segment is covered by its viewpoint (selected or
    /// patched).
    pub fn is_covered(&self) -> bool {
        self.selected || self.patched
    }

    pub(crate) fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub(crate) fn set_selectable(&mut self, selectable: bool) {
        self.selectable = selectable;
    }

    pub(crate) fn set_patched(&mut self, patched: bool) {
        self.patched = patched;
    }

    /// Resets the selection state and removes every bait.
    pub(crate) fn reset(&mut self) {
        self.selected = false;
        self.selectable = true;
        self.patched = false;
        self.clear_baits();
    }

    /// Removes every bait and marks both margins unusable.
    pub(crate) fn clear_baits(&mut self) {
        self.baits_upstream.clear();
        self.baits_downstream.clear();
        self.upstream_usable = false;
        self.downstream_usable = false;
    }

    /// Gets the fraction of G or C bases across the segment.
    pub fn gc_content(&self) -> f64 {
        *self.gc_content.get_or_init(|| gc_fraction(&self.sequence))
    }

    /// Gets the fraction of repeat-masked bases across the segment.
    pub fn repeat_content(&self) -> f64 {
        *self
            .repeat_content
            .get_or_init(|| repeat_fraction(&self.sequence))
    }

    /// Gets whether both margins cover the entire segment.
    pub fn has_single_margin(&self) -> bool {
        self.length() <= 2 * self.margin_size
    }

    /// Gets the upstream and downstream margins.
    ///
    /// # Examples
    ///
    /// ```
    /// use viewpoints::segment::Segment;
    ///
    /// let segment = Segment::try_new("chr1", 1, 10, 3, "ACGTACGTAC")?;
    /// let (up, down) = segment.margins();
    /// assert_eq!((up.start(), up.end()), (1, 3));
    /// assert_eq!((down.start(), down.end()), (8, 10));
    ///
    /// let segment = Segment::try_new("chr1", 1, 10, 5, "ACGTACGTAC")?;
    /// let (up, down) = segment.margins();
    /// assert_eq!(up, down);
    /// assert_eq!(up.interval(), segment.interval());
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn margins(&self) -> (Margin, Margin) {
        if self.has_single_margin() {
            let whole = Margin(self.interval.clone());
            return (whole.clone(), whole);
        }

        let (start, end) = (self.start(), self.end());

        // SAFETY: the margin size is non-zero and less than half of the
        // segment length, so both margins fall within the segment.
        let up = Margin::try_new(self.contig(), start, start + self.margin_size - 1).unwrap();
        let down = Margin::try_new(self.contig(), end + 1 - self.margin_size, end).unwrap();

        (up, down)
    }

    /// Gets the distinct margins (one when they coincide, otherwise two).
    pub fn distinct_margins(&self) -> Vec<Margin> {
        let (up, down) = self.margins();

        match up == down {
            true => vec![up],
            false => vec![up, down],
        }
    }

    /// Gets the sequence of a margin.
    fn margin_sequence(&self, margin: &Margin) -> &str {
        let offset = self.start();
        &self.sequence[margin.start() - offset..margin.end() - offset + 1]
    }

    /// Gets the repeat content of the upstream margin.
    pub fn repeat_content_margin_up(&self) -> f64 {
        if self.has_single_margin() {
            return self.repeat_content();
        }

        repeat_fraction(self.margin_sequence(&self.margins().0))
    }

    /// Gets the repeat content of the downstream margin.
    pub fn repeat_content_margin_down(&self) -> f64 {
        if self.has_single_margin() {
            return self.repeat_content();
        }

        repeat_fraction(self.margin_sequence(&self.margins().1))
    }

    /// Gets the GC content of the upstream margin.
    pub fn gc_content_margin_up(&self) -> f64 {
        if self.has_single_margin() {
            return self.gc_content();
        }

        gc_fraction(self.margin_sequence(&self.margins().0))
    }

    /// Gets the GC content of the downstream margin.
    pub fn gc_content_margin_down(&self) -> f64 {
        if self.has_single_margin() {
            return self.gc_content();
        }

        gc_fraction(self.margin_sequence(&self.margins().1))
    }

    /// Gets the baits placed within the upstream margin.
    pub fn baits_upstream(&self) -> &[Bait] {
        &self.baits_upstream
    }

    /// Gets the baits placed within the downstream margin.
    pub fn baits_downstream(&self) -> &[Bait] {
        &self.baits_downstream
    }

    /// Gets every placed bait, upstream first.
    pub fn baits(&self) -> impl Iterator<Item = &Bait> {
        self.baits_upstream.iter().chain(self.baits_downstream.iter())
    }

    /// Gets the total number of placed baits.
    pub fn bait_count(&self) -> usize {
        self.baits_upstream.len() + self.baits_downstream.len()
    }

    /// Gets the mean alignability of every placed bait, or [`f64::NAN`] if
    /// no bait has been placed.
    pub fn mean_alignability_of_baits(&self) -> f64 {
        match self.bait_count() {
            0 => f64::NAN,
            n => self.baits().map(Bait::alignability).sum::<f64>() / n as f64,
        }
    }

    /// Gets the mean alignability of the baits for display (`"n/a"` when no
    /// bait has been placed).
    pub fn alignability_as_string(&self) -> String {
        let alignability = self.mean_alignability_of_baits();

        match alignability.is_nan() {
            true => String::from("n/a"),
            false => format!("{alignability:.2}"),
        }
    }

    /// Gets whether enough baits were placed within the upstream margin.
    pub fn is_upstream_margin_usable(&self) -> bool {
        self.upstream_usable
    }

    /// Gets whether enough baits were placed within the downstream margin.
    pub fn is_downstream_margin_usable(&self) -> bool {
        self.downstream_usable
    }

    /// Gets whether every distinct margin is usable.
    pub fn has_usable_margins(&self) -> bool {
        match self.has_single_margin() {
            true => self.upstream_usable || self.downstream_usable,
            false => self.upstream_usable && self.downstream_usable,
        }
    }

    /// Gets the usable distinct margins.
    pub fn usable_margins(&self) -> Vec<Margin> {
        let (up, down) = self.margins();

        if self.has_single_margin() {
            return match self.has_usable_margins() {
                true => vec![up],
                false => Vec::new(),
            };
        }

        let mut margins = Vec::with_capacity(2);

        if self.upstream_usable {
            margins.push(up);
        }

        if self.downstream_usable {
            margins.push(down);
        }

        margins
    }

    /// Places the qualifying baits within the upstream margin, tiling forward
    /// from the start of the margin.
    ///
    /// Returns the number of placed baits. If fewer than the minimum number
    /// qualify, the margin is marked unusable, no bait is kept, and
    /// [`Error::InsufficientBaits`] is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use viewpoints::provider::alignability::Uniform;
    /// use viewpoints::segment::BaitParameters;
    /// use viewpoints::segment::Segment;
    ///
    /// let sequence = "ACGT".repeat(100);
    /// let mut segment = Segment::try_new("chr1", 1, 400, 100, sequence)?;
    /// let params = BaitParameters {
    ///     probe_length: 50,
    ///     ..Default::default()
    /// };
    ///
    /// assert_eq!(segment.set_usable_baits_for_upstream_margin(&params, &Uniform)?, 2);
    /// assert!(segment.is_upstream_margin_usable());
    /// assert_eq!(segment.baits_upstream()[1].start(), 51);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn set_usable_baits_for_upstream_margin(
        &mut self,
        params: &BaitParameters,
        track: &dyn AlignabilityTrack,
    ) -> Result<usize> {
        let margin = self.margins().0;
        let baits = bait::place(
            &self.sequence,
            self.start(),
            &margin,
            bait::Anchor::Start,
            params,
            track,
        );

        let (baits, usable, result) = evaluate(baits, params.min_bait_count);
        self.baits_upstream = baits;
        self.upstream_usable = usable;
        result
    }

    /// Places the qualifying baits within the downstream margin, tiling
    /// backward from the end of the margin.
    ///
    /// See [`Segment::set_usable_baits_for_upstream_margin`] for the
    /// semantics of the return value.
    pub fn set_usable_baits_for_downstream_margin(
        &mut self,
        params: &BaitParameters,
        track: &dyn AlignabilityTrack,
    ) -> Result<usize> {
        let margin = self.margins().1;
        let baits = bait::place(
            &self.sequence,
            self.start(),
            &margin,
            bait::Anchor::End,
            params,
            track,
        );

        let (baits, usable, result) = evaluate(baits, params.min_bait_count);
        self.baits_downstream = baits;
        self.downstream_usable = usable;
        result
    }

    /// Places baits within every margin and reports whether all margins are
    /// usable.
    ///
    /// For a segment with a single margin, the probes are placed only once.
    pub(crate) fn place_baits(
        &mut self,
        params: &BaitParameters,
        track: &dyn AlignabilityTrack,
    ) -> bool {
        self.clear_baits();

        if let Err(err) = self.set_usable_baits_for_upstream_margin(params, track) {
            tracing::trace!("{}: upstream margin: {err}", self.interval);
        }

        if !self.has_single_margin() {
            if let Err(err) = self.set_usable_baits_for_downstream_margin(params, track) {
                tracing::trace!("{}: downstream margin: {err}", self.interval);
            }
        }

        self.has_usable_margins()
    }
}

/// Checks a set of baits against the minimum count.
fn evaluate(baits: Vec<Bait>, required: usize) -> (Vec<Bait>, bool, Result<usize>) {
    let found = baits.len();

    match found >= required {
        true => (baits, true, Ok(found)),
        false => (
            Vec::new(),
            false,
            Err(Error::InsufficientBaits { found, required }),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::alignability::Uniform;

    #[test]
    fn test_margin_repeat_content() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let segment = Segment::try_new("chr1", 69, 92, 5, "gatcaaccggTGACATGANCATTT")?;

        assert_eq!(segment.length(), 24);
        assert_eq!(
            segment.margins(),
            (Margin::try_new("chr1", 69, 73)?, Margin::try_new("chr1", 88, 92)?)
        );
        assert_eq!(segment.repeat_content_margin_up(), 1.0);
        assert_eq!(segment.repeat_content_margin_down(), 0.0);

        Ok(())
    }

    #[test]
    fn test_single_margin_invariant() -> std::result::Result<(), Box<dyn std::error::Error>> {
        for margin_size in [12, 20, 100] {
            let segment =
                Segment::try_new("chr1", 69, 92, margin_size, "gatcaaccggTGACATGANCATTT")?;

            assert!(segment.has_single_margin());
            assert_eq!(segment.distinct_margins().len(), 1);
            assert_eq!(segment.repeat_content_margin_up(), segment.repeat_content());
            assert_eq!(segment.repeat_content_margin_down(), segment.repeat_content());
            assert_eq!(segment.gc_content_margin_up(), segment.gc_content());
        }

        Ok(())
    }

    #[test]
    fn test_repeat_content_round_trip() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let sequence = "acgtACGTacGTACgtACGTAcgtA";
        let lowercase = sequence.chars().filter(char::is_ascii_lowercase).count();

        let segment = Segment::try_new("chr1", 1, sequence.len(), 5, sequence)?;
        let expected = lowercase as f64 / sequence.len() as f64;

        assert!((segment.repeat_content() - expected).abs() < 1e-7);

        Ok(())
    }

    #[test]
    fn test_invalid_segments() {
        assert_eq!(
            Segment::try_new("chr1", 0, 3, 1, "ACGT").unwrap_err(),
            Error::InvalidInterval(0, 3)
        );
        assert_eq!(
            Segment::try_new("chr1", 5, 4, 1, "").unwrap_err(),
            Error::InvalidInterval(5, 4)
        );
        assert_eq!(
            Segment::try_new("chr1", 1, 4, 1, "ACG").unwrap_err(),
            Error::SequenceLength {
                expected: 4,
                found: 3
            }
        );
    }

    #[test]
    fn test_zero_margin_size() {
        let err = Segment::try_new("chr1", 1, 4, 0, "ACGT").unwrap_err();

        assert_eq!(err, Error::ZeroMarginSize);
        assert_eq!(err.to_string(), "margin size must be greater than zero");
    }

    #[test]
    fn test_insufficient_baits() -> std::result::Result<(), Box<dyn std::error::Error>> {
        // The upstream margin is pure AT, the downstream margin balanced.
        let sequence = "A".repeat(100) + &"GATC".repeat(25);
        let mut segment = Segment::try_new("chr1", 1, 200, 100, sequence)?;
        let params = BaitParameters {
            probe_length: 50,
            ..Default::default()
        };

        let err = segment
            .set_usable_baits_for_upstream_margin(&params, &Uniform)
            .unwrap_err();
        assert_eq!(
            err,
            Error::InsufficientBaits {
                found: 0,
                required: 2
            }
        );
        assert!(!segment.is_upstream_margin_usable());
        assert!(segment.baits_upstream().is_empty());

        assert_eq!(segment.set_usable_baits_for_downstream_margin(&params, &Uniform)?, 2);
        assert_eq!(segment.baits_downstream()[0].end(), 200);
        assert!(!segment.has_usable_margins());
        assert_eq!(segment.usable_margins(), vec![Margin::try_new("chr1", 101, 200)?]);

        Ok(())
    }

    #[test]
    fn test_alignability_without_baits() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut segment = Segment::try_new("chr1", 1, 8, 2, "ACGTACGT")?;

        assert!(segment.mean_alignability_of_baits().is_nan());
        assert_eq!(segment.alignability_as_string(), "n/a");

        let params = BaitParameters {
            probe_length: 2,
            min_bait_count: 1,
            min_gc: 0.0,
            max_gc: 1.0,
            ..Default::default()
        };

        assert!(segment.place_baits(&params, &Uniform));
        assert_eq!(segment.bait_count(), 2);
        assert_eq!(segment.alignability_as_string(), "1.00");

        Ok(())
    }
}
