//! Viewpoints: the captured region around a transcription start site.
//!
//! A [`ViewPoint`] owns the restriction segments derived around a
//! transcription start site and records which of them are selected for
//! capture. Selection follows one of two strategies (see
//! [`SelectionStrategy`]) and can be revised afterwards by toggling
//! individual segments.
//!
//! A viewpoint moves through the following states:
//!
//! ```text
//! Uninitialized -> SegmentsBuilt -> SelectionApplied <-> UserRevised
//! ```

use omics::coordinate::Strand;
use serde::Deserialize;
use serde::Serialize;

use crate::Position;
use crate::interval;
use crate::interval::Interval;
use crate::provider::AlignabilityTrack;
use crate::provider::transcript::TranscriptionStartSite;
use crate::segment::BaitParameters;
use crate::segment::Segment;
use crate::segment::factory;
use crate::segment::factory::SegmentFactory;

pub mod builder;
pub mod extended;
pub mod simple;

pub use builder::Builder;

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to a [`ViewPoint`].
#[derive(Debug)]
pub enum Error {
    /// A required field was never provided to the [`Builder`].
    Missing(builder::MissingError),

    /// A singular field was provided to the [`Builder`] more than once.
    Multiple(builder::MultipleError),

    /// The segments could not be derived.
    Factory(factory::Error),

    /// No cut site fell within the search window and the single resulting
    /// segment is too short to be selected.
    NoCutSiteFound {
        /// The contig.
        contig: String,
        /// The anchor position.
        position: Position,
    },

    /// A segment index does not exist.
    SegmentOutOfRange(usize),

    /// A segment that may not be selected was toggled on.
    SegmentNotSelectable(usize),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Missing(err) => write!(f, "missing required field: {err}"),
            Error::Multiple(err) => write!(f, "singular field set multiple times: {err}"),
            Error::Factory(err) => write!(f, "{err}"),
            Error::NoCutSiteFound { contig, position } => write!(
                f,
                "no cut site found around {contig}:{position} and the enclosing segment is too \
                 short"
            ),
            Error::SegmentOutOfRange(index) => write!(f, "no segment at index {index}"),
            Error::SegmentNotSelectable(index) => {
                write!(f, "segment at index {index} is not selectable")
            }
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////
// Strategies
////////////////////////////////////////////////////////////////////////////////////////

/// The approach used to derive a viewpoint.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Approach {
    /// A fixed number of segments around the anchor.
    Simple,

    /// Distance-weighted segments filling a requested size.
    Extended,
}

impl std::fmt::Display for Approach {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Approach::Simple => write!(f, "simple"),
            Approach::Extended => write!(f, "extended"),
        }
    }
}

/// A selection strategy together with its parameters.
///
/// # Examples
///
/// ```
/// use viewpoints::viewpoint::Approach;
/// use viewpoints::viewpoint::SelectionStrategy;
///
/// let strategy = serde_json::from_str::<SelectionStrategy>(
///     r#"{ "approach": "extended", "size_up": 2000 }"#,
/// )?;
///
/// assert_eq!(strategy.approach(), Approach::Extended);
/// assert_eq!(strategy.distances(), (2000, 5000));
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "approach", rename_all = "lowercase")]
pub enum SelectionStrategy {
    /// The simple strategy.
    Simple(simple::Parameters),

    /// The extended strategy.
    Extended(extended::Parameters),
}

impl Default for SelectionStrategy {
    fn default() -> Self {
        SelectionStrategy::Simple(simple::Parameters::default())
    }
}

impl SelectionStrategy {
    /// Gets the approach.
    pub fn approach(&self) -> Approach {
        match self {
            SelectionStrategy::Simple(_) => Approach::Simple,
            SelectionStrategy::Extended(_) => Approach::Extended,
        }
    }

    /// Gets the minimum length of a selected segment.
    pub fn min_frag_size(&self) -> usize {
        match self {
            SelectionStrategy::Simple(params) => params.min_frag_size,
            SelectionStrategy::Extended(params) => params.min_frag_size,
        }
    }

    /// Gets the maximum repeat content of a selected segment.
    pub fn max_repeat_content(&self) -> f64 {
        match self {
            SelectionStrategy::Simple(params) => params.max_repeat_content,
            SelectionStrategy::Extended(params) => params.max_repeat_content,
        }
    }

    /// Gets the upstream and downstream distances that the viewpoint spans
    /// (before zooming).
    pub fn distances(&self) -> (usize, usize) {
        match self {
            SelectionStrategy::Simple(params) => (params.max_distance_up, params.max_distance_down),
            SelectionStrategy::Extended(params) => (params.size_up, params.size_down),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Orientation
////////////////////////////////////////////////////////////////////////////////////////

/// A side of the anchor, relative to the direction of transcription.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Side {
    /// Against the direction of transcription.
    Upstream,

    /// In the direction of transcription.
    Downstream,
}

/// Converts upstream and downstream distances into distances toward lower
/// and higher genomic coordinates, as `(left, right)`.
pub(crate) fn genomic_distances(strand: &Strand, up: usize, down: usize) -> (usize, usize) {
    match strand {
        Strand::Positive => (up, down),
        Strand::Negative => (down, up),
    }
}

/// Gets the indices of the segments on one side of the anchor, ordered from
/// the anchor outward.
pub(crate) fn outward(
    anchor: usize,
    len: usize,
    strand: &Strand,
    side: Side,
) -> impl Iterator<Item = usize> {
    let toward_lower = matches!(
        (strand, side),
        (Strand::Positive, Side::Upstream) | (Strand::Negative, Side::Downstream)
    );

    let indices = match toward_lower {
        true => (0..anchor).rev().collect::<Vec<_>>(),
        false => (anchor + 1..len).collect::<Vec<_>>(),
    };

    indices.into_iter()
}

////////////////////////////////////////////////////////////////////////////////////////
// Viewpoints
////////////////////////////////////////////////////////////////////////////////////////

/// The state of a [`ViewPoint`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum State {
    /// No segment has been derived.
    Uninitialized,

    /// Segments have been derived, but none is selected yet.
    SegmentsBuilt,

    /// The selection strategy has been applied.
    SelectionApplied,

    /// The selection has been revised by hand.
    UserRevised,
}

/// The captured region around a transcription start site.
#[derive(Clone, Debug)]
pub struct ViewPoint {
    /// The contig.
    contig: String,

    /// The anchor (transcription start site).
    genomic_position: Position,

    /// The strand of the transcript.
    strand: Strand,

    /// The name of the target gene.
    target_name: String,

    /// The accession of the transcript.
    accession: String,

    /// The selection strategy.
    strategy: SelectionStrategy,

    /// The bait placement parameters.
    bait: BaitParameters,

    /// The ordered, contiguous segments.
    segments: Vec<Segment>,

    /// The index of the segment containing the anchor.
    anchor: usize,

    /// The score of the selection.
    score: f64,

    /// The start of the extent of the viewpoint.
    start: Position,

    /// The end of the extent of the viewpoint.
    end: Position,

    /// The start of the displayed window.
    display_start: Position,

    /// The end of the displayed window.
    display_end: Position,

    /// The start of the window from which segments were derived.
    window_start: Position,

    /// The end of the window from which segments were derived.
    window_end: Position,

    /// The number of this viewpoint among the promoters of the gene.
    promoter_number: usize,

    /// The number of promoters of the gene.
    total_promoter_count: usize,

    /// Whether any cut site fell within the window.
    cut_sites_found: bool,

    /// The state.
    state: State,
}

impl ViewPoint {
    /// Gets the contig.
    pub fn contig(&self) -> &str {
        &self.contig
    }

    /// Gets the anchor position.
    pub fn genomic_position(&self) -> Position {
        self.genomic_position
    }

    /// Gets the strand.
    pub fn strand(&self) -> &Strand {
        &self.strand
    }

    /// Gets the name of the target gene.
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Gets the transcript accession.
    pub fn accession(&self) -> &str {
        &self.accession
    }

    /// Gets the approach.
    pub fn approach(&self) -> Approach {
        self.strategy.approach()
    }

    /// Gets the selection strategy.
    pub fn strategy(&self) -> &SelectionStrategy {
        &self.strategy
    }

    /// Gets the bait placement parameters.
    pub fn bait_parameters(&self) -> &BaitParameters {
        &self.bait
    }

    /// Gets every segment.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Gets the selected segments.
    pub fn active_segments(&self) -> Vec<&Segment> {
        self.segments.iter().filter(|s| s.is_selected()).collect()
    }

    /// Gets whether no segment is selected.
    pub fn has_no_active_segment(&self) -> bool {
        !self.segments.iter().any(Segment::is_selected)
    }

    /// Gets whether at least one segment is selected.
    pub fn is_resolved(&self) -> bool {
        !self.has_no_active_segment()
    }

    /// Gets the score.
    pub fn score(&self) -> f64 {
        self.score
    }

    /// Gets the start of the extent.
    pub fn start(&self) -> Position {
        self.start
    }

    /// Gets the end of the extent.
    pub fn end(&self) -> Position {
        self.end
    }

    /// Gets the length of the extent.
    pub fn length(&self) -> usize {
        self.end - self.start + 1
    }

    /// Gets the extent as an interval.
    pub fn interval(&self) -> Interval {
        // SAFETY: a built viewpoint always spans at least one segment, so its
        // extent is a valid, 1-based interval.
        interval::try_new(&self.contig, self.start, self.end).unwrap()
    }

    /// Gets the start of the displayed window.
    pub fn display_start(&self) -> Position {
        self.display_start
    }

    /// Gets the end of the displayed window.
    pub fn display_end(&self) -> Position {
        self.display_end
    }

    /// Gets the start of the window from which segments were derived.
    pub fn window_start(&self) -> Position {
        self.window_start
    }

    /// Gets the end of the window from which segments were derived.
    pub fn window_end(&self) -> Position {
        self.window_end
    }

    /// Gets the number of this viewpoint among the promoters of the gene.
    pub fn promoter_number(&self) -> usize {
        self.promoter_number
    }

    /// Gets the number of promoters of the gene.
    pub fn total_promoter_count(&self) -> usize {
        self.total_promoter_count
    }

    /// Gets whether any cut site fell within the window.
    pub fn cut_sites_found(&self) -> bool {
        self.cut_sites_found
    }

    /// Gets the state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Gets the score as a percentage with two decimals.
    ///
    /// # Examples
    ///
    /// ```
    /// use omics::coordinate::Strand;
    /// use viewpoints::enzyme;
    /// use viewpoints::provider::alignability::Uniform;
    /// use viewpoints::provider::sequence::InMemory;
    /// use viewpoints::segment::SegmentFactory;
    /// use viewpoints::viewpoint::Builder;
    ///
    /// let provider = InMemory::default().with_contig("chr1", "A".repeat(1000));
    /// let enzymes = enzyme::resolve(["DpnII"])?;
    /// let factory = SegmentFactory::new(&provider, &enzymes, 250);
    ///
    /// let viewpoint = Builder::default()
    ///     .contig("chr1")?
    ///     .genomic_position(500)?
    ///     .strand(Strand::Positive)?
    ///     .target_name("GENE")?
    ///     .try_build(&factory, &Uniform)?;
    ///
    /// // A poly-A sequence cannot carry baits.
    /// assert_eq!(viewpoint.score_as_percent_string(), "0.00%");
    /// assert_eq!(viewpoint.genomic_location_string(), "chr1:1-1000");
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn score_as_percent_string(&self) -> String {
        format!("{:.2}%", self.score * 100.0)
    }

    /// Gets the extent as `contig:start-end`.
    pub fn genomic_location_string(&self) -> String {
        format!("{}:{}-{}", self.contig, self.start, self.end)
    }

    /// Sets the displayed window to `factor` times the requested distances
    /// around the anchor, within the window from which segments were derived.
    ///
    /// Segments are never rederived, so zooming beyond the derivation window
    /// is clamped to it.
    pub fn zoom(&mut self, factor: f64) {
        let (up, down) = self.strategy.distances();
        let (left, right) = genomic_distances(&self.strand, up, down);
        let factor = factor.max(0.0);

        let left = (left as f64 * factor).round() as usize;
        let right = (right as f64 * factor).round() as usize;

        self.display_start = self
            .genomic_position
            .saturating_sub(left)
            .max(self.window_start);
        self.display_end = self
            .genomic_position
            .saturating_add(right)
            .min(self.window_end);
    }

    /// Applies the selection strategy, discarding any manual revision.
    pub fn apply_selection(&mut self, track: &dyn AlignabilityTrack) {
        match &self.strategy {
            SelectionStrategy::Simple(params) => simple::apply(
                &mut self.segments,
                self.anchor,
                self.genomic_position,
                &self.strand,
                params,
                &self.bait,
                track,
            ),
            SelectionStrategy::Extended(params) => extended::apply(
                &mut self.segments,
                self.anchor,
                self.genomic_position,
                &self.strand,
                params,
                &self.bait,
                track,
            ),
        }

        self.refresh();
        self.state = State::SelectionApplied;
    }

    /// Flips the selection of a segment.
    ///
    /// Switching a segment on places baits within its margins. The extent and
    /// the score are recomputed.
    pub fn toggle_segment(&mut self, index: usize, track: &dyn AlignabilityTrack) -> Result<()> {
        let segment = self
            .segments
            .get_mut(index)
            .ok_or(Error::SegmentOutOfRange(index))?;

        if segment.is_selected() {
            segment.set_selected(false);
            segment.clear_baits();
        } else {
            if !segment.is_selectable() {
                return Err(Error::SegmentNotSelectable(index));
            }

            segment.set_selected(true);
            segment.set_patched(false);
            segment.place_baits(&self.bait, track);
        }

        self.refresh();
        self.state = State::UserRevised;

        Ok(())
    }

    /// Recomputes the extent and the score.
    fn refresh(&mut self) {
        let covered = self
            .segments
            .iter()
            .filter(|s| s.is_covered())
            .collect::<Vec<_>>();

        let extent = match covered.is_empty() {
            true => self.segments.iter().collect::<Vec<_>>(),
            false => covered,
        };

        self.start = extent
            .iter()
            .map(|s| s.start())
            .min()
            .unwrap_or(self.genomic_position);
        self.end = extent
            .iter()
            .map(|s| s.end())
            .max()
            .unwrap_or(self.genomic_position);

        self.score = match &self.strategy {
            SelectionStrategy::Simple(params) => simple::score(&self.segments, params),
            SelectionStrategy::Extended(params) => extended::score(
                &self.segments,
                self.anchor,
                self.genomic_position,
                &self.strand,
                params,
                &self.bait,
            ),
        };
    }
}

/// Builds a viewpoint for a transcription start site.
///
/// This is a shorthand for the [`Builder`].
pub fn build(
    tss: &TranscriptionStartSite,
    target_name: &str,
    strategy: &SelectionStrategy,
    bait: &BaitParameters,
    factory: &SegmentFactory<'_>,
    track: &dyn AlignabilityTrack,
) -> Result<ViewPoint> {
    Builder::default()
        .contig(tss.contig())?
        .genomic_position(tss.position())?
        .strand(tss.strand().clone())?
        .target_name(target_name)?
        .accession(tss.accession())?
        .strategy(strategy.clone())?
        .bait_parameters(bait.clone())?
        .try_build(factory, track)
}
