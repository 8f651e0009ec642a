//! A builder for a viewpoint.

use omics::coordinate::Strand;

use crate::Position;
use crate::provider::AlignabilityTrack;
use crate::segment::BaitParameters;
use crate::segment::factory;
use crate::segment::factory::SegmentFactory;
use crate::viewpoint::Error;
use crate::viewpoint::Result;
use crate::viewpoint::SelectionStrategy;
use crate::viewpoint::State;
use crate::viewpoint::ViewPoint;
use crate::viewpoint::genomic_distances;

/// An error that occurs when a required field was never provided to the
/// [`Builder`].
#[derive(Debug)]
pub enum MissingError {
    /// No contig was provided to the [`Builder`].
    Contig,

    /// No genomic position was provided to the [`Builder`].
    GenomicPosition,

    /// No strand was provided to the [`Builder`].
    Strand,

    /// No target name was provided to the [`Builder`].
    TargetName,
}

impl std::fmt::Display for MissingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissingError::Contig => write!(f, "contig"),
            MissingError::GenomicPosition => write!(f, "genomic position"),
            MissingError::Strand => write!(f, "strand"),
            MissingError::TargetName => write!(f, "target name"),
        }
    }
}

impl std::error::Error for MissingError {}

/// An error that occurs when a singular field was provided multiple times to
/// the [`Builder`].
#[derive(Debug)]
pub enum MultipleError {
    /// The contig was provided multiple times.
    Contig,

    /// The genomic position was provided multiple times.
    GenomicPosition,

    /// The strand was provided multiple times.
    Strand,

    /// The target name was provided multiple times.
    TargetName,

    /// The accession was provided multiple times.
    Accession,

    /// The selection strategy was provided multiple times.
    Strategy,

    /// The bait parameters were provided multiple times.
    BaitParameters,

    /// The promoter numbering was provided multiple times.
    Promoter,
}

impl std::fmt::Display for MultipleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MultipleError::Contig => write!(f, "contig"),
            MultipleError::GenomicPosition => write!(f, "genomic position"),
            MultipleError::Strand => write!(f, "strand"),
            MultipleError::TargetName => write!(f, "target name"),
            MultipleError::Accession => write!(f, "accession"),
            MultipleError::Strategy => write!(f, "strategy"),
            MultipleError::BaitParameters => write!(f, "bait parameters"),
            MultipleError::Promoter => write!(f, "promoter"),
        }
    }
}

impl std::error::Error for MultipleError {}

/// Stores a singular field, failing if it was already set.
fn set_once<T>(slot: &mut Option<T>, value: T, err: MultipleError) -> Result<()> {
    if slot.is_some() {
        return Err(Error::Multiple(err));
    }

    *slot = Some(value);
    Ok(())
}

/// A builder for a [`ViewPoint`].
///
/// The accession defaults to empty, the strategy and the bait parameters to
/// their defaults, and the promoter numbering to `1` of `1`.
#[derive(Debug, Default)]
pub struct Builder {
    /// The contig.
    contig: Option<String>,

    /// The anchor position.
    genomic_position: Option<Position>,

    /// The strand.
    strand: Option<Strand>,

    /// The name of the target gene.
    target_name: Option<String>,

    /// The transcript accession.
    accession: Option<String>,

    /// The selection strategy.
    strategy: Option<SelectionStrategy>,

    /// The bait placement parameters.
    bait: Option<BaitParameters>,

    /// The promoter number and the total number of promoters.
    promoter: Option<(usize, usize)>,
}

impl Builder {
    /// Sets the contig.
    ///
    /// # Examples
    ///
    /// ```
    /// use viewpoints::viewpoint::Builder;
    ///
    /// let builder = Builder::default().contig("chr1")?;
    /// assert!(builder.contig("chr2").is_err());
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn contig(mut self, contig: impl Into<String>) -> Result<Self> {
        set_once(&mut self.contig, contig.into(), MultipleError::Contig)?;
        Ok(self)
    }

    /// Sets the anchor position (1-based).
    pub fn genomic_position(mut self, position: Position) -> Result<Self> {
        set_once(
            &mut self.genomic_position,
            position,
            MultipleError::GenomicPosition,
        )?;
        Ok(self)
    }

    /// Sets the strand.
    pub fn strand(mut self, strand: Strand) -> Result<Self> {
        set_once(&mut self.strand, strand, MultipleError::Strand)?;
        Ok(self)
    }

    /// Sets the name of the target gene.
    pub fn target_name(mut self, name: impl Into<String>) -> Result<Self> {
        set_once(&mut self.target_name, name.into(), MultipleError::TargetName)?;
        Ok(self)
    }

    /// Sets the transcript accession.
    pub fn accession(mut self, accession: impl Into<String>) -> Result<Self> {
        set_once(&mut self.accession, accession.into(), MultipleError::Accession)?;
        Ok(self)
    }

    /// Sets the selection strategy.
    pub fn strategy(mut self, strategy: SelectionStrategy) -> Result<Self> {
        set_once(&mut self.strategy, strategy, MultipleError::Strategy)?;
        Ok(self)
    }

    /// Sets the bait placement parameters.
    pub fn bait_parameters(mut self, params: BaitParameters) -> Result<Self> {
        set_once(&mut self.bait, params, MultipleError::BaitParameters)?;
        Ok(self)
    }

    /// Sets the promoter number and the total number of promoters of the
    /// gene.
    pub fn promoter(mut self, number: usize, total: usize) -> Result<Self> {
        set_once(&mut self.promoter, (number, total), MultipleError::Promoter)?;
        Ok(self)
    }

    /// Consumes `self` to attempt to build a [`ViewPoint`].
    ///
    /// Segments are derived with `factory` and the selection strategy is
    /// applied, placing baits using `track`.
    ///
    /// # Examples
    ///
    /// ```
    /// use omics::coordinate::Strand;
    /// use viewpoints::enzyme;
    /// use viewpoints::provider::alignability::Uniform;
    /// use viewpoints::provider::sequence::InMemory;
    /// use viewpoints::segment::SegmentFactory;
    /// use viewpoints::viewpoint::Approach;
    /// use viewpoints::viewpoint::Builder;
    /// use viewpoints::viewpoint::State;
    ///
    /// let sequence = "ACAGT".repeat(200);
    /// let provider = InMemory::default().with_contig("chr1", sequence);
    /// let enzymes = enzyme::resolve(["HindIII"])?;
    /// let factory = SegmentFactory::new(&provider, &enzymes, 250);
    ///
    /// let viewpoint = Builder::default()
    ///     .contig("chr1")?
    ///     .genomic_position(500)?
    ///     .strand(Strand::Negative)?
    ///     .target_name("GENE")?
    ///     .accession("NM_000001")?
    ///     .try_build(&factory, &Uniform)?;
    ///
    /// assert_eq!(viewpoint.approach(), Approach::Simple);
    /// assert_eq!(viewpoint.state(), State::SelectionApplied);
    /// assert_eq!(viewpoint.active_segments().len(), 1);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn try_build(
        self,
        factory: &SegmentFactory<'_>,
        track: &dyn AlignabilityTrack,
    ) -> Result<ViewPoint> {
        let contig = self.contig.ok_or(Error::Missing(MissingError::Contig))?;
        let genomic_position = self
            .genomic_position
            .ok_or(Error::Missing(MissingError::GenomicPosition))?;
        let strand = self.strand.ok_or(Error::Missing(MissingError::Strand))?;
        let target_name = self
            .target_name
            .ok_or(Error::Missing(MissingError::TargetName))?;

        let strategy = self.strategy.unwrap_or_default();
        let (promoter_number, total_promoter_count) = self.promoter.unwrap_or((1, 1));

        let mut viewpoint = ViewPoint {
            contig,
            genomic_position,
            strand,
            target_name,
            accession: self.accession.unwrap_or_default(),
            strategy,
            bait: self.bait.unwrap_or_default(),
            segments: Vec::new(),
            anchor: 0,
            score: 0.0,
            start: genomic_position,
            end: genomic_position,
            display_start: genomic_position,
            display_end: genomic_position,
            window_start: genomic_position,
            window_end: genomic_position,
            promoter_number,
            total_promoter_count,
            cut_sites_found: false,
            state: State::Uninitialized,
        };

        let (up, down) = viewpoint.strategy.distances();
        let (left, right) = genomic_distances(&viewpoint.strand, up, down);

        let segments = factory
            .build(&viewpoint.contig, genomic_position, left, right)
            .map_err(Error::Factory)?;

        let anchor = segments
            .segments()
            .iter()
            .position(|s| s.contains(genomic_position))
            .ok_or_else(|| {
                Error::Factory(factory::Error::InvalidLocus {
                    contig: viewpoint.contig.clone(),
                    position: genomic_position,
                    length: segments.window_end(),
                })
            })?;

        if !segments.cut_sites_found()
            && segments.segments()[anchor].length() < viewpoint.strategy.min_frag_size()
        {
            return Err(Error::NoCutSiteFound {
                contig: viewpoint.contig,
                position: genomic_position,
            });
        }

        viewpoint.window_start = segments.window_start();
        viewpoint.window_end = segments.window_end();
        viewpoint.cut_sites_found = segments.cut_sites_found();
        viewpoint.segments = segments.into_segments();
        viewpoint.anchor = anchor;
        viewpoint.state = State::SegmentsBuilt;

        viewpoint.zoom(1.0);
        viewpoint.apply_selection(track);

        Ok(viewpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enzyme;
    use crate::provider::alignability::Uniform;
    use crate::provider::sequence::InMemory;

    #[test]
    fn test_missing_fields() {
        let provider = InMemory::default().with_contig("chr1", "ACGT");
        let enzymes = enzyme::resolve(["DpnII"]).unwrap();
        let factory = SegmentFactory::new(&provider, &enzymes, 1);

        let err = Builder::default()
            .contig("chr1")
            .unwrap()
            .try_build(&factory, &Uniform)
            .unwrap_err();

        assert_eq!(err.to_string(), "missing required field: genomic position");
    }

    #[test]
    fn test_multiple_fields() {
        let err = Builder::default()
            .promoter(1, 2)
            .unwrap()
            .promoter(2, 2)
            .unwrap_err();

        assert_eq!(err.to_string(), "singular field set multiple times: promoter");
    }

    #[test]
    fn test_promoter_numbering() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let provider = InMemory::default().with_contig("chr1", "ACAGT".repeat(100));
        let enzymes = enzyme::resolve(["DpnII"])?;
        let factory = SegmentFactory::new(&provider, &enzymes, 50);

        let viewpoint = Builder::default()
            .contig("chr1")?
            .genomic_position(250)?
            .strand(Strand::Positive)?
            .target_name("GENE")?
            .promoter(2, 3)?
            .try_build(&factory, &Uniform)?;

        assert_eq!(viewpoint.promoter_number(), 2);
        assert_eq!(viewpoint.total_promoter_count(), 3);
        assert_eq!(viewpoint.target_name(), "GENE");
        assert_eq!(viewpoint.accession(), "");

        Ok(())
    }
}
