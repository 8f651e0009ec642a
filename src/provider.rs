//! Genome-wide services consumed by the design engine.
//!
//! The engine never owns genome data. Instead, it queries three read-only
//! services that are shared across every viewpoint in a panel:
//!
//! - a [`SequenceProvider`] for (repeat-masked) reference sequence,
//! - an [`AlignabilityTrack`] for per-position k-mer alignability, and
//! - a [`GeneTranscriptSource`] for the transcription start sites of genes.
//!
//! All three are `Send + Sync` so that a single instance can be shared by the
//! worker threads that build viewpoints in parallel.

pub mod alignability;
pub mod sequence;
pub mod transcript;

pub use alignability::AlignabilityTrack;
pub use sequence::SequenceProvider;
pub use transcript::GeneTranscriptSource;

/// The shared genome resources needed to build viewpoints.
#[derive(Clone, Copy)]
pub struct GenomeResources<'a> {
    /// The reference sequence.
    sequence: &'a dyn SequenceProvider,

    /// The k-mer alignability track.
    alignability: &'a dyn AlignabilityTrack,
}

impl<'a> GenomeResources<'a> {
    /// Creates a new [`GenomeResources`] handle.
    ///
    /// # Examples
    ///
    /// ```
    /// use viewpoints::provider::GenomeResources;
    /// use viewpoints::provider::alignability::Uniform;
    /// use viewpoints::provider::sequence::InMemory;
    ///
    /// let sequence = InMemory::default().with_contig("chr1", "ACGTACGT");
    /// let alignability = Uniform::default();
    ///
    /// let resources = GenomeResources::new(&sequence, &alignability);
    /// assert_eq!(resources.sequence().contig_length("chr1"), Some(8));
    /// ```
    pub fn new(
        sequence: &'a dyn SequenceProvider,
        alignability: &'a dyn AlignabilityTrack,
    ) -> Self {
        Self {
            sequence,
            alignability,
        }
    }

    /// Gets the sequence provider.
    pub fn sequence(&self) -> &'a dyn SequenceProvider {
        self.sequence
    }

    /// Gets the alignability track.
    pub fn alignability(&self) -> &'a dyn AlignabilityTrack {
        self.alignability
    }
}

impl std::fmt::Debug for GenomeResources<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenomeResources").finish_non_exhaustive()
    }
}
