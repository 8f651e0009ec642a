//! Designing viewpoints for a list of genes.
//!
//! Genes are processed in parallel with [`rayon`]. A failure to build the
//! viewpoint of one transcription start site is recorded and does not stop
//! the remaining genes.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use rayon::prelude::*;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::Position;
use crate::config;
use crate::config::GenomeBuild;
use crate::config::PanelConfig;
use crate::provider::GeneTranscriptSource;
use crate::provider::GenomeResources;
use crate::segment::SegmentFactory;
use crate::viewpoint;
use crate::viewpoint::Builder;
use crate::viewpoint::ViewPoint;

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error that aborts panel generation.
#[derive(Debug)]
pub enum Error {
    /// The configuration is invalid.
    Config(config::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Config(err) => write!(f, "configuration error: {err}"),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////
// Options
////////////////////////////////////////////////////////////////////////////////////////

/// A callback receiving the number of processed genes and the total number of
/// genes.
pub type Progress<'a> = &'a (dyn Fn(usize, usize) + Sync);

/// Options controlling a panel generation run.
#[derive(Clone, Copy, Default)]
pub struct Options<'a> {
    /// A flag that, once set, stops genes from being started.
    cancel: Option<&'a AtomicBool>,

    /// A callback invoked after each gene.
    progress: Option<Progress<'a>>,
}

impl std::fmt::Debug for Options<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("cancel", &self.cancel)
            .field("progress", &self.progress.map(|_| "<callback>"))
            .finish()
    }
}

impl<'a> Options<'a> {
    /// Sets the cancellation flag.
    pub fn with_cancel(mut self, cancel: &'a AtomicBool) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Sets the progress callback.
    pub fn with_progress(mut self, progress: Progress<'a>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Gets whether cancellation was requested.
    fn cancelled(&self) -> bool {
        self.cancel
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Outcome
////////////////////////////////////////////////////////////////////////////////////////

/// A transcription start site for which no viewpoint could be built.
#[derive(Debug)]
pub struct Failure {
    /// The gene symbol.
    pub gene: String,

    /// The contig.
    pub contig: String,

    /// The transcription start site.
    pub position: Position,

    /// The reason.
    pub error: viewpoint::Error,
}

/// The result of a panel generation run.
#[derive(Debug, Default)]
pub struct Outcome {
    /// The viewpoints, in the order of the input genes.
    pub viewpoints: Vec<ViewPoint>,

    /// The transcription start sites for which no viewpoint could be built.
    pub failures: Vec<Failure>,

    /// The genes without any transcription start site on a canonical
    /// chromosome.
    pub unknown_genes: Vec<String>,

    /// Whether the run was cancelled before every gene was processed.
    pub cancelled: bool,
}

/// The result of processing a single gene.
enum GeneResult {
    /// No usable transcription start site exists for the gene.
    Unknown(String),

    /// Viewpoints were attempted for every transcription start site.
    Designed(Vec<ViewPoint>, Vec<Failure>),
}

/// Builds the viewpoints of every gene.
///
/// Configuration problems (such as an invalid enzyme) abort the run before
/// any gene is processed.
pub fn generate<S>(
    genes: &[S],
    transcripts: &dyn GeneTranscriptSource,
    resources: GenomeResources<'_>,
    config: &PanelConfig,
    genome: &GenomeBuild,
    options: &Options<'_>,
) -> Result<Outcome>
where
    S: AsRef<str> + Sync,
{
    config.validate().map_err(Error::Config)?;
    let enzymes = config.enzyme_set().map_err(Error::Config)?;
    let factory = SegmentFactory::new(resources.sequence(), &enzymes, config.margin_size);

    let total = genes.len();
    let done = AtomicUsize::new(0);

    info!(
        "designing {} viewpoints for {} genes",
        config.strategy.approach(),
        total
    );

    let results = genes
        .par_iter()
        .filter_map(|gene| {
            if options.cancelled() {
                return None;
            }

            let result =
                design_gene(gene.as_ref(), transcripts, resources, &factory, config, genome);

            let n = done.fetch_add(1, Ordering::Relaxed) + 1;

            if let Some(progress) = options.progress {
                progress(n, total);
            }

            Some(result)
        })
        .collect::<Vec<_>>();

    let mut outcome = Outcome {
        cancelled: results.len() < total,
        ..Default::default()
    };

    for result in results {
        match result {
            GeneResult::Unknown(gene) => outcome.unknown_genes.push(gene),
            GeneResult::Designed(viewpoints, failures) => {
                outcome.viewpoints.extend(viewpoints);
                outcome.failures.extend(failures);
            }
        }
    }

    info!(
        "built {} viewpoints ({} failed, {} unknown genes)",
        outcome.viewpoints.len(),
        outcome.failures.len(),
        outcome.unknown_genes.len()
    );

    if outcome.cancelled {
        warn!("panel generation was cancelled");
    }

    Ok(outcome)
}

/// Builds the viewpoints of a single gene.
fn design_gene(
    gene: &str,
    transcripts: &dyn GeneTranscriptSource,
    resources: GenomeResources<'_>,
    factory: &SegmentFactory<'_>,
    config: &PanelConfig,
    genome: &GenomeBuild,
) -> GeneResult {
    let sites = transcripts
        .tss_list(gene)
        .into_iter()
        .filter(|site| genome.is_canonical(site.contig()))
        .collect::<Vec<_>>();

    if sites.is_empty() {
        debug!("no transcription start site on a canonical chromosome for {gene}");
        return GeneResult::Unknown(gene.to_string());
    }

    let total = sites.len();
    let mut viewpoints = Vec::with_capacity(total);
    let mut failures = Vec::new();

    for (i, site) in sites.into_iter().enumerate() {
        let result = Builder::default()
            .contig(site.contig())
            .and_then(|b| b.genomic_position(site.position()))
            .and_then(|b| b.strand(site.strand().clone()))
            .and_then(|b| b.target_name(gene))
            .and_then(|b| b.accession(site.accession()))
            .and_then(|b| b.strategy(config.strategy.clone()))
            .and_then(|b| b.bait_parameters(config.bait.clone()))
            .and_then(|b| b.promoter(i + 1, total))
            .and_then(|b| b.try_build(factory, resources.alignability()));

        match result {
            Ok(viewpoint) => {
                debug!(
                    "{gene} ({}/{total}): {} with score {}",
                    i + 1,
                    viewpoint.genomic_location_string(),
                    viewpoint.score_as_percent_string()
                );
                viewpoints.push(viewpoint);
            }
            Err(error) => {
                warn!("{gene} at {}:{}: {error}", site.contig(), site.position());
                failures.push(Failure {
                    gene: gene.to_string(),
                    contig: site.contig().to_string(),
                    position: site.position(),
                    error,
                });
            }
        }
    }

    GeneResult::Designed(viewpoints, failures)
}
