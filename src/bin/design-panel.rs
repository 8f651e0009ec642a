//! A binary to design a Capture Hi-C panel for a list of genes.
//!
//! ```shell
//! cargo run --release --bin=design-panel --features=binaries -- \
//!     --fasta hg38.fa --refgene refGene.txt.gz --output panel SHH PAX6
//! ```
//!
//! The viewpoints, selected fragments, margins, and baits are written as BED
//! files next to the `--output` prefix and a summary of the design is printed
//! to standard output.

use std::fs::File;
use std::io::BufRead as _;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use clap::Parser;
use clap_verbosity_flag::Verbosity;
use tabled::builder::Builder;
use tabled::settings::Alignment;
use tabled::settings::Style;
use tabled::settings::object::Columns;
use tracing::info;
use tracing::warn;
use tracing_log::AsTrace as _;
use tracing_subscriber::EnvFilter;
use viewpoints::bed;
use viewpoints::config::GenomeBuilds;
use viewpoints::config::PanelConfig;
use viewpoints::design::Design;
use viewpoints::panel;
use viewpoints::provider::AlignabilityTrack;
use viewpoints::provider::GenomeResources;
use viewpoints::provider::SequenceProvider;
use viewpoints::provider::alignability::BedGraph;
use viewpoints::provider::alignability::Uniform;
use viewpoints::provider::sequence::FASTA_INDEX_EXTENSION;
use viewpoints::provider::sequence::InMemory;
use viewpoints::provider::sequence::IndexedFasta;
use viewpoints::provider::transcript::RefGene;
use viewpoints::viewpoint::ViewPoint;

////////////////////////////////////////////////////////////////////////////////////////
// Inputs
////////////////////////////////////////////////////////////////////////////////////////

/// Opens the genome sequence, preferring random access when an index exists.
fn open_sequence(path: &Path) -> Result<Box<dyn SequenceProvider>> {
    let mut index = path.as_os_str().to_owned();
    index.push(".");
    index.push(FASTA_INDEX_EXTENSION);

    if Path::new(&index).exists() {
        info!("opening indexed FASTA: {}", path.display());
        let fasta = IndexedFasta::open(path)
            .with_context(|| format!("opening indexed FASTA: {}", path.display()))?;
        return Ok(Box::new(fasta));
    }

    info!("reading FASTA into memory: {}", path.display());
    let fasta = InMemory::from_fasta(path)
        .with_context(|| format!("reading FASTA: {}", path.display()))?;
    Ok(Box::new(fasta))
}

/// Opens the alignability track, defaulting to a uniquely alignable genome.
fn open_alignability(path: Option<&Path>) -> Result<Box<dyn AlignabilityTrack>> {
    match path {
        Some(path) => {
            info!("reading alignability track: {}", path.display());
            let track = BedGraph::from_path(path)
                .with_context(|| format!("reading alignability track: {}", path.display()))?;
            Ok(Box::new(track))
        }
        None => {
            warn!("no alignability track provided: every k-mer is treated as unique");
            Ok(Box::new(Uniform))
        }
    }
}

/// Collects the genes from the command line and the gene file.
fn read_genes(args: &Args) -> Result<Vec<String>> {
    let mut genes = args.genes.clone();

    if let Some(path) = &args.gene_file {
        let reader = viewpoints::reader::open(path)
            .with_context(|| format!("opening gene file: {}", path.display()))?;

        for line in reader.lines() {
            let line = line.with_context(|| format!("reading gene file: {}", path.display()))?;
            let gene = line.trim();

            if !gene.is_empty() && !gene.starts_with('#') {
                genes.push(gene.to_string());
            }
        }
    }

    if genes.is_empty() {
        bail!("no genes were provided");
    }

    Ok(genes)
}

////////////////////////////////////////////////////////////////////////////////////////
// Outputs
////////////////////////////////////////////////////////////////////////////////////////

/// A BED writer over a slice of viewpoints.
type BedWriter = fn(&mut BufWriter<File>, &[ViewPoint]) -> std::io::Result<usize>;

/// Writes one BED file per artifact.
fn write_beds(prefix: &Path, viewpoints: &[ViewPoint]) -> Result<()> {
    let artifacts: [(&str, BedWriter); 4] = [
        ("viewpoints", bed::write_viewpoints),
        ("fragments", bed::write_active_segments),
        ("margins", bed::write_unique_margins),
        ("baits", bed::write_baits),
    ];

    for (name, write) in artifacts {
        let mut path = prefix.as_os_str().to_owned();
        path.push(format!(".{name}.bed"));
        let path = PathBuf::from(path);

        let file =
            File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        let mut writer = BufWriter::new(file);

        let n = write(&mut writer, viewpoints)
            .and_then(|n| writer.flush().map(|_| n))
            .with_context(|| format!("writing {}", path.display()))?;

        info!("wrote {n} records to {}", path.display());
    }

    Ok(())
}

/// Renders the design summary.
fn summary(design: &Design) -> String {
    let mut builder = Builder::default();

    builder.push_record(["Statistic", "Value"]);
    builder.push_record([
        String::from("Viewpoints (resolved / total)"),
        format!("{} / {}", design.n_resolved_viewpoints, design.n_viewpoints),
    ]);
    builder.push_record([
        String::from("Genes (resolved / total)"),
        format!("{} / {}", design.n_resolved_genes, design.n_genes),
    ]);
    builder.push_record([
        String::from("Unique fragments"),
        design.n_unique_fragments.to_string(),
    ]);
    builder.push_record([
        String::from("Fragments per viewpoint"),
        format!("{:.2}", design.avg_fragments_per_viewpoint),
    ]);
    builder.push_record([
        String::from("Mean viewpoint size"),
        format!("{:.1}", design.avg_viewpoint_size),
    ]);
    builder.push_record([
        String::from("Mean viewpoint score"),
        format!("{:.2}%", design.avg_viewpoint_score * 100.0),
    ]);
    builder.push_record([
        String::from("Total margin size"),
        design.total_margin_size.to_string(),
    ]);
    builder.push_record([
        String::from("Effective panel size"),
        design.effective_panel_size.to_string(),
    ]);
    builder.push_record([
        String::from("Unique baits"),
        design.n_unique_baits.to_string(),
    ]);
    builder.push_record([
        String::from("Tiling factor"),
        format!("{:.2}", design.tiling_factor),
    ]);

    builder
        .build()
        .with(Style::rounded())
        .modify(Columns::new(1..), Alignment::right())
        .to_string()
}

////////////////////////////////////////////////////////////////////////////////////////
// Main
////////////////////////////////////////////////////////////////////////////////////////

/// Designs viewpoints and baits for a list of genes.
#[derive(Parser)]
struct Args {
    /// The genes to design viewpoints for.
    genes: Vec<String>,

    /// A file listing one gene per line (`#` starts a comment).
    #[arg(short, long)]
    gene_file: Option<PathBuf>,

    /// The genome sequence as FASTA (indexed with `samtools faidx` for random
    /// access).
    #[arg(short, long)]
    fasta: PathBuf,

    /// A bedGraph of k-mer alignability scores.
    #[arg(short, long)]
    alignability: Option<PathBuf>,

    /// The UCSC refGene table.
    #[arg(short, long)]
    refgene: PathBuf,

    /// A JSON panel configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// A JSON table of genome builds in addition to the built-in ones.
    #[arg(long)]
    genome_builds: Option<PathBuf>,

    /// The prefix of the output files.
    #[arg(short, long, default_value = "panel")]
    output: PathBuf,

    /// The number of worker threads (all available cores by default).
    #[arg(short, long)]
    threads: Option<usize>,

    #[command(flatten)]
    verbose: Verbosity,
}

fn design(args: &Args) -> Result<()> {
    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("configuring the thread pool")?;
    }

    let config = match &args.config {
        Some(path) => PanelConfig::from_json_file(path)
            .with_context(|| format!("reading configuration: {}", path.display()))?,
        None => PanelConfig::default(),
    };

    let mut builds = GenomeBuilds::builtin();

    if let Some(path) = &args.genome_builds {
        builds.extend(
            GenomeBuilds::from_json_file(path)
                .with_context(|| format!("reading genome builds: {}", path.display()))?,
        );
    }

    let genome = builds
        .require(&config.genome_build)
        .with_context(|| format!("known builds: {}", builds.names().join(", ")))?;

    let genes = read_genes(args)?;
    let sequence = open_sequence(&args.fasta)?;
    let alignability = open_alignability(args.alignability.as_deref())?;

    info!("reading refGene table: {}", args.refgene.display());
    let transcripts = RefGene::from_path(&args.refgene)
        .with_context(|| format!("reading refGene table: {}", args.refgene.display()))?;

    let resources = GenomeResources::new(sequence.as_ref(), alignability.as_ref());
    let progress = |done: usize, total: usize| {
        if done % 100 == 0 || done == total {
            info!("processed {done} of {total} genes");
        }
    };
    let options = panel::Options::default().with_progress(&progress);

    let outcome = panel::generate(&genes, &transcripts, resources, &config, genome, &options)
        .context("generating panel")?;

    for gene in &outcome.unknown_genes {
        warn!("{gene}: no transcription start site on a canonical chromosome");
    }

    for failure in &outcome.failures {
        warn!(
            "{} at {}:{}: {}",
            failure.gene, failure.contig, failure.position, failure.error
        );
    }

    write_beds(&args.output, &outcome.viewpoints)?;

    println!("{}", summary(&Design::calculate(&outcome.viewpoints)));

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    match std::env::var("RUST_LOG") {
        Ok(_) => tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .init(),
        Err(_) => tracing_subscriber::fmt()
            .with_max_level(args.verbose.log_level_filter().as_trace())
            .init(),
    };

    design(&args)
}
