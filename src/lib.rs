//! `viewpoints` is a crate for designing Capture Hi-C probe panels.
//!
//! Capture Hi-C enriches a Hi-C library for the restriction fragments that
//! surround the promoters of genes of interest. Designing a panel means
//! choosing, for every transcription start site, the restriction fragments
//! (the *viewpoint*) to capture and the baits (probes) that pull them down.
//!
//! The crate is organized around the following steps:
//!
//! - The [restriction enzymes](crate::enzyme) are resolved from a catalog or
//!   from inline definitions and their cut sites are located within a window
//!   around the transcription start site.
//! - A [`SegmentFactory`](crate::segment::SegmentFactory) slices the window
//!   into [segments](crate::segment::Segment), one per restriction fragment.
//! - A [`ViewPoint`] selects segments following a
//!   [`SelectionStrategy`](crate::viewpoint::SelectionStrategy) and places
//!   [baits](crate::segment::Bait) within the margins of the selected
//!   segments.
//! - A [`Design`] summarizes a whole panel and the [`bed`] module exports it.
//!
//! Genome data is never owned by the engine. Instead, the sequence, the
//! alignability track, and the gene annotation are read through the traits of
//! the [`provider`] module. [`panel::generate()`] ties everything together for
//! a list of genes, building viewpoints in parallel.
//!
//! Below is a representative example of building a single viewpoint and
//! summarizing it.
//!
//! ```
//! use omics::coordinate::Strand;
//! use viewpoints::Design;
//! use viewpoints::enzyme;
//! use viewpoints::provider::alignability::Uniform;
//! use viewpoints::provider::sequence::InMemory;
//! use viewpoints::segment::BaitParameters;
//! use viewpoints::segment::SegmentFactory;
//! use viewpoints::viewpoint::Builder;
//!
//! // A `GATC` every 200 bases.
//! let sequence = ("GATC".to_string() + &"ACGT".repeat(49)).repeat(10);
//! let provider = InMemory::default().with_contig("chr1", sequence);
//!
//! let enzymes = enzyme::resolve(["DpnII"])?;
//! let factory = SegmentFactory::new(&provider, &enzymes, 40);
//!
//! let viewpoint = Builder::default()
//!     .contig("chr1")?
//!     .genomic_position(850)?
//!     .strand(Strand::Positive)?
//!     .target_name("GENE")?
//!     .bait_parameters(BaitParameters {
//!         probe_length: 20,
//!         min_bait_count: 1,
//!         ..Default::default()
//!     })?
//!     .try_build(&factory, &Uniform)?;
//!
//! assert!(viewpoint.is_resolved());
//! assert_eq!(viewpoint.active_segments().len(), 3);
//!
//! let design = Design::calculate(&[viewpoint]);
//! assert_eq!(design.n_resolved_genes, 1);
//!
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(clippy::missing_docs_in_private_items)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod bed;
pub mod config;
pub mod design;
pub mod enzyme;
pub mod interval;
pub mod panel;
pub mod provider;
pub mod reader;
pub mod segment;
pub mod viewpoint;

pub use design::Design;
pub use viewpoint::ViewPoint;

/// The value of a 1-based genomic position.
///
/// Intervals built from positions are [`interval::Interval`]s.
pub type Position = usize;
