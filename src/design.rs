//! Panel-level statistics over a set of viewpoints.

use std::collections::HashSet;

use crate::Position;
use crate::segment::Margin;
use crate::viewpoint::ViewPoint;

/// The key by which intervals shared between viewpoints are deduplicated.
type Key<'a> = (&'a str, Position, Position);

/// Statistics describing a panel design.
///
/// Only selected segments contribute. A viewpoint or gene is *resolved* when
/// at least one of its segments is selected.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Design {
    /// The number of viewpoints.
    pub n_viewpoints: usize,

    /// The number of distinct target genes.
    pub n_genes: usize,

    /// The number of resolved viewpoints.
    pub n_resolved_viewpoints: usize,

    /// The number of distinct resolved target genes.
    pub n_resolved_genes: usize,

    /// The number of distinct selected segments.
    pub n_unique_fragments: usize,

    /// The mean number of selected segments per resolved viewpoint.
    pub avg_fragments_per_viewpoint: f64,

    /// The mean extent of the resolved viewpoints.
    pub avg_viewpoint_size: f64,

    /// The mean score of the resolved viewpoints.
    pub avg_viewpoint_score: f64,

    /// The total length of the margins of the selected segments, counting
    /// shared margins once per viewpoint.
    pub total_margin_size: usize,

    /// The total length of the distinct usable margins.
    pub effective_panel_size: usize,

    /// The number of distinct baits.
    pub n_unique_baits: usize,

    /// The mean number of bait nucleotides per nucleotide of the effective
    /// panel.
    pub tiling_factor: f64,
}

/// Divides, returning zero for an empty denominator.
fn mean(sum: f64, n: usize) -> f64 {
    match n {
        0 => 0.0,
        n => sum / n as f64,
    }
}

impl Design {
    /// Calculates the statistics of a set of viewpoints.
    ///
    /// # Examples
    ///
    /// ```
    /// use viewpoints::design::Design;
    ///
    /// let design = Design::calculate(&[]);
    /// assert_eq!(design.n_viewpoints, 0);
    /// assert_eq!(design.tiling_factor, 0.0);
    /// ```
    pub fn calculate(viewpoints: &[ViewPoint]) -> Self {
        let resolved = viewpoints
            .iter()
            .filter(|v| v.is_resolved())
            .collect::<Vec<_>>();

        let genes = viewpoints
            .iter()
            .map(ViewPoint::target_name)
            .collect::<HashSet<_>>();
        let resolved_genes = resolved
            .iter()
            .map(|v| v.target_name())
            .collect::<HashSet<_>>();

        let mut fragments = HashSet::<Key<'_>>::new();
        let mut margins = HashSet::<Key<'_>>::new();
        let mut baits = HashSet::<Key<'_>>::new();
        let mut n_active = 0;
        let mut total_margin_size = 0;

        for segment in viewpoints.iter().flat_map(|v| v.active_segments()) {
            let contig = segment.contig();

            n_active += 1;
            fragments.insert((contig, segment.start(), segment.end()));

            total_margin_size += segment
                .distinct_margins()
                .iter()
                .map(Margin::length)
                .sum::<usize>();

            for margin in segment.usable_margins() {
                margins.insert((contig, margin.start(), margin.end()));
            }

            for bait in segment.baits() {
                baits.insert((contig, bait.start(), bait.end()));
            }
        }

        let effective_panel_size = margins
            .iter()
            .map(|(_, start, end)| end - start + 1)
            .sum::<usize>();
        let bait_nucleotides = baits
            .iter()
            .map(|(_, start, end)| end - start + 1)
            .sum::<usize>();

        Self {
            n_viewpoints: viewpoints.len(),
            n_genes: genes.len(),
            n_resolved_viewpoints: resolved.len(),
            n_resolved_genes: resolved_genes.len(),
            n_unique_fragments: fragments.len(),
            avg_fragments_per_viewpoint: mean(n_active as f64, resolved.len()),
            avg_viewpoint_size: mean(
                resolved.iter().map(|v| v.length() as f64).sum(),
                resolved.len(),
            ),
            avg_viewpoint_score: mean(resolved.iter().map(|v| v.score()).sum(), resolved.len()),
            total_margin_size,
            effective_panel_size,
            n_unique_baits: baits.len(),
            tiling_factor: match effective_panel_size {
                0 => 0.0,
                size => bait_nucleotides as f64 / size as f64,
            },
        }
    }
}

/// Calculates the statistics of a set of viewpoints.
///
/// This is an alias for [`Design::calculate`].
pub fn calculate_design_parameters(viewpoints: &[ViewPoint]) -> Design {
    Design::calculate(viewpoints)
}

#[cfg(test)]
mod tests {
    use omics::coordinate::Strand;

    use super::*;
    use crate::enzyme;
    use crate::provider::alignability::Uniform;
    use crate::provider::sequence::InMemory;
    use crate::segment::BaitParameters;
    use crate::segment::SegmentFactory;
    use crate::viewpoint::Builder;

    /// Builds a viewpoint for `gene` at `position`.
    fn viewpoint(
        factory: &SegmentFactory<'_>,
        gene: &str,
        position: usize,
    ) -> Result<ViewPoint, Box<dyn std::error::Error>> {
        let bait = BaitParameters {
            probe_length: 20,
            min_bait_count: 1,
            ..Default::default()
        };

        Ok(Builder::default()
            .contig("chr1")?
            .genomic_position(position)?
            .strand(Strand::Positive)?
            .target_name(gene)?
            .bait_parameters(bait)?
            .try_build(factory, &Uniform)?)
    }

    #[test]
    fn test_shared_fragments_are_counted_once() -> Result<(), Box<dyn std::error::Error>> {
        // Cut sites every 200 bases in a GC-balanced sequence.
        let sequence = ("GATC".to_string() + &"ACGT".repeat(49)).repeat(10);
        let provider = InMemory::default().with_contig("chr1", sequence);
        let enzymes = enzyme::resolve(["DpnII"])?;
        let factory = SegmentFactory::new(&provider, &enzymes, 40);

        // Both viewpoints anchor in [801, 1000] and select the same three
        // segments; the third anchors in [1201, 1400].
        let viewpoints = vec![
            viewpoint(&factory, "A", 850)?,
            viewpoint(&factory, "A", 950)?,
            viewpoint(&factory, "B", 1_300)?,
        ];

        let design = Design::calculate(&viewpoints);

        assert_eq!(design.n_viewpoints, 3);
        assert_eq!(design.n_genes, 2);
        assert_eq!(design.n_resolved_viewpoints, 3);
        assert_eq!(design.n_resolved_genes, 2);
        assert_eq!(design.n_unique_fragments, 5);
        assert_eq!(design.avg_fragments_per_viewpoint, 3.0);
        assert_eq!(design.avg_viewpoint_size, 600.0);
        assert_eq!(design.total_margin_size, 9 * 80);
        assert_eq!(design.effective_panel_size, 5 * 80);
        // Two 20 base probes fill each 40 base margin.
        assert_eq!(design.n_unique_baits, 20);
        assert_eq!(design.tiling_factor, 1.0);

        Ok(())
    }

    #[test]
    fn test_calculation_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
        let sequence = ("GATC".to_string() + &"ACGT".repeat(49)).repeat(10);
        let provider = InMemory::default().with_contig("chr1", sequence);
        let enzymes = enzyme::resolve(["DpnII"])?;
        let factory = SegmentFactory::new(&provider, &enzymes, 40);

        let viewpoints = vec![viewpoint(&factory, "A", 850)?, viewpoint(&factory, "B", 90)?];

        let first = calculate_design_parameters(&viewpoints);
        let second = calculate_design_parameters(&viewpoints);

        assert_eq!(first, second);

        Ok(())
    }
}
