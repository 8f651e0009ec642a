//! The extended selection strategy.
//!
//! Every segment overlapping the requested region around the transcription
//! start site whose margins are suitable for probes is a candidate. Each
//! candidate is weighted by a Gaussian density of its distance to the start
//! site, and candidates are taken greedily by weight until each side of the
//! viewpoint reaches its requested size.

use std::f64::consts::PI;

use omics::coordinate::Strand;
use serde::Deserialize;
use serde::Serialize;

use crate::Position;
use crate::provider::AlignabilityTrack;
use crate::segment::BaitParameters;
use crate::segment::Segment;
use crate::viewpoint::Side;
use crate::viewpoint::genomic_distances;

/// The default size of the upstream side of the viewpoint.
pub const DEFAULT_SIZE_UP: usize = 5_000;

/// The default size of the downstream side of the viewpoint.
pub const DEFAULT_SIZE_DOWN: usize = 5_000;

/// The default minimum segment length.
pub const DEFAULT_MIN_FRAG_SIZE: usize = 130;

/// The default maximum repeat content of a margin.
pub const DEFAULT_MAX_REPEAT_CONTENT: f64 = 0.6;

/// The smallest standard deviation used for weighting.
const MIN_SIGMA: f64 = 1.0;

/// The parameters of the extended strategy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// The size of the upstream side of the viewpoint.
    pub size_up: usize,

    /// The size of the downstream side of the viewpoint.
    pub size_down: usize,

    /// The minimum length of a candidate segment.
    pub min_frag_size: usize,

    /// The maximum repeat content of each margin of a candidate segment.
    pub max_repeat_content: f64,

    /// The standard deviation of the upstream weighting (half of `size_up`
    /// when unset).
    pub sigma_up: Option<f64>,

    /// The standard deviation of the downstream weighting (half of
    /// `size_down` when unset).
    pub sigma_down: Option<f64>,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            size_up: DEFAULT_SIZE_UP,
            size_down: DEFAULT_SIZE_DOWN,
            min_frag_size: DEFAULT_MIN_FRAG_SIZE,
            max_repeat_content: DEFAULT_MAX_REPEAT_CONTENT,
            sigma_up: None,
            sigma_down: None,
        }
    }
}

impl Parameters {
    /// Gets the standard deviation used on one side.
    fn sigma(&self, side: Side) -> f64 {
        let (sigma, size) = match side {
            Side::Upstream => (self.sigma_up, self.size_up),
            Side::Downstream => (self.sigma_down, self.size_down),
        };

        sigma.unwrap_or(size as f64 / 2.0).max(MIN_SIGMA)
    }

    /// Gets the size requested on one side.
    fn size(&self, side: Side) -> usize {
        match side {
            Side::Upstream => self.size_up,
            Side::Downstream => self.size_down,
        }
    }

    /// Gets the 1-based, fully-closed genomic region considered around
    /// `position`.
    fn region(&self, position: Position, strand: &Strand) -> (Position, Position) {
        let (left, right) = genomic_distances(strand, self.size_up, self.size_down);
        (
            position.saturating_sub(left).max(1),
            position.saturating_add(right),
        )
    }
}

/// The density of a normal distribution with mean zero.
fn gaussian(x: f64, sigma: f64) -> f64 {
    (-(x * x) / (2.0 * sigma * sigma)).exp() / (sigma * (2.0 * PI).sqrt())
}

/// Gets the side of `position` on which a segment lies.
fn side_of(segment: &Segment, position: Position, strand: &Strand) -> Side {
    let left = segment.midpoint() < position;

    match (strand, left) {
        (Strand::Positive, true) | (Strand::Negative, false) => Side::Upstream,
        _ => Side::Downstream,
    }
}

/// Gets the weight of every segment.
///
/// The anchor segment receives the largest possible weight.
pub(crate) fn weights(
    segments: &[Segment],
    anchor: usize,
    position: Position,
    strand: &Strand,
    params: &Parameters,
) -> Vec<f64> {
    let peak = gaussian(0.0, params.sigma(Side::Upstream))
        .max(gaussian(0.0, params.sigma(Side::Downstream)));

    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            if i == anchor {
                return peak;
            }

            let side = side_of(segment, position, strand);
            let distance = segment.midpoint().abs_diff(position) as f64;
            gaussian(distance, params.sigma(side))
        })
        .collect()
}

/// Gets whether a segment overlaps the region considered around `position`.
fn in_region(segment: &Segment, position: Position, strand: &Strand, params: &Parameters) -> bool {
    let (start, end) = params.region(position, strand);
    segment.start() <= end && segment.end() >= start
}

/// Gets whether every margin of a segment has acceptable repeat and GC
/// content.
fn has_suitable_margins(segment: &Segment, params: &Parameters, bait: &BaitParameters) -> bool {
    let gc_ok = |gc: f64| bait.min_gc <= gc && gc <= bait.max_gc;

    segment.repeat_content_margin_up() <= params.max_repeat_content
        && segment.repeat_content_margin_down() <= params.max_repeat_content
        && gc_ok(segment.gc_content_margin_up())
        && gc_ok(segment.gc_content_margin_down())
}

/// Selects segments around `anchor` and places baits on the selected ones.
pub(crate) fn apply(
    segments: &mut [Segment],
    anchor: usize,
    position: Position,
    strand: &Strand,
    params: &Parameters,
    bait: &BaitParameters,
    track: &dyn AlignabilityTrack,
) {
    for segment in segments.iter_mut() {
        segment.reset();
    }

    let mut candidates = Vec::new();

    for (i, segment) in segments.iter_mut().enumerate() {
        if !in_region(segment, position, strand, params) {
            continue;
        }

        let qualifies = segment.length() >= params.min_frag_size
            && has_suitable_margins(segment, params, bait)
            && segment.place_baits(bait, track);

        if qualifies {
            candidates.push(i);
        } else {
            segment.set_selectable(false);
            segment.clear_baits();
        }
    }

    let weights = weights(segments, anchor, position, strand, params);

    let mut up = 0;
    let mut down = 0;

    if candidates.contains(&anchor) {
        let center = &mut segments[anchor];
        center.set_selected(true);

        let left = position - center.start();
        let right = center.end() - position + 1;

        (up, down) = match strand {
            Strand::Positive => (left, right),
            Strand::Negative => (right, left),
        };
    }

    for (side, mut accumulated) in [(Side::Upstream, up), (Side::Downstream, down)] {
        let mut ranked = candidates
            .iter()
            .copied()
            .filter(|i| *i != anchor && side_of(&segments[*i], position, strand) == side)
            .collect::<Vec<_>>();

        ranked.sort_by(|a, b| weights[*b].total_cmp(&weights[*a]).then(a.cmp(b)));

        for i in ranked {
            if accumulated >= params.size(side) {
                break;
            }

            segments[i].set_selected(true);
            accumulated += segments[i].length();
        }
    }

    for i in candidates {
        if !segments[i].is_selected() {
            segments[i].clear_baits();
        }
    }
}

/// Gets how close a value lies to an ideal, scaled so that `0` is returned
/// at `tolerance` away from it (or farther).
fn closeness(value: f64, ideal: f64, tolerance: f64) -> f64 {
    if tolerance <= 0.0 {
        return match value == ideal {
            true => 1.0,
            false => 0.0,
        };
    }

    (1.0 - (value - ideal).abs() / tolerance).max(0.0)
}

/// Gets the suitability of a segment for capture, from zero to one.
///
/// This is the mean of how close the GC content of the margins is to the
/// center of the allowed range, how close their repeat content is to zero,
/// and how close the alignability of the baits is to one (unique).
pub(crate) fn suitability(segment: &Segment, params: &Parameters, bait: &BaitParameters) -> f64 {
    let gc = (segment.gc_content_margin_up() + segment.gc_content_margin_down()) / 2.0;
    let repeat = (segment.repeat_content_margin_up() + segment.repeat_content_margin_down()) / 2.0;
    let alignability = segment.mean_alignability_of_baits();

    let gc = closeness(
        gc,
        (bait.min_gc + bait.max_gc) / 2.0,
        (bait.max_gc - bait.min_gc) / 2.0,
    );
    let repeat = closeness(repeat, 0.0, params.max_repeat_content);
    let alignability = match alignability.is_nan() {
        true => 0.0,
        false => closeness(alignability, 1.0, bait.max_mean_kmer_alignability - 1.0),
    };

    (gc + repeat + alignability) / 3.0
}

/// Scores the selection.
///
/// The score is the weighted suitability of the selected segments divided by
/// the total weight of the segments overlapping the considered region.
pub(crate) fn score(
    segments: &[Segment],
    anchor: usize,
    position: Position,
    strand: &Strand,
    params: &Parameters,
    bait: &BaitParameters,
) -> f64 {
    let weights = weights(segments, anchor, position, strand, params);

    let total = segments
        .iter()
        .zip(weights.iter())
        .filter(|(segment, _)| in_region(segment, position, strand, params))
        .map(|(_, weight)| weight)
        .sum::<f64>();

    if total <= 0.0 {
        return 0.0;
    }

    let selected = segments
        .iter()
        .zip(weights.iter())
        .filter(|(segment, _)| segment.is_selected())
        .map(|(segment, weight)| weight * suitability(segment, params, bait))
        .sum::<f64>();

    (selected / total).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::alignability::Uniform;

    /// Builds contiguous segments of the given lengths starting at position
    /// 1, using a GC-balanced sequence.
    fn segments_of(lengths: &[usize]) -> Vec<Segment> {
        let mut start = 1;

        lengths
            .iter()
            .map(|length| {
                let sequence = "ACGT".repeat(length / 4 + 1)[..*length].to_string();
                let segment = Segment::try_new("chr1", start, start + length - 1, 40, sequence)
                    .unwrap();
                start += length;
                segment
            })
            .collect()
    }

    fn bait_params() -> BaitParameters {
        BaitParameters {
            probe_length: 20,
            min_bait_count: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_closer_segments_weigh_more() {
        let segments = segments_of(&[500, 500, 500, 500, 500]);
        let weights = weights(
            &segments,
            2,
            1_250,
            &Strand::Positive,
            &Parameters::default(),
        );

        assert!(weights[2] > weights[1]);
        assert!(weights[1] > weights[0]);
        assert!(weights[3] > weights[4]);
        assert!((weights[1] - weights[3]).abs() < 1e-12);
    }

    #[test]
    fn test_selection_fills_each_side() {
        let mut segments = segments_of(&[300, 300, 300, 300, 300, 300, 300]);
        let params = Parameters {
            size_up: 500,
            size_down: 200,
            ..Default::default()
        };

        // The anchor is the fourth segment (positions 901..=1200).
        apply(&mut segments, 3, 1_000, &Strand::Positive, &params, &bait_params(), &Uniform);

        let selected = segments.iter().map(Segment::is_selected).collect::<Vec<_>>();
        assert_eq!(selected, vec![false, true, true, true, false, false, false]);

        let score = score(&segments, 3, 1_000, &Strand::Positive, &params, &bait_params());
        assert!(score > 0.0 && score <= 1.0);
    }

    #[test]
    fn test_selection_fills_each_side_on_the_negative_strand() {
        let mut segments = segments_of(&[300, 300, 300, 300, 300, 300, 300]);
        let params = Parameters {
            size_up: 500,
            size_down: 200,
            ..Default::default()
        };

        // Upstream lies toward higher coordinates, so the anchor segment
        // (positions 901..=1200) contributes 201 bases upstream and 99 bases
        // downstream.
        apply(&mut segments, 3, 1_000, &Strand::Negative, &params, &bait_params(), &Uniform);

        let selected = segments.iter().map(Segment::is_selected).collect::<Vec<_>>();
        assert_eq!(selected, vec![false, false, true, true, true, false, false]);

        assert_eq!(segments[2].bait_count(), 4);
        assert_eq!(segments[5].bait_count(), 0);

        let score = score(&segments, 3, 1_000, &Strand::Negative, &params, &bait_params());
        assert!(score > 0.0 && score <= 1.0);
    }

    #[test]
    fn test_unsuitable_segments_are_not_candidates() {
        let mut segments = segments_of(&[300, 100, 300]);
        let params = Parameters::default();

        apply(&mut segments, 0, 150, &Strand::Positive, &params, &bait_params(), &Uniform);

        assert!(segments[0].is_selected());
        assert!(!segments[1].is_selectable());
        assert!(!segments[1].is_selected());
        assert!(segments[2].is_selected());
        assert_eq!(segments[1].bait_count(), 0);
    }

    #[test]
    fn test_suitability() -> Result<(), Box<dyn std::error::Error>> {
        let params = Parameters::default();
        let bait = bait_params();

        // GC content 0.45 is the center of the default range.
        let sequence = "GCGCGCGCGAAAAAAAAAAA".repeat(10);
        let mut segment = Segment::try_new("chr1", 1, 200, 40, sequence)?;

        assert!((suitability(&segment, &params, &bait) - 2.0 / 3.0).abs() < 1e-9);

        segment.place_baits(&bait, &Uniform);
        assert!((suitability(&segment, &params, &bait) - 1.0).abs() < 1e-9);

        Ok(())
    }
}
