//! The simple ("Lupiáñez") selection strategy.
//!
//! Starting from the segment containing the transcription start site, a fixed
//! number of segments is taken on either side. Segments that are too short or
//! too repetitive are rejected; optionally, rejected segments are bridged
//! ("patched") so that the viewpoint stays contiguous.

use omics::coordinate::Strand;
use serde::Deserialize;
use serde::Serialize;

use crate::Position;
use crate::provider::AlignabilityTrack;
use crate::segment::BaitParameters;
use crate::segment::Segment;
use crate::viewpoint::Side;
use crate::viewpoint::outward;

/// The default number of segments taken upstream of the anchor segment.
pub const DEFAULT_FRAG_NUM_UP: usize = 1;

/// The default number of segments taken downstream of the anchor segment.
pub const DEFAULT_FRAG_NUM_DOWN: usize = 1;

/// The default minimum segment length.
pub const DEFAULT_MIN_FRAG_SIZE: usize = 130;

/// The default maximum repeat content.
pub const DEFAULT_MAX_REPEAT_CONTENT: f64 = 0.6;

/// The default distance from the anchor within which segments are derived.
pub const DEFAULT_MAX_DISTANCE: usize = 5_000;

/// The largest tolerated ratio between the longer and the shorter side of a
/// balanced viewpoint.
pub const MAX_SPAN_RATIO: f64 = 1.5;

/// The parameters of the simple strategy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// The number of segments taken upstream of the anchor segment.
    pub frag_num_up: usize,

    /// The number of segments taken downstream of the anchor segment.
    pub frag_num_down: usize,

    /// The minimum length of an accepted segment.
    pub min_frag_size: usize,

    /// The maximum repeat content of an accepted segment.
    pub max_repeat_content: f64,

    /// Whether rejected segments are bridged.
    pub allow_patching: bool,

    /// Whether the two sides of the viewpoint may differ in span.
    pub allow_unbalanced_margins: bool,

    /// The upstream distance within which segments are derived.
    pub max_distance_up: usize,

    /// The downstream distance within which segments are derived.
    pub max_distance_down: usize,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            frag_num_up: DEFAULT_FRAG_NUM_UP,
            frag_num_down: DEFAULT_FRAG_NUM_DOWN,
            min_frag_size: DEFAULT_MIN_FRAG_SIZE,
            max_repeat_content: DEFAULT_MAX_REPEAT_CONTENT,
            allow_patching: false,
            allow_unbalanced_margins: true,
            max_distance_up: DEFAULT_MAX_DISTANCE,
            max_distance_down: DEFAULT_MAX_DISTANCE,
        }
    }
}

impl Parameters {
    /// Gets whether a segment may be part of the viewpoint.
    fn accepts(&self, segment: &Segment) -> bool {
        segment.length() >= self.min_frag_size
            && segment.repeat_content() <= self.max_repeat_content
    }
}

/// Selects a segment if it is accepted and its margins carry enough baits;
/// otherwise, marks it unselectable (and patched when patching is allowed).
///
/// Returns whether the segment was selected.
fn examine(
    segment: &mut Segment,
    params: &Parameters,
    bait: &BaitParameters,
    track: &dyn AlignabilityTrack,
) -> bool {
    if params.accepts(segment) && segment.place_baits(bait, track) {
        segment.set_selected(true);
        return true;
    }

    segment.clear_baits();
    segment.set_selectable(false);
    segment.set_patched(params.allow_patching);
    false
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

    examine(&mut segments[anchor], params, bait, track);

    for (side, frag_num) in [
        (Side::Upstream, params.frag_num_up),
        (Side::Downstream, params.frag_num_down),
    ] {
        let mut accepted = 0;
        let mut examined = Vec::new();

        for index in outward(anchor, segments.len(), strand, side) {
            let done = match params.allow_patching {
                true => accepted == frag_num,
                false => examined.len() == frag_num,
            };

            if done {
                break;
            }

            examined.push(index);

            if examine(&mut segments[index], params, bait, track) {
                accepted += 1;
            }
        }

        unpatch_trailing(segments, &examined);
    }

    if !segments.iter().any(Segment::is_selected) {
        segments[anchor].set_patched(false);
    }

    if !params.allow_unbalanced_margins {
        balance(segments, anchor, position, strand);
    }

    for segment in segments.iter_mut().filter(|s| !s.is_selected()) {
        segment.clear_baits();
    }
}

/// Un-patches the patched segments beyond the outermost selected segment.
///
/// `indices` are ordered from the anchor outward.
fn unpatch_trailing(segments: &mut [Segment], indices: &[usize]) {
    for index in indices.iter().rev() {
        if segments[*index].is_selected() {
            break;
        }

        segments[*index].set_patched(false);
    }
}

/// Gets the distance from `position` to the outermost covered base on each
/// side of the anchor, as `(upstream, downstream)`.
fn spans(segments: &[Segment], position: Position, strand: &Strand) -> (usize, usize) {
    let covered = segments.iter().filter(|s| s.is_covered());

    let (left, right) = covered.fold((0, 0), |(left, right), segment| {
        (
            left.max(position.saturating_sub(segment.start())),
            right.max(segment.end().saturating_sub(position)),
        )
    });

    match strand {
        Strand::Positive => (left, right),
        Strand::Negative => (right, left),
    }
}

/// Trims the outermost covered segments of the longer side until the two
/// sides are balanced or trimming no longer helps.
fn balance(segments: &mut [Segment], anchor: usize, position: Position, strand: &Strand) {
    loop {
        let (up, down) = spans(segments, position, strand);

        let (side, longer, shorter) = match up >= down {
            true => (Side::Upstream, up, down),
            false => (Side::Downstream, down, up),
        };

        if longer as f64 <= MAX_SPAN_RATIO * shorter as f64 {
            return;
        }

        let order = outward(anchor, segments.len(), strand, side).collect::<Vec<_>>();

        let outermost = match order.iter().rev().find(|i| segments[**i].is_covered()) {
            Some(index) => *index,
            None => return,
        };

        let snapshot = segments
            .iter()
            .map(|s| (s.is_selected(), s.is_patched()))
            .collect::<Vec<_>>();

        segments[outermost].set_selected(false);
        segments[outermost].set_patched(false);
        unpatch_trailing(segments, &order);

        let (up, down) = spans(segments, position, strand);

        if up.abs_diff(down) >= longer - shorter {
            for (segment, (selected, patched)) in segments.iter_mut().zip(snapshot) {
                segment.set_selected(selected);
                segment.set_patched(patched);
            }

            return;
        }
    }
}

/// Scores the selection.
///
/// The score rewards the number of usable selected segments (relative to
/// the number requested) and a total usable length close to twice the mean
/// segment length of the window. With no usable segment, the score is zero.
pub(crate) fn score(segments: &[Segment], params: &Parameters) -> f64 {
    let usable = segments
        .iter()
        .filter(|s| s.is_selected() && s.has_usable_margins())
        .collect::<Vec<_>>();

    if usable.is_empty() {
        return 0.0;
    }

    let requested = (params.frag_num_up + params.frag_num_down + 1) as f64;
    let count = (usable.len() as f64 / requested).min(1.0);

    let total = segments.iter().map(Segment::length).sum::<usize>() as f64;
    let target = 2.0 * total / segments.len() as f64;
    let length = usable.iter().map(|s| s.length()).sum::<usize>() as f64;

    let deviation = (length - target) / target;
    count / (1.0 + deviation * deviation)
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
                let segment = Segment::try_new("chr1", start, start + length - 1, 20, sequence)
                    .unwrap();
                start += length;
                segment
            })
            .collect()
    }

    fn selected(segments: &[Segment]) -> Vec<bool> {
        segments.iter().map(Segment::is_selected).collect()
    }

    fn bait_params() -> BaitParameters {
        BaitParameters {
            probe_length: 20,
            min_bait_count: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_short_segment_is_unselectable_without_patching() {
        let mut segments = segments_of(&[200, 200, 50, 300, 200]);
        let params = Parameters::default();

        // The anchor is the second segment (positions 201..=400).
        apply(&mut segments, 1, 300, &Strand::Positive, &params, &bait_params(), &Uniform);

        assert_eq!(selected(&segments), vec![true, true, false, false, false]);
        assert!(!segments[2].is_selectable());
        assert!(!segments[2].is_patched());
    }

    #[test]
    fn test_patching_bridges_rejected_segments() {
        let mut segments = segments_of(&[200, 200, 50, 300, 60]);
        let params = Parameters {
            allow_patching: true,
            ..Default::default()
        };

        apply(&mut segments, 1, 300, &Strand::Positive, &params, &bait_params(), &Uniform);

        assert_eq!(selected(&segments), vec![true, true, false, true, false]);
        assert!(segments[2].is_patched());
        assert!(!segments[2].is_selectable());
        assert!(!segments[4].is_patched());
    }

    #[test]
    fn test_negative_strand_walks_upstream_toward_higher_coordinates() {
        let mut segments = segments_of(&[200, 200, 200, 200, 200]);
        let params = Parameters {
            frag_num_up: 2,
            frag_num_down: 0,
            ..Default::default()
        };

        apply(&mut segments, 1, 300, &Strand::Negative, &params, &bait_params(), &Uniform);

        assert_eq!(selected(&segments), vec![false, true, true, true, false]);
    }

    #[test]
    fn test_balancing_trims_the_longer_side() {
        let mut segments = segments_of(&[200, 200, 200, 1_000, 1_000]);
        let params = Parameters {
            frag_num_up: 1,
            frag_num_down: 2,
            allow_unbalanced_margins: false,
            ..Default::default()
        };

        apply(&mut segments, 1, 300, &Strand::Positive, &params, &bait_params(), &Uniform);

        // Upstream spans 299 bases; keeping the 1,000 base segments downstream
        // would be far longer.
        assert_eq!(selected(&segments), vec![true, true, true, false, false]);
    }

    #[test]
    fn test_segment_without_baits_is_unselectable() {
        let mut segments = segments_of(&[200, 200, 200]);
        segments[1] = Segment::try_new("chr1", 201, 400, 20, "A".repeat(200)).unwrap();

        let params = Parameters::default();

        apply(&mut segments, 1, 300, &Strand::Positive, &params, &bait_params(), &Uniform);

        assert_eq!(selected(&segments), vec![true, false, true]);
        assert!(!segments[1].is_selectable());
        assert!(!segments[1].is_patched());
        assert_eq!(segments[1].bait_count(), 0);
        assert!(segments[0].has_usable_margins());
    }

    #[test]
    fn test_segment_without_baits_is_patched() {
        let mut segments = segments_of(&[200, 200, 200, 200]);
        segments[2] = Segment::try_new("chr1", 401, 600, 20, "A".repeat(200)).unwrap();
        let params = Parameters {
            frag_num_up: 0,
            frag_num_down: 1,
            allow_patching: true,
            ..Default::default()
        };

        apply(&mut segments, 1, 300, &Strand::Positive, &params, &bait_params(), &Uniform);

        assert_eq!(selected(&segments), vec![false, true, false, true]);
        assert!(segments[2].is_patched());
        assert!(!segments[2].is_selectable());
    }

    #[test]
    fn test_score() {
        let mut segments = segments_of(&[200, 200, 200]);
        let params = Parameters::default();

        assert_eq!(score(&segments, &params), 0.0);

        apply(&mut segments, 1, 300, &Strand::Positive, &params, &bait_params(), &Uniform);

        // All three segments are usable; their length (600) is far from twice
        // the mean length (400).
        let expected = 1.0 / (1.0 + 0.5 * 0.5);
        assert!((score(&segments, &params) - expected).abs() < 1e-9);
    }
}
