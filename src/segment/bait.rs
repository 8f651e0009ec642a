//! Hybridization probes ("baits") placed within segment margins.

use serde::Deserialize;
use serde::Serialize;

use crate::Position;
use crate::interval;
use crate::interval::Bounds as _;
use crate::interval::Interval;
use crate::provider::AlignabilityTrack;
use crate::segment::Margin;
use crate::segment::gc_fraction;
use crate::segment::repeat_fraction;

/// The default probe length.
pub const DEFAULT_PROBE_LENGTH: usize = 120;

/// The default minimum number of baits required for a margin to be usable.
pub const DEFAULT_MIN_BAIT_COUNT: usize = 2;

/// The default minimum GC content of a bait.
pub const DEFAULT_MIN_GC: f64 = 0.25;

/// The default maximum GC content of a bait.
pub const DEFAULT_MAX_GC: f64 = 0.65;

/// The default maximum mean k-mer alignability of a bait.
pub const DEFAULT_MAX_MEAN_KMER_ALIGNABILITY: f64 = 10.0;

/// Panel-wide parameters governing where baits may be placed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BaitParameters {
    /// The length of each probe.
    pub probe_length: usize,

    /// The minimum number of qualifying probes for a margin to be usable.
    pub min_bait_count: usize,

    /// The minimum GC content of a qualifying probe.
    pub min_gc: f64,

    /// The maximum GC content of a qualifying probe.
    pub max_gc: f64,

    /// The maximum mean k-mer alignability of a qualifying probe.
    pub max_mean_kmer_alignability: f64,
}

impl Default for BaitParameters {
    fn default() -> Self {
        Self {
            probe_length: DEFAULT_PROBE_LENGTH,
            min_bait_count: DEFAULT_MIN_BAIT_COUNT,
            min_gc: DEFAULT_MIN_GC,
            max_gc: DEFAULT_MAX_GC,
            max_mean_kmer_alignability: DEFAULT_MAX_MEAN_KMER_ALIGNABILITY,
        }
    }
}

/// The end of a margin from which probes are tiled.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Anchor {
    /// Tile forward from the start of the margin.
    Start,

    /// Tile backward from the end of the margin.
    End,
}

/// A probe placed within a segment margin.
#[derive(Clone, Debug, PartialEq)]
pub struct Bait {
    /// The interval covered by the probe.
    interval: Interval,

    /// The fraction of G or C bases.
    gc_content: f64,

    /// The fraction of repeat-masked (lowercase) bases.
    repeat_content: f64,

    /// The mean k-mer alignability.
    alignability: f64,
}

impl Bait {
    /// Creates a new [`Bait`].
    ///
    /// # Examples
    ///
    /// ```
    /// use viewpoints::interval;
    /// use viewpoints::segment::Bait;
    ///
    /// let bait = Bait::new(interval::try_new("chr1", 101, 220)?, 0.5, 0.1, 1.0);
    /// assert_eq!(bait.start(), 101);
    /// assert_eq!(bait.length(), 120);
    /// assert_eq!(bait.gc_content(), 0.5);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(
        interval: Interval,
        gc_content: f64,
        repeat_content: f64,
        alignability: f64,
    ) -> Self {
        Self {
            interval,
            gc_content,
            repeat_content,
            alignability,
        }
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

    /// Gets the GC content.
    pub fn gc_content(&self) -> f64 {
        self.gc_content
    }

    /// Gets the repeat content.
    pub fn repeat_content(&self) -> f64 {
        self.repeat_content
    }

    /// Gets the mean k-mer alignability.
    pub fn alignability(&self) -> f64 {
        self.alignability
    }
}

/// Gets the coordinates of the non-overlapping probe windows that fit within
/// a margin, ordered from the anchored end inward.
pub(crate) fn tile(
    margin: &Margin,
    probe_length: usize,
    anchor: Anchor,
) -> Vec<(Position, Position)> {
    if probe_length == 0 {
        return Vec::new();
    }

    let n = margin.length() / probe_length;

    (0..n)
        .map(|i| match anchor {
            Anchor::Start => {
                let start = margin.start() + i * probe_length;
                (start, start + probe_length - 1)
            }
            Anchor::End => {
                let end = margin.end() - i * probe_length;
                (end + 1 - probe_length, end)
            }
        })
        .collect()
}

/// Places the qualifying baits within a margin.
///
/// `sequence` is the sequence of the owning segment, which starts at
/// `segment_start`.
pub(crate) fn place(
    sequence: &str,
    segment_start: Position,
    margin: &Margin,
    anchor: Anchor,
    params: &BaitParameters,
    track: &dyn AlignabilityTrack,
) -> Vec<Bait> {
    let contig = margin.interval().contig().as_str();

    tile(margin, params.probe_length, anchor)
        .into_iter()
        .filter_map(|(start, end)| {
            let bases = sequence.get(start - segment_start..end - segment_start + 1)?;

            if bases.bytes().any(|b| b.eq_ignore_ascii_case(&b'N')) {
                return None;
            }

            let gc = gc_fraction(bases);

            if gc < params.min_gc || gc > params.max_gc {
                return None;
            }

            let alignability = track.mean(contig, start, end)?;

            if alignability > params.max_mean_kmer_alignability {
                return None;
            }

            let interval = interval::try_new(contig, start, end).ok()?;
            Some(Bait::new(interval, gc, repeat_fraction(bases), alignability))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::alignability::Uniform;

    #[test]
    fn test_tiling_hugs_the_anchored_end() -> Result<(), Box<dyn std::error::Error>> {
        let margin = Margin::try_new("chr1", 101, 350)?;

        assert_eq!(
            tile(&margin, 120, Anchor::Start),
            vec![(101, 220), (221, 340)]
        );
        assert_eq!(
            tile(&margin, 120, Anchor::End),
            vec![(231, 350), (111, 230)]
        );
        assert!(tile(&margin, 300, Anchor::Start).is_empty());

        Ok(())
    }

    #[test]
    fn test_place_filters_unsuitable_windows() -> Result<(), Box<dyn std::error::Error>> {
        // Three ten-base windows: balanced GC, an `N`, and pure AT.
        let sequence = "ACGTACGTAC".to_string() + "ACGTNCGTAC" + "AAAAAAAAAA";
        let margin = Margin::try_new("chr1", 1, 30)?;
        let params = BaitParameters {
            probe_length: 10,
            ..Default::default()
        };

        let baits = place(&sequence, 1, &margin, Anchor::Start, &params, &Uniform);

        assert_eq!(baits.len(), 1);
        assert_eq!((baits[0].start(), baits[0].end()), (1, 10));
        assert_eq!(baits[0].interval().contig().as_str(), "chr1");
        assert_eq!(baits[0].gc_content(), 0.5);
        assert_eq!(baits[0].alignability(), 1.0);

        Ok(())
    }

    #[test]
    fn test_deserialize_with_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let params = serde_json::from_str::<BaitParameters>(r#"{ "probe_length": 80 }"#)?;

        assert_eq!(params.probe_length, 80);
        assert_eq!(params.min_bait_count, DEFAULT_MIN_BAIT_COUNT);
        assert_eq!(params.max_gc, DEFAULT_MAX_GC);

        Ok(())
    }
}
