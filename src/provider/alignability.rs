//! k-mer alignability tracks.
//!
//! Alignability is reported as the number of times the k-mer starting at a
//! position occurs in the genome. A value of `1` means the k-mer is unique;
//! larger values mean the k-mer is more repetitive and a probe containing it
//! is more likely to capture off-target sequence. Positions without data are
//! reported as [`None`].
//!
//! The UCSC mappability bedGraphs store `1 / occurrences` rather than the
//! occurrence count itself. [`BedGraph`] converts such values back into counts
//! when loading them.

use std::collections::HashMap;
use std::io::BufRead;
use std::io::{self};
use std::num::ParseFloatError;
use std::num::ParseIntError;
use std::path::Path;

use rust_lapper as lapper;

use crate::Position;
use crate::reader;

/// The delimiter for a bedGraph line.
const DELIMITER: char = '\t';

/// The number of expected fields in a bedGraph line.
pub const NUM_BEDGRAPH_FIELDS: usize = 4;

/// The prefixes of bedGraph lines that carry no data.
const HEADER_PREFIXES: &[&str] = &["track", "browser", "#"];

/// The inner value of the alignability lookup data structure.
type Iv = lapper::Interval<usize, u32>;

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error associated with parsing a bedGraph line.
#[derive(Debug)]
pub enum ParseError {
    /// An incorrect number of fields in the line.
    IncorrectNumberOfFields(usize),

    /// An invalid start position.
    InvalidStart(ParseIntError),

    /// An invalid end position.
    InvalidEnd(ParseIntError),

    /// An invalid value.
    InvalidValue(ParseFloatError),

    /// The end position is not after the start position.
    EmptyInterval(usize, usize),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::IncorrectNumberOfFields(n) => write!(
                f,
                "invalid number of fields in bedGraph line: expected {NUM_BEDGRAPH_FIELDS} \
                 fields, found {n} fields"
            ),
            ParseError::InvalidStart(err) => write!(f, "invalid start: {err}"),
            ParseError::InvalidEnd(err) => write!(f, "invalid end: {err}"),
            ParseError::InvalidValue(err) => write!(f, "invalid value: {err}"),
            ParseError::EmptyInterval(start, end) => {
                write!(f, "end ({end}) must be greater than start ({start})")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// An error related to loading an alignability track.
#[derive(Debug)]
pub enum Error {
    /// An I/O error.
    Io(io::Error),

    /// A parse error on a particular line.
    Parse(ParseError, usize),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "i/o error: {err}"),
            Error::Parse(err, line) => write!(f, "parse error: {err}\n\nline: {line}"),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////
// Tracks
////////////////////////////////////////////////////////////////////////////////////////

/// A range-query service for per-position k-mer alignability.
pub trait AlignabilityTrack: Send + Sync {
    /// Gets one alignability value per position of the 1-based, fully-closed
    /// interval `[start, end]`.
    ///
    /// The returned vector always has `end - start + 1` entries (or is empty
    /// when `end < start`). Positions without data are [`None`].
    fn scores(&self, contig: &str, start: Position, end: Position) -> Vec<Option<u32>>;

    /// Gets the mean of the defined alignability values within `[start,
    /// end]`, or [`None`] if no position has data.
    fn mean(&self, contig: &str, start: Position, end: Position) -> Option<f64> {
        let (sum, n) = self
            .scores(contig, start, end)
            .into_iter()
            .flatten()
            .fold((0u64, 0usize), |(sum, n), value| (sum + value as u64, n + 1));

        match n {
            0 => None,
            n => Some(sum as f64 / n as f64),
        }
    }
}

/// A track that reports every k-mer as unique.
///
/// This is useful when no alignability data is available for a genome: the
/// alignability filter then never rejects a probe.
#[derive(Clone, Copy, Debug, Default)]
pub struct Uniform;

impl AlignabilityTrack for Uniform {
    fn scores(&self, _: &str, start: Position, end: Position) -> Vec<Option<u32>> {
        match end >= start {
            true => vec![Some(1); end - start + 1],
            false => Vec::new(),
        }
    }
}

/// An alignability track loaded from a bedGraph file.
///
/// Each contig is stored as an interval tree keyed on 1-based, half-open
/// positions.
#[derive(Debug, Default)]
pub struct BedGraph {
    /// The lookup table of positions to alignability values for each contig.
    inner: HashMap<String, lapper::Lapper<usize, u32>>,
}

impl BedGraph {
    /// Loads a (possibly gzipped) bedGraph from a path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let track = Self::from_reader(reader::open(path).map_err(Error::Io)?)?;
        tracing::debug!("loaded alignability for {} contigs", track.inner.len());
        Ok(track)
    }

    /// Loads a bedGraph from a buffered reader.
    ///
    /// Values in `(0, 1]` are interpreted as `1 / occurrences` (the UCSC
    /// mappability convention) and converted to counts. Values greater than
    /// one are taken to be counts already. Non-positive values (including the
    /// `-1` "no data" sentinel) are skipped.
    ///
    /// # Examples
    ///
    /// ```
    /// use viewpoints::provider::AlignabilityTrack;
    /// use viewpoints::provider::alignability::BedGraph;
    ///
    /// let data = b"chr1\t0\t2\t1\nchr1\t2\t4\t0.25\nchr1\t4\t5\t-1\n";
    /// let track = BedGraph::from_reader(&data[..])?;
    ///
    /// assert_eq!(
    ///     track.scores("chr1", 1, 6),
    ///     vec![Some(1), Some(1), Some(4), Some(4), None, None]
    /// );
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_reader<T>(inner: T) -> Result<Self>
    where
        T: BufRead,
    {
        let mut hm = HashMap::<String, Vec<Iv>>::default();

        for result in reader::lines(inner) {
            let (number, line) = result.map_err(Error::Io)?;

            if HEADER_PREFIXES
                .iter()
                .any(|prefix| line.starts_with(prefix))
            {
                continue;
            }

            let (contig, interval) =
                parse_line(&line).map_err(|err| Error::Parse(err, number))?;

            if let Some(interval) = interval {
                hm.entry(contig.to_string()).or_default().push(interval);
            }
        }

        let mut inner = HashMap::<String, lapper::Lapper<usize, u32>>::new();

        for (k, v) in hm.into_iter() {
            inner.insert(k, lapper::Lapper::new(v));
        }

        Ok(Self { inner })
    }
}

/// Parses a single bedGraph line into its contig and (optional) interval.
fn parse_line(line: &str) -> std::result::Result<(&str, Option<Iv>), ParseError> {
    let fields = line.split(DELIMITER).collect::<Vec<_>>();

    if fields.len() != NUM_BEDGRAPH_FIELDS {
        return Err(ParseError::IncorrectNumberOfFields(fields.len()));
    }

    let start = fields[1]
        .parse::<usize>()
        .map_err(ParseError::InvalidStart)?;
    let end = fields[2].parse::<usize>().map_err(ParseError::InvalidEnd)?;
    let value = fields[3]
        .trim()
        .parse::<f64>()
        .map_err(ParseError::InvalidValue)?;

    if end <= start {
        return Err(ParseError::EmptyInterval(start, end));
    }

    let count = match value {
        v if v <= 0.0 || !v.is_finite() => return Ok((fields[0], None)),
        v if v <= 1.0 => (1.0 / v).round().max(1.0) as u32,
        v => v.round() as u32,
    };

    // NOTE: bedGraph intervals are 0-based and half-open. Shifting both ends
    // by one gives the 1-based, half-open interval covering the same bases.
    Ok((
        fields[0],
        Some(lapper::Interval {
            start: start + 1,
            stop: end + 1,
            val: count,
        }),
    ))
}

impl AlignabilityTrack for BedGraph {
    fn scores(&self, contig: &str, start: Position, end: Position) -> Vec<Option<u32>> {
        if end < start {
            return Vec::new();
        }

        let mut scores = vec![None; end - start + 1];

        let entry = match self.inner.get(contig) {
            Some(entry) => entry,
            None => return scores,
        };

        for interval in entry.find(start, end + 1) {
            let from = interval.start.max(start);
            let to = interval.stop.min(end + 1);

            for position in from..to {
                scores[position - start] = Some(interval.val);
            }
        }

        scores
    }
}
