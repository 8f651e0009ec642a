//! Random-access reference sequence providers.
//!
//! Sequences are returned exactly as they are stored in the reference, which
//! means that soft-masked (repeat) bases are lowercase. The engine relies on
//! this to compute repeat content, so implementations must never change the
//! case of the returned bases.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::io::{self};
use std::path::Path;
use std::path::PathBuf;

use noodles::core::Region;
use noodles::fasta;
use noodles::fasta::fai;

use crate::Position;

/// The extension appended to a FASTA path to locate its index.
pub const FASTA_INDEX_EXTENSION: &str = "fai";

/// An error related to a [`SequenceProvider`].
#[derive(Debug)]
pub enum Error {
    /// An I/O error.
    Io(io::Error),

    /// The requested contig does not exist.
    UnknownContig(String),

    /// The requested interval does not fall within the contig.
    OutOfBounds {
        /// The contig.
        contig: String,
        /// The requested start.
        start: Position,
        /// The requested end.
        end: Position,
        /// The length of the contig.
        length: usize,
    },

    /// The sequence read from disk was not valid UTF-8.
    InvalidUtf8,

    /// Fewer bases than requested could be read from the FASTA.
    TruncatedSequence(usize, usize),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "i/o error: {err}"),
            Error::UnknownContig(contig) => write!(f, "unknown contig: {contig}"),
            Error::OutOfBounds {
                contig,
                start,
                end,
                length,
            } => write!(
                f,
                "interval {contig}:{start}-{end} falls outside of the contig (length {length})"
            ),
            Error::InvalidUtf8 => write!(f, "sequence is not valid UTF-8"),
            Error::TruncatedSequence(expected, found) => write!(
                f,
                "truncated sequence: expected {expected} bases, found {found} bases"
            ),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// A random-access reader of reference sequence.
pub trait SequenceProvider: Send + Sync {
    /// Gets the length of a contig, if the contig exists.
    fn contig_length(&self, contig: &str) -> Option<usize>;

    /// Gets the (mixed-case) sequence for the 1-based, fully-closed interval
    /// `[start, end]` on `contig`.
    fn subsequence(&self, contig: &str, start: Position, end: Position) -> Result<String>;
}

/// Checks that `[start, end]` is a valid, 1-based interval on a contig of the
/// given length.
fn check_bounds(contig: &str, start: Position, end: Position, length: usize) -> Result<()> {
    if start == 0 || start > end || end > length {
        return Err(Error::OutOfBounds {
            contig: contig.to_string(),
            start,
            end,
            length,
        });
    }

    Ok(())
}

////////////////////////////////////////////////////////////////////////////////////////
// In-memory sequences
////////////////////////////////////////////////////////////////////////////////////////

/// A sequence provider that keeps every contig in memory.
#[derive(Clone, Debug, Default)]
pub struct InMemory {
    /// The contigs by name.
    contigs: HashMap<String, String>,
}

impl InMemory {
    /// Adds a contig to the provider, replacing any contig with the same name.
    ///
    /// # Examples
    ///
    /// ```
    /// use viewpoints::provider::SequenceProvider;
    /// use viewpoints::provider::sequence::InMemory;
    ///
    /// let provider = InMemory::default().with_contig("chr1", "ACgtAC");
    /// assert_eq!(provider.subsequence("chr1", 2, 4)?, "Cgt");
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn with_contig(mut self, name: impl Into<String>, sequence: impl Into<String>) -> Self {
        self.contigs.insert(name.into(), sequence.into());
        self
    }

    /// Loads every record of a FASTA file into memory.
    pub fn from_fasta(path: impl AsRef<Path>) -> Result<Self> {
        let mut contigs = HashMap::new();

        for result in fasta::io::reader::Builder
            .build_from_path(path.as_ref())
            .map_err(Error::Io)?
            .records()
        {
            let record = result.map_err(Error::Io)?;
            let name = String::from_utf8_lossy(record.name()).to_string();
            let sequence = String::from_utf8(record.sequence().as_ref().to_vec())
                .map_err(|_| Error::InvalidUtf8)?;
            contigs.insert(name, sequence);
        }

        tracing::debug!("loaded {} contigs into memory", contigs.len());
        Ok(Self { contigs })
    }
}

impl SequenceProvider for InMemory {
    fn contig_length(&self, contig: &str) -> Option<usize> {
        self.contigs.get(contig).map(|sequence| sequence.len())
    }

    fn subsequence(&self, contig: &str, start: Position, end: Position) -> Result<String> {
        let sequence = self
            .contigs
            .get(contig)
            .ok_or_else(|| Error::UnknownContig(contig.to_string()))?;

        check_bounds(contig, start, end, sequence.len())?;

        sequence
            .get(start - 1..end)
            .map(str::to_string)
            .ok_or(Error::InvalidUtf8)
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Indexed FASTA
////////////////////////////////////////////////////////////////////////////////////////

/// A sequence provider backed by a FASTA file and its `samtools faidx` index.
///
/// Each query opens its own file handle, so a single provider can safely be
/// queried from many threads at once.
#[derive(Clone, Debug)]
pub struct IndexedFasta {
    /// The path to the FASTA file.
    path: PathBuf,

    /// The index.
    index: fai::Index,

    /// The contig lengths by name.
    lengths: HashMap<String, usize>,
}

impl IndexedFasta {
    /// Opens a FASTA file using the index located at `<path>.fai`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut index_path = path.clone().into_os_string();
        index_path.push(".");
        index_path.push(FASTA_INDEX_EXTENSION);

        let index = fai::read(PathBuf::from(index_path)).map_err(Error::Io)?;

        let lengths = index
            .as_ref()
            .iter()
            .map(|record| {
                let name = String::from_utf8_lossy(record.name()).to_string();
                (name, record.length() as usize)
            })
            .collect::<HashMap<_, _>>();

        tracing::debug!("opened indexed FASTA with {} contigs", lengths.len());

        Ok(Self {
            path,
            index,
            lengths,
        })
    }
}

impl SequenceProvider for IndexedFasta {
    fn contig_length(&self, contig: &str) -> Option<usize> {
        self.lengths.get(contig).copied()
    }

    fn subsequence(&self, contig: &str, start: Position, end: Position) -> Result<String> {
        let length = self
            .contig_length(contig)
            .ok_or_else(|| Error::UnknownContig(contig.to_string()))?;

        check_bounds(contig, start, end, length)?;

        let out_of_bounds = |_| Error::OutOfBounds {
            contig: contig.to_string(),
            start,
            end,
            length,
        };

        let region = Region::new(
            contig,
            noodles::core::Position::try_from(start).map_err(out_of_bounds)?
                ..=noodles::core::Position::try_from(end).map_err(out_of_bounds)?,
        );

        let mut reader = File::open(&self.path)
            .map(BufReader::new)
            .map(fasta::io::Reader::new)
            .map_err(Error::Io)?;

        let record = reader.query(&self.index, &region).map_err(Error::Io)?;
        let bases = record.sequence().as_ref();
        let expected = end - start + 1;

        if bases.len() != expected {
            return Err(Error::TruncatedSequence(expected, bases.len()));
        }

        String::from_utf8(bases.to_vec()).map_err(|_| Error::InvalidUtf8)
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    #[test]
    fn test_in_memory_subsequence() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let provider = InMemory::default().with_contig("chr1", "aaCCGGtt");

        assert_eq!(provider.contig_length("chr1"), Some(8));
        assert_eq!(provider.subsequence("chr1", 1, 8)?, "aaCCGGtt");
        assert_eq!(provider.subsequence("chr1", 3, 6)?, "CCGG");

        Ok(())
    }

    #[test]
    fn test_in_memory_rejects_out_of_bounds() {
        let provider = InMemory::default().with_contig("chr1", "ACGT");

        let err = provider.subsequence("chr1", 0, 2).unwrap_err();
        assert_eq!(
            err.to_string(),
            "interval chr1:0-2 falls outside of the contig (length 4)"
        );

        let err = provider.subsequence("chr1", 2, 5).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { .. }));

        let err = provider.subsequence("chr2", 1, 2).unwrap_err();
        assert_eq!(err.to_string(), "unknown contig: chr2");
    }

    #[test]
    fn test_indexed_fasta_spans_lines() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new("viewpoints-fasta")?;
        let path = dir.path().join("genome.fa");

        // Four bases per line.
        std::fs::write(&path, ">chr1\nACGT\nacgt\nGG\n>chr2\nTTTT\n")?;
        std::fs::write(
            dir.path().join("genome.fa.fai"),
            "chr1\t10\t6\t4\t5\nchr2\t4\t25\t4\t5\n",
        )?;

        let provider = IndexedFasta::open(&path)?;

        assert_eq!(provider.contig_length("chr1"), Some(10));
        assert_eq!(provider.subsequence("chr1", 1, 10)?, "ACGTacgtGG");
        assert_eq!(provider.subsequence("chr1", 3, 6)?, "GTac");
        assert_eq!(provider.subsequence("chr2", 2, 3)?, "TT");
        assert!(provider.subsequence("chr1", 9, 11).is_err());

        Ok(())
    }

    #[test]
    fn test_indexed_fasta_rejects_malformed_index(
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new("viewpoints-fasta")?;
        let path = dir.path().join("genome.fa");

        std::fs::write(&path, ">chr1\nACGT\n")?;
        std::fs::write(dir.path().join("genome.fa.fai"), "chr1\t4\t6\t4\n")?;

        let err = IndexedFasta::open(&path).unwrap_err();
        assert!(matches!(err, Error::Io(_)));

        Ok(())
    }
}
