//! Transcription start site lookup by gene symbol.

use std::collections::HashMap;
use std::io::BufRead;
use std::io::{self};
use std::num::ParseIntError;
use std::path::Path;

use omics::coordinate::Strand;

use crate::Position;
use crate::reader;

/// The delimiter for a `refGene` line.
const DELIMITER: char = '\t';

/// The minimum number of fields in a `refGene` line (through `name2`).
pub const NUM_REFGENE_FIELDS: usize = 13;

/// A transcription start site.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TranscriptionStartSite {
    /// The contig.
    contig: String,

    /// The 1-based position of the first transcribed base.
    position: Position,

    /// The strand of the transcript.
    strand: Strand,

    /// The accession of the (first) transcript that starts here.
    accession: String,
}

impl TranscriptionStartSite {
    /// Creates a new [`TranscriptionStartSite`].
    pub fn new(
        contig: impl Into<String>,
        position: Position,
        strand: Strand,
        accession: impl Into<String>,
    ) -> Self {
        Self {
            contig: contig.into(),
            position,
            strand,
            accession: accession.into(),
        }
    }

    /// Gets the contig.
    pub fn contig(&self) -> &str {
        &self.contig
    }

    /// Gets the 1-based position.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Gets the strand.
    pub fn strand(&self) -> &Strand {
        &self.strand
    }

    /// Gets the transcript accession.
    pub fn accession(&self) -> &str {
        &self.accession
    }
}

/// A source of transcription start sites for genes.
pub trait GeneTranscriptSource: Send + Sync {
    /// Gets the distinct transcription start sites of a gene, sorted by
    /// position. An unknown gene yields an empty list.
    fn tss_list(&self, gene_symbol: &str) -> Vec<TranscriptionStartSite>;
}

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error associated with parsing a `refGene` line.
#[derive(Debug)]
pub enum ParseError {
    /// An incorrect number of fields.
    IncorrectNumberOfFields(usize),

    /// An invalid strand.
    InvalidStrand(String),

    /// An invalid transcription start.
    InvalidTxStart(ParseIntError),

    /// An invalid transcription end.
    InvalidTxEnd(ParseIntError),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::IncorrectNumberOfFields(n) => write!(
                f,
                "invalid number of fields in refGene line: expected at least \
                 {NUM_REFGENE_FIELDS} fields, found {n} fields"
            ),
            ParseError::InvalidStrand(strand) => write!(f, "invalid strand: {strand}"),
            ParseError::InvalidTxStart(err) => write!(f, "invalid txStart: {err}"),
            ParseError::InvalidTxEnd(err) => write!(f, "invalid txEnd: {err}"),
        }
    }
}

impl std::error::Error for ParseError {}

/// An error related to loading transcripts.
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
// RefGene
////////////////////////////////////////////////////////////////////////////////////////

/// Transcription start sites loaded from a UCSC `refGene.txt` table.
#[derive(Clone, Debug, Default)]
pub struct RefGene {
    /// The transcription start sites keyed by gene symbol.
    genes: HashMap<String, Vec<TranscriptionStartSite>>,
}

impl RefGene {
    /// Loads a (possibly gzipped) `refGene.txt` table from a path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let source = Self::from_reader(reader::open(path).map_err(Error::Io)?)?;
        tracing::debug!("loaded transcripts for {} genes", source.genes.len());
        Ok(source)
    }

    /// Loads a `refGene.txt` table from a buffered reader.
    ///
    /// Transcripts sharing a start site are collapsed into one
    /// [`TranscriptionStartSite`] that carries the first accession seen.
    ///
    /// # Examples
    ///
    /// ```
    /// use viewpoints::provider::GeneTranscriptSource;
    /// use viewpoints::provider::transcript::RefGene;
    ///
    /// let data = b"0\tNM_1\tchr1\t+\t99\t500\t0\t0\t1\t99,\t500,\t0\tFOO\n\
    ///              0\tNM_2\tchr1\t-\t99\t800\t0\t0\t1\t99,\t800,\t0\tFOO\n";
    /// let source = RefGene::from_reader(&data[..])?;
    ///
    /// let sites = source.tss_list("FOO");
    /// assert_eq!(sites.len(), 2);
    /// assert_eq!(sites[0].position(), 100);
    /// assert_eq!(sites[0].accession(), "NM_1");
    /// assert_eq!(sites[1].position(), 800);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_reader<T>(inner: T) -> Result<Self>
    where
        T: BufRead,
    {
        let mut genes = HashMap::<String, Vec<TranscriptionStartSite>>::new();

        for result in reader::lines(inner) {
            let (number, line) = result.map_err(Error::Io)?;

            if line.starts_with('#') {
                continue;
            }

            let (symbol, site) = parse_line(&line).map_err(|err| Error::Parse(err, number))?;
            let sites = genes.entry(symbol.to_string()).or_default();

            let duplicate = sites.iter().any(|existing| {
                existing.contig == site.contig
                    && existing.position == site.position
                    && existing.strand == site.strand
            });

            if !duplicate {
                sites.push(site);
            }
        }

        for sites in genes.values_mut() {
            sites.sort_by(|a, b| {
                a.contig
                    .cmp(&b.contig)
                    .then(a.position.cmp(&b.position))
            });
        }

        Ok(Self { genes })
    }

    /// Gets the gene symbols known to this source, sorted.
    pub fn genes(&self) -> Vec<&str> {
        let mut genes = self.genes.keys().map(String::as_str).collect::<Vec<_>>();
        genes.sort_unstable();
        genes
    }
}

/// Parses a `refGene` line into its gene symbol and start site.
fn parse_line(line: &str) -> std::result::Result<(&str, TranscriptionStartSite), ParseError> {
    let fields = line.split(DELIMITER).collect::<Vec<_>>();

    if fields.len() < NUM_REFGENE_FIELDS {
        return Err(ParseError::IncorrectNumberOfFields(fields.len()));
    }

    let strand = match fields[3] {
        "+" => Strand::Positive,
        "-" => Strand::Negative,
        other => return Err(ParseError::InvalidStrand(other.to_string())),
    };

    let tx_start = fields[4]
        .parse::<usize>()
        .map_err(ParseError::InvalidTxStart)?;
    let tx_end = fields[5]
        .parse::<usize>()
        .map_err(ParseError::InvalidTxEnd)?;

    // NOTE: `txStart` is 0-based and `txEnd` is 1-based (exclusive in 0-based
    // terms), so the first transcribed base is `txStart + 1` on the positive
    // strand and `txEnd` on the negative strand.
    let position = match strand {
        Strand::Positive => tx_start + 1,
        Strand::Negative => tx_end,
    };

    Ok((
        fields[12],
        TranscriptionStartSite::new(fields[2], position, strand, fields[1]),
    ))
}

impl GeneTranscriptSource for RefGene {
    fn tss_list(&self, gene_symbol: &str) -> Vec<TranscriptionStartSite> {
        self.genes.get(gene_symbol).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_shared_start_sites() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let data = b"585\tNM_1\tchr2\t+\t999\t5000\t0\t0\t1\t0,\t0,\t0\tBAR\n\
                     585\tNM_2\tchr2\t+\t999\t6000\t0\t0\t1\t0,\t0,\t0\tBAR\n\
                     585\tNM_3\tchr2\t+\t1999\t6000\t0\t0\t1\t0,\t0,\t0\tBAR\n";
        let source = RefGene::from_reader(&data[..])?;

        let sites = source.tss_list("BAR");
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0], TranscriptionStartSite::new("chr2", 1000, Strand::Positive, "NM_1"));
        assert_eq!(sites[1].position(), 2000);
        assert!(source.tss_list("BAZ").is_empty());
        assert_eq!(source.genes(), vec!["BAR"]);

        Ok(())
    }

    #[test]
    fn test_invalid_strand() {
        let data = b"585\tNM_1\tchr2\t?\t999\t5000\t0\t0\t1\t0,\t0,\t0\tBAR\n";
        let err = RefGene::from_reader(&data[..]).unwrap_err();

        assert_eq!(err.to_string(), "parse error: invalid strand: ?\n\nline: 1");
    }

    #[test]
    fn test_too_few_fields() {
        let data = b"585\tNM_1\tchr2\n";
        let err = RefGene::from_reader(&data[..]).unwrap_err();

        assert!(matches!(
            err,
            Error::Parse(ParseError::IncorrectNumberOfFields(3), 1)
        ));
    }
}
