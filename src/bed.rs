//! Exporting designs as BED.
//!
//! Every interval within the crate is 1-based and fully-closed. BED
//! intervals are 0-based and half-open, so a record is built from the
//! equivalent interbase interval within [`Record::from_interval`].

use std::collections::HashSet;
use std::io::Write;
use std::io::{self};

use omics::coordinate::position::Number;

use crate::interval::Interval;
use crate::viewpoint::ViewPoint;

/// The delimiter between fields of a BED line.
const DELIMITER: char = '\t';

/// A BED record with a name.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Record {
    /// The contig.
    contig: String,

    /// The 0-based start.
    start: Number,

    /// The 0-based, exclusive end.
    end: Number,

    /// The label.
    label: String,
}

impl Record {
    /// Creates a record from a 1-based, fully-closed interval.
    ///
    /// # Examples
    ///
    /// ```
    /// use viewpoints::bed::Record;
    /// use viewpoints::interval;
    ///
    /// let record = Record::from_interval(&interval::try_new("chr1", 101, 200)?, "GENE");
    /// assert_eq!(record.start(), 100);
    /// assert_eq!(record.end(), 200);
    /// assert_eq!(record.to_string(), "chr1\t100\t200\tGENE");
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_interval(interval: &Interval, label: impl Into<String>) -> Self {
        let interval = interval.clone().into_equivalent_interbase();

        Self {
            contig: interval.contig().to_string(),
            start: interval.start().position().get(),
            end: interval.end().position().get(),
            label: label.into(),
        }
    }

    /// Gets the contig.
    pub fn contig(&self) -> &str {
        &self.contig
    }

    /// Gets the 0-based start.
    pub fn start(&self) -> Number {
        self.start
    }

    /// Gets the 0-based, exclusive end.
    pub fn end(&self) -> Number {
        self.end
    }

    /// Gets the label.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{DELIMITER}{}{DELIMITER}{}{DELIMITER}{}",
            self.contig, self.start, self.end, self.label
        )
    }
}

/// Gets the label of a viewpoint (`GENE_promoter/total`).
fn label(viewpoint: &ViewPoint) -> String {
    format!(
        "{}_{}/{}",
        viewpoint.target_name(),
        viewpoint.promoter_number(),
        viewpoint.total_promoter_count()
    )
}

/// Writes records, skipping any record already written by this call.
fn write_unique<W, I>(writer: &mut W, records: I) -> io::Result<usize>
where
    W: Write,
    I: IntoIterator<Item = Record>,
{
    let mut seen = HashSet::new();
    let mut n = 0;

    for record in records {
        let key = (record.contig.clone(), record.start, record.end);

        if seen.insert(key) {
            writeln!(writer, "{record}")?;
            n += 1;
        }
    }

    Ok(n)
}

/// Writes the extent of every resolved viewpoint.
///
/// Returns the number of written lines.
pub fn write_viewpoints<W: Write>(writer: &mut W, viewpoints: &[ViewPoint]) -> io::Result<usize> {
    let mut n = 0;

    for viewpoint in viewpoints.iter().filter(|v| v.is_resolved()) {
        let record = Record::from_interval(&viewpoint.interval(), label(viewpoint));

        writeln!(writer, "{record}")?;
        n += 1;
    }

    Ok(n)
}

/// Writes every distinct selected segment.
///
/// Returns the number of written lines.
pub fn write_active_segments<W: Write>(
    writer: &mut W,
    viewpoints: &[ViewPoint],
) -> io::Result<usize> {
    let records = viewpoints.iter().flat_map(|viewpoint| {
        viewpoint
            .active_segments()
            .into_iter()
            .map(move |segment| Record::from_interval(segment.interval(), label(viewpoint)))
    });

    write_unique(writer, records)
}

/// Writes every distinct usable margin of the selected segments.
///
/// Returns the number of written lines.
pub fn write_unique_margins<W: Write>(
    writer: &mut W,
    viewpoints: &[ViewPoint],
) -> io::Result<usize> {
    let mut records = Vec::new();

    for viewpoint in viewpoints {
        for segment in viewpoint.active_segments() {
            for margin in segment.usable_margins() {
                records.push(Record::from_interval(margin.interval(), label(viewpoint)));
            }
        }
    }

    write_unique(writer, records)
}

/// Writes every distinct bait of the selected segments.
///
/// Returns the number of written lines.
pub fn write_baits<W: Write>(writer: &mut W, viewpoints: &[ViewPoint]) -> io::Result<usize> {
    let mut records = Vec::new();

    for viewpoint in viewpoints {
        for segment in viewpoint.active_segments() {
            for bait in segment.baits() {
                records.push(Record::from_interval(bait.interval(), label(viewpoint)));
            }
        }
    }

    write_unique(writer, records)
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

    fn viewpoints() -> Result<Vec<ViewPoint>, Box<dyn std::error::Error>> {
        // Cut sites every 200 bases in a GC-balanced sequence.
        let sequence = ("GATC".to_string() + &"ACGT".repeat(49)).repeat(10);
        let provider = InMemory::default().with_contig("chr1", sequence);
        let enzymes = enzyme::resolve(["DpnII"])?;
        let factory = SegmentFactory::new(&provider, &enzymes, 40);
        let bait = BaitParameters {
            probe_length: 20,
            min_bait_count: 1,
            ..Default::default()
        };

        let mut viewpoints = Vec::new();

        for (gene, position) in [("A", 850), ("B", 1_150)] {
            viewpoints.push(
                Builder::default()
                    .contig("chr1")?
                    .genomic_position(position)?
                    .strand(Strand::Positive)?
                    .target_name(gene)?
                    .bait_parameters(bait.clone())?
                    .try_build(&factory, &Uniform)?,
            );
        }

        Ok(viewpoints)
    }

    #[test]
    fn test_write_viewpoints() -> Result<(), Box<dyn std::error::Error>> {
        let mut buffer = Vec::new();
        let n = write_viewpoints(&mut buffer, &viewpoints()?)?;

        assert_eq!(n, 2);
        assert_eq!(
            String::from_utf8(buffer)?,
            "chr1\t600\t1200\tA_1/1\nchr1\t800\t1400\tB_1/1\n"
        );

        Ok(())
    }

    #[test]
    fn test_shared_intervals_are_written_once() -> Result<(), Box<dyn std::error::Error>> {
        let viewpoints = viewpoints()?;

        let mut buffer = Vec::new();
        assert_eq!(write_active_segments(&mut buffer, &viewpoints)?, 4);

        let output = String::from_utf8(buffer)?;
        let first = output.lines().next().unwrap();
        assert_eq!(first, "chr1\t600\t800\tA_1/1");

        let mut buffer = Vec::new();
        assert_eq!(write_unique_margins(&mut buffer, &viewpoints)?, 8);

        let mut buffer = Vec::new();
        assert_eq!(write_baits(&mut buffer, &viewpoints)?, 16);

        Ok(())
    }
}
