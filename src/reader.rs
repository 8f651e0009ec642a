//! Line-oriented readers for the tabular inputs consumed by this crate
//! (bedGraph alignability tracks, `refGene` annotations, and FASTA indexes).

use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::{self};
use std::iter;
use std::path::Path;

use flate2::read::MultiGzDecoder;

/// The new line character.
const NEW_LINE: char = '\n';

/// The carriage return character.
const CARRIAGE_RETURN: char = '\r';

/// The extension that marks a gzip-compressed input.
const GZIP_EXTENSION: &str = "gz";

/// Opens a file for buffered reading, transparently decompressing it when the
/// file name ends in `.gz`.
///
/// Both plain gzip and BGZF (multi-member gzip) files are supported.
pub fn open(path: impl AsRef<Path>) -> io::Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let file = File::open(path)?;

    let compressed = path
        .extension()
        .map(|ext| ext == GZIP_EXTENSION)
        .unwrap_or(false);

    match compressed {
        true => Ok(Box::new(BufReader::new(MultiGzDecoder::new(file)))),
        false => Ok(Box::new(BufReader::new(file))),
    }
}

/// Returns an iterator over the numbered, non-empty lines in a buffered
/// reader.
///
/// Line numbers are 1-based so they can be reported directly in error
/// messages. Trailing line endings (`\n` or `\r\n`) are stripped.
///
/// # Examples
///
/// ```
/// let data = b"chr1\t0\t10\t1\r\n\nchr1\t10\t20\t0.5";
/// let lines = viewpoints::reader::lines(&data[..])
///     .collect::<std::io::Result<Vec<_>>>()?;
///
/// assert_eq!(lines.len(), 2);
/// assert_eq!(lines[0], (1, String::from("chr1\t0\t10\t1")));
/// assert_eq!(lines[1], (3, String::from("chr1\t10\t20\t0.5")));
///
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn lines<T>(mut reader: T) -> impl Iterator<Item = io::Result<(usize, String)>>
where
    T: BufRead,
{
    let mut buffer = String::new();
    let mut line_number = 0usize;

    iter::from_fn(move || loop {
        match read_line(&mut reader, &mut buffer) {
            Ok(0) => return None,
            Ok(_) => {
                line_number += 1;

                if buffer.trim().is_empty() {
                    continue;
                }

                return Some(Ok((line_number, buffer.clone())));
            }
            Err(e) => return Some(Err(e)),
        }
    })
}

/// Reads a line from a buffered reader, stripping the line ending.
///
/// Adapted from noodles-gtf.
fn read_line<T>(reader: &mut T, buffer: &mut String) -> io::Result<usize>
where
    T: BufRead,
{
    buffer.clear();

    match reader.read_line(buffer) {
        Ok(0) => Ok(0),
        Ok(n) => {
            if buffer.ends_with(NEW_LINE) {
                buffer.pop();

                if buffer.ends_with(CARRIAGE_RETURN) {
                    buffer.pop();
                }
            }

            Ok(n)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::io::Write as _;

    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tempdir::TempDir;

    use super::*;

    #[test]
    fn test_read_line() {
        let data = b"hello\r\nworld!";
        let mut cursor = io::Cursor::new(data);

        let mut buffer = String::new();
        let len = read_line(&mut cursor, &mut buffer).unwrap();
        assert_eq!(buffer, "hello");
        assert_eq!(len, 7);

        let len = read_line(&mut cursor, &mut buffer).unwrap();
        assert_eq!(buffer, "world!");
        assert_eq!(len, 6);
    }

    #[test]
    fn test_lines_skips_blank_lines_but_keeps_numbering() -> Result<(), Box<dyn std::error::Error>>
    {
        let data = b"a\n\n   \nb\n";
        let lines = lines(&data[..]).collect::<io::Result<Vec<_>>>()?;

        assert_eq!(lines, vec![(1, String::from("a")), (4, String::from("b"))]);

        Ok(())
    }

    #[test]
    fn test_open_gzipped_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new("viewpoints-reader")?;
        let path = dir.path().join("data.txt.gz");

        let mut encoder = GzEncoder::new(File::create(&path)?, Compression::default());
        encoder.write_all(b"first\nsecond\n")?;
        encoder.finish()?;

        let lines = lines(open(&path)?).collect::<io::Result<Vec<_>>>()?;
        assert_eq!(
            lines,
            vec![(1, String::from("first")), (2, String::from("second"))]
        );

        Ok(())
    }

    #[test]
    fn test_open_plain_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new("viewpoints-reader")?;
        let path = dir.path().join("data.txt");
        std::fs::write(&path, "only\n")?;

        let lines = lines(open(&path)?).collect::<io::Result<Vec<_>>>()?;
        assert_eq!(lines, vec![(1, String::from("only"))]);

        Ok(())
    }
}
