//! Locating restriction cut sites within a sequence window.
//!
//! A cut site is reported as the 1-based position of the first base *after*
//! the cut, which is also the first base of the downstream restriction
//! fragment. For a motif whose first base lies at position `p`, the cut site
//! is `p + cut_offset`:
//!
//! ```text
//!            p
//!            |
//! ...ACGTACCAGATCTTG...     DpnII (^GATC): cut site = p
//! ...ACGTACCAAGCTTTG...     HindIII (A^AGCTT): cut site = p + 1
//! ```

use crate::Position;
use crate::enzyme::EnzymeSet;

/// Finds every cut site of the given enzymes within a sequence window.
///
/// `window_start` is the 1-based position of the first base of `window`.
/// Matching is case-insensitive, so soft-masked (lowercase) motifs are found
/// as well. Overlapping motif occurrences are all reported. The result is
/// sorted and contains no duplicates, even when several enzymes share a cut
/// site. An empty result is a valid outcome.
///
/// # Examples
///
/// ```
/// use viewpoints::enzyme;
///
/// let enzymes = enzyme::resolve(["DpnII", "HindIII"])?;
///
/// // 1-based window positions: GATC at 101, AAGCTT at 107, gatc at 113.
/// let window = "GATCccAAGCTTgatc";
/// let sites = enzyme::find_cut_sites(window, &enzymes, 101);
///
/// assert_eq!(sites, vec![101, 108, 113]);
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn find_cut_sites(window: &str, enzymes: &EnzymeSet, window_start: Position) -> Vec<Position> {
    let mut sites = Vec::new();

    for enzyme in enzymes.iter() {
        let mut from = 0usize;

        while let Some(found) = enzyme.pattern().find_at(window, from) {
            sites.push(window_start + found.start() + enzyme.cut_offset());
            from = found.start() + 1;

            if from >= window.len() {
                break;
            }
        }
    }

    sites.sort_unstable();
    sites.dedup();
    sites
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enzyme;

    /// Builds a sequence with `GATC` starting at each of the given 1-based
    /// positions and `A` everywhere else.
    fn sequence_with_gatc_at(positions: &[usize], length: usize) -> String {
        let mut bases = vec![b'A'; length];

        for position in positions {
            bases[position - 1..position + 3].copy_from_slice(b"GATC");
        }

        String::from_utf8(bases).unwrap()
    }

    #[test]
    fn test_dpnii_cuts_at_motif_start() -> Result<(), Box<dyn std::error::Error>> {
        let positions = [21, 45, 69, 93];
        let sequence = sequence_with_gatc_at(&positions, 120);
        let enzymes = enzyme::resolve(["DpnII"])?;

        let sites = find_cut_sites(&sequence, &enzymes, 1);
        assert_eq!(sites, positions.to_vec());

        Ok(())
    }

    #[test]
    fn test_window_offset_is_applied() -> Result<(), Box<dyn std::error::Error>> {
        let enzymes = enzyme::resolve(["HindIII"])?;

        let sites = find_cut_sites("TTAAGCTTAA", &enzymes, 1000);
        assert_eq!(sites, vec![1003]);

        Ok(())
    }

    #[test]
    fn test_lowercase_and_overlapping_matches() -> Result<(), Box<dyn std::error::Error>> {
        // `AAA` occurs twice (overlapping) at the start and once in lowercase.
        let enzymes = enzyme::resolve(["Custom=A^AA"])?;

        let sites = find_cut_sites("AAAAcaaa", &enzymes, 1);
        assert_eq!(sites, vec![2, 3, 7]);

        Ok(())
    }

    #[test]
    fn test_degenerate_motif() -> Result<(), Box<dyn std::error::Error>> {
        let enzymes = enzyme::resolve(["HinfI"])?;

        let sites = find_cut_sites("GAATCxxGACTCxxGAGTC", &enzymes, 1);
        assert_eq!(sites, vec![2, 9, 16]);

        Ok(())
    }

    #[test]
    fn test_shared_cut_sites_are_deduplicated() -> Result<(), Box<dyn std::error::Error>> {
        let enzymes = enzyme::resolve(["DpnII", "MboI", "Sau3AI"])?;
        let sequence = sequence_with_gatc_at(&[5, 50], 80);

        let first = find_cut_sites(&sequence, &enzymes, 1);
        let second = find_cut_sites(&sequence, &enzymes, 1);

        assert_eq!(first, vec![5, 50]);
        assert_eq!(first, second);

        Ok(())
    }

    #[test]
    fn test_no_match_is_empty() -> Result<(), Box<dyn std::error::Error>> {
        let enzymes = enzyme::resolve(["NlaIII"])?;
        assert!(find_cut_sites("AAAAAAAA", &enzymes, 1).is_empty());
        Ok(())
    }
}
