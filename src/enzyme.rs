//! Restriction enzymes and their recognition sites.
//!
//! A recognition site is written with a single `^` marking where the enzyme
//! cuts the forward strand (e.g., `A^AGCTT` for HindIII, `^GATC` for DpnII).
//! IUPAC degenerate nucleotide codes are allowed within the motif.

use std::str::FromStr;

use nonempty::NonEmpty;
use regex::Regex;

pub mod cutsite;

pub use cutsite::find_cut_sites;

/// The character marking the cut position within a recognition site.
pub const CUT_MARKER: char = '^';

/// The separator between a name and a site in an inline enzyme definition
/// (e.g., `HindIII=A^AGCTT`).
pub const INLINE_SEPARATOR: char = '=';

/// The enzymes commonly used for Capture Hi-C, as `(name, site)` pairs.
pub const CATALOG: &[(&str, &str)] = &[
    ("AluI", "AG^CT"),
    ("ApoI", "R^AATTY"),
    ("BamHI", "G^GATCC"),
    ("BglII", "A^GATCT"),
    ("CviQI", "G^TAC"),
    ("Csp6I", "G^TAC"),
    ("DpnII", "^GATC"),
    ("EcoRI", "G^AATTC"),
    ("HindIII", "A^AGCTT"),
    ("HinfI", "G^ANTC"),
    ("MboI", "^GATC"),
    ("MseI", "T^TAA"),
    ("NcoI", "C^CATGG"),
    ("NlaIII", "CATG^"),
    ("Sau3AI", "^GATC"),
];

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to a [`RestrictionEnzyme`].
#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    /// The recognition site was empty (ignoring the cut marker).
    EmptySite(String),

    /// The recognition site did not contain a cut marker.
    MissingCutMarker(String),

    /// The recognition site contained more than one cut marker.
    MultipleCutMarkers(String),

    /// The recognition site contained a character that is not a nucleotide
    /// code.
    InvalidCharacter(char, String),

    /// No enzyme with the given name exists in the catalog.
    UnknownEnzyme(String),

    /// An enzyme set was requested without any enzymes.
    NoEnzymes,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::EmptySite(name) => write!(f, "empty recognition site for enzyme {name}"),
            Error::MissingCutMarker(site) => {
                write!(f, "recognition site `{site}` is missing the `{CUT_MARKER}` cut marker")
            }
            Error::MultipleCutMarkers(site) => write!(
                f,
                "recognition site `{site}` contains more than one `{CUT_MARKER}` cut marker"
            ),
            Error::InvalidCharacter(c, site) => {
                write!(f, "invalid character `{c}` in recognition site `{site}`")
            }
            Error::UnknownEnzyme(name) => write!(f, "unknown enzyme: {name}"),
            Error::NoEnzymes => write!(f, "no restriction enzymes were provided"),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////
// Enzymes
////////////////////////////////////////////////////////////////////////////////////////

/// A restriction enzyme.
#[derive(Clone, Debug)]
pub struct RestrictionEnzyme {
    /// The name of the enzyme.
    name: String,

    /// The recognition site, including the cut marker.
    site: String,

    /// The recognition site without the cut marker (uppercase).
    plain_site: String,

    /// The number of motif bases before the cut.
    cut_offset: usize,

    /// The case-insensitive pattern matching the motif.
    pattern: Regex,
}

impl RestrictionEnzyme {
    /// Attempts to create a new [`RestrictionEnzyme`].
    ///
    /// # Examples
    ///
    /// ```
    /// use viewpoints::enzyme::RestrictionEnzyme;
    ///
    /// let enzyme = RestrictionEnzyme::try_new("HindIII", "A^AGCTT")?;
    /// assert_eq!(enzyme.name(), "HindIII");
    /// assert_eq!(enzyme.site(), "A^AGCTT");
    /// assert_eq!(enzyme.plain_site(), "AAGCTT");
    /// assert_eq!(enzyme.cut_offset(), 1);
    ///
    /// assert!(RestrictionEnzyme::try_new("Broken", "AAGCTT").is_err());
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn try_new(name: impl Into<String>, site: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let site = site.into().trim().to_ascii_uppercase();

        let markers = site.matches(CUT_MARKER).count();

        match markers {
            0 if site.is_empty() => return Err(Error::EmptySite(name)),
            0 => return Err(Error::MissingCutMarker(site)),
            1 => {}
            _ => return Err(Error::MultipleCutMarkers(site)),
        }

        // SAFETY: we just checked that exactly one cut marker exists.
        let cut_offset = site.find(CUT_MARKER).unwrap();
        let plain_site = site.replace(CUT_MARKER, "");

        if plain_site.is_empty() {
            return Err(Error::EmptySite(name));
        }

        let mut pattern = String::from("(?i)");

        for c in plain_site.chars() {
            let class = iupac_class(c).ok_or_else(|| Error::InvalidCharacter(c, site.clone()))?;
            pattern.push_str(class);
        }

        // SAFETY: the pattern is assembled exclusively from the fixed character
        // classes in `iupac_class`, which always form a valid expression.
        let pattern = Regex::new(&pattern).unwrap();

        Ok(Self {
            name,
            site,
            plain_site,
            cut_offset,
            pattern,
        })
    }

    /// Looks up an enzyme in the built-in [`CATALOG`] (case-insensitively).
    ///
    /// # Examples
    ///
    /// ```
    /// use viewpoints::enzyme::RestrictionEnzyme;
    ///
    /// let enzyme = RestrictionEnzyme::from_catalog("dpnii")?;
    /// assert_eq!(enzyme.name(), "DpnII");
    /// assert_eq!(enzyme.cut_offset(), 0);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_catalog(name: &str) -> Result<Self> {
        let (name, site) = CATALOG
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::UnknownEnzyme(name.to_string()))?;

        Self::try_new(*name, *site)
    }

    /// Gets the name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the recognition site, including the cut marker.
    pub fn site(&self) -> &str {
        &self.site
    }

    /// Gets the recognition site without the cut marker.
    pub fn plain_site(&self) -> &str {
        &self.plain_site
    }

    /// Gets the number of motif bases before the cut.
    pub fn cut_offset(&self) -> usize {
        self.cut_offset
    }

    /// Gets the case-insensitive pattern that matches the motif.
    pub(crate) fn pattern(&self) -> &Regex {
        &self.pattern
    }
}

impl PartialEq for RestrictionEnzyme {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.site == other.site
    }
}

impl Eq for RestrictionEnzyme {}

impl std::fmt::Display for RestrictionEnzyme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.name, INLINE_SEPARATOR, self.site)
    }
}

impl FromStr for RestrictionEnzyme {
    type Err = Error;

    /// Parses either a catalog name (`DpnII`) or an inline definition
    /// (`MyEnzyme=GA^TC`).
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(INLINE_SEPARATOR) {
            Some((name, site)) => Self::try_new(name.trim(), site),
            None => Self::from_catalog(s.trim()),
        }
    }
}

/// Gets the regular expression character class for an IUPAC nucleotide code.
fn iupac_class(c: char) -> Option<&'static str> {
    let class = match c {
        'A' => "A",
        'C' => "C",
        'G' => "G",
        'T' => "T",
        'R' => "[AG]",
        'Y' => "[CT]",
        'M' => "[AC]",
        'K' => "[GT]",
        'S' => "[CG]",
        'W' => "[AT]",
        'H' => "[ACT]",
        'B' => "[CGT]",
        'V' => "[ACG]",
        'D' => "[AGT]",
        'N' => "[ACGT]",
        _ => return None,
    };

    Some(class)
}

/// A non-empty set of restriction enzymes used together in a digest.
pub type EnzymeSet = NonEmpty<RestrictionEnzyme>;

/// Resolves a list of enzyme descriptions (catalog names or inline
/// definitions) into an [`EnzymeSet`].
///
/// Any malformed description fails the whole set, so that configuration
/// problems surface before any viewpoint is built.
///
/// # Examples
///
/// ```
/// use viewpoints::enzyme;
///
/// let set = enzyme::resolve(["DpnII", "Custom=GA^NTC"])?;
/// assert_eq!(set.len(), 2);
/// assert_eq!(set.last().plain_site(), "GANTC");
///
/// assert!(enzyme::resolve(Vec::<String>::new()).is_err());
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn resolve<I, S>(descriptions: I) -> Result<EnzymeSet>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let enzymes = descriptions
        .into_iter()
        .map(|description| description.as_ref().parse::<RestrictionEnzyme>())
        .collect::<Result<Vec<_>>>()?;

    NonEmpty::from_vec(enzymes).ok_or(Error::NoEnzymes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_valid() -> std::result::Result<(), Box<dyn std::error::Error>> {
        for (name, _) in CATALOG {
            RestrictionEnzyme::from_catalog(name)?;
        }

        Ok(())
    }

    #[test]
    fn test_cut_offsets() -> std::result::Result<(), Box<dyn std::error::Error>> {
        assert_eq!(RestrictionEnzyme::from_catalog("DpnII")?.cut_offset(), 0);
        assert_eq!(RestrictionEnzyme::from_catalog("HindIII")?.cut_offset(), 1);
        assert_eq!(RestrictionEnzyme::from_catalog("NlaIII")?.cut_offset(), 4);
        Ok(())
    }

    #[test]
    fn test_malformed_sites() {
        let err = RestrictionEnzyme::try_new("E", "").unwrap_err();
        assert_eq!(err.to_string(), "empty recognition site for enzyme E");

        let err = RestrictionEnzyme::try_new("E", "^").unwrap_err();
        assert_eq!(err, Error::EmptySite(String::from("E")));

        let err = RestrictionEnzyme::try_new("E", "GATC").unwrap_err();
        assert_eq!(
            err.to_string(),
            "recognition site `GATC` is missing the `^` cut marker"
        );

        let err = RestrictionEnzyme::try_new("E", "G^AT^C").unwrap_err();
        assert_eq!(err, Error::MultipleCutMarkers(String::from("G^AT^C")));

        let err = RestrictionEnzyme::try_new("E", "G^AXC").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid character `X` in recognition site `G^AXC`"
        );
    }

    #[test]
    fn test_parse_from_str() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let enzyme = "hindiii".parse::<RestrictionEnzyme>()?;
        assert_eq!(enzyme.name(), "HindIII");

        let enzyme = "Mine=ga^tc".parse::<RestrictionEnzyme>()?;
        assert_eq!(enzyme.site(), "GA^TC");
        assert_eq!(enzyme.to_string(), "Mine=GA^TC");

        let err = "Nonexistent".parse::<RestrictionEnzyme>().unwrap_err();
        assert_eq!(err.to_string(), "unknown enzyme: Nonexistent");

        Ok(())
    }
}
