//! Genome builds and their canonical chromosomes.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::config::Error;
use crate::config::Result;

/// A reference genome build.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GenomeBuild {
    /// The base name of the genome files (e.g., `hg38`).
    pub basename: String,

    /// The chromosomes on which viewpoints are designed.
    pub canonical_chromosomes: Vec<String>,
}

impl GenomeBuild {
    /// Gets whether a contig is one of the canonical chromosomes.
    ///
    /// # Examples
    ///
    /// ```
    /// use viewpoints::config::genome::GenomeBuilds;
    ///
    /// let builds = GenomeBuilds::builtin();
    /// let hg38 = builds.get("hg38").unwrap();
    ///
    /// assert!(hg38.is_canonical("chrX"));
    /// assert!(!hg38.is_canonical("chr1_KI270706v1_random"));
    /// ```
    pub fn is_canonical(&self, contig: &str) -> bool {
        self.canonical_chromosomes.iter().any(|c| c == contig)
    }
}

/// Builds the conventional UCSC chromosome names for an organism with the
/// given number of autosomes.
fn ucsc_chromosomes(autosomes: usize) -> Vec<String> {
    (1..=autosomes)
        .map(|i| format!("chr{i}"))
        .chain(["chrX", "chrY", "chrM"].into_iter().map(String::from))
        .collect()
}

/// A table of genome builds, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct GenomeBuilds {
    /// The builds by name.
    builds: HashMap<String, GenomeBuild>,
}

impl GenomeBuilds {
    /// Gets the built-in human (hg19, hg38) and mouse (mm9, mm10) builds.
    pub fn builtin() -> Self {
        let mut builds = HashMap::new();

        for (name, autosomes) in [("hg19", 22), ("hg38", 22), ("mm9", 19), ("mm10", 19)] {
            builds.insert(
                name.to_string(),
                GenomeBuild {
                    basename: name.to_string(),
                    canonical_chromosomes: ucsc_chromosomes(autosomes),
                },
            );
        }

        Self { builds }
    }

    /// Parses a table of builds from JSON (an object keyed by build name).
    ///
    /// # Examples
    ///
    /// ```
    /// use viewpoints::config::genome::GenomeBuilds;
    ///
    /// let builds = GenomeBuilds::from_json_str(
    ///     r#"{ "dm6": { "basename": "dm6", "canonical_chromosomes": ["chr2L", "chr2R"] } }"#,
    /// )?;
    ///
    /// assert_eq!(builds.names(), vec!["dm6"]);
    /// assert!(builds.get("dm6").unwrap().is_canonical("chr2L"));
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        let builds =
            serde_json::from_str::<HashMap<String, GenomeBuild>>(json).map_err(Error::Json)?;
        Ok(Self { builds })
    }

    /// Reads a table of builds from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(Error::Io)?;
        Self::from_json_str(&json)
    }

    /// Adds the builds of another table, replacing builds with the same
    /// name.
    pub fn extend(&mut self, other: GenomeBuilds) {
        self.builds.extend(other.builds);
    }

    /// Gets a build by name.
    pub fn get(&self, name: &str) -> Option<&GenomeBuild> {
        self.builds.get(name)
    }

    /// Gets a build by name, failing if it does not exist.
    pub fn require(&self, name: &str) -> Result<&GenomeBuild> {
        self.get(name)
            .ok_or_else(|| Error::UnknownGenomeBuild(name.to_string()))
    }

    /// Gets the names of every build, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names = self.builds.keys().map(String::as_str).collect::<Vec<_>>();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_builds() {
        let builds = GenomeBuilds::builtin();

        assert_eq!(builds.names(), vec!["hg19", "hg38", "mm10", "mm9"]);
        assert_eq!(builds.get("hg19").unwrap().canonical_chromosomes.len(), 25);
        assert_eq!(builds.get("mm10").unwrap().canonical_chromosomes.len(), 22);
        assert!(!builds.get("mm9").unwrap().is_canonical("chr20"));
    }

    #[test]
    fn test_unknown_build() {
        let err = GenomeBuilds::builtin().require("hg17").unwrap_err();
        assert_eq!(err.to_string(), "unknown genome build: hg17");
    }

    #[test]
    fn test_extend() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut builds = GenomeBuilds::builtin();
        builds.extend(GenomeBuilds::from_json_str(
            r#"{ "hg38": { "basename": "GRCh38", "canonical_chromosomes": ["1"] } }"#,
        )?);

        assert_eq!(builds.require("hg38")?.basename, "GRCh38");
        assert!(builds.require("hg38")?.is_canonical("1"));

        Ok(())
    }
}
