//! Panel design configuration.
//!
//! A [`PanelConfig`] gathers every panel-wide choice: the genome build, the
//! restriction enzymes, the margin size, the bait parameters, and the
//! selection strategy. It is read from JSON, where every field is optional:
//!
//! ```json
//! {
//!   "genome_build": "hg38",
//!   "enzymes": ["DpnII"],
//!   "margin_size": 250,
//!   "bait": { "probe_length": 120, "min_bait_count": 2 },
//!   "strategy": { "approach": "extended", "size_up": 5000, "size_down": 5000 }
//! }
//! ```

use std::io;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::enzyme;
use crate::enzyme::EnzymeSet;
use crate::segment::BaitParameters;
use crate::segment::DEFAULT_MARGIN_SIZE;
use crate::viewpoint::SelectionStrategy;

pub mod genome;

pub use genome::GenomeBuild;
pub use genome::GenomeBuilds;

/// The default genome build.
pub const DEFAULT_GENOME_BUILD: &str = "hg38";

/// The default restriction enzyme.
pub const DEFAULT_ENZYME: &str = "DpnII";

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to the configuration.
#[derive(Debug)]
pub enum Error {
    /// An I/O error.
    Io(io::Error),

    /// A JSON error.
    Json(serde_json::Error),

    /// An invalid enzyme.
    Enzyme(enzyme::Error),

    /// A parameter outside of its valid range.
    InvalidParameter(&'static str, String),

    /// A genome build that is not known.
    UnknownGenomeBuild(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "i/o error: {err}"),
            Error::Json(err) => write!(f, "json error: {err}"),
            Error::Enzyme(err) => write!(f, "enzyme error: {err}"),
            Error::InvalidParameter(name, reason) => write!(f, "invalid {name}: {reason}"),
            Error::UnknownGenomeBuild(name) => write!(f, "unknown genome build: {name}"),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////
// Configuration
////////////////////////////////////////////////////////////////////////////////////////

/// The panel-wide configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PanelConfig {
    /// The name of the genome build.
    pub genome_build: String,

    /// The restriction enzymes, as catalog names or inline `name=SITE`
    /// definitions.
    pub enzymes: Vec<String>,

    /// The margin size.
    pub margin_size: usize,

    /// The bait placement parameters.
    pub bait: BaitParameters,

    /// The selection strategy.
    pub strategy: SelectionStrategy,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            genome_build: DEFAULT_GENOME_BUILD.to_string(),
            enzymes: vec![DEFAULT_ENZYME.to_string()],
            margin_size: DEFAULT_MARGIN_SIZE,
            bait: BaitParameters::default(),
            strategy: SelectionStrategy::default(),
        }
    }
}

/// Checks that a fraction lies within `[0, 1]`.
fn check_fraction(name: &'static str, value: f64) -> Result<()> {
    match (0.0..=1.0).contains(&value) {
        true => Ok(()),
        false => Err(Error::InvalidParameter(
            name,
            format!("{value} must be between 0 and 1"),
        )),
    }
}

/// Checks that a count is greater than zero.
fn check_positive(name: &'static str, value: usize) -> Result<()> {
    match value > 0 {
        true => Ok(()),
        false => Err(Error::InvalidParameter(
            name,
            String::from("must be greater than zero"),
        )),
    }
}

impl PanelConfig {
    /// Parses and validates a configuration from JSON.
    ///
    /// # Examples
    ///
    /// ```
    /// use viewpoints::config::PanelConfig;
    /// use viewpoints::viewpoint::Approach;
    ///
    /// let config = PanelConfig::from_json_str(
    ///     r#"{ "enzymes": ["HindIII"], "strategy": { "approach": "extended" } }"#,
    /// )?;
    ///
    /// assert_eq!(config.genome_build, "hg38");
    /// assert_eq!(config.margin_size, 250);
    /// assert_eq!(config.strategy.approach(), Approach::Extended);
    /// assert_eq!(config.enzyme_set()?.head.name(), "HindIII");
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config = serde_json::from_str::<Self>(json).map_err(Error::Json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(Error::Io)?;
        Self::from_json_str(&json)
    }

    /// Checks that every parameter lies within its valid range and that the
    /// enzymes resolve.
    pub fn validate(&self) -> Result<()> {
        check_positive("margin size", self.margin_size)?;
        check_positive("probe length", self.bait.probe_length)?;
        check_fraction("minimum GC content", self.bait.min_gc)?;
        check_fraction("maximum GC content", self.bait.max_gc)?;

        if self.bait.min_gc > self.bait.max_gc {
            return Err(Error::InvalidParameter(
                "GC content range",
                format!(
                    "minimum ({}) exceeds maximum ({})",
                    self.bait.min_gc, self.bait.max_gc
                ),
            ));
        }

        if self.bait.max_mean_kmer_alignability < 1.0 {
            return Err(Error::InvalidParameter(
                "maximum mean k-mer alignability",
                format!(
                    "{} must be at least 1",
                    self.bait.max_mean_kmer_alignability
                ),
            ));
        }

        check_fraction("maximum repeat content", self.strategy.max_repeat_content())?;

        if let SelectionStrategy::Extended(params) = &self.strategy {
            let sigmas = [
                ("upstream sigma", params.sigma_up),
                ("downstream sigma", params.sigma_down),
            ];

            for (name, sigma) in sigmas {
                if let Some(sigma) = sigma {
                    if sigma <= 0.0 {
                        return Err(Error::InvalidParameter(
                            name,
                            format!("{sigma} must be greater than zero"),
                        ));
                    }
                }
            }
        }

        self.enzyme_set()?;

        Ok(())
    }

    /// Resolves the configured enzymes.
    pub fn enzyme_set(&self) -> Result<EnzymeSet> {
        enzyme::resolve(&self.enzymes).map_err(Error::Enzyme)
    }
}
