use std::path::PathBuf;

use serde::Serialize;

use crate::genes::{LookupError, SqliteGeneLookup};

/// Application-level constants
pub const APP_NAME: &str = "GeneNameMatcher";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable overriding the gene database location.
pub const DB_PATH_ENV: &str = "GENE_MATCHER_DB";

/// Default `tracing` filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "gene_name_matcher=info,warn"
}

/// Get the application data directory.
/// Falls back to the working directory when the platform has no data dir.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Directory holding the gene database.
pub fn gene_db_dir() -> PathBuf {
    app_data_dir().join("genes")
}

/// Default gene database path (all organisms in one file).
pub fn gene_db_path() -> PathBuf {
    gene_db_dir().join("gene_info.sqlite")
}

// ═══════════════════════════════════════════════════════════
// Organisms
// ═══════════════════════════════════════════════════════════

/// An organism the matcher can search, keyed by NCBI taxonomy id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Organism {
    pub tax_id: String,
    pub name: String,
}

/// Common taxonomy ids offered for selection.
const COMMON_ORGANISMS: &[(&str, &str)] = &[
    ("3702", "Arabidopsis thaliana"),
    ("9913", "Cattle"),
    ("6239", "Caenorhabditis elegans"),
    ("3055", "Chlamydomonas reinhardtii"),
    ("7955", "Zebrafish"),
    ("352472", "Dictyostelium discoideum"),
    ("7227", "Drosophila melanogaster"),
    ("562", "Escherichia coli"),
    ("11103", "Hepatitis C virus"),
    ("9606", "Homo sapiens"),
    ("10090", "Mus musculus"),
    ("2104", "Mycoplasma pneumoniae"),
    ("4530", "Oryza sativa"),
    ("5833", "Plasmodium falciparum"),
    ("4754", "Pneumocystis carinii"),
    ("10116", "Rattus norvegicus"),
    ("4932", "Saccharomyces cerevisiae"),
    ("4896", "Schizosaccharomyces pombe"),
    ("31033", "Takifugu rubripes"),
    ("8355", "Xenopus laevis"),
    ("4577", "Zea mays"),
];

/// Common organisms sorted by display name.
pub fn common_organisms() -> Vec<Organism> {
    let mut organisms: Vec<Organism> = COMMON_ORGANISMS
        .iter()
        .map(|(tax_id, name)| Organism {
            tax_id: (*tax_id).to_string(),
            name: (*name).to_string(),
        })
        .collect();
    organisms.sort_by(|a, b| a.name.cmp(&b.name));
    organisms
}

/// Display name for a taxonomy id, if it is one of the common organisms.
pub fn organism_name(tax_id: &str) -> Option<&'static str> {
    COMMON_ORGANISMS
        .iter()
        .find(|(id, _)| *id == tax_id)
        .map(|(_, name)| *name)
}

// ═══════════════════════════════════════════════════════════
// MatcherConfig
// ═══════════════════════════════════════════════════════════

/// Runtime settings for the matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatcherConfig {
    /// SQLite gene database.
    pub db_path: PathBuf,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            db_path: gene_db_path(),
        }
    }
}

impl MatcherConfig {
    /// Defaults, with the database path taken from `GENE_MATCHER_DB` when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(path) = get(DB_PATH_ENV).filter(|p| !p.trim().is_empty()) {
            config.db_path = PathBuf::from(path);
        }
        config
    }

    /// Open the configured gene database.
    pub fn open_lookup(&self) -> Result<SqliteGeneLookup, LookupError> {
        tracing::debug!(path = %self.db_path.display(), "Opening gene database");
        SqliteGeneLookup::open(&self.db_path)
    }
}
