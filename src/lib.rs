pub mod config;
pub mod table;
pub mod genes; // Lookup service + SQLite gene database
pub mod matching; // Identifier → Entrez gene resolution
pub mod extract;
pub mod reconcile;

pub use extract::{extract, gene_column_candidates, ExtractionMode, InputHints};
pub use genes::{GeneLookup, GeneRecord, LookupError, SqliteGeneLookup};
pub use matching::{
    match_identifiers, spawn_match, Applied, Classification, MatchError, MatchRun, MatchSession,
};
pub use reconcile::{reconcile, OutputSpec, ReconcileError, ReconciledTable};
pub use table::{Table, TableError};

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// Honours `RUST_LOG`, falling back to `config::default_log_filter()`. A
/// subscriber installed earlier by the host application is left in place.
pub fn init_tracing() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("{} v{} logging initialised", config::APP_NAME, config::APP_VERSION);
    }
}
