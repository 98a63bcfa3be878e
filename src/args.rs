use clap::Parser;

use crate::constants::{DEFAULT_DB_PATH, DEFAULT_INPUT_PATH, DEFAULT_TARGET_STATES};

#[derive(Debug, Parser)]
#[command(name = "provider_registry_etl")]
#[command(about = "Load individual NPI registry providers for target states into SQLite")]
pub struct Args {
    /// JSON export shaped as [[label, {"results": [...]}], ...].
    #[arg(long, default_value = DEFAULT_INPUT_PATH)]
    pub input_path: std::path::PathBuf,

    /// SQLite database holding the provider_registry table.
    #[arg(long, default_value = DEFAULT_DB_PATH)]
    pub db_path: std::path::PathBuf,

    /// Target state codes, comma separated.
    #[arg(long, value_delimiter = ',', default_value = DEFAULT_TARGET_STATES)]
    pub states: Vec<String>,

    /// Delete the database file before loading.
    #[arg(long, default_value_t = false)]
    pub reset_db: bool,

    /// Write the full provider_registry table to this CSV after loading.
    #[arg(long)]
    pub export_csv: Option<std::path::PathBuf>,
}
