//! Item processors that persist or display items as they pass through the
//! pipeline. Each one forwards the item unchanged.

use crate::config::OutputConfig;
use crate::error::Result;
use crate::pipeline::ItemProcessor;
use std::path::PathBuf;
use std::sync::Arc;

pub mod console;
pub mod csv;
pub mod json;
pub mod sqlite;

pub use console::ConsoleOutput;
pub use csv::CsvOutput;
pub use json::JsonOutput;
pub use sqlite::SqliteOutput;

/// Builds the processor selected by `config`, defaulting to the console.
pub async fn create_output(
    config: Option<&OutputConfig>,
    multi: Option<Arc<indicatif::MultiProgress>>,
) -> Result<Arc<dyn ItemProcessor>> {
    let output: Arc<dyn ItemProcessor> = match config {
        None | Some(OutputConfig::Console) => Arc::new(ConsoleOutput::new(multi)),
        Some(OutputConfig::Json { path }) => Arc::new(JsonOutput::new(PathBuf::from(path))?),
        Some(OutputConfig::Csv { path }) => Arc::new(CsvOutput::new(PathBuf::from(path))?),
        Some(OutputConfig::Sqlite { path, table }) => {
            Arc::new(SqliteOutput::new(PathBuf::from(path), table.clone()).await?)
        }
    };
    Ok(output)
}
