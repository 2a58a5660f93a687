//! CLI subcommand implementations for the `rankscope` binary.

pub mod bulk_cmd;
pub mod check_cmd;
pub mod export_cmd;
pub mod output;
pub mod results_cmd;
pub mod serve;
pub mod track_cmd;

use crate::config::RuntimeConfig;
use crate::server::AppContext;
use crate::store::Store;
use anyhow::Result;
use std::sync::Arc;

/// Open the store under the configured data directory.
pub fn open_store(config: &RuntimeConfig) -> Result<Arc<Store>> {
    config.ensure_data_dir()?;
    Ok(Arc::new(Store::open(&config.db_path())?))
}

/// Context for one-shot commands.
pub fn open_context(config: &RuntimeConfig) -> Result<AppContext> {
    Ok(AppContext::new(open_store(config)?, config.env_api_key.clone()))
}
