//! `rankscope results`: list stored results.

use crate::cli::output;
use crate::store::{ResultQuery, Store};
use anyhow::Result;

pub fn run(store: &Store, query: &ResultQuery) -> Result<()> {
    let results = store.query_results(query)?;
    if results.is_empty() && !output::is_json() && !output::is_quiet() {
        println!("  No results.");
        return Ok(());
    }
    output::print_results(&results);
    Ok(())
}

/// Delete all stored results.
pub fn clear(store: &Store) -> Result<()> {
    let deleted = store.clear_results()?;
    if output::is_json() {
        output::print_json(&serde_json::json!({ "deleted": deleted }));
    } else if !output::is_quiet() {
        println!("  Deleted {deleted} result(s).");
    }
    Ok(())
}
