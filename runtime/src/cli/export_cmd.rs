//! `rankscope export <file.csv>`: write all stored results as CSV.

use crate::cli::output::{self, Styled};
use crate::csv_io;
use crate::store::Store;
use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;

pub fn run(store: &Store, out: &Path) -> Result<()> {
    let results = store.all_results()?;
    let file = File::create(out).with_context(|| format!("cannot create {}", out.display()))?;
    csv_io::write_results(file, &results)?;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "path": out.display().to_string(),
            "rows": results.len(),
        }));
    } else if !output::is_quiet() {
        let s = Styled::new();
        println!(
            "  {} Exported {} result(s) to {}",
            s.ok_sym(),
            results.len(),
            out.display()
        );
    }
    Ok(())
}
