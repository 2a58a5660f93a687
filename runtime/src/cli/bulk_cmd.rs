//! `rankscope bulk <file.csv>`: check every domain listed in a CSV file.

use crate::cli::output::{self, Styled};
use crate::csv_io;
use crate::server::AppContext;
use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;

/// Check the domains in `input`, optionally writing results to `out`.
pub async fn run(ctx: &AppContext, input: &Path, out: Option<&Path>) -> Result<()> {
    let file = File::open(input).with_context(|| format!("cannot open {}", input.display()))?;
    let domains = csv_io::read_domains(file)?;

    let pb = output::spinner(format!(
        "Checking {} domains from {}",
        domains.len(),
        input.display()
    ));
    let results = ctx.check_and_save(&domains).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    let results = results?;

    if let Some(out) = out {
        let file =
            File::create(out).with_context(|| format!("cannot create {}", out.display()))?;
        csv_io::write_results(file, &results)?;
    }

    output::print_results(&results);
    if !output::is_quiet() && !output::is_json() {
        let s = Styled::new();
        let ok = results.iter().filter(|r| r.is_success()).count();
        println!();
        println!(
            "  {} {ok}/{} succeeded{}",
            s.ok_sym(),
            results.len(),
            out.map(|p| format!(", written to {}", p.display()))
                .unwrap_or_default()
        );
    }
    Ok(())
}
