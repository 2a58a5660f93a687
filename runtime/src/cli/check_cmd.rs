//! `rankscope check <domain>...`: check, save and print.

use crate::cli::output;
use crate::server::AppContext;
use anyhow::Result;

pub async fn run(ctx: &AppContext, domains: &[String]) -> Result<()> {
    let pb = output::spinner(format!("Checking {} domain(s)", domains.len()));
    let results = ctx.check_and_save(domains).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    output::print_results(&results?);
    Ok(())
}
