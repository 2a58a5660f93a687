//! `rankscope track`: manage domains re-checked by the scheduler.

use crate::cli::output::{self, Styled};
use crate::store::Store;
use anyhow::Result;
use rankscope::normalize_domain;

pub fn add(store: &Store, raw: &str) -> Result<()> {
    let domain = normalize_domain(raw)?;
    let added = store.add_tracked_domain(&domain)?;
    if output::is_json() {
        output::print_json(&serde_json::json!({ "domain": domain, "added": added }));
    } else if !output::is_quiet() {
        let s = Styled::new();
        if added {
            println!("  {} Tracking {domain}", s.ok_sym());
        } else {
            println!("  {} {domain} is already tracked", s.warn_sym());
        }
    }
    Ok(())
}

pub fn list(store: &Store) -> Result<()> {
    let domains = store.tracked_domains()?;
    if output::is_json() {
        output::print_json(&serde_json::json!(domains));
    } else if !output::is_quiet() {
        if domains.is_empty() {
            println!("  No tracked domains.");
        }
        for d in &domains {
            println!("  {d}");
        }
    }
    Ok(())
}

pub fn remove(store: &Store, domain: &str) -> Result<()> {
    let removed = store.remove_tracked_domain(domain)?;
    if output::is_json() {
        output::print_json(&serde_json::json!({ "domain": domain, "removed": removed }));
    } else if !output::is_quiet() {
        let s = Styled::new();
        if removed {
            println!("  {} Stopped tracking {domain}", s.ok_sym());
        } else {
            println!("  {} {domain} was not tracked", s.warn_sym());
        }
    }
    Ok(())
}
