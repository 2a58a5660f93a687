//! Terminal output helpers shared by all subcommands.

use indicatif::{ProgressBar, ProgressStyle};
use rankscope::DomainResult;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::notify::report::{backlinks_label, rating_label};

static JSON: AtomicBool = AtomicBool::new(false);
static QUIET: AtomicBool = AtomicBool::new(false);
static NO_COLOR: AtomicBool = AtomicBool::new(false);

/// Record the global output flags. Called once from `main`.
pub fn init(json: bool, quiet: bool, no_color: bool) {
    JSON.store(json, Ordering::Relaxed);
    QUIET.store(quiet, Ordering::Relaxed);
    NO_COLOR.store(no_color || std::env::var_os("NO_COLOR").is_some(), Ordering::Relaxed);
}

pub fn is_json() -> bool {
    JSON.load(Ordering::Relaxed)
}

pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// Pretty-print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(_) => println!("{value}"),
    }
}

/// ANSI styling that switches off with `--no-color`.
pub struct Styled {
    color: bool,
}

impl Default for Styled {
    fn default() -> Self {
        Self::new()
    }
}

impl Styled {
    pub fn new() -> Self {
        Self {
            color: !NO_COLOR.load(Ordering::Relaxed),
        }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    pub fn ok_sym(&self) -> String {
        self.paint("32", "✓")
    }

    pub fn warn_sym(&self) -> String {
        self.paint("33", "!")
    }

    pub fn err_sym(&self) -> String {
        self.paint("31", "✗")
    }

    pub fn bold(&self, text: &str) -> String {
        self.paint("1", text)
    }

    pub fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }
}

/// A spinner on stderr, or `None` in quiet and JSON modes.
pub fn spinner(message: impl Into<String>) -> Option<ProgressBar> {
    if is_quiet() || is_json() {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("  {spinner:.cyan} {msg} {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// One line per result for human output.
pub fn result_line(s: &Styled, r: &DomainResult) -> String {
    let domain = s.bold(&format!("{:<32}", r.domain));
    if r.is_success() {
        format!(
            "  {} {} DR {:>4}  backlinks {:>8}  {}",
            s.ok_sym(),
            domain,
            rating_label(r),
            backlinks_label(r),
            s.dim(r.source.as_str()),
        )
    } else {
        format!(
            "  {} {} {}",
            s.err_sym(),
            domain,
            r.error.as_deref().unwrap_or("unknown error"),
        )
    }
}

/// Print results as JSON or as lines, honoring the global flags.
pub fn print_results(results: &[DomainResult]) {
    if is_json() {
        print_json(&serde_json::json!(results));
        return;
    }
    if is_quiet() {
        return;
    }
    let s = Styled::new();
    for r in results {
        println!("{}", result_line(&s, r));
    }
}
