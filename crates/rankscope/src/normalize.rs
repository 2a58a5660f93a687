//! Domain normalization.
//!
//! Applied once, before any other component sees the domain: scheme,
//! `www.` prefix and everything from the first `/` are removed. Case is
//! preserved.

use crate::types::{CheckError, CheckResult};

const SCHEMES: [&str; 2] = ["https://", "http://"];
const WWW: &str = "www.";

/// Normalize a raw domain string, rejecting input that ends up empty.
pub fn normalize_domain(raw: &str) -> CheckResult<String> {
    let domain = clean_domain(raw);
    if domain.is_empty() {
        return Err(CheckError::MalformedInput(raw.to_string()));
    }
    Ok(domain)
}

/// Best-effort normalization that never fails.
///
/// Prefixes are stripped repeatedly so that the result is a fixed point:
/// `clean_domain(clean_domain(x)) == clean_domain(x)`.
pub fn clean_domain(raw: &str) -> String {
    let mut rest = raw.trim_start();
    loop {
        let stripped = strip_prefix_ignore_case(rest, SCHEMES[0])
            .or_else(|| strip_prefix_ignore_case(rest, SCHEMES[1]))
            .or_else(|| strip_prefix_ignore_case(rest, WWW));
        match stripped {
            Some(next) => rest = next.trim_start(),
            None => break,
        }
    }

    let host = rest.split('/').next().unwrap_or("");
    host.trim_end().to_string()
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        s.get(prefix.len()..)
    } else {
        None
    }
}
