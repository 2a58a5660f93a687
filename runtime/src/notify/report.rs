//! Report rendering shared by the email and webhook channels.

use chrono::NaiveDate;
use rankscope::DomainResult;

pub const REPORT_TITLE: &str = "Domain Rating Report";

const MISSING: &str = "-";

/// Subject line, e.g. `Domain Rating Report - 2026-03-01`.
pub fn report_subject(date: NaiveDate) -> String {
    format!("{REPORT_TITLE} - {}", date.format("%Y-%m-%d"))
}

/// The rating shown for a result: the heuristic rating, else the
/// provider's domain trust, else `-`.
pub fn rating_label(r: &DomainResult) -> String {
    r.domain_rating
        .map(u32::from)
        .or(r.domain_trust)
        .map(|v| v.to_string())
        .unwrap_or_else(|| MISSING.to_string())
}

pub fn backlinks_label(r: &DomainResult) -> String {
    r.backlinks
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| MISSING.to_string())
}

fn referring_label(r: &DomainResult) -> String {
    r.referring_domains
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| MISSING.to_string())
}

/// HTML table of results for email bodies.
pub fn report_html(results: &[DomainResult]) -> String {
    let mut html = format!(
        "<h2>{REPORT_TITLE}</h2>\n\
         <table border=\"1\" style=\"border-collapse: collapse;\">\n\
         <tr><th>Domain</th><th>Rating</th><th>Backlinks</th><th>Referring Domains</th></tr>\n"
    );
    for r in results {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape_html(&r.domain),
            escape_html(&rating_label(r)),
            escape_html(&backlinks_label(r)),
            escape_html(&referring_label(r)),
        ));
    }
    html.push_str("</table>\n");
    html
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rankscope::{assemble, assemble_failure, CheckError, ExternalMetrics, MetricsSource};

    #[test]
    fn test_subject_date() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(report_subject(date), "Domain Rating Report - 2026-03-01");
    }

    #[test]
    fn test_missing_values_render_dash() {
        let err = CheckError::MalformedInput(String::new());
        let html = report_html(&[assemble_failure("bad.example", &err)]);
        assert!(html.contains("<td>bad.example</td><td>-</td><td>-</td><td>-</td>"));
    }

    #[test]
    fn test_paid_result_uses_domain_trust() {
        let r = assemble(
            "paid.example",
            MetricsSource::External {
                provider: "seranking.com".to_string(),
                metrics: ExternalMetrics {
                    domain_trust: 37,
                    page_trust: 2,
                    backlinks: "4.1K".to_string(),
                    referring_domains: "90".to_string(),
                    organic_traffic: 0,
                },
            },
        );
        assert_eq!(rating_label(&r), "37");
        let html = report_html(&[r]);
        assert!(html.contains("<td>paid.example</td><td>37</td><td>4.1K</td><td>90</td>"));
    }

    #[test]
    fn test_cells_are_escaped() {
        let err = CheckError::MalformedInput(String::new());
        let html = report_html(&[assemble_failure("<script>x&y</script>", &err)]);
        assert!(html.contains("&lt;script&gt;x&amp;y&lt;/script&gt;"));
        assert!(!html.contains("<script>"));
    }
}
