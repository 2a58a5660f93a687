//! CSV import of domain lists and export of stored results.

use anyhow::{bail, Context, Result};
use rankscope::DomainResult;
use std::io::{Read, Write};

/// Header names accepted for the domain column, in order of preference.
pub const DOMAIN_COLUMNS: [&str; 6] = ["domain", "Domain", "url", "URL", "website", "Website"];

pub const EXPORT_HEADER: [&str; 5] = [
    "Domain",
    "Domain Rating",
    "Backlinks",
    "Referring Domains",
    "Checked At",
];

pub const NO_DOMAINS_ERROR: &str =
    "No valid domains found in CSV. Make sure you have a \"domain\" column.";

/// Read domains from CSV with a header row.
///
/// Values are trimmed, a leading `http://` or `https://` and one trailing
/// `/` are removed, and empty values are skipped. Fails when no domain
/// survives.
pub fn read_domains<R: Read>(input: R) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let headers = reader.headers().context("Failed to parse CSV file")?.clone();
    let Some(column) = DOMAIN_COLUMNS
        .iter()
        .find_map(|name| headers.iter().position(|h| h.trim() == *name))
    else {
        bail!(NO_DOMAINS_ERROR);
    };

    let mut domains = Vec::new();
    for record in reader.records() {
        let record = record.context("Failed to parse CSV file")?;
        if let Some(domain) = record.get(column).map(clean_cell).filter(|d| !d.is_empty()) {
            domains.push(domain);
        }
    }

    if domains.is_empty() {
        bail!(NO_DOMAINS_ERROR);
    }
    Ok(domains)
}

fn clean_cell(raw: &str) -> String {
    let value = raw.trim();
    let value = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))
        .unwrap_or(value);
    value.strip_suffix('/').unwrap_or(value).to_string()
}

/// Write results as CSV. Missing values become empty cells.
pub fn write_results<W: Write>(output: W, results: &[DomainResult]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(EXPORT_HEADER)?;

    for r in results {
        writer.write_record([
            r.domain.clone(),
            r.domain_rating.map(|v| v.to_string()).unwrap_or_default(),
            r.backlinks.as_ref().map(|v| v.to_string()).unwrap_or_default(),
            r.referring_domains
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_default(),
            r.checked_at.to_rfc3339(),
        ])?;
    }

    writer.flush().context("failed to write CSV")?;
    Ok(())
}

/// Render results to an in-memory CSV string.
pub fn results_to_string(results: &[DomainResult]) -> Result<String> {
    let mut buf = Vec::new();
    write_results(&mut buf, results)?;
    String::from_utf8(buf).context("CSV output is not UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rankscope::{assemble_at, ExternalMetrics, MetricsSource};

    #[test]
    fn test_read_domain_column() {
        let csv = "name,domain\nA, https://example.com/ \nB,http://www.test.org\nC,\nD,plain.net\n";
        let domains = read_domains(csv.as_bytes()).unwrap();
        assert_eq!(domains, ["example.com", "www.test.org", "plain.net"]);
    }

    #[test]
    fn test_column_aliases_in_preference_order() {
        let csv = "Website,url\nsite.com,url.com\n";
        assert_eq!(read_domains(csv.as_bytes()).unwrap(), ["url.com"]);

        let csv = "Website\nsite.com\n";
        assert_eq!(read_domains(csv.as_bytes()).unwrap(), ["site.com"]);
    }

    #[test]
    fn test_only_one_trailing_slash_removed() {
        let csv = "domain\nexample.com//\n";
        assert_eq!(read_domains(csv.as_bytes()).unwrap(), ["example.com/"]);
    }

    #[test]
    fn test_no_domain_column() {
        let err = read_domains("name,email\nA,a@x.com\n".as_bytes()).unwrap_err();
        assert_eq!(err.to_string(), NO_DOMAINS_ERROR);
    }

    #[test]
    fn test_only_empty_values() {
        let err = read_domains("domain\n \n\n".as_bytes()).unwrap_err();
        assert_eq!(err.to_string(), NO_DOMAINS_ERROR);
    }

    #[test]
    fn test_export_paid_result() {
        let r = assemble_at(
            "paid.com",
            MetricsSource::External {
                provider: "seranking.com".to_string(),
                metrics: ExternalMetrics {
                    domain_trust: 40,
                    page_trust: 10,
                    backlinks: "1.2K".to_string(),
                    referring_domains: "300".to_string(),
                    organic_traffic: 0,
                },
            },
            Utc.with_ymd_and_hms(2026, 5, 4, 3, 2, 1).unwrap(),
        );
        let out = results_to_string(&[r]).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], "Domain,Domain Rating,Backlinks,Referring Domains,Checked At");
        assert_eq!(lines[1], "paid.com,,1.2K,300,2026-05-04T03:02:01+00:00");
    }
}
