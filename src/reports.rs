//! Post-execution scan of report files left behind by coverage tools.
//!
//! Each dialect has a fixed list of candidate paths. A candidate is first
//! read as text with the dialect's patterns; files with a known structured
//! format are then read by the matching report reader. The first plausible
//! percentage wins.

use std::path::Path;

use tracing::debug;

use crate::model::{is_percentage, Dialect};
use crate::parsers::{parse_report, ReportFormat};
use crate::patterns::parse_coverage;

type Candidate = (&'static str, Option<ReportFormat>);

/// Checked for every dialect, in this order.
static COMMON: [Candidate; 4] = [
    ("coverage/lcov-report/index.html", None),
    ("coverage/lcov.info", Some(ReportFormat::Lcov)),
    ("coverage.json", Some(ReportFormat::CoveragePyJson)),
    (
        "coverage/coverage-summary.json",
        Some(ReportFormat::IstanbulSummary),
    ),
];

fn extras(dialect: Dialect) -> &'static [Candidate] {
    match dialect {
        Dialect::Jacoco => &[
            ("target/site/jacoco/jacoco.xml", Some(ReportFormat::Jacoco)),
            (
                "build/reports/jacoco/test/jacocoTestReport.xml",
                Some(ReportFormat::Jacoco),
            ),
            ("target/site/jacoco/index.html", None),
        ],
        Dialect::GoCover => &[("coverage.out", Some(ReportFormat::GoCover))],
        Dialect::Tarpaulin => &[("cobertura.xml", Some(ReportFormat::Cobertura))],
        Dialect::CoveragePy => &[("coverage.xml", Some(ReportFormat::Cobertura))],
        Dialect::SimpleCov => &[("coverage/.last_run.json", Some(ReportFormat::SimpleCov))],
        Dialect::JsRunner | Dialect::PytestCov => &[],
    }
}

/// Candidate report paths for a dialect, relative to the checkout.
pub fn candidates(dialect: Dialect) -> impl Iterator<Item = &'static Candidate> {
    COMMON.iter().chain(extras(dialect))
}

/// Scan the checkout at `dir` for a report carrying a coverage percentage.
pub fn scan_report_files(dir: &Path, dialect: Dialect) -> Option<f64> {
    candidates(dialect).find_map(|(relative, format)| {
        let path = dir.join(relative);
        let content = std::fs::read(&path).ok()?;
        let value = read_candidate(&content, dialect, *format);
        if let Some(value) = value {
            debug!(file = %relative, value, "coverage found in report file");
        }
        value
    })
}

fn read_candidate(content: &[u8], dialect: Dialect, format: Option<ReportFormat>) -> Option<f64> {
    let text = String::from_utf8_lossy(content);
    if let Some(value) = parse_coverage(&text, Some(dialect)).filter(|v| is_percentage(*v)) {
        return Some(value);
    }
    let format = format?;
    match parse_report(format, content) {
        Ok(value) => value.filter(|v| is_percentage(*v)),
        Err(e) => {
            debug!(%format, "unreadable report: {e}");
            None
        }
    }
}
