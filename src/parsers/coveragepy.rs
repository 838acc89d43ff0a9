/// Reader for coverage.py's JSON report (`pytest --cov-report=json`,
/// `coverage json`).
///
/// ```json
/// { "meta": { ... }, "files": { ... },
///   "totals": { "covered_lines": 70, "num_statements": 80, "percent_covered": 87.5 } }
/// ```
use serde::Deserialize;

use super::{percent, Parser};
use crate::error::Result;

pub struct CoveragePyParser;

#[derive(Deserialize)]
struct Report {
    totals: Option<Totals>,
}

#[derive(Deserialize)]
struct Totals {
    percent_covered: Option<f64>,
    covered_lines: Option<u64>,
    num_statements: Option<u64>,
}

impl Parser for CoveragePyParser {
    fn parse(&self, input: &[u8]) -> Result<Option<f64>> {
        let report: Report = serde_json::from_slice(input)?;
        let Some(totals) = report.totals else {
            return Ok(None);
        };
        Ok(totals.percent_covered.or_else(|| {
            percent(
                totals.covered_lines.unwrap_or(0),
                totals.num_statements.unwrap_or(0),
            )
        }))
    }
}
