//! Coverage percentage extraction from free-form tool output.
//!
//! Each dialect owns an ordered list of patterns; the generic list is the
//! table's default entry and only runs when the dialect's own patterns find
//! nothing. The first captured number that parses and lies within
//! [0, 100] wins.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::model::{is_percentage, Dialect};

struct PatternTable {
    dialects: HashMap<Dialect, Vec<Regex>>,
    generic: Vec<Regex>,
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!("(?i){p}")).expect("coverage pattern must compile"))
        .collect()
}

/// Coverage.py's `TOTAL` summary row, with or without branch columns.
const COVERAGE_PY_TOTAL: &str = r"TOTAL(?:\s+\d+)+\s+([\d.]+)%";

static TABLE: LazyLock<PatternTable> = LazyLock::new(|| {
    let mut dialects = HashMap::new();
    dialects.insert(
        Dialect::JsRunner,
        compile(&[
            // "All files | % Stmts | % Branch | % Funcs | ..." (funcs column)
            r"All files[^|]*\|[^|]*\|[^|]*\|\s*([\d.]+)",
            r"Statements\s*:\s*([\d.]+)%",
            r"Lines\s*:\s*([\d.]+)%",
            r"Functions\s*:\s*([\d.]+)%",
            r"Branches\s*:\s*([\d.]+)%",
        ]),
    );
    dialects.insert(Dialect::PytestCov, compile(&[COVERAGE_PY_TOTAL]));
    dialects.insert(Dialect::CoveragePy, compile(&[COVERAGE_PY_TOTAL]));
    dialects.insert(Dialect::GoCover, compile(&[r"coverage:\s*([\d.]+)%"]));
    dialects.insert(
        Dialect::Jacoco,
        compile(&[
            r"Total[^|]*\|[^|]*\|\s*([\d.]+)%",
            // HTML index: <td>Total</td><td class="bar">..</td><td class="ctr2">85%</td>
            r"Total</td>\s*<td[^>]*>[^<]*</td>\s*<td[^>]*>([\d.]+)%",
        ]),
    );
    dialects.insert(
        Dialect::SimpleCov,
        compile(&[
            r"Line Coverage:\s*([\d.]+)%",
            r"LOC\s*\(([\d.]+)%\)\s*covered",
        ]),
    );
    dialects.insert(
        Dialect::Tarpaulin,
        compile(&[r"([\d.]+)%\s*coverage,\s*\d+/\d+\s*lines covered"]),
    );

    let generic = compile(&[
        r"Coverage:\s*([\d.]+)%",
        r"Total coverage:\s*([\d.]+)%",
        r"Overall coverage:\s*([\d.]+)%",
        r"(\d+\.?\d*)%\s*coverage",
        // Last resort: any percentage at all.
        r"(\d+\.?\d*)%",
    ]);

    PatternTable { dialects, generic }
});

/// Extract a coverage percentage from `text`. `None` for the dialect means
/// the tool is unknown and only the generic patterns apply.
pub fn parse_coverage(text: &str, dialect: Option<Dialect>) -> Option<f64> {
    let table = &*TABLE;
    let specific = dialect
        .and_then(|d| table.dialects.get(&d))
        .and_then(|patterns| first_match(patterns, text));
    specific.or_else(|| first_match(&table.generic, text))
}

fn first_match(patterns: &[Regex], text: &str) -> Option<f64> {
    for pattern in patterns {
        for caps in pattern.captures_iter(text) {
            let value = caps
                .get(1)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .filter(|v| is_percentage(*v));
            if let Some(value) = value {
                debug!(value, pattern = pattern.as_str(), "coverage pattern matched");
                return Some(value);
            }
        }
    }
    None
}
