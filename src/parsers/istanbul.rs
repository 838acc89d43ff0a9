/// Reader for Istanbul / NYC `coverage-summary.json` (the `json-summary`
/// reporter).
///
/// ```json
/// { "total": { "lines": { "total": 200, "covered": 150, "skipped": 0, "pct": 75 }, ... },
///   "/abs/path/file.js": { ... } }
/// ```
///
/// `pct` is the string `"Unknown"` when nothing was instrumented, so the
/// counts are used whenever `pct` is not a number.
use serde_json::Value;

use super::{percent, Parser};
use crate::error::Result;

pub struct IstanbulSummaryParser;

impl Parser for IstanbulSummaryParser {
    fn parse(&self, input: &[u8]) -> Result<Option<f64>> {
        let v: Value = serde_json::from_slice(input)?;
        let Some(lines) = v.get("total").and_then(|t| t.get("lines")) else {
            return Ok(None);
        };
        if let Some(pct) = lines.get("pct").and_then(Value::as_f64) {
            return Ok(Some(pct));
        }
        let covered = lines.get("covered").and_then(Value::as_u64).unwrap_or(0);
        let total = lines.get("total").and_then(Value::as_u64).unwrap_or(0);
        Ok(percent(covered, total))
    }
}
