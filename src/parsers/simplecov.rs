/// Reader for SimpleCov's `coverage/.last_run.json`.
///
/// Current releases write `{"result": {"line": 87.5, "branch": 60.0}}`;
/// older ones wrote `{"result": {"covered_percent": 87.5}}`.
use serde_json::Value;

use super::Parser;
use crate::error::Result;

pub struct SimpleCovParser;

impl Parser for SimpleCovParser {
    fn parse(&self, input: &[u8]) -> Result<Option<f64>> {
        let v: Value = serde_json::from_slice(input)?;
        let result = v.get("result");
        Ok(["line", "covered_percent"]
            .iter()
            .find_map(|key| result.and_then(|r| r.get(key)).and_then(Value::as_f64)))
    }
}
