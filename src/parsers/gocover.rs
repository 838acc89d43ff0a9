/// Reader for Go's `-coverprofile` format.
///
/// Reference: https://go.dev/blog/cover
///
/// Format:
///   mode: set|count|atomic
///   <file>:<startLine>.<startCol>,<endLine>.<endCol> <numStatements> <count>
///
/// Coverage is covered statements over total statements, which is what
/// `go tool cover -func` reports. Profiles merged from several packages can
/// repeat a block; a repeated block counts once, with its highest count.
use std::collections::HashMap;

use super::{percent, Parser};
use crate::error::{HarvestError, Result};

pub struct GocoverParser;

impl Parser for GocoverParser {
    fn parse(&self, input: &[u8]) -> Result<Option<f64>> {
        let text = std::str::from_utf8(input)
            .map_err(|e| HarvestError::Parse(format!("Invalid UTF-8 in Go profile: {e}")))?;

        // block key -> (statements, max count)
        let mut blocks: HashMap<&str, (u64, u64)> = HashMap::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with("mode:") {
                continue;
            }
            let (key, statements, count) = parse_block(line).ok_or_else(|| {
                HarvestError::Parse(format!("Malformed Go profile line {}: {line}", idx + 1))
            })?;
            let entry = blocks.entry(key).or_insert((statements, 0));
            entry.1 = entry.1.max(count);
        }

        let total = blocks.values().map(|(s, _)| s).sum();
        let covered = blocks
            .values()
            .filter(|(_, count)| *count > 0)
            .map(|(s, _)| s)
            .sum();
        Ok(percent(covered, total))
    }
}

/// Split `file.go:1.2,3.4 5 6` into the block key and its two counters.
fn parse_block(line: &str) -> Option<(&str, u64, u64)> {
    let mut parts = line.rsplitn(3, ' ');
    let count = parts.next()?.parse().ok()?;
    let statements = parts.next()?.parse().ok()?;
    let key = parts.next()?;
    key.contains(':').then_some((key, statements, count))
}
