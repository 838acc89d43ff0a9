/// Reader for the LCOV `.info` format.
///
/// Reference: https://ltp.sourceforge.net/coverage/lcov/geninfo.1.php
///
/// Records used:
///   SF:<source file>
///   DA:<line number>,<execution count>[,<checksum>]
///   LF:<lines found>
///   LH:<lines hit>
///   end_of_record
///
/// The per-record `LF`/`LH` summaries are preferred. Files that omit them
/// are counted from their `DA` lines instead.
use super::{percent, Parser};
use crate::error::{HarvestError, Result};

pub struct LcovParser;

impl Parser for LcovParser {
    fn parse(&self, input: &[u8]) -> Result<Option<f64>> {
        let text = std::str::from_utf8(input)
            .map_err(|e| HarvestError::Parse(format!("Invalid UTF-8 in LCOV data: {e}")))?;
        Ok(parse_totals(text))
    }
}

#[derive(Default)]
struct Record {
    found: Option<u64>,
    hit: Option<u64>,
    da_total: u64,
    da_hit: u64,
}

impl Record {
    fn totals(&self) -> (u64, u64) {
        match (self.hit, self.found) {
            (Some(hit), Some(found)) => (hit, found),
            _ => (self.da_hit, self.da_total),
        }
    }
}

fn parse_totals(text: &str) -> Option<f64> {
    let mut covered = 0;
    let mut total = 0;
    let mut record: Option<Record> = None;

    for line in text.lines().map(str::trim) {
        if line == "end_of_record" {
            if let Some(r) = record.take() {
                let (hit, found) = r.totals();
                covered += hit;
                total += found;
            }
            continue;
        }
        let Some((tag, value)) = line.split_once(':') else {
            continue;
        };
        match tag {
            "SF" => record = Some(Record::default()),
            "LF" => {
                if let Some(r) = record.as_mut() {
                    r.found = value.parse().ok();
                }
            }
            "LH" => {
                if let Some(r) = record.as_mut() {
                    r.hit = value.parse().ok();
                }
            }
            "DA" => {
                // Negative counts mark non-instrumentable lines.
                if let Some(r) = record.as_mut() {
                    let count = value.split(',').nth(1).and_then(|c| c.parse::<i64>().ok());
                    if let Some(count) = count.filter(|c| *c >= 0) {
                        r.da_total += 1;
                        if count > 0 {
                            r.da_hit += 1;
                        }
                    }
                }
            }
            _ => {}
        }
    }

    // Trailing record without end_of_record.
    if let Some(r) = record {
        let (hit, found) = r.totals();
        covered += hit;
        total += found;
    }

    percent(covered, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_lines_preferred() {
        let input = b"TN:\nSF:/src/a.js\nDA:1,1\nLF:10\nLH:8\nend_of_record\nSF:/src/b.js\nLF:10\nLH:2\nend_of_record\n";
        assert_eq!(LcovParser.parse(input).unwrap(), Some(50.0));
    }

    #[test]
    fn test_counts_da_lines_without_summary() {
        let input = b"SF:/src/lib.rs\nDA:1,5\nDA:2,-1\nDA:3,0\nDA:4,3\nDA:5,1\nend_of_record\n";
        assert_eq!(LcovParser.parse(input).unwrap(), Some(75.0));
    }

    #[test]
    fn test_missing_end_of_record() {
        let input = b"SF:/src/lib.rs\nDA:1,1\nDA:2,0\n";
        assert_eq!(LcovParser.parse(input).unwrap(), Some(50.0));
    }

    #[test]
    fn test_empty() {
        assert_eq!(LcovParser.parse(b"TN:only\n").unwrap(), None);
    }
}
