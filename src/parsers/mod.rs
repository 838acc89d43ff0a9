//! Structured coverage report readers.
//!
//! Console output is not the only place coverage shows up: most tools also
//! write a machine-readable report. Each reader here knows one such format
//! and computes the overall line coverage it records.

pub mod cobertura;
pub mod coveragepy;
pub mod gocover;
pub mod istanbul;
pub mod jacoco;
pub mod lcov;
pub mod simplecov;

use quick_xml::events::BytesStart;

use crate::error::{HarvestError, Result};
use crate::model::rate;

/// Every report reader implements this trait.
pub trait Parser {
    /// Overall line coverage in percent, or `None` when the report carries
    /// no instrumented lines.
    fn parse(&self, input: &[u8]) -> Result<Option<f64>>;
}

/// Structured report formats the file scan knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Lcov,
    IstanbulSummary,
    CoveragePyJson,
    Cobertura,
    Jacoco,
    GoCover,
    SimpleCov,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Lcov => "lcov",
            ReportFormat::IstanbulSummary => "istanbul-summary",
            ReportFormat::CoveragePyJson => "coverage.py-json",
            ReportFormat::Cobertura => "cobertura",
            ReportFormat::Jacoco => "jacoco",
            ReportFormat::GoCover => "gocover",
            ReportFormat::SimpleCov => "simplecov",
        }
    }

    fn parser(&self) -> &'static dyn Parser {
        match self {
            ReportFormat::Lcov => &lcov::LcovParser,
            ReportFormat::IstanbulSummary => &istanbul::IstanbulSummaryParser,
            ReportFormat::CoveragePyJson => &coveragepy::CoveragePyParser,
            ReportFormat::Cobertura => &cobertura::CoberturaParser,
            ReportFormat::Jacoco => &jacoco::JacocoParser,
            ReportFormat::GoCover => &gocover::GocoverParser,
            ReportFormat::SimpleCov => &simplecov::SimpleCovParser,
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read a report of the given format.
pub fn parse_report(format: ReportFormat, input: &[u8]) -> Result<Option<f64>> {
    format.parser().parse(input)
}

/// Percentage from covered/total counts; `None` when nothing was counted.
pub(crate) fn percent(covered: u64, total: u64) -> Option<f64> {
    (total > 0).then(|| rate(covered, total) * 100.0)
}

pub(crate) fn get_attr(e: &BytesStart, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

pub(crate) fn xml_err<R>(source: quick_xml::Error, reader: &quick_xml::Reader<R>) -> HarvestError {
    HarvestError::Xml {
        source,
        position: reader.buffer_position(),
    }
}
