//! Core data model: what the pipeline consumes (repository descriptors),
//! what it derives along the way (tooling profiles, execution outcomes) and
//! what it records (coverage results).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::HarvestError;

/// Compute a coverage rate, returning 0.0 when the total is zero.
#[must_use]
pub fn rate(covered: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        covered as f64 / total as f64
    }
}

/// Whether a number can plausibly be a coverage percentage.
#[must_use]
pub fn is_percentage(value: f64) -> bool {
    value.is_finite() && (0.0..=100.0).contains(&value)
}

/// A repository as returned by the discovery collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryDescriptor {
    pub owner: String,
    pub name: String,
    pub stars: u64,
    pub language: String,
    pub clone_url: String,
}

impl RepositoryDescriptor {
    /// Build a descriptor for a single `owner/name` override, without
    /// consulting the search API.
    pub fn from_full_name(full_name: &str) -> std::result::Result<Self, HarvestError> {
        let (owner, name) = full_name
            .split_once('/')
            .filter(|(o, n)| !o.is_empty() && !n.is_empty() && !n.contains('/'))
            .ok_or_else(|| HarvestError::InvalidRepo(full_name.to_string()))?;
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
            stars: 0,
            language: "Unknown".to_string(),
            clone_url: format!("https://github.com/{full_name}.git"),
        })
    }

    /// The "owner/name" identifier used as the persistence key.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    #[must_use]
    pub fn html_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }
}

/// Which coverage tool's conventions apply when reading output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// jest / nyc / istanbul console tables.
    JsRunner,
    PytestCov,
    /// coverage.py driven through tox.
    CoveragePy,
    Jacoco,
    GoCover,
    SimpleCov,
    Tarpaulin,
}

impl Dialect {
    pub const ALL: [Dialect; 7] = [
        Dialect::JsRunner,
        Dialect::PytestCov,
        Dialect::CoveragePy,
        Dialect::Jacoco,
        Dialect::GoCover,
        Dialect::SimpleCov,
        Dialect::Tarpaulin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::JsRunner => "jest/nyc",
            Dialect::PytestCov => "pytest-cov",
            Dialect::CoveragePy => "coverage.py",
            Dialect::Jacoco => "jacoco",
            Dialect::GoCover => "go-cover",
            Dialect::SimpleCov => "simplecov",
            Dialect::Tarpaulin => "tarpaulin",
        }
    }
}

impl std::str::FromStr for Dialect {
    type Err = HarvestError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.to_lowercase();
        Dialect::ALL
            .into_iter()
            .find(|d| d.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Dialect::ALL.iter().map(Dialect::as_str).collect();
                HarvestError::Parse(format!(
                    "Unknown dialect: '{}'. Supported: {}",
                    s,
                    known.join(", ")
                ))
            })
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The detected way to run a repository's tests with coverage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolingProfile {
    pub command: String,
    pub dialect: Dialect,
}

impl ToolingProfile {
    pub fn new(command: impl Into<String>, dialect: Dialect) -> Self {
        Self {
            command: command.into(),
            dialect,
        }
    }
}

/// Captured result of running a command to completion or timeout.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed by a signal (including timeout).
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub elapsed: Duration,
}

impl ExecutionOutcome {
    #[must_use]
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Where a recorded coverage value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    #[serde(rename = "test run")]
    TestRun,
    #[serde(rename = "README")]
    Readme,
    #[serde(rename = "Coveralls.io")]
    Coveralls,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::TestRun => "test run",
            Source::Readme => "README",
            Source::Coveralls => "Coveralls.io",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome for one repository. Built through [`CoverageResult::found`]
/// or [`CoverageResult::failed`], so it always carries either a percentage
/// or an error.
#[derive(Debug, Clone)]
pub struct CoverageResult {
    pub repo: RepositoryDescriptor,
    pub coverage_percentage: Option<f64>,
    pub total_lines: Option<u64>,
    pub source: Option<Source>,
    pub test_command: Option<String>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl CoverageResult {
    pub fn found(repo: RepositoryDescriptor, coverage: f64, source: Source) -> Self {
        Self {
            repo,
            coverage_percentage: Some(coverage),
            total_lines: None,
            source: Some(source),
            test_command: None,
            error: None,
            timestamp: now_timestamp(),
        }
    }

    pub fn failed(repo: RepositoryDescriptor, error: impl Into<String>) -> Self {
        Self {
            repo,
            coverage_percentage: None,
            total_lines: None,
            source: None,
            test_command: None,
            error: Some(error.into()),
            timestamp: now_timestamp(),
        }
    }

    #[must_use]
    pub fn with_test_command(mut self, command: impl Into<String>) -> Self {
        self.test_command = Some(command.into());
        self
    }

    #[must_use]
    pub fn with_total_lines(mut self, total_lines: Option<u64>) -> Self {
        self.total_lines = total_lines;
        self
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.coverage_percentage.is_some()
    }
}

/// The persisted form of a [`CoverageResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub repo: String,
    pub url: String,
    pub stars: u64,
    pub language: String,
    pub coverage: Option<f64>,
    pub total_lines: Option<u64>,
    pub source: Option<Source>,
    #[serde(default)]
    pub test_command: Option<String>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl From<&CoverageResult> for ResultRecord {
    fn from(result: &CoverageResult) -> Self {
        Self {
            repo: result.repo.full_name(),
            url: result.repo.html_url(),
            stars: result.repo.stars,
            language: result.repo.language.clone(),
            coverage: result.coverage_percentage,
            total_lines: result.total_lines,
            source: result.source,
            test_command: result.test_command.clone(),
            error: result.error.clone(),
            timestamp: result.timestamp.clone(),
        }
    }
}

fn now_timestamp() -> String {
    chrono::Local::now().to_rfc3339()
}
