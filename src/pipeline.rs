//! Per-repository orchestration and the batch loop.
//!
//! A [`Collector`] turns one repository descriptor into one
//! [`CoverageResult`]. [`TestRunCollector`] clones, detects, installs, runs
//! and parses; [`BadgeCollector`] only reads what the project publishes.
//! Neither ever fails: every fault ends up as the result's error string.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::Timeouts;
use crate::detect::detect_tooling;
use crate::error::Result;
use crate::extract::Extractor;
use crate::install::install_dependencies;
use crate::manifest;
use crate::model::{CoverageResult, Dialect, ExecutionOutcome, RepositoryDescriptor, Source};
use crate::patterns::parse_coverage;
use crate::reports::scan_report_files;
use crate::runner::{run_safely, truncate, CommandRunner, Invocation};
use crate::store::ResultsStore;

/// How much stderr a test failure message carries.
const FAILURE_STDERR_CHARS: usize = 500;

pub trait Collector {
    fn collect(&self, repo: &RepositoryDescriptor) -> CoverageResult;
}

/// Measures coverage by running the project's own test suite.
pub struct TestRunCollector<'a> {
    runner: &'a dyn CommandRunner,
    timeouts: Timeouts,
    workdir: Option<PathBuf>,
}

impl<'a> TestRunCollector<'a> {
    pub fn new(runner: &'a dyn CommandRunner, timeouts: Timeouts, workdir: Option<PathBuf>) -> Self {
        Self {
            runner,
            timeouts,
            workdir,
        }
    }
}

impl Collector for TestRunCollector<'_> {
    fn collect(&self, repo: &RepositoryDescriptor) -> CoverageResult {
        let mut builder = tempfile::Builder::new();
        builder.prefix("covharvest-");
        let scratch = match &self.workdir {
            Some(dir) => builder.tempdir_in(dir),
            None => builder.tempdir(),
        };
        let scratch = match scratch {
            Ok(s) => s,
            Err(e) => return CoverageResult::failed(repo.clone(), format!("Failed to clone: {e}")),
        };
        // Dropping `scratch` removes the checkout.
        run_coverage(self.runner, repo, &scratch.path().join(&repo.name), &self.timeouts)
    }
}

/// Reads coverage from README badges and the Coveralls dashboard.
pub struct BadgeCollector<'a> {
    extractor: &'a Extractor<'a>,
}

impl<'a> BadgeCollector<'a> {
    pub fn new(extractor: &'a Extractor<'a>) -> Self {
        Self { extractor }
    }
}

impl Collector for BadgeCollector<'_> {
    fn collect(&self, repo: &RepositoryDescriptor) -> CoverageResult {
        self.extractor.extract_smart(repo)
    }
}

/// Clone `repo` into `checkout` and take it through detection, install,
/// test execution and coverage extraction.
pub fn run_coverage(
    runner: &dyn CommandRunner,
    repo: &RepositoryDescriptor,
    checkout: &Path,
    timeouts: &Timeouts,
) -> CoverageResult {
    let target = checkout.to_string_lossy();
    let clone = Invocation::new(
        ["git", "clone", "--depth", "1", repo.clone_url.as_str(), &*target],
        timeouts.clone,
    );
    info!(repo = %repo.full_name(), "cloning");
    let cloned = run_safely(runner, &clone);
    if !cloned.is_success() {
        return CoverageResult::failed(repo.clone(), format!("Failed to clone: {}", cloned.message()));
    }

    let Some(profile) = detect_tooling(checkout) else {
        return CoverageResult::failed(repo.clone(), "No test command detected");
    };
    let mut command = profile.command;
    if manifest::has_link_dependencies(checkout) {
        command = adapt_for_yarn(&command);
    }
    info!(repo = %repo.full_name(), %command, dialect = %profile.dialect, "detected tooling");

    let installed = install_dependencies(runner, checkout, timeouts);
    if !installed.is_success() {
        return CoverageResult::failed(
            repo.clone(),
            format!("Failed to install dependencies: {}", installed.message()),
        )
        .with_test_command(command);
    }

    let invocation = Invocation::from_command_line(&command, timeouts.test_run).in_dir(checkout);
    info!(repo = %repo.full_name(), %command, "running tests");
    let result = match runner.execute(&invocation) {
        Ok(outcome) => evaluate_execution(repo, &outcome, profile.dialect, checkout),
        Err(e) => CoverageResult::failed(repo.clone(), e.to_string()),
    };
    result.with_test_command(command)
}

/// Rewrite an npm command for yarn, which installs link-dependency
/// projects and so must also run their tests.
pub fn adapt_for_yarn(command: &str) -> String {
    match command.strip_prefix("npm ") {
        Some(rest) => format!("yarn {rest}").replace(" -- ", " "),
        None => command.to_string(),
    }
}

/// Turn a finished test run into a result. Coverage found anywhere wins,
/// whatever the exit status.
pub fn evaluate_execution(
    repo: &RepositoryDescriptor,
    outcome: &ExecutionOutcome,
    dialect: Dialect,
    checkout: &Path,
) -> CoverageResult {
    if outcome.timed_out {
        return CoverageResult::failed(repo.clone(), "Test timeout");
    }

    let coverage = parse_coverage(&outcome.stdout, Some(dialect))
        .or_else(|| parse_coverage(&outcome.stderr, Some(dialect)))
        .or_else(|| scan_report_files(checkout, dialect));

    match coverage {
        Some(value) => {
            if !outcome.success() {
                warn!(repo = %repo.full_name(), exit_code = ?outcome.exit_code, "tests failed but coverage was produced");
            }
            CoverageResult::found(repo.clone(), value, Source::TestRun)
        }
        None if outcome.success() => {
            CoverageResult::failed(repo.clone(), "No coverage data found in test output")
        }
        None => CoverageResult::failed(
            repo.clone(),
            format!(
                "Tests failed: {}...",
                truncate(&outcome.stderr, FAILURE_STDERR_CHARS)
            ),
        ),
    }
}

/// Counts from one batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub processed: usize,
    pub skipped: usize,
    pub succeeded: usize,
}

/// Collect every repository not yet in `store`, then write the store once.
pub fn run_batch(
    collector: &dyn Collector,
    repos: &[RepositoryDescriptor],
    store: &mut ResultsStore,
) -> Result<BatchReport> {
    let done = store.processed();
    let mut report = BatchReport::default();
    let total = repos.len();

    for (i, repo) in repos.iter().enumerate() {
        let name = repo.full_name();
        if done.contains(&name) {
            info!(repo = %name, "already processed, skipping");
            report.skipped += 1;
            continue;
        }
        info!(repo = %name, stars = repo.stars, language = %repo.language, "[{}/{}] processing", i + 1, total);
        let result = collector.collect(repo);
        match (&result.coverage_percentage, &result.error) {
            (Some(value), _) => info!(repo = %name, "coverage: {value:.1}%"),
            (None, Some(error)) => warn!(repo = %name, "no coverage: {error}"),
            (None, None) => {}
        }
        report.processed += 1;
        if result.is_success() {
            report.succeeded += 1;
        }
        store.append(&result);
    }

    store.save()?;
    Ok(report)
}
