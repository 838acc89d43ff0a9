//! Command handler functions for the covharvest CLI.
//!
//! Each `cmd_*` function returns its output as a `String`, making them easy
//! to test without capturing stdout.

use std::fmt::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;

use crate::config::{Config, DiscoveryOptions};
use crate::detect::detect_tooling;
use crate::extract::Extractor;
use crate::fetch::Fetcher;
use crate::github::GitHub;
use crate::model::{Dialect, RepositoryDescriptor, ResultRecord};
use crate::patterns::parse_coverage;
use crate::pipeline::{run_batch, BadgeCollector, Collector, TestRunCollector};
use crate::runner::CommandRunner;
use crate::store::{summarize, ResultsStore};

/// Which collector the `collect` command uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Clone each repository and run its tests.
    TestRun,
    /// Read README badges and the Coveralls dashboard.
    Badges,
}

/// Arguments of the `collect` command after CLI parsing.
#[derive(Debug, Clone)]
pub struct CollectRequest {
    pub count: usize,
    pub repo: Option<String>,
    pub mode: Mode,
    pub min_stars: u64,
}

pub fn cmd_collect(
    request: &CollectRequest,
    config: &Config,
    runner: &dyn CommandRunner,
    fetcher: &dyn Fetcher,
) -> Result<String> {
    // Validate before touching the results file.
    let single = request
        .repo
        .as_deref()
        .map(RepositoryDescriptor::from_full_name)
        .transpose()?;

    let mut store = ResultsStore::load(&config.results_path).with_context(|| {
        format!("Failed to read results from {}", config.results_path.display())
    })?;

    let github = GitHub::new(fetcher, config.token.clone(), config.timeouts.clone());
    let extractor = Extractor::new(&github, fetcher, config.timeouts.clone());
    let collector: Box<dyn Collector + '_> = match request.mode {
        Mode::TestRun => Box::new(TestRunCollector::new(
            runner,
            config.timeouts.clone(),
            config.workdir.clone(),
        )),
        Mode::Badges => Box::new(BadgeCollector::new(&extractor)),
    };

    let mut out = String::new();

    if let Some(repo) = single {
        if store.processed().contains(&repo.full_name()) {
            writeln!(
                out,
                "{} is already recorded in {}",
                repo.full_name(),
                store.path().display()
            )
            .unwrap();
            return Ok(out);
        }
        writeln!(out, "Testing single repo: {}", repo.full_name()).unwrap();
        let result = collector.collect(&repo);
        match (result.coverage_percentage, &result.error) {
            (Some(value), _) => writeln!(out, "✓ Success! Coverage: {value:.1}%").unwrap(),
            (None, error) => {
                writeln!(out, "✗ Error: {}", error.as_deref().unwrap_or("unknown")).unwrap()
            }
        }
        store.append(&result);
        store.save().context("Failed to write results")?;
        writeln!(out, "Results saved to {}", store.path().display()).unwrap();
        return Ok(out);
    }

    let opts = DiscoveryOptions {
        count: request.count,
        min_stars: request.min_stars,
        ..DiscoveryOptions::default()
    };
    let repos = github
        .search_top_repos(&opts)
        .context("Repository discovery failed")?;
    writeln!(out, "Found {} code repositories", repos.len()).unwrap();

    let report = run_batch(collector.as_ref(), &repos, &mut store)
        .context("Failed to write results")?;
    writeln!(
        out,
        "Processed {} repositories ({} already recorded, {} with coverage)",
        report.processed, report.skipped, report.succeeded
    )
    .unwrap();
    writeln!(out, "Results saved to {}", store.path().display()).unwrap();
    out.push('\n');
    out.push_str(&summary_text(store.records()));
    Ok(out)
}

pub fn cmd_detect(dir: &Path) -> Result<String> {
    anyhow::ensure!(dir.is_dir(), "Not a directory: {}", dir.display());
    Ok(match detect_tooling(dir) {
        Some(profile) => format!(
            "Test command: {}\nDialect:      {}\n",
            profile.command, profile.dialect
        ),
        None => "No test command detected\n".to_string(),
    })
}

pub fn cmd_parse(file: &Path, dialect: Option<&str>) -> Result<String> {
    let dialect = dialect.map(str::parse::<Dialect>).transpose()?;
    let bytes = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(match parse_coverage(&text, dialect) {
        Some(value) => format!("Coverage: {value}%\n"),
        None => "No coverage found\n".to_string(),
    })
}

pub fn cmd_summary(results: &Path) -> Result<String> {
    let store = ResultsStore::load(results)
        .with_context(|| format!("Failed to read results from {}", results.display()))?;
    if store.records().is_empty() {
        return Ok(format!("No results in {}\n", results.display()));
    }
    Ok(summary_text(store.records()))
}

fn summary_text(records: &[ResultRecord]) -> String {
    let (succeeded, mean) = summarize(records);
    let mut out = String::new();
    writeln!(
        out,
        "Summary: {}/{} repositories analyzed successfully",
        succeeded,
        records.len()
    )
    .unwrap();
    if let Some(mean) = mean {
        writeln!(out, "Average coverage: {mean:.1}%").unwrap();
    }
    out
}
