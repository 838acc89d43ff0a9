mod common;

use common::FakeFetcher;
use covharvest::config::Timeouts;
use covharvest::extract::Extractor;
use covharvest::github::GitHub;
use covharvest::model::{RepositoryDescriptor, Source};

const README: &str = "https://api.github.com/repos/acme/widgets/readme";
const LANGUAGES: &str = "https://api.github.com/repos/acme/widgets/languages";
const COVERALLS: &str = "https://coveralls.io/github/acme/widgets";

fn repo() -> RepositoryDescriptor {
    RepositoryDescriptor::from_full_name("acme/widgets").unwrap()
}

#[test]
fn test_out_of_range_badge_rejected_and_scan_continues() {
    let fetcher = FakeFetcher::new().route(
        README,
        200,
        "# Widgets\n![](https://img.shields.io/badge/coverage-4500%25-green)\n\nCode coverage: 91.5%\n",
    );
    let github = GitHub::new(&fetcher, None, Timeouts::default());
    let extractor = Extractor::new(&github, &fetcher, Timeouts::default());

    assert_eq!(extractor.from_readme(&repo()), Some(91.5));
}

#[test]
fn test_readme_wins_over_coveralls() {
    let fetcher = FakeFetcher::new()
        .route(README, 200, "[![Coverage Status](https://coveralls.io/repos/x/badge.svg?coverage=77%)]")
        .route(LANGUAGES, 200, r#"{"Python": 40000}"#)
        .route(COVERALLS, 200, r#"<div id="repoShowPercentage"> 12%</div>"#);
    let github = GitHub::new(&fetcher, None, Timeouts::default());
    let extractor = Extractor::new(&github, &fetcher, Timeouts::default());

    let result = extractor.extract_smart(&repo());
    assert_eq!(result.coverage_percentage, Some(77.0));
    assert_eq!(result.source, Some(Source::Readme));
    assert_eq!(result.total_lines, Some(1000));
    assert!(!fetcher.urls().iter().any(|u| u == COVERALLS));
}

#[test]
fn test_falls_back_to_coveralls() {
    let fetcher = FakeFetcher::new()
        .route(README, 404, r#"{"message": "Not Found"}"#)
        .route(
            COVERALLS,
            200,
            r#"<html><div class="coverageText repo-coverage-outline"> 88.02%</div></html>"#,
        );
    let github = GitHub::new(&fetcher, None, Timeouts::default());
    let extractor = Extractor::new(&github, &fetcher, Timeouts::default());

    let result = extractor.extract_smart(&repo());
    assert_eq!(result.coverage_percentage, Some(88.02));
    assert_eq!(result.source, Some(Source::Coveralls));
    // Language stats were unreachable.
    assert_eq!(result.total_lines, None);

    let coveralls = fetcher
        .requests()
        .into_iter()
        .find(|r| r.url == COVERALLS)
        .unwrap();
    assert!(coveralls
        .headers
        .iter()
        .any(|(name, value)| name == "User-Agent" && value.starts_with("Mozilla/5.0")));
}

#[test]
fn test_nothing_found_anywhere() {
    let fetcher = FakeFetcher::new()
        .route(README, 200, "# Widgets\nNo badges.\n")
        .route(LANGUAGES, 200, r#"{"Go": 8000}"#)
        .route(COVERALLS, 200, "<html>Page not found. 404%</html>");
    let github = GitHub::new(&fetcher, None, Timeouts::default());
    let extractor = Extractor::new(&github, &fetcher, Timeouts::default());

    let result = extractor.extract_smart(&repo());
    assert_eq!(result.coverage_percentage, None);
    assert_eq!(
        result.error.as_deref(),
        Some("No coverage data found in README or Coveralls")
    );
    assert_eq!(result.total_lines, Some(200));
}

#[test]
fn test_codecov_shield_fetches_badge_svg() {
    let fetcher = FakeFetcher::new()
        .route(
            README,
            200,
            "[![codecov](https://img.shields.io/codecov/c/github/acme/widgets)](https://codecov.io/gh/acme/widgets)",
        )
        .route(
            "https://img.shields.io/codecov/c/github/acme/widgets.svg",
            200,
            r#"<svg><g><text>coverage</text><text x="96">64.5%</text></g></svg>"#,
        );
    let github = GitHub::new(&fetcher, None, Timeouts::default());
    let extractor = Extractor::new(&github, &fetcher, Timeouts::default());

    assert_eq!(extractor.from_readme(&repo()), Some(64.5));
    let badge = fetcher
        .requests()
        .into_iter()
        .find(|r| r.url.ends_with(".svg"))
        .unwrap();
    assert_eq!(badge.timeout, Timeouts::default().badge);
}
