//! Coverage published outside the repository's test run: README badges and
//! the Coveralls dashboard page.
//!
//! Everything here is best effort. Fetch failures, bad statuses and
//! unparseable numbers all degrade to "nothing found".

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use crate::config::Timeouts;
use crate::fetch::{Fetcher, Request};
use crate::github::GitHub;
use crate::model::{is_percentage, CoverageResult, RepositoryDescriptor, Source};

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// How far around a loose dashboard match a coverage word may appear.
const CONTEXT_WINDOW: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadmeRule {
    /// The capture is the percentage.
    Percent,
    /// The capture is `owner/name`; the percentage lives in the badge SVG.
    CodecovShield,
}

/// README patterns, applied in order to the lowercased text.
static README_PATTERNS: LazyLock<Vec<(Regex, ReadmeRule)>> = LazyLock::new(|| {
    use ReadmeRule::*;
    [
        (r"codecov\.io/.*?(\d+)%", Percent),
        (r"codecov\.io/.*?(\d+\.\d+)%", Percent),
        (r"img\.shields\.io/codecov/c/github/([\w.-]+/[\w.-]+)", CodecovShield),
        (r"coveralls\.io/.*?(\d+)%", Percent),
        (r"coveralls\.io/.*?(\d+\.\d+)%", Percent),
        (r"img\.shields\.io/.*?coverage[/-](\d+)%", Percent),
        (r"img\.shields\.io/.*?coverage[/-](\d+\.\d+)%", Percent),
        (r"coverage:?\s*(\d+)%", Percent),
        (r"coverage:?\s*(\d+\.\d+)%", Percent),
        (r"test coverage:?\s*(\d+)%", Percent),
        (r"test coverage:?\s*(\d+\.\d+)%", Percent),
        (r"code coverage:?\s*(\d+)%", Percent),
        (r"code coverage:?\s*(\d+\.\d+)%", Percent),
    ]
    .into_iter()
    .map(|(p, rule)| (Regex::new(p).unwrap(), rule))
    .collect()
});

static SVG_PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">(\d+(?:\.\d+)?)%<").unwrap());

/// Dashboard patterns from most to least specific. The flag marks loose
/// patterns that need a coverage word nearby.
static COVERALLS_PATTERNS: LazyLock<Vec<(Regex, bool)>> = LazyLock::new(|| {
    [
        (
            r#"<div class="coverageText repo-coverage-outline[^"]*"[^>]*>\s*(\d+(?:\.\d+)?)%"#,
            false,
        ),
        (r#"id="repoShowPercentage"[^>]*>\s*(\d+(?:\.\d+)?)%"#, false),
        (r"<div[^>]*>\s*(\d+(?:\.\d+)?)%\s*</div>", false),
        (r#"class="[^"]*coverage[^"]*"[^>]*>\s*(\d+(?:\.\d+)?)%"#, false),
        (r">(\d+(?:\.\d+)?)%<", true),
        (r"(\d+(?:\.\d+)?)%", true),
    ]
    .into_iter()
    .map(|(p, loose)| (Regex::new(p).unwrap(), loose))
    .collect()
});

/// Scan README text for a published coverage percentage. `badge_svg` is
/// asked for the SVG markup of a shields.io codecov badge.
pub fn scan_readme(text: &str, badge_svg: impl Fn(&str) -> Option<String>) -> Option<f64> {
    let content = text.to_lowercase();
    for (pattern, rule) in README_PATTERNS.iter() {
        let value = match rule {
            ReadmeRule::Percent => pattern
                .captures(&content)
                .and_then(|caps| caps[1].parse::<f64>().ok())
                .filter(|v| is_percentage(*v)),
            ReadmeRule::CodecovShield => pattern.captures_iter(&content).find_map(|caps| {
                let slug = caps[1].trim_end_matches(".svg");
                let svg = badge_svg(slug)?;
                let value = SVG_PERCENT.captures(&svg)?[1].parse::<f64>().ok()?;
                is_percentage(value).then_some(value)
            }),
        };
        if let Some(value) = value {
            debug!(value, pattern = pattern.as_str(), "readme coverage matched");
            return Some(value);
        }
    }
    None
}

/// Scan a Coveralls repository page for the coverage figure.
pub fn scan_coveralls_page(html: &str) -> Option<f64> {
    for (pattern, loose) in COVERALLS_PATTERNS.iter() {
        for caps in pattern.captures_iter(html) {
            let Some(value) = caps[1].parse::<f64>().ok().filter(|v| is_percentage(*v)) else {
                continue;
            };
            let Some(whole) = caps.get(0) else { continue };
            if *loose && !has_coverage_context(html, whole.start(), whole.end()) {
                continue;
            }
            debug!(value, pattern = pattern.as_str(), "coveralls coverage matched");
            return Some(value);
        }
    }
    None
}

fn has_coverage_context(text: &str, start: usize, end: usize) -> bool {
    // The window is counted in characters, not bytes.
    let from = text[..start]
        .char_indices()
        .rev()
        .nth(CONTEXT_WINDOW - 1)
        .map_or(0, |(i, _)| i);
    let to = text[end..]
        .char_indices()
        .nth(CONTEXT_WINDOW)
        .map_or(text.len(), |(i, _)| end + i);
    let before = text[from..start].to_lowercase();
    let after = text[end..to].to_lowercase();
    before.contains("cover") || after.contains("cover")
}

/// README and dashboard lookups for one repository.
pub struct Extractor<'a> {
    github: &'a GitHub<'a>,
    fetcher: &'a dyn Fetcher,
    timeouts: Timeouts,
}

impl<'a> Extractor<'a> {
    pub fn new(github: &'a GitHub<'a>, fetcher: &'a dyn Fetcher, timeouts: Timeouts) -> Self {
        Self {
            github,
            fetcher,
            timeouts,
        }
    }

    pub fn from_readme(&self, repo: &RepositoryDescriptor) -> Option<f64> {
        let text = self.github.readme(repo)?;
        scan_readme(&text, |slug| self.badge_svg(slug))
    }

    fn badge_svg(&self, slug: &str) -> Option<String> {
        let url = format!("https://img.shields.io/codecov/c/github/{slug}.svg");
        match self.fetcher.fetch(&Request::get(url, self.timeouts.badge)) {
            Ok(resp) if resp.is_ok() => Some(resp.body),
            Ok(resp) => {
                debug!(slug, status = resp.status, "badge fetch rejected");
                None
            }
            Err(e) => {
                debug!(slug, "badge fetch failed: {e}");
                None
            }
        }
    }

    pub fn from_coveralls(&self, repo: &RepositoryDescriptor) -> Option<f64> {
        let url = format!("https://coveralls.io/github/{}/{}", repo.owner, repo.name);
        let req = Request::get(url.as_str(), self.timeouts.http)
            .header("User-Agent", BROWSER_USER_AGENT);
        match self.fetcher.fetch(&req) {
            Ok(resp) if resp.is_ok() => scan_coveralls_page(&resp.body),
            Ok(resp) => {
                debug!(%url, status = resp.status, "coveralls page unavailable");
                None
            }
            Err(e) => {
                debug!(%url, "coveralls fetch failed: {e}");
                None
            }
        }
    }

    /// Size estimate, then README, then Coveralls.
    pub fn extract_smart(&self, repo: &RepositoryDescriptor) -> CoverageResult {
        let total_lines = self.github.estimate_lines(repo);
        if let Some(lines) = total_lines {
            info!(repo = %repo.full_name(), lines, "estimated lines of code");
        }

        let found = self
            .from_readme(repo)
            .map(|v| (v, Source::Readme))
            .or_else(|| self.from_coveralls(repo).map(|v| (v, Source::Coveralls)));

        let result = match found {
            Some((value, source)) => {
                info!(repo = %repo.full_name(), value, %source, "coverage found");
                CoverageResult::found(repo.clone(), value, source)
            }
            None => CoverageResult::failed(
                repo.clone(),
                "No coverage data found in README or Coveralls",
            ),
        };
        result.with_total_lines(total_lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_badge(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_codecov_badge_url() {
        let readme = "[![codecov](https://codecov.io/gh/o/n/branch/main/graph/badge.svg?x=91%)](https://codecov.io/gh/o/n)";
        assert_eq!(scan_readme(readme, no_badge), Some(91.0));
    }

    #[test]
    fn test_inline_text_is_case_insensitive() {
        assert_eq!(scan_readme("Our Test Coverage: 78% and rising", no_badge), Some(78.0));
    }

    #[test]
    fn test_out_of_range_badge_rejected() {
        let readme = "![badge](https://img.shields.io/badge/coverage-4500%25) coverage: 4500%\n\
                      code coverage 88%";
        assert_eq!(scan_readme(readme, no_badge), Some(88.0));
    }

    #[test]
    fn test_codecov_shield_reads_svg() {
        let readme = "![cov](https://img.shields.io/codecov/c/github/Owner/Repo.svg?branch=main)";
        let svg = |slug: &str| {
            assert_eq!(slug, "owner/repo");
            Some(r#"<svg><text>coverage</text><text x="80">83.4%</text></svg>"#.to_string())
        };
        assert_eq!(scan_readme(readme, svg), Some(83.4));
    }

    #[test]
    fn test_codecov_shield_without_number_continues() {
        let readme = "![cov](https://img.shields.io/codecov/c/github/o/r)";
        assert_eq!(scan_readme(readme, |_| Some("<svg>unknown</svg>".to_string())), None);
    }

    #[test]
    fn test_nothing_in_readme() {
        assert_eq!(scan_readme("# Project\nNo numbers here.", no_badge), None);
    }

    #[test]
    fn test_coveralls_specific_element() {
        let html = r#"<div class="coverageText repo-coverage-outline green" title="x"> 92.31%</div>"#;
        assert_eq!(scan_coveralls_page(html), Some(92.31));
    }

    #[test]
    fn test_coveralls_loose_match_needs_context() {
        let html = "<span>Uptime: 99.9%</span>";
        assert_eq!(scan_coveralls_page(html), None);

        let html = "<h3>Covered lines</h3><span>71.2%</span>";
        assert_eq!(scan_coveralls_page(html), Some(71.2));
    }

    #[test]
    fn test_coveralls_loose_match_skips_unrelated_percentages() {
        let filler = "x".repeat(150);
        let html = format!("<b>12%</b>{filler}<i>coverage</i> <b>64%</b>");
        assert_eq!(scan_coveralls_page(&html), Some(64.0));
    }

    #[test]
    fn test_context_window_on_multibyte_text() {
        let text = format!("{}x50%", "ü".repeat(80));
        let start = text.find("50%").unwrap();
        assert!(!has_coverage_context(&text, start, start + 3));
    }

    #[test]
    fn test_context_window_counts_characters() {
        // 60 two-byte characters sit between the word and the number.
        let text = format!("coverage {}50%", "é".repeat(60));
        let start = text.find("50%").unwrap();
        assert!(has_coverage_context(&text, start, start + 3));

        let text = format!("50%{}coverage", "é".repeat(60));
        assert!(has_coverage_context(&text, 0, 3));

        let text = format!("coverage {}50%", "é".repeat(100));
        let start = text.find("50%").unwrap();
        assert!(!has_coverage_context(&text, start, start + 3));
    }
}
