//! Run configuration: time bounds, credentials and discovery options.
//!
//! There is no config file. Values come from CLI flags and the environment.

use std::path::PathBuf;
use std::time::Duration;

pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

pub const DEFAULT_RESULTS_FILE: &str = "coverage_results.json";

/// Repositories known to have no test suite worth running.
pub const DEFAULT_SKIP_LIST: [&str; 6] = [
    "freeCodeCamp/freeCodeCamp",
    "EbookFoundation/free-programming-books",
    "public-apis/public-apis",
    "kamranahmedse/developer-roadmap",
    "donnemartin/system-design-primer",
    "vinta/awesome-python",
];

/// Languages likely to come with a test suite.
pub const CODE_LANGUAGES: [&str; 15] = [
    "JavaScript",
    "TypeScript",
    "Python",
    "Java",
    "Go",
    "Rust",
    "C++",
    "C#",
    "Ruby",
    "PHP",
    "Kotlin",
    "Swift",
    "Scala",
    "Dart",
    "C",
];

/// Upper bounds for every slow operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeouts {
    pub clone: Duration,
    /// `npm ci` / `npm install` and their relaxed variants.
    pub npm_install: Duration,
    pub npm_workspaces_off: Duration,
    pub yarn_link_install: Duration,
    pub yarn_last_resort: Duration,
    pub pip_install: Duration,
    pub maven_install: Duration,
    pub go_download: Duration,
    pub test_run: Duration,
    pub http: Duration,
    pub badge: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            clone: Duration::from_secs(300),
            npm_install: Duration::from_secs(600),
            npm_workspaces_off: Duration::from_secs(300),
            yarn_link_install: Duration::from_secs(300),
            yarn_last_resort: Duration::from_secs(120),
            pip_install: Duration::from_secs(600),
            maven_install: Duration::from_secs(600),
            go_download: Duration::from_secs(300),
            test_run: Duration::from_secs(1800),
            http: Duration::from_secs(30),
            badge: Duration::from_secs(10),
        }
    }
}

/// What to ask the search API for.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    pub count: usize,
    pub min_stars: u64,
    pub skip_repos: Vec<String>,
    pub prefer_code_langs: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            count: 100,
            min_stars: 1000,
            skip_repos: DEFAULT_SKIP_LIST.iter().map(|s| s.to_string()).collect(),
            prefer_code_langs: true,
        }
    }
}

impl DiscoveryOptions {
    pub fn is_skipped(&self, full_name: &str) -> bool {
        self.skip_repos.iter().any(|s| s == full_name)
    }

    pub fn accepts_language(&self, language: Option<&str>) -> bool {
        !self.prefer_code_langs || language.is_some_and(|l| CODE_LANGUAGES.contains(&l))
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub token: Option<String>,
    pub results_path: PathBuf,
    /// Parent for per-repository scratch directories; system temp when unset.
    pub workdir: Option<PathBuf>,
    pub timeouts: Timeouts,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            results_path: PathBuf::from(DEFAULT_RESULTS_FILE),
            workdir: None,
            timeouts: Timeouts::default(),
        }
    }
}

impl Config {
    /// Defaults plus the optional `GITHUB_TOKEN` from the environment.
    pub fn from_env() -> Self {
        let token = std::env::var(TOKEN_ENV).ok().filter(|t| !t.trim().is_empty());
        Self {
            token,
            ..Self::default()
        }
    }
}
