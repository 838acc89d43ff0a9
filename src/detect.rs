/// Detection of a repository's test-with-coverage command.
///
/// Strategy:
///   1. Probe ecosystems in a fixed priority order (JS, Python, Maven,
///      Gradle, Go, Ruby, Rust)
///   2. Each probe looks only at which manifest files exist, plus the
///      script aliases of `package.json`
///   3. The first probe that yields a profile wins
use std::path::Path;

use tracing::{debug, warn};

use crate::manifest::PackageManifest;
use crate::model::{Dialect, ToolingProfile};

/// Script aliases that already run tests with coverage, most specific first.
const COVERAGE_SCRIPTS: [&str; 3] = ["coverage", "test:coverage", "test-coverage"];

/// Test runners whose `test` script accepts `--coverage`.
const KNOWN_JS_RUNNERS: [&str; 3] = ["jest", "mocha", "vitest"];

type Probe = fn(&Path) -> Option<ToolingProfile>;

/// Ecosystem probes in priority order.
const PROBES: [(&str, Probe); 7] = [
    ("javascript", detect_js),
    ("python", detect_python),
    ("maven", detect_maven),
    ("gradle", detect_gradle),
    ("go", detect_go),
    ("ruby", detect_ruby),
    ("rust", detect_rust),
];

/// Detect the test command and coverage dialect for a checkout, or `None`
/// when no known manifest is present.
pub fn detect_tooling(dir: &Path) -> Option<ToolingProfile> {
    for (ecosystem, probe) in PROBES {
        if let Some(profile) = probe(dir) {
            debug!(ecosystem, command = %profile.command, dialect = %profile.dialect, "detected tooling");
            return Some(profile);
        }
    }
    None
}

fn exists(dir: &Path, file: &str) -> bool {
    dir.join(file).is_file()
}

fn detect_js(dir: &Path) -> Option<ToolingProfile> {
    let manifest = match PackageManifest::load(dir) {
        Ok(m) => m?,
        Err(e) => {
            warn!("ignoring unreadable package.json: {e}");
            return None;
        }
    };

    if let Some(alias) = COVERAGE_SCRIPTS.iter().find(|a| manifest.has_script(a)) {
        return Some(ToolingProfile::new(
            format!("npm run {alias}"),
            Dialect::JsRunner,
        ));
    }

    let test = manifest.script("test")?;
    if KNOWN_JS_RUNNERS.iter().any(|r| test.contains(r)) {
        return Some(ToolingProfile::new(
            "npm test -- --coverage",
            Dialect::JsRunner,
        ));
    }
    None
}

fn detect_python(dir: &Path) -> Option<ToolingProfile> {
    if !exists(dir, "setup.py") && !exists(dir, "pyproject.toml") {
        return None;
    }
    if exists(dir, "pytest.ini") || exists(dir, "setup.cfg") {
        return Some(ToolingProfile::new(
            "pytest --cov=. --cov-report=json",
            Dialect::PytestCov,
        ));
    }
    if exists(dir, "tox.ini") {
        return Some(ToolingProfile::new("tox -e coverage", Dialect::CoveragePy));
    }
    None
}

fn detect_maven(dir: &Path) -> Option<ToolingProfile> {
    exists(dir, "pom.xml").then(|| ToolingProfile::new("mvn test jacoco:report", Dialect::Jacoco))
}

fn detect_gradle(dir: &Path) -> Option<ToolingProfile> {
    (exists(dir, "build.gradle") || exists(dir, "build.gradle.kts"))
        .then(|| ToolingProfile::new("./gradlew test jacocoTestReport", Dialect::Jacoco))
}

fn detect_go(dir: &Path) -> Option<ToolingProfile> {
    exists(dir, "go.mod").then(|| {
        ToolingProfile::new("go test -coverprofile=coverage.out ./...", Dialect::GoCover)
    })
}

fn detect_ruby(dir: &Path) -> Option<ToolingProfile> {
    exists(dir, "Gemfile").then(|| {
        ToolingProfile::new(
            "bundle exec rspec --format json --out rspec.json",
            Dialect::SimpleCov,
        )
    })
}

fn detect_rust(dir: &Path) -> Option<ToolingProfile> {
    exists(dir, "Cargo.toml")
        .then(|| ToolingProfile::new("cargo tarpaulin --out Xml", Dialect::Tarpaulin))
}
