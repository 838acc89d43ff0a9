//! Dependency installation with escalating leniency.
//!
//! Every ecosystem maps to an ordered list of invocations, each carrying its
//! own timeout. The installer walks the list and stops at the first success;
//! adding a fallback means adding an entry, not a branch.

use std::path::Path;

use tracing::{info, warn};

use crate::config::Timeouts;
use crate::manifest::{self, PACKAGE_JSON};
use crate::runner::{run_safely, CommandRunner, Invocation, RunOutcome};

const NPM_LOCKFILES: [&str; 2] = ["package-lock.json", "npm-shrinkwrap.json"];

/// Relaxations tried in order for each npm command form.
const NPM_RELAXATIONS: [Option<&str>; 3] = [None, Some("--legacy-peer-deps"), Some("--force")];

/// The ordered install attempts for a checkout. Empty when nothing needs
/// installing.
pub fn install_plan(dir: &Path, timeouts: &Timeouts) -> Vec<Invocation> {
    let step = |argv: &[&str], timeout| Invocation::new(argv.iter().copied(), timeout).in_dir(dir);

    if dir.join(PACKAGE_JSON).is_file() {
        if manifest::has_link_dependencies(dir) {
            return vec![step(
                &["yarn", "install", "--ignore-scripts"],
                timeouts.yarn_link_install,
            )];
        }
        return js_plan(dir, timeouts);
    }
    if dir.join("requirements.txt").is_file() {
        return vec![step(
            &["pip", "install", "-r", "requirements.txt"],
            timeouts.pip_install,
        )];
    }
    if dir.join("pom.xml").is_file() {
        return vec![step(&["mvn", "install", "-DskipTests"], timeouts.maven_install)];
    }
    if dir.join("go.mod").is_file() {
        return vec![step(&["go", "mod", "download"], timeouts.go_download)];
    }
    Vec::new()
}

fn js_plan(dir: &Path, timeouts: &Timeouts) -> Vec<Invocation> {
    let has_lockfile = NPM_LOCKFILES.iter().any(|f| dir.join(f).is_file());
    let forms: &[&str] = if has_lockfile {
        &["ci", "install"]
    } else {
        &["install"]
    };

    let mut plan = Vec::new();
    for &form in forms {
        for relax in NPM_RELAXATIONS {
            let mut argv = vec!["npm", form];
            argv.extend(relax);
            plan.push(Invocation::new(argv, timeouts.npm_install).in_dir(dir));
        }
    }
    plan.push(
        Invocation::new(
            ["npm", "install", "--workspaces=false", "--legacy-peer-deps"],
            timeouts.npm_workspaces_off,
        )
        .in_dir(dir),
    );
    plan.push(
        Invocation::new(
            ["yarn", "install", "--ignore-scripts", "--frozen-lockfile"],
            timeouts.yarn_last_resort,
        )
        .in_dir(dir),
    );
    plan
}

/// Install dependencies for the checkout at `dir`. Returns the first
/// successful outcome, or the last failure when every attempt fails.
pub fn install_dependencies(
    runner: &dyn CommandRunner,
    dir: &Path,
    timeouts: &Timeouts,
) -> RunOutcome {
    let plan = install_plan(dir, timeouts);
    let total = plan.len();
    let mut last = RunOutcome::Success;

    for (i, invocation) in plan.iter().enumerate() {
        info!(attempt = i + 1, total, command = %invocation, "installing dependencies");
        last = run_safely(runner, invocation);
        if last.is_success() {
            return last;
        }
        warn!(command = %invocation, "install attempt failed: {}", last.message());
    }
    last
}
