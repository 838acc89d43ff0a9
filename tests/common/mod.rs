#![allow(dead_code)]

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::time::Duration;

use covharvest::error::{HarvestError, Result};
use covharvest::fetch::{Fetcher, Request, Response};
use covharvest::model::ExecutionOutcome;
use covharvest::runner::{CommandRunner, Invocation};

pub fn ok(stdout: &str) -> ExecutionOutcome {
    ExecutionOutcome {
        stdout: stdout.to_string(),
        exit_code: Some(0),
        elapsed: Duration::from_millis(10),
        ..ExecutionOutcome::default()
    }
}

pub fn fail(code: i32, stderr: &str) -> ExecutionOutcome {
    ExecutionOutcome {
        stderr: stderr.to_string(),
        exit_code: Some(code),
        elapsed: Duration::from_millis(10),
        ..ExecutionOutcome::default()
    }
}

pub fn timed_out() -> ExecutionOutcome {
    ExecutionOutcome {
        timed_out: true,
        ..ExecutionOutcome::default()
    }
}

struct Rule {
    prefix: String,
    outcome: ExecutionOutcome,
    /// Files created relative to the invocation's working directory, or to
    /// the clone target for `git clone`.
    files: Vec<(String, String)>,
}

/// Answers invocations from a script keyed by command-line prefix and
/// records every call. Unscripted commands exit with 127.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Vec<Rule>,
    calls: RefCell<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, prefix: &str, outcome: ExecutionOutcome) -> Self {
        self.on_writing(prefix, outcome, &[])
    }

    /// Like [`ScriptedRunner::on`], also leaving files behind.
    pub fn on_writing(mut self, prefix: &str, outcome: ExecutionOutcome, files: &[(&str, &str)]) -> Self {
        self.rules.push(Rule {
            prefix: prefix.to_string(),
            outcome,
            files: files
                .iter()
                .map(|(p, c)| (p.to_string(), c.to_string()))
                .collect(),
        });
        self
    }

    /// A successful `git clone` that checks out the given files.
    pub fn clones(self, files: &[(&str, &str)]) -> Self {
        self.on_writing("git clone", ok(""), files)
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls.borrow().iter().map(ToString::to_string).collect()
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn execute(&self, invocation: &Invocation) -> Result<ExecutionOutcome> {
        self.calls.borrow_mut().push(invocation.clone());
        let line = invocation.to_string();
        let Some(rule) = self.rules.iter().find(|r| line.starts_with(&r.prefix)) else {
            return Ok(fail(127, &format!("{line}: command not found")));
        };

        let root = if line.starts_with("git clone") {
            invocation.argv.last().map(PathBuf::from)
        } else {
            invocation.cwd.clone()
        };
        if let Some(root) = root {
            for (relative, content) in &rule.files {
                write_file(&root, relative, content);
            }
        }
        Ok(rule.outcome.clone())
    }
}

/// Serves canned responses by exact URL and records requests. Unknown
/// URLs fail at the transport level.
#[derive(Default)]
pub struct FakeFetcher {
    routes: Vec<(String, u16, String)>,
    requests: RefCell<Vec<Request>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, status: u16, body: &str) -> Self {
        self.routes.push((url.to_string(), status, body.to_string()));
        self
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests.borrow().iter().map(|r| r.url.clone()).collect()
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.borrow().clone()
    }
}

impl Fetcher for FakeFetcher {
    fn fetch(&self, request: &Request) -> Result<Response> {
        self.requests.borrow_mut().push(request.clone());
        self.routes
            .iter()
            .find(|(url, _, _)| *url == request.url)
            .map(|(_, status, body)| Response {
                status: *status,
                body: body.clone(),
            })
            .ok_or_else(|| HarvestError::Http(format!("{}: connection refused", request.url)))
    }
}

pub fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}
