//! GitHub REST API access: repository discovery, README text and the
//! language byte counts used to estimate project size.

use serde::Deserialize;
use tracing::{debug, info};

use crate::config::{DiscoveryOptions, Timeouts};
use crate::error::{HarvestError, Result};
use crate::fetch::{Fetcher, Request};
use crate::model::RepositoryDescriptor;

const API_ROOT: &str = "https://api.github.com";
const USER_AGENT: &str = "covharvest";
const PER_PAGE: usize = 100;

/// Rough average of source bytes per line.
const BYTES_PER_LINE: u64 = 40;

#[derive(Deserialize)]
struct SearchPage {
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    name: String,
    owner: Owner,
    stargazers_count: u64,
    language: Option<String>,
    clone_url: String,
}

#[derive(Deserialize)]
struct Owner {
    login: String,
}

pub struct GitHub<'a> {
    fetcher: &'a dyn Fetcher,
    token: Option<String>,
    timeouts: Timeouts,
}

impl<'a> GitHub<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, token: Option<String>, timeouts: Timeouts) -> Self {
        Self {
            fetcher,
            token,
            timeouts,
        }
    }

    fn request(&self, url: String) -> Request {
        let req = Request::get(url, self.timeouts.http).header("User-Agent", USER_AGENT);
        match &self.token {
            Some(token) => req.header("Authorization", format!("token {token}")),
            None => req,
        }
    }

    /// Most-starred repositories, filtered by the skip list and language
    /// preference, in descending star order.
    pub fn search_top_repos(&self, opts: &DiscoveryOptions) -> Result<Vec<RepositoryDescriptor>> {
        let mut repos = Vec::new();
        let mut page = 1u32;

        while repos.len() < opts.count {
            let url = format!(
                "{API_ROOT}/search/repositories?q=stars:>{}&sort=stars&order=desc&page={page}&per_page={PER_PAGE}",
                opts.min_stars
            );
            let resp = self.fetcher.fetch(&self.request(url))?;
            if !resp.is_ok() {
                return Err(HarvestError::Http(format!("GitHub API error: {}", resp.status)));
            }
            let data: SearchPage = serde_json::from_str(&resp.body)?;
            let page_len = data.items.len();

            for item in data.items {
                let full_name = format!("{}/{}", item.owner.login, item.name);
                if opts.is_skipped(&full_name) {
                    info!(repo = %full_name, stars = item.stargazers_count, "skipping: in skip list");
                    continue;
                }
                if !opts.accepts_language(item.language.as_deref()) {
                    info!(
                        repo = %full_name,
                        language = item.language.as_deref().unwrap_or("none"),
                        "skipping: not a code language"
                    );
                    continue;
                }
                debug!(repo = %full_name, stars = item.stargazers_count, "discovered");
                repos.push(RepositoryDescriptor {
                    owner: item.owner.login,
                    name: item.name,
                    stars: item.stargazers_count,
                    language: item.language.unwrap_or_else(|| "Unknown".to_string()),
                    clone_url: item.clone_url,
                });
            }

            if page_len < PER_PAGE {
                break;
            }
            page += 1;
        }

        repos.truncate(opts.count);
        Ok(repos)
    }

    /// Raw README text, or `None` when the repository has none or the
    /// request fails.
    pub fn readme(&self, repo: &RepositoryDescriptor) -> Option<String> {
        let url = format!("{API_ROOT}/repos/{}/{}/readme", repo.owner, repo.name);
        let req = self
            .request(url)
            .header("Accept", "application/vnd.github.v3.raw");
        match self.fetcher.fetch(&req) {
            Ok(resp) if resp.is_ok() => Some(resp.body),
            Ok(resp) => {
                debug!(repo = %repo.full_name(), status = resp.status, "no readme");
                None
            }
            Err(e) => {
                debug!(repo = %repo.full_name(), "readme fetch failed: {e}");
                None
            }
        }
    }

    /// Estimated lines of code from the per-language byte counts.
    pub fn estimate_lines(&self, repo: &RepositoryDescriptor) -> Option<u64> {
        let url = format!("{API_ROOT}/repos/{}/{}/languages", repo.owner, repo.name);
        let resp = match self.fetcher.fetch(&self.request(url)) {
            Ok(resp) if resp.is_ok() => resp,
            Ok(resp) => {
                debug!(repo = %repo.full_name(), status = resp.status, "no language stats");
                return None;
            }
            Err(e) => {
                debug!(repo = %repo.full_name(), "language stats fetch failed: {e}");
                return None;
            }
        };
        let languages: std::collections::HashMap<String, u64> =
            serde_json::from_str(&resp.body).ok()?;
        Some(languages.values().sum::<u64>() / BYTES_PER_LINE)
    }
}
