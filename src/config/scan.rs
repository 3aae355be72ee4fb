use super::types::{GlobalConfig, ScanDefaults};
use crate::cli::args::Cli;
use crate::engine::filter::FilterConfig;
use crate::engine::rate_limiter::MAX_RATE;
use crate::scan::errors::ScanError;
use regex::bytes::Regex;
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use std::time::Duration;

const FUZZ: &str = "FUZZ";
const THREAD_WARN_LIMIT: usize = 100;

/// Immutable settings for one scan run.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub target: String,
    pub wordlist: PathBuf,
    pub extensions: Vec<String>,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub user_agent: String,
    pub cookies: Option<String>,
    pub proxy: Option<String>,
    pub timeout: Duration,
    pub retries: usize,
    pub delay: Duration,
    pub threads: usize,
    pub rate_limit: u32,
    pub status_codes: HashSet<u16>,
    pub filters: FilterConfig,
    pub recursive: bool,
    pub max_depth: usize,
    pub no_tls_validation: bool,
    pub tech_detect: bool,
}

impl ScanConfig {
    /// Merge command-line flags over file defaults and validate the result
    pub fn resolve(cli: &Cli, file: &GlobalConfig) -> Result<Self, ScanError> {
        let defaults: &ScanDefaults = &file.scan;

        let target = cli.url.trim().to_string();
        validate_target(&target)?;

        let threads = cli.threads.unwrap_or(defaults.threads);
        if threads == 0 {
            return Err(ScanError::InvalidConfig("threads must be at least 1".to_string()));
        }
        if threads > THREAD_WARN_LIMIT {
            tracing::warn!("High thread count ({}) may cause issues", threads);
        }

        let timeout_secs = cli.timeout.unwrap_or(defaults.timeout_secs);
        if timeout_secs == 0 {
            return Err(ScanError::InvalidConfig("timeout must be at least 1 second".to_string()));
        }

        let status_codes = parse_list::<u16>(
            cli.status_codes.as_deref().unwrap_or(&defaults.status_codes),
            "status code",
        )?;
        if status_codes.is_empty() {
            return Err(ScanError::InvalidConfig("at least one status code must be matched".to_string()));
        }

        let mut headers = Vec::new();
        for raw in defaults.headers.iter().chain(cli.headers.iter()) {
            headers.push(parse_header(raw)?);
        }

        let method = cli.method.trim().to_uppercase();
        if method.is_empty() {
            return Err(ScanError::InvalidConfig("method cannot be empty".to_string()));
        }

        let filters = FilterConfig {
            sizes: parse_optional_list(cli.filter_size.as_deref(), "size filter")?,
            lines: parse_optional_list(cli.filter_lines.as_deref(), "line filter")?,
            regex: compile_filter_regex(cli.filter_regex.as_deref()),
        };

        let requested_rate = cli.rate_limit.unwrap_or(defaults.rate_limit).max(0);
        if requested_rate > MAX_RATE as i64 {
            tracing::warn!("Rate limit {} req/s exceeds {}; capping", requested_rate, MAX_RATE);
        }
        let rate_limit = requested_rate.min(MAX_RATE as i64) as u32;

        Ok(Self {
            target,
            wordlist: cli.wordlist.clone(),
            extensions: split_list(cli.extensions.as_deref().unwrap_or_default()),
            method,
            headers,
            user_agent: cli
                .user_agent
                .clone()
                .unwrap_or_else(|| defaults.user_agent.clone()),
            cookies: cli.cookies.clone().filter(|c| !c.is_empty()),
            proxy: cli.proxy.clone().filter(|p| !p.is_empty()),
            timeout: Duration::from_secs(timeout_secs),
            retries: cli.retries.unwrap_or(defaults.retries),
            delay: Duration::from_millis(cli.delay),
            threads,
            rate_limit,
            status_codes,
            filters,
            recursive: cli.recursive,
            max_depth: cli.depth,
            no_tls_validation: cli.no_tls_validation,
            tech_detect: cli.tech,
        })
    }

    /// Match codes in ascending order, for display.
    pub fn status_codes_display(&self) -> String {
        let sorted: BTreeSet<u16> = self.status_codes.iter().copied().collect();
        sorted
            .iter()
            .map(u16::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Target with any FUZZ placeholder removed, used for the initial fetch.
    pub fn base_url(&self) -> String {
        self.target.replacen(FUZZ, "", 1)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            target: "http://127.0.0.1".to_string(),
            wordlist: PathBuf::from("wordlist.txt"),
            extensions: Vec::new(),
            method: "GET".to_string(),
            headers: Vec::new(),
            user_agent: super::types::DEFAULT_USER_AGENT.to_string(),
            cookies: None,
            proxy: None,
            timeout: Duration::from_secs(super::types::DEFAULT_TIMEOUT_SECS),
            retries: super::types::DEFAULT_RETRIES,
            delay: Duration::ZERO,
            threads: super::types::DEFAULT_THREADS,
            rate_limit: 0,
            status_codes: [200, 204, 301, 302, 307, 401, 403, 500].into_iter().collect(),
            filters: FilterConfig::default(),
            recursive: false,
            max_depth: 2,
            no_tls_validation: false,
            tech_detect: false,
        }
    }
}

fn validate_target(target: &str) -> Result<(), ScanError> {
    if target.is_empty() {
        return Err(ScanError::InvalidTarget("URL is required".to_string()));
    }
    // FUZZ may sit anywhere, including the host; validate a concrete stand-in
    let probe = target.replacen(FUZZ, "fuzz", 1);
    let parsed = url::Url::parse(&probe).map_err(|e| ScanError::InvalidTarget(format!("{}: {}", target, e)))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ScanError::InvalidTarget(format!(
                "{}: unsupported scheme '{}'",
                target, other
            )));
        }
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ScanError::InvalidTarget(format!("{}: missing host", target)));
    }
    Ok(())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_list<T>(raw: &str, what: &str) -> Result<HashSet<T>, ScanError>
where
    T: std::str::FromStr + std::hash::Hash + Eq,
{
    split_list(raw)
        .into_iter()
        .map(|item| {
            item.parse::<T>()
                .map_err(|_| ScanError::InvalidConfig(format!("invalid {} '{}'", what, item)))
        })
        .collect()
}

fn parse_optional_list(raw: Option<&str>, what: &str) -> Result<Option<HashSet<usize>>, ScanError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => parse_list(raw, what).map(Some),
    }
}

fn parse_header(raw: &str) -> Result<(String, String), ScanError> {
    match raw.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(ScanError::InvalidConfig(format!(
            "header '{}' must look like 'Name: value'",
            raw
        ))),
    }
}

/// A malformed pattern disables regex filtering instead of aborting the scan.
fn compile_filter_regex(raw: Option<&str>) -> Option<Regex> {
    let pattern = raw.filter(|p| !p.is_empty())?;
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!("Ignoring malformed filter regex '{}': {}", pattern, e);
            None
        }
    }
}
