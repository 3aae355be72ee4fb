use serde::{Deserialize, Serialize};

pub const DEFAULT_THREADS: usize = 20;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RETRIES: usize = 3;
pub const DEFAULT_USER_AGENT: &str = "dircrawler/0.1";
pub const DEFAULT_STATUS_CODES: &str = "200,204,301,302,307,401,403,500";

/// Contents of an optional `dircrawler.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub scan: ScanDefaults,
}

/// Scan settings a config file may provide; command-line flags win.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanDefaults {
    pub threads: usize,
    pub timeout_secs: u64,
    pub retries: usize,
    pub rate_limit: i64,
    pub user_agent: String,
    pub status_codes: String,
    pub headers: Vec<String>,
}

impl Default for ScanDefaults {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retries: DEFAULT_RETRIES,
            rate_limit: 0,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            status_codes: DEFAULT_STATUS_CODES.to_string(),
            headers: Vec::new(),
        }
    }
}
