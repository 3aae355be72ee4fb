use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "dircrawler", version, about = "Concurrent web path discovery")]
pub struct Cli {
    /// Target URL, optionally containing a FUZZ placeholder (required)
    #[arg(short = 'u', long = "url")]
    pub url: String,

    /// Wordlist file path
    #[arg(short = 'w', long = "wordlist", default_value = "wordlist.txt")]
    pub wordlist: PathBuf,

    /// Number of concurrent workers [default: 20]
    #[arg(short = 't', long = "threads")]
    pub threads: Option<usize>,

    /// Delay between requests in milliseconds
    #[arg(long = "delay", default_value_t = 0)]
    pub delay: u64,

    /// Request timeout in seconds [default: 10]
    #[arg(long = "timeout")]
    pub timeout: Option<u64>,

    /// Number of retries on request failure [default: 3]
    #[arg(long = "retries")]
    pub retries: Option<usize>,

    /// Requests per second across all workers, 0 = unlimited [default: 0]
    #[arg(long = "rate-limit", allow_negative_numbers = true)]
    pub rate_limit: Option<i64>,

    /// HTTP method
    #[arg(short = 'm', long = "method", default_value = "GET")]
    pub method: String,

    /// User agent string
    #[arg(short = 'a', long = "user-agent")]
    pub user_agent: Option<String>,

    /// Custom header "Name: value" (repeatable)
    #[arg(short = 'H', long = "headers")]
    pub headers: Vec<String>,

    /// Cookie header value sent with every request
    #[arg(long = "cookies")]
    pub cookies: Option<String>,

    /// Proxy URL (http://host:port)
    #[arg(long = "proxy")]
    pub proxy: Option<String>,

    /// Match status codes, comma separated
    #[arg(long = "mc")]
    pub status_codes: Option<String>,

    /// Filter out responses of these sizes, comma separated
    #[arg(long = "fs")]
    pub filter_size: Option<String>,

    /// Filter out responses with these line counts, comma separated
    #[arg(long = "fl")]
    pub filter_lines: Option<String>,

    /// Filter out responses whose body matches this regex
    #[arg(long = "fr")]
    pub filter_regex: Option<String>,

    /// File extensions appended to every word, comma separated (e.g. .php,.bak)
    #[arg(short = 'x', long = "extensions")]
    pub extensions: Option<String>,

    /// Recurse into discovered directories
    #[arg(short = 'r', long = "recursive", action = ArgAction::SetTrue)]
    pub recursive: bool,

    /// Maximum recursion depth
    #[arg(short = 'd', long = "depth", default_value_t = 2)]
    pub depth: usize,

    /// Skip TLS certificate validation
    #[arg(long = "no-tls-validation", action = ArgAction::SetTrue)]
    pub no_tls_validation: bool,

    /// Silent mode (no banner, no alternate screen)
    #[arg(short = 's', long = "silent", action = ArgAction::SetTrue)]
    pub silent: bool,

    /// Verbose logs
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    pub verbose: bool,

    /// Debug logs (implies verbose)
    #[arg(long = "debug", action = ArgAction::SetTrue)]
    pub debug: bool,

    /// Write results to this file when the program exits (.json for JSON)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Detect target technologies when the scan completes or pauses
    #[arg(short = 'T', long = "tech", action = ArgAction::SetTrue)]
    pub tech: bool,

    /// Headless mode: start immediately and print results as lines (no TUI)
    #[arg(long = "simple", action = ArgAction::SetTrue)]
    pub simple: bool,

    /// Configuration file with scan defaults
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Write logs to this file (the TUI otherwise discards them)
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let cli = Cli::try_parse_from(["dircrawler", "-u", "http://x/FUZZ"]).unwrap();
        assert_eq!(cli.url, "http://x/FUZZ");
        assert_eq!(cli.wordlist, PathBuf::from("wordlist.txt"));
        assert_eq!(cli.method, "GET");
        assert_eq!(cli.depth, 2);
        assert!(cli.threads.is_none());
        assert!(!cli.recursive);
    }

    #[test]
    fn test_parse_repeated_headers_and_filters() {
        let cli = Cli::try_parse_from([
            "dircrawler",
            "-u",
            "http://x",
            "-H",
            "X-A: 1",
            "-H",
            "X-B: 2",
            "--fs",
            "0,42",
            "--rate-limit",
            "-1",
            "-r",
            "-d",
            "1",
        ])
        .unwrap();
        assert_eq!(cli.headers, vec!["X-A: 1", "X-B: 2"]);
        assert_eq!(cli.filter_size.as_deref(), Some("0,42"));
        assert_eq!(cli.rate_limit, Some(-1));
        assert!(cli.recursive);
        assert_eq!(cli.depth, 1);
    }

    #[test]
    fn test_url_is_required() {
        assert!(Cli::try_parse_from(["dircrawler"]).is_err());
    }
}
