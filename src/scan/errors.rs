use super::models::ScanState;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failed to read wordlist {path:?}: {source}")]
    Wordlist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid target url: {0}")]
    InvalidTarget(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("response body exceeds {0} bytes")]
    BodyTooLarge(usize),

    #[error("cannot {action} while {from}")]
    IllegalTransition {
        from: ScanState,
        action: &'static str,
    },
}

impl From<reqwest::Error> for ScanError {
    fn from(err: reqwest::Error) -> Self {
        ScanError::Transport(err.to_string())
    }
}
