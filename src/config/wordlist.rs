use crate::scan::errors::ScanError;
use std::fs;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

/// Candidate words, loaded once per run and shared read-only by every task.
#[derive(Debug, Clone, Default)]
pub struct Wordlist {
    words: Arc<[String]>,
}

impl Wordlist {
    /// Read a line-delimited wordlist, skipping blank lines and `#` comments
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScanError> {
        let path = path.as_ref();
        let content = fs::read(path).map_err(|source| ScanError::Wordlist {
            path: path.to_path_buf(),
            source,
        })?;

        // non-UTF-8 bytes become U+FFFD instead of failing the whole list
        let words: Vec<String> = content
            .split(|&b| b == b'\n')
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
            .map(String::from_utf8_lossy)
            .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
            .map(|line| line.into_owned())
            .collect();

        tracing::info!("Loaded {} words from {:?}", words.len(), path);
        Ok(Self::from(words))
    }
}

impl From<Vec<String>> for Wordlist {
    fn from(words: Vec<String>) -> Self {
        Self {
            words: words.into(),
        }
    }
}

impl Deref for Wordlist {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.words
    }
}
