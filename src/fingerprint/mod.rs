use crate::engine::http::Transport;
use crate::scan::events::{EventSender, ScanEvent};
use regex::Regex;
use reqwest::header::{HeaderMap, SERVER, SET_COOKIE};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Detected technology name to optional version.
pub type Technologies = BTreeMap<String, Option<String>>;

pub trait Fingerprinter: Send + Sync {
    fn fingerprint(&self, headers: &HeaderMap, body: &[u8]) -> Technologies;
}

#[derive(Debug, Clone, Copy)]
enum Source {
    Header(&'static str),
    Cookie,
    Body,
}

struct Signature {
    name: &'static str,
    source: Source,
    pattern: Regex,
}

// (name, source, pattern); an optional capture group named `version` supplies the version
const SIGNATURES: &[(&str, Source, &str)] = &[
    ("Nginx", Source::Header("server"), r"(?i)nginx(?:/(?P<version>[\d.]+))?"),
    ("Apache", Source::Header("server"), r"(?i)apache(?:/(?P<version>[\d.]+))?"),
    ("Microsoft IIS", Source::Header("server"), r"(?i)microsoft-iis(?:/(?P<version>[\d.]+))?"),
    ("LiteSpeed", Source::Header("server"), r"(?i)litespeed"),
    ("Caddy", Source::Header("server"), r"(?i)caddy"),
    ("Cloudflare", Source::Header("server"), r"(?i)cloudflare"),
    ("OpenResty", Source::Header("server"), r"(?i)openresty(?:/(?P<version>[\d.]+))?"),
    ("PHP", Source::Header("x-powered-by"), r"(?i)php(?:/(?P<version>[\d.]+))?"),
    ("ASP.NET", Source::Header("x-powered-by"), r"(?i)asp\.net"),
    ("ASP.NET", Source::Header("x-aspnet-version"), r"(?P<version>[\d.]+)"),
    ("Express", Source::Header("x-powered-by"), r"(?i)express"),
    ("Next.js", Source::Header("x-powered-by"), r"(?i)next\.js(?:\s+(?P<version>[\d.]+))?"),
    ("Drupal", Source::Header("x-generator"), r"(?i)drupal(?:\s+(?P<version>[\d.]+))?"),
    ("PHP", Source::Cookie, r"PHPSESSID="),
    ("Java", Source::Cookie, r"JSESSIONID="),
    ("ASP.NET", Source::Cookie, r"ASP\.NET_SessionId="),
    ("Laravel", Source::Cookie, r"laravel_session="),
    ("Django", Source::Cookie, r"csrftoken="),
    ("WordPress", Source::Body, r"(?i)/wp-content/|/wp-includes/"),
    ("Joomla", Source::Body, r"(?i)/media/jui/|com_content"),
    ("jQuery", Source::Body, r"(?i)jquery(?:[.-](?P<version>\d+\.\d+(?:\.\d+)?))?(?:\.min)?\.js"),
    ("React", Source::Body, r"data-reactroot|__NEXT_DATA__"),
    ("Bootstrap", Source::Body, r"(?i)bootstrap(?:[.-](?P<version>\d+\.\d+(?:\.\d+)?))?(?:\.min)?\.(?:css|js)"),
];

/// Built-in header, cookie and HTML signatures.
pub struct SignatureFingerprinter {
    signatures: Vec<Signature>,
    generator: Option<Regex>,
}

impl SignatureFingerprinter {
    pub fn new() -> Self {
        let signatures = SIGNATURES
            .iter()
            .filter_map(|(name, source, pattern)| match Regex::new(pattern) {
                Ok(pattern) => Some(Signature {
                    name: *name,
                    source: *source,
                    pattern,
                }),
                Err(e) => {
                    tracing::warn!("Skipping signature for {}: {}", name, e);
                    None
                }
            })
            .collect();

        let generator = Regex::new(r#"(?i)<meta[^>]+name=["']generator["'][^>]+content=["']([^"']+)["']"#).ok();

        Self { signatures, generator }
    }

    fn meta_generator(&self, body: &str) -> Option<(String, Option<String>)> {
        let captures = self.generator.as_ref()?.captures(body)?;
        let content = captures.get(1)?.as_str().trim();
        // "WordPress 6.4.2" -> ("WordPress", Some("6.4.2"))
        match content.rsplit_once(' ') {
            Some((name, version)) if version.starts_with(|c: char| c.is_ascii_digit()) => {
                Some((name.trim().to_string(), Some(version.to_string())))
            }
            _ => Some((content.to_string(), None)),
        }
    }
}

impl Default for SignatureFingerprinter {
    fn default() -> Self {
        Self::new()
    }
}

impl Fingerprinter for SignatureFingerprinter {
    fn fingerprint(&self, headers: &HeaderMap, body: &[u8]) -> Technologies {
        let mut found = Technologies::new();
        let body = String::from_utf8_lossy(body);
        let cookies: Vec<&str> = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();

        for signature in &self.signatures {
            let haystacks: Vec<&str> = match signature.source {
                Source::Header(name) => headers
                    .get_all(name)
                    .iter()
                    .filter_map(|v| v.to_str().ok())
                    .collect(),
                Source::Cookie => cookies.clone(),
                Source::Body => vec![body.as_ref()],
            };

            for haystack in haystacks {
                if let Some(captures) = signature.pattern.captures(haystack) {
                    let version = captures.name("version").map(|m| m.as_str().to_string());
                    merge(&mut found, signature.name, version);
                }
            }
        }

        if let Some((name, version)) = self.meta_generator(&body) {
            merge(&mut found, &name, version);
        }

        // Unrecognised Server banners are still worth reporting
        if let Some(server) = headers.get(SERVER).and_then(|v| v.to_str().ok()) {
            let (name, version) = split_label(server);
            let known = found.keys().any(|k| name.to_lowercase().contains(&k.to_lowercase()));
            if !known && !name.is_empty() {
                merge(&mut found, &name, version);
            }
        }

        found
    }
}

fn merge(found: &mut Technologies, name: &str, version: Option<String>) {
    let entry = found.entry(name.to_string()).or_insert(None);
    if entry.is_none() {
        *entry = version;
    }
}

/// Split `App:version` or `App/version` labels into name and version.
pub fn split_label(label: &str) -> (String, Option<String>) {
    let label = label.split_whitespace().next().unwrap_or_default();
    match label.split_once([':', '/']) {
        Some((name, version)) if !version.is_empty() => (name.to_string(), Some(version.to_string())),
        Some((name, _)) => (name.to_string(), None),
        None => (label.to_string(), None),
    }
}

/// Fetch `url` once and fingerprint the response. Any failure yields an empty mapping.
pub async fn detect(transport: &dyn Transport, url: &str, fingerprinter: &dyn Fingerprinter) -> Technologies {
    match transport.probe(url).await {
        Ok(response) => {
            let technologies = fingerprinter.fingerprint(&response.headers, &response.body);
            tracing::info!("Detected {} technologies on {}", technologies.len(), url);
            technologies
        }
        Err(e) => {
            tracing::debug!("Technology detection failed for {}: {}", url, e);
            Technologies::new()
        }
    }
}

/// Run detection in the background and publish the outcome as a scan event.
pub fn spawn_detection(transport: Arc<dyn Transport>, url: String, events: EventSender) {
    tokio::spawn(async move {
        let technologies = detect(transport.as_ref(), &url, &SignatureFingerprinter::new()).await;
        let _ = events.send(ScanEvent::Technologies(technologies));
    });
}

/// `Name vX, Other` for one-line summaries.
pub fn format_technologies(technologies: &Technologies) -> String {
    technologies
        .iter()
        .map(|(name, version)| match version {
            Some(version) => format!("{} v{}", name, version),
            None => name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
