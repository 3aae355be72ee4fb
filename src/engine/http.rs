use crate::config::ScanConfig;
use crate::scan::errors::ScanError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};
use reqwest::{Client, Method};

/// Responses larger than this count as transport failures.
pub const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

const FUZZ: &str = "FUZZ";

#[derive(Debug, Clone, Default)]
pub struct ProbeResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Executes a single HTTP probe. Retries are the caller's concern.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn probe(&self, url: &str) -> Result<ProbeResponse, ScanError>;
}

/// Pooled reqwest client configured from the scan settings.
pub struct ReqwestTransport {
    client: Client,
    method: Method,
}

impl ReqwestTransport {
    pub fn new(config: &ScanConfig) -> Result<Self, ScanError> {
        let method = Method::from_bytes(config.method.as_bytes())
            .map_err(|_| ScanError::InvalidConfig(format!("invalid HTTP method '{}'", config.method)))?;
        Self::with_method(config, method)
    }

    pub fn with_method(config: &ScanConfig, method: Method) -> Result<Self, ScanError> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.no_tls_validation)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(config.user_agent.as_str())
            .default_headers(default_headers(config)?)
            .pool_max_idle_per_host(config.threads * 2);

        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str())
                .map_err(|e| ScanError::InvalidConfig(format!("invalid proxy '{}': {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build()?;
        Ok(Self { client, method })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn probe(&self, url: &str) -> Result<ProbeResponse, ScanError> {
        let mut response = self.client.request(self.method.clone(), url).send().await?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > MAX_BODY_SIZE {
                return Err(ScanError::BodyTooLarge(MAX_BODY_SIZE));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(ProbeResponse {
            status,
            headers,
            body,
        })
    }
}

fn default_headers(config: &ScanConfig) -> Result<HeaderMap, ScanError> {
    let mut headers = HeaderMap::new();

    if let Some(cookies) = &config.cookies {
        let value = HeaderValue::from_str(cookies)
            .map_err(|_| ScanError::InvalidConfig(format!("invalid cookie value '{}'", cookies)))?;
        headers.insert(COOKIE, value);
    }

    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ScanError::InvalidConfig(format!("invalid header name '{}'", name)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| ScanError::InvalidConfig(format!("invalid value for header '{}'", name)))?;
        headers.insert(name, value);
    }

    Ok(headers)
}

/// Build the request URL for a job path.
///
/// Absolute paths are used verbatim, a FUZZ placeholder is substituted
/// once, otherwise the path is joined to the target with a single slash.
pub fn resolve_url(target: &str, path: &str) -> String {
    if path.contains("://") {
        path.to_string()
    } else if target.contains(FUZZ) {
        target.replacen(FUZZ, path, 1)
    } else {
        format!("{}/{}", target.trim_end_matches('/'), path)
    }
}

/// Whether a matched response looks like a directory worth recursing into.
pub fn is_directory(url: &str, status: u16) -> bool {
    url.ends_with('/') || status == 301 || status == 302
}
