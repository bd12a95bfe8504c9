//! Page-source boundary: where the published markup comes from.
//!
//! The pipeline only needs "markup for a URL". Whether that is a live HTTP
//! GET or a file saved by an operator is decided by the caller. Sources do
//! not retry; a failed fetch fails the run and the scheduler tries again.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, REFERER};
use tracing::info;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum SourceError {
    /// Network or transport failure (DNS, TLS, timeout, body read).
    Transport(String),
    /// The server answered with a non-success status.
    Http { status: u16, url: String },
    /// Reading a saved page failed.
    Io(String),
    /// The source could not be constructed from its options.
    Config(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Transport(msg) => write!(f, "transport error: {msg}"),
            SourceError::Http { status, url } => write!(f, "http status {status} from {url}"),
            SourceError::Io(msg) => write!(f, "io error: {msg}"),
            SourceError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for SourceError {}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Anything that can hand back raw markup for a target location.
///
/// Object safe so callers can hold a `Box<dyn PageSource>`.
pub trait PageSource {
    /// Short name for logs (e.g. `"http"`, `"file"`).
    fn name(&self) -> &'static str;

    fn fetch_page(&self, url: &str) -> Result<String, SourceError>;
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HttpSourceOptions {
    pub user_agent: String,
    pub accept_language: String,
    pub referer: Option<String>,
    pub timeout: Duration,
}

/// Plain blocking HTTP GET with browser-like headers.
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    http: reqwest::blocking::Client,
    accept_language: String,
    referer: Option<String>,
}

impl HttpPageSource {
    pub fn new(opts: &HttpSourceOptions) -> Result<Self, SourceError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(opts.user_agent.as_str())
            .timeout(opts.timeout)
            .build()
            .map_err(|e| SourceError::Config(format!("http client build failed: {e}")))?;
        Ok(Self {
            http,
            accept_language: opts.accept_language.clone(),
            referer: opts.referer.clone(),
        })
    }
}

impl PageSource for HttpPageSource {
    fn name(&self) -> &'static str {
        "http"
    }

    fn fetch_page(&self, url: &str) -> Result<String, SourceError> {
        info!(url, "fetching page");

        let mut req = self
            .http
            .get(url)
            .header(ACCEPT_LANGUAGE, self.accept_language.as_str())
            .header(
                ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            );
        if let Some(r) = &self.referer {
            req = req.header(REFERER, r.as_str());
        }

        let resp = req
            .send()
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = resp
            .text()
            .map_err(|e| SourceError::Transport(format!("body read failed: {e}")))?;
        info!(bytes = body.len(), "page fetched");
        Ok(body)
    }
}

// ---------------------------------------------------------------------------
// File
// ---------------------------------------------------------------------------

/// Serves a page saved to disk, ignoring the requested URL.
#[derive(Debug, Clone)]
pub struct FilePageSource {
    path: PathBuf,
}

impl FilePageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PageSource for FilePageSource {
    fn name(&self) -> &'static str {
        "file"
    }

    fn fetch_page(&self, url: &str) -> Result<String, SourceError> {
        info!(path = %self.path.display(), url, "reading saved page");
        fs::read_to_string(&self.path)
            .map_err(|e| SourceError::Io(format!("{}: {e}", self.path.display())))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
