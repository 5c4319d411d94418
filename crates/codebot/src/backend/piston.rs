//! Piston execution provider (<https://github.com/engineer-man/piston>).
//!
//! Wire schema:
//!
//! - `POST {url}/execute` with `{language, version: "*", files: [{content}],
//!   stdin, args}`; response carries a `run` phase and an optional
//!   `compile` phase, each with stdout/stderr/code.
//! - `GET {url}/runtimes` lists installed runtimes; the catalog maps both
//!   the canonical language name and every alias onto that name.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ExecutionBackend, ExecutionRequest, ExecutionResult, TransportError};

#[derive(Serialize)]
struct PistonRequest<'a> {
    language: &'a str,
    version: &'a str,
    files: Vec<PistonFile<'a>>,
    stdin: &'a str,
    args: &'a [String],
}

#[derive(Serialize)]
struct PistonFile<'a> {
    content: &'a str,
}

#[derive(Debug, Deserialize, Default)]
struct PistonPhase {
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
    #[serde(default)]
    code: i32,
}

#[derive(Debug, Deserialize)]
struct PistonResponse {
    run: PistonPhase,
    compile: Option<PistonPhase>,
}

#[derive(Debug, Deserialize)]
struct PistonRuntime {
    language: String,
    #[allow(dead_code)]
    version: String,
    #[serde(default)]
    aliases: Vec<String>,
}

pub struct PistonBackend {
    name: String,
    url: String,
    client: reqwest::Client,
    /// Replaced wholesale by `refresh_catalog`; readers clone the `Arc` and
    /// never observe a partially-built map.
    languages: RwLock<Arc<HashMap<String, String>>>,
}

impl PistonBackend {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        languages: HashMap<String, String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let url = url.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::from_reqwest(&url, e))?;
        Ok(Self {
            name: name.into(),
            url,
            client,
            languages: RwLock::new(Arc::new(languages)),
        })
    }

    fn catalog(&self) -> Arc<HashMap<String, String>> {
        self.languages
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl ExecutionBackend for PistonBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, req: &ExecutionRequest) -> Result<ExecutionResult, TransportError> {
        let catalog = self.catalog();
        let Some(language) = catalog.get(&req.lang) else {
            return Ok(ExecutionResult::unsupported_language(&req.lang));
        };

        let url = format!("{}/execute", self.url);
        let empty: Vec<String> = Vec::new();
        let body = PistonRequest {
            language,
            version: "*",
            files: vec![PistonFile {
                content: &req.source,
            }],
            stdin: req.stdin.as_deref().unwrap_or(""),
            args: req.args.as_deref().unwrap_or(&empty),
        };

        debug!(backend = %self.name, lang = %req.lang, %language, "submitting to piston");
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let parsed: PistonResponse =
            resp.json()
                .await
                .map_err(|e| TransportError::MalformedBody {
                    url,
                    reason: e.to_string(),
                })?;
        Ok(into_result(parsed))
    }

    async fn refresh_catalog(&self) -> Result<(), TransportError> {
        let url = format!("{}/runtimes", self.url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let runtimes: Vec<PistonRuntime> =
            resp.json()
                .await
                .map_err(|e| TransportError::MalformedBody {
                    url,
                    reason: e.to_string(),
                })?;

        let mut map = HashMap::new();
        for rt in &runtimes {
            map.insert(rt.language.clone(), rt.language.clone());
            for alias in &rt.aliases {
                map.insert(alias.clone(), rt.language.clone());
            }
        }
        info!(backend = %self.name, languages = map.len(), "piston catalog refreshed");
        *self.languages.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(map);
        Ok(())
    }

    fn supports(&self, lang: &str) -> bool {
        self.catalog().contains_key(lang)
    }
}

/// Fold the two-phase piston response into one result. A failed compile
/// phase wins: its stderr becomes the compile error and its code the exit
/// code, regardless of what the run phase says.
fn into_result(resp: PistonResponse) -> ExecutionResult {
    let compile_failed = resp
        .compile
        .as_ref()
        .is_some_and(|c| c.code != 0 || !c.stderr.is_empty());

    let (compile_error, exit_code) = match (&resp.compile, compile_failed) {
        (Some(c), true) => (Some(c.stderr.clone()), if c.code != 0 { c.code } else { 1 }),
        _ => (None, resp.run.code),
    };

    ExecutionResult {
        stdout: some_if_nonempty(resp.run.stdout),
        stderr: some_if_nonempty(resp.run.stderr),
        compile_error,
        exit_code,
    }
}

fn some_if_nonempty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
