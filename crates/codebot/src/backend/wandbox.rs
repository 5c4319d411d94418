//! Wandbox execution provider (<https://wandbox.org>).
//!
//! Wire schema: a single `POST {url}` with `{code, compiler, stdin,
//! "runtime-option-raw"}`. The response carries `program_output`,
//! `program_error`, `compiler_error` and a `status` string that parses as
//! the process exit code.
//!
//! Wandbox has no runtime catalog endpoint we consume; the language →
//! compiler-id map comes entirely from configuration, so `refresh_catalog`
//! is a no-op.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ExecutionBackend, ExecutionRequest, ExecutionResult, TransportError};

#[derive(Serialize)]
struct WandboxRequest<'a> {
    code: &'a str,
    compiler: &'a str,
    stdin: Option<&'a str>,
    #[serde(rename = "runtime-option-raw")]
    runtime_option_raw: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct WandboxResponse {
    #[serde(default)]
    program_output: String,
    #[serde(default)]
    program_error: String,
    #[serde(default)]
    compiler_error: String,
    #[serde(default)]
    status: String,
}

pub struct WandboxBackend {
    name: String,
    url: String,
    client: reqwest::Client,
    /// Fixed for the process lifetime; wandbox compiler ids are configured,
    /// not discovered.
    compilers: HashMap<String, String>,
}

impl WandboxBackend {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        compilers: HashMap<String, String>,
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
            compilers,
        })
    }
}

#[async_trait]
impl ExecutionBackend for WandboxBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, req: &ExecutionRequest) -> Result<ExecutionResult, TransportError> {
        let Some(compiler) = self.compilers.get(&req.lang) else {
            return Ok(ExecutionResult::unsupported_language(&req.lang));
        };

        let body = WandboxRequest {
            code: &req.source,
            compiler,
            stdin: req.stdin.as_deref(),
            runtime_option_raw: req.args.as_ref().map(|a| a.join("\n")),
        };

        debug!(backend = %self.name, lang = %req.lang, %compiler, "submitting to wandbox");
        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&self.url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let parsed: WandboxResponse =
            resp.json()
                .await
                .map_err(|e| TransportError::MalformedBody {
                    url: self.url.clone(),
                    reason: e.to_string(),
                })?;
        into_result(&self.url, parsed)
    }

    async fn refresh_catalog(&self) -> Result<(), TransportError> {
        debug!(backend = %self.name, "wandbox catalog is static, nothing to refresh");
        Ok(())
    }

    fn supports(&self, lang: &str) -> bool {
        self.compilers.contains_key(lang)
    }
}

fn into_result(url: &str, resp: WandboxResponse) -> Result<ExecutionResult, TransportError> {
    let exit_code: i32 =
        resp.status
            .trim()
            .parse()
            .map_err(|_| TransportError::MalformedBody {
                url: url.to_string(),
                reason: format!("non-numeric status {:?}", resp.status),
            })?;

    Ok(ExecutionResult {
        stdout: some_if_nonempty(resp.program_output),
        stderr: some_if_nonempty(resp.program_error),
        compile_error: some_if_nonempty(resp.compiler_error),
        exit_code,
    })
}

fn some_if_nonempty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
