//! Ordered probe strategies
//!
//! A URL is checked by running [`PROBE_CHAIN`] front to back. Each step either
//! settles the verdict or reports [`StepOutcome::Inconclusive`], in which case
//! the next step runs. The last step always settles.

use super::heuristics::{chunk_seems_html, looks_like_file};
use super::LivenessVerdict;
use crate::core::config::ProbeSettings;
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, RANGE};
use reqwest::{Client, Method, Response, StatusCode};
use std::time::Duration;

/// Probe steps in the order they are attempted
pub const PROBE_CHAIN: [ProbeStep; 3] = [ProbeStep::Head, ProbeStep::Range, ProbeStep::Get];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStep {
    /// Header-only request, confirmed by a streamed GET
    Head,
    /// GET for the first byte only
    Range,
    /// Plain streamed GET, the final fallback
    Get,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Settled(LivenessVerdict),
    Inconclusive,
}

/// Shared state handed to every step
pub struct ProbeContext<'a> {
    pub client: &'a Client,
    pub settings: &'a ProbeSettings,
}

impl ProbeStep {
    pub async fn run(self, ctx: &ProbeContext<'_>, url: &str) -> StepOutcome {
        match self {
            ProbeStep::Head => head_step(ctx, url).await,
            ProbeStep::Range => range_step(ctx, url).await,
            ProbeStep::Get => get_step(ctx, url).await,
        }
    }
}

async fn head_step(ctx: &ProbeContext<'_>, url: &str) -> StepOutcome {
    let head = match send(ctx, Method::HEAD, url, None, ctx.settings.head_timeout()).await {
        Ok(resp) => resp,
        Err(e) => {
            log::debug!("HEAD failed for {}: {}", url, e);
            return StepOutcome::Inconclusive;
        }
    };

    if !head.status().is_success() || !looks_like_file(head.headers()) {
        return StepOutcome::Inconclusive;
    }

    // Headers alone do not prove an active target
    match send(ctx, Method::GET, url, None, ctx.settings.get_timeout()).await {
        Ok(resp) if is_content_status(resp.status()) => {
            match first_chunk(resp).await {
                Some(chunk) if !chunk.is_empty() && !chunk_seems_html(&chunk) => {
                    StepOutcome::Settled(LivenessVerdict::live(url, "HEAD+GET bytes"))
                }
                _ => StepOutcome::Inconclusive,
            }
        }
        Ok(_) => StepOutcome::Inconclusive,
        Err(e) => {
            log::debug!("Confirmation GET failed for {}: {}", url, e);
            StepOutcome::Inconclusive
        }
    }
}

async fn range_step(ctx: &ProbeContext<'_>, url: &str) -> StepOutcome {
    let resp = match send(ctx, Method::GET, url, Some("bytes=0-0"), ctx.settings.get_timeout()).await
    {
        Ok(resp) => resp,
        Err(e) => {
            log::debug!("Range GET failed for {}: {}", url, e);
            return StepOutcome::Inconclusive;
        }
    };

    if !is_content_status(resp.status()) || !looks_like_file(resp.headers()) {
        return StepOutcome::Inconclusive;
    }

    match first_chunk(resp).await {
        Some(chunk) if !chunk.is_empty() && !chunk_seems_html(&chunk) => {
            StepOutcome::Settled(LivenessVerdict::live(url, "RANGE bytes"))
        }
        _ => StepOutcome::Inconclusive,
    }
}

async fn get_step(ctx: &ProbeContext<'_>, url: &str) -> StepOutcome {
    let verdict = match send(ctx, Method::GET, url, None, ctx.settings.get_timeout()).await {
        Ok(resp) if resp.status().is_success() => match first_chunk(resp).await {
            Some(chunk) if !chunk.is_empty() && !chunk_seems_html(&chunk) => {
                LivenessVerdict::live(url, "GET bytes")
            }
            _ => LivenessVerdict::offline(url, "GET html-or-empty"),
        },
        Ok(resp) => LivenessVerdict::offline(url, format!("GET status {}", resp.status().as_u16())),
        Err(e) => LivenessVerdict::offline(url, format!("exception: {}", error_kind(&e))),
    };
    StepOutcome::Settled(verdict)
}

fn is_content_status(status: StatusCode) -> bool {
    status == StatusCode::OK || status == StatusCode::PARTIAL_CONTENT
}

/// Read the first body chunk, treating read errors as an empty body
async fn first_chunk(mut resp: Response) -> Option<Vec<u8>> {
    match resp.chunk().await {
        Ok(Some(bytes)) => Some(bytes.to_vec()),
        Ok(None) => Some(Vec::new()),
        Err(e) => {
            log::debug!("Body read failed for {}: {}", resp.url(), e);
            None
        }
    }
}

/// Send an idempotent request, retrying transient failures with backoff
async fn send(
    ctx: &ProbeContext<'_>,
    method: Method,
    url: &str,
    range: Option<&str>,
    timeout: Duration,
) -> reqwest::Result<Response> {
    let settings = ctx.settings;
    let mut attempt: u32 = 0;

    loop {
        let mut request = ctx
            .client
            .request(method.clone(), url)
            .timeout(timeout)
            .header(ACCEPT, "*/*")
            .header(ACCEPT_ENCODING, "identity");
        if let Some(range) = range {
            request = request.header(RANGE, range);
        }

        let result = request.send().await;
        let retryable = match &result {
            Ok(resp) => settings.retry_statuses.contains(&resp.status().as_u16()),
            Err(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        };

        if !retryable || attempt >= settings.retries {
            return result;
        }

        let delay = settings.backoff() * 2u32.saturating_pow(attempt);
        log::debug!(
            "Retrying {} {} in {:?} (attempt {}/{})",
            method,
            url,
            delay,
            attempt + 1,
            settings.retries
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// Short name of a request failure for verdict reasons
pub fn error_kind(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "Timeout"
    } else if e.is_connect() {
        "ConnectionError"
    } else if e.is_redirect() {
        "TooManyRedirects"
    } else if e.is_body() || e.is_decode() {
        "ChunkedEncodingError"
    } else if e.is_builder() {
        "InvalidURL"
    } else {
        "RequestException"
    }
}
