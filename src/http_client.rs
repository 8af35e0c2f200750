use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use rand::Rng;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use tracing::{debug, warn};

const REQUEST_TIMEOUT_SECS: u64 = 20;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .context("failed to build http client")
    })
}

/// Plain GET with linear backoff. `Ok(None)` for a missing page, or once
/// every attempt failed or returned another non-200 status.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    pub attempts: u32,
    /// Random pause, in seconds, after each page read.
    pub pause: (f64, f64),
}

impl Default for PageFetcher {
    fn default() -> Self {
        Self {
            attempts: 3,
            pause: (1.0, 2.2),
        }
    }
}

impl PageFetcher {
    pub fn get(&self, url: &str) -> Result<Option<String>> {
        let client = http_client()?;
        for attempt in 0..self.attempts {
            match client.get(url).send() {
                Ok(resp) if resp.status() == StatusCode::OK => {
                    let body = resp.text().context("failed reading body")?;
                    self.pause();
                    return Ok(Some(body));
                }
                Ok(resp) if is_missing(resp.status()) => {
                    debug!(url, status = %resp.status(), "page missing");
                    return Ok(None);
                }
                Ok(resp) => debug!(url, status = %resp.status(), attempt, "non-200 response"),
                Err(err) => debug!(url, error = %err, attempt, "request failed"),
            }
            thread::sleep(linear_backoff(attempt));
        }
        Ok(None)
    }

    fn pause(&self) {
        let (lo, hi) = self.pause;
        if hi <= 0.0 || hi < lo {
            return;
        }
        let secs = if hi > lo {
            rand::thread_rng().gen_range(lo..hi)
        } else {
            lo
        };
        thread::sleep(Duration::from_secs_f64(secs));
    }
}

/// 1s, 3s, 5s, ... after the first, second, third failed try.
pub fn linear_backoff(attempt: u32) -> Duration {
    Duration::from_secs(1 + u64::from(attempt) * 2)
}

/// A page that will not appear on retry.
fn is_missing(status: StatusCode) -> bool {
    status == StatusCode::NOT_FOUND || status == StatusCode::GONE
}

/// Runs `request` up to `attempts` times (at least once), sleeping
/// `backoff(attempt)` after each failure. Returns the last error.
pub fn with_retries<T>(
    attempts: u32,
    backoff: impl Fn(u32) -> Duration,
    mut request: impl FnMut(u32) -> Result<T>,
) -> Result<T> {
    let attempts = attempts.max(1);
    let mut attempt = 0;
    loop {
        match request(attempt) {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 >= attempts => return Err(err),
            Err(err) => {
                warn!(attempt, error = %err, "request failed, retrying");
                thread::sleep(backoff(attempt));
                attempt += 1;
            }
        }
    }
}
