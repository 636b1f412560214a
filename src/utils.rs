use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use reqwest::{Client, Proxy, Url};

use crate::error::{Error, Result};

const PROXY_SCHEMES: [&str; 4] = ["http", "https", "socks5", "socks5h"];
const BYTES_TEMPLATE: &str =
    "{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";
const EDITIONS_TEMPLATE: &str = "{prefix:.bold.cyan} [{bar:40.green/white}] {pos}/{len} {msg}";

// Helper function for speed calculation
pub fn calculate_speed_mbps(bytes_len_f64: f64, duration_secs_f64: f64) -> f64 {
    if duration_secs_f64 == 0.0 {
        return 0.0;
    }
    (bytes_len_f64 / 1024.0 / 1024.0) / duration_secs_f64
}

/// Checks a proxy URL of the form `scheme://host:port`.
pub fn parse_proxy(raw: &str) -> Result<Url> {
    let invalid = |reason: &str| Error::InvalidProxy {
        url: raw.to_owned(),
        reason: reason.to_owned(),
    };
    let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    if !PROXY_SCHEMES.contains(&url.scheme()) {
        return Err(invalid(&format!(
            "unsupported scheme {:?}, expected one of {}",
            url.scheme(),
            PROXY_SCHEMES.join(", ")
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }
    // Url hides a port equal to the scheme default, so check the raw text for it.
    let explicit_port = url.port().is_some()
        || url
            .port_or_known_default()
            .is_some_and(|p| raw.trim_end_matches('/').ends_with(&format!(":{p}")));
    if !explicit_port {
        return Err(invalid("missing port"));
    }
    Ok(url)
}

pub fn build_client(proxy: Option<&Url>, timeout: Duration, user_agent: &str) -> Result<Client> {
    let mut builder = Client::builder().timeout(timeout).user_agent(user_agent);
    if let Some(url) = proxy {
        let proxy = Proxy::all(url.as_str()).map_err(|e| Error::InvalidProxy {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        builder = builder.proxy(proxy);
    }
    builder.build().map_err(|e| Error::network("<client setup>", e))
}

/// Progress bars for one run. Hidden bars are used when progress is disabled.
#[derive(Clone)]
pub struct Progress {
    multi: MultiProgress,
}

impl Progress {
    pub fn new(visible: bool) -> Self {
        let target = if visible {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        };
        Self {
            multi: MultiProgress::with_draw_target(target),
        }
    }

    pub fn hidden() -> Self {
        Self::new(false)
    }

    pub fn editions(&self, total: u64) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new(total));
        if let Ok(style) = ProgressStyle::with_template(EDITIONS_TEMPLATE) {
            pb.set_style(style.progress_chars("=> "));
        }
        pb.set_prefix("editions");
        pb
    }

    pub fn bytes(&self, label: String, total: Option<u64>) -> ProgressBar {
        let pb = match total {
            Some(len) => ProgressBar::new(len),
            None => ProgressBar::no_length(),
        };
        let pb = self.multi.add(pb);
        if let Ok(style) = ProgressStyle::with_template(BYTES_TEMPLATE) {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message(label);
        pb
    }

    /// Runs `f` with bars suspended so log lines don't tear them.
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.multi.suspend(f)
    }
}
