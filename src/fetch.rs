//! Per-edition download: build the URL for a date, GET it, stream it to disk.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDate;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::{header::CONTENT_TYPE, Client, Url};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, error, info};

use crate::date::DateRange;
use crate::error::{Error, Result};
use crate::utils::{build_client, calculate_speed_mbps, Progress};

/// Front page (page 01) of the edition, not the whole paper.
pub const DEFAULT_URL_TEMPLATE: &str =
    "http://paper.people.com.cn/rmrb/images/{yyyy}-{mm}/{dd}/rmrb{yyyy}{mm}{dd}01.pdf";
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Anything smaller is an error page, not an edition.
pub const MIN_EDITION_BYTES: u64 = 1024;

const PLACEHOLDERS: [&str; 3] = ["{yyyy}", "{mm}", "{dd}"];
const PART_SUFFIX: &str = ".part";

/// Source URL pattern with `{yyyy}`, `{mm}` and `{dd}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate(String);

impl UrlTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        let invalid = |reason: String| Error::InvalidUrlTemplate {
            template: template.clone(),
            reason,
        };
        let missing: Vec<_> = PLACEHOLDERS
            .iter()
            .filter(|p| !template.contains(*p))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(invalid(format!("missing {}", missing.join(", "))));
        }

        let candidate = Self(template.clone());
        let sample = NaiveDate::from_ymd_opt(2003, 1, 1).map(|d| candidate.render(d));
        match sample.as_deref().map(Url::parse) {
            Some(Ok(url)) if matches!(url.scheme(), "http" | "https") => Ok(candidate),
            Some(Ok(url)) => Err(invalid(format!("unsupported scheme {:?}", url.scheme()))),
            Some(Err(e)) => Err(invalid(e.to_string())),
            None => Err(invalid("cannot render".to_owned())),
        }
    }

    pub fn render(&self, date: NaiveDate) -> String {
        self.0
            .replace("{yyyy}", &date.format("%Y").to_string())
            .replace("{mm}", &date.format("%m").to_string())
            .replace("{dd}", &date.format("%d").to_string())
    }
}

impl Default for UrlTemplate {
    fn default() -> Self {
        Self(DEFAULT_URL_TEMPLATE.to_owned())
    }
}

impl FromStr for UrlTemplate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Where one day's edition comes from and where it goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edition {
    pub date: NaiveDate,
    pub url: String,
    pub path: PathBuf,
}

impl Edition {
    pub fn new(date: NaiveDate, template: &UrlTemplate, output_dir: &Path) -> Self {
        Self {
            date,
            url: template.render(date),
            path: output_dir.join(Self::file_name(date)),
        }
    }

    pub fn file_name(date: NaiveDate) -> String {
        format!("People's.Daily.{}.pdf", date.format("%Y%m%d"))
    }

    fn part_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(PART_SUFFIX);
        PathBuf::from(name)
    }
}

/// A response whose body has not been read yet.
pub struct Response {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: BoxStream<'static, Result<Bytes>>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str) -> Result<Response>;
}

pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new(proxy: Option<&Url>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(proxy, timeout, USER_AGENT)?,
        })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::network(url, e))?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let owned_url = url.to_owned();
        Ok(Response {
            status: response.status().as_u16(),
            content_type,
            content_length: response.content_length(),
            body: response
                .bytes_stream()
                .map(move |chunk| chunk.map_err(|e| Error::network(owned_url.clone(), e)))
                .boxed(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub output_dir: PathBuf,
    pub template: UrlTemplate,
    /// Replace editions already on disk instead of skipping them.
    pub overwrite: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Saved { path: PathBuf, bytes: u64 },
    Skipped { path: PathBuf },
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub saved: Vec<NaiveDate>,
    pub skipped: Vec<NaiveDate>,
    pub failed: Vec<(NaiveDate, Error)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.saved.len() + self.skipped.len() + self.failed.len()
    }
}

pub struct Fetcher<C> {
    client: C,
    config: FetchConfig,
    progress: Progress,
}

impl<C: HttpClient> Fetcher<C> {
    pub fn new(client: C, config: FetchConfig) -> Self {
        Self {
            client,
            config,
            progress: Progress::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    pub fn edition(&self, date: NaiveDate) -> Edition {
        Edition::new(date, &self.config.template, &self.config.output_dir)
    }

    /// Download one edition. Nothing is left at the final path on failure.
    pub async fn fetch(&self, date: NaiveDate) -> Result<Outcome> {
        let edition = self.edition(date);
        if !self.config.overwrite
            && fs::try_exists(&edition.path)
                .await
                .map_err(|e| Error::filesystem(&edition.path, e))?
        {
            return Ok(Outcome::Skipped { path: edition.path });
        }

        fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(|e| Error::filesystem(&self.config.output_dir, e))?;

        self.progress
            .suspend(|| debug!(url = %edition.url, "requesting edition {date}"));
        let started = Instant::now();
        let response = self.client.get(&edition.url).await?;
        check_response(&edition.url, &response)?;

        let part = edition.part_path();
        let saved = async {
            let bytes = self.write_body(&edition, response, &part).await?;
            fs::rename(&part, &edition.path)
                .await
                .map_err(|e| Error::filesystem(&edition.path, e))?;
            Ok::<_, Error>(bytes)
        }
        .await;
        let bytes = match saved {
            Ok(bytes) => bytes,
            Err(e) => {
                if let Err(rm) = fs::remove_file(&part).await {
                    self.progress
                        .suspend(|| debug!("could not remove {}: {rm}", part.display()));
                }
                return Err(e);
            }
        };

        let speed = calculate_speed_mbps(bytes as f64, started.elapsed().as_secs_f64());
        self.progress
            .suspend(|| debug!("{date}: {bytes} bytes at {speed:.2} MB/s"));
        Ok(Outcome::Saved {
            path: edition.path,
            bytes,
        })
    }

    async fn write_body(&self, edition: &Edition, response: Response, part: &Path) -> Result<u64> {
        let pb = self
            .progress
            .bytes(edition.date.to_string(), response.content_length);
        let result = async {
            let mut file = fs::File::create(part)
                .await
                .map_err(|e| Error::filesystem(part, e))?;

            // stream downloading
            let mut body = response.body;
            let mut written: u64 = 0;
            while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                file.write_all(&chunk)
                    .await
                    .map_err(|e| Error::filesystem(part, e))?;
                written += chunk.len() as u64;
                pb.set_position(written);
            }
            file.sync_all()
                .await
                .map_err(|e| Error::filesystem(part, e))?;
            Ok::<_, Error>(written)
        }
        .await;
        pb.finish_and_clear();

        let written = result?;
        if written < MIN_EDITION_BYTES {
            return Err(Error::UnexpectedContent {
                url: edition.url.clone(),
                reason: format!("body is only {written} bytes"),
            });
        }
        Ok(written)
    }

    /// Fetch every day of `range` in order. A failed day is logged and the
    /// rest of the range still runs.
    pub async fn run_batch(&self, range: &DateRange) -> BatchReport {
        let mut report = BatchReport::default();
        let bar = self.progress.editions(range.len());

        for date in range {
            bar.set_message(date.to_string());
            match self.fetch(date).await {
                Ok(Outcome::Saved { path, bytes }) => {
                    self.progress
                        .suspend(|| info!("{date}: saved {} ({bytes} bytes)", path.display()));
                    report.saved.push(date);
                }
                Ok(Outcome::Skipped { path }) => {
                    self.progress
                        .suspend(|| info!("{date}: {} already exists, skipping", path.display()));
                    report.skipped.push(date);
                }
                Err(e) => {
                    self.progress.suspend(|| error!("{date}: {e}"));
                    report.failed.push((date, e));
                }
            }
            bar.inc(1);
        }

        bar.finish_and_clear();
        report
    }
}

fn check_response(url: &str, response: &Response) -> Result<()> {
    if !response.is_success() {
        return Err(Error::Http {
            url: url.to_owned(),
            status: response.status,
        });
    }
    match response.content_type.as_deref() {
        Some(ct) if !ct.to_ascii_lowercase().contains("application/pdf") => {
            Err(Error::UnexpectedContent {
                url: url.to_owned(),
                reason: format!("content type {ct:?} is not a PDF"),
            })
        }
        _ => Ok(()),
    }
}
