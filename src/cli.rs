use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use clap::Parser;
use reqwest::Url;

use crate::date::{parse_date, DateRange};
use crate::error::Result;
use crate::fetch::{FetchConfig, UrlTemplate, DEFAULT_TIMEOUT, DEFAULT_URL_TEMPLATE};
use crate::utils::parse_proxy;

/// Download daily People's Daily PDF editions.
///
/// Without --date or --range, today's edition is fetched. One PDF is saved
/// per date: the front page unless --url-template points elsewhere.
#[derive(Parser, Debug)]
#[command(name = "paperdl", version, about)]
pub struct Cli {
    /// Single edition: YYYYMMDD (also YYYY-MM-DD, YYYY/MM/DD)
    #[arg(short, long, value_name = "DATE", conflicts_with = "range")]
    pub date: Option<String>,

    /// Inclusive range of editions: YYYYMMDD-YYYYMMDD
    #[arg(short, long, value_name = "RANGE")]
    pub range: Option<String>,

    /// Route requests through a proxy, e.g. socks5://127.0.0.1:1080
    #[arg(short, long, value_name = "URL", env = "PAPERDL_PROXY")]
    pub proxy: Option<String>,

    /// Directory the PDFs are written to. By default each file holds the
    /// edition's front page only, not the whole paper.
    #[arg(short, long, value_name = "DIR", default_value = "download")]
    pub output_dir: PathBuf,

    /// Download again even if the file is already there
    #[arg(long)]
    pub overwrite: bool,

    /// Source URL with {yyyy}, {mm} and {dd} placeholders. The default is
    /// the front-page PDF (page 01) of the edition.
    #[arg(long, value_name = "TEMPLATE", default_value = DEFAULT_URL_TEMPLATE)]
    pub url_template: String,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout: u64,

    /// Don't draw progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Everything validated and ready to run.
#[derive(Debug)]
pub struct Job {
    pub range: DateRange,
    pub proxy: Option<Url>,
    pub timeout: Duration,
    pub show_progress: bool,
    pub config: FetchConfig,
}

impl Cli {
    /// Validate the arguments against `today`. Fails before any network use.
    pub fn resolve(&self, today: NaiveDate) -> Result<Job> {
        let range = match (&self.date, &self.range) {
            (Some(date), _) => DateRange::single(parse_date(date)?),
            (None, Some(range)) => DateRange::parse(range)?,
            (None, None) => DateRange::single(today),
        };
        range.check_published(today)?;

        let proxy = self.proxy.as_deref().map(parse_proxy).transpose()?;

        Ok(Job {
            range,
            proxy,
            timeout: Duration::from_secs(self.timeout),
            show_progress: !self.no_progress,
            config: FetchConfig {
                output_dir: self.output_dir.clone(),
                template: UrlTemplate::new(self.url_template.as_str())?,
                overwrite: self.overwrite,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 8).unwrap()
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("paperdl").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults_to_today() {
        let job = cli(&[]).resolve(today()).unwrap();
        assert_eq!(job.range, DateRange::single(today()));
        assert_eq!(job.config.output_dir, PathBuf::from("download"));
        assert_eq!(job.config.template, UrlTemplate::default());
        assert_eq!(job.timeout, DEFAULT_TIMEOUT);
        assert!(!job.config.overwrite);
        assert!(job.show_progress);
    }

    #[test]
    fn test_single_date_and_range() {
        let job = cli(&["-d", "20250401"]).resolve(today()).unwrap();
        assert_eq!(job.range.len(), 1);

        let job = cli(&["-r", "20250401-20250407", "-o", "out", "--overwrite"])
            .resolve(today())
            .unwrap();
        assert_eq!(job.range.len(), 7);
        assert_eq!(job.config.output_dir, PathBuf::from("out"));
        assert!(job.config.overwrite);
    }

    #[test]
    fn test_date_and_range_conflict() {
        assert!(Cli::try_parse_from(["paperdl", "-d", "20250401", "-r", "20250401-20250402"]).is_err());
    }

    #[test]
    fn test_date_flag_rejects_range() {
        assert!(matches!(
            cli(&["-d", "20250401-20250402"]).resolve(today()),
            Err(Error::InvalidDateFormat(_))
        ));
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(
            cli(&["-r", "20250407-20250401"]).resolve(today()),
            Err(Error::InvalidRange { .. })
        ));
        assert!(matches!(
            cli(&["-d", "20250409"]).resolve(today()),
            Err(Error::DateInFuture { .. })
        ));
        assert!(matches!(
            cli(&["-d", "20021231"]).resolve(today()),
            Err(Error::DateTooEarly { .. })
        ));
        assert!(matches!(
            cli(&["-d", "20250401", "-p", "ftp://127.0.0.1:21"]).resolve(today()),
            Err(Error::InvalidProxy { .. })
        ));
        assert!(matches!(
            cli(&["-d", "20250401", "--url-template", "http://x/{yyyy}.pdf"]).resolve(today()),
            Err(Error::InvalidUrlTemplate { .. })
        ));
    }

    #[test]
    fn test_help_says_front_page() {
        use clap::CommandFactory;

        let help = Cli::command().render_long_help().to_string();
        assert!(help.contains("front page only"));
        assert!(help.contains("front-page PDF"));
    }

    #[test]
    fn test_proxy_and_timeout() {
        let job = cli(&["-p", "socks5://127.0.0.1:1080", "--timeout", "5", "--no-progress"])
            .resolve(today())
            .unwrap();
        assert_eq!(job.proxy.unwrap().as_str(), "socks5://127.0.0.1:1080");
        assert_eq!(job.timeout, Duration::from_secs(5));
        assert!(!job.show_progress);
    }
}
