use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid date format: {0:?} (expected YYYYMMDD or YYYYMMDD-YYYYMMDD)")]
    InvalidDateFormat(String),

    #[error("invalid range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("no editions before {first_year}: {date}")]
    DateTooEarly { date: NaiveDate, first_year: i32 },

    #[error("date is in the future: {date} (today is {today})")]
    DateInFuture { date: NaiveDate, today: NaiveDate },

    #[error("invalid proxy {url:?}: {reason}")]
    InvalidProxy { url: String, reason: String },

    #[error("invalid url template {template:?}: {reason}")]
    InvalidUrlTemplate { template: String, reason: String },

    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("HTTP {status} fetching {url}")]
    Http { url: String, status: u16 },

    #[error("unexpected content from {url}: {reason}")]
    UnexpectedContent { url: String, reason: String },

    #[error("cannot write {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn network(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::Network {
            url: url.into(),
            source: source.into(),
        }
    }

    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Filesystem {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = Error::Http {
            url: "http://example.com/a.pdf".into(),
            status: 404,
        };
        assert_eq!(err.to_string(), "HTTP 404 fetching http://example.com/a.pdf");

        let err = Error::network("http://example.com", "connection refused");
        assert_eq!(
            err.to_string(),
            "network error fetching http://example.com: connection refused"
        );
    }
}
