use std::io::Read;
use std::time::Duration;

use chrono::NaiveDate;
use grid_models::Source;
use rand::Rng;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument, warn};

use crate::error::{FetchError, Result};

const MAX_RETRIES: u32 = 3;
const RATE_LIMIT_MAX_RETRIES: u32 = 4;
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// C2: HTTP GET with retry/backoff and archive-zip fallback (§4.2).
pub struct Downloader {
  client: Client,
}

impl Downloader {
  pub fn new() -> Self {
    let client = Client::builder()
      .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
      .user_agent(concat!("grid-fetch/", env!("CARGO_PKG_VERSION"), " (grid ingestion; contact ops@grid-ingest.example)"))
      .build()
      .expect("failed to build HTTP client");
    Downloader { client }
  }

  /// `fetch(url) -> bytes` (§4.2). Retries on connection errors, 5xx
  /// responses, and read timeouts with exponential backoff; does not retry
  /// on 404 or other 4xx besides 408/429.
  #[instrument(skip(self))]
  pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
    let mut attempt = 0u32;
    let mut rate_limit_attempt = 0u32;

    loop {
      match self.client.get(url).send().await {
        Ok(response) => {
          let status = response.status();

          if status.is_success() {
            return response
              .bytes()
              .await
              .map(|b| b.to_vec())
              .map_err(|e| FetchError::TransientError(format!("reading body from {url}: {e}")));
          }

          if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFoundError(url.to_string()));
          }

          if status == StatusCode::TOO_MANY_REQUESTS {
            if rate_limit_attempt >= RATE_LIMIT_MAX_RETRIES {
              return Err(FetchError::TransientError(format!("rate limited: {url}")));
            }
            let delay = retry_after_delay(&response).unwrap_or_else(|| backoff_delay(rate_limit_attempt));
            warn!("429 from {url}, retrying after {:?}", delay);
            rate_limit_attempt += 1;
            tokio::time::sleep(delay).await;
            continue;
          }

          if status == StatusCode::REQUEST_TIMEOUT || status.is_server_error() {
            if attempt + 1 >= MAX_RETRIES {
              return Err(FetchError::TransientError(format!("{status} from {url}")));
            }
            let delay = backoff_delay(attempt);
            warn!("{status} from {url}, attempt {attempt}, retrying after {:?}", delay);
            tokio::time::sleep(delay).await;
            attempt += 1;
            continue;
          }

          // Other 4xx responses are not retried.
          return Err(FetchError::NotFoundError(format!("{status} from {url}")));
        }
        Err(e) => {
          if attempt + 1 >= MAX_RETRIES {
            return Err(FetchError::TransientError(e.to_string()));
          }
          let delay = backoff_delay(attempt);
          warn!("request error for {url}: {e}, attempt {attempt}, retrying after {:?}", delay);
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
      }
    }
  }

  /// `fetch_or_archive(source, date) -> (bytes, actual_url_used)` (§4.2).
  /// Falls back to the archive URL on a 404 from the direct URL; if the
  /// archive is a ZIP, extracts the member matching the expected date or,
  /// failing that, the source's filename stem.
  #[instrument(skip(self, source))]
  pub async fn fetch_or_archive(&self, source: &Source, date: NaiveDate) -> Result<(Vec<u8>, String)> {
    let (direct_url, archive_url) = source.resolve(date);

    match self.fetch(&direct_url).await {
      Ok(bytes) => Ok((bytes, direct_url)),
      Err(FetchError::NotFoundError(_)) => {
        let archive_url = archive_url.ok_or_else(|| FetchError::NotFoundError(direct_url.clone()))?;
        debug!("direct URL 404, falling back to archive {archive_url}");
        let archive_bytes = self.fetch(&archive_url).await?;
        let member = extract_archive_member(&archive_bytes, source, date)?;
        Ok((member, archive_url))
      }
      Err(other) => Err(other),
    }
  }
}

impl Default for Downloader {
  fn default() -> Self {
    Self::new()
  }
}

fn backoff_delay(attempt: u32) -> Duration {
  let base = Duration::from_millis(1000 * 2u64.pow(attempt));
  let jitter_frac: f64 = rand::thread_rng().gen_range(0.0..0.3);
  base.mul_f64(1.0 + jitter_frac)
}

fn retry_after_delay(response: &reqwest::Response) -> Option<Duration> {
  response
    .headers()
    .get(reqwest::header::RETRY_AFTER)
    .and_then(|v| v.to_str().ok())
    .and_then(|s| s.parse::<u64>().ok())
    .map(Duration::from_secs)
}

/// Opens a ZIP archive and returns the bytes of the member whose filename
/// contains the compact date, or, failing that, the source's filename stem
/// (carried in `transformer_tag`, §4.2).
fn extract_archive_member(bytes: &[u8], source: &Source, date: NaiveDate) -> Result<Vec<u8>> {
  let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
    .map_err(|e| FetchError::DecodeError(format!("invalid zip archive: {e}")))?;

  let compact = date.format("%Y%m%d").to_string();

  let member_index = (0..archive.len())
    .find(|&i| archive.by_index(i).map(|f| f.name().contains(&compact)).unwrap_or(false))
    .or_else(|| {
      (0..archive.len())
        .find(|&i| archive.by_index(i).map(|f| f.name().contains(&source.transformer_tag)).unwrap_or(false))
    })
    .ok_or_else(|| FetchError::DecodeError("no archive member matched date or filename stem".to_string()))?;

  let mut member = archive
    .by_index(member_index)
    .map_err(|e| FetchError::DecodeError(format!("reading archive member: {e}")))?;

  let mut buf = Vec::new();
  member
    .read_to_end(&mut buf)
    .map_err(|e| FetchError::DecodeError(format!("extracting archive member: {e}")))?;

  Ok(buf)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  fn sample_source() -> Source {
    Source {
      code: "RT-LBMP".to_string(),
      human_name: "Real-Time LBMP".to_string(),
      category: "pricing".to_string(),
      cadence: grid_core::Cadence::Rt5.into(),
      direct_url_template: "https://example.test/{YYYYMMDD}rt.csv".to_string(),
      archive_url_template: Some("https://example.test/archive/{YYYYMM01}rt_csv.zip".to_string()),
      transformer_tag: "rtlbmp".to_string(),
    }
  }

  fn zip_with_entry(name: &str, content: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
      let cursor = std::io::Cursor::new(&mut buf);
      let mut writer = zip::ZipWriter::new(cursor);
      writer.start_file(name, zip::write::SimpleFileOptions::default()).unwrap();
      writer.write_all(content).unwrap();
      writer.finish().unwrap();
    }
    buf
  }

  #[test]
  fn extracts_member_matching_compact_date() {
    let date = NaiveDate::from_ymd_opt(2025, 11, 13).unwrap();
    let archive = zip_with_entry("20251113rt.csv", b"ts,zone,lbmp\n");
    let bytes = extract_archive_member(&archive, &sample_source(), date).unwrap();
    assert_eq!(bytes, b"ts,zone,lbmp\n");
  }

  #[test]
  fn falls_back_to_filename_stem_when_date_does_not_match() {
    let date = NaiveDate::from_ymd_opt(2025, 11, 13).unwrap();
    let archive = zip_with_entry("rtlbmp_unlabeled.csv", b"ts,zone,lbmp\n");
    let bytes = extract_archive_member(&archive, &sample_source(), date).unwrap();
    assert_eq!(bytes, b"ts,zone,lbmp\n");
  }

  #[test]
  fn fails_when_no_member_matches_either() {
    let date = NaiveDate::from_ymd_opt(2025, 11, 13).unwrap();
    let archive = zip_with_entry("unrelated.csv", b"nope\n");
    assert!(extract_archive_member(&archive, &sample_source(), date).is_err());
  }

  #[test]
  fn backoff_delay_grows_with_attempt_and_stays_within_jitter_bound() {
    let d0 = backoff_delay(0);
    let d1 = backoff_delay(1);
    assert!(d0.as_millis() >= 1000 && d0.as_millis() <= 1300);
    assert!(d1.as_millis() >= 2000 && d1.as_millis() <= 2600);
  }
}
