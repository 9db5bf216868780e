//! Judge status prober: asks the BOJ status page whether a user has an accepted
//! submission for a problem.
//!
//! HTML handling sits behind `AcceptedRowCounter` so the control flow here does
//! not care how rows are counted.

use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, error, instrument};

use crate::config::Pacing;
use crate::domain::SolveStatus;
use crate::error::{ProbeError, UpstreamError};

/// Browser user-agent; the judge rejects obvious bots.
const BROWSER_UA: &str =
  "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";
const PROBE_TIMEOUT: Duration = Duration::from_secs(15);
/// `result_id` of "맞았습니다!!" on the status page.
const ACCEPTED_RESULT_ID: &str = "4";

#[async_trait]
pub trait StatusProbe: Send + Sync {
  async fn probe(&self, user_id: &str, problem_id: &str) -> Result<SolveStatus, ProbeError>;
}

pub trait AcceptedRowCounter: Send + Sync {
  fn count_accepted_rows(&self, html: &str) -> Result<usize, UpstreamError>;
}

/// DOM counter built on `scraper`. A page without the results table is a
/// format error, not an empty result.
#[derive(Clone, Debug)]
pub struct TableRowCounter {
  table_css: String,
  row_css: String,
}

impl Default for TableRowCounter {
  fn default() -> Self {
    Self { table_css: "table.table".into(), row_css: "table.table tbody tr".into() }
  }
}

fn selector(css: &str) -> Result<Selector, UpstreamError> {
  Selector::parse(css).map_err(|e| UpstreamError::Format(format!("bad selector {css:?}: {e:?}")))
}

impl AcceptedRowCounter for TableRowCounter {
  fn count_accepted_rows(&self, html: &str) -> Result<usize, UpstreamError> {
    let table = selector(&self.table_css)?;
    let rows = selector(&self.row_css)?;
    let doc = Html::parse_document(html);
    if doc.select(&table).next().is_none() {
      return Err(UpstreamError::Format("status table not found".into()));
    }
    Ok(doc.select(&rows).count())
  }
}

pub struct JudgeProber {
  client: reqwest::Client,
  base_url: String,
  counter: Box<dyn AcceptedRowCounter>,
  pacing: Pacing,
}

impl JudgeProber {
  pub fn new(base_url: impl Into<String>, pacing: Pacing) -> Result<Self, UpstreamError> {
    let client = reqwest::Client::builder()
      .timeout(PROBE_TIMEOUT)
      .user_agent(BROWSER_UA)
      .build()?;
    Ok(Self {
      client,
      base_url: base_url.into().trim_end_matches('/').to_string(),
      counter: Box::new(TableRowCounter::default()),
      pacing,
    })
  }

  #[cfg(test)]
  pub fn with_counter(mut self, counter: impl AcceptedRowCounter + 'static) -> Self {
    self.counter = Box::new(counter);
    self
  }

  async fn fetch_status_page(&self, user_id: &str, problem_id: &str) -> Result<String, UpstreamError> {
    let url = format!("{}/status", self.base_url);
    let res = self
      .client
      .get(&url)
      .query(&[("user_id", user_id), ("problem_id", problem_id), ("result_id", ACCEPTED_RESULT_ID)])
      .send()
      .await?;
    if !res.status().is_success() {
      return Err(UpstreamError::Status(res.status()));
    }
    Ok(res.text().await?)
  }
}

#[async_trait]
impl StatusProbe for JudgeProber {
  #[instrument(level = "info", skip(self), fields(%user_id, %problem_id))]
  async fn probe(&self, user_id: &str, problem_id: &str) -> Result<SolveStatus, ProbeError> {
    let fetched = self.fetch_status_page(user_id, problem_id).await;
    self.pacing.after_probe().await;

    match fetched.and_then(|html| self.counter.count_accepted_rows(&html)) {
      Ok(rows) => {
        debug!(target: "judge", %user_id, %problem_id, rows, "Accepted rows counted");
        Ok(if rows > 0 { SolveStatus::Solved } else { SolveStatus::Unsolved })
      }
      Err(source) => {
        error!(target: "judge", %user_id, %problem_id, error = %source, "Status probe failed");
        Err(ProbeError { user_id: user_id.to_string(), problem_id: problem_id.to_string(), source })
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use httpmock::prelude::*;

  fn page(rows: usize) -> String {
    let body: String = (0..rows)
      .map(|i| format!("<tr><td>{i}</td><td>맞았습니다!!</td></tr>"))
      .collect();
    format!("<html><body><table class=\"table\"><thead><tr><th>#</th></tr></thead><tbody>{body}</tbody></table></body></html>")
  }

  #[test]
  fn counter_counts_body_rows_only() {
    let c = TableRowCounter::default();
    assert_eq!(c.count_accepted_rows(&page(0)).unwrap(), 0);
    assert_eq!(c.count_accepted_rows(&page(3)).unwrap(), 3);
  }

  #[test]
  fn counter_rejects_page_without_table() {
    let c = TableRowCounter::default();
    let err = c.count_accepted_rows("<html><body>captcha</body></html>").unwrap_err();
    assert!(matches!(err, UpstreamError::Format(_)));
  }

  #[tokio::test]
  async fn probe_reports_solved_when_rows_exist() {
    let server = MockServer::start_async().await;
    let m = server
      .mock_async(|when, then| {
        when
          .method(GET)
          .path("/status")
          .query_param("user_id", "alice")
          .query_param("problem_id", "1000")
          .query_param("result_id", "4");
        then.status(200).body(page(2));
      })
      .await;

    let prober = JudgeProber::new(server.base_url(), Pacing::none()).unwrap();
    assert_eq!(prober.probe("alice", "1000").await.unwrap(), SolveStatus::Solved);
    m.assert_async().await;
  }

  #[tokio::test]
  async fn probe_reports_unsolved_on_empty_table() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(GET).path("/status");
        then.status(200).body(page(0));
      })
      .await;

    let prober = JudgeProber::new(server.base_url(), Pacing::none()).unwrap();
    assert_eq!(prober.probe("bob", "1000").await.unwrap(), SolveStatus::Unsolved);
  }

  #[tokio::test]
  async fn non_success_status_is_probe_error() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(GET).path("/status");
        then.status(403).body(page(5));
      })
      .await;

    let prober = JudgeProber::new(server.base_url(), Pacing::none()).unwrap();
    let err = prober.probe("carol", "1000").await.unwrap_err();
    assert_eq!(err.user_id, "carol");
    assert!(matches!(err.source, UpstreamError::Status(s) if s.as_u16() == 403));
  }

  #[tokio::test(start_paused = true)]
  async fn failed_probe_still_waits_the_probe_delay() {
    let pacing = Pacing { probe: Duration::from_millis(500), page: Duration::ZERO };
    // an unparsable base url fails before any request leaves the process
    let prober = JudgeProber::new("not a url", pacing).unwrap();

    let start = tokio::time::Instant::now();
    let err = prober.probe("erin", "1000").await.unwrap_err();
    assert!(matches!(err.source, UpstreamError::Network(_)));
    assert!(start.elapsed() >= Duration::from_millis(500), "waited {:?}", start.elapsed());
  }

  struct Always(usize);
  impl AcceptedRowCounter for Always {
    fn count_accepted_rows(&self, _html: &str) -> Result<usize, UpstreamError> {
      Ok(self.0)
    }
  }

  #[tokio::test]
  async fn counter_is_swappable() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(GET).path("/status");
        then.status(200).body("not even html");
      })
      .await;

    let prober = JudgeProber::new(server.base_url(), Pacing::none()).unwrap().with_counter(Always(1));
    assert_eq!(prober.probe("dave", "1000").await.unwrap(), SolveStatus::Solved);
  }
}
