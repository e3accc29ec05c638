//! Document fetching from local paths or HTTP(S) URLs.
//!
//! A map pass needs several documents before anything can be drawn; they are
//! fetched in parallel and joined all-or-nothing: the first failure fails the
//! whole join and nothing is rendered from a partial set.

use std::time::Instant;

use rayon::prelude::*;
use reqwest::blocking::Client;
use serde_json::Value;

use crate::domain::DataSource;
use crate::error::PipelineError;

pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new() -> Result<Self, PipelineError> {
        let client = Client::builder()
            .user_agent(concat!("dmap/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PipelineError::data_load("http client", e))?;
        Ok(Self { client })
    }

    /// Read `source` into a string.
    pub fn fetch_text(&self, source: &DataSource) -> Result<String, PipelineError> {
        let started = Instant::now();
        tracing::debug!(%source, "fetching");

        let text = match source {
            DataSource::Path(path) => std::fs::read_to_string(path)
                .map_err(|e| PipelineError::data_load(source.to_string(), e))?,
            DataSource::Url(url) => {
                let resp = self
                    .client
                    .get(url)
                    .send()
                    .map_err(|e| PipelineError::data_load(url.as_str(), format!("request failed: {e}")))?;

                if !resp.status().is_success() {
                    return Err(PipelineError::data_load(
                        url.as_str(),
                        format!("request failed with status {}", resp.status()),
                    ));
                }

                resp.text()
                    .map_err(|e| PipelineError::data_load(url.as_str(), format!("failed to read body: {e}")))?
            }
        };

        tracing::info!(
            %source,
            bytes = text.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fetched"
        );
        Ok(text)
    }

    /// Read and parse `source` as JSON.
    pub fn fetch_json(&self, source: &DataSource) -> Result<Value, PipelineError> {
        let text = self.fetch_text(source)?;
        serde_json::from_str(&text)
            .map_err(|e| PipelineError::data_load(source.to_string(), format!("invalid JSON: {e}")))
    }

    /// Fetch every source in parallel; results keep the order of `sources`.
    ///
    /// Fails with the first error encountered; no partial result is returned.
    pub fn fetch_all_text(&self, sources: &[&DataSource]) -> Result<Vec<String>, PipelineError> {
        sources.par_iter().map(|s| self.fetch_text(s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn local_files_are_read() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "[{{\"Name\": \"AL\"}}]").unwrap();
        let fetcher = Fetcher::new().unwrap();
        let v = fetcher.fetch_json(&DataSource::Path(f.path().to_path_buf())).unwrap();
        assert!(v.is_array());
    }

    #[test]
    fn join_fails_when_any_source_fails() {
        let mut ok = tempfile::NamedTempFile::new().unwrap();
        write!(ok, "[]").unwrap();
        let ok = DataSource::Path(ok.path().to_path_buf());
        let missing = DataSource::Path("/definitely/not/here.json".into());

        let fetcher = Fetcher::new().unwrap();
        let err = fetcher.fetch_all_text(&[&ok, &missing]).unwrap_err();
        match err {
            PipelineError::DataLoad { location, .. } => assert_eq!(location, "/definitely/not/here.json"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invalid_json_is_a_load_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{{not json").unwrap();
        let fetcher = Fetcher::new().unwrap();
        let err = fetcher.fetch_json(&DataSource::Path(f.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, PipelineError::DataLoad { .. }));
    }
}
