//! Plain HTTP page source.
//!
//! Fetches the page over HTTP and parses the response. Nothing is executed, so
//! this only works for pages whose markup already contains the feed cards and
//! player, but every snapshot re-fetches the URL so server-side changes are
//! picked up between polls.

use super::RenderedPageSource;
use crate::dom::DomSnapshot;
use crate::error::RenderError;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, instrument};

const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Page source backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: reqwest::Client,
}

/// A page opened by [`HttpPageSource`].
#[derive(Debug)]
pub struct HttpPage {
    url: String,
    /// Body from `open`, served to the first snapshot instead of re-fetching.
    first_body: Mutex<Option<String>>,
}

impl HttpPage {
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl HttpPageSource {
    /// Build a source whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(DESKTOP_USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, RenderError> {
        let http_err = |source| RenderError::Http {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url).send().await.map_err(http_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await.map_err(http_err)?;
        debug!(bytes = body.len(), "Fetched page");
        Ok(body)
    }
}

impl RenderedPageSource for HttpPageSource {
    type Handle = HttpPage;

    async fn open(&self, url: &str) -> Result<HttpPage, RenderError> {
        let body = self.fetch(url).await?;
        Ok(HttpPage {
            url: url.to_string(),
            first_body: Mutex::new(Some(body)),
        })
    }

    async fn snapshot(&self, page: &HttpPage) -> Result<DomSnapshot, RenderError> {
        let cached = page
            .first_body
            .lock()
            .map(|mut slot| slot.take())
            .unwrap_or_default();
        let body = match cached {
            Some(body) => body,
            None => self.fetch(&page.url).await?,
        };
        Ok(DomSnapshot::parse(body))
    }

    async fn trigger_more(&self, _page: &HttpPage) -> Result<(), RenderError> {
        Ok(())
    }

    async fn close(&self, page: HttpPage) {
        debug!(url = %page.url, "Closed page");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_snapshots_refetch_after_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>loading</p>"))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v/1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"<video src="//cdn/v.mp4"></video>"#),
            )
            .mount(&server)
            .await;

        let source = HttpPageSource::new(Duration::from_secs(5)).unwrap();
        let url = format!("{}/v/1", server.uri());
        let page = source.open(&url).await.unwrap();
        assert_eq!(page.url(), url);

        // First snapshot reuses the body fetched by `open`.
        let first = source.snapshot(&page).await.unwrap();
        assert!(first.contains_text("loading"));
        let second = source.snapshot(&page).await.unwrap();
        assert!(second.contains_text("loading"));
        let third = source.snapshot(&page).await.unwrap();
        assert_eq!(third.elements_by_tag("video").len(), 1);

        source.close(page).await;
    }

    #[tokio::test]
    async fn test_open_fails_on_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = HttpPageSource::new(Duration::from_secs(5)).unwrap();
        let err = source
            .open(&format!("{}/gone", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Status { status: 404, .. }));
    }
}
