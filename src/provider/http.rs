// Copyright 2024. Felix Engl
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::config::HttpConfig;
use crate::crawl::CrawlContext;
use crate::format;
use crate::history::Timestamp;
use crate::metadata::{ContainerKind, Metadata};
use crate::provider::{LazyStream, Locator, ProviderError, StreamProvider};
use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::{
    HeaderMap, HeaderName, CONTENT_TYPE, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED, LOCATION,
};
use reqwest::{RequestBuilder, Response, StatusCode};
use std::io;
use std::sync::Mutex;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;
use url::Url;

const LAST_MODIFIED_PREFIX: &'static str = "lm:";
const ETAG_PREFIX: &'static str = "etag:";
const TIMESTAMP_PREFIX: &'static str = "ts:";

/// The validator a fingerprint was made of.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Fingerprint<'a> {
    LastModified(&'a str),
    ETag(&'a str),
    /// The time of the response, the resource counts as modified on every crawl.
    Timestamp,
}

impl<'a> Fingerprint<'a> {
    fn parse(value: &'a str) -> Self {
        if let Some(found) = value.strip_prefix(LAST_MODIFIED_PREFIX) {
            Self::LastModified(found)
        } else if let Some(found) = value.strip_prefix(ETAG_PREFIX) {
            Self::ETag(found)
        } else {
            Self::Timestamp
        }
    }

    fn of_response(headers: &HeaderMap) -> String {
        let header = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .filter(|value| !value.is_empty())
        };
        if let Some(found) = header(LAST_MODIFIED) {
            format!("{LAST_MODIFIED_PREFIX}{found}")
        } else if let Some(found) = header(ETAG) {
            format!("{ETAG_PREFIX}{found}")
        } else {
            format!("{TIMESTAMP_PREFIX}{}", Timestamp::now().as_nanos())
        }
    }

    fn make_conditional(self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Fingerprint::LastModified(value) => request.header(IF_MODIFIED_SINCE, value),
            Fingerprint::ETag(value) => request.header(IF_NONE_MATCH, value),
            Fingerprint::Timestamp => request,
        }
    }
}

/// The outcome of following the redirects of a locator.
enum Resolved {
    Fresh {
        url: Url,
        response: Response,
    },
    NotModified {
        url: Url,
        fingerprint: String,
        response: Response,
    },
}

#[derive(Debug)]
struct PrimedResponse {
    url: String,
    response: Response,
}

/// Provides web resources over http and https.
///
/// Redirects are followed by hand, so every hop can be checked for loops and
/// sent as conditional request. The response of the last fresh fetch is kept
/// and handed out by the next [StreamProvider::get_stream] for the same url.
#[derive(Debug)]
pub struct HttpProvider {
    client: reqwest::Client,
    redirect_limit: usize,
    primed: Mutex<Option<PrimedResponse>>,
}

impl HttpProvider {
    pub fn from_config(config: &HttpConfig) -> Result<Self, ProviderError> {
        let mut client = reqwest::Client::builder()
            .user_agent(config.user_agent.get_user_agent())
            .redirect(reqwest::redirect::Policy::none());
        if let Some(timeout) = config.connect_timeout {
            log::trace!("Connect timeout set: {}", timeout);
            client = client.connect_timeout(timeout.unsigned_abs());
        }
        if let Some(timeout) = config.request_timeout {
            log::trace!("Request timeout set: {}", timeout);
            client = client.timeout(timeout.unsigned_abs());
        }
        Ok(Self::with_client(client.build()?, config.redirect_limit))
    }

    /// The client must not follow redirects on its own.
    pub fn with_client(client: reqwest::Client, redirect_limit: usize) -> Self {
        Self {
            client,
            redirect_limit,
            primed: Mutex::new(None),
        }
    }

    async fn resolve(
        &self,
        locator: &Locator,
        context: &CrawlContext,
    ) -> Result<Resolved, ProviderError> {
        let mut current = locator.as_url().clone();
        current.set_fragment(None);
        let mut visited: Vec<Url> = Vec::new();
        loop {
            let stored = match context.history() {
                Some(store) => store.get_fingerprint(current.as_str())?,
                None => None,
            };
            let mut request = self.client.get(current.clone());
            if let Some(ref stored) = stored {
                request = Fingerprint::parse(stored).make_conditional(request);
            }
            let response = request.send().await?;
            let status = response.status();
            log::trace!("{current} answered with {status}");

            if status == StatusCode::NOT_MODIFIED {
                return match stored {
                    Some(fingerprint) => Ok(Resolved::NotModified {
                        url: current,
                        fingerprint,
                        response,
                    }),
                    None => Err(ProviderError::Status {
                        url: current.to_string(),
                        status,
                    }),
                };
            }

            if status.is_redirection() {
                let mut target = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| current.join(value).ok())
                    .ok_or_else(|| ProviderError::MissingLocation {
                        url: current.to_string(),
                    })?;
                target.set_fragment(None);
                visited.push(current);
                if visited.contains(&target) {
                    return Err(ProviderError::SelfRedirect {
                        url: target.to_string(),
                    });
                }
                if visited.len() > self.redirect_limit {
                    return Err(ProviderError::TooManyRedirects {
                        url: locator.to_string(),
                        limit: self.redirect_limit,
                    });
                }
                current = target;
                continue;
            }

            if !status.is_success() {
                return Err(ProviderError::Status {
                    url: current.to_string(),
                    status,
                });
            }
            return Ok(Resolved::Fresh {
                url: current,
                response,
            });
        }
    }

    fn prime(&self, url: String, response: Response) {
        if let Ok(mut primed) = self.primed.lock() {
            *primed = Some(PrimedResponse { url, response });
        }
    }

    fn clear_primed(&self) {
        if let Ok(mut primed) = self.primed.lock() {
            *primed = None;
        }
    }

    fn take_primed(&self, url: &str) -> Option<Response> {
        let mut primed = self.primed.lock().ok()?;
        match primed.take() {
            Some(found) if found.url == url => Some(found.response),
            other => {
                *primed = other;
                None
            }
        }
    }
}

fn content_type_of(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(format::essence_of)
}

fn body_reader(response: Response) -> impl AsyncRead + Send + Unpin + 'static {
    StreamReader::new(Box::pin(response.bytes_stream().map_err(io::Error::other)))
}

#[async_trait]
impl StreamProvider for HttpProvider {
    fn schemes(&self) -> &[&'static str] {
        &["http", "https"]
    }

    async fn add_first_metadata(
        &self,
        locator: &Locator,
        mut metadata: Metadata,
        context: &CrawlContext,
    ) -> Result<Metadata, ProviderError> {
        if metadata.has_first_metadata() {
            return Ok(metadata);
        }
        let (url, fingerprint, content_type, status) = match self.resolve(locator, context).await? {
            Resolved::Fresh { url, response } => {
                let fingerprint = Fingerprint::of_response(response.headers());
                let content_type = content_type_of(response.headers()).or_else(|| {
                    format::guess_from_path(url.path())
                        .map(|found| found.essence_str().to_string())
                });
                let status = response.status();
                self.prime(url.to_string(), response);
                (url, fingerprint, content_type, status)
            }
            Resolved::NotModified {
                url,
                fingerprint,
                response,
            } => {
                self.clear_primed();
                let content_type = content_type_of(response.headers());
                (url, fingerprint, content_type, response.status())
            }
        };

        let is_page = match content_type {
            Some(ref value) => format::is_html(value),
            // Unknown until the page is fetched again.
            None => status == StatusCode::NOT_MODIFIED,
        };
        if is_page {
            metadata.container = Some(ContainerKind::Links);
        }
        metadata.source.get_or_insert_with(|| locator.to_string());
        metadata.resource_name = Some(
            url.path_segments()
                .and_then(|segments| segments.filter(|value| !value.is_empty()).last())
                .or(url.host_str())
                .unwrap_or(url.as_str())
                .to_string(),
        );
        if metadata.content_type.is_none() {
            metadata.content_type = content_type;
        }
        metadata.fingerprint = Some(fingerprint);
        metadata.set_field("status", status.as_u16().to_string());
        metadata.exists_id = Some(url.to_string());
        Ok(metadata)
    }

    async fn get_stream(
        &self,
        locator: &Locator,
        metadata: &Metadata,
        _context: &CrawlContext,
    ) -> Result<LazyStream, ProviderError> {
        let url = metadata
            .exists_id
            .clone()
            .unwrap_or_else(|| locator.to_string());
        if let Some(response) = self.take_primed(&url) {
            return Ok(LazyStream::new(move || async move {
                Ok(body_reader(response))
            }));
        }
        let client = self.client.clone();
        Ok(LazyStream::new(move || async move {
            let response = client
                .get(url)
                .send()
                .await
                .and_then(Response::error_for_status)
                .map_err(io::Error::other)?;
            Ok(body_reader(response))
        }))
    }

    fn release(&self, _locator: &Locator) {
        self.clear_primed();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::history::HistoryStore;
    use axum::extract::Path;
    use axum::http::header as axum_header;
    use axum::http::{HeaderMap as AxumHeaders, StatusCode as AxumStatus};
    use axum::response::{IntoResponse, Redirect};
    use axum::routing::get;
    use axum::Router;
    use camino::Utf8PathBuf;
    use std::net::SocketAddr;
    use tokio::io::AsyncReadExt;

    const PAGE_MODIFIED: &'static str = "Wed, 21 Oct 2015 07:28:00 GMT";
    const PAGE: &'static str = "<html><body><a href=\"/other\">Other</a></body></html>";

    async fn page(headers: AxumHeaders) -> axum::response::Response {
        let since = headers
            .get(axum_header::IF_MODIFIED_SINCE)
            .and_then(|value| value.to_str().ok());
        if since == Some(PAGE_MODIFIED) {
            return AxumStatus::NOT_MODIFIED.into_response();
        }
        (
            [
                (axum_header::CONTENT_TYPE, "text/html; charset=utf-8"),
                (axum_header::LAST_MODIFIED, PAGE_MODIFIED),
            ],
            PAGE,
        )
            .into_response()
    }

    async fn tagged(headers: AxumHeaders) -> axum::response::Response {
        let tag = headers
            .get(axum_header::IF_NONE_MATCH)
            .and_then(|value| value.to_str().ok());
        if tag == Some("\"v1\"") {
            return AxumStatus::NOT_MODIFIED.into_response();
        }
        (
            [
                (axum_header::CONTENT_TYPE, "text/plain"),
                (axum_header::ETAG, "\"v1\""),
            ],
            "tagged",
        )
            .into_response()
    }

    async fn chain(Path(step): Path<u32>) -> Redirect {
        Redirect::temporary(&format!("/chain/{}", step + 1))
    }

    async fn serve() -> SocketAddr {
        let app = Router::new()
            .route("/page", get(page))
            .route("/tagged", get(tagged))
            .route("/plain", get(|| async { "plain" }))
            .route("/moved", get(|| async { Redirect::temporary("/page") }))
            .route("/loop", get(|| async { Redirect::temporary("/loop") }))
            .route("/chain/:step", get(chain))
            .route("/missing", get(|| async { AxumStatus::NOT_FOUND }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        address
    }

    fn provider() -> HttpProvider {
        HttpProvider::from_config(&HttpConfig::default()).unwrap()
    }

    fn locator(address: SocketAddr, path: &str) -> Locator {
        Locator::parse(&format!("http://{address}{path}")).unwrap()
    }

    fn context_with_history() -> (tempfile::TempDir, CrawlContext) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("history")).unwrap();
        let mut store = HistoryStore::open_at(path).unwrap();
        store.crawl_started().unwrap();
        (dir, CrawlContext::new().with_history(store))
    }

    async fn first_metadata(
        provider: &HttpProvider,
        locator: &Locator,
        context: &CrawlContext,
    ) -> Result<Metadata, ProviderError> {
        provider
            .add_first_metadata(locator, Metadata::for_locator(locator), context)
            .await
    }

    #[tokio::test]
    async fn pages_are_fingerprinted_by_last_modified() {
        let address = serve().await;
        let provider = provider();
        let context = CrawlContext::new();
        let locator = locator(address, "/page");

        let metadata = first_metadata(&provider, &locator, &context).await.unwrap();
        assert_eq!(
            Some(format!("lm:{PAGE_MODIFIED}")),
            metadata.fingerprint
        );
        assert_eq!(Some(locator.to_string()), metadata.exists_id);
        assert_eq!(Some("page"), metadata.resource_name.as_deref());
        assert_eq!(Some("text/html"), metadata.content_type.as_deref());
        assert_eq!(Some(ContainerKind::Links), metadata.container);

        let mut stream = provider
            .get_stream(&locator, &metadata, &context)
            .await
            .unwrap();
        let mut content = String::new();
        stream.read_to_string(&mut content).await.unwrap();
        assert_eq!(PAGE, content);
    }

    #[tokio::test]
    async fn not_modified_keeps_the_stored_fingerprint() {
        let address = serve().await;
        let provider = provider();
        let (_dir, context) = context_with_history();
        let locator = locator(address, "/page");
        let stored = format!("lm:{PAGE_MODIFIED}");
        context
            .history()
            .unwrap()
            .add_entity(locator.as_str(), &stored, None)
            .unwrap();

        let metadata = first_metadata(&provider, &locator, &context).await.unwrap();
        assert_eq!(Some(stored), metadata.fingerprint);
        assert_eq!(Some("304"), metadata.fields.get("status").map(String::as_str));

        let mut stream = provider
            .get_stream(&locator, &metadata, &context)
            .await
            .unwrap();
        let mut content = String::new();
        stream.read_to_string(&mut content).await.unwrap();
        assert_eq!(PAGE, content);
    }

    #[tokio::test]
    async fn etags_are_used_without_last_modified() {
        let address = serve().await;
        let provider = provider();
        let (_dir, context) = context_with_history();
        let locator = locator(address, "/tagged");

        let metadata = first_metadata(&provider, &locator, &context).await.unwrap();
        let fingerprint = metadata.fingerprint.clone().unwrap();
        assert_eq!("etag:\"v1\"", fingerprint);
        assert!(!metadata.is_container());
        context
            .history()
            .unwrap()
            .add_entity(locator.as_str(), &fingerprint, None)
            .unwrap();

        let again = first_metadata(&provider, &locator, &context).await.unwrap();
        assert_eq!(Some(fingerprint), again.fingerprint);
    }

    #[tokio::test]
    async fn resources_without_validators_change_every_time() {
        let address = serve().await;
        let provider = provider();
        let context = CrawlContext::new();
        let locator = locator(address, "/plain");
        let first = first_metadata(&provider, &locator, &context).await.unwrap();
        let second = first_metadata(&provider, &locator, &context).await.unwrap();
        assert!(first.fingerprint.as_deref().unwrap().starts_with("ts:"));
        assert_ne!(first.fingerprint, second.fingerprint);
    }

    #[tokio::test]
    async fn redirects_end_at_the_final_url() {
        let address = serve().await;
        let provider = provider();
        let context = CrawlContext::new();
        let metadata = first_metadata(&provider, &locator(address, "/moved"), &context)
            .await
            .unwrap();
        assert_eq!(
            Some(locator(address, "/page").to_string()),
            metadata.exists_id
        );
        assert_eq!(
            Some(locator(address, "/moved").to_string()),
            metadata.source
        );
    }

    #[tokio::test]
    async fn self_redirects_fail() {
        let address = serve().await;
        let result =
            first_metadata(&provider(), &locator(address, "/loop"), &CrawlContext::new()).await;
        assert!(matches!(result, Err(ProviderError::SelfRedirect { .. })));
    }

    #[tokio::test]
    async fn endless_redirects_fail_at_the_limit() {
        let address = serve().await;
        let result =
            first_metadata(&provider(), &locator(address, "/chain/0"), &CrawlContext::new()).await;
        assert!(matches!(
            result,
            Err(ProviderError::TooManyRedirects { limit: 5, .. })
        ));
    }

    #[tokio::test]
    async fn error_status_fails() {
        let address = serve().await;
        let result =
            first_metadata(&provider(), &locator(address, "/missing"), &CrawlContext::new()).await;
        assert!(matches!(
            result,
            Err(ProviderError::Status { status, .. }) if status == StatusCode::NOT_FOUND
        ));
    }

    #[tokio::test]
    async fn unread_responses_are_released() {
        let address = serve().await;
        let provider = provider();
        let (_dir, context) = context_with_history();
        let plain = locator(address, "/plain");
        let locator = locator(address, "/page");

        first_metadata(&provider, &locator, &context).await.unwrap();
        assert!(provider.primed.lock().unwrap().is_some());
        provider.release(&locator);
        assert!(provider.primed.lock().unwrap().is_none());

        first_metadata(&provider, &plain, &context).await.unwrap();
        assert!(provider.primed.lock().unwrap().is_some());
        context
            .history()
            .unwrap()
            .add_entity(locator.as_str(), &format!("lm:{PAGE_MODIFIED}"), None)
            .unwrap();
        let metadata = first_metadata(&provider, &locator, &context).await.unwrap();
        assert_eq!(Some("304"), metadata.fields.get("status").map(String::as_str));
        assert!(provider.primed.lock().unwrap().is_none());
    }

    #[test]
    fn fingerprints_select_the_conditional_header() {
        assert_eq!(
            Fingerprint::LastModified("x"),
            Fingerprint::parse("lm:x")
        );
        assert_eq!(Fingerprint::ETag("\"1\""), Fingerprint::parse("etag:\"1\""));
        assert_eq!(Fingerprint::Timestamp, Fingerprint::parse("ts:1"));
        assert_eq!(Fingerprint::Timestamp, Fingerprint::parse(""));
    }
}
