use crate::error::{SubsroError, SubsroResult};
use crate::types::SubsroOptions;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

const API_KEY_HEADER: &str = "x-subs-api-key";
const DEFAULT_USER_AGENT: &str = concat!("subsro/", env!("CARGO_PKG_VERSION"));

/// Field a catalog search is keyed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    ImdbId,
    TmdbId,
    Title,
}

impl SearchField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchField::ImdbId => "imdbid",
            SearchField::TmdbId => "tmdbid",
            SearchField::Title => "title",
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Movie,
    Series,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Subtitle metadata as returned by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRecord {
    pub id: u64,
    pub title: String,
    #[serde(rename = "type", default)]
    pub record_type: RecordType,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub translator: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Download allowance for the configured API key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    #[serde(default)]
    pub total_quota: u32,
    #[serde(default)]
    pub used_quota: u32,
    #[serde(default)]
    pub remaining_quota: u32,
    #[serde(default)]
    pub quota_type: Option<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<CatalogRecord>,
}

#[derive(Deserialize)]
struct DetailsResponse {
    item: CatalogRecord,
}

#[derive(Deserialize)]
struct QuotaResponse {
    quota: Quota,
}

/// Remote subtitle catalog
pub trait SubtitleCatalog {
    fn search(
        &self,
        field: SearchField,
        value: &str,
        language: Option<&str>,
    ) -> impl Future<Output = SubsroResult<Vec<CatalogRecord>>> + Send;

    fn details(&self, id: u64) -> impl Future<Output = SubsroResult<CatalogRecord>> + Send;

    fn quota(&self) -> impl Future<Output = SubsroResult<Quota>> + Send;

    /// Raw archive bytes for one subtitle; aborts when `cancel` fires
    fn download(
        &self,
        id: u64,
        cancel: &CancellationToken,
    ) -> impl Future<Output = SubsroResult<Bytes>> + Send;
}

/// HTTP client for the subs.ro API
pub struct SubsRoClient {
    client: Client,
    base_url: Url,
}

impl SubsRoClient {
    pub fn new(options: &SubsroOptions) -> SubsroResult<Self> {
        let api_key = options
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| SubsroError::Configuration {
                message: "An API key is required".to_string(),
            })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            API_KEY_HEADER,
            HeaderValue::from_str(api_key).map_err(|_| SubsroError::Configuration {
                message: "Invalid API key".to_string(),
            })?,
        );
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("application/json"),
        );

        let user_agent = options.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        headers.insert(
            reqwest::header::USER_AGENT,
            HeaderValue::from_str(user_agent).map_err(|_| SubsroError::Configuration {
                message: "Invalid user agent".to_string(),
            })?,
        );

        let mut client_builder = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(options.timeout_seconds))
            .redirect(reqwest::redirect::Policy::limited(10));

        if let Some(proxy_url) = &options.proxy {
            let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| SubsroError::Configuration {
                message: format!("Invalid proxy URL: {}", e),
            })?;
            client_builder = client_builder.proxy(proxy);
        }

        let client = client_builder
            .build()
            .map_err(|e| SubsroError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        let base_url = Url::parse(&options.base_url).map_err(|e| SubsroError::Configuration {
            message: format!("Invalid base URL {}: {}", options.base_url, e),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(SubsroError::Configuration {
                message: format!("Invalid base URL: {}", options.base_url),
            });
        }

        Ok(Self { client, base_url })
    }

    /// Append percent-encoded path segments to the base URL
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get(&self, url: Url, id: Option<u64>) -> SubsroResult<Response> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        warn!("Catalog request failed with HTTP {}", status);
        Err(map_http_error(status, id, message))
    }
}

impl SubtitleCatalog for SubsRoClient {
    async fn search(
        &self,
        field: SearchField,
        value: &str,
        language: Option<&str>,
    ) -> SubsroResult<Vec<CatalogRecord>> {
        let mut url = self.endpoint(&["search", field.as_str(), value]);
        if let Some(language) = language {
            url.query_pairs_mut().append_pair("language", language);
        }

        info!("Searching catalog by {} = {:?}", field, value);
        let response = match self.get(url, None).await {
            Ok(response) => response,
            Err(SubsroError::Api { status: 404, .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let body: SearchResponse = response.json().await?;
        debug!("Catalog returned {} records", body.items.len());
        Ok(body.items)
    }

    async fn details(&self, id: u64) -> SubsroResult<CatalogRecord> {
        let url = self.endpoint(&["subtitle", &id.to_string()]);
        let body: DetailsResponse = self.get(url, Some(id)).await?.json().await?;
        Ok(body.item)
    }

    async fn quota(&self) -> SubsroResult<Quota> {
        let url = self.endpoint(&["quota"]);
        let body: QuotaResponse = self.get(url, None).await?.json().await?;
        Ok(body.quota)
    }

    async fn download(&self, id: u64, cancel: &CancellationToken) -> SubsroResult<Bytes> {
        let url = self.endpoint(&["subtitle", &id.to_string(), "download"]);
        info!("Downloading subtitle archive {}", id);

        let request = async {
            let response = self.get(url, Some(id)).await?;
            Ok::<_, SubsroError>(response.bytes().await?)
        };

        let bytes = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SubsroError::Cancelled),
            result = request => result?,
        };

        debug!("Downloaded {} bytes for subtitle {}", bytes.len(), id);
        Ok(bytes)
    }
}

/// Map HTTP status codes to catalog errors
fn map_http_error(status: StatusCode, id: Option<u64>, message: String) -> SubsroError {
    match (status.as_u16(), id) {
        (401 | 403, _) => SubsroError::Unauthorized,
        (404, Some(id)) => SubsroError::NotFound { id },
        (429, _) => SubsroError::RateLimited,
        (code, _) => SubsroError::Api {
            status: code,
            message,
        },
    }
}
