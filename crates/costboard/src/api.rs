//! Client for the pricing backend.
//!
//! Endpoints:
//! - `GET /pricing` default providers
//! - `GET /benchmark-table?sort_key=..&direction=..` comparison table
//! - `POST /calculate` cost rows for the given providers
//! - `GET /benchmarks/{model}` scores for one model

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::model::{BenchmarkEntry, BenchmarkScore, CostResult, Provider, TokenConfig};
use crate::sort::SortState;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid base url '{0}'")]
    InvalidUrl(String),
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("HTTP error! status: {0}")]
    Status(u16),
    #[error("invalid response body: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Body of `POST /calculate`.
#[derive(Debug, Serialize)]
pub struct CalculateRequest<'a> {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub custom_providers: &'a [Provider],
}

/// Operations offered by the pricing backend.
#[async_trait]
pub trait PricingApi: Send + Sync {
    async fn pricing(&self) -> Result<Vec<Provider>, ApiError>;

    async fn benchmark_table(&self, sort: &SortState) -> Result<Vec<BenchmarkEntry>, ApiError>;

    async fn calculate(
        &self,
        tokens: TokenConfig,
        providers: &[Provider],
    ) -> Result<Vec<CostResult>, ApiError>;

    async fn benchmarks(&self, model: &str) -> Result<Vec<BenchmarkScore>, ApiError>;
}

/// `reqwest`-backed client rooted at a base URL.
#[derive(Debug, Clone)]
pub struct HttpPricingApi {
    client: Client,
    base_url: Url,
}

impl HttpPricingApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base = Url::parse(base_url).map_err(|_| ApiError::InvalidUrl(base_url.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Transport)?;
        Ok(Self {
            client,
            base_url: base,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append path segments to the base URL; each segment is percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ApiError::Transport)?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        response.json::<T>().await.map_err(ApiError::Decode)
    }
}

#[async_trait]
impl PricingApi for HttpPricingApi {
    async fn pricing(&self) -> Result<Vec<Provider>, ApiError> {
        let url = self.endpoint(&["pricing"])?;
        self.get_json(url).await
    }

    async fn benchmark_table(&self, sort: &SortState) -> Result<Vec<BenchmarkEntry>, ApiError> {
        let mut url = self.endpoint(&["benchmark-table"])?;
        url.query_pairs_mut()
            .append_pair("sort_key", sort.key.as_str())
            .append_pair("direction", sort.direction.as_str());
        self.get_json(url).await
    }

    async fn calculate(
        &self,
        tokens: TokenConfig,
        providers: &[Provider],
    ) -> Result<Vec<CostResult>, ApiError> {
        let url = self.endpoint(&["calculate"])?;
        let body = CalculateRequest {
            input_tokens: tokens.input,
            output_tokens: tokens.output,
            custom_providers: providers,
        };
        tracing::debug!("POST {} ({} provider(s))", url, providers.len());
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::Transport)?;
        Self::decode(response).await
    }

    async fn benchmarks(&self, model: &str) -> Result<Vec<BenchmarkScore>, ApiError> {
        let url = self.endpoint(&["benchmarks", model])?;
        self.get_json(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::{SortDirection, SortKey};
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> HttpPricingApi {
        HttpPricingApi::new(&server.uri(), Duration::from_secs(5)).expect("client")
    }

    #[test]
    fn rejects_unusable_base_url() {
        assert!(matches!(
            HttpPricingApi::new("not a url", Duration::from_secs(1)),
            Err(ApiError::InvalidUrl(_))
        ));
        assert!(matches!(
            HttpPricingApi::new("mailto:someone@example.com", Duration::from_secs(1)),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn endpoint_joins_under_base_path() {
        let api = HttpPricingApi::new("http://localhost:8000/api/", Duration::from_secs(1))
            .expect("client");
        let url = api.endpoint(&["benchmarks", "openai/gpt-4 turbo"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/benchmarks/openai%2Fgpt-4%20turbo"
        );
    }

    #[tokio::test]
    async fn fetches_pricing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pricing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "OpenAI", "model": "openai/gpt-4", "inputCost": 5.0, "outputCost": 15.0}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let list = client(&server).pricing().await.expect("pricing");
        assert_eq!(list, vec![Provider::new("OpenAI", "openai/gpt-4", 5.0, 15.0)]);
    }

    #[tokio::test]
    async fn benchmark_table_sends_sort_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/benchmark-table"))
            .and(query_param("sort_key", "GPQA"))
            .and(query_param("direction", "asc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "m", "qualitative_metrics": []}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let sort = SortState {
            key: SortKey::Gpqa,
            direction: SortDirection::Asc,
        };
        let rows = client(&server).benchmark_table(&sort).await.expect("table");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name.as_deref(), Some("m"));
    }

    #[tokio::test]
    async fn calculate_posts_tokens_and_providers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calculate"))
            .and(body_json(json!({
                "input_tokens": 1000,
                "output_tokens": 500,
                "custom_providers": [
                    {"name": "Acme", "model": "acme/one", "inputCost": 2.0, "outputCost": 4.0}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"provider": "Acme", "model": "acme/one", "input_cost": 0.0, "output_cost": 0.0, "total_cost": 0.0}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let rows = client(&server)
            .calculate(
                TokenConfig::default(),
                &[Provider::new("Acme", "acme/one", 2.0, 4.0)],
            )
            .await
            .expect("calculate");
        assert_eq!(rows[0].provider, "Acme");
    }

    #[tokio::test]
    async fn benchmarks_encode_model_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/benchmarks/openai%2Fgpt-4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"dataset_name": "MMLU", "score": 0.86, "date_recorded": "2024-05-01"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let scores = client(&server)
            .benchmarks("openai/gpt-4")
            .await
            .expect("benchmarks");
        assert_eq!(scores[0].dataset_name, "MMLU");
        assert_eq!(scores[0].date_recorded.as_deref(), Some("2024-05-01"));
    }

    #[tokio::test]
    async fn non_success_and_bad_bodies_are_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pricing"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/benchmarks/x"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let api = client(&server);
        assert!(matches!(api.pricing().await, Err(ApiError::Status(503))));
        assert!(matches!(api.benchmarks("x").await, Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        let api = HttpPricingApi::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        assert!(matches!(api.pricing().await, Err(ApiError::Transport(_))));
    }
}
