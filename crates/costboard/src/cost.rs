//! Cost requestor: turns a selection and token counts into cost rows.
//!
//! Costs are always computed by the backend. An empty selection short-cuts to
//! an empty result without a request; any failure also leaves the result empty.

use crate::api::{ApiError, PricingApi};
use crate::model::{CostResult, Provider, TokenConfig};

#[derive(Debug, Default)]
pub struct CostRequestor {
    results: Vec<CostResult>,
}

impl CostRequestor {
    pub fn results(&self) -> &[CostResult] {
        &self.results
    }

    pub fn clear(&mut self) {
        self.results.clear();
    }

    /// Request costs for `selected` and store them as the current result.
    ///
    /// On error the result is cleared and the error handed back; the caller
    /// decides whether to retry.
    pub async fn calculate(
        &mut self,
        api: &dyn PricingApi,
        tokens: TokenConfig,
        selected: &[Provider],
    ) -> Result<&[CostResult], ApiError> {
        if selected.is_empty() {
            self.results.clear();
            return Ok(&self.results);
        }
        match api.calculate(tokens, selected).await {
            Ok(rows) => {
                tracing::debug!("calculation returned {} row(s)", rows.len());
                self.results = rows;
                Ok(&self.results)
            }
            Err(e) => {
                tracing::warn!("error during calculation: {}", e);
                self.results.clear();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::HttpPricingApi;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rows() -> serde_json::Value {
        json!([
            {"provider": "A", "model": "a/1", "input_cost": 0.01, "output_cost": 0.02, "total_cost": 0.04},
            {"provider": "B", "model": "b/1", "input_cost": 0.5, "output_cost": 0.5, "total_cost": 1.0}
        ])
    }

    #[tokio::test]
    async fn empty_selection_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calculate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows()))
            .expect(0)
            .mount(&server)
            .await;
        let api = HttpPricingApi::new(&server.uri(), Duration::from_secs(5)).unwrap();

        let mut costs = CostRequestor::default();
        let out = costs
            .calculate(&api, TokenConfig::default(), &[])
            .await
            .expect("no error");
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn total_is_taken_as_returned() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calculate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows()))
            .expect(2)
            .mount(&server)
            .await;
        let api = HttpPricingApi::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let selected = vec![Provider::new("A", "a/1", 10.0, 40.0)];

        let mut costs = CostRequestor::default();
        let first = costs
            .calculate(&api, TokenConfig::default(), &selected)
            .await
            .unwrap()
            .to_vec();
        // 0.01 + 0.02 != 0.04; the service's figure wins.
        assert_eq!(first[0].total_cost, 0.04);

        let second = costs
            .calculate(&api, TokenConfig::default(), &selected)
            .await
            .unwrap()
            .to_vec();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn failure_clears_previous_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calculate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows()))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/calculate"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let api = HttpPricingApi::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let selected = vec![Provider::new("A", "a/1", 1.0, 1.0)];

        let mut costs = CostRequestor::default();
        assert!(costs.calculate(&api, TokenConfig::default(), &selected).await.is_ok());
        assert_eq!(costs.results().len(), 2);

        let err = costs
            .calculate(&api, TokenConfig::default(), &selected)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Status(500)));
        assert!(costs.results().is_empty());
    }
}
