//! USD 기준 환율 어댑터.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use ticker_core::{AssetDescriptor, FxRate, PartialQuote, ProviderName, ProviderScope};

use crate::http::{positive, RestClient};
use crate::traits::{ProviderResult, QuoteProvider};
use crate::{FeedResult, ProviderError};

/// `GET /v6/latest/USD` 응답.
#[derive(Debug, Deserialize)]
struct LatestRates {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    rates: HashMap<String, Value>,
}

/// 환율 제공자. 사이클당 한 번 조회되며 모든 자산에 같은 환율이 적용됩니다.
#[derive(Debug, Clone)]
pub struct ForexProvider {
    client: RestClient,
    currency: String,
}

impl ForexProvider {
    /// 기본 URL과 대상 통화로 생성.
    pub fn new(
        base_url: impl Into<String>,
        currency: impl Into<String>,
        timeout: Duration,
    ) -> FeedResult<Self> {
        Ok(Self {
            client: RestClient::new(base_url, timeout)?,
            currency: currency.into().to_uppercase(),
        })
    }

    /// 대상 통화.
    pub fn currency(&self) -> &str {
        &self.currency
    }
}

#[async_trait]
impl QuoteProvider for ForexProvider {
    fn name(&self) -> ProviderName {
        ProviderName::Forex
    }

    fn scope(&self) -> ProviderScope {
        ProviderScope::Global
    }

    async fn fetch_quote(&self, _asset: &AssetDescriptor) -> ProviderResult<PartialQuote> {
        let response: LatestRates = self.client.get_json("/v6/latest/USD", &[], &[]).await?;

        if let Some(result) = response.result.as_deref() {
            if result != "success" {
                return Err(ProviderError::Parse(format!("환율 응답 실패: {}", result)));
            }
        }

        let mut quote = PartialQuote::absent(ProviderName::Forex);
        quote.fx = positive(response.rates.get(&self.currency)).map(|rate| FxRate {
            currency: self.currency.clone(),
            rate,
        });
        Ok(quote)
    }
}
