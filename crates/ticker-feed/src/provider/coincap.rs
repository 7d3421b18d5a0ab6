//! CoinCap 자산 시세 어댑터.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use ticker_core::{AssetDescriptor, PartialQuote, ProviderName, ProviderSettings};

use crate::http::{mask_secret, non_negative, positive, rank, signed, RestClient};
use crate::traits::{ProviderResult, QuoteProvider};
use crate::FeedResult;

/// `GET /v2/assets/{id}` 응답.
#[derive(Debug, Deserialize)]
struct AssetResponse {
    #[serde(default)]
    data: Option<AssetData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetData {
    #[serde(default)]
    rank: Option<Value>,
    #[serde(default)]
    price_usd: Option<Value>,
    #[serde(default)]
    change_percent24_hr: Option<Value>,
    #[serde(default)]
    volume_usd24_hr: Option<Value>,
    #[serde(default)]
    market_cap_usd: Option<Value>,
}

/// CoinCap 시세 제공자.
#[derive(Clone)]
pub struct CoinCapProvider {
    client: RestClient,
    api_key: Option<String>,
}

impl fmt::Debug for CoinCapProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoinCapProvider")
            .field("base_url", &self.client.base_url())
            .field("api_key", &mask_secret(self.api_key.as_deref()))
            .finish()
    }
}

impl CoinCapProvider {
    /// 제공자 설정에서 생성.
    pub fn from_settings(settings: &ProviderSettings, timeout: Duration) -> FeedResult<Self> {
        Ok(Self {
            client: RestClient::new(settings.base_url.clone(), timeout)?,
            api_key: settings.api_key.clone().filter(|k| !k.is_empty()),
        })
    }
}

#[async_trait]
impl QuoteProvider for CoinCapProvider {
    fn name(&self) -> ProviderName {
        ProviderName::CoinCap
    }

    async fn fetch_quote(&self, asset: &AssetDescriptor) -> ProviderResult<PartialQuote> {
        let mut quote = PartialQuote::absent(ProviderName::CoinCap);
        let Some(id) = asset.id_for(ProviderName::CoinCap) else {
            return Ok(quote);
        };

        let headers: Vec<(&str, String)> = self
            .api_key
            .iter()
            .map(|key| ("Authorization", format!("Bearer {}", key)))
            .collect();
        let endpoint = format!("/v2/assets/{}", id);
        let response: AssetResponse = self.client.get_json(&endpoint, &[], &headers).await?;

        if let Some(data) = response.data {
            quote.price_usd = positive(data.price_usd.as_ref());
            quote.change_percent_24h = signed(data.change_percent24_hr.as_ref());
            quote.volume_24h = non_negative(data.volume_usd24_hr.as_ref());
            quote.market_cap = non_negative(data.market_cap_usd.as_ref());
            quote.market_cap_rank = rank(data.rank.as_ref());
        }
        Ok(quote)
    }
}
