//! CoinGecko 어댑터.
//!
//! - `CoinGeckoProvider`: `/api/v3/simple/price` 자산별 시세
//! - `CoinGeckoGlobalProvider`: `/api/v3/global` 전체 시가총액 (사이클당 한 번)

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use ticker_core::{AssetDescriptor, PartialQuote, ProviderName, ProviderScope, ProviderSettings};

use crate::http::{mask_secret, non_negative, positive, signed, RestClient};
use crate::traits::{ProviderResult, QuoteProvider};
use crate::FeedResult;

/// 데모 API 키 헤더.
const API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// `/api/v3/global` 응답.
#[derive(Debug, Deserialize)]
struct GlobalResponse {
    #[serde(default)]
    data: Option<GlobalData>,
}

#[derive(Debug, Deserialize)]
struct GlobalData {
    #[serde(default)]
    total_market_cap: HashMap<String, Value>,
}

/// CoinGecko 공통 연결 정보.
#[derive(Clone)]
struct CoinGeckoClient {
    client: RestClient,
    api_key: Option<String>,
}

impl fmt::Debug for CoinGeckoClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoinGeckoClient")
            .field("base_url", &self.client.base_url())
            .field("api_key", &mask_secret(self.api_key.as_deref()))
            .finish()
    }
}

impl CoinGeckoClient {
    fn new(settings: &ProviderSettings, timeout: Duration) -> FeedResult<Self> {
        Ok(Self {
            client: RestClient::new(settings.base_url.clone(), timeout)?,
            api_key: settings.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        self.api_key
            .iter()
            .map(|key| (API_KEY_HEADER, key.clone()))
            .collect()
    }
}

/// CoinGecko 단순 시세 제공자.
#[derive(Debug, Clone)]
pub struct CoinGeckoProvider {
    inner: CoinGeckoClient,
}

impl CoinGeckoProvider {
    /// 제공자 설정에서 생성.
    pub fn from_settings(settings: &ProviderSettings, timeout: Duration) -> FeedResult<Self> {
        Ok(Self {
            inner: CoinGeckoClient::new(settings, timeout)?,
        })
    }
}

#[async_trait]
impl QuoteProvider for CoinGeckoProvider {
    fn name(&self) -> ProviderName {
        ProviderName::CoinGecko
    }

    async fn fetch_quote(&self, asset: &AssetDescriptor) -> ProviderResult<PartialQuote> {
        let mut quote = PartialQuote::absent(ProviderName::CoinGecko);
        let Some(id) = asset.id_for(ProviderName::CoinGecko) else {
            return Ok(quote);
        };

        let params = [
            ("ids", id.to_string()),
            ("vs_currencies", "usd".to_string()),
            ("include_24hr_vol", "true".to_string()),
            ("include_24hr_change", "true".to_string()),
            ("include_market_cap", "true".to_string()),
            ("include_24hr_high", "true".to_string()),
            ("include_24hr_low", "true".to_string()),
        ];
        let response: HashMap<String, HashMap<String, Value>> = self
            .inner
            .client
            .get_json("/api/v3/simple/price", &params, &self.inner.headers())
            .await?;

        // 응답에 id가 없으면 모든 필드가 비어 있는 것으로 처리
        if let Some(fields) = response.get(id) {
            quote.price_usd = positive(fields.get("usd"));
            quote.change_percent_24h = signed(fields.get("usd_24h_change"));
            quote.volume_24h = non_negative(fields.get("usd_24h_vol"));
            quote.market_cap = non_negative(fields.get("usd_market_cap"));
            quote.high_24h = positive(fields.get("usd_24h_high"));
            quote.low_24h = positive(fields.get("usd_24h_low"));
        }
        Ok(quote)
    }
}

/// CoinGecko 전체 시장 통계 제공자. 시가총액 점유율 계산에 쓰입니다.
#[derive(Debug, Clone)]
pub struct CoinGeckoGlobalProvider {
    inner: CoinGeckoClient,
}

impl CoinGeckoGlobalProvider {
    /// 제공자 설정에서 생성.
    pub fn from_settings(settings: &ProviderSettings, timeout: Duration) -> FeedResult<Self> {
        Ok(Self {
            inner: CoinGeckoClient::new(settings, timeout)?,
        })
    }
}

#[async_trait]
impl QuoteProvider for CoinGeckoGlobalProvider {
    fn name(&self) -> ProviderName {
        ProviderName::CoinGecko
    }

    fn scope(&self) -> ProviderScope {
        ProviderScope::Global
    }

    async fn fetch_quote(&self, _asset: &AssetDescriptor) -> ProviderResult<PartialQuote> {
        let response: GlobalResponse = self
            .inner
            .client
            .get_json("/api/v3/global", &[], &self.inner.headers())
            .await?;

        let mut quote = PartialQuote::absent(ProviderName::CoinGecko);
        quote.total_market_cap = response
            .data
            .and_then(|data| positive(data.total_market_cap.get("usd")));
        Ok(quote)
    }
}
