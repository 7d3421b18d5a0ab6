//! Binance 현물 24시간 티커 어댑터.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use ticker_core::{AssetDescriptor, PartialQuote, ProviderName, ProviderSettings};
use tracing::debug;

use crate::http::{non_negative, positive, signed, RestClient};
use crate::traits::{ProviderResult, QuoteProvider};
use crate::FeedResult;

/// `GET /api/v3/ticker/24hr` 응답.
///
/// 수치 필드는 문자열로 오지만 숫자도 허용합니다.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceTicker24h {
    #[serde(default)]
    last_price: Option<Value>,
    #[serde(default)]
    price_change_percent: Option<Value>,
    #[serde(default)]
    high_price: Option<Value>,
    #[serde(default)]
    low_price: Option<Value>,
    /// 호가 통화(USDT) 기준 거래대금
    #[serde(default)]
    quote_volume: Option<Value>,
}

/// Binance 현물 시세 제공자.
///
/// 현물 거래쌍이 없는 자산은 요청 없이 빈 부분 시세를 반환합니다.
#[derive(Debug, Clone)]
pub struct BinanceProvider {
    client: RestClient,
}

impl BinanceProvider {
    /// 기본 URL로 생성.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> FeedResult<Self> {
        Ok(Self {
            client: RestClient::new(base_url, timeout)?,
        })
    }

    /// 제공자 설정에서 생성.
    pub fn from_settings(settings: &ProviderSettings, timeout: Duration) -> FeedResult<Self> {
        Self::new(settings.base_url.clone(), timeout)
    }
}

#[async_trait]
impl QuoteProvider for BinanceProvider {
    fn name(&self) -> ProviderName {
        ProviderName::Binance
    }

    async fn fetch_quote(&self, asset: &AssetDescriptor) -> ProviderResult<PartialQuote> {
        let Some(pair) = asset.id_for(ProviderName::Binance) else {
            debug!(symbol = %asset.display_symbol, "현물 거래쌍 없음, Binance 조회 생략");
            return Ok(PartialQuote::absent(ProviderName::Binance));
        };

        let ticker: BinanceTicker24h = self
            .client
            .get_json("/api/v3/ticker/24hr", &[("symbol", pair.to_string())], &[])
            .await?;

        let mut quote = PartialQuote::absent(ProviderName::Binance);
        quote.price_usd = positive(ticker.last_price.as_ref());
        quote.change_percent_24h = signed(ticker.price_change_percent.as_ref());
        quote.high_24h = positive(ticker.high_price.as_ref());
        quote.low_24h = positive(ticker.low_price.as_ref());
        quote.volume_24h = non_negative(ticker.quote_volume.as_ref());
        Ok(quote)
    }
}
