//! 자산 설명자.
//!
//! 표시 심볼(예: "BTC")을 각 업스트림 제공자에 질의할 때 필요한 식별자와
//! 아이콘 정보로 매핑합니다. 로직은 없고 정적으로 구성되는 값입니다.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{Price, ProviderName};

/// 아이콘 URL이 지정되지 않은 자산에 사용하는 CDN.
const ICON_CDN_BASE: &str = "https://cdn.jsdelivr.net/gh/atomiclabs/cryptocurrency-icons/128/color";

/// 정적 기준 가격 (조회하지 않는 상수).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencePoint {
    /// 기준 가격 (USD)
    pub price: Price,
    /// 기록된 날짜
    pub date: NaiveDate,
}

/// 사상 최고가/최저가 기준값.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceLevels {
    /// 사상 최고가
    pub all_time_high: ReferencePoint,
    /// 사상 최저가
    pub all_time_low: ReferencePoint,
}

/// 자산 설명자.
///
/// `display_symbol`이 유일 키입니다. `provider_id`는 집계 서비스(CoinCap 기준)
/// 식별자이며, 제공자마다 식별자가 다르면 `provider_ids`로 덮어씁니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    /// 표시 심볼 (예: "BTC", "stETH")
    pub display_symbol: String,
    /// 기본 제공자 식별자 (예: "bitcoin")
    pub provider_id: String,
    /// 아이콘 식별자 (예: "btc")
    pub icon_id: String,
    /// 현물 거래소 거래쌍 (예: "BTCUSDT"). 상장되지 않은 자산은 `None`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spot_pair: Option<String>,
    /// 제공자별 식별자 재정의
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub provider_ids: BTreeMap<ProviderName, String>,
    /// 명시적 아이콘 URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    /// 사상 최고가/최저가 기준값
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<ReferenceLevels>,
}

impl AssetDescriptor {
    /// 새 자산 설명자를 생성합니다.
    pub fn new(
        display_symbol: impl Into<String>,
        provider_id: impl Into<String>,
        icon_id: impl Into<String>,
    ) -> Self {
        Self {
            display_symbol: display_symbol.into(),
            provider_id: provider_id.into(),
            icon_id: icon_id.into(),
            spot_pair: None,
            provider_ids: BTreeMap::new(),
            icon_url: None,
            reference: None,
        }
    }

    /// 현물 거래쌍을 설정합니다.
    pub fn with_spot_pair(mut self, pair: impl Into<String>) -> Self {
        self.spot_pair = Some(pair.into().to_uppercase());
        self
    }

    /// 특정 제공자에서 사용할 식별자를 설정합니다.
    pub fn with_provider_id(mut self, provider: ProviderName, id: impl Into<String>) -> Self {
        self.provider_ids.insert(provider, id.into());
        self
    }

    /// 아이콘 URL을 설정합니다.
    pub fn with_icon_url(mut self, url: impl Into<String>) -> Self {
        self.icon_url = Some(url.into());
        self
    }

    /// 사상 최고가/최저가 기준값을 설정합니다.
    pub fn with_reference(mut self, reference: ReferenceLevels) -> Self {
        self.reference = Some(reference);
        self
    }

    /// 제공자에 질의할 식별자를 반환합니다.
    ///
    /// 현물 거래소는 거래쌍을 사용하며, 거래쌍이 없으면 `None`입니다.
    /// 환율 제공자는 자산과 무관하므로 항상 `None`입니다.
    pub fn id_for(&self, provider: ProviderName) -> Option<&str> {
        if let Some(id) = self.provider_ids.get(&provider) {
            return Some(id.as_str());
        }
        match provider {
            ProviderName::Binance => self.spot_pair.as_deref(),
            ProviderName::Forex => None,
            ProviderName::CoinGecko | ProviderName::CoinCap => Some(self.provider_id.as_str()),
        }
    }

    /// 표시용 아이콘 URL. 지정되지 않았으면 `icon_id` 기반 CDN 경로를 사용합니다.
    pub fn icon_url(&self) -> String {
        match &self.icon_url {
            Some(url) => url.clone(),
            None => format!("{}/{}.png", ICON_CDN_BASE, self.icon_id.to_lowercase()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_for_provider() {
        let bnb = AssetDescriptor::new("BNB", "binance-coin", "bnb")
            .with_spot_pair("bnbusdt")
            .with_provider_id(ProviderName::CoinGecko, "binancecoin");

        assert_eq!(bnb.id_for(ProviderName::Binance), Some("BNBUSDT"));
        assert_eq!(bnb.id_for(ProviderName::CoinGecko), Some("binancecoin"));
        assert_eq!(bnb.id_for(ProviderName::CoinCap), Some("binance-coin"));
        assert_eq!(bnb.id_for(ProviderName::Forex), None);
    }

    #[test]
    fn test_unlisted_spot_pair() {
        let cfg = AssetDescriptor::new("CFG", "centrifuge", "cfg");
        assert_eq!(cfg.id_for(ProviderName::Binance), None);
    }

    #[test]
    fn test_icon_url_fallback() {
        let ada = AssetDescriptor::new("ADA", "cardano", "ADA");
        assert_eq!(
            ada.icon_url(),
            "https://cdn.jsdelivr.net/gh/atomiclabs/cryptocurrency-icons/128/color/ada.png"
        );

        let sol = ada.clone().with_icon_url("https://example.com/sol.png");
        assert_eq!(sol.icon_url(), "https://example.com/sol.png");
    }
}
