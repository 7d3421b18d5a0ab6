//! 자산 레지스트리.
//!
//! 표시 심볼로 자산 설명자를 조회하는 정적 테이블입니다.
//! 심볼 조회는 대소문자를 구분하지 않습니다 ("steth"와 "stETH"는 같은 자산).

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use std::collections::HashMap;

use crate::domain::{AssetDescriptor, ReferenceLevels, ReferencePoint};
use crate::error::{TickerError, TickerResult};
use crate::types::ProviderName;

/// 추천 자산 묶음.
pub const SUGGESTED_ASSETS: [&str; 5] = ["BNB", "SOL", "XRP", "ADA", "AVAX"];

/// 트렌딩 자산 묶음.
pub const TRENDING_ASSETS: [&str; 5] = ["BTC", "ETH", "stETH", "UNI", "CFG"];

const COINGECKO_IMAGES: &str = "https://assets.coingecko.com/coins/images";

/// 표시 심볼 → 자산 설명자 테이블.
#[derive(Debug, Clone)]
pub struct AssetRegistry {
    assets: Vec<AssetDescriptor>,
    index: HashMap<String, usize>,
}

impl AssetRegistry {
    /// 자산 목록으로 레지스트리를 생성합니다.
    ///
    /// 같은 심볼(대소문자 무시)이 두 번 나오면 `DuplicateAsset` 오류입니다.
    pub fn new(assets: Vec<AssetDescriptor>) -> TickerResult<Self> {
        let mut index = HashMap::with_capacity(assets.len());
        for (i, asset) in assets.iter().enumerate() {
            let key = normalize(&asset.display_symbol);
            if index.insert(key, i).is_some() {
                return Err(TickerError::DuplicateAsset(asset.display_symbol.clone()));
            }
        }
        Ok(Self { assets, index })
    }

    /// 기본 제공 자산 10종 레지스트리.
    pub fn builtin() -> Self {
        let assets = builtin_assets();
        let index = assets
            .iter()
            .enumerate()
            .map(|(i, a)| (normalize(&a.display_symbol), i))
            .collect();
        Self { assets, index }
    }

    /// 심볼로 자산을 조회합니다.
    pub fn resolve(&self, symbol: &str) -> TickerResult<&AssetDescriptor> {
        self.index
            .get(&normalize(symbol))
            .map(|&i| &self.assets[i])
            .ok_or_else(|| TickerError::UnknownAsset(symbol.to_string()))
    }

    /// 심볼 목록을 순서대로 조회합니다. 하나라도 모르는 심볼이면 실패합니다.
    pub fn resolve_set<S: AsRef<str>>(&self, symbols: &[S]) -> TickerResult<Vec<AssetDescriptor>> {
        symbols
            .iter()
            .map(|s| self.resolve(s.as_ref()).cloned())
            .collect()
    }

    /// 등록된 심볼인지 확인합니다.
    pub fn contains(&self, symbol: &str) -> bool {
        self.index.contains_key(&normalize(symbol))
    }

    /// 등록 순서대로 전체 자산을 반환합니다.
    pub fn list_all(&self) -> &[AssetDescriptor] {
        &self.assets
    }

    /// 등록된 자산 수.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl Default for AssetRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn normalize(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

fn icon(path: &str) -> String {
    format!("{}/{}", COINGECKO_IMAGES, path)
}

fn builtin_assets() -> Vec<AssetDescriptor> {
    let btc_reference = NaiveDate::from_ymd_opt(2024, 12, 4)
        .zip(NaiveDate::from_ymd_opt(2013, 7, 6))
        .map(|(ath_date, atl_date)| ReferenceLevels {
            all_time_high: ReferencePoint {
                price: dec!(103332),
                date: ath_date,
            },
            all_time_low: ReferencePoint {
                price: dec!(67.81),
                date: atl_date,
            },
        });

    let mut btc = AssetDescriptor::new("BTC", "bitcoin", "btc")
        .with_spot_pair("BTCUSDT")
        .with_icon_url(icon("1/thumb/btc.png"));
    if let Some(reference) = btc_reference {
        btc = btc.with_reference(reference);
    }

    vec![
        btc,
        AssetDescriptor::new("ETH", "ethereum", "eth").with_spot_pair("ETHUSDT"),
        AssetDescriptor::new("BNB", "binance-coin", "bnb")
            .with_spot_pair("BNBUSDT")
            .with_provider_id(ProviderName::CoinGecko, "binancecoin")
            .with_icon_url(icon("825/thumb/bnb-icon2_2x.png")),
        AssetDescriptor::new("SOL", "solana", "sol")
            .with_spot_pair("SOLUSDT")
            .with_icon_url(icon("4128/thumb/solana.png")),
        AssetDescriptor::new("XRP", "xrp", "xrp")
            .with_spot_pair("XRPUSDT")
            .with_provider_id(ProviderName::CoinGecko, "ripple")
            .with_icon_url(icon("44/thumb/xrp-symbol-white-128.png")),
        AssetDescriptor::new("ADA", "cardano", "ada")
            .with_spot_pair("ADAUSDT")
            .with_icon_url(icon("975/thumb/cardano.png")),
        AssetDescriptor::new("AVAX", "avalanche", "avax")
            .with_spot_pair("AVAXUSDT")
            .with_provider_id(ProviderName::CoinGecko, "avalanche-2")
            .with_icon_url(icon("12559/thumb/coin-round-red.png")),
        AssetDescriptor::new("stETH", "steth", "steth")
            .with_provider_id(ProviderName::CoinGecko, "staked-ether")
            .with_icon_url(icon("13442/thumb/steth_logo.png")),
        AssetDescriptor::new("UNI", "uniswap", "uni")
            .with_spot_pair("UNIUSDT")
            .with_icon_url(icon("12504/thumb/uniswap-uni.png")),
        AssetDescriptor::new("CFG", "centrifuge", "cfg")
            .with_icon_url(icon("15380/standard/centrifuge.PNG")),
    ]
}
