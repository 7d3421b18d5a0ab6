//! 업스트림 시세 제공자 식별자.
//!
//! 이 모듈은 시세를 공급하는 외부 API를 구분하는 타입을 정의합니다:
//! - `ProviderName` - 제공자 이름 (Binance, CoinGecko, CoinCap, Forex)
//! - `ProviderScope` - 자산별 조회인지, 사이클당 한 번 조회하는 전역 데이터인지

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 시세 제공자 이름.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderName {
    /// 현물 거래소 (24시간 티커)
    Binance,
    /// 시세 집계 서비스 (simple price, global)
    CoinGecko,
    /// 자산 시세 API (보조 자산 목록)
    CoinCap,
    /// 환율 API
    Forex,
}

impl ProviderName {
    /// 모든 제공자를 기본 우선순위 순서로 반환합니다.
    pub fn all() -> [ProviderName; 4] {
        [
            ProviderName::Binance,
            ProviderName::CoinGecko,
            ProviderName::CoinCap,
            ProviderName::Forex,
        ]
    }

    /// 설정 키 및 로그에 사용하는 소문자 이름.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderName::Binance => "binance",
            ProviderName::CoinGecko => "coingecko",
            ProviderName::CoinCap => "coincap",
            ProviderName::Forex => "forex",
        }
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "binance" => Ok(ProviderName::Binance),
            "coingecko" => Ok(ProviderName::CoinGecko),
            "coincap" => Ok(ProviderName::CoinCap),
            "forex" => Ok(ProviderName::Forex),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// 제공자 조회 범위.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderScope {
    /// 자산마다 한 번씩 조회
    PerAsset,
    /// 자산과 무관한 데이터 (환율, 전체 시가총액) - 사이클당 한 번 조회
    Global,
}
