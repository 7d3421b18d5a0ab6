//! 시세 레코드 타입.
//!
//! 이 모듈은 시세 데이터 흐름의 두 단계를 정의합니다:
//! - `PartialQuote` - 제공자 한 곳의 HTTP 왕복 한 번으로 얻은 부분 시세
//! - `MarketQuote` - 여러 부분 시세를 정합한, 표시 준비가 끝난 시세

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{DecimalExt, Percentage, Price, ProviderName};

/// 기준 통화(USD) 대비 환율.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FxRate {
    /// 대상 통화 코드 (예: "INR")
    pub currency: String,
    /// 1 USD 당 대상 통화 금액
    pub rate: Decimal,
}

/// 제공자 한 곳에서 얻은 부분 시세.
///
/// 모든 수치 필드는 선택적입니다. 파싱 실패나 누락은 `None`으로 표현하며,
/// NaN이 하류로 전달되는 일은 없습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialQuote {
    /// 제공자
    pub source: ProviderName,
    /// 현재가 (USD)
    pub price_usd: Option<Price>,
    /// 24시간 변동률 (%)
    pub change_percent_24h: Option<Percentage>,
    /// 24시간 거래대금 (USD)
    pub volume_24h: Option<Decimal>,
    /// 시가총액 (USD)
    pub market_cap: Option<Decimal>,
    /// 24시간 최저가
    pub low_24h: Option<Price>,
    /// 24시간 최고가
    pub high_24h: Option<Price>,
    /// 전체 암호화폐 시가총액 (USD), 시가총액 점유율 계산용
    pub total_market_cap: Option<Decimal>,
    /// 시가총액 순위
    pub market_cap_rank: Option<u32>,
    /// 환율
    pub fx: Option<FxRate>,
    /// 조회 시각
    pub fetched_at: DateTime<Utc>,
}

impl PartialQuote {
    /// 모든 필드가 비어 있는 부분 시세를 현재 시각으로 생성합니다.
    pub fn absent(source: ProviderName) -> Self {
        Self::absent_at(source, Utc::now())
    }

    /// 모든 필드가 비어 있는 부분 시세를 주어진 시각으로 생성합니다.
    pub fn absent_at(source: ProviderName, fetched_at: DateTime<Utc>) -> Self {
        Self {
            source,
            price_usd: None,
            change_percent_24h: None,
            volume_24h: None,
            market_cap: None,
            low_24h: None,
            high_24h: None,
            total_market_cap: None,
            market_cap_rank: None,
            fx: None,
            fetched_at,
        }
    }

    /// 현재가를 설정합니다.
    pub fn with_price(mut self, price: Price) -> Self {
        self.price_usd = Some(price);
        self
    }

    /// 24시간 최저/최고가를 설정합니다.
    pub fn with_range(mut self, low: Price, high: Price) -> Self {
        self.low_24h = Some(low);
        self.high_24h = Some(high);
        self
    }

    /// 거래대금과 시가총액을 설정합니다.
    pub fn with_volume_and_cap(mut self, volume: Decimal, market_cap: Decimal) -> Self {
        self.volume_24h = Some(volume);
        self.market_cap = Some(market_cap);
        self
    }

    /// 24시간 변동률을 설정합니다.
    pub fn with_change(mut self, change_percent: Percentage) -> Self {
        self.change_percent_24h = Some(change_percent);
        self
    }

    /// 어떤 필드도 채워지지 않았는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.price_usd.is_none()
            && self.change_percent_24h.is_none()
            && self.volume_24h.is_none()
            && self.market_cap.is_none()
            && self.low_24h.is_none()
            && self.high_24h.is_none()
            && self.total_market_cap.is_none()
            && self.market_cap_rank.is_none()
            && self.fx.is_none()
    }
}

/// 정합된 필드의 출처.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "provider", rename_all = "snake_case")]
pub enum FieldOrigin {
    /// 제공자가 준 값
    Provider(ProviderName),
    /// 고정 비율 휴리스틱으로 유도한 값
    Fallback,
    /// 제공자 값을 범위 불변식에 맞게 넓힌 값
    Clamped(ProviderName),
}

impl FieldOrigin {
    /// 휴리스틱 또는 보정으로 만들어진 값인지 확인합니다.
    pub fn is_derived(&self) -> bool {
        !matches!(self, FieldOrigin::Provider(_))
    }
}

/// 출처가 기록된 정합 필드.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteField {
    /// 값
    pub value: Decimal,
    /// 출처
    pub origin: FieldOrigin,
}

impl QuoteField {
    /// 제공자 값으로 필드를 생성합니다.
    pub fn provided(value: Decimal, provider: ProviderName) -> Self {
        Self {
            value,
            origin: FieldOrigin::Provider(provider),
        }
    }

    /// 휴리스틱 값으로 필드를 생성합니다.
    pub fn fallback(value: Decimal) -> Self {
        Self {
            value,
            origin: FieldOrigin::Fallback,
        }
    }
}

/// 정적 기준가 대비 현재가 위치.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceMark {
    /// 기준 가격
    pub price: Price,
    /// 기록된 날짜
    pub date: NaiveDate,
    /// 기준가 대비 현재가 거리 (%). 최고가는 하락폭, 최저가는 상승폭
    pub percent_from: Percentage,
}

/// 현지 통화 환산 가격.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalPrice {
    /// 통화 코드
    pub currency: String,
    /// 적용 환율
    pub rate: Decimal,
    /// 환산 가격
    pub price: Decimal,
}

/// 정합된, 표시 준비가 끝난 자산 시세.
///
/// 표시 계층은 선택 필드 분기 없이 사용할 수 있도록, 수치 필드는 제공자 값
/// 또는 휴리스틱 값으로 항상 채워져 있습니다.
/// 불변식: `low_24h <= price_usd <= high_24h`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketQuote {
    /// 표시 심볼
    pub symbol: String,
    /// 현재가 (USD)
    pub price_usd: Price,
    /// 현재가를 준 제공자
    pub price_source: ProviderName,
    /// 24시간 변동률 (%)
    pub change_percent_24h: Percentage,
    /// 24시간 최저가
    pub low_24h: QuoteField,
    /// 24시간 최고가
    pub high_24h: QuoteField,
    /// 주간 최저가 (근사치)
    pub week_low: QuoteField,
    /// 주간 최고가 (근사치)
    pub week_high: QuoteField,
    /// 24시간 거래대금 (USD)
    pub volume_24h: QuoteField,
    /// 시가총액 (USD)
    pub market_cap: QuoteField,
    /// 거래대금 / 시가총액
    pub volume_to_market_cap: Decimal,
    /// 전체 시가총액 대비 점유율 (%)
    pub market_cap_dominance: Percentage,
    /// 시가총액 순위
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap_rank: Option<u32>,
    /// 사상 최고가
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_time_high: Option<ReferenceMark>,
    /// 사상 최저가
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_time_low: Option<ReferenceMark>,
    /// 현지 통화 환산 가격
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_price: Option<LocalPrice>,
    /// 입력 부분 시세 중 가장 최근 조회 시각
    pub as_of: DateTime<Utc>,
}

impl MarketQuote {
    /// 24시간 범위 막대에서 현재가의 위치를 백분율로 반환합니다 (0~100).
    ///
    /// 범위가 비어 있으면 가운데(50)를 반환합니다.
    pub fn day_range_position(&self) -> Percentage {
        let range = self.high_24h.value.checked_sub(self.low_24h.value);
        let Some(range) = range.filter(|r| *r > Decimal::ZERO) else {
            return Decimal::from(50);
        };
        let offset = self
            .price_usd
            .checked_sub(self.low_24h.value)
            .unwrap_or(Decimal::ZERO);
        let position = offset.percent_of_or_zero(range);
        position.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
    }
}
