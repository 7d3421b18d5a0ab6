//! 부분 시세 정합기.
//!
//! 같은 자산에 대한 여러 제공자의 부분 시세를 고정된 우선순위와 휴리스틱
//! 규칙으로 하나의 `MarketQuote`로 합칩니다. 누락 데이터 정책은 모두 이곳에
//! 모여 있으므로, 표시 계층은 선택 필드를 분기할 필요가 없습니다.
//!
//! # 규칙
//!
//! 1. 가격: 우선순위상 처음으로 값이 있는 제공자. 없으면 `NoPriceData`
//! 2. 24시간 최저/최고: 제공자 값, 없으면 가격의 95% / 105%
//! 3. 거래대금, 시가총액: 제공자 값, 없으면 0
//! 4. 변동률: 제공자 값, 없으면 0
//! 5. 파생 비율: 두 피연산자가 모두 0이 아닐 때만 계산, 아니면 0
//! 6. 사상 최고/최저가 거리: 정적 기준값과 정합된 가격으로 계산
//! 7. 절댓값이 `MAX_QUOTE_MAGNITUDE`를 넘는 입력은 누락으로 취급
//!
//! 동점 규칙은 모든 필드에 동일합니다. 우선순위가 앞선 제공자가 이기며,
//! 이미 결정된 필드를 뒤의 제공자가 덮어쓰지 않습니다.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::asset::{AssetDescriptor, ReferencePoint};
use super::quote::{
    FieldOrigin, LocalPrice, MarketQuote, PartialQuote, QuoteField, ReferenceMark,
};
use crate::error::{TickerError, TickerResult};
use crate::types::{DecimalExt, Price, ProviderName};

/// 24시간 최저가 휴리스틱 비율.
pub const DAY_LOW_RATIO: Decimal = dec!(0.95);
/// 24시간 최고가 휴리스틱 비율.
pub const DAY_HIGH_RATIO: Decimal = dec!(1.05);
/// 주간 최저가 근사 비율.
pub const WEEK_LOW_RATIO: Decimal = dec!(0.90);
/// 주간 최고가 근사 비율.
pub const WEEK_HIGH_RATIO: Decimal = dec!(1.10);

/// 부분 시세 정합기.
///
/// 입력만으로 결과가 결정되는 순수 함수이며, 같은 입력으로 두 번 호출하면
/// 동일한 결과를 반환합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteReconciler {
    priority: Vec<ProviderName>,
}

impl Default for QuoteReconciler {
    fn default() -> Self {
        Self::new(ProviderName::all().to_vec())
    }
}

impl QuoteReconciler {
    /// 주어진 제공자 우선순위로 정합기를 생성합니다. 중복 항목은 첫 위치만 유지합니다.
    pub fn new(priority: Vec<ProviderName>) -> Self {
        let mut deduped = Vec::with_capacity(priority.len());
        for provider in priority {
            if !deduped.contains(&provider) {
                deduped.push(provider);
            }
        }
        Self { priority: deduped }
    }

    /// 제공자 우선순위.
    pub fn priority(&self) -> &[ProviderName] {
        &self.priority
    }

    /// 제공자의 우선순위 순번. 목록에 없는 제공자는 맨 뒤.
    fn rank_of(&self, provider: ProviderName) -> usize {
        self.priority
            .iter()
            .position(|p| *p == provider)
            .unwrap_or(self.priority.len())
    }

    /// 부분 시세들을 하나의 시세로 정합합니다.
    ///
    /// # Errors
    ///
    /// 어떤 부분 시세에도 가격이 없으면 `TickerError::NoPriceData`.
    pub fn reconcile(
        &self,
        asset: &AssetDescriptor,
        partials: &[PartialQuote],
    ) -> TickerResult<MarketQuote> {
        let mut ordered: Vec<&PartialQuote> = partials.iter().collect();
        // 안정 정렬: 같은 제공자끼리는 입력 순서 유지
        ordered.sort_by_key(|p| self.rank_of(p.source));

        let (price, price_source) = first_value(&ordered, |p| p.price_usd)
            .ok_or_else(|| TickerError::NoPriceData(asset.display_symbol.clone()))?;

        let low = first_value(&ordered, |p| p.low_24h)
            .map(|(v, src)| QuoteField::provided(v, src))
            .unwrap_or_else(|| fallback(price, DAY_LOW_RATIO));
        let high = first_value(&ordered, |p| p.high_24h)
            .map(|(v, src)| QuoteField::provided(v, src))
            .unwrap_or_else(|| fallback(price, DAY_HIGH_RATIO));
        let low_24h = clamp_low(low, price);
        let high_24h = clamp_high(high, price);

        let volume_24h = first_value(&ordered, |p| p.volume_24h)
            .map(|(v, src)| QuoteField::provided(v, src))
            .unwrap_or_else(|| QuoteField::fallback(Decimal::ZERO));
        let market_cap = first_value(&ordered, |p| p.market_cap)
            .map(|(v, src)| QuoteField::provided(v, src))
            .unwrap_or_else(|| QuoteField::fallback(Decimal::ZERO));

        let change_percent_24h = first_value(&ordered, |p| p.change_percent_24h)
            .map(|(v, _)| v)
            .unwrap_or(Decimal::ZERO);

        let total_market_cap = first_value(&ordered, |p| p.total_market_cap)
            .map(|(v, _)| v)
            .unwrap_or(Decimal::ZERO);

        let volume_to_market_cap = volume_24h.value.ratio_or_zero(market_cap.value);
        let market_cap_dominance = market_cap.value.percent_of_or_zero(total_market_cap);

        let market_cap_rank = ordered.iter().find_map(|p| p.market_cap_rank);

        let local_price = ordered
            .iter()
            .find_map(|p| {
                p.fx
                    .as_ref()
                    .filter(|fx| fx.rate > Decimal::ZERO && fx.rate.is_quote_sized())
            })
            .and_then(|fx| {
                price.scaled(fx.rate).map(|local| LocalPrice {
                    currency: fx.currency.clone(),
                    rate: fx.rate,
                    price: local,
                })
            });

        let (all_time_high, all_time_low) = match &asset.reference {
            Some(reference) => (
                Some(percent_below(&reference.all_time_high, price)),
                Some(percent_above(&reference.all_time_low, price)),
            ),
            None => (None, None),
        };

        let as_of = partials
            .iter()
            .map(|p| p.fetched_at)
            .max()
            .unwrap_or_default();

        Ok(MarketQuote {
            symbol: asset.display_symbol.clone(),
            price_usd: price,
            price_source,
            change_percent_24h,
            low_24h,
            high_24h,
            week_low: fallback(price, WEEK_LOW_RATIO),
            week_high: fallback(price, WEEK_HIGH_RATIO),
            volume_24h,
            market_cap,
            volume_to_market_cap,
            market_cap_dominance,
            market_cap_rank,
            all_time_high,
            all_time_low,
            local_price,
            as_of,
        })
    }
}

/// 우선순위 순으로 정렬된 부분 시세에서 처음으로 값이 있는 필드를 찾습니다.
fn first_value<F>(ordered: &[&PartialQuote], field: F) -> Option<(Decimal, ProviderName)>
where
    F: Fn(&PartialQuote) -> Option<Decimal>,
{
    ordered
        .iter()
        .find_map(|p| {
            field(p)
                .filter(|value| value.is_quote_sized())
                .map(|value| (value, p.source))
        })
}

/// 가격에 고정 비율을 곱한 휴리스틱 값. 범위를 넘으면 가격 그대로.
fn fallback(price: Price, ratio: Decimal) -> QuoteField {
    QuoteField::fallback(price.scaled(ratio).unwrap_or(price))
}

fn clamp_low(field: QuoteField, price: Price) -> QuoteField {
    match field.origin {
        FieldOrigin::Provider(src) if field.value > price => QuoteField {
            value: price,
            origin: FieldOrigin::Clamped(src),
        },
        _ => field,
    }
}

fn clamp_high(field: QuoteField, price: Price) -> QuoteField {
    match field.origin {
        FieldOrigin::Provider(src) if field.value < price => QuoteField {
            value: price,
            origin: FieldOrigin::Clamped(src),
        },
        _ => field,
    }
}

/// 사상 최고가 대비 하락폭: `(ath - price) / ath * 100`.
fn percent_below(reference: &ReferencePoint, price: Price) -> ReferenceMark {
    ReferenceMark {
        price: reference.price,
        date: reference.date,
        percent_from: (reference.price - price).percent_of_or_zero(reference.price),
    }
}

/// 사상 최저가 대비 상승폭: `(price - atl) / atl * 100`.
fn percent_above(reference: &ReferencePoint, price: Price) -> ReferenceMark {
    ReferenceMark {
        price: reference.price,
        date: reference.date,
        percent_from: (price - reference.price).percent_of_or_zero(reference.price),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::asset::ReferenceLevels;
    use crate::domain::quote::FxRate;
    use crate::registry::AssetRegistry;
    use crate::types::MAX_QUOTE_MAGNITUDE;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn btc() -> AssetDescriptor {
        AssetDescriptor::new("BTC", "bitcoin", "btc").with_spot_pair("BTCUSDT")
    }

    fn reconciler() -> QuoteReconciler {
        QuoteReconciler::new(vec![
            ProviderName::Binance,
            ProviderName::CoinGecko,
            ProviderName::CoinCap,
        ])
    }

    #[test]
    fn test_price_priority_with_fallback_range() {
        let partials = vec![
            PartialQuote::absent(ProviderName::Binance).with_price(dec!(93320)),
            PartialQuote::absent(ProviderName::CoinGecko).with_price(dec!(93000)),
        ];

        let quote = reconciler().reconcile(&btc(), &partials).unwrap();

        assert_eq!(quote.price_usd, dec!(93320));
        assert_eq!(quote.price_source, ProviderName::Binance);
        assert_eq!(quote.low_24h.value, dec!(88654));
        assert_eq!(quote.high_24h.value, dec!(97986));
        assert_eq!(quote.low_24h.origin, FieldOrigin::Fallback);
        assert_eq!(quote.high_24h.origin, FieldOrigin::Fallback);
    }

    #[test]
    fn test_priority_ignores_input_order() {
        let partials = vec![
            PartialQuote::absent(ProviderName::CoinGecko).with_price(dec!(93000)),
            PartialQuote::absent(ProviderName::Binance).with_price(dec!(93320)),
        ];

        let quote = reconciler().reconcile(&btc(), &partials).unwrap();
        assert_eq!(quote.price_usd, dec!(93320));
    }

    #[test]
    fn test_later_provider_fills_gaps_only() {
        let partials = vec![
            PartialQuote::absent(ProviderName::Binance)
                .with_price(dec!(100))
                .with_change(dec!(2.5)),
            PartialQuote::absent(ProviderName::CoinGecko)
                .with_price(dec!(99))
                .with_change(dec!(-1))
                .with_volume_and_cap(dec!(50), dec!(1000)),
        ];

        let quote = reconciler().reconcile(&btc(), &partials).unwrap();
        assert_eq!(quote.change_percent_24h, dec!(2.5));
        assert_eq!(
            quote.volume_24h,
            QuoteField::provided(dec!(50), ProviderName::CoinGecko)
        );
        assert_eq!(quote.volume_to_market_cap, dec!(0.05));
    }

    #[test]
    fn test_no_price_data() {
        let partials = vec![PartialQuote::absent(ProviderName::Binance).with_change(dec!(1))];
        let err = reconciler().reconcile(&btc(), &partials).unwrap_err();
        assert_eq!(err, TickerError::NoPriceData("BTC".to_string()));

        let xrp = AssetDescriptor::new("XRP", "xrp", "xrp");
        let err = reconciler().reconcile(&xrp, &[]).unwrap_err();
        assert_eq!(err, TickerError::NoPriceData("XRP".to_string()));
    }

    #[test]
    fn test_zero_volume_and_cap_ratio() {
        let partials = vec![PartialQuote::absent(ProviderName::CoinGecko)
            .with_price(dec!(10))
            .with_volume_and_cap(Decimal::ZERO, Decimal::ZERO)];

        let quote = reconciler().reconcile(&btc(), &partials).unwrap();
        assert_eq!(quote.volume_to_market_cap, Decimal::ZERO);
        assert_eq!(quote.market_cap_dominance, Decimal::ZERO);
    }

    #[test]
    fn test_missing_volume_defaults_to_zero() {
        let partials = vec![PartialQuote::absent(ProviderName::Binance).with_price(dec!(10))];
        let quote = reconciler().reconcile(&btc(), &partials).unwrap();

        assert_eq!(quote.volume_24h, QuoteField::fallback(Decimal::ZERO));
        assert_eq!(quote.market_cap, QuoteField::fallback(Decimal::ZERO));
        assert_eq!(quote.change_percent_24h, Decimal::ZERO);
    }

    #[test]
    fn test_provider_range_widened_to_price() {
        // 최저가가 다른 시점의 가격보다 높게 들어온 경우
        let partials = vec![
            PartialQuote::absent(ProviderName::Binance).with_price(dec!(100)),
            PartialQuote::absent(ProviderName::CoinGecko).with_range(dec!(101), dec!(99)),
        ];

        let quote = reconciler().reconcile(&btc(), &partials).unwrap();
        assert_eq!(quote.low_24h.value, dec!(100));
        assert_eq!(quote.high_24h.value, dec!(100));
        assert_eq!(
            quote.low_24h.origin,
            FieldOrigin::Clamped(ProviderName::CoinGecko)
        );
    }

    #[test]
    fn test_dominance_from_global_cap() {
        let mut global = PartialQuote::absent(ProviderName::CoinGecko);
        global.total_market_cap = Some(dec!(4000));
        let partials = vec![
            PartialQuote::absent(ProviderName::CoinCap)
                .with_price(dec!(10))
                .with_volume_and_cap(dec!(100), dec!(2000)),
            global,
        ];

        let quote = reconciler().reconcile(&btc(), &partials).unwrap();
        assert_eq!(quote.market_cap_dominance, dec!(50));
    }

    #[test]
    fn test_reference_levels_and_local_price() {
        let asset = btc().with_reference(ReferenceLevels {
            all_time_high: ReferencePoint {
                price: dec!(100000),
                date: NaiveDate::from_ymd_opt(2024, 12, 4).unwrap(),
            },
            all_time_low: ReferencePoint {
                price: dec!(50000),
                date: NaiveDate::from_ymd_opt(2013, 7, 6).unwrap(),
            },
        });
        let mut forex = PartialQuote::absent(ProviderName::Forex);
        forex.fx = Some(FxRate {
            currency: "INR".to_string(),
            rate: dec!(83),
        });
        let partials = vec![
            PartialQuote::absent(ProviderName::Binance).with_price(dec!(75000)),
            forex,
        ];

        let quote = reconciler().reconcile(&asset, &partials).unwrap();

        assert_eq!(quote.all_time_high.unwrap().percent_from, dec!(25));
        assert_eq!(quote.all_time_low.unwrap().percent_from, dec!(50));
        let local = quote.local_price.unwrap();
        assert_eq!(local.currency, "INR");
        assert_eq!(local.price, dec!(6225000));
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let at = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();
        let partials = vec![
            PartialQuote::absent_at(ProviderName::Binance, at).with_price(dec!(93320)),
            PartialQuote::absent_at(ProviderName::CoinGecko, at)
                .with_volume_and_cap(dec!(1), dec!(3)),
        ];

        let first = reconciler().reconcile(&btc(), &partials).unwrap();
        let second = reconciler().reconcile(&btc(), &partials).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.as_of, at);
    }

    #[test]
    fn test_unknown_provider_sorts_last() {
        let reconciler = QuoteReconciler::new(vec![ProviderName::CoinCap]);
        let partials = vec![
            PartialQuote::absent(ProviderName::Binance).with_price(dec!(1)),
            PartialQuote::absent(ProviderName::CoinCap).with_price(dec!(2)),
        ];

        let quote = reconciler.reconcile(&btc(), &partials).unwrap();
        assert_eq!(quote.price_usd, dec!(2));
    }

    #[test]
    fn test_oversized_values_are_absent() {
        let partials = vec![
            PartialQuote::absent(ProviderName::Binance).with_price(Decimal::MAX),
            PartialQuote::absent(ProviderName::CoinGecko)
                .with_price(dec!(93000))
                .with_volume_and_cap(Decimal::MAX, dec!(1800000000000)),
        ];

        let quote = reconciler().reconcile(&btc(), &partials).unwrap();
        assert_eq!(quote.price_usd, dec!(93000));
        assert_eq!(quote.price_source, ProviderName::CoinGecko);
        assert_eq!(quote.volume_24h, QuoteField::fallback(Decimal::ZERO));
        assert!(quote.low_24h.value <= quote.price_usd);
        assert!(quote.high_24h.value >= quote.price_usd);

        let only_garbage = vec![PartialQuote::absent(ProviderName::Binance).with_price(Decimal::MAX)];
        let err = reconciler().reconcile(&btc(), &only_garbage).unwrap_err();
        assert_eq!(err, TickerError::NoPriceData("BTC".to_string()));
    }

    #[test]
    fn test_extreme_but_bounded_values_do_not_overflow() {
        let mut forex = PartialQuote::absent(ProviderName::Forex);
        forex.fx = Some(FxRate {
            currency: "INR".to_string(),
            rate: MAX_QUOTE_MAGNITUDE,
        });
        let mut global = PartialQuote::absent(ProviderName::CoinGecko);
        global.total_market_cap = Some(Decimal::new(1, 28));
        let partials = vec![
            PartialQuote::absent(ProviderName::Binance)
                .with_price(MAX_QUOTE_MAGNITUDE)
                .with_volume_and_cap(MAX_QUOTE_MAGNITUDE, Decimal::new(1, 28)),
            global,
            forex,
        ];

        let asset = AssetRegistry::builtin().resolve("BTC").unwrap().clone();
        let quote = reconciler().reconcile(&asset, &partials).unwrap();

        assert_eq!(quote.price_usd, MAX_QUOTE_MAGNITUDE);
        assert_eq!(quote.high_24h.value, MAX_QUOTE_MAGNITUDE * DAY_HIGH_RATIO);
        assert_eq!(quote.volume_to_market_cap, Decimal::ZERO);
        assert!(quote.local_price.is_none());
        assert!(quote.all_time_low.is_some());
    }
}
