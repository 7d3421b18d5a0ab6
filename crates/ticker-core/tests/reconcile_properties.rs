//! 정합기 속성 테스트
//!
//! 임의의 부분 시세 조합에 대해 정합 결과의 불변식을 확인합니다.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use ticker_core::{
    AssetRegistry, PartialQuote, ProviderName, QuoteReconciler, TickerError,
};

fn provider() -> impl Strategy<Value = ProviderName> {
    prop_oneof![
        Just(ProviderName::Binance),
        Just(ProviderName::CoinGecko),
        Just(ProviderName::CoinCap),
        Just(ProviderName::Forex),
    ]
}

/// 센트 단위 양수 가격 (0.01 ~ 200,000.00)
fn price() -> impl Strategy<Value = Decimal> {
    (1i64..20_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn partial() -> impl Strategy<Value = PartialQuote> {
    (
        provider(),
        proptest::option::of(price()),
        proptest::option::of((price(), price())),
        proptest::option::of((price(), price())),
        0i64..3_600,
    )
        .prop_map(|(source, price, range, volume_cap, offset)| {
            let at = Utc.timestamp_opt(1_700_000_000 + offset, 0).unwrap();
            let mut partial = PartialQuote::absent_at(source, at);
            partial.price_usd = price;
            if let Some((low, high)) = range {
                partial = partial.with_range(low.min(high), low.max(high));
            }
            if let Some((volume, cap)) = volume_cap {
                partial = partial.with_volume_and_cap(volume, cap);
            }
            partial
        })
}

proptest! {
    #[test]
    fn reconciled_range_contains_price(partials in prop::collection::vec(partial(), 0..6)) {
        let registry = AssetRegistry::builtin();
        let asset = registry.resolve("ETH").unwrap();
        let reconciler = QuoteReconciler::default();

        match reconciler.reconcile(asset, &partials) {
            Ok(quote) => {
                prop_assert!(quote.low_24h.value <= quote.price_usd);
                prop_assert!(quote.price_usd <= quote.high_24h.value);
                prop_assert!(quote.week_low.value <= quote.price_usd);
                prop_assert!(quote.price_usd <= quote.week_high.value);
                prop_assert!(quote.day_range_position() >= Decimal::ZERO);
                prop_assert!(quote.day_range_position() <= Decimal::from(100));
            }
            Err(err) => {
                prop_assert!(partials.iter().all(|p| p.price_usd.is_none()));
                prop_assert_eq!(err, TickerError::NoPriceData("ETH".to_string()));
            }
        }
    }

    #[test]
    fn reconcile_is_order_independent_and_idempotent(
        partials in prop::collection::vec(partial(), 1..6)
    ) {
        // 같은 제공자가 두 번 나오면 입력 순서가 동점을 가르므로 제공자당 하나만 사용
        let mut unique: Vec<PartialQuote> = Vec::new();
        for p in partials {
            if !unique.iter().any(|u| u.source == p.source) {
                unique.push(p);
            }
        }

        let registry = AssetRegistry::builtin();
        let asset = registry.resolve("SOL").unwrap();
        let reconciler = QuoteReconciler::default();

        let forward = reconciler.reconcile(asset, &unique);
        let again = reconciler.reconcile(asset, &unique);
        let mut reversed = unique.clone();
        reversed.reverse();
        let backward = reconciler.reconcile(asset, &reversed);

        prop_assert_eq!(&forward, &again);
        prop_assert_eq!(&forward, &backward);
    }

    #[test]
    fn derived_ratios_never_divide_by_zero(volume in price(), partial in partial()) {
        let registry = AssetRegistry::builtin();
        let asset = registry.resolve("ADA").unwrap();
        let mut zero_cap = partial.with_price(Decimal::ONE);
        zero_cap.volume_24h = Some(volume);
        zero_cap.market_cap = Some(Decimal::ZERO);

        let quote = QuoteReconciler::default().reconcile(asset, &[zero_cap]).unwrap();
        prop_assert_eq!(quote.volume_to_market_cap, Decimal::ZERO);
        prop_assert_eq!(quote.market_cap_dominance, Decimal::ZERO);
    }
}
