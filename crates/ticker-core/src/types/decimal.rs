//! 정밀한 시세 계산을 위한 Decimal 유틸리티.
//!
//! 가격과 비율은 모두 `Decimal`로 다루며, 0으로 나누는 연산은 이 모듈의
//! 헬퍼를 통해서만 수행합니다.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// 시세 정밀도를 위한 가격 타입 (USD).
pub type Price = Decimal;

/// 퍼센트 타입 (1 = 1%).
pub type Percentage = Decimal;

/// 시세 값으로 받아들이는 최대 절댓값 (1e18).
///
/// 전체 암호화폐 시가총액보다 몇 자릿수 큰 값입니다. 이보다 큰 값은 잘못된
/// 응답으로 보고 누락 처리하므로, 정합 단계의 곱셈이 넘치지 않습니다.
pub const MAX_QUOTE_MAGNITUDE: Decimal = dec!(1000000000000000000);

/// Decimal 연산을 위한 확장 트레이트.
pub trait DecimalExt {
    /// 두 값이 모두 0이 아닐 때만 `self / denominator`를 계산하고, 아니면 0을 반환합니다.
    /// 결과가 표현 범위를 넘어도 0입니다.
    fn ratio_or_zero(&self, denominator: Decimal) -> Decimal;

    /// `self / denominator * 100`. 0 분모나 범위 초과는 0.
    fn percent_of_or_zero(&self, denominator: Decimal) -> Decimal;

    /// `self * factor`. 범위를 넘으면 `None`.
    fn scaled(&self, factor: Decimal) -> Option<Decimal>;

    /// 시세 값으로 쓸 수 있는 크기인지 확인합니다.
    fn is_quote_sized(&self) -> bool;
}

impl DecimalExt for Decimal {
    fn ratio_or_zero(&self, denominator: Decimal) -> Decimal {
        if self.is_zero() || denominator.is_zero() {
            return Decimal::ZERO;
        }
        self.checked_div(denominator).unwrap_or(Decimal::ZERO)
    }

    fn percent_of_or_zero(&self, denominator: Decimal) -> Decimal {
        self.ratio_or_zero(denominator)
            .checked_mul(Decimal::ONE_HUNDRED)
            .unwrap_or(Decimal::ZERO)
    }

    fn scaled(&self, factor: Decimal) -> Option<Decimal> {
        self.checked_mul(factor)
    }

    fn is_quote_sized(&self) -> bool {
        self.abs() <= MAX_QUOTE_MAGNITUDE
    }
}

/// f64 값을 Decimal로 변환합니다. NaN/무한대는 `None`.
pub fn decimal_from_f64(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_f64(value)
}

/// 문자열 값을 Decimal로 변환합니다. 지수 표기("1.5e3")도 허용합니다.
pub fn decimal_from_str(value: &str) -> Option<Decimal> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_scientific(trimmed).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_or_zero() {
        assert_eq!(dec!(50).ratio_or_zero(dec!(200)), dec!(0.25));
        assert_eq!(dec!(0).ratio_or_zero(dec!(0)), Decimal::ZERO);
        assert_eq!(dec!(10).ratio_or_zero(Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_decimal_parsing() {
        assert_eq!(decimal_from_str("93320.01"), Some(dec!(93320.01)));
        assert_eq!(decimal_from_str(" 2.5 "), Some(dec!(2.5)));
        assert_eq!(decimal_from_str("1.5e3"), Some(dec!(1500)));
        assert_eq!(decimal_from_str("n/a"), None);
        assert_eq!(decimal_from_str(""), None);
        assert_eq!(decimal_from_f64(f64::NAN), None);
        assert_eq!(decimal_from_f64(f64::INFINITY), None);
        assert_eq!(decimal_from_f64(0.5), Some(dec!(0.5)));
    }

    #[test]
    fn test_overflow_is_not_a_panic() {
        assert_eq!(MAX_QUOTE_MAGNITUDE, Decimal::from(10u64.pow(18)));
        assert!(MAX_QUOTE_MAGNITUDE.is_quote_sized());
        assert!(!Decimal::MAX.is_quote_sized());
        assert!(!Decimal::MIN.is_quote_sized());

        assert_eq!(Decimal::MAX.scaled(dec!(1.1)), None);
        assert_eq!(dec!(10).scaled(dec!(1.1)), Some(dec!(11)));
        assert_eq!(Decimal::MAX.percent_of_or_zero(dec!(0.5)), Decimal::ZERO);
        assert_eq!(dec!(1).percent_of_or_zero(dec!(4)), dec!(25));
    }
}
