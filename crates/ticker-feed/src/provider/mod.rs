//! QuoteProvider 구현체.
//!
//! 설정의 우선순위와 활성화 여부에 따라 제공자 목록을 구성합니다.

mod binance;
mod coincap;
mod coingecko;
mod forex;

pub use binance::BinanceProvider;
pub use coincap::CoinCapProvider;
pub use coingecko::{CoinGeckoGlobalProvider, CoinGeckoProvider};
pub use forex::ForexProvider;

use std::sync::Arc;
use std::time::Duration;
use ticker_core::{ProviderName, ProvidersConfig};
use tracing::info;

use crate::traits::QuoteProvider;
use crate::FeedResult;

/// 설정에서 활성화된 제공자를 우선순위 순서로 생성합니다.
///
/// CoinGecko가 활성화되면 자산별 시세와 전체 시장 통계 제공자가 함께 등록됩니다.
pub fn build_providers(
    config: &ProvidersConfig,
    timeout: Duration,
) -> FeedResult<Vec<Arc<dyn QuoteProvider>>> {
    let mut providers: Vec<Arc<dyn QuoteProvider>> = Vec::new();

    for name in config.enabled_in_priority() {
        let settings = config.settings(name);
        match name {
            ProviderName::Binance => {
                providers.push(Arc::new(BinanceProvider::from_settings(settings, timeout)?));
            }
            ProviderName::CoinGecko => {
                providers.push(Arc::new(CoinGeckoProvider::from_settings(settings, timeout)?));
                providers.push(Arc::new(CoinGeckoGlobalProvider::from_settings(
                    settings, timeout,
                )?));
            }
            ProviderName::CoinCap => {
                providers.push(Arc::new(CoinCapProvider::from_settings(settings, timeout)?));
            }
            ProviderName::Forex => {
                providers.push(Arc::new(ForexProvider::new(
                    settings.base_url.clone(),
                    config.local_currency.clone(),
                    timeout,
                )?));
            }
        }
        info!(provider = %name, base_url = %settings.base_url, "제공자 등록");
    }

    Ok(providers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticker_core::ProviderScope;

    #[test]
    fn test_build_providers_in_priority_order() {
        let mut config = ProvidersConfig::default();
        config.priority = vec![ProviderName::CoinCap, ProviderName::CoinGecko];

        let providers = build_providers(&config, Duration::from_secs(5)).unwrap();
        let names: Vec<_> = providers.iter().map(|p| (p.name(), p.scope())).collect();
        assert_eq!(
            names,
            vec![
                (ProviderName::CoinCap, ProviderScope::PerAsset),
                (ProviderName::CoinGecko, ProviderScope::PerAsset),
                (ProviderName::CoinGecko, ProviderScope::Global),
            ]
        );
    }

    #[test]
    fn test_disabled_provider_skipped() {
        let mut config = ProvidersConfig::default();
        config.binance.enabled = false;
        config.coingecko.enabled = false;

        let providers = build_providers(&config, Duration::from_secs(5)).unwrap();
        let names: Vec<_> = providers.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec![ProviderName::CoinCap, ProviderName::Forex]);
    }
}
