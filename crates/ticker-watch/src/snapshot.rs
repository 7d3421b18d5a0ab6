//! 한 번의 사이클 스냅샷.

use std::time::Instant;
use ticker_feed::{AssetSet, PollState, PollingScheduler};

use crate::{CycleSummary, Result};

/// 사이클 한 번을 돌린 뒤의 상태와 요약
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// 사이클 요약
    pub summary: CycleSummary,
    /// 사이클 이후 상태
    pub state: PollState,
}

impl Snapshot {
    /// 자산 묶음을 등록하고 사이클 한 번을 실행합니다.
    pub async fn capture(scheduler: &PollingScheduler, set: &AssetSet) -> Result<Self> {
        scheduler.register(set)?;

        let started = Instant::now();
        let outcome = scheduler.refresh(&set.name).await?;
        let state = scheduler.snapshot(&set.name)?;

        let summary = CycleSummary::from_state(&set.name, &state)
            .with_outcome(&outcome)
            .with_elapsed(started.elapsed());

        Ok(Self { summary, state })
    }

    /// 상태를 보기 좋은 JSON으로 직렬화
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.state)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WatchError;
    use async_trait::async_trait;
    use std::sync::Arc;
    use ticker_core::{
        AssetDescriptor, AssetRegistry, PartialQuote, PollingConfig, Price, ProviderName,
        QuoteReconciler,
    };
    use ticker_feed::{PollStatus, ProviderResult, QuoteProvider};

    struct FixedProvider;

    #[async_trait]
    impl QuoteProvider for FixedProvider {
        fn name(&self) -> ProviderName {
            ProviderName::CoinGecko
        }

        async fn fetch_quote(&self, _asset: &AssetDescriptor) -> ProviderResult<PartialQuote> {
            Ok(PartialQuote::absent(ProviderName::CoinGecko).with_price(Price::from(42)))
        }
    }

    fn scheduler() -> PollingScheduler {
        PollingScheduler::new(
            AssetRegistry::builtin(),
            vec![Arc::new(FixedProvider)],
            QuoteReconciler::new(ProviderName::all().to_vec()),
            PollingConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_capture_and_render() {
        let set = AssetSet::from_symbols(["BTC", "ETH"]);
        let snapshot = Snapshot::capture(&scheduler(), &set).await.unwrap();

        assert_eq!(snapshot.summary.status, PollStatus::Ready);
        assert_eq!(snapshot.summary.quotes, 2);
        assert!(snapshot.summary.omitted.is_empty());

        let json = snapshot.to_json().unwrap();
        let parsed: PollState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.status, PollStatus::Ready);
        assert_eq!(parsed.quotes.len(), 2);
        assert!(json.contains("\"status\": \"ready\""));
    }

    #[tokio::test]
    async fn test_unknown_symbol_is_feed_error() {
        let set = AssetSet::from_symbols(["BTC", "NOPE"]);
        let err = Snapshot::capture(&scheduler(), &set).await.unwrap_err();

        assert!(matches!(err, WatchError::Feed(_)));
        assert!(err.to_string().contains("NOPE"));
    }
}
