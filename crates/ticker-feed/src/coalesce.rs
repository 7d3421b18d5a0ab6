//! 동일 요청 병합.
//!
//! 같은 (제공자, 자산) 조합의 요청이 동시에 여러 번 들어오면 HTTP 왕복은 한 번만
//! 수행하고 결과를 모든 호출자가 공유합니다. 완료된 결과는 보관하지 않으므로
//! 캐시가 아니라 in-flight 병합입니다.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use ticker_core::{AssetDescriptor, PartialQuote, ProviderName, ProviderScope};
use tracing::trace;

use crate::traits::{ProviderResult, QuoteProvider};

type SharedFetch = Shared<BoxFuture<'static, ProviderResult<PartialQuote>>>;

/// 병합 키. 전역 제공자는 자산과 무관하게 하나의 키를 사용합니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CoalesceKey {
    provider: ProviderName,
    scope: ProviderScope,
    asset: Option<String>,
}

impl CoalesceKey {
    fn new(provider: &dyn QuoteProvider, asset: &AssetDescriptor) -> Self {
        let scope = provider.scope();
        let asset = match scope {
            ProviderScope::PerAsset => Some(asset.display_symbol.clone()),
            ProviderScope::Global => None,
        };
        Self {
            provider: provider.name(),
            scope,
            asset,
        }
    }
}

/// 진행 중인 요청과 그 결과를 기다리는 호출자 수.
struct InflightEntry {
    future: SharedFetch,
    waiters: usize,
}

/// in-flight 요청 병합기.
#[derive(Default)]
pub struct RequestCoalescer {
    inflight: Mutex<HashMap<CoalesceKey, InflightEntry>>,
}

impl std::fmt::Debug for RequestCoalescer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCoalescer")
            .field("inflight", &self.inflight_count())
            .finish()
    }
}

impl RequestCoalescer {
    /// 새 병합기 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 현재 진행 중인 요청 수.
    pub fn inflight_count(&self) -> usize {
        self.lock().len()
    }

    /// 부분 시세를 조회합니다. 같은 키의 요청이 진행 중이면 그 결과를 기다립니다.
    pub async fn fetch(
        &self,
        provider: Arc<dyn QuoteProvider>,
        asset: &AssetDescriptor,
    ) -> ProviderResult<PartialQuote> {
        let key = CoalesceKey::new(provider.as_ref(), asset);

        let future = {
            let mut inflight = self.lock();
            match inflight.get_mut(&key) {
                Some(existing) => {
                    existing.waiters += 1;
                    trace!(
                        provider = %key.provider,
                        asset = ?key.asset,
                        waiters = existing.waiters,
                        "진행 중인 요청에 합류"
                    );
                    existing.future.clone()
                }
                None => {
                    let asset = asset.clone();
                    let future = async move { provider.fetch_quote(&asset).await }
                        .boxed()
                        .shared();
                    inflight.insert(
                        key.clone(),
                        InflightEntry {
                            future: future.clone(),
                            waiters: 1,
                        },
                    );
                    future
                }
            }
        };

        let mut guard = InflightGuard {
            coalescer: self,
            key,
            future: future.clone(),
            completed: false,
        };
        let result = future.await;
        guard.completed = true;
        result
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CoalesceKey, InflightEntry>> {
        self.inflight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// 요청이 끝나거나 마지막 대기자가 취소되면 항목을 제거합니다.
///
/// 대기자가 남아 있는 동안 취소된 호출자는 대기자 수만 줄입니다.
struct InflightGuard<'a> {
    coalescer: &'a RequestCoalescer,
    key: CoalesceKey,
    future: SharedFetch,
    completed: bool,
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        let mut inflight = self.coalescer.lock();
        // 그사이 새 요청으로 교체된 항목은 건드리지 않음
        let Some(entry) = inflight
            .get_mut(&self.key)
            .filter(|entry| entry.future.ptr_eq(&self.future))
        else {
            return;
        };

        entry.waiters = entry.waiters.saturating_sub(1);
        if self.completed || entry.waiters == 0 {
            inflight.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct SlowProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl QuoteProvider for SlowProvider {
        fn name(&self) -> ProviderName {
            ProviderName::CoinCap
        }

        async fn fetch_quote(&self, _asset: &AssetDescriptor) -> ProviderResult<PartialQuote> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(PartialQuote::absent(ProviderName::CoinCap).with_price(dec!(1)))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_requests_share_one_call() {
        let coalescer = RequestCoalescer::new();
        let provider = Arc::new(SlowProvider {
            calls: AtomicUsize::new(0),
        });
        let asset = AssetDescriptor::new("ADA", "cardano", "ada");

        let dyn_provider: Arc<dyn QuoteProvider> = provider.clone();
        let (a, b) = tokio::join!(
            coalescer.fetch(dyn_provider.clone(), &asset),
            coalescer.fetch(dyn_provider.clone(), &asset)
        );

        assert_eq!(a.unwrap().price_usd, Some(dec!(1)));
        assert_eq!(b.unwrap().price_usd, Some(dec!(1)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(coalescer.inflight_count(), 0);

        // 완료 후에는 새 요청이 다시 나감
        coalescer.fetch(dyn_provider, &asset).await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_assets_not_merged() {
        let coalescer = RequestCoalescer::new();
        let provider = Arc::new(SlowProvider {
            calls: AtomicUsize::new(0),
        });
        let dyn_provider: Arc<dyn QuoteProvider> = provider.clone();
        let ada = AssetDescriptor::new("ADA", "cardano", "ada");
        let sol = AssetDescriptor::new("SOL", "solana", "sol");

        let _ = tokio::join!(
            coalescer.fetch(dyn_provider.clone(), &ada),
            coalescer.fetch(dyn_provider.clone(), &sol)
        );
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_leader_clears_entry() {
        let coalescer = RequestCoalescer::new();
        let provider: Arc<dyn QuoteProvider> = Arc::new(SlowProvider {
            calls: AtomicUsize::new(0),
        });
        let asset = AssetDescriptor::new("ADA", "cardano", "ada");

        let cancelled = tokio::time::timeout(
            Duration::from_millis(100),
            coalescer.fetch(provider.clone(), &asset),
        )
        .await;
        assert!(cancelled.is_err());
        assert_eq!(coalescer.inflight_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_leader_keeps_entry_for_waiting_followers() {
        let coalescer = RequestCoalescer::new();
        let provider = Arc::new(SlowProvider {
            calls: AtomicUsize::new(0),
        });
        let dyn_provider: Arc<dyn QuoteProvider> = provider.clone();
        let asset = AssetDescriptor::new("ADA", "cardano", "ada");

        let (leader, follower, late) = tokio::join!(
            tokio::time::timeout(
                Duration::from_millis(100),
                coalescer.fetch(dyn_provider.clone(), &asset)
            ),
            coalescer.fetch(dyn_provider.clone(), &asset),
            async {
                // 선행 호출자가 취소된 뒤 도착한 호출자
                tokio::time::sleep(Duration::from_millis(200)).await;
                coalescer.fetch(dyn_provider.clone(), &asset).await
            }
        );

        assert!(leader.is_err());
        assert_eq!(follower.unwrap().price_usd, Some(dec!(1)));
        assert_eq!(late.unwrap().price_usd, Some(dec!(1)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(coalescer.inflight_count(), 0);
    }
}
