//! 여러 자산 묶음을 관리하는 폴링 스케줄러.
//!
//! 표시 계층은 `subscribe()`로 읽기 전용 상태 수신기를 받고, 마지막 구독자가
//! 해제되면 해당 자산 묶음의 폴링이 멈춥니다.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use ticker_core::{
    AppConfig, AssetRegistry, PollingConfig, QuoteReconciler, SparklineSynthesizer,
    SUGGESTED_ASSETS, TRENDING_ASSETS,
};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::coalesce::RequestCoalescer;
use crate::poller::{AssetSetPoller, CycleOutcome, PollState};
use crate::provider::build_providers;
use crate::traits::QuoteProvider;
use crate::{FeedError, FeedResult};

/// 이름이 붙은 자산 묶음.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSet {
    /// 묶음 이름 (스케줄러 안에서 유일 키)
    pub name: String,
    /// 표시 심볼 목록
    pub symbols: Vec<String>,
}

impl AssetSet {
    /// 새 자산 묶음.
    pub fn new<S: Into<String>>(name: impl Into<String>, symbols: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }

    /// 심볼 목록으로 묶음을 만듭니다. 이름은 심볼을 쉼표로 이은 값입니다.
    pub fn from_symbols<S: Into<String>>(symbols: impl IntoIterator<Item = S>) -> Self {
        let symbols: Vec<String> = symbols.into_iter().map(Into::into).collect();
        Self {
            name: symbols.join(","),
            symbols,
        }
    }

    /// 추천 자산 묶음.
    pub fn suggested() -> Self {
        Self::new("suggested", SUGGESTED_ASSETS)
    }

    /// 트렌딩 자산 묶음.
    pub fn trending() -> Self {
        Self::new("trending", TRENDING_ASSETS)
    }
}

struct SetEntry {
    poller: AssetSetPoller,
    subscribers: usize,
}

type SetMap = HashMap<String, SetEntry>;

/// 폴링 스케줄러.
pub struct PollingScheduler {
    registry: Arc<AssetRegistry>,
    providers: Vec<Arc<dyn QuoteProvider>>,
    reconciler: QuoteReconciler,
    config: PollingConfig,
    coalescer: Arc<RequestCoalescer>,
    sets: Arc<Mutex<SetMap>>,
}

impl PollingScheduler {
    /// 구성 요소로 스케줄러를 생성합니다.
    pub fn new(
        registry: AssetRegistry,
        providers: Vec<Arc<dyn QuoteProvider>>,
        reconciler: QuoteReconciler,
        config: PollingConfig,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            providers,
            reconciler,
            config,
            coalescer: Arc::new(RequestCoalescer::new()),
            sets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// 애플리케이션 설정으로 HTTP 제공자를 구성해 스케줄러를 생성합니다.
    pub fn from_config(config: &AppConfig, registry: AssetRegistry) -> FeedResult<Self> {
        let providers = build_providers(&config.providers, config.polling.request_timeout())?;
        let reconciler = QuoteReconciler::new(config.providers.priority.clone());
        Ok(Self::new(
            registry,
            providers,
            reconciler,
            config.polling.clone(),
        ))
    }

    /// 자산 레지스트리.
    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    /// 자산 묶음을 등록하고 폴러를 반환합니다. 이미 등록되어 있으면 기존 폴러를 반환합니다.
    ///
    /// 모르는 심볼이 있으면 `UnknownAsset`으로 실패합니다.
    pub fn register(&self, set: &AssetSet) -> FeedResult<AssetSetPoller> {
        let mut sets = self.lock();
        if let Some(entry) = sets.get(&set.name) {
            return Ok(entry.poller.clone());
        }

        let assets = self.registry.resolve_set(&set.symbols)?;
        let poller = AssetSetPoller::builder(set.name.clone(), assets, self.providers.clone())
            .config(self.config.clone())
            .reconciler(self.reconciler.clone())
            .coalescer(Arc::clone(&self.coalescer))
            .synthesizer(SparklineSynthesizer::from_entropy(self.config.sparkline_profile))
            .build()?;

        debug!(asset_set = %set.name, symbols = ?set.symbols, "자산 묶음 등록");
        sets.insert(
            set.name.clone(),
            SetEntry {
                poller: poller.clone(),
                subscribers: 0,
            },
        );
        Ok(poller)
    }

    /// 자산 묶음의 폴링을 시작합니다. 이미 실행 중이면 그대로 둡니다.
    pub fn start(&self, set: &AssetSet, interval: Duration) -> FeedResult<()> {
        self.register(set)?.start(interval);
        Ok(())
    }

    /// 자산 묶음의 폴링을 중지합니다.
    pub fn stop(&self, name: &str) -> FeedResult<()> {
        self.poller(name)?.stop();
        Ok(())
    }

    /// 모든 자산 묶음의 폴링을 중지합니다.
    pub fn stop_all(&self) {
        for entry in self.lock().values() {
            entry.poller.stop();
        }
    }

    /// 자산 묶음의 사이클을 즉시 한 번 실행합니다.
    pub async fn refresh(&self, name: &str) -> FeedResult<CycleOutcome> {
        let poller = self.poller(name)?;
        Ok(poller.refresh().await)
    }

    /// 자산 묶음의 최신 상태.
    pub fn snapshot(&self, name: &str) -> FeedResult<PollState> {
        Ok(self.poller(name)?.snapshot())
    }

    /// 자산 묶음을 구독합니다. 폴링 중이 아니면 기본 간격으로 시작합니다.
    pub fn subscribe(&self, set: &AssetSet) -> FeedResult<Subscription> {
        let poller = self.register(set)?;
        {
            let mut sets = self.lock();
            if let Some(entry) = sets.get_mut(&set.name) {
                entry.subscribers += 1;
            }
        }
        poller.start(self.config.interval());

        Ok(Subscription {
            name: set.name.clone(),
            receiver: poller.watch(),
            sets: Arc::clone(&self.sets),
        })
    }

    /// 등록된 자산 묶음 이름.
    pub fn asset_sets(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// 자산 묶음의 구독자 수.
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.lock().get(name).map_or(0, |entry| entry.subscribers)
    }

    fn poller(&self, name: &str) -> FeedResult<AssetSetPoller> {
        self.lock()
            .get(name)
            .map(|entry| entry.poller.clone())
            .ok_or_else(|| FeedError::UnknownAssetSet(name.to_string()))
    }

    fn lock(&self) -> MutexGuard<'_, SetMap> {
        lock_sets(&self.sets)
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        self.stop_all();
    }
}

fn lock_sets(sets: &Mutex<SetMap>) -> MutexGuard<'_, SetMap> {
    sets.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 읽기 전용 상태 구독. 드롭하거나 `unsubscribe()`하면 해제됩니다.
pub struct Subscription {
    name: String,
    receiver: watch::Receiver<PollState>,
    sets: Arc<Mutex<SetMap>>,
}

impl Subscription {
    /// 자산 묶음 이름.
    pub fn asset_set(&self) -> &str {
        &self.name
    }

    /// 현재 상태의 복사본.
    pub fn state(&self) -> PollState {
        self.receiver.borrow().clone()
    }

    /// 다음 상태 변경을 기다립니다. 폴러가 사라지면 `false`.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }

    /// 상태 수신기 복제본.
    pub fn receiver(&self) -> watch::Receiver<PollState> {
        self.receiver.clone()
    }

    /// 구독을 해제합니다.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut sets = lock_sets(&self.sets);
        if let Some(entry) = sets.get_mut(&self.name) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
            if entry.subscribers == 0 {
                entry.poller.stop();
                info!(asset_set = %self.name, "마지막 구독 해제, 폴링 중지");
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller::PollStatus;
    use crate::traits::ProviderResult;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use ticker_core::{AssetDescriptor, PartialQuote, ProviderName, TickerError};

    struct FixedPrice;

    #[async_trait]
    impl QuoteProvider for FixedPrice {
        fn name(&self) -> ProviderName {
            ProviderName::CoinCap
        }

        async fn fetch_quote(&self, _asset: &AssetDescriptor) -> ProviderResult<PartialQuote> {
            Ok(PartialQuote::absent(ProviderName::CoinCap).with_price(dec!(10)))
        }
    }

    fn scheduler() -> PollingScheduler {
        PollingScheduler::new(
            AssetRegistry::builtin(),
            vec![Arc::new(FixedPrice)],
            QuoteReconciler::default(),
            PollingConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_unsubscribe_stops_polling() {
        let scheduler = scheduler();
        let set = AssetSet::suggested();

        let first = scheduler.subscribe(&set).unwrap();
        let mut second = scheduler.subscribe(&set).unwrap();
        assert_eq!(scheduler.subscriber_count("suggested"), 2);

        assert!(second.changed().await);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(second.state().status, PollStatus::Ready);
        assert_eq!(second.state().quotes.len(), 5);

        let poller = scheduler.register(&set).unwrap();
        first.unsubscribe();
        assert!(poller.is_running());

        drop(second);
        assert_eq!(scheduler.subscriber_count("suggested"), 0);
        assert!(!poller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_and_refresh() {
        let scheduler = scheduler();
        let set = AssetSet::from_symbols(["BTC", "stETH"]);
        assert_eq!(set.name, "BTC,stETH");

        scheduler.register(&set).unwrap();
        assert_eq!(
            scheduler.snapshot("BTC,stETH").unwrap().status,
            PollStatus::Idle
        );

        let outcome = scheduler.refresh("BTC,stETH").await.unwrap();
        assert!(outcome.is_success());
        let state = scheduler.snapshot("BTC,stETH").unwrap();
        assert_eq!(state.quote("stETH").unwrap().price_usd, dec!(10));
    }

    #[tokio::test]
    async fn test_unknown_asset_rejected() {
        let scheduler = scheduler();
        let err = scheduler
            .start(&AssetSet::new("bad", ["BTC", "DOGE"]), Duration::from_secs(60))
            .unwrap_err();
        assert!(matches!(
            err,
            FeedError::Ticker(TickerError::UnknownAsset(ref s)) if s == "DOGE"
        ));
        assert!(err.is_fatal());
        assert!(scheduler.asset_sets().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_asset_set() {
        let scheduler = scheduler();
        assert!(matches!(
            scheduler.snapshot("missing"),
            Err(FeedError::UnknownAssetSet(_))
        ));
        assert!(matches!(scheduler.stop("missing"), Err(FeedError::UnknownAssetSet(_))));
    }
}
