//! 자산 묶음 폴러.
//!
//! 한 자산 묶음(예: 추천 자산 5종)에 대해 주기적으로 모든 제공자를 동시에 호출하고,
//! 자산별로 정합한 결과를 `watch` 채널로 게시합니다.
//!
//! # 동시성 규칙
//!
//! - 자산 묶음당 사이클은 한 번에 하나만 진행됩니다 (`busy` 플래그).
//!   겹치는 틱이나 `refresh()` 호출은 대기열에 쌓이지 않고 생략됩니다.
//! - `stop()`은 타이머를 취소하고 세대(generation) 번호를 올립니다. 이미 진행 중인
//!   사이클의 결과는 세대가 다르므로 상태에 기록되지 않습니다.
//! - 시간은 tokio 시계를 사용하므로 테스트에서 가상 시간으로 구동할 수 있습니다.

mod state;

pub use state::*;

use chrono::Utc;
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use ticker_core::{
    AssetDescriptor, PartialQuote, PollingConfig, ProviderScope, QuoteReconciler,
    SparklineSynthesizer, SyntheticSparkline, TickerError, TrendSign,
};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

use crate::coalesce::RequestCoalescer;
use crate::traits::QuoteProvider;
use crate::{FeedResult, PollCycleError};

/// 팬아웃 호출 하나. 대상 자산 인덱스가 `None`이면 전역 제공자입니다.
type PlannedCall = (Option<usize>, Arc<dyn QuoteProvider>);

/// 자산 묶음 하나를 폴링하는 핸들. 복제하면 같은 폴러를 공유합니다.
#[derive(Clone)]
pub struct AssetSetPoller {
    inner: Arc<PollerInner>,
}

struct PollerInner {
    name: String,
    assets: Vec<AssetDescriptor>,
    providers: Vec<Arc<dyn QuoteProvider>>,
    reconciler: QuoteReconciler,
    coalescer: Arc<RequestCoalescer>,
    config: PollingConfig,
    synthesizer: Mutex<SparklineSynthesizer>,
    state: watch::Sender<PollState>,
    busy: AtomicBool,
    generation: AtomicU64,
    fanouts: AtomicU64,
    last_success: Mutex<Option<Instant>>,
    timer: Mutex<Option<CancellationToken>>,
}

/// `AssetSetPoller` 빌더.
pub struct AssetSetPollerBuilder {
    name: String,
    assets: Vec<AssetDescriptor>,
    providers: Vec<Arc<dyn QuoteProvider>>,
    config: PollingConfig,
    reconciler: QuoteReconciler,
    coalescer: Option<Arc<RequestCoalescer>>,
    synthesizer: Option<SparklineSynthesizer>,
}

impl AssetSetPollerBuilder {
    /// 폴링 설정.
    pub fn config(mut self, config: PollingConfig) -> Self {
        self.config = config;
        self
    }

    /// 정합기 (제공자 우선순위).
    pub fn reconciler(mut self, reconciler: QuoteReconciler) -> Self {
        self.reconciler = reconciler;
        self
    }

    /// 다른 폴러와 공유할 요청 병합기.
    pub fn coalescer(mut self, coalescer: Arc<RequestCoalescer>) -> Self {
        self.coalescer = Some(coalescer);
        self
    }

    /// 스파크라인 생성기. 지정하지 않으면 OS 엔트로피로 시드합니다.
    pub fn synthesizer(mut self, synthesizer: SparklineSynthesizer) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// 폴러를 생성합니다. 자산 또는 제공자가 비어 있으면 실패합니다.
    pub fn build(self) -> FeedResult<AssetSetPoller> {
        if self.assets.is_empty() {
            return Err(TickerError::InvalidInput(format!(
                "자산 묶음 '{}'에 자산이 없습니다",
                self.name
            ))
            .into());
        }
        if self.providers.is_empty() {
            return Err(TickerError::Config("등록된 제공자가 없습니다".to_string()).into());
        }

        let profile = self.config.sparkline_profile;
        let synthesizer = self
            .synthesizer
            .unwrap_or_else(|| SparklineSynthesizer::from_entropy(profile));
        let (state, _) = watch::channel(PollState::default());

        Ok(AssetSetPoller {
            inner: Arc::new(PollerInner {
                name: self.name,
                assets: self.assets,
                providers: self.providers,
                reconciler: self.reconciler,
                coalescer: self.coalescer.unwrap_or_default(),
                config: self.config,
                synthesizer: Mutex::new(synthesizer),
                state,
                busy: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                fanouts: AtomicU64::new(0),
                last_success: Mutex::new(None),
                timer: Mutex::new(None),
            }),
        })
    }
}

impl AssetSetPoller {
    /// 빌더를 생성합니다.
    pub fn builder(
        name: impl Into<String>,
        assets: Vec<AssetDescriptor>,
        providers: Vec<Arc<dyn QuoteProvider>>,
    ) -> AssetSetPollerBuilder {
        AssetSetPollerBuilder {
            name: name.into(),
            assets,
            providers,
            config: PollingConfig::default(),
            reconciler: QuoteReconciler::default(),
            coalescer: None,
            synthesizer: None,
        }
    }

    /// 자산 묶음 이름.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// 폴링 대상 자산.
    pub fn assets(&self) -> &[AssetDescriptor] {
        &self.inner.assets
    }

    /// 주기 폴링을 시작합니다. 이미 실행 중이면 아무것도 하지 않고 `false`를 반환합니다.
    ///
    /// 최소 간격보다 짧은 간격은 최소 간격으로 올립니다. 첫 사이클은 즉시 실행됩니다.
    pub fn start(&self, interval: Duration) -> bool {
        let mut timer = lock(&self.inner.timer);
        if timer.is_some() {
            debug!(asset_set = %self.inner.name, "이미 폴링 중");
            return false;
        }

        let period = self.inner.config.effective_interval(interval);
        if period > interval {
            warn!(
                asset_set = %self.inner.name,
                requested_ms = interval.as_millis() as u64,
                applied_ms = period.as_millis() as u64,
                "최소 폴링 간격 적용"
            );
        }

        let token = CancellationToken::new();
        *timer = Some(token.clone());
        drop(timer);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.run_timer(period, token).await });

        info!(
            asset_set = %self.inner.name,
            assets = self.inner.assets.len(),
            interval_secs = period.as_secs(),
            "폴링 시작"
        );
        true
    }

    /// 폴링을 중지합니다. 진행 중인 사이클의 결과는 버려집니다.
    pub fn stop(&self) {
        let token = lock(&self.inner.timer).take();
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(token) = token {
            token.cancel();
            info!(asset_set = %self.inner.name, "폴링 중지");
        }

        // 끝나지 못한 Loading 표시만 정리
        self.inner.state.send_if_modified(|state| {
            if state.status == PollStatus::Loading {
                state.status = PollStatus::Idle;
                true
            } else {
                false
            }
        });
    }

    /// 사이클을 즉시 한 번 실행합니다.
    pub async fn refresh(&self) -> CycleOutcome {
        self.inner.run_cycle().await
    }

    /// 최신 상태의 복사본. 블로킹하지 않습니다.
    pub fn snapshot(&self) -> PollState {
        self.inner.state.borrow().clone()
    }

    /// 상태 변경을 구독합니다.
    pub fn watch(&self) -> watch::Receiver<PollState> {
        self.inner.state.subscribe()
    }

    /// 타이머가 실행 중인지 확인.
    pub fn is_running(&self) -> bool {
        lock(&self.inner.timer).is_some()
    }

    /// 지금까지 수행한 팬아웃 횟수.
    pub fn fanout_count(&self) -> u64 {
        self.inner.fanouts.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for AssetSetPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetSetPoller")
            .field("name", &self.inner.name)
            .field("assets", &self.inner.assets.len())
            .field("providers", &self.inner.providers.len())
            .field("running", &self.is_running())
            .finish()
    }
}

impl PollerInner {
    async fn run_timer(self: Arc<Self>, period: Duration, token: CancellationToken) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                _ = token.cancelled() => break,
                outcome = self.run_cycle() => {
                    debug!(asset_set = %self.name, ?outcome, "예약된 사이클 종료");
                }
            }
        }

        debug!(asset_set = %self.name, "타이머 종료");
    }

    async fn run_cycle(&self) -> CycleOutcome {
        if self.is_fresh() {
            debug!(asset_set = %self.name, "신선도 구간 안, 사이클 생략");
            return CycleOutcome::Fresh;
        }
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(asset_set = %self.name, "진행 중인 사이클 있음, 생략");
            return CycleOutcome::Skipped;
        }
        let _busy = BusyGuard(&self.busy);

        let generation = self.generation.load(Ordering::SeqCst);
        self.publish(generation, |state| state.status = PollStatus::Loading);
        self.fanouts.fetch_add(1, Ordering::SeqCst);

        let started = Instant::now();
        let calls = self.plan_calls();
        let attempted = calls.len();
        let results = join_all(calls.iter().map(|call| self.fetch(call))).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(asset_set = %self.name, "중지 이후 도착한 결과 폐기");
            return CycleOutcome::Discarded;
        }

        let failed = results.iter().filter(|r| r.is_none()).count();
        if failed == attempted {
            return self.fail(generation, PollCycleError::AllProvidersFailed { attempted });
        }

        let mut globals = Vec::new();
        let mut per_asset: Vec<Vec<PartialQuote>> = vec![Vec::new(); self.assets.len()];
        for ((target, _), result) in calls.iter().zip(results) {
            let Some(partial) = result else { continue };
            match target {
                Some(index) => per_asset[*index].push(partial),
                None => globals.push(partial),
            }
        }

        let mut reconciled = Vec::with_capacity(self.assets.len());
        let mut omitted = Vec::new();
        for (asset, mut partials) in self.assets.iter().zip(per_asset) {
            partials.extend(globals.iter().cloned());
            match self.reconciler.reconcile(asset, &partials) {
                Ok(quote) => reconciled.push(quote),
                Err(e) => {
                    warn!(
                        asset_set = %self.name,
                        symbol = %asset.display_symbol,
                        error = %e,
                        "정합 실패, 이번 사이클에서 제외"
                    );
                    omitted.push(asset.display_symbol.clone());
                }
            }
        }

        if reconciled.is_empty() {
            return self.fail(generation, PollCycleError::NoQuotes { symbols: omitted });
        }

        let sparklines = self.synthesize(&reconciled);
        let count = reconciled.len();
        let now = Utc::now();
        let written = self.publish(generation, |state| {
            state.status = PollStatus::Ready;
            for quote in reconciled {
                state.quotes.insert(quote.symbol.clone(), quote);
            }
            for line in sparklines {
                state.sparklines.insert(line.symbol.clone(), line);
            }
            state.stale = omitted
                .iter()
                .filter(|symbol| state.quotes.contains_key(*symbol))
                .cloned()
                .collect();
            state.last_updated_at = Some(now);
            state.last_error = None;
        });
        if !written {
            return CycleOutcome::Discarded;
        }

        *lock(&self.last_success) = Some(Instant::now());
        info!(
            asset_set = %self.name,
            reconciled = count,
            omitted = omitted.len(),
            failed_calls = failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "사이클 완료"
        );

        CycleOutcome::Completed {
            reconciled: count,
            omitted,
        }
    }

    /// 자산별 제공자는 자산마다, 전역 제공자는 한 번만 호출합니다.
    fn plan_calls(&self) -> Vec<PlannedCall> {
        let mut calls = Vec::new();
        for provider in &self.providers {
            match provider.scope() {
                ProviderScope::Global => calls.push((None, Arc::clone(provider))),
                ProviderScope::PerAsset => {
                    for index in 0..self.assets.len() {
                        calls.push((Some(index), Arc::clone(provider)));
                    }
                }
            }
        }
        calls
    }

    /// 제공자 호출 하나. 에러와 타임아웃은 `None`으로 바뀝니다.
    async fn fetch(&self, (target, provider): &PlannedCall) -> Option<PartialQuote> {
        let asset = &self.assets[target.unwrap_or(0)];
        let span = ticker_core::quote_span!("fetch_quote", asset.display_symbol, provider.name());
        let timeout = self.config.request_timeout();

        let result = tokio::time::timeout(timeout, self.coalescer.fetch(Arc::clone(provider), asset))
            .instrument(span)
            .await;

        match result {
            Ok(Ok(partial)) => Some(partial),
            Ok(Err(e)) => {
                warn!(
                    provider = %provider.name(),
                    symbol = %asset.display_symbol,
                    retryable = e.is_retryable(),
                    error = %e,
                    "제공자 호출 실패"
                );
                None
            }
            Err(_) => {
                warn!(
                    provider = %provider.name(),
                    symbol = %asset.display_symbol,
                    timeout_ms = timeout.as_millis() as u64,
                    "제공자 호출 타임아웃"
                );
                None
            }
        }
    }

    fn fail(&self, generation: u64, error: PollCycleError) -> CycleOutcome {
        warn!(asset_set = %self.name, error = %error, "사이클 실패, 이전 시세 유지");
        let recorded = error.clone();
        let written = self.publish(generation, |state| {
            state.status = PollStatus::Error;
            state.stale = state.quotes.keys().cloned().collect();
            state.last_error = Some(recorded);
        });
        if written {
            CycleOutcome::Failed(error)
        } else {
            CycleOutcome::Discarded
        }
    }

    fn synthesize(&self, quotes: &[ticker_core::MarketQuote]) -> Vec<SyntheticSparkline> {
        let mut synthesizer = lock(&self.synthesizer);
        quotes
            .iter()
            .map(|quote| {
                synthesizer.generate_synthetic(
                    &quote.symbol,
                    TrendSign::from_change(quote.change_percent_24h),
                    self.config.sparkline_length,
                )
            })
            .collect()
    }

    fn is_fresh(&self) -> bool {
        let window = self.config.freshness_window();
        match *lock(&self.last_success) {
            Some(at) => at.elapsed() < window,
            None => false,
        }
    }

    /// 세대가 같을 때만 상태를 갱신합니다. 기록했으면 `true`.
    fn publish<F>(&self, generation: u64, update: F) -> bool
    where
        F: FnOnce(&mut PollState),
    {
        self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            update(state);
            true
        })
    }
}

/// 사이클이 끝나거나 취소되면 `busy` 플래그를 해제합니다.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
