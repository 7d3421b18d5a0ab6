//! 시세 제공자 연결과 폴링.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - QuoteProvider trait: 통합 시세 제공자 인터페이스
//! - Binance, CoinGecko, CoinCap, 환율 REST 어댑터
//! - 동일 요청 병합 (RequestCoalescer)
//! - 자산 묶음 폴러와 폴링 스케줄러

pub mod coalesce;
pub mod error;
pub mod http;
pub mod poller;
pub mod provider;
pub mod scheduler;
pub mod traits;

pub use coalesce::RequestCoalescer;
pub use error::*;
pub use poller::{AssetSetPoller, AssetSetPollerBuilder, CycleOutcome, PollState, PollStatus};
pub use provider::{
    build_providers, BinanceProvider, CoinCapProvider, CoinGeckoGlobalProvider,
    CoinGeckoProvider, ForexProvider,
};
pub use scheduler::{AssetSet, PollingScheduler, Subscription};
pub use traits::*;
