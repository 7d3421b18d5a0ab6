//! 에러 타입 정의.

use thiserror::Error;
use ticker_core::TickerError;
use ticker_feed::FeedError;

/// ticker-watch 에러 타입
#[derive(Debug, Error)]
pub enum WatchError {
    /// 레지스트리/정합 에러
    #[error(transparent)]
    Ticker(#[from] TickerError),

    /// 스케줄러 에러
    #[error(transparent)]
    Feed(#[from] FeedError),

    /// 상태 직렬화 에러
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, WatchError>;
