//! 시세 피드 에러 타입.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ticker_core::TickerError;

/// 제공자 어댑터 에러.
///
/// 모든 변형은 "해당 제공자를 이번에 사용할 수 없음"을 뜻하며, 팬아웃 경계에서
/// 빈 부분 시세로 변환됩니다. 어댑터 바깥으로 전파되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    Network(String),

    /// 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 2xx가 아닌 응답
    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// 요청 한도 초과 (HTTP 429)
    #[error("Rate limit exceeded")]
    RateLimited,

    /// 응답 본문이 비어 있음
    #[error("Empty response body")]
    EmptyBody,

    /// 파싱/역직렬화 에러
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ProviderError {
    /// 다음 사이클에서 재시도할 만한 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Network(_) | ProviderError::Timeout(_) | ProviderError::RateLimited => {
                true
            }
            ProviderError::HttpStatus { status, .. } => *status >= 500,
            ProviderError::EmptyBody | ProviderError::Parse(_) => false,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(err.to_string())
        } else if err.is_decode() {
            ProviderError::Parse(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Parse(err.to_string())
    }
}

/// 폴링 사이클 에러. `PollState::last_error`에 기록되어 화면에 표시됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PollCycleError {
    /// 모든 제공자 호출이 실패함
    #[error("모든 제공자 호출 실패 ({attempted}건)")]
    AllProvidersFailed { attempted: usize },

    /// 응답은 있었지만 가격을 정합한 자산이 하나도 없음
    #[error("가격을 얻은 자산 없음: {}", .symbols.join(", "))]
    NoQuotes { symbols: Vec<String> },
}

/// 스케줄러 API 에러.
#[derive(Debug, Error)]
pub enum FeedError {
    /// 등록되지 않은 자산 묶음
    #[error("알 수 없는 자산 묶음: {0}")]
    UnknownAssetSet(String),

    /// 자산 레지스트리/설정 에러
    #[error(transparent)]
    Ticker(#[from] TickerError),

    /// HTTP 클라이언트 생성 실패
    #[error("HTTP 클라이언트 생성 실패: {0}")]
    HttpClient(String),
}

impl FeedError {
    /// 시작 단계에서 중단해야 하는 에러인지 확인.
    pub fn is_fatal(&self) -> bool {
        match self {
            FeedError::Ticker(err) => err.is_fatal(),
            FeedError::HttpClient(_) => true,
            FeedError::UnknownAssetSet(_) => false,
        }
    }
}

/// 스케줄러 작업을 위한 Result 타입.
pub type FeedResult<T> = Result<T, FeedError>;
