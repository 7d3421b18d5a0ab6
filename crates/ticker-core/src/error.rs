//! 시세 데이터 계층의 에러 타입.
//!
//! 이 모듈은 레지스트리, 정합(reconcile), 설정 단계에서 발생하는 에러를 정의합니다.
//! 네트워크/제공자 에러는 `ticker-feed` 크레이트에서 다룹니다.

use thiserror::Error;

/// 핵심 시세 에러.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TickerError {
    /// 레지스트리에 없는 자산 심볼 (설정 오류, 시작 시 검증에서 치명적)
    #[error("알 수 없는 자산: {0}")]
    UnknownAsset(String),

    /// 같은 심볼이 레지스트리에 두 번 등록됨
    #[error("중복 자산: {0}")]
    DuplicateAsset(String),

    /// 어떤 제공자도 가격을 주지 않아 정합 실패 (해당 자산은 이번 사이클에서 제외)
    #[error("가격 데이터 없음: {0}")]
    NoPriceData(String),

    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),
}

/// 시세 작업을 위한 Result 타입.
pub type TickerResult<T> = Result<T, TickerError>;

impl TickerError {
    /// 시작 단계에서 중단해야 하는 설정 오류인지 확인합니다.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TickerError::UnknownAsset(_) | TickerError::DuplicateAsset(_) | TickerError::Config(_)
        )
    }
}

impl From<config::ConfigError> for TickerError {
    fn from(err: config::ConfigError) -> Self {
        TickerError::Config(err.to_string())
    }
}
