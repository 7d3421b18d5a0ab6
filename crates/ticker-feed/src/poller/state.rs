//! 자산 묶음별 폴링 상태.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use ticker_core::{MarketQuote, SyntheticSparkline};

use crate::PollCycleError;

/// 폴링 상태 머신.
///
/// `Idle → Loading → Ready | Error`, 그리고 `Ready`/`Error`에서 다음 사이클 시작 시
/// 다시 `Loading`으로 전이합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollStatus {
    /// 아직 사이클이 실행되지 않았거나 중지됨
    #[default]
    Idle,
    /// 사이클 진행 중
    Loading,
    /// 마지막 사이클 성공
    Ready,
    /// 마지막 사이클 실패
    Error,
}

/// 자산 묶음의 최신 정합 결과.
///
/// 표시 계층은 `watch::Receiver`로 읽기만 합니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollState {
    /// 상태
    pub status: PollStatus,
    /// 심볼 → 정합된 시세
    pub quotes: BTreeMap<String, MarketQuote>,
    /// 심볼 → 합성 스파크라인
    pub sparklines: BTreeMap<String, SyntheticSparkline>,
    /// 이전 사이클의 시세를 표시 중인 심볼
    pub stale: BTreeSet<String>,
    /// 마지막 성공 시각
    pub last_updated_at: Option<DateTime<Utc>>,
    /// 마지막 사이클 에러
    pub last_error: Option<PollCycleError>,
}

impl PollState {
    /// 심볼의 시세.
    pub fn quote(&self, symbol: &str) -> Option<&MarketQuote> {
        self.quotes.get(symbol)
    }

    /// 표시할 시세가 하나라도 있는지 확인.
    pub fn has_data(&self) -> bool {
        !self.quotes.is_empty()
    }

    /// 심볼의 시세가 이전 사이클 값인지 확인.
    pub fn is_stale(&self, symbol: &str) -> bool {
        self.stale.contains(symbol)
    }
}

/// 사이클 한 번의 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// 팬아웃과 정합을 마침
    Completed {
        /// 이번 사이클에 정합된 자산 수
        reconciled: usize,
        /// 가격이 없어 제외된 심볼
        omitted: Vec<String>,
    },
    /// 신선도 구간 안이라 생략 (성공으로 간주)
    Fresh,
    /// 다른 사이클이 진행 중이라 생략
    Skipped,
    /// `stop()` 이후 도착해 결과를 버림
    Discarded,
    /// 사이클 실패. 이전 시세는 유지됨
    Failed(PollCycleError),
}

impl CycleOutcome {
    /// 새 데이터가 반영되었거나 이미 신선한 상태인지 확인.
    pub fn is_success(&self) -> bool {
        matches!(self, CycleOutcome::Completed { .. } | CycleOutcome::Fresh)
    }
}
