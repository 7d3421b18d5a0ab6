//! 폴링 사이클 요약 구조체.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use ticker_feed::{CycleOutcome, PollState, PollStatus};

/// 사이클 한 번의 요약
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleSummary {
    /// 자산 묶음 이름
    pub asset_set: String,
    /// 사이클 이후 상태
    pub status: PollStatus,
    /// 표시 중인 시세 수
    pub quotes: usize,
    /// 이전 사이클 값으로 표시 중인 시세 수
    pub stale: usize,
    /// 이번 사이클에 가격이 없어 제외된 심볼
    pub omitted: Vec<String>,
    /// 마지막 에러 메시지
    pub error: Option<String>,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl CycleSummary {
    /// 현재 상태로 요약 생성
    pub fn from_state(asset_set: impl Into<String>, state: &PollState) -> Self {
        Self {
            asset_set: asset_set.into(),
            status: state.status,
            quotes: state.quotes.len(),
            stale: state.stale.len(),
            omitted: Vec::new(),
            error: state.last_error.as_ref().map(ToString::to_string),
            elapsed: Duration::ZERO,
        }
    }

    /// 사이클 결과를 반영
    pub fn with_outcome(mut self, outcome: &CycleOutcome) -> Self {
        if let CycleOutcome::Completed { omitted, .. } = outcome {
            self.omitted = omitted.clone();
        }
        self
    }

    /// 소요 시간 기록
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    /// 최신 시세 비율 (%)
    pub fn fresh_rate(&self) -> f64 {
        if self.quotes == 0 {
            0.0
        } else {
            ((self.quotes - self.stale.min(self.quotes)) as f64 / self.quotes as f64) * 100.0
        }
    }

    /// 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        match &self.error {
            Some(error) => tracing::warn!(
                operation = operation,
                asset_set = %self.asset_set,
                status = ?self.status,
                quotes = self.quotes,
                stale = self.stale,
                error = %error,
                "사이클 실패, 이전 시세 유지"
            ),
            None => tracing::info!(
                operation = operation,
                asset_set = %self.asset_set,
                status = ?self.status,
                quotes = self.quotes,
                stale = self.stale,
                omitted = ?self.omitted,
                fresh_rate = format!("{:.1}%", self.fresh_rate()),
                elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
                "사이클 완료"
            ),
        }
    }
}
