//! 설정 관리.
//!
//! `config/default.toml`과 `TICKER__` 접두사 환경 변수에서 설정을 읽습니다.
//! 예: `TICKER__POLLING__INTERVAL_SECS=30`.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::domain::SparklineProfile;
use crate::error::{TickerError, TickerResult};
use crate::types::ProviderName;

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 폴링 설정
    #[serde(default)]
    pub polling: PollingConfig,
    /// 제공자 설정
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// 폴링 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollingConfig {
    /// 기본 폴링 간격 (초)
    pub interval_secs: u64,
    /// 최소 폴링 간격 (초). 더 짧은 요청은 이 값으로 올립니다
    pub min_interval_secs: u64,
    /// 신선도 구간 (밀리초). 마지막 성공 후 이 구간 안의 사이클은 생략합니다
    pub freshness_window_ms: u64,
    /// 제공자 호출당 타임아웃 (밀리초)
    pub request_timeout_ms: u64,
    /// 스파크라인 점 개수
    pub sparkline_length: usize,
    /// 스파크라인 프로파일
    pub sparkline_profile: SparklineProfile,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            min_interval_secs: 10,
            freshness_window_ms: 5_000,
            request_timeout_ms: 10_000,
            sparkline_length: crate::domain::DEFAULT_SPARKLINE_LENGTH,
            sparkline_profile: SparklineProfile::Smooth,
        }
    }
}

impl PollingConfig {
    /// 기본 폴링 간격.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// 최소 폴링 간격.
    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_secs)
    }

    /// 신선도 구간.
    pub fn freshness_window(&self) -> Duration {
        Duration::from_millis(self.freshness_window_ms)
    }

    /// 제공자 호출당 타임아웃.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// 요청 간격에 최소 간격을 적용합니다.
    pub fn effective_interval(&self, requested: Duration) -> Duration {
        requested.max(self.min_interval())
    }
}

/// 개별 제공자 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderSettings {
    /// 활성화 여부
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// REST API 기본 URL
    pub base_url: String,
    /// API 키 (선택)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl ProviderSettings {
    fn new(base_url: &str) -> Self {
        Self {
            enabled: true,
            base_url: base_url.to_string(),
            api_key: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// 제공자 설정 모음.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// 정합 우선순위 (앞쪽이 우선)
    pub priority: Vec<ProviderName>,
    /// Binance 현물 시세
    pub binance: ProviderSettings,
    /// CoinGecko 단순 시세 및 전체 시장 통계
    pub coingecko: ProviderSettings,
    /// CoinCap 자산 시세
    pub coincap: ProviderSettings,
    /// 환율
    pub forex: ProviderSettings,
    /// 환산 대상 통화 (예: "INR")
    pub local_currency: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            priority: ProviderName::all().to_vec(),
            binance: ProviderSettings::new("https://api.binance.com"),
            coingecko: ProviderSettings::new("https://api.coingecko.com"),
            coincap: ProviderSettings::new("https://api.coincap.io"),
            forex: ProviderSettings::new("https://open.er-api.com"),
            local_currency: "INR".to_string(),
        }
    }
}

impl ProvidersConfig {
    /// 제공자 설정을 반환합니다.
    pub fn settings(&self, provider: ProviderName) -> &ProviderSettings {
        match provider {
            ProviderName::Binance => &self.binance,
            ProviderName::CoinGecko => &self.coingecko,
            ProviderName::CoinCap => &self.coincap,
            ProviderName::Forex => &self.forex,
        }
    }

    /// 우선순위 순서대로, 활성화된 제공자만 반환합니다.
    pub fn enabled_in_priority(&self) -> Vec<ProviderName> {
        self.priority
            .iter()
            .copied()
            .filter(|p| self.settings(*p).enabled)
            .collect()
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> TickerResult<Self> {
        let builder = config::Config::builder()
            // 파일에서 로드 (없으면 기본값)
            .add_source(config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("TICKER")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> TickerResult<Self> {
        Self::load("config/default.toml")
    }

    /// 값 범위를 검사합니다.
    pub fn validate(&self) -> TickerResult<()> {
        if self.polling.min_interval_secs == 0 {
            return Err(TickerError::Config(
                "polling.min_interval_secs는 0보다 커야 합니다".to_string(),
            ));
        }
        if self.polling.request_timeout_ms == 0 {
            return Err(TickerError::Config(
                "polling.request_timeout_ms는 0보다 커야 합니다".to_string(),
            ));
        }
        if self.polling.freshness_window() >= self.polling.min_interval() {
            return Err(TickerError::Config(format!(
                "polling.freshness_window_ms({})는 polling.min_interval_secs({}초)보다 짧아야 합니다",
                self.polling.freshness_window_ms, self.polling.min_interval_secs
            )));
        }
        if self.providers.enabled_in_priority().is_empty() {
            return Err(TickerError::Config(
                "활성화된 제공자가 없습니다".to_string(),
            ));
        }
        Ok(())
    }
}
