//! 설정 파일과 환경변수 기반 설정 모듈.

use crate::Result;
use std::path::PathBuf;
use ticker_core::AppConfig;
use ticker_feed::AssetSet;

/// 설정 파일 경로 기본값
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// ticker-watch 전체 설정
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// 읽어 들인 설정 파일 경로
    pub config_path: PathBuf,
    /// 시세 계층 설정
    pub app: AppConfig,
}

impl WatchConfig {
    /// `.env`와 설정 파일, `TICKER__*` 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config_path: PathBuf = std::env::var("TICKER_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
            .into();
        let app = AppConfig::load(&config_path)?;

        Ok(Self { config_path, app })
    }

    /// `--interval-secs` 인자 반영
    pub fn with_interval_secs(mut self, interval_secs: Option<u64>) -> Self {
        if let Some(secs) = interval_secs {
            self.app.polling.interval_secs = secs;
        }
        self
    }
}

/// `--symbols` 인자를 자산 묶음으로 변환.
///
/// 인자가 없거나 비어 있으면 추천 자산 묶음을 사용합니다.
pub fn asset_set_from_arg(symbols: Option<&str>) -> AssetSet {
    let parsed: Vec<String> = symbols
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    if parsed.is_empty() {
        AssetSet::suggested()
    } else {
        AssetSet::from_symbols(parsed)
    }
}
