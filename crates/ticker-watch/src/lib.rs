//! 시세 폴링 스케줄러를 구동하는 명령줄 도구.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 자산 레지스트리 조회
//! - 한 번의 사이클을 돌려 `PollState`를 JSON으로 출력
//! - Ctrl-C까지 폴링하며 사이클 요약 로그 출력

pub mod config;
pub mod error;
pub mod snapshot;
pub mod stats;

pub use config::{asset_set_from_arg, WatchConfig};
pub use error::{Result, WatchError};
pub use snapshot::Snapshot;
pub use stats::CycleSummary;
