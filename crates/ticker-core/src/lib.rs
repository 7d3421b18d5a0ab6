//! # Ticker Core
//!
//! 암호화폐 시세 티커의 핵심 도메인 모델과 타입을 제공합니다.
//!
//! - 자산 레지스트리 (표시 심볼 → 제공자 식별자)
//! - 부분 시세와 정합된 시세 레코드
//! - 부분 시세 정합기 (우선순위, 누락 데이터 휴리스틱)
//! - 합성 스파크라인 생성기
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod registry;
pub mod types;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use registry::*;
pub use types::*;
