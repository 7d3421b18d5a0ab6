//! 시세 데이터 계층 전반에서 사용되는 공통 타입.

mod decimal;
mod provider;

pub use decimal::*;
pub use provider::*;
