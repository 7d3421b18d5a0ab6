//! 시세 도메인 모델.

mod asset;
mod quote;
mod reconcile;
mod sparkline;

pub use asset::*;
pub use quote::*;
pub use reconcile::*;
pub use sparkline::*;
