//! 시세 제공자 trait 정의.

use async_trait::async_trait;
use ticker_core::{AssetDescriptor, PartialQuote, ProviderName, ProviderScope};

use crate::ProviderError;

/// 제공자 작업을 위한 Result 타입.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// 업스트림 시세 제공자 인터페이스.
///
/// 구현체는 HTTP 왕복 한 번으로 부분 시세 하나를 만듭니다. 응답에 없는 필드는
/// `None`으로 두고, 요청 자체가 실패했을 때만 에러를 반환합니다.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// 제공자 이름.
    fn name(&self) -> ProviderName;

    /// 조회 범위. `Global` 제공자는 사이클당 한 번만 호출되며 `asset` 인자를 무시합니다.
    fn scope(&self) -> ProviderScope {
        ProviderScope::PerAsset
    }

    /// 자산의 부분 시세를 조회합니다.
    async fn fetch_quote(&self, asset: &AssetDescriptor) -> ProviderResult<PartialQuote>;
}
