//! 제공자 어댑터 공용 HTTP 클라이언트와 JSON 수치 파싱.

use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};
use ticker_core::{decimal_from_f64, decimal_from_str, DecimalExt};

use crate::traits::ProviderResult;
use crate::{FeedError, FeedResult, ProviderError};

/// 에러 메시지에 남길 응답 본문 최대 길이.
const MAX_ERROR_BODY: usize = 200;

/// 공개 REST API 호출용 클라이언트.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
}

impl RestClient {
    /// 기본 URL과 요청 타임아웃으로 클라이언트를 생성합니다.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> FeedResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ticker-feed/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FeedError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// 기본 URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET 요청을 보내고 JSON 응답을 역직렬화합니다.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        headers: &[(&str, String)],
    ) -> ProviderResult<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(url = %url, params = ?params, "GET");

        let mut request = self.client.get(&url).query(params);
        for (name, value) in headers {
            request = request.header(*name, value);
        }

        let response = request.send().await?;
        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> ProviderResult<T> {
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            return Err(ProviderError::HttpStatus {
                status: status.as_u16(),
                message: truncate(&body),
            });
        }
        if body.trim().is_empty() {
            return Err(ProviderError::EmptyBody);
        }

        serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse response: {} - Body: {}", e, truncate(&body));
            ProviderError::Parse(e.to_string())
        })
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY).collect()
}

/// Debug 출력용 API 키 마스킹.
pub(crate) fn mask_secret(secret: Option<&str>) -> String {
    match secret {
        None => "None".to_string(),
        Some(key) if key.len() > 8 && key.is_ascii() => {
            format!("{}...{}", &key[..4], &key[key.len() - 4..])
        }
        Some(_) => "***REDACTED***".to_string(),
    }
}

/// JSON 값(문자열 또는 숫자)을 음이 아닌 Decimal로 변환합니다.
///
/// 파싱 실패, 비유한값, 음수는 `None`.
pub fn non_negative(value: Option<&Value>) -> Option<Decimal> {
    signed(value).filter(|v| !v.is_sign_negative() || v.is_zero())
}

/// JSON 값을 양수 Decimal로 변환합니다. 가격 필드에 사용합니다.
pub fn positive(value: Option<&Value>) -> Option<Decimal> {
    signed(value).filter(|v| *v > Decimal::ZERO)
}

/// JSON 값을 부호 있는 Decimal로 변환합니다. 변동률 필드에 사용합니다.
///
/// 절댓값이 `MAX_QUOTE_MAGNITUDE`를 넘는 값은 `None`.
pub fn signed(value: Option<&Value>) -> Option<Decimal> {
    let parsed = match value? {
        Value::String(s) => decimal_from_str(s),
        Value::Number(n) => decimal_from_str(&n.to_string())
            .or_else(|| n.as_f64().and_then(decimal_from_f64)),
        _ => None,
    };
    parsed.filter(|v| v.is_quote_sized())
}

/// JSON 값을 순위(양의 정수)로 변환합니다.
pub fn rank(value: Option<&Value>) -> Option<u32> {
    let parsed: Option<u32> = match value? {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        _ => None,
    };
    parsed.filter(|r| *r > 0)
}
