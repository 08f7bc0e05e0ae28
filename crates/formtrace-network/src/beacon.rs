//! 언로드 안전 비콘.
//!
//! `UnloadBeacon` 포트 구현. 호출 스레드를 막지 않고 요청을 런타임에 떼어 보내며,
//! 응답은 확인하지 않는다. 본문 크기 상한을 넘으면 거부하여 호출자가 일반 전송으로 폴백하게 한다.

use formtrace_core::error::CoreError;
use formtrace_core::ports::transport::UnloadBeacon;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// 비콘 본문 최대 크기 (64 KiB)
pub const MAX_BEACON_BODY_BYTES: usize = 64 * 1024;

/// 분리 실행 비콘: 요청을 생성한 런타임에 fire-and-forget 으로 올림
pub struct DetachedBeacon {
    client: reqwest::Client,
    endpoint: String,
    handle: Handle,
}

impl DetachedBeacon {
    /// 새 비콘 생성: tokio 런타임 컨텍스트 안에서 호출해야 한다
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, CoreError> {
        let handle = Handle::try_current()
            .map_err(|e| CoreError::Config(format!("비콘에 필요한 런타임 없음: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            handle,
        })
    }
}

impl UnloadBeacon for DetachedBeacon {
    fn send_beacon(&self, body: Vec<u8>) -> bool {
        if body.len() > MAX_BEACON_BODY_BYTES {
            debug!("비콘 본문 초과 ({} bytes), 거부", body.len());
            return false;
        }

        let request = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);

        self.handle.spawn(async move {
            if let Err(e) = request.send().await {
                warn!("비콘 전송 실패 (응답 미확인): {e}");
            }
        });
        true
    }
}
