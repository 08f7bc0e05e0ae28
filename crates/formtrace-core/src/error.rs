//! formtrace 핵심 에러 타입.
//!
//! 어댑터 crate는 이 타입을 그대로 반환하거나 `#[from] CoreError`로 래핑한다.
//! 수집 파이프라인의 에러는 호출자(페이지)로 전파되지 않고 로그 후 흡수된다.

use thiserror::Error;

/// 코어 레이어 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 전송 계층 실패 (요청이 완료되지 못함): 배치 재큐잉 대상
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 수집기가 에러 상태 코드로 응답: 재시도하지 않음
    #[error("수집기 거부: HTTP {status}")]
    Rejected {
        /// HTTP 상태 코드
        status: u16,
    },

    /// 원시 알림 해석 실패 (경로/값 요약 도출 실패 등): 해당 레코드만 폐기
    #[error("계측 에러: {0}")]
    Instrumentation(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// 배치를 큐 앞쪽으로 되돌려야 하는 전송 계층 실패인지 판별
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, CoreError::Network(_))
    }
}
