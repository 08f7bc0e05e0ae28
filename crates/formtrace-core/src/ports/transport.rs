//! 배치 전송 포트.
//!
//! 구현: `formtrace-network` crate (reqwest 기반 HTTP, 분리 실행 비콘)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::event::OutboundBatch;

/// 기본 전송 경로: 일반 비동기 HTTP 요청
///
/// 에러 구분:
/// - `CoreError::Network`: 요청이 완료되지 못함 → 호출자가 배치를 큐 앞쪽에 되돌림
/// - `CoreError::Rejected`: 수집기가 에러 상태로 응답 → 재시도하지 않음
#[async_trait]
pub trait BatchTransport: Send + Sync {
    /// 배치 전송
    async fn send(&self, batch: &OutboundBatch) -> Result<(), CoreError>;
}

/// 언로드 안전 전송: 응답을 볼 수 없는 최선 노력 전달
///
/// 페이지 해체 중에도 동기적으로 호출 가능해야 한다.
/// `true`는 "전달 대상으로 수락됨"일 뿐 수신 보장이 아니다.
pub trait UnloadBeacon: Send + Sync {
    /// JSON 본문을 전달 대기열에 올림
    fn send_beacon(&self, body: Vec<u8>) -> bool;
}
