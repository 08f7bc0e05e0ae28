//! 이벤트 싱크 포트.
//!
//! 집계기, 구조 변경 병합기, 원시 알림 해석기가 생성한 레코드를 받는 곳.
//! 구현: `formtrace-network::event_queue::EventQueue`

use crate::models::event::Event;

/// 이벤트 레코드 수신자
pub trait EventSink: Send + Sync {
    /// 레코드를 도착 순서대로 추가
    fn push(&self, event: Event);
}
