//! formtrace 도메인 모델.
//!
//! 호스트 → 트래커 원시 알림, 필드 메트릭, 트래커 → 수집기 이벤트를 정의한다.
//! 모든 모델은 `serde` Serialize/Deserialize를 구현한다.

pub mod event;
pub mod field;
pub mod notice;
pub mod session;
