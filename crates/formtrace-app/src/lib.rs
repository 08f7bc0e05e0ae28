//! # formtrace-app
//!
//! 폼 텔레메트리 트래커 조립 계층.
//! 해석기, 병합기, 이벤트 큐, 전송 어댑터를 연결하고 세션 라이프사이클을 관리한다.
//!
//! - [`lifecycle`]: `Tracker` (시작/숨김/언로드/중지)
//! - [`scheduler`]: 하트비트 루프
//! - [`replay`]: 기록된 알림 재생 (JSON Lines)

pub mod lifecycle;
pub mod replay;
pub mod scheduler;

pub use lifecycle::{HostCapabilities, Tracker, TrackerState, TrackerStats};
