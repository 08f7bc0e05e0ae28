//! # formtrace-network
//!
//! 이벤트 큐와 수집기 전송 어댑터.
//! 레코드를 도착 순서대로 모아 크기/시간 임계값 또는 라이프사이클 트리거에 배치로 보낸다.
//! 기본 경로는 HTTP POST(JSON), 언로드 중에는 응답을 보지 않는 비콘을 먼저 시도한다.
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! use formtrace_network::event_queue::{Delivery, EventQueue, QueueSettings};
//! use formtrace_network::http_transport::HttpBatchTransport;
//! ```

pub mod beacon;
pub mod event_queue;
pub mod http_transport;
