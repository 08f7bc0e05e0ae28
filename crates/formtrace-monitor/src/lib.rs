//! # formtrace-monitor
//!
//! 폼 상호작용 집계 레이어.
//! 원시 알림을 필드 메트릭 변경과 이벤트 레코드로 해석하고,
//! 고충 지점을 판정하며, 구조 변경 알림을 속도 제한 묶음으로 병합한다.
//!
//! - [`metric_store`]: 필드별 카운터 저장소 + 단일 포커스 상태
//! - [`aggregator`]: 고충 지점 휴리스틱과 요약 스냅샷
//! - [`interpreter`]: 원시 알림 → 메트릭 변경 + 이벤트
//! - [`coalescer`]: 구조 변경 병합기 (tokio 타이머)

pub mod aggregator;
pub mod coalescer;
pub mod interpreter;
pub mod metric_store;
