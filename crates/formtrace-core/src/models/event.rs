//! 이벤트 모델.
//!
//! 수집기로 전송되는 이벤트 레코드와 배치 묶음을 정의.
//! 레코드는 생성 후 변경되지 않으며, JSON에서는 `kind` 태그 + camelCase 필드로 직렬화된다.

use serde::{Deserialize, Serialize};

use super::field::FieldId;
use super::notice::{ErrorSource, StructuralNotice, ValueSummary};

/// 수집기로 가는 모든 이벤트의 통합 enum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Event {
    /// 필드 포커스 진입
    Focus(FocusEvent),
    /// 필드 포커스 이탈 (누적 메트릭 포함)
    Blur(BlurEvent),
    /// 값 변경 (요약만)
    Change(ChangeEvent),
    /// 콘솔/전역/네트워크/검증 에러
    Error(ErrorEvent),
    /// 붙여넣기
    Paste(PasteEvent),
    /// 폼 단계 전환
    StepTransition(StepTransitionEvent),
    /// 병합된 구조 변경 묶음
    StructuralChange(StructuralChangeEvent),
    /// 필드 분석 요약 (고충 지점 포함)
    FieldAnalytics(FieldAnalyticsEvent),
    /// 세션 시작
    SessionStart(SessionStartEvent),
    /// 세션 종료
    SessionEnd(SessionEndEvent),
    /// 하트비트
    Heartbeat(HeartbeatEvent),
}

impl Event {
    /// 이벤트 시각 (ms)
    pub fn timestamp_ms(&self) -> i64 {
        match self {
            Event::Focus(e) => e.timestamp_ms,
            Event::Blur(e) => e.timestamp_ms,
            Event::Change(e) => e.timestamp_ms,
            Event::Error(e) => e.timestamp_ms,
            Event::Paste(e) => e.timestamp_ms,
            Event::StepTransition(e) => e.timestamp_ms,
            Event::StructuralChange(e) => e.timestamp_ms,
            Event::FieldAnalytics(e) => e.timestamp_ms,
            Event::SessionStart(e) => e.timestamp_ms,
            Event::SessionEnd(e) => e.timestamp_ms,
            Event::Heartbeat(e) => e.timestamp_ms,
        }
    }

    /// 와이어 `kind` 값
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Focus(_) => "focus",
            Event::Blur(_) => "blur",
            Event::Change(_) => "change",
            Event::Error(_) => "error",
            Event::Paste(_) => "paste",
            Event::StepTransition(_) => "step-transition",
            Event::StructuralChange(_) => "structural-change",
            Event::FieldAnalytics(_) => "field-analytics",
            Event::SessionStart(_) => "session-start",
            Event::SessionEnd(_) => "session-end",
            Event::Heartbeat(_) => "heartbeat",
        }
    }
}

/// 포커스 진입 이벤트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusEvent {
    pub timestamp_ms: i64,
    pub field: FieldId,
    /// 이 필드의 누적 포커스 횟수
    pub focus_count: u32,
}

/// 포커스 이탈 이벤트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlurEvent {
    pub timestamp_ms: i64,
    pub field: FieldId,
    /// 이번 포커스 구간 길이 (ms)
    pub focus_duration_ms: u64,
    /// 누적 체류 시간 (ms)
    pub time_spent_ms: u64,
    pub edit_count: u32,
    pub validation_failures: u32,
    pub backspace_count: u32,
    pub paste_count: u32,
    pub clear_count: u32,
}

/// 값 변경 이벤트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub timestamp_ms: i64,
    pub field: FieldId,
    /// 값 요약 (호스트가 도출하지 못하면 없음)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<ValueSummary>,
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validity_flags: Vec<String>,
    /// 이번 변경으로 값이 비워졌는지
    pub cleared: bool,
    pub edit_count: u32,
}

/// 에러 이벤트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEvent {
    pub timestamp_ms: i64,
    pub source: ErrorSource,
    /// 잘린 메시지
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<FieldId>,
    /// 쿼리/프래그먼트를 제거한 요청 URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// 붙여넣기 이벤트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasteEvent {
    pub timestamp_ms: i64,
    pub field: FieldId,
    pub paste_count: u32,
}

/// 단계 전환 이벤트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepTransitionEvent {
    pub timestamp_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// 전환을 일으킨 컨트롤 라벨
    pub trigger: String,
}

/// 구조 변경 묶음 이벤트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralChangeEvent {
    pub timestamp_ms: i64,
    pub changes: Vec<StructuralNotice>,
    /// 배출 후 남은 적체 크기
    pub backlog: usize,
}

/// 요약 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryReason {
    Periodic,
    Hidden,
    Unload,
    Stop,
}

/// 고충 판정 사유별 플래그
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PainReasons {
    pub many_validation_failures: bool,
    pub long_dwell: bool,
    pub many_focuses: bool,
    pub many_edits: bool,
    pub many_clears: bool,
}

impl PainReasons {
    /// 하나라도 해당하는지
    pub fn any(&self) -> bool {
        self.many_validation_failures
            || self.long_dwell
            || self.many_focuses
            || self.many_edits
            || self.many_clears
    }
}

/// 필드별 메트릭 스냅샷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSummary {
    pub field: FieldId,
    pub focus_count: u32,
    pub time_spent_ms: u64,
    pub edit_count: u32,
    pub validation_failures: u32,
    pub change_validation_failures: u32,
    pub invalid_notices: u32,
    pub backspace_count: u32,
    pub paste_count: u32,
    pub clear_count: u32,
}

/// 고충 지점
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PainPoint {
    pub field: FieldId,
    pub reasons: PainReasons,
}

/// 필드 분석 요약 이벤트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldAnalyticsEvent {
    pub timestamp_ms: i64,
    pub reason: SummaryReason,
    /// 요약 시점에 포커스 중인 필드
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop_off_field: Option<FieldId>,
    pub total_fields_interacted: usize,
    pub fields: Vec<FieldSummary>,
    pub pain_points: Vec<PainPoint>,
    pub pain_point_count: usize,
}

/// 시작 시 감지된 호스트 기능
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityFlags {
    pub unload_beacon: bool,
    pub structural_changes: bool,
}

/// 세션 시작 이벤트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStartEvent {
    pub timestamp_ms: i64,
    pub form_selector: String,
    pub session_ttl_ms: u64,
    pub capabilities: CapabilityFlags,
}

/// 세션 종료 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionEndReason {
    Hidden,
    Unload,
    Stop,
}

impl From<SessionEndReason> for SummaryReason {
    fn from(reason: SessionEndReason) -> Self {
        match reason {
            SessionEndReason::Hidden => SummaryReason::Hidden,
            SessionEndReason::Unload => SummaryReason::Unload,
            SessionEndReason::Stop => SummaryReason::Stop,
        }
    }
}

/// 세션 종료 이벤트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEndEvent {
    pub timestamp_ms: i64,
    pub reason: SessionEndReason,
    /// 세션 시작 이후 경과 (ms)
    pub duration_ms: u64,
}

/// 하트비트 이벤트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatEvent {
    pub timestamp_ms: i64,
    pub fields_interacted: usize,
    /// 구조 변경 병합기 적체 크기
    pub structural_backlog: usize,
}

/// 수집기 전송용 배치
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundBatch {
    pub session_id: String,
    pub session_started_at: i64,
    /// 트래커 내 단조 증가 배치 번호 (수집기 측 중복 제거용)
    pub batch_seq: u64,
    pub events: Vec<Event>,
}
