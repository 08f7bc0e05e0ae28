//! 원시 알림 해석기.
//!
//! 호스트 생산자가 보낸 알림을 필드 메트릭 변경과 이벤트 레코드로 바꾼다.
//! 값 원문은 받지도 내보내지도 않는다 (길이/분류 요약만).
//! 해석 실패는 `CoreError::Instrumentation`으로 반환되며, 호출자가 로그 후 폐기한다.

use formtrace_core::error::CoreError;
use formtrace_core::models::event::{
    BlurEvent, ChangeEvent, ErrorEvent, Event, FocusEvent, PasteEvent, StepTransitionEvent,
};
use formtrace_core::models::field::FieldId;
use formtrace_core::models::notice::{ErrorSource, RawNotice};
use tracing::debug;

use crate::metric_store::FieldMetrics;

/// 에러 메시지 최대 길이 (문자)
const MAX_ERROR_MESSAGE_CHARS: usize = 300;

/// 단계 전환 트리거 라벨 최대 길이 (문자)
const MAX_TRIGGER_CHARS: usize = 120;

/// 원시 알림 해석기: 필드 메트릭 소유
pub struct NoticeInterpreter {
    metrics: FieldMetrics,
    /// 콘솔 출처 에러 수용 여부
    enable_console_wrap: bool,
}

impl NoticeInterpreter {
    /// 새 해석기 생성
    pub fn new(enable_console_wrap: bool) -> Self {
        Self {
            metrics: FieldMetrics::new(),
            enable_console_wrap,
        }
    }

    /// 필드 메트릭 읽기 접근 (집계기 입력)
    pub fn metrics(&self) -> &FieldMetrics {
        &self.metrics
    }

    /// 알림 해석: 메트릭을 갱신하고, 내보낼 레코드가 있으면 반환
    pub fn interpret(&mut self, notice: RawNotice) -> Result<Option<Event>, CoreError> {
        let event = match notice {
            RawNotice::Focus { field, at_ms } => {
                let field = FieldId::new(field)?;
                let record = self.metrics.focus(&field, at_ms);
                Some(Event::Focus(FocusEvent {
                    timestamp_ms: at_ms,
                    focus_count: record.focus_count,
                    field,
                }))
            }
            RawNotice::Blur { field, at_ms } => {
                let field = FieldId::new(field)?;
                let (focus_duration_ms, record) = self.metrics.blur(&field, at_ms);
                Some(Event::Blur(BlurEvent {
                    timestamp_ms: at_ms,
                    focus_duration_ms,
                    time_spent_ms: record.total_time_spent_ms,
                    edit_count: record.edit_count,
                    validation_failures: record.validation_failures,
                    backspace_count: record.backspace_count,
                    paste_count: record.paste_count,
                    clear_count: record.clear_count,
                    field,
                }))
            }
            RawNotice::Change {
                field,
                at_ms,
                summary,
                validity,
            } => {
                let field = FieldId::new(field)?;
                let record = self.metrics.record_mut(&field);
                record.record_edit();
                if !validity.valid {
                    record.record_change_validation_failure();
                }
                let cleared = summary
                    .map(|s| record.observe_value_length(s.length))
                    .unwrap_or(false);

                Some(Event::Change(ChangeEvent {
                    timestamp_ms: at_ms,
                    value: summary,
                    valid: validity.valid,
                    validity_flags: validity.flags,
                    cleared,
                    edit_count: record.edit_count,
                    field,
                }))
            }
            RawNotice::Invalid {
                field,
                at_ms,
                flags,
            } => {
                let field = FieldId::new(field)?;
                self.metrics.record_mut(&field).record_invalid_notice();
                let message = if flags.is_empty() {
                    "invalid".to_string()
                } else {
                    flags.join(",")
                };
                Some(Event::Error(ErrorEvent {
                    timestamp_ms: at_ms,
                    source: ErrorSource::Validation,
                    message: truncate_chars(&message, MAX_ERROR_MESSAGE_CHARS),
                    field: Some(field),
                    url: None,
                    status: None,
                }))
            }
            RawNotice::KeyDown { field, .. } => {
                let field = FieldId::new(field)?;
                self.metrics.record_mut(&field).record_backspace();
                None
            }
            RawNotice::Paste { field, at_ms } => {
                let field = FieldId::new(field)?;
                let record = self.metrics.record_mut(&field);
                record.record_paste();
                Some(Event::Paste(PasteEvent {
                    timestamp_ms: at_ms,
                    paste_count: record.paste_count,
                    field,
                }))
            }
            RawNotice::StepClick {
                at_ms,
                from,
                to,
                trigger,
            } => {
                let trigger = trigger.trim();
                if trigger.is_empty() {
                    return Err(CoreError::Instrumentation(
                        "단계 전환 트리거 라벨 없음".to_string(),
                    ));
                }
                Some(Event::StepTransition(StepTransitionEvent {
                    timestamp_ms: at_ms,
                    from,
                    to,
                    trigger: truncate_chars(trigger, MAX_TRIGGER_CHARS),
                }))
            }
            RawNotice::HostError {
                at_ms,
                source,
                message,
                url,
                status,
            } => {
                if source == ErrorSource::Console && !self.enable_console_wrap {
                    debug!("콘솔 래핑 비활성화, 콘솔 에러 무시");
                    return Ok(None);
                }
                Some(Event::Error(ErrorEvent {
                    timestamp_ms: at_ms,
                    source,
                    message: truncate_chars(&message, MAX_ERROR_MESSAGE_CHARS),
                    field: None,
                    url: url.as_deref().map(strip_query),
                    status,
                }))
            }
        };

        Ok(event)
    }
}

/// 문자 경계에서 자르기
fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((cut, _)) => s[..cut].to_string(),
        None => s.to_string(),
    }
}

/// URL에서 쿼리/프래그먼트 제거 (입력값이 쿼리로 새는 것 방지)
fn strip_query(url: &str) -> String {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    url[..end].to_string()
}
