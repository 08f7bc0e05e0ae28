//! 고충 지점 집계기.
//!
//! 필드 메트릭의 시점 스냅샷을 만들고 고정 임계값으로 고충 필드를 판정.
//! 카운터를 리셋하지 않으므로 같은 세션의 연속 스냅샷은 단조 비감소한다.

use formtrace_core::models::event::{
    FieldAnalyticsEvent, FieldSummary, PainPoint, PainReasons, SummaryReason,
};
use formtrace_core::models::field::{FieldId, FieldMetricRecord};
use tracing::debug;

use crate::metric_store::FieldMetrics;

/// 검증 실패 임계값 (초과 시 고충)
pub const VALIDATION_FAILURE_THRESHOLD: u32 = 2;
/// 체류 시간 임계값 (ms)
pub const LONG_DWELL_THRESHOLD_MS: u64 = 30_000;
/// 포커스 횟수 임계값
pub const FOCUS_THRESHOLD: u32 = 3;
/// 편집 횟수 임계값
pub const EDIT_THRESHOLD: u32 = 5;
/// 비우기 횟수 임계값
pub const CLEAR_THRESHOLD: u32 = 1;

/// 레코드 하나의 고충 사유 판정 (각 조건 독립)
pub fn evaluate(record: &FieldMetricRecord) -> PainReasons {
    PainReasons {
        many_validation_failures: record.validation_failures > VALIDATION_FAILURE_THRESHOLD,
        long_dwell: record.total_time_spent_ms > LONG_DWELL_THRESHOLD_MS,
        many_focuses: record.focus_count > FOCUS_THRESHOLD,
        many_edits: record.edit_count > EDIT_THRESHOLD,
        many_clears: record.clear_count > CLEAR_THRESHOLD,
    }
}

fn field_summary(field: &FieldId, record: &FieldMetricRecord) -> FieldSummary {
    FieldSummary {
        field: field.clone(),
        focus_count: record.focus_count,
        time_spent_ms: record.total_time_spent_ms,
        edit_count: record.edit_count,
        validation_failures: record.validation_failures,
        change_validation_failures: record.change_validation_failures,
        invalid_notices: record.invalid_notices,
        backspace_count: record.backspace_count,
        paste_count: record.paste_count,
        clear_count: record.clear_count,
    }
}

/// 전체 필드 요약 생성 (읽기 전용)
///
/// `dropOffField`는 호출 시점의 포커스 필드다. 세션 종료/언로드 시에만
/// 실제 이탈 지점을 뜻하고, 주기 스냅샷에서는 입력 중인 필드일 뿐이다.
pub fn summarize(metrics: &FieldMetrics, reason: SummaryReason, now_ms: i64) -> FieldAnalyticsEvent {
    let mut fields = Vec::with_capacity(metrics.store().len());
    let mut pain_points = Vec::new();

    for (field, record) in metrics.store().iter() {
        fields.push(field_summary(field, record));

        let reasons = evaluate(record);
        if reasons.any() {
            pain_points.push(PainPoint {
                field: field.clone(),
                reasons,
            });
        }
    }

    debug!(
        "필드 요약 ({reason:?}): 필드={}, 고충={}",
        fields.len(),
        pain_points.len()
    );

    FieldAnalyticsEvent {
        timestamp_ms: now_ms,
        reason,
        drop_off_field: metrics.focused_field().cloned(),
        total_fields_interacted: fields.len(),
        pain_point_count: pain_points.len(),
        fields,
        pain_points,
    }
}
