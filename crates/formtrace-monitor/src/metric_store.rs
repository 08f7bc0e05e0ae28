//! 필드 메트릭 저장소.
//!
//! 필드 식별자 → 카운터 레코드 매핑. 레코드는 지연 생성되고 삭제되지 않는다
//! (크기는 페이지의 서로 다른 필드 수로 제한됨).
//! 입력 포커스는 한 요소만 가질 수 있으므로 포커스 상태는 필드별이 아니라 하나만 둔다.

use formtrace_core::models::field::{FieldId, FieldMetricRecord};
use std::collections::HashMap;

/// 필드별 카운터 저장소
#[derive(Debug, Default)]
pub struct MetricStore {
    records: HashMap<FieldId, FieldMetricRecord>,
}

impl MetricStore {
    /// 빈 저장소 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 레코드 조회, 없으면 생성 (멱등)
    pub fn get_or_create(&mut self, field: &FieldId) -> &mut FieldMetricRecord {
        self.records.entry(field.clone()).or_default()
    }

    /// 레코드 조회
    pub fn get(&self, field: &FieldId) -> Option<&FieldMetricRecord> {
        self.records.get(field)
    }

    /// 상호작용한 필드 수
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 상호작용한 필드가 없는지
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 필드 ID 순으로 정렬된 순회 (출력 순서 고정)
    pub fn iter(&self) -> impl Iterator<Item = (&FieldId, &FieldMetricRecord)> {
        let mut entries: Vec<_> = self.records.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter()
    }
}

/// 현재 포커스 구간
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusState {
    pub field: FieldId,
    pub started_at_ms: i64,
}

/// 저장소 + 포커스 상태: 집계기가 읽는 단위
#[derive(Debug, Default)]
pub struct FieldMetrics {
    store: MetricStore,
    focused: Option<FocusState>,
}

impl FieldMetrics {
    /// 빈 상태 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 포커스 진입: 이전 포커스가 이탈 없이 남아 있으면 시간 누적 없이 교체
    pub fn focus(&mut self, field: &FieldId, at_ms: i64) -> &FieldMetricRecord {
        self.focused = Some(FocusState {
            field: field.clone(),
            started_at_ms: at_ms,
        });
        let record = self.store.get_or_create(field);
        record.record_focus();
        record
    }

    /// 포커스 이탈: 현재 포커스 필드일 때만 경과 시간 누적
    ///
    /// 이번 구간 길이(ms)와 갱신된 레코드를 반환.
    pub fn blur(&mut self, field: &FieldId, at_ms: i64) -> (u64, &FieldMetricRecord) {
        let elapsed = match self.focused.take() {
            Some(state) if &state.field == field => {
                u64::try_from(at_ms.saturating_sub(state.started_at_ms)).unwrap_or(0)
            }
            other => {
                self.focused = other;
                0
            }
        };

        let record = self.store.get_or_create(field);
        record.add_time_spent(elapsed);
        (elapsed, record)
    }

    /// 현재 포커스 필드
    pub fn focused_field(&self) -> Option<&FieldId> {
        self.focused.as_ref().map(|state| &state.field)
    }

    /// 레코드 조회/생성
    pub fn record_mut(&mut self, field: &FieldId) -> &mut FieldMetricRecord {
        self.store.get_or_create(field)
    }

    /// 저장소 읽기 접근
    pub fn store(&self) -> &MetricStore {
        &self.store
    }
}
