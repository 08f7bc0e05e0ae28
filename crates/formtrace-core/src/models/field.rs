//! 폼 필드 모델.
//!
//! 필드 식별자(요소 경로)와 필드별 상호작용 카운터를 정의.
//! 입력값 자체는 어디에도 저장하지 않는다 (길이 샘플만).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// 필드 경로 최대 길이 (문자 수)
pub const MAX_FIELD_PATH_LEN: usize = 512;

/// 필드 식별자: 폼 요소의 위치를 나타내는 안정적인 경로 문자열
///
/// 외부 경로 서술자가 생성한다. 유일성은 최선 노력 수준이며,
/// 페이지가 같은 경로의 요소로 재구성되면 충돌할 수 있다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldId(String);

impl FieldId {
    /// 경로 문자열에서 식별자 생성
    ///
    /// 빈 경로는 계측 에러. 최대 길이를 넘으면 문자 경계에서 자른다.
    pub fn new(path: impl Into<String>) -> Result<Self, CoreError> {
        let path = path.into();
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(CoreError::Instrumentation("빈 필드 경로".to_string()));
        }

        let id = match trimmed.char_indices().nth(MAX_FIELD_PATH_LEN) {
            Some((cut, _)) => trimmed[..cut].to_string(),
            None => trimmed.to_string(),
        };
        Ok(Self(id))
    }

    /// 경로 문자열 참조
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for FieldId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FieldId> for String {
    fn from(id: FieldId) -> Self {
        id.0
    }
}

/// 필드별 상호작용 카운터
///
/// 첫 상호작용 시 지연 생성되고, 세션 종료까지 제자리에서 갱신된다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMetricRecord {
    /// 포커스 진입 횟수
    pub focus_count: u32,
    /// 누적 포커스 체류 시간 (ms)
    pub total_time_spent_ms: u64,
    /// 값 변경 횟수
    pub edit_count: u32,
    /// 검증 실패 합계 (변경 시 검증 + 명시적 invalid 알림)
    ///
    /// 하나의 실패한 편집이 두 경로 모두에서 집계될 수 있다.
    pub validation_failures: u32,
    /// 변경 시점 유효성 검사에서 실패한 횟수
    pub change_validation_failures: u32,
    /// 명시적 invalid 알림 횟수
    pub invalid_notices: u32,
    /// 백스페이스/삭제 키 횟수
    pub backspace_count: u32,
    /// 붙여넣기 횟수
    pub paste_count: u32,
    /// 값 비우기 횟수 (0이 아닌 길이 → 0)
    pub clear_count: u32,
    /// 마지막으로 관찰한 값 길이 (비우기 감지 전용)
    pub last_value_length: Option<u32>,
}

impl FieldMetricRecord {
    /// 포커스 진입 기록
    pub fn record_focus(&mut self) {
        self.focus_count += 1;
    }

    /// 포커스 체류 시간 누적
    pub fn add_time_spent(&mut self, elapsed_ms: u64) {
        self.total_time_spent_ms = self.total_time_spent_ms.saturating_add(elapsed_ms);
    }

    /// 값 변경 기록
    pub fn record_edit(&mut self) {
        self.edit_count += 1;
    }

    /// 변경 시점 검증 실패 기록
    pub fn record_change_validation_failure(&mut self) {
        self.change_validation_failures += 1;
        self.validation_failures += 1;
    }

    /// 명시적 invalid 알림 기록
    pub fn record_invalid_notice(&mut self) {
        self.invalid_notices += 1;
        self.validation_failures += 1;
    }

    /// 백스페이스/삭제 기록
    pub fn record_backspace(&mut self) {
        self.backspace_count += 1;
    }

    /// 붙여넣기 기록
    pub fn record_paste(&mut self) {
        self.paste_count += 1;
    }

    /// 값 길이 샘플 관찰: 0이 아닌 길이에서 0으로 바뀌면 비우기로 집계
    ///
    /// 비우기로 집계되었으면 `true`.
    pub fn observe_value_length(&mut self, length: u32) -> bool {
        let cleared = length == 0 && matches!(self.last_value_length, Some(prev) if prev > 0);
        if cleared {
            self.clear_count += 1;
        }
        self.last_value_length = Some(length);
        cleared
    }
}
