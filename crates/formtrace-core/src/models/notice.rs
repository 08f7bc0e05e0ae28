//! 원시 알림 모델.
//!
//! 호스트(페이지)의 이벤트 생산자가 만들어 트래커로 밀어 넣는 데이터.
//! 필드 경로는 외부 경로 서술자의 출력을 그대로 담고, 검증은 해석 단계에서 한다.
//! 어떤 알림도 입력값 원문을 담지 않는다: 값은 [`ValueSummary`]로만 전달된다.

use serde::{Deserialize, Serialize};

/// 값 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Empty,
    Numeric,
    Alpha,
    Alphanum,
    Other,
}

/// 입력값 요약: 길이와 문자 분류만
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSummary {
    /// 문자 수
    pub length: u32,
    /// 문자 분류
    pub kind: ValueKind,
}

impl ValueSummary {
    /// 값에서 요약 도출 (값 자체는 보관하지 않음)
    pub fn of(value: &str) -> Self {
        let length = u32::try_from(value.chars().count()).unwrap_or(u32::MAX);
        let kind = if value.is_empty() {
            ValueKind::Empty
        } else if value.chars().all(|c| c.is_ascii_digit()) {
            ValueKind::Numeric
        } else if value.chars().all(char::is_alphabetic) {
            ValueKind::Alpha
        } else if value.chars().all(char::is_alphanumeric) {
            ValueKind::Alphanum
        } else {
            ValueKind::Other
        };
        Self { length, kind }
    }
}

/// 변경 시점 유효성 검사 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validity {
    /// 유효 여부
    pub valid: bool,
    /// 실패 플래그 (예: "valueMissing", "typeMismatch")
    #[serde(default)]
    pub flags: Vec<String>,
}

impl Default for Validity {
    fn default() -> Self {
        Self {
            valid: true,
            flags: Vec::new(),
        }
    }
}

/// 수정 키
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditKey {
    Backspace,
    Delete,
}

/// 에러 출처
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSource {
    /// 콘솔 에러 래핑
    Console,
    /// 전역 에러/미처리 거부
    Window,
    /// 네트워크 요청 래핑
    Network,
    /// 명시적 invalid 알림
    Validation,
}

/// 구조/속성 변경 알림
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StructuralNotice {
    /// 요소 추가
    Added { path: String, tag: String },
    /// 요소 제거
    Removed { path: String, tag: String },
    /// 속성 변경
    Attribute { path: String, attribute: String },
}

impl StructuralNotice {
    /// 대상 요소 경로
    pub fn path(&self) -> &str {
        match self {
            Self::Added { path, .. } | Self::Removed { path, .. } | Self::Attribute { path, .. } => {
                path
            }
        }
    }
}

/// 상호작용 원시 알림
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RawNotice {
    /// 포커스 진입
    #[serde(rename_all = "camelCase")]
    Focus { field: String, at_ms: i64 },
    /// 포커스 이탈
    #[serde(rename_all = "camelCase")]
    Blur { field: String, at_ms: i64 },
    /// 값 변경 (검증 결과 포함)
    #[serde(rename_all = "camelCase")]
    Change {
        field: String,
        at_ms: i64,
        #[serde(default)]
        summary: Option<ValueSummary>,
        #[serde(default)]
        validity: Validity,
    },
    /// 명시적 invalid 알림
    #[serde(rename_all = "camelCase")]
    Invalid {
        field: String,
        at_ms: i64,
        #[serde(default)]
        flags: Vec<String>,
    },
    /// 백스페이스/삭제 키
    #[serde(rename_all = "camelCase")]
    KeyDown {
        field: String,
        at_ms: i64,
        key: EditKey,
    },
    /// 붙여넣기 (내용 제외)
    #[serde(rename_all = "camelCase")]
    Paste { field: String, at_ms: i64 },
    /// 클릭 기반 단계 전환 추정
    #[serde(rename_all = "camelCase")]
    StepClick {
        at_ms: i64,
        #[serde(default)]
        from: Option<String>,
        #[serde(default)]
        to: Option<String>,
        trigger: String,
    },
    /// 콘솔/전역/네트워크 에러 래퍼 출력
    #[serde(rename_all = "camelCase")]
    HostError {
        at_ms: i64,
        source: ErrorSource,
        message: String,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        status: Option<u16>,
    },
}

impl RawNotice {
    /// 알림 발생 시각 (ms)
    pub fn at_ms(&self) -> i64 {
        match self {
            Self::Focus { at_ms, .. }
            | Self::Blur { at_ms, .. }
            | Self::Change { at_ms, .. }
            | Self::Invalid { at_ms, .. }
            | Self::KeyDown { at_ms, .. }
            | Self::Paste { at_ms, .. }
            | Self::StepClick { at_ms, .. }
            | Self::HostError { at_ms, .. } => *at_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_summary_kinds() {
        assert_eq!(ValueSummary::of("").kind, ValueKind::Empty);
        assert_eq!(ValueSummary::of("01234").kind, ValueKind::Numeric);
        assert_eq!(ValueSummary::of("Kim").kind, ValueKind::Alpha);
        assert_eq!(ValueSummary::of("a1b2").kind, ValueKind::Alphanum);
        assert_eq!(ValueSummary::of("a@b.c").kind, ValueKind::Other);
        assert_eq!(ValueSummary::of("한글").length, 2);
    }

    #[test]
    fn change_notice_from_json_uses_defaults() {
        let notice: RawNotice =
            serde_json::from_str(r#"{"type":"change","field":"form>input","atMs":42}"#).unwrap();
        match notice {
            RawNotice::Change {
                summary, validity, ..
            } => {
                assert!(summary.is_none());
                assert!(validity.valid);
            }
            other => panic!("unexpected notice: {other:?}"),
        }
    }

    #[test]
    fn key_down_notice_from_json() {
        let notice: RawNotice = serde_json::from_str(
            r#"{"type":"keyDown","field":"form>input","atMs":7,"key":"delete"}"#,
        )
        .unwrap();
        assert_eq!(notice.at_ms(), 7);
        assert!(matches!(
            notice,
            RawNotice::KeyDown {
                key: EditKey::Delete,
                ..
            }
        ));
    }

    #[test]
    fn structural_notice_path() {
        let notice = StructuralNotice::Attribute {
            path: "form>div:nth-child(2)".to_string(),
            attribute: "hidden".to_string(),
        };
        assert_eq!(notice.path(), "form>div:nth-child(2)");
    }
}
