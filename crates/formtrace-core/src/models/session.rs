//! 세션 모델.
//!
//! 페이지 인스턴스당 하나의 수집 세션.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 수집 세션 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// 세션 고유 ID (UUID v4)
    pub session_id: String,
    /// 세션 시작 시각 (ms)
    pub started_at: i64,
    /// 활성 여부 (stop 시 해제)
    pub is_active: bool,
}

impl Session {
    /// 새 활성 세션 생성
    pub fn new(started_at: i64) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            started_at,
            is_active: true,
        }
    }

    /// 시작 이후 경과 시간 (ms, 시계 역행 시 0)
    pub fn elapsed_ms(&self, now_ms: i64) -> u64 {
        u64::try_from(now_ms.saturating_sub(self.started_at)).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_active_with_unique_id() {
        let a = Session::new(1_000);
        let b = Session::new(1_000);
        assert!(a.is_active);
        assert_ne!(a.session_id, b.session_id);
        assert_eq!(a.started_at, 1_000);
    }

    #[test]
    fn elapsed_clamps_clock_skew() {
        let session = Session::new(1_000);
        assert_eq!(session.elapsed_ms(1_500), 500);
        assert_eq!(session.elapsed_ms(900), 0);
    }

    #[test]
    fn elapsed_saturates_on_extreme_timestamps() {
        let session = Session::new(i64::MIN);
        assert_eq!(session.elapsed_ms(i64::MAX), i64::MAX as u64);

        let session = Session::new(i64::MAX);
        assert_eq!(session.elapsed_ms(i64::MIN), 0);
    }
}
