//! 시계 포트.
//!
//! 라이프사이클이 만드는 레코드(세션 시작/종료, 하트비트, 요약)의 시각 출처.
//! 원시 알림은 호스트가 찍은 시각을 그대로 쓴다.

/// 밀리초 단위 벽시계
pub trait Clock: Send + Sync {
    /// 현재 시각 (Unix epoch ms)
    fn now_ms(&self) -> i64;
}

/// 시스템 시계 (chrono)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
