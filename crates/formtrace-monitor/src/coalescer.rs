//! 구조 변경 병합기.
//!
//! 고빈도 구조/속성 변경 알림을 버퍼에 모았다가 병합 창마다 일정 개수씩만
//! 하나의 `structural-change` 레코드로 내보낸다 (조건부 필드 렌더링 등 대량 DOM 재작성 시
//! 이벤트 큐 범람 방지).
//!
//! 배출 후 타이머는 해제되고, 남은 적체는 다음 알림이 타이머를 다시 무장할 때 이어서 배출된다.
//! 버퍼는 크기 제한이 없다. 적체 크기는 [`StructuralCoalescer::backlog`]와
//! 각 레코드의 `backlog` 필드로 관찰할 수 있다.

use formtrace_core::models::event::{Event, StructuralChangeEvent};
use formtrace_core::models::notice::StructuralNotice;
use formtrace_core::ports::clock::Clock;
use formtrace_core::ports::sink::EventSink;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 병합기 상태: 버퍼와 단일 대기 타이머
#[derive(Default)]
struct CoalescerState {
    buffer: VecDeque<StructuralNotice>,
    /// 대기 중인 타이머 (최대 1개)
    timer: Option<JoinHandle<()>>,
    disconnected: bool,
}

struct CoalescerInner {
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    window: Duration,
    max_per_batch: usize,
    state: Mutex<CoalescerState>,
}

/// 구조 변경 병합기 (복제 가능한 핸들)
#[derive(Clone)]
pub struct StructuralCoalescer {
    inner: Arc<CoalescerInner>,
}

impl StructuralCoalescer {
    /// 새 병합기 생성
    ///
    /// `window`: 병합 창, `max_per_batch`: 창당 최대 배출 수
    pub fn new(
        sink: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
        window: Duration,
        max_per_batch: usize,
    ) -> Self {
        Self {
            inner: Arc::new(CoalescerInner {
                sink,
                clock,
                window,
                max_per_batch: max_per_batch.max(1),
                state: Mutex::new(CoalescerState::default()),
            }),
        }
    }

    /// 변경 알림 수신: 버퍼에 추가하고, 대기 타이머가 없으면 무장
    ///
    /// tokio 런타임 컨텍스트 안에서 호출해야 한다.
    pub fn on_change_notices(&self, notices: Vec<StructuralNotice>) {
        if notices.is_empty() {
            return;
        }

        let mut state = self.inner.state.lock();
        if state.disconnected {
            return;
        }
        state.buffer.extend(notices);
        if state.timer.is_none() {
            state.timer = CoalescerInner::arm(&self.inner);
        }
        debug!("구조 변경 버퍼: {}개", state.buffer.len());
    }

    /// 현재 적체 크기
    pub fn backlog(&self) -> usize {
        self.inner.state.lock().buffer.len()
    }

    /// 타이머 대기 중인지
    pub fn is_armed(&self) -> bool {
        self.inner.state.lock().timer.is_some()
    }

    /// 연결 해제: 대기 타이머 취소, 이후 알림 무시
    pub fn disconnect(&self) {
        let mut state = self.inner.state.lock();
        if state.disconnected {
            return;
        }
        state.disconnected = true;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        info!("구조 변경 관찰 해제 (남은 적체 {}개)", state.buffer.len());
    }

    /// 연결 상태
    pub fn is_connected(&self) -> bool {
        !self.inner.state.lock().disconnected
    }
}

impl CoalescerInner {
    /// 병합 창 타이머 무장 (런타임 밖이면 무장하지 않고 다음 알림에 맡김)
    fn arm(inner: &Arc<Self>) -> Option<JoinHandle<()>> {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("런타임 없음, 병합 타이머 무장 보류");
            return None;
        };
        let inner = Arc::clone(inner);
        Some(handle.spawn(async move {
            tokio::time::sleep(inner.window).await;
            Self::drain(&inner);
        }))
    }

    /// 버퍼 앞쪽에서 최대 `max_per_batch`개를 꺼내 레코드 하나로 배출 (타이머 해제)
    fn drain(inner: &Arc<Self>) {
        let event = {
            let mut state = inner.state.lock();
            state.timer = None;
            if state.disconnected {
                return;
            }

            let take = state.buffer.len().min(inner.max_per_batch);
            let changes: Vec<StructuralNotice> = state.buffer.drain(..take).collect();
            let backlog = state.buffer.len();

            if changes.is_empty() {
                return;
            }
            debug!("구조 변경 배출: {}개, 남은 적체 {backlog}개", changes.len());

            Event::StructuralChange(StructuralChangeEvent {
                timestamp_ms: inner.clock.now_ms(),
                changes,
                backlog,
            })
        };

        inner.sink.push(event);
    }
}
