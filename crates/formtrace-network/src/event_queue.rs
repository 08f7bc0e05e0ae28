//! 이벤트 큐.
//!
//! 레코드를 도착 순서대로 버퍼에 모아 배치로 수집기에 전송.
//! 크기 임계값 도달 시 즉시, 그 외에는 주기 타이머/라이프사이클 트리거로 플러시한다.
//! 전송 계층 실패 시 배치를 큐 앞쪽에 되돌려 시간 순서를 유지한다 (최선 노력 전달).

use formtrace_core::error::CoreError;
use formtrace_core::models::event::{Event, OutboundBatch};
use formtrace_core::models::session::Session;
use formtrace_core::ports::sink::EventSink;
use formtrace_core::ports::transport::{BatchTransport, UnloadBeacon};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// 시작 시 한 번 선택되는 전송 전략
#[derive(Clone)]
pub struct Delivery {
    /// 기본 전송 (HTTP)
    pub primary: Arc<dyn BatchTransport>,
    /// 언로드 안전 전송 (호스트가 지원할 때만)
    pub unload_beacon: Option<Arc<dyn UnloadBeacon>>,
}

/// 큐 설정
#[derive(Debug, Clone)]
pub struct QueueSettings {
    /// 배치당 최대 레코드 수
    pub batch_size: usize,
    /// 레코드당 최대 재큐잉 횟수 (None = 무제한)
    pub max_batch_retries: Option<u32>,
    /// 큐에 들어가는 레코드마다 debug 로그
    pub log_events: bool,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            batch_size: 25,
            max_batch_retries: None,
            log_events: false,
        }
    }
}

/// 대기 레코드: 재큐잉 횟수 추적
struct PendingEvent {
    event: Event,
    attempts: u32,
}

/// 큐에서 꺼낸 배치 (레코드별 시도 횟수 보존)
struct TakenBatch {
    batch: OutboundBatch,
    attempts: Vec<u32>,
}

#[derive(Default)]
struct QueueState {
    buffer: VecDeque<PendingEvent>,
    next_seq: u64,
}

#[derive(Default)]
struct QueueCounters {
    batches_sent: AtomicU64,
    batches_beaconed: AtomicU64,
    batches_rejected: AtomicU64,
    transport_failures: AtomicU64,
    records_requeued: AtomicU64,
    records_dropped: AtomicU64,
}

struct QueueInner {
    delivery: Delivery,
    session_id: String,
    session_started_at: i64,
    settings: QueueSettings,
    state: Mutex<QueueState>,
    unloading: AtomicBool,
    periodic: Mutex<Option<JoinHandle<()>>>,
    counters: QueueCounters,
}

/// 이벤트 큐 (복제 가능한 핸들)
#[derive(Clone)]
pub struct EventQueue {
    inner: Arc<QueueInner>,
}

impl EventQueue {
    /// 새 이벤트 큐 생성
    pub fn new(delivery: Delivery, session: &Session, settings: QueueSettings) -> Self {
        let settings = QueueSettings {
            batch_size: settings.batch_size.max(1),
            ..settings
        };
        Self {
            inner: Arc::new(QueueInner {
                delivery,
                session_id: session.session_id.clone(),
                session_started_at: session.started_at,
                settings,
                state: Mutex::new(QueueState::default()),
                unloading: AtomicBool::new(false),
                periodic: Mutex::new(None),
                counters: QueueCounters::default(),
            }),
        }
    }

    /// 레코드를 뒤에 추가: 배치 크기에 도달하면 즉시 플러시 시작
    ///
    /// 배치는 호출 중에 동기적으로 꺼내고, 전송만 비동기로 진행한다.
    pub fn enqueue(&self, event: Event) {
        if self.inner.settings.log_events {
            debug!(kind = event.kind(), ts = event.timestamp_ms(), "이벤트 큐 추가");
        }

        let taken = {
            let mut state = self.inner.state.lock();
            state.buffer.push_back(PendingEvent { event, attempts: 0 });
            if state.buffer.len() >= self.inner.settings.batch_size {
                self.inner.take_batch(&mut state)
            } else {
                None
            }
        };

        let Some(taken) = taken else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let queue = self.clone();
                handle.spawn(async move {
                    let _ = queue.deliver(taken).await;
                });
            }
            Err(_) => {
                // 런타임 밖 호출: 다음 주기 플러시에 맡김
                warn!("런타임 없음, 즉시 플러시 연기");
                self.inner.restore_front(taken.batch.events.into_iter().zip(taken.attempts));
            }
        }
    }

    /// 앞쪽에서 최대 `batch_size`개를 꺼내 배치 하나를 전송
    ///
    /// 빈 큐면 `Ok(0)`. 전달(비콘 수락 포함)된 레코드 수를 반환.
    pub async fn flush(&self) -> Result<usize, CoreError> {
        let taken = {
            let mut state = self.inner.state.lock();
            self.inner.take_batch(&mut state)
        };
        match taken {
            Some(taken) => self.deliver(taken).await,
            None => Ok(0),
        }
    }

    /// 큐가 빌 때까지 반복 플러시
    ///
    /// 전송 실패(재큐잉)에서만 중단하고, 거부된 배치는 버린 채 다음 배치로 진행.
    pub async fn flush_all(&self) -> usize {
        let mut delivered = 0;
        loop {
            match self.flush().await {
                Ok(0) => break,
                Ok(count) => delivered += count,
                Err(e) if e.is_transport_failure() => break,
                Err(_) => {}
            }
        }
        delivered
    }

    /// 배치 전달: 언로드 중이면 비콘 우선, 아니면(또는 비콘 거부 시) 기본 전송
    async fn deliver(&self, taken: TakenBatch) -> Result<usize, CoreError> {
        let count = taken.batch.events.len();
        let seq = taken.batch.batch_seq;
        let counters = &self.inner.counters;

        if self.is_unloading() {
            if let Some(beacon) = &self.inner.delivery.unload_beacon {
                match serde_json::to_vec(&taken.batch) {
                    Ok(body) => {
                        if beacon.send_beacon(body) {
                            counters.batches_beaconed.fetch_add(1, Ordering::Relaxed);
                            debug!("비콘 전송 수락: 배치 #{seq}, {count}개");
                            return Ok(count);
                        }
                        debug!("비콘 거부, 일반 전송으로 폴백: 배치 #{seq}");
                    }
                    Err(e) => {
                        error!("배치 직렬화 실패, 폐기: {e}");
                        counters
                            .records_dropped
                            .fetch_add(count as u64, Ordering::Relaxed);
                        return Err(e.into());
                    }
                }
            }
        }

        match self.inner.delivery.primary.send(&taken.batch).await {
            Ok(()) => {
                counters.batches_sent.fetch_add(1, Ordering::Relaxed);
                debug!("배치 전송 성공: #{seq}, {count}개");
                Ok(count)
            }
            Err(e) if e.is_transport_failure() => {
                counters.transport_failures.fetch_add(1, Ordering::Relaxed);
                warn!("배치 전송 실패, 재큐잉: #{seq}: {e}");
                self.requeue_failed(taken);
                Err(e)
            }
            Err(e) => {
                // 수집기 응답 에러는 재시도하지 않음
                counters.batches_rejected.fetch_add(1, Ordering::Relaxed);
                warn!("배치 거부됨 (재시도 안 함): #{seq}: {e}");
                Err(e)
            }
        }
    }

    /// 실패한 배치를 큐 앞쪽에 원래 순서로 되돌림 (재시도 상한 초과분은 폐기)
    fn requeue_failed(&self, taken: TakenBatch) {
        let cap = self.inner.settings.max_batch_retries;
        let mut dropped = 0u64;
        let kept: Vec<(Event, u32)> = taken
            .batch
            .events
            .into_iter()
            .zip(taken.attempts)
            .filter_map(|(event, attempts)| {
                let attempts = attempts + 1;
                match cap {
                    Some(max) if attempts > max => {
                        dropped += 1;
                        None
                    }
                    _ => Some((event, attempts)),
                }
            })
            .collect();

        let counters = &self.inner.counters;
        counters
            .records_requeued
            .fetch_add(kept.len() as u64, Ordering::Relaxed);
        if dropped > 0 {
            counters.records_dropped.fetch_add(dropped, Ordering::Relaxed);
            warn!("재시도 상한 초과 레코드 {dropped}개 폐기");
        }
        self.inner.restore_front(kept);
    }

    /// 주기 플러시 타이머 시작 (이미 실행 중이면 무시)
    pub fn start_periodic_flush(&self, interval: Duration) {
        let mut periodic = self.inner.periodic.lock();
        if periodic.is_some() {
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("런타임 없음, 주기 플러시 비활성화");
            return;
        };
        let weak: Weak<QueueInner> = Arc::downgrade(&self.inner);
        *periodic = Some(handle.spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let _ = EventQueue { inner }.flush().await;
            }
        }));
        debug!("주기 플러시 시작: {}ms", interval.as_millis());
    }

    /// 주기 플러시 타이머 취소
    pub fn stop_periodic_flush(&self) {
        if let Some(handle) = self.inner.periodic.lock().take() {
            handle.abort();
            debug!("주기 플러시 중지");
        }
    }

    /// 언로드 상태 설정 (비콘 우선 전송 여부)
    pub fn set_unloading(&self, unloading: bool) {
        self.inner.unloading.store(unloading, Ordering::Relaxed);
    }

    /// 언로드 상태 여부
    pub fn is_unloading(&self) -> bool {
        self.inner.unloading.load(Ordering::Relaxed)
    }

    /// 현재 큐 크기
    pub fn len(&self) -> usize {
        self.inner.state.lock().buffer.len()
    }

    /// 큐가 비었는지
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 큐 통계
    pub fn stats(&self) -> QueueStats {
        let c = &self.inner.counters;
        QueueStats {
            queue_size: self.len(),
            batch_size: self.inner.settings.batch_size,
            batches_sent: c.batches_sent.load(Ordering::Relaxed),
            batches_beaconed: c.batches_beaconed.load(Ordering::Relaxed),
            batches_rejected: c.batches_rejected.load(Ordering::Relaxed),
            transport_failures: c.transport_failures.load(Ordering::Relaxed),
            records_requeued: c.records_requeued.load(Ordering::Relaxed),
            records_dropped: c.records_dropped.load(Ordering::Relaxed),
        }
    }
}

impl QueueInner {
    /// 앞쪽에서 최대 `batch_size`개를 꺼내 배치 구성 (빈 큐면 None)
    fn take_batch(&self, state: &mut QueueState) -> Option<TakenBatch> {
        if state.buffer.is_empty() {
            return None;
        }

        let take = state.buffer.len().min(self.settings.batch_size);
        let (events, attempts): (Vec<Event>, Vec<u32>) = state
            .buffer
            .drain(..take)
            .map(|p| (p.event, p.attempts))
            .unzip();

        let batch_seq = state.next_seq;
        state.next_seq += 1;

        Some(TakenBatch {
            batch: OutboundBatch {
                session_id: self.session_id.clone(),
                session_started_at: self.session_started_at,
                batch_seq,
                events,
            },
            attempts,
        })
    }

    /// 레코드들을 원래 상대 순서대로 버퍼 앞에 삽입
    fn restore_front(&self, records: impl IntoIterator<Item = (Event, u32)>) {
        let records: Vec<_> = records.into_iter().collect();
        let mut state = self.state.lock();
        for (event, attempts) in records.into_iter().rev() {
            state.buffer.push_front(PendingEvent { event, attempts });
        }
    }
}

impl EventSink for EventQueue {
    fn push(&self, event: Event) {
        self.enqueue(event);
    }
}

/// 이벤트 큐 통계
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStats {
    /// 현재 큐 크기
    pub queue_size: usize,
    /// 배치 크기
    pub batch_size: usize,
    /// 기본 전송 성공 배치 수
    pub batches_sent: u64,
    /// 비콘 수락 배치 수
    pub batches_beaconed: u64,
    /// 수집기가 거부한 배치 수 (재시도 안 함)
    pub batches_rejected: u64,
    /// 전송 계층 실패 횟수
    pub transport_failures: u64,
    /// 재큐잉된 레코드 수 (누적)
    pub records_requeued: u64,
    /// 폐기된 레코드 수 (재시도 상한/직렬화 실패)
    pub records_dropped: u64,
}
