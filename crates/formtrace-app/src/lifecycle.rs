//! 세션 라이프사이클 관리.
//!
//! `Uninitialized → Active → Stopped`. 시작 시 세션을 만들고 타이머를 무장하며,
//! 페이지 숨김/언로드/중지 시 요약과 세션 종료 레코드를 내보낸 뒤 큐를 비운다.
//! 어떤 경로에서도 에러를 호출자에게 던지지 않는다 (로그 후 흡수).

use formtrace_core::config::TrackerConfig;
use formtrace_core::error::CoreError;
use formtrace_core::models::event::{
    CapabilityFlags, Event, SessionEndEvent, SessionEndReason, SessionStartEvent,
};
use formtrace_core::models::notice::{RawNotice, StructuralNotice};
use formtrace_core::models::session::Session;
use formtrace_core::ports::clock::{Clock, SystemClock};
use formtrace_core::ports::sink::EventSink;
use formtrace_core::ports::transport::{BatchTransport, UnloadBeacon};
use formtrace_monitor::aggregator;
use formtrace_monitor::coalescer::StructuralCoalescer;
use formtrace_monitor::interpreter::NoticeInterpreter;
use formtrace_network::event_queue::{Delivery, EventQueue, QueueSettings, QueueStats};
use formtrace_network::http_transport::HttpBatchTransport;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::scheduler::{Scheduler, SchedulerConfig};

/// 호스트 기능: 시작 시 한 번 확인
#[derive(Clone, Default)]
pub struct HostCapabilities {
    /// 언로드 안전 전송 (없으면 언로드 중에도 일반 전송)
    pub beacon: Option<Arc<dyn UnloadBeacon>>,
    /// 구조 변경 관찰 가능 여부
    pub structural_changes: bool,
}

/// 트래커 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Uninitialized,
    Active,
    Stopped,
}

/// 트래커 통계
#[derive(Debug, Clone)]
pub struct TrackerStats {
    pub state: TrackerState,
    pub session_id: Option<String>,
    /// 상호작용한 필드 수
    pub fields_interacted: usize,
    /// 구조 변경 적체
    pub structural_backlog: usize,
    /// 큐 통계 (시작 전이면 None)
    pub queue: Option<QueueStats>,
}

/// 활성 세션 자원
struct ActiveSession {
    session: Session,
    queue: EventQueue,
    coalescer: Option<StructuralCoalescer>,
    heartbeat: Option<JoinHandle<()>>,
}

enum Phase {
    Uninitialized,
    Active(ActiveSession),
    Stopped { session: Session, queue: EventQueue },
}

struct TrackerInner {
    config: TrackerConfig,
    transport: Arc<dyn BatchTransport>,
    clock: Arc<dyn Clock>,
    capabilities: HostCapabilities,
    interpreter: Arc<Mutex<NoticeInterpreter>>,
    phase: Mutex<Phase>,
}

/// 폼 텔레메트리 트래커 (복제 가능한 핸들)
#[derive(Clone)]
pub struct Tracker {
    inner: Arc<TrackerInner>,
}

impl Tracker {
    /// 새 트래커 생성 (아직 시작하지 않음)
    pub fn new(
        config: TrackerConfig,
        transport: Arc<dyn BatchTransport>,
        clock: Arc<dyn Clock>,
        capabilities: HostCapabilities,
    ) -> Self {
        let interpreter = NoticeInterpreter::new(config.enable_console_wrap);
        Self {
            inner: Arc::new(TrackerInner {
                config,
                transport,
                clock,
                capabilities,
                interpreter: Arc::new(Mutex::new(interpreter)),
                phase: Mutex::new(Phase::Uninitialized),
            }),
        }
    }

    /// HTTP 전송 + 시스템 시계로 트래커 생성
    pub fn with_http(
        config: TrackerConfig,
        capabilities: HostCapabilities,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        let transport = HttpBatchTransport::new(&config.endpoint, config.request_timeout())?;
        info!("수집기 엔드포인트: {}", transport.endpoint());
        Ok(Self::new(
            config,
            Arc::new(transport),
            Arc::new(SystemClock),
            capabilities,
        ))
    }

    /// 세션 시작: 이미 시작했으면 기존 세션 반환
    ///
    /// tokio 런타임 컨텍스트 안에서 호출해야 타이머가 무장된다.
    pub fn start(&self) -> Session {
        let inner = &self.inner;
        let mut phase = inner.phase.lock();
        match &*phase {
            Phase::Active(active) => {
                debug!("이미 활성 세션: {}", active.session.session_id);
                return active.session.clone();
            }
            Phase::Stopped { session, .. } => {
                debug!("중지된 트래커, 시작 무시");
                return session.clone();
            }
            Phase::Uninitialized => {}
        }

        let config = &inner.config;
        let now = inner.clock.now_ms();
        let session = Session::new(now);

        let capabilities = &inner.capabilities;
        if capabilities.beacon.is_none() {
            info!("언로드 비콘 없음, 언로드 시에도 일반 전송 사용");
        }
        let queue = EventQueue::new(
            Delivery {
                primary: Arc::clone(&inner.transport),
                unload_beacon: capabilities.beacon.clone(),
            },
            &session,
            QueueSettings {
                batch_size: config.batch_size,
                max_batch_retries: config.max_batch_retries,
                log_events: config.debug,
            },
        );
        let sink: Arc<dyn EventSink> = Arc::new(queue.clone());

        let coalescer = if capabilities.structural_changes {
            Some(StructuralCoalescer::new(
                Arc::clone(&sink),
                Arc::clone(&inner.clock),
                config.mutation_window(),
                config.max_mutation_records_per_batch,
            ))
        } else {
            info!("구조 변경 관찰 불가, 병합기 비활성화");
            None
        };

        queue.enqueue(Event::SessionStart(SessionStartEvent {
            timestamp_ms: now,
            form_selector: config.form_selector.clone(),
            session_ttl_ms: config.session_ttl_ms,
            capabilities: CapabilityFlags {
                unload_beacon: capabilities.beacon.is_some(),
                structural_changes: coalescer.is_some(),
            },
        }));
        queue.start_periodic_flush(config.flush_interval());

        let heartbeat = Scheduler::new(
            SchedulerConfig {
                heartbeat_interval: config.heartbeat_interval(),
            },
            Arc::clone(&inner.interpreter),
            sink,
            coalescer.clone(),
            Arc::clone(&inner.clock),
        )
        .spawn();

        info!("세션 시작: {}", session.session_id);
        *phase = Phase::Active(ActiveSession {
            session: session.clone(),
            queue,
            coalescer,
            heartbeat,
        });
        session
    }

    /// 원시 알림 기록: 해석 실패는 debug 로그 후 폐기
    pub fn record(&self, notice: RawNotice) {
        let phase = self.inner.phase.lock();
        let Phase::Active(active) = &*phase else {
            return;
        };

        let at_ms = notice.at_ms();
        let result = self.inner.interpreter.lock().interpret(notice);
        match result {
            Ok(Some(event)) => active.queue.enqueue(event),
            Ok(None) => {}
            Err(e) => debug!(at_ms, "알림 폐기: {e}"),
        }
    }

    /// 구조 변경 알림 전달 (병합기 비활성화 시 무시)
    pub fn on_structural_changes(&self, notices: Vec<StructuralNotice>) {
        let phase = self.inner.phase.lock();
        if let Phase::Active(ActiveSession {
            coalescer: Some(coalescer),
            ..
        }) = &*phase
        {
            coalescer.on_change_notices(notices);
        }
    }

    /// 페이지 숨김: 언로드 표시, 요약 + 세션 종료, 즉시 플러시 (반복 가능)
    pub async fn page_hidden(&self) {
        self.end_session(SessionEndReason::Hidden).await;
    }

    /// 페이지 다시 보임: 언로드 표시 해제
    pub fn page_visible(&self) {
        if let Phase::Active(active) = &*self.inner.phase.lock() {
            active.queue.set_unloading(false);
            debug!("페이지 다시 보임, 일반 전송 복귀");
        }
    }

    /// 언로드: 숨김과 같은 흐름, 사유만 `unload`
    pub async fn unload(&self) {
        self.end_session(SessionEndReason::Unload).await;
    }

    /// 중지: 관찰/타이머 해제, 요약 + 세션 종료, 플러시 후 `Stopped` (종단)
    pub async fn stop(&self) {
        let queue = {
            let mut phase = self.inner.phase.lock();
            let mut active = match std::mem::replace(&mut *phase, Phase::Uninitialized) {
                Phase::Active(active) => active,
                other => {
                    *phase = other;
                    return;
                }
            };

            if let Some(coalescer) = &active.coalescer {
                coalescer.disconnect();
            }
            if let Some(heartbeat) = active.heartbeat.take() {
                heartbeat.abort();
            }
            active.queue.stop_periodic_flush();

            self.emit_terminal_records(&active.session, &active.queue, SessionEndReason::Stop);
            active.session.is_active = false;

            let queue = active.queue.clone();
            info!("세션 중지: {}", active.session.session_id);
            *phase = Phase::Stopped {
                session: active.session,
                queue: active.queue,
            };
            queue
        };

        let delivered = queue.flush_all().await;
        debug!("중지 플러시: {delivered}개 전달");
    }

    /// 현재 상태
    pub fn state(&self) -> TrackerState {
        match &*self.inner.phase.lock() {
            Phase::Uninitialized => TrackerState::Uninitialized,
            Phase::Active(_) => TrackerState::Active,
            Phase::Stopped { .. } => TrackerState::Stopped,
        }
    }

    /// 현재 세션 (시작 전이면 None)
    pub fn session(&self) -> Option<Session> {
        match &*self.inner.phase.lock() {
            Phase::Uninitialized => None,
            Phase::Active(active) => Some(active.session.clone()),
            Phase::Stopped { session, .. } => Some(session.clone()),
        }
    }

    /// 트래커 통계
    pub fn stats(&self) -> TrackerStats {
        let fields_interacted = self.inner.interpreter.lock().metrics().store().len();
        let phase = self.inner.phase.lock();
        let (state, session_id, structural_backlog, queue) = match &*phase {
            Phase::Uninitialized => (TrackerState::Uninitialized, None, 0, None),
            Phase::Active(active) => (
                TrackerState::Active,
                Some(active.session.session_id.clone()),
                active.coalescer.as_ref().map_or(0, |c| c.backlog()),
                Some(active.queue.stats()),
            ),
            Phase::Stopped { session, queue } => (
                TrackerState::Stopped,
                Some(session.session_id.clone()),
                0,
                Some(queue.stats()),
            ),
        };
        TrackerStats {
            state,
            session_id,
            fields_interacted,
            structural_backlog,
            queue,
        }
    }

    /// 숨김/언로드 공통 흐름: 상태는 `Active` 유지
    async fn end_session(&self, reason: SessionEndReason) {
        let queue = {
            let phase = self.inner.phase.lock();
            let Phase::Active(active) = &*phase else {
                return;
            };
            active.queue.set_unloading(true);
            self.emit_terminal_records(&active.session, &active.queue, reason);
            active.queue.clone()
        };

        let delivered = queue.flush_all().await;
        if !queue.is_empty() {
            warn!("{reason:?} 플러시 후 남은 레코드: {}개", queue.len());
        }
        debug!("{reason:?} 플러시: {delivered}개 전달");
    }

    /// 요약(사유 동일) → 세션 종료 순서로 큐에 추가
    fn emit_terminal_records(
        &self,
        session: &Session,
        queue: &EventQueue,
        reason: SessionEndReason,
    ) {
        let now = self.inner.clock.now_ms();
        let summary = {
            let interpreter = self.inner.interpreter.lock();
            aggregator::summarize(interpreter.metrics(), reason.into(), now)
        };
        info!(
            "필드 요약 ({reason:?}): 필드={}, 고충={}, 이탈={:?}",
            summary.total_fields_interacted,
            summary.pain_point_count,
            summary.drop_off_field.as_ref().map(|f| f.as_str())
        );
        queue.enqueue(Event::FieldAnalytics(summary));
        queue.enqueue(Event::SessionEnd(SessionEndEvent {
            timestamp_ms: now,
            reason,
            duration_ms: session.elapsed_ms(now),
        }));
    }
}
