//! 하트비트 스케줄러.
//!
//! 하트비트 간격(기본 30초)마다 `heartbeat` 레코드를 내보내고,
//! 상호작용한 필드가 하나 이상이면 `periodic` 요약 스냅샷을 이어서 큐에 넣는다.

use formtrace_core::models::event::{Event, HeartbeatEvent, SummaryReason};
use formtrace_core::ports::clock::Clock;
use formtrace_core::ports::sink::EventSink;
use formtrace_monitor::aggregator;
use formtrace_monitor::coalescer::StructuralCoalescer;
use formtrace_monitor::interpreter::NoticeInterpreter;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 스케줄러 설정
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// 하트비트 간격
    pub heartbeat_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
        }
    }
}

/// 하트비트 스케줄러
pub struct Scheduler {
    config: SchedulerConfig,
    interpreter: Arc<Mutex<NoticeInterpreter>>,
    sink: Arc<dyn EventSink>,
    coalescer: Option<StructuralCoalescer>,
    clock: Arc<dyn Clock>,
}

impl Scheduler {
    /// 새 스케줄러 생성
    pub fn new(
        config: SchedulerConfig,
        interpreter: Arc<Mutex<NoticeInterpreter>>,
        sink: Arc<dyn EventSink>,
        coalescer: Option<StructuralCoalescer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            interpreter,
            sink,
            coalescer,
            clock,
        }
    }

    /// 하트비트 1회: 하트비트 레코드 + (필드가 있으면) 주기 요약
    pub fn tick(&self) {
        let now = self.clock.now_ms();
        let (fields_interacted, summary) = {
            let interpreter = self.interpreter.lock();
            let metrics = interpreter.metrics();
            let summary = (!metrics.store().is_empty())
                .then(|| aggregator::summarize(metrics, SummaryReason::Periodic, now));
            (metrics.store().len(), summary)
        };
        let structural_backlog = self.coalescer.as_ref().map_or(0, |c| c.backlog());

        debug!("하트비트: 필드={fields_interacted}, 구조 적체={structural_backlog}");
        self.sink.push(Event::Heartbeat(HeartbeatEvent {
            timestamp_ms: now,
            fields_interacted,
            structural_backlog,
        }));

        if let Some(summary) = summary {
            self.sink.push(Event::FieldAnalytics(summary));
        }
    }

    /// 하트비트 루프 시작 (첫 틱은 한 간격 뒤)
    ///
    /// 런타임 밖이면 루프 없이 `None`.
    pub fn spawn(self) -> Option<JoinHandle<()>> {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("런타임 없음, 하트비트 비활성화");
            return None;
        };

        let period = self.config.heartbeat_interval;
        info!("하트비트 시작: {}ms 간격", period.as_millis());
        Some(handle.spawn(async move {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                interval.tick().await;
                self.tick();
            }
        }))
    }
}
