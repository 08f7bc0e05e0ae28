//! 트래커 전체 흐름 통합 테스트.
//!
//! 알림 → 해석 → 큐 → 전송 경로를 모의 전송으로 검증.

use async_trait::async_trait;
use formtrace_app::lifecycle::{HostCapabilities, Tracker, TrackerState};
use formtrace_core::config::TrackerConfig;
use formtrace_core::error::CoreError;
use formtrace_core::models::event::{Event, OutboundBatch, PainReasons, SummaryReason};
use formtrace_core::models::notice::{RawNotice, StructuralNotice, ValueSummary, Validity};
use formtrace_core::ports::clock::Clock;
use formtrace_core::ports::transport::{BatchTransport, UnloadBeacon};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct MockTransport {
    batches: Mutex<Vec<OutboundBatch>>,
    failing: AtomicBool,
}

#[async_trait]
impl BatchTransport for MockTransport {
    async fn send(&self, batch: &OutboundBatch) -> Result<(), CoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CoreError::Network("connection refused".to_string()));
        }
        self.batches.lock().push(batch.clone());
        Ok(())
    }
}

impl MockTransport {
    fn events(&self) -> Vec<Event> {
        self.batches
            .lock()
            .iter()
            .flat_map(|b| b.events.clone())
            .collect()
    }

    fn kinds(&self) -> Vec<&'static str> {
        self.events().iter().map(Event::kind).collect()
    }
}

#[derive(Default)]
struct MockBeacon {
    bodies: Mutex<Vec<Vec<u8>>>,
}

impl UnloadBeacon for MockBeacon {
    fn send_beacon(&self, body: Vec<u8>) -> bool {
        self.bodies.lock().push(body);
        true
    }
}

#[derive(Default)]
struct ManualClock(AtomicI64);

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

fn setup(
    config: TrackerConfig,
    capabilities: HostCapabilities,
) -> (Arc<MockTransport>, Arc<ManualClock>, Tracker) {
    let transport = Arc::new(MockTransport::default());
    let clock = Arc::new(ManualClock::default());
    let tracker = Tracker::new(config, transport.clone(), clock.clone(), capabilities);
    (transport, clock, tracker)
}

fn change(field: &str, at_ms: i64, value: &str, valid: bool) -> RawNotice {
    RawNotice::Change {
        field: field.to_string(),
        at_ms,
        summary: Some(ValueSummary::of(value)),
        validity: Validity {
            valid,
            flags: if valid {
                Vec::new()
            } else {
                vec!["typeMismatch".to_string()]
            },
        },
    }
}

#[tokio::test(start_paused = true)]
async fn focus_edit_blur_reports_cumulative_counters() {
    let (transport, _clock, tracker) = setup(TrackerConfig::default(), HostCapabilities::default());
    tracker.start();

    let email = "form>input#email";
    tracker.record(RawNotice::Focus {
        field: email.to_string(),
        at_ms: 0,
    });
    tracker.record(change(email, 100, "a", true));
    tracker.record(change(email, 200, "ab", true));
    tracker.record(change(email, 300, "ab@", false));
    tracker.record(RawNotice::Blur {
        field: email.to_string(),
        at_ms: 500,
    });
    tracker.stop().await;

    let blur = transport
        .events()
        .into_iter()
        .find_map(|e| match e {
            Event::Blur(blur) => Some(blur),
            _ => None,
        })
        .expect("blur record");
    assert_eq!(blur.edit_count, 3);
    assert_eq!(blur.validation_failures, 1);
    assert_eq!(blur.time_spent_ms, 500);
    assert_eq!(blur.focus_duration_ms, 500);
}

#[tokio::test(start_paused = true)]
async fn periodic_summary_flags_many_edits_only() {
    let config = TrackerConfig {
        heartbeat_interval_ms: 1_000,
        ..TrackerConfig::default()
    };
    let (transport, _clock, tracker) = setup(config, HostCapabilities::default());
    tracker.start();

    for i in 0..6 {
        tracker.record(change("form>input#b", i * 10, "x", true));
    }
    tokio::time::sleep(Duration::from_millis(1_001)).await;
    tracker.stop().await;

    let periodic = transport
        .events()
        .into_iter()
        .find_map(|e| match e {
            Event::FieldAnalytics(s) if s.reason == SummaryReason::Periodic => Some(s),
            _ => None,
        })
        .expect("periodic summary");
    assert_eq!(periodic.pain_point_count, 1);
    assert_eq!(periodic.pain_points[0].field.as_str(), "form>input#b");
    assert_eq!(
        periodic.pain_points[0].reasons,
        PainReasons {
            many_edits: true,
            ..PainReasons::default()
        }
    );
    assert!(periodic.drop_off_field.is_none());
}

#[tokio::test(start_paused = true)]
async fn stop_without_interactions_still_summarizes() {
    let (transport, _clock, tracker) = setup(TrackerConfig::default(), HostCapabilities::default());
    tracker.start();
    tracker.stop().await;

    let summary = transport
        .events()
        .into_iter()
        .find_map(|e| match e {
            Event::FieldAnalytics(s) => Some(s),
            _ => None,
        })
        .expect("field-analytics record");
    assert_eq!(summary.reason, SummaryReason::Stop);
    assert_eq!(summary.total_fields_interacted, 0);
    assert_eq!(summary.pain_point_count, 0);
    assert!(summary.drop_off_field.is_none());

    let json = serde_json::to_value(Event::FieldAnalytics(summary)).unwrap();
    assert!(json.get("dropOffField").is_none());
}

#[tokio::test(start_paused = true)]
async fn reaching_batch_size_sends_one_ordered_batch() {
    let config = TrackerConfig {
        batch_size: 3,
        ..TrackerConfig::default()
    };
    let (transport, _clock, tracker) = setup(config, HostCapabilities::default());
    tracker.start();
    tracker.record(RawNotice::Paste {
        field: "a".to_string(),
        at_ms: 1,
    });
    tracker.record(RawNotice::Paste {
        field: "b".to_string(),
        at_ms: 2,
    });

    tokio::task::yield_now().await;
    tokio::task::yield_now().await;

    let batches = transport.batches.lock();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].batch_seq, 0);
    let kinds: Vec<_> = batches[0].events.iter().map(Event::kind).collect();
    assert_eq!(kinds, vec!["session-start", "paste", "paste"]);
    assert_eq!(batches[0].events[2].timestamp_ms(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_delivery_requeues_ahead_of_newer_records() {
    let (transport, _clock, tracker) = setup(TrackerConfig::default(), HostCapabilities::default());
    tracker.start();
    transport.failing.store(true, Ordering::SeqCst);

    tracker.page_hidden().await;
    let stats = tracker.stats().queue.unwrap();
    assert_eq!(stats.queue_size, 3);
    assert_eq!(stats.transport_failures, 1);
    assert!(transport.batches.lock().is_empty());

    transport.failing.store(false, Ordering::SeqCst);
    tracker.page_visible();
    tracker.stop().await;

    assert_eq!(
        transport.kinds(),
        vec![
            "session-start",
            "field-analytics",
            "session-end",
            "field-analytics",
            "session-end"
        ]
    );
    assert_eq!(tracker.stats().queue.unwrap().queue_size, 0);
}

#[tokio::test(start_paused = true)]
async fn unload_prefers_beacon() {
    let beacon = Arc::new(MockBeacon::default());
    let (transport, _clock, tracker) = setup(
        TrackerConfig::default(),
        HostCapabilities {
            beacon: Some(beacon.clone()),
            structural_changes: false,
        },
    );
    tracker.start();
    tracker.record(RawNotice::Focus {
        field: "form>input#name".to_string(),
        at_ms: 10,
    });
    tracker.unload().await;

    assert!(transport.batches.lock().is_empty());
    let bodies = beacon.bodies.lock();
    assert_eq!(bodies.len(), 1);
    let batch: OutboundBatch = serde_json::from_slice(&bodies[0]).unwrap();
    let kinds: Vec<_> = batch.events.iter().map(Event::kind).collect();
    assert_eq!(
        kinds,
        vec!["session-start", "focus", "field-analytics", "session-end"]
    );
    match &batch.events[2] {
        Event::FieldAnalytics(s) => {
            assert_eq!(s.reason, SummaryReason::Unload);
            assert_eq!(
                s.drop_off_field.as_ref().map(|f| f.as_str()),
                Some("form>input#name")
            );
        }
        other => panic!("expected field-analytics, got {other:?}"),
    }
    assert_eq!(tracker.state(), TrackerState::Active);
    assert_eq!(tracker.stats().queue.unwrap().batches_beaconed, 1);
}

#[tokio::test(start_paused = true)]
async fn page_visible_returns_to_primary_transport() {
    let beacon = Arc::new(MockBeacon::default());
    let (transport, _clock, tracker) = setup(
        TrackerConfig::default(),
        HostCapabilities {
            beacon: Some(beacon.clone()),
            structural_changes: false,
        },
    );
    tracker.start();

    tracker.page_hidden().await;
    assert_eq!(beacon.bodies.lock().len(), 1);
    assert!(transport.batches.lock().is_empty());

    tracker.page_visible();
    tracker.record(RawNotice::Paste {
        field: "form>input#card".to_string(),
        at_ms: 40,
    });
    tracker.stop().await;

    assert_eq!(beacon.bodies.lock().len(), 1);
    let kinds = transport.kinds();
    assert!(kinds.contains(&"paste"));
    assert_eq!(kinds.last(), Some(&"session-end"));
    assert_eq!(tracker.stats().queue.unwrap().batches_beaconed, 1);
}

#[tokio::test(start_paused = true)]
async fn malformed_notices_are_dropped_without_records() {
    let (transport, _clock, tracker) = setup(TrackerConfig::default(), HostCapabilities::default());
    tracker.start();
    tracker.record(RawNotice::Paste {
        field: String::new(),
        at_ms: 5,
    });
    tracker.record(RawNotice::StepClick {
        at_ms: 6,
        from: Some("address".to_string()),
        to: Some("payment".to_string()),
        trigger: "   ".to_string(),
    });
    tracker.record(RawNotice::Paste {
        field: "form>input#zip".to_string(),
        at_ms: 7,
    });
    tracker.stop().await;

    assert_eq!(
        transport.kinds(),
        vec!["session-start", "paste", "field-analytics", "session-end"]
    );
}

#[tokio::test(start_paused = true)]
async fn extreme_timestamps_do_not_panic() {
    let (transport, _clock, tracker) = setup(TrackerConfig::default(), HostCapabilities::default());
    tracker.start();
    tracker.record(RawNotice::Focus {
        field: "form>input#age".to_string(),
        at_ms: i64::MIN,
    });
    tracker.record(RawNotice::Blur {
        field: "form>input#age".to_string(),
        at_ms: i64::MAX,
    });
    tracker.stop().await;

    let blur = transport
        .events()
        .into_iter()
        .find_map(|e| match e {
            Event::Blur(blur) => Some(blur),
            _ => None,
        })
        .expect("blur record");
    assert_eq!(blur.focus_duration_ms, i64::MAX as u64);
    assert_eq!(blur.time_spent_ms, i64::MAX as u64);
}

#[tokio::test(start_paused = true)]
async fn structural_changes_are_coalesced_into_queue() {
    let (transport, _clock, tracker) = setup(
        TrackerConfig::default(),
        HostCapabilities {
            beacon: None,
            structural_changes: true,
        },
    );
    tracker.start();
    tracker.on_structural_changes(
        (0..20)
            .map(|i| StructuralNotice::Added {
                path: format!("form>div:nth-child({i})"),
                tag: "div".to_string(),
            })
            .collect(),
    );
    assert_eq!(tracker.stats().structural_backlog, 20);

    // 새 알림 없이 여러 창이 지나도 배출은 한 번
    tokio::time::sleep(Duration::from_millis(9_100)).await;
    assert_eq!(tracker.stats().structural_backlog, 12);

    tracker.stop().await;
    let structural: Vec<_> = transport
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Event::StructuralChange(s) => Some((s.changes.len(), s.backlog)),
            _ => None,
        })
        .collect();
    assert_eq!(structural, vec![(8, 12)]);
}

#[tokio::test(start_paused = true)]
async fn session_end_reports_duration() {
    let (transport, clock, tracker) = setup(TrackerConfig::default(), HostCapabilities::default());
    clock.0.store(1_000, Ordering::SeqCst);
    let session = tracker.start();
    clock.0.store(6_000, Ordering::SeqCst);
    tracker.stop().await;

    let end = transport
        .events()
        .into_iter()
        .find_map(|e| match e {
            Event::SessionEnd(end) => Some(end),
            _ => None,
        })
        .unwrap();
    assert_eq!(end.duration_ms, 5_000);
    assert_eq!(end.timestamp_ms, 6_000);

    let batches = transport.batches.lock();
    assert!(batches.iter().all(|b| b.session_id == session.session_id));
    assert!(batches.iter().all(|b| b.session_started_at == 1_000));
}
