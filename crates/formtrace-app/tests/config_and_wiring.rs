//! 설정 및 HTTP 와이어링 통합 테스트.
//!
//! 설정 파일 → `Tracker::with_http` → 실제 HTTP 수집기(mockito) 경로 검증.

use formtrace_app::lifecycle::{HostCapabilities, Tracker, TrackerState};
use formtrace_app::replay;
use formtrace_core::config::TrackerConfig;
use formtrace_core::error::CoreError;
use mockito::Matcher;
use std::io::Write;

#[test]
fn config_file_overrides_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"endpoint":"http://collector.test/ingest","batchSize":10,"enableConsoleWrap":true}}"#
    )
    .unwrap();

    let config = TrackerConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.endpoint, "http://collector.test/ingest");
    assert_eq!(config.batch_size, 10);
    assert!(config.enable_console_wrap);
    assert_eq!(config.flush_interval_ms, 4_000);
    assert_eq!(config.mutation_batch_ms, 3_000);
}

#[test]
fn invalid_config_is_rejected_before_wiring() {
    let config = TrackerConfig {
        batch_size: 0,
        ..TrackerConfig::default()
    };
    let result = Tracker::with_http(config, HostCapabilities::default());
    assert!(matches!(result, Err(CoreError::Config(_))));
}

#[tokio::test]
async fn stop_posts_batch_to_collector() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/collect")
        .match_header("content-type", "application/json")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#""kind":"session-start""#.to_string()),
            Matcher::Regex(r#""kind":"field-analytics""#.to_string()),
            Matcher::Regex(r#""kind":"session-end""#.to_string()),
        ]))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let config = TrackerConfig {
        endpoint: format!("{}/collect", server.url()),
        ..TrackerConfig::default()
    };
    let tracker = Tracker::with_http(config, HostCapabilities::default()).unwrap();
    tracker.start();
    tracker.stop().await;

    mock.assert_async().await;
    let stats = tracker.stats();
    assert_eq!(stats.state, TrackerState::Stopped);
    assert_eq!(stats.queue.unwrap().batches_sent, 1);
}

#[tokio::test]
async fn rejected_batch_is_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/collect")
        .with_status(400)
        .expect(1)
        .create_async()
        .await;

    let config = TrackerConfig {
        endpoint: format!("{}/collect", server.url()),
        ..TrackerConfig::default()
    };
    let tracker = Tracker::with_http(config, HostCapabilities::default()).unwrap();
    tracker.start();
    tracker.stop().await;

    mock.assert_async().await;
    let queue = tracker.stats().queue.unwrap();
    assert_eq!(queue.batches_rejected, 1);
    assert_eq!(queue.queue_size, 0);
}

#[tokio::test]
async fn replayed_notices_reach_collector() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/collect")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#""kind":"focus""#.to_string()),
            Matcher::Regex(r#""kind":"blur""#.to_string()),
            Matcher::Regex(r#""kind":"step-transition""#.to_string()),
        ]))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let config = TrackerConfig {
        endpoint: format!("{}/collect", server.url()),
        ..TrackerConfig::default()
    };
    let tracker = Tracker::with_http(config, HostCapabilities::default()).unwrap();
    tracker.start();

    let content = r#"
{"type":"focus","field":"form>input#zip","atMs":0}
{"type":"change","field":"form>input#zip","atMs":50,"summary":{"length":5,"kind":"numeric"}}
{"type":"blur","field":"form>input#zip","atMs":80}
{"type":"stepClick","atMs":90,"from":"address","to":"payment","trigger":"Next"}
broken line
"#;
    let report = replay::replay(&tracker, content).await;
    assert_eq!(report.applied, 4);
    assert_eq!(report.skipped, 1);
    assert_eq!(tracker.stats().fields_interacted, 1);

    tracker.stop().await;
    mock.assert_async().await;
}
