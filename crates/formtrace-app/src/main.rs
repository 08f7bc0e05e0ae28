//! # formtrace-replay
//!
//! 기록된 폼 알림(JSON Lines)을 트래커로 재생해 수집기에 보내는 진단용 바이너리.
//! 재생이 끝나면 세션을 중지하거나(`--unload`면) 언로드 흐름으로 마무리한다.

use anyhow::{Context, Result};
use clap::Parser;
use formtrace_app::lifecycle::{HostCapabilities, Tracker};
use formtrace_app::replay;
use formtrace_core::config::TrackerConfig;
use formtrace_core::ports::transport::UnloadBeacon;
use formtrace_network::beacon::DetachedBeacon;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// 언로드 후 분리 실행 비콘이 나갈 때까지 기다리는 시간
const BEACON_GRACE: Duration = Duration::from_millis(500);

/// formtrace 알림 재생기
#[derive(Parser, Debug)]
#[command(name = "formtrace-replay")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 설정 파일 (JSON, camelCase 키). 없으면 기본값
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// 재생할 알림 파일 (JSON Lines)
    #[arg(long, short = 'n')]
    notices: PathBuf,

    /// 수집기 URL 지정 (설정 파일보다 우선)
    #[arg(long, short = 'e')]
    endpoint: Option<String>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,

    /// 중지 대신 언로드 흐름으로 종료 (비콘 사용)
    #[arg(long)]
    unload: bool,

    /// 구조 변경 병합 비활성화
    #[arg(long)]
    no_structural: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = format!(
        "formtrace_replay={},formtrace_app={},formtrace_core={},formtrace_monitor={},formtrace_network={}",
        args.log_level, args.log_level, args.log_level, args.log_level, args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => TrackerConfig::load_from_file(path)
            .with_context(|| format!("설정 로드 실패: {}", path.display()))?,
        None => TrackerConfig::default(),
    };
    if let Some(endpoint) = &args.endpoint {
        config.endpoint = endpoint.clone();
    }
    config.validate().context("설정 검증 실패")?;
    info!("수집기: {}", config.endpoint);

    let content = std::fs::read_to_string(&args.notices)
        .with_context(|| format!("알림 파일 읽기 실패: {}", args.notices.display()))?;

    let beacon: Option<Arc<dyn UnloadBeacon>> =
        match DetachedBeacon::new(&config.endpoint, config.request_timeout()) {
            Ok(beacon) => Some(Arc::new(beacon)),
            Err(e) => {
                warn!("비콘 사용 불가: {e}");
                None
            }
        };
    let capabilities = HostCapabilities {
        beacon,
        structural_changes: !args.no_structural,
    };

    let tracker = Tracker::with_http(config, capabilities).context("트래커 생성 실패")?;
    let session = tracker.start();
    info!("재생 세션: {}", session.session_id);

    let report = replay::replay(&tracker, &content).await;
    info!("재생 완료: 적용 {}개, 건너뜀 {}개", report.applied, report.skipped);

    if args.unload {
        tracker.unload().await;
        tokio::time::sleep(BEACON_GRACE).await;
    } else {
        tracker.stop().await;
    }

    let stats = tracker.stats();
    info!("트래커 통계: {stats:#?}");
    if let Some(queue) = &stats.queue {
        if queue.queue_size > 0 {
            warn!("전달되지 못한 레코드 {}개", queue.queue_size);
        }
    }
    Ok(())
}
