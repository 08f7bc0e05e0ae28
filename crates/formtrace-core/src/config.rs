//! 트래커 설정 구조체.
//!
//! 수집기 엔드포인트, 배치/플러시 주기, 구조 변경 병합 창 등 런타임 설정을 정의한다.
//! 시작 시 한 번 주입되며, JSON 파일에서 로드할 수 있다 (camelCase 키).

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// 트래커 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerConfig {
    /// 수집기 URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// 계측 대상 폼 셀렉터 (호스트가 해석)
    #[serde(default = "default_form_selector")]
    pub form_selector: String,
    /// 배치당 최대 이벤트 수 (도달 시 즉시 플러시)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// 주기적 플러시 간격 (ms)
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    /// 구조 변경 병합 창 (ms)
    #[serde(default = "default_mutation_batch_ms")]
    pub mutation_batch_ms: u64,
    /// 병합 창 1회당 배출할 최대 구조 변경 수
    #[serde(default = "default_max_mutation_records_per_batch")]
    pub max_mutation_records_per_batch: usize,
    /// 세션 TTL (ms): 선언만 하고 강제하지 않음
    #[serde(default = "default_session_ttl_ms")]
    pub session_ttl_ms: u64,
    /// 하트비트 간격 (ms)
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// HTTP 요청 타임아웃 (ms)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// 레코드당 최대 재큐잉 횟수 (None = 무제한)
    #[serde(default)]
    pub max_batch_retries: Option<u32>,
    /// 콘솔 에러 수집 여부
    #[serde(default)]
    pub enable_console_wrap: bool,
    /// 디버그 로깅 (큐에 들어가는 모든 이벤트 기록)
    #[serde(default)]
    pub debug: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            form_selector: default_form_selector(),
            batch_size: default_batch_size(),
            flush_interval_ms: default_flush_interval_ms(),
            mutation_batch_ms: default_mutation_batch_ms(),
            max_mutation_records_per_batch: default_max_mutation_records_per_batch(),
            session_ttl_ms: default_session_ttl_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            max_batch_retries: None,
            enable_console_wrap: false,
            debug: false,
        }
    }
}

impl TrackerConfig {
    /// JSON 문자열에서 설정 파싱 (누락된 키는 기본값)
    pub fn from_json(content: &str) -> Result<Self, CoreError> {
        let config: TrackerConfig = serde_json::from_str(content)
            .map_err(|e| CoreError::Config(format!("설정 파싱 실패: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// 파일에서 설정 로드
    pub fn load_from_file(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("설정 파일 읽기 실패: {}: {}", path.display(), e))
        })?;

        let config = Self::from_json(&content)?;
        debug!("설정 파일 로드 완료: {}", path.display());
        Ok(config)
    }

    /// 설정값 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.endpoint.trim().is_empty() {
            return Err(CoreError::Config("endpoint가 비어 있습니다".to_string()));
        }
        if self.batch_size == 0 {
            return Err(CoreError::Config("batchSize는 1 이상이어야 합니다".to_string()));
        }
        if self.max_mutation_records_per_batch == 0 {
            return Err(CoreError::Config(
                "maxMutationRecordsPerBatch는 1 이상이어야 합니다".to_string(),
            ));
        }
        for (name, value) in [
            ("flushIntervalMs", self.flush_interval_ms),
            ("mutationBatchMs", self.mutation_batch_ms),
            ("heartbeatIntervalMs", self.heartbeat_interval_ms),
            ("requestTimeoutMs", self.request_timeout_ms),
        ] {
            if value == 0 {
                return Err(CoreError::Config(format!("{name}는 0보다 커야 합니다")));
            }
        }
        Ok(())
    }

    /// 주기적 플러시 간격
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// 구조 변경 병합 창
    pub fn mutation_window(&self) -> Duration {
        Duration::from_millis(self.mutation_batch_ms)
    }

    /// 하트비트 간격
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// HTTP 요청 타임아웃
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_endpoint() -> String {
    "http://localhost:8080/collect".to_string()
}
fn default_form_selector() -> String {
    "form".to_string()
}
fn default_batch_size() -> usize {
    25
}
fn default_flush_interval_ms() -> u64 {
    4_000
}
fn default_mutation_batch_ms() -> u64 {
    3_000
}
fn default_max_mutation_records_per_batch() -> usize {
    8
}
fn default_session_ttl_ms() -> u64 {
    3_600_000 // 1시간
}
fn default_heartbeat_interval_ms() -> u64 {
    30_000
}
fn default_request_timeout_ms() -> u64 {
    10_000
}
