//! HTTP 수집기 전송.
//!
//! `BatchTransport` 포트 구현. 배치를 JSON 본문으로 수집기 엔드포인트에 POST 한다.
//! 자격 증명(쿠키 등)은 보내지 않는다.

use async_trait::async_trait;
use formtrace_core::error::CoreError;
use formtrace_core::models::event::OutboundBatch;
use formtrace_core::ports::transport::BatchTransport;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP 배치 전송: `BatchTransport` 포트 구현
pub struct HttpBatchTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpBatchTransport {
    /// 새 HTTP 전송 생성
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    /// 수집기 엔드포인트
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 응답 상태 코드 확인
    ///
    /// 2xx 외 응답은 재시도 대상이 아닌 `Rejected`로 매핑.
    async fn check_response(resp: reqwest::Response) -> Result<(), CoreError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let text = resp.text().await.unwrap_or_else(|e| {
            warn!("응답 본문 읽기 실패: {e}");
            String::new()
        });
        warn!("수집기 응답 에러 ({status}): {text}");
        Err(CoreError::Rejected {
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl BatchTransport for HttpBatchTransport {
    async fn send(&self, batch: &OutboundBatch) -> Result<(), CoreError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(batch)
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("배치 전송 실패: {e}")))?;

        Self::check_response(resp).await?;
        debug!(
            "배치 전송 완료: #{} ({}개)",
            batch.batch_seq,
            batch.events.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formtrace_core::models::event::{Event, HeartbeatEvent};

    fn sample_batch() -> OutboundBatch {
        OutboundBatch {
            session_id: "sess-1".to_string(),
            session_started_at: 1_000,
            batch_seq: 0,
            events: vec![Event::Heartbeat(HeartbeatEvent {
                timestamp_ms: 2_000,
                fields_interacted: 0,
                structural_backlog: 0,
            })],
        }
    }

    fn transport(server: &mockito::ServerGuard) -> HttpBatchTransport {
        let endpoint = format!("{}/collect", server.url());
        HttpBatchTransport::new(&endpoint, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn send_posts_json_batch() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/collect")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"sessionId":"sess-1","batchSeq":0}"#.to_string(),
            ))
            .with_status(200)
            .create_async()
            .await;

        let result = transport(&server).send(&sample_batch()).await;
        assert!(result.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/collect")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let err = transport(&server).send(&sample_batch()).await.unwrap_err();
        assert!(matches!(err, CoreError::Rejected { status: 500 }));
        assert!(!err.is_transport_failure());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_network_failure() {
        let client =
            HttpBatchTransport::new("http://127.0.0.1:1/collect", Duration::from_secs(2)).unwrap();

        let err = client.send(&sample_batch()).await.unwrap_err();
        assert!(err.is_transport_failure());
    }

    #[test]
    fn endpoint_preserved() {
        let client =
            HttpBatchTransport::new("http://localhost:8080/collect", Duration::from_secs(1))
                .unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/collect");
    }
}
