//! 알림 재생.
//!
//! 기록된 호스트 알림(JSON Lines)을 트래커에 순서대로 흘려보낸다.
//! 한 줄은 원시 알림, 구조 변경 묶음, 페이지 가시성 전환 중 하나다.

use formtrace_core::models::notice::{RawNotice, StructuralNotice};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::lifecycle::Tracker;

/// 재생 한 줄
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ReplayEntry {
    /// 원시 알림 (`type` 태그)
    Notice(RawNotice),
    /// 구조 변경 묶음
    Structural { structural: Vec<StructuralNotice> },
    /// 페이지 가시성 전환
    Visibility { visibility: Visibility },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Hidden,
    Visible,
}

/// 재생 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// 적용한 줄 수
    pub applied: usize,
    /// 파싱 실패로 건너뛴 줄 수
    pub skipped: usize,
}

/// JSON Lines 파싱: 빈 줄과 `#` 주석은 무시, 잘못된 줄은 경고 후 건너뜀
pub fn parse_entries(content: &str) -> (Vec<ReplayEntry>, usize) {
    let mut entries = Vec::new();
    let mut skipped = 0;

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match serde_json::from_str::<ReplayEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                warn!("재생 {}번째 줄 건너뜀: {e}", index + 1);
                skipped += 1;
            }
        }
    }

    (entries, skipped)
}

/// 파싱된 항목을 트래커에 적용
pub async fn apply(tracker: &Tracker, entries: Vec<ReplayEntry>) -> usize {
    let mut applied = 0;
    for entry in entries {
        match entry {
            ReplayEntry::Notice(notice) => tracker.record(notice),
            ReplayEntry::Structural { structural } => tracker.on_structural_changes(structural),
            ReplayEntry::Visibility {
                visibility: Visibility::Hidden,
            } => tracker.page_hidden().await,
            ReplayEntry::Visibility {
                visibility: Visibility::Visible,
            } => tracker.page_visible(),
        }
        applied += 1;
    }
    debug!("재생 적용: {applied}개");
    applied
}

/// JSON Lines 내용을 파싱해서 적용
pub async fn replay(tracker: &Tracker, content: &str) -> ReplayReport {
    let (entries, skipped) = parse_entries(content);
    let applied = apply(tracker, entries).await;
    ReplayReport { applied, skipped }
}
