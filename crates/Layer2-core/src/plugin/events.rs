//! Lifecycle Events - 설치/업데이트/제거 이벤트 시스템

use editorlink_foundation::Error;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing::{debug, warn};

// ============================================================================
// LifecycleEvent - 라이프사이클 이벤트 타입
// ============================================================================

/// 플러그인 라이프사이클 이벤트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// 이벤트 종류
    pub kind: LifecycleEventKind,

    /// 에디터 패밀리 ID
    pub family: String,

    /// 대상 에디터 위치
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// 실패 시 에러 메시지
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// 타임스탬프
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl LifecycleEvent {
    /// 새 이벤트 생성
    pub fn new(kind: LifecycleEventKind, family: impl Into<String>, path: Option<&Path>) -> Self {
        Self {
            kind,
            family: family.into(),
            path: path.map(Path::to_path_buf),
            error: None,
            timestamp: chrono::Utc::now(),
        }
    }

    /// 실패 이벤트 생성
    pub fn failed(
        kind: LifecycleEventKind,
        family: impl Into<String>,
        path: Option<&Path>,
        error: &Error,
    ) -> Self {
        let mut event = Self::new(kind, family, path);
        event.error = Some(error.to_string());
        event
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// 이벤트 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEventKind {
    Install,
    Uninstall,
    Update,
    AutoInstall,
}

impl std::fmt::Display for LifecycleEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Install => write!(f, "install"),
            Self::Uninstall => write!(f, "uninstall"),
            Self::Update => write!(f, "update"),
            Self::AutoInstall => write!(f, "auto_install"),
        }
    }
}

// ============================================================================
// EventBus - 이벤트 발행/구독
// ============================================================================

/// 라이프사이클 이벤트 브로드캐스트
///
/// 구독자가 없으면 이벤트는 버려진다. 느린 구독자는 오래된 이벤트를 놓친다.
pub struct EventBus {
    sender: broadcast::Sender<LifecycleEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// 이벤트 발행
    pub fn publish(&self, event: LifecycleEvent) {
        debug!(
            "Publishing {} event for {} (failed: {})",
            event.kind,
            event.family,
            event.is_failure()
        );
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// 수신자에 쌓인 이벤트 중 실패만 꺼내기 (기다리지 않음)
pub fn drain_failures(receiver: &mut broadcast::Receiver<LifecycleEvent>) -> Vec<LifecycleEvent> {
    let mut failures = Vec::new();
    loop {
        match receiver.try_recv() {
            Ok(event) if event.is_failure() => failures.push(event),
            Ok(_) => {}
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                warn!("Missed {} lifecycle events", skipped);
            }
            Err(_) => break,
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        bus.publish(LifecycleEvent::new(LifecycleEventKind::Install, "vim", None));
    }

    #[test]
    fn test_drain_failures() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        bus.publish(LifecycleEvent::new(
            LifecycleEventKind::AutoInstall,
            "vim",
            Some(Path::new("/usr/bin/vim")),
        ));
        let error = Error::Transfer("HTTP 503".into());
        bus.publish(LifecycleEvent::failed(LifecycleEventKind::Update, "atom", None, &error));

        let failures = drain_failures(&mut receiver);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, LifecycleEventKind::Update);
        assert_eq!(failures[0].error.as_deref(), Some("Transfer failed: HTTP 503"));

        assert!(drain_failures(&mut receiver).is_empty());
    }

    #[test]
    fn test_drain_after_lag() {
        let bus = EventBus::with_capacity(2);
        let mut receiver = bus.subscribe();
        let error = Error::Transfer("timeout".into());
        for family in ["a", "b", "c"] {
            bus.publish(LifecycleEvent::failed(LifecycleEventKind::Install, family, None, &error));
        }

        let families: Vec<_> = drain_failures(&mut receiver)
            .into_iter()
            .map(|e| e.family)
            .collect();
        assert_eq!(families, vec!["b".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn test_event_subscribe() {
        let bus = std::sync::Arc::new(EventBus::new());
        let mut receiver = bus.subscribe();

        let publisher = bus.clone();
        tokio::spawn(async move {
            tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
            publisher.publish(LifecycleEvent::new(LifecycleEventKind::Uninstall, "emacs", None));
        });

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.kind, LifecycleEventKind::Uninstall);
        assert!(!event.is_failure());
    }
}
