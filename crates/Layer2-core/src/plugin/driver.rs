//! Background Driver - 주기적 감지/업데이트/자동 설치
//!
//! 하나의 태스크가 타이머와 취소 토큰을 `tokio::select!`로 기다립니다.
//!
//! 각 주기:
//! 1. 레지스트리 정리 (사라진 경로)
//! 2. 실행 중 에디터 기억
//! 3. 업데이트 (전체 주기면 모든 패밀리, 아니면 이전에 실패한 패밀리만)
//! 4. 자동 설치 스윕
//! 5. 패밀리별 설정 상태와 주기 중 발생한 라이프사이클 실패를 `DriverReport`로
//!    모아 `ReportSink`에 전달

use super::events::{drain_failures, LifecycleEvent};
use super::manager::PluginManager;
use async_trait::async_trait;
use editorlink_foundation::DriverConfig;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

// ============================================================================
// DriverReport - 주기별 결과
// ============================================================================

/// 한 주기의 결과
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverReport {
    /// 전체 업데이트 주기였는지
    pub full_update: bool,

    /// 레지스트리에서 제거된 경로 수
    pub purged: usize,

    /// 새로 기억한 실행 중 에디터 경로 수
    pub remembered: usize,

    /// 패밀리별 업데이트된 위치 수
    pub updated: BTreeMap<String, usize>,

    /// 다음 재시도 대상 (패밀리 -> 에러)
    pub failed_updates: BTreeMap<String, String>,

    /// 이번 주기에 자동 설치된 패밀리
    pub auto_installed: Vec<String>,

    /// 패밀리별 설정 상태 (최적이면 true)
    pub settings_health: BTreeMap<String, bool>,

    /// 이번 주기에 발행된 실패 이벤트
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lifecycle_failures: Vec<LifecycleEvent>,
}

impl DriverReport {
    /// 최적이 아닌 설정을 가진 패밀리
    pub fn suboptimal_settings(&self) -> Vec<&str> {
        self.settings_health
            .iter()
            .filter(|(_, healthy)| !**healthy)
            .map(|(id, _)| id.as_str())
            .collect()
    }
}

/// 주기 결과 수신자 (메트릭 등)
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn deliver(&self, report: &DriverReport);
}

/// 로그로만 남기는 기본 수신자
pub struct LogReportSink;

#[async_trait]
impl ReportSink for LogReportSink {
    async fn deliver(&self, report: &DriverReport) {
        info!(
            "Plugin pass finished: {} purged, {} remembered, {} updated, {} failed, {} auto-installed",
            report.purged,
            report.remembered,
            report.updated.values().sum::<usize>(),
            report.failed_updates.len(),
            report.auto_installed.len()
        );
        for id in report.suboptimal_settings() {
            info!("{} has suboptimal settings", id);
        }
        for event in &report.lifecycle_failures {
            warn!(
                "{} of {} failed{}: {}",
                event.kind,
                event.family,
                event
                    .path
                    .as_ref()
                    .map(|p| format!(" at {}", p.display()))
                    .unwrap_or_default(),
                event.error.as_deref().unwrap_or_default()
            );
        }
    }
}

// ============================================================================
// BackgroundDriver
// ============================================================================

#[derive(Debug, Default)]
struct DriverState {
    /// 마지막 전체 업데이트 시각
    last_full_update: Option<Instant>,

    /// 다음 주기에 재시도할 패밀리
    failed_updates: BTreeSet<String>,
}

/// 백그라운드 드라이버
pub struct BackgroundDriver {
    manager: Arc<PluginManager>,
    config: DriverConfig,
    sink: Arc<dyn ReportSink>,
    state: Mutex<DriverState>,
}

impl BackgroundDriver {
    pub fn new(manager: Arc<PluginManager>, config: DriverConfig) -> Self {
        Self {
            manager,
            config,
            sink: Arc::new(LogReportSink),
            state: Mutex::new(DriverState::default()),
        }
    }

    /// 결과 수신자 지정
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }

    /// 재시도 대상 패밀리
    pub fn failed_updates(&self) -> BTreeSet<String> {
        self.state.lock().failed_updates.clone()
    }

    /// 취소될 때까지 실행
    ///
    /// 타이머는 재시도 간격으로 돌고, 전체 업데이트는 `interval`마다 수행한다.
    pub async fn run(&self, cancel: CancellationToken) {
        let period = self.config.retry_interval().min(self.config.interval());
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Background driver started (update every {:?}, retry every {:?})",
            self.config.interval(),
            self.config.retry_interval()
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Background driver stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let report = self.tick(&cancel).await;
                    self.sink.deliver(&report).await;
                }
            }
        }
    }

    /// 한 주기 실행 (전체 업데이트 여부는 마지막 전체 업데이트 시각으로 결정)
    pub async fn tick(&self, cancel: &CancellationToken) -> DriverReport {
        let full_update = match self.state.lock().last_full_update {
            Some(last) => last.elapsed() >= self.config.interval(),
            None => true,
        };
        self.run_pass(cancel, full_update).await
    }

    /// 한 주기 실행
    pub async fn run_pass(&self, cancel: &CancellationToken, full_update: bool) -> DriverReport {
        let mut report = DriverReport {
            full_update,
            ..Default::default()
        };
        let mut events = self.manager.event_bus().subscribe();

        report.purged = self.manager.purge_registry();
        report.remembered = self.manager.detect_running(cancel).await;

        let targets: Vec<String> = if full_update {
            self.state.lock().last_full_update = Some(Instant::now());
            self.manager.plugins().iter().map(|p| p.id().to_string()).collect()
        } else {
            self.state.lock().failed_updates.iter().cloned().collect()
        };

        if !targets.is_empty() {
            debug!("Updating plugins for {:?} (full: {})", targets, full_update);
        }

        for id in targets {
            if cancel.is_cancelled() {
                report.lifecycle_failures = drain_failures(&mut events);
                return report;
            }
            match self.manager.update(cancel, &id).await {
                Ok(count) => {
                    self.state.lock().failed_updates.remove(&id);
                    if count > 0 {
                        report.updated.insert(id, count);
                    }
                }
                Err(e) if e.is_retryable() => {
                    warn!("Plugin update of {} failed, retrying later: {}", id, e);
                    self.state.lock().failed_updates.insert(id.clone());
                    report.failed_updates.insert(id, e.to_string());
                }
                Err(e) => {
                    // 정책 거부, 설정 오류 등은 같은 상태에서 다시 시도해도 실패함
                    if e.is_policy_rejected() {
                        debug!("{}", e);
                    } else {
                        warn!("Plugin update of {} failed: {}", id, e);
                    }
                    self.state.lock().failed_updates.remove(&id);
                }
            }
        }

        if cancel.is_cancelled() {
            report.lifecycle_failures = drain_failures(&mut events);
            return report;
        }

        let detected = self.manager.detect_all_paths(cancel).await;
        report.auto_installed = self.manager.auto_install(cancel, &detected).await;

        for plugin in self.manager.plugins() {
            if let Some(healthy) = plugin.settings_health(cancel).await {
                report.settings_health.insert(plugin.id().to_string(), healthy);
            }
        }

        report.lifecycle_failures = drain_failures(&mut events);
        report
    }
}
