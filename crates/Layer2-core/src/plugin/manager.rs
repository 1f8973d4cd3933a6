//! Plugin Manager - 에디터 플러그인 라이프사이클 관리
//!
//! 레지스트리, 정책 게이트, 설정 저장소를 묶어 상태 조회, 설치/업데이트/제거,
//! 자동 설치 스윕을 제공합니다.
//!
//! ## 락 규칙
//!
//! - 레지스트리와 매니저 상태(encountered, MRU)는 서로 다른 락
//! - 다운로드, 압축 해제, 프로세스 실행 같은 긴 작업 중에는 어떤 락도 잡지 않음
//! - 자동 설치 ID 목록의 읽기-삭제는 매니저 락 안에서 원자적으로 수행

use super::events::{EventBus, LifecycleEvent, LifecycleEventKind};
use super::paths::dedupe_paths;
use super::policy::{may_proceed, Operation};
use super::registry::EditorRegistry;
use super::status::{OperationError, PluginStatus, UninstallAllReport};
use super::traits::{EditorLocation, EditorPlugin, InstallOutcome, OpenFileCompletion};
use editorlink_foundation::{
    Error, Result, SettingsStore, AUTO_INSTALLED_IDS_KEY, AUTO_INSTALL_ENABLED_KEY,
    ENCOUNTERED_EDITORS_KEY,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 설치 옵션
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    /// 실행 중 검사 무시 (설치 마법사에서 이미 설치된 실행 중 에디터 처리용)
    pub ignore_running: bool,
}

/// 매니저 락으로 보호되는 상태
#[derive(Debug, Default)]
struct ManagerState {
    /// 사용자가 이미 본 패밀리
    encountered: BTreeMap<String, bool>,

    /// 가장 최근에 이벤트를 보낸 에디터
    mru_editor: Option<String>,
}

/// 플러그인 매니저 - 에디터 플러그인 시스템 전체 관리
pub struct PluginManager {
    /// 등록 순서를 유지하는 플러그인 목록
    plugins: Vec<Arc<dyn EditorPlugin>>,

    /// 에디터 위치 레지스트리
    registry: Arc<EditorRegistry>,

    /// 키-값 설정 저장소
    settings: Arc<dyn SettingsStore>,

    /// 이벤트 버스
    event_bus: Arc<EventBus>,

    /// 자동 설치 설정이 저장되지 않았을 때의 기본값
    auto_install_default: bool,

    state: Mutex<ManagerState>,
}

impl PluginManager {
    /// 새 매니저 생성
    ///
    /// 같은 ID의 플러그인이 여러 개면 처음 것만 사용한다.
    pub fn new(
        plugins: Vec<Arc<dyn EditorPlugin>>,
        registry: Arc<EditorRegistry>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        let mut unique: Vec<Arc<dyn EditorPlugin>> = Vec::with_capacity(plugins.len());
        for plugin in plugins {
            if unique.iter().any(|p| p.id() == plugin.id()) {
                warn!("Ignoring duplicate editor plugin: {}", plugin.id());
                continue;
            }
            unique.push(plugin);
        }

        // 값이 없거나 깨져 있어도 초기화는 실패하지 않음
        let encountered = settings
            .get_obj::<BTreeMap<String, bool>>(ENCOUNTERED_EDITORS_KEY)
            .unwrap_or_default();

        info!(
            "Plugin manager initialized with {} editor families ({} encountered)",
            unique.len(),
            encountered.len()
        );

        Self {
            plugins: unique,
            registry,
            settings,
            event_bus: Arc::new(EventBus::new()),
            auto_install_default: true,
            state: Mutex::new(ManagerState {
                encountered,
                mru_editor: None,
            }),
        }
    }

    /// 이벤트 버스 지정
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    /// 자동 설치 기본값 지정
    pub fn with_auto_install_default(mut self, enabled: bool) -> Self {
        self.auto_install_default = enabled;
        self
    }

    pub fn plugins(&self) -> &[Arc<dyn EditorPlugin>] {
        &self.plugins
    }

    pub fn registry(&self) -> &Arc<EditorRegistry> {
        &self.registry
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// ID 또는 별칭으로 플러그인 조회
    pub fn find(&self, id: &str) -> Result<Arc<dyn EditorPlugin>> {
        // 정확한 ID가 별칭보다 우선
        self.plugins
            .iter()
            .find(|p| p.id() == id)
            .or_else(|| self.plugins.iter().find(|p| p.family().answers_to(id)))
            .cloned()
            .ok_or_else(|| Error::FamilyNotFound(id.to_string()))
    }

    // ========================================================================
    // 감지
    // ========================================================================

    /// 일반 위치 감지 + 레지스트리 경로를 에디터 위치로 해석
    ///
    /// 일반 위치 감지가 실패하면 Detection 에러. 개별 경로 해석 실패는 건너뛴다.
    pub async fn detect_locations(
        &self,
        cancel: &CancellationToken,
        plugin: &dyn EditorPlugin,
    ) -> Result<Vec<EditorLocation>> {
        let detected = plugin
            .detect_installed(cancel)
            .await
            .map_err(|e| match e {
                Error::Detection { .. } | Error::Cancelled => e,
                other => Error::detection(plugin.name(), other.to_string()),
            })?;

        let paths = dedupe_paths(detected.into_iter().chain(self.registry.list(plugin.id())));
        Ok(self.describe_all(cancel, plugin, &paths).await)
    }

    async fn describe_all(
        &self,
        cancel: &CancellationToken,
        plugin: &dyn EditorPlugin,
        paths: &[PathBuf],
    ) -> Vec<EditorLocation> {
        let mut locations = Vec::with_capacity(paths.len());
        for path in paths {
            match plugin.describe(cancel, path).await {
                Ok(location) => locations.push(location),
                Err(e) => debug!("Skipping {} location {}: {}", plugin.id(), path.display(), e),
            }
        }
        locations
    }

    /// 실행 중인 에디터를 감지하여 레지스트리에 기억
    ///
    /// 새로 추가된 경로 수를 반환한다.
    pub async fn detect_running(&self, cancel: &CancellationToken) -> usize {
        let mut added = 0;
        for plugin in &self.plugins {
            match plugin.detect_running(cancel).await {
                Ok(paths) => {
                    for path in paths {
                        if self.registry.add_detected(plugin.id(), &path) {
                            added += 1;
                        }
                    }
                }
                Err(e) => warn!("Failed to detect running {} editors: {}", plugin.id(), e),
            }
        }
        if added > 0 {
            info!("Remembered {} running editor locations", added);
        }
        added
    }

    /// 패밀리별 실행 중 + 일반 위치 경로 (중복 제거)
    ///
    /// 감지 실패는 로그만 남기고 빈 목록으로 취급한다.
    pub async fn detect_all_paths(&self, cancel: &CancellationToken) -> HashMap<String, Vec<PathBuf>> {
        // 패밀리끼리는 독립적이므로 동시에 감지
        let detections = self.plugins.iter().map(|plugin| async move {
            let running = plugin.detect_running(cancel).await.unwrap_or_else(|e| {
                warn!("Failed to detect running {} editors: {}", plugin.id(), e);
                Vec::new()
            });
            let installed = plugin.detect_installed(cancel).await.unwrap_or_else(|e| {
                warn!("Failed to detect {} editors: {}", plugin.id(), e);
                Vec::new()
            });
            (
                plugin.id().to_string(),
                dedupe_paths(running.into_iter().chain(installed)),
            )
        });

        futures::future::join_all(detections).await.into_iter().collect()
    }

    /// 디스크에서 사라진 레지스트리 경로 제거
    pub fn purge_registry(&self) -> usize {
        self.registry.purge_missing()
    }

    // ========================================================================
    // 상태 조회
    // ========================================================================

    /// 한 패밀리의 상태
    pub async fn status(&self, cancel: &CancellationToken, id: &str) -> Result<PluginStatus> {
        let plugin = self.find(id)?;
        let locations = self.detect_locations(cancel, plugin.as_ref()).await?;
        Ok(self.annotate(PluginStatus::compute(cancel, plugin.as_ref(), locations).await))
    }

    /// 모든 패밀리의 상태 (등록 순서)
    ///
    /// 감지에 실패한 패밀리는 로그만 남기고 제외한다.
    pub async fn status_all(&self, cancel: &CancellationToken) -> Vec<PluginStatus> {
        self.purge_registry();

        let mut statuses = Vec::with_capacity(self.plugins.len());
        for plugin in &self.plugins {
            match self.detect_locations(cancel, plugin.as_ref()).await {
                Ok(locations) => {
                    let status = PluginStatus::compute(cancel, plugin.as_ref(), locations).await;
                    statuses.push(self.annotate(status));
                }
                Err(e) => warn!("{}", e),
            }
        }
        statuses
    }

    /// 실행 중 에디터 기억, 자동 설치 후 상태 반환
    pub async fn refresh_and_auto_install(&self, cancel: &CancellationToken) -> Vec<PluginStatus> {
        self.detect_running(cancel).await;
        self.purge_registry();

        let mut detected = self.detect_all_paths(cancel).await;

        // 상태는 자동 설치가 끝난 뒤 계산해야 함
        self.auto_install(cancel, &detected).await;

        let mut statuses = Vec::with_capacity(self.plugins.len());
        for plugin in &self.plugins {
            let paths = dedupe_paths(
                detected
                    .remove(plugin.id())
                    .unwrap_or_default()
                    .into_iter()
                    .chain(self.registry.list(plugin.id())),
            );
            let locations = self.describe_all(cancel, plugin.as_ref(), &paths).await;
            let status = PluginStatus::compute(cancel, plugin.as_ref(), locations).await;
            statuses.push(self.annotate(status));
        }
        statuses
    }

    /// 플러그인이 있는 에디터 패밀리 ID 집합 (에디터 위치가 하나 이상)
    pub async fn installed_editors(&self, cancel: &CancellationToken) -> BTreeSet<String> {
        self.purge_registry();

        let mut installed = BTreeSet::new();
        for plugin in &self.plugins {
            if let Ok(locations) = self.detect_locations(cancel, plugin.as_ref()).await {
                if !locations.is_empty() {
                    installed.insert(plugin.id().to_string());
                }
            }
        }
        installed
    }

    fn annotate(&self, mut status: PluginStatus) -> PluginStatus {
        status.encountered = self
            .state
            .lock()
            .encountered
            .get(&status.id)
            .copied()
            .unwrap_or(false);
        status
    }

    // ========================================================================
    // 설치 / 제거 / 업데이트
    // ========================================================================

    /// 지정한 위치에 플러그인 설치
    pub async fn install(
        &self,
        cancel: &CancellationToken,
        id: &str,
        path: &Path,
        options: InstallOptions,
    ) -> Result<PluginStatus> {
        let plugin = self.find(id)?;
        require_path(path)?;

        let cfg = plugin.install_config(cancel).await;
        if !options.ignore_running && !may_proceed(Operation::Install, &cfg) {
            return Err(Error::policy_rejected(plugin.name(), Operation::Install, Some(path)));
        }

        match plugin.install(cancel, path).await {
            Ok(outcome) => {
                info!("Installed {} plugin at {} ({:?})", plugin.id(), path.display(), outcome);
                self.publish(LifecycleEvent::new(LifecycleEventKind::Install, plugin.id(), Some(path)));
            }
            Err(e) => {
                error!("Error installing {} plugin at {}: {}", plugin.id(), path.display(), e);
                self.publish(LifecycleEvent::failed(
                    LifecycleEventKind::Install,
                    plugin.id(),
                    Some(path),
                    &e,
                ));
                return Err(e);
            }
        }

        self.status(cancel, plugin.id()).await
    }

    /// 지정한 위치에서 플러그인 제거
    pub async fn uninstall(&self, cancel: &CancellationToken, id: &str, path: &Path) -> Result<PluginStatus> {
        let plugin = self.find(id)?;
        require_path(path)?;

        let cfg = plugin.install_config(cancel).await;
        if !may_proceed(Operation::Uninstall, &cfg) {
            return Err(Error::policy_rejected(plugin.name(), Operation::Uninstall, Some(path)));
        }

        if let Err(e) = plugin.uninstall(cancel, path).await {
            self.publish(LifecycleEvent::failed(
                LifecycleEventKind::Uninstall,
                plugin.id(),
                Some(path),
                &e,
            ));
            return Err(e);
        }

        info!("Uninstalled {} plugin at {}", plugin.id(), path.display());
        self.publish(LifecycleEvent::new(LifecycleEventKind::Uninstall, plugin.id(), Some(path)));

        self.status(cancel, plugin.id()).await
    }

    /// 플러그인이 설치된 모든 위치를 업데이트
    ///
    /// 첫 실패에서 중단하고 그 에러를 반환한다. 변경된 위치 수를 반환한다.
    pub async fn update(&self, cancel: &CancellationToken, id: &str) -> Result<usize> {
        let plugin = self.find(id)?;

        let cfg = plugin.install_config(cancel).await;
        if !may_proceed(Operation::Update, &cfg) {
            return Err(Error::policy_rejected(plugin.name(), Operation::Update, None));
        }

        debug!("Updating {}...", plugin.name());
        let locations = self.detect_locations(cancel, plugin.as_ref()).await?;

        let mut updated = 0;
        for location in locations {
            if !plugin.is_installed(&location.path) {
                continue;
            }

            match plugin.update(cancel, &location.path).await {
                Ok(InstallOutcome::AlreadyInstalled) => {}
                Ok(_) => {
                    updated += 1;
                    self.publish(LifecycleEvent::new(
                        LifecycleEventKind::Update,
                        plugin.id(),
                        Some(&location.path),
                    ));
                }
                Err(e) => {
                    self.publish(LifecycleEvent::failed(
                        LifecycleEventKind::Update,
                        plugin.id(),
                        Some(&location.path),
                        &e,
                    ));
                    return Err(e);
                }
            }
        }

        if updated > 0 {
            info!("Updated {} plugin at {} locations", plugin.id(), updated);
        }
        Ok(updated)
    }

    /// 모든 패밀리, 모든 위치에서 플러그인 제거
    ///
    /// 위치별 실패는 모아서 반환하고 나머지는 계속 진행한다. 정책 게이트에
    /// 막힌 패밀리는 건너뛰고 에러로 기록한다.
    pub async fn uninstall_all(&self, cancel: &CancellationToken) -> UninstallAllReport {
        let mut report = UninstallAllReport::default();

        for plugin in &self.plugins {
            let locations = match self.detect_locations(cancel, plugin.as_ref()).await {
                Ok(locations) => locations,
                Err(e) => {
                    report
                        .errors
                        .push(OperationError::new(format!("Failed to detect {}", plugin.name()), &e));
                    continue;
                }
            };

            let cfg = plugin.install_config(cancel).await;
            if may_proceed(Operation::Uninstall, &cfg) {
                for location in &locations {
                    match plugin.uninstall(cancel, &location.path).await {
                        Ok(()) => self.publish(LifecycleEvent::new(
                            LifecycleEventKind::Uninstall,
                            plugin.id(),
                            Some(&location.path),
                        )),
                        Err(e) => {
                            self.publish(LifecycleEvent::failed(
                                LifecycleEventKind::Uninstall,
                                plugin.id(),
                                Some(&location.path),
                                &e,
                            ));
                            report.errors.push(OperationError::new(
                                format!(
                                    "Failed to uninstall {} at path {}",
                                    plugin.name(),
                                    location.path.display()
                                ),
                                &e,
                            ));
                        }
                    }
                }
            } else {
                let e = Error::policy_rejected(plugin.name(), Operation::Uninstall, None);
                warn!("{}", e);
                report
                    .errors
                    .push(OperationError::new(format!("Failed to uninstall {}", plugin.name()), &e));
            }

            let status = PluginStatus::compute(cancel, plugin.as_ref(), locations).await;
            report.plugins.push(self.annotate(status));
        }

        info!("Uninstalled all plugins ({} errors)", report.errors.len());
        report
    }

    // ========================================================================
    // 자동 설치
    // ========================================================================

    /// 자동 설치 스윕
    ///
    /// 아직 사용자가 보지 않은 패밀리마다 감지된 위치와 레지스트리 위치의 합집합에
    /// 설치한다. 설치에 성공한 패밀리 ID를 기존 목록에 합쳐 저장하고, 이번에
    /// 새로 설치된 ID를 반환한다.
    pub async fn auto_install(
        &self,
        cancel: &CancellationToken,
        detected: &HashMap<String, Vec<PathBuf>>,
    ) -> Vec<String> {
        if !self.auto_install_enabled() {
            debug!("Automatic plugin installation is disabled");
            return Vec::new();
        }

        let encountered = self.encountered();
        let mut installed_ids = Vec::new();

        for plugin in &self.plugins {
            if cancel.is_cancelled() {
                break;
            }
            if encountered.get(plugin.id()).copied().unwrap_or(false) {
                continue;
            }

            let paths = dedupe_paths(
                detected
                    .get(plugin.id())
                    .cloned()
                    .unwrap_or_default()
                    .into_iter()
                    .chain(self.registry.list(plugin.id())),
            );

            let mut installed_any = false;
            for path in paths {
                if cancel.is_cancelled() {
                    break;
                }
                if plugin.is_installed(&path) {
                    continue;
                }

                let cfg = plugin.install_config(cancel).await;
                if !may_proceed(Operation::Install, &cfg) {
                    debug!(
                        "Skipping automatic install of {} at {}: a process is running",
                        plugin.id(),
                        path.display()
                    );
                    continue;
                }

                match plugin.install(cancel, &path).await {
                    Ok(outcome) => {
                        info!("Automatically installed {} plugin at {}", plugin.id(), path.display());
                        installed_any |= outcome.changed();
                        self.publish(LifecycleEvent::new(
                            LifecycleEventKind::AutoInstall,
                            plugin.id(),
                            Some(&path),
                        ));
                    }
                    Err(e) => {
                        warn!(
                            "Error installing {} plugin automatically at {}: {}",
                            plugin.id(),
                            path.display(),
                            e
                        );
                        self.publish(LifecycleEvent::failed(
                            LifecycleEventKind::AutoInstall,
                            plugin.id(),
                            Some(&path),
                            &e,
                        ));
                    }
                }
            }

            if installed_any {
                installed_ids.push(plugin.id().to_string());
            }
        }

        if !installed_ids.is_empty() {
            if let Err(e) = self.merge_auto_installed(&installed_ids) {
                error!("Failed to save automatically installed plugins: {}", e);
            }
        }
        installed_ids
    }

    fn merge_auto_installed(&self, ids: &[String]) -> Result<()> {
        let _state = self.state.lock();
        let mut merged: BTreeSet<String> = self
            .settings
            .get_obj::<Vec<String>>(AUTO_INSTALLED_IDS_KEY)
            .unwrap_or_default()
            .into_iter()
            .collect();
        merged.extend(ids.iter().cloned());
        let merged: Vec<String> = merged.into_iter().collect();
        self.settings.set_obj(AUTO_INSTALLED_IDS_KEY, &merged)
    }

    /// 자동 설치된 ID 목록 조회 (정렬, 비어 있으면 None)
    pub fn auto_installed(&self) -> Option<Vec<String>> {
        let _state = self.state.lock();
        sorted_ids(self.settings.get_obj(AUTO_INSTALLED_IDS_KEY))
    }

    /// 자동 설치된 ID 목록을 읽고 삭제
    ///
    /// 스윕의 병합과 같은 락 안에서 수행하므로 사이에 추가된 ID를 잃지 않는다.
    pub fn take_auto_installed(&self) -> Result<Option<Vec<String>>> {
        let _state = self.state.lock();
        let ids = self.settings.get_obj(AUTO_INSTALLED_IDS_KEY);
        self.settings.delete(AUTO_INSTALLED_IDS_KEY)?;
        Ok(sorted_ids(ids))
    }

    pub fn auto_install_enabled(&self) -> bool {
        self.settings
            .get_bool(AUTO_INSTALL_ENABLED_KEY)
            .unwrap_or(self.auto_install_default)
    }

    pub fn set_auto_install_enabled(&self, enabled: bool) -> Result<()> {
        info!("Automatic plugin installation enabled: {}", enabled);
        self.settings.set_bool(AUTO_INSTALL_ENABLED_KEY, enabled)
    }

    // ========================================================================
    // Encountered
    // ========================================================================

    /// 사용자가 이미 본 패밀리 맵
    pub fn encountered(&self) -> BTreeMap<String, bool> {
        self.state.lock().encountered.clone()
    }

    /// 본 패밀리 추가 후 전체 맵 반환
    pub fn save_encountered<I, S>(&self, ids: I) -> Result<BTreeMap<String, bool>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state.lock();
        for id in ids {
            state.encountered.insert(id.into(), true);
        }
        self.settings.set_obj(ENCOUNTERED_EDITORS_KEY, &state.encountered)?;
        Ok(state.encountered.clone())
    }

    // ========================================================================
    // 사용자 경로
    // ========================================================================

    /// 사용자 지정 에디터 경로 추가
    ///
    /// 경로가 해당 패밀리의 에디터로 해석되어야 기억한다.
    pub async fn add_editor_path(&self, cancel: &CancellationToken, id: &str, path: &Path) -> Result<PluginStatus> {
        let plugin = self.find(id)?;
        require_path(path)?;

        let location = plugin.describe(cancel, path).await?;
        if self.registry.add_manual(plugin.id(), &location.path) {
            info!("Added {} editor path {}", plugin.id(), location.path.display());
        }

        self.status(cancel, plugin.id()).await
    }

    /// 에디터 경로 제거
    pub async fn remove_editor_path(&self, cancel: &CancellationToken, id: &str, path: &Path) -> Result<PluginStatus> {
        let plugin = self.find(id)?;
        require_path(path)?;

        if !self.registry.remove(plugin.id(), path) {
            return Err(Error::NotFound(format!(
                "{} is not a known {} location",
                path.display(),
                plugin.name()
            )));
        }

        self.status(cancel, plugin.id()).await
    }

    // ========================================================================
    // 파일 열기 / 최근 에디터
    // ========================================================================

    /// 에디터로 파일 열기
    pub async fn open_file(
        &self,
        cancel: &CancellationToken,
        id: &str,
        editor_path: Option<&Path>,
        file: &Path,
        line: Option<u32>,
    ) -> Result<Option<OpenFileCompletion>> {
        let plugin = self.find(id)?;
        require_path(file)?;
        plugin.open_file(cancel, id, editor_path, file, line).await
    }

    /// 에디터 이벤트 기록 (가장 최근 에디터 갱신)
    pub fn record_editor_event(&self, source: impl Into<String>) {
        self.state.lock().mru_editor = Some(source.into());
    }

    pub fn most_recent_editor(&self) -> Option<String> {
        self.state.lock().mru_editor.clone()
    }

    fn publish(&self, event: LifecycleEvent) {
        self.event_bus.publish(event);
    }
}

fn require_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(Error::InvalidInput("Editor path not specified.".into()));
    }
    Ok(())
}

fn sorted_ids(ids: Option<Vec<String>>) -> Option<Vec<String>> {
    let mut ids = ids.filter(|ids| !ids.is_empty())?;
    ids.sort();
    Some(ids)
}
