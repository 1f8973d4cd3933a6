//! Editor Registry - 발견된 에디터 위치 저장소
//!
//! 패밀리 ID별로 두 종류의 경로 집합을 관리합니다.
//!
//! - `detected`: 백그라운드 스캔(실행 중인 에디터 등)으로 발견된 경로
//! - `manual`: 사용자가 직접 추가한 경로
//!
//! 전체 레지스트리는 하나의 뮤텍스로 직렬화되고 editors.json 하나로 영속화됩니다.
//! `purge_missing`은 락을 잡은 채 파일 시스템을 확인하므로 백그라운드 경로에서만
//! 호출해야 합니다.

use super::paths::normalize_path;
use editorlink_foundation::{JsonStore, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 레지스트리 파일명
pub const EDITORS_FILE: &str = "editors.json";

// ============================================================================
// PathKind - 경로 종류
// ============================================================================

/// 경로가 레지스트리에 들어온 경로
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathKind {
    /// 자동 감지
    Detected,
    /// 사용자 추가
    Manual,
}

// ============================================================================
// EditorsFile - editors.json 구조
// ============================================================================

/// editors.json 파일 구조
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorsFile {
    #[serde(default)]
    pub detected: BTreeMap<String, Vec<PathBuf>>,

    #[serde(default)]
    pub manual: BTreeMap<String, Vec<PathBuf>>,
}

impl EditorsFile {
    fn set(&self, kind: PathKind) -> &BTreeMap<String, Vec<PathBuf>> {
        match kind {
            PathKind::Detected => &self.detected,
            PathKind::Manual => &self.manual,
        }
    }

    fn set_mut(&mut self, kind: PathKind) -> &mut BTreeMap<String, Vec<PathBuf>> {
        match kind {
            PathKind::Detected => &mut self.detected,
            PathKind::Manual => &mut self.manual,
        }
    }

    fn path_count(&self) -> usize {
        self.detected.values().chain(self.manual.values()).map(Vec::len).sum()
    }
}

// ============================================================================
// EditorRegistry
// ============================================================================

/// 에디터 위치 레지스트리
pub struct EditorRegistry {
    /// 영속화 위치 (None이면 메모리 전용)
    store: Option<JsonStore>,

    /// 레지스트리 전체 락
    state: Mutex<EditorsFile>,
}

impl EditorRegistry {
    /// 새 레지스트리 생성 (아직 로드하지 않음)
    pub fn new(store: JsonStore) -> Self {
        Self {
            store: Some(store),
            state: Mutex::new(EditorsFile::default()),
        }
    }

    /// 영속화하지 않는 레지스트리
    pub fn in_memory() -> Self {
        Self {
            store: None,
            state: Mutex::new(EditorsFile::default()),
        }
    }

    /// 생성 후 바로 로드
    ///
    /// 파일이 없거나 읽을 수 없으면 빈 레지스트리로 시작한다.
    pub fn open(store: JsonStore) -> Self {
        let registry = Self::new(store);
        if let Err(e) = registry.load() {
            warn!("Starting with an empty editor registry: {}", e);
        }
        registry
    }

    // ========================================================================
    // 로드 / 저장
    // ========================================================================

    /// editors.json 로드 (첫 실행이면 빈 상태 유지)
    pub fn load(&self) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };

        match store.load_optional::<EditorsFile>(EDITORS_FILE)? {
            Some(file) => {
                let count = file.path_count();
                *self.state.lock() = file;
                info!("Loaded {} editor paths", count);
            }
            None => debug!("{} not found, using empty registry", EDITORS_FILE),
        }
        Ok(())
    }

    /// editors.json 저장
    pub fn save(&self) -> Result<()> {
        let state = self.state.lock();
        self.save_locked(&state)
    }

    fn save_locked(&self, state: &EditorsFile) -> Result<()> {
        if let Some(store) = &self.store {
            store.save(EDITORS_FILE, state)?;
            debug!("Saved {} with {} paths", EDITORS_FILE, state.path_count());
        }
        Ok(())
    }

    fn persist(&self, state: &EditorsFile) {
        if let Err(e) = self.save_locked(state) {
            warn!("Failed to save editor registry: {}", e);
        }
    }

    // ========================================================================
    // 경로 관리
    // ========================================================================

    /// 경로 추가
    ///
    /// 정규화한 경로가 이미 있으면 false.
    pub fn add(&self, kind: PathKind, family_id: &str, path: &Path) -> bool {
        let path = normalize_path(path);
        let mut state = self.state.lock();

        let paths = state.set_mut(kind).entry(family_id.to_string()).or_default();
        if paths.contains(&path) {
            return false;
        }

        debug!("Adding {:?} path for {}: {}", kind, family_id, path.display());
        paths.push(path);
        self.persist(&state);
        true
    }

    /// 자동 감지 경로 추가
    pub fn add_detected(&self, family_id: &str, path: &Path) -> bool {
        self.add(PathKind::Detected, family_id, path)
    }

    /// 사용자 경로 추가
    pub fn add_manual(&self, family_id: &str, path: &Path) -> bool {
        self.add(PathKind::Manual, family_id, path)
    }

    /// 경로 제거 (두 집합 모두에서)
    pub fn remove(&self, family_id: &str, path: &Path) -> bool {
        let path = normalize_path(path);
        let mut state = self.state.lock();

        let mut removed = false;
        for kind in [PathKind::Detected, PathKind::Manual] {
            if let Some(paths) = state.set_mut(kind).get_mut(family_id) {
                let before = paths.len();
                paths.retain(|p| p != &path);
                removed |= paths.len() != before;
            }
        }

        if removed {
            debug!("Removed path for {}: {}", family_id, path.display());
            self.persist(&state);
        }
        removed
    }

    /// 패밀리의 모든 경로 (detected 먼저, 중복 제거)
    pub fn list(&self, family_id: &str) -> Vec<PathBuf> {
        let state = self.state.lock();
        let mut result: Vec<PathBuf> = Vec::new();
        for kind in [PathKind::Detected, PathKind::Manual] {
            if let Some(paths) = state.set(kind).get(family_id) {
                for path in paths {
                    if !result.contains(path) {
                        result.push(path.clone());
                    }
                }
            }
        }
        result
    }

    /// 특정 종류의 경로만
    pub fn list_kind(&self, kind: PathKind, family_id: &str) -> Vec<PathBuf> {
        self.state
            .lock()
            .set(kind)
            .get(family_id)
            .cloned()
            .unwrap_or_default()
    }

    /// 디스크에 존재하지 않는 경로 제거
    ///
    /// 모든 패밀리, 두 집합 모두 대상. 제거한 개수를 반환한다.
    pub fn purge_missing(&self) -> usize {
        let mut state = self.state.lock();

        let mut purged = 0;
        for kind in [PathKind::Detected, PathKind::Manual] {
            for (family_id, paths) in state.set_mut(kind).iter_mut() {
                let before = paths.len();
                paths.retain(|p| p.exists());
                let removed = before - paths.len();
                if removed > 0 {
                    debug!("Purged {} missing {:?} paths of {}", removed, kind, family_id);
                }
                purged += removed;
            }
            state.set_mut(kind).retain(|_, paths| !paths.is_empty());
        }

        if purged > 0 {
            info!("Purged {} missing editor paths", purged);
            self.persist(&state);
        }
        purged
    }

    /// 전체 스냅샷
    pub fn snapshot(&self) -> EditorsFile {
        self.state.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_add_is_idempotent() {
        let registry = EditorRegistry::in_memory();
        let path = Path::new("/opt/sublime_text");

        assert!(registry.add_detected("sublime3", path));
        assert!(!registry.add_detected("sublime3", path));
        assert!(!registry.add_detected("sublime3", Path::new("/opt/sublime_text/")));

        assert_eq!(registry.list("sublime3").len(), 1);
    }

    #[test]
    fn test_list_merges_detected_and_manual() {
        let registry = EditorRegistry::in_memory();
        registry.add_detected("vim", Path::new("/usr/bin/vim"));
        registry.add_manual("vim", Path::new("/opt/vim/bin/vim"));
        registry.add_manual("vim", Path::new("/usr/bin/vim"));

        assert_eq!(
            registry.list("vim"),
            vec![PathBuf::from("/usr/bin/vim"), PathBuf::from("/opt/vim/bin/vim")]
        );
        assert_eq!(registry.list_kind(PathKind::Manual, "vim").len(), 2);
        assert!(registry.list("atom").is_empty());
    }

    #[test]
    fn test_remove() {
        let registry = EditorRegistry::in_memory();
        registry.add_detected("vim", Path::new("/usr/bin/vim"));
        registry.add_manual("vim", Path::new("/usr/bin/vim"));

        assert!(registry.remove("vim", Path::new("/usr/bin/vim")));
        assert!(registry.list("vim").is_empty());
        assert!(!registry.remove("vim", Path::new("/usr/bin/vim")));
    }

    #[test]
    fn test_purge_missing() {
        let temp = TempDir::new().unwrap();
        let existing = temp.path().join("pycharm");
        std::fs::create_dir_all(&existing).unwrap();

        let registry = EditorRegistry::in_memory();
        registry.add_detected("pycharm", &existing);
        registry.add_detected("pycharm", &temp.path().join("gone"));
        registry.add_manual("goland", &temp.path().join("also-gone"));
        registry.add_manual("goland", &existing);

        assert_eq!(registry.purge_missing(), 2);
        assert_eq!(registry.list("pycharm"), vec![existing.clone()]);
        assert_eq!(registry.list("goland"), vec![existing]);

        // 두 번째 호출은 아무 것도 제거하지 않음
        assert_eq!(registry.purge_missing(), 0);
    }

    #[test]
    fn test_purge_empty_registry() {
        let registry = EditorRegistry::in_memory();
        assert_eq!(registry.purge_missing(), 0);
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let store = JsonStore::new(temp.path());

        let registry = EditorRegistry::open(store.clone());
        registry.add_detected("vscode", Path::new("/usr/share/code"));
        registry.add_manual("vim", Path::new("/usr/bin/vim"));

        let reloaded = EditorRegistry::open(store.clone());
        assert_eq!(reloaded.snapshot(), registry.snapshot());

        // 파일 형식 확인
        let raw: serde_json::Value = store.load(EDITORS_FILE).unwrap();
        assert_eq!(raw["detected"]["vscode"][0], "/usr/share/code");
        assert_eq!(raw["manual"]["vim"][0], "/usr/bin/vim");
    }

    #[test]
    fn test_open_without_file() {
        let temp = TempDir::new().unwrap();
        let registry = EditorRegistry::open(JsonStore::new(temp.path().join("missing")));
        assert_eq!(registry.snapshot(), EditorsFile::default());
    }
}
