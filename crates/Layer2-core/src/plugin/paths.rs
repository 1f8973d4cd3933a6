//! 경로 유틸리티

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// 파일 시스템 접근 없이 경로를 정규화
///
/// `.` 제거, `..` 처리, 끝의 구분자 제거. 존재하지 않는 경로도 처리할 수 있도록
/// canonicalize를 쓰지 않는다.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component.as_os_str());
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

/// 순서를 유지하며 중복 경로 제거 (정규화 기준)
pub fn dedupe_paths(paths: impl IntoIterator<Item = PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for path in paths {
        let normalized = normalize_path(&path);
        if seen.insert(normalized.clone()) {
            result.push(normalized);
        }
    }
    result
}
