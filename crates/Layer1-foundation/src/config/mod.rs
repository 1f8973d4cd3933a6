//! Config - 통합 설정 관리
//!
//! - `editorlink.rs` - EditorLinkConfig 통합 설정
//! - `family.rs` - 설정 기반 에디터 패밀리 정의

mod editorlink;
mod family;

pub use editorlink::{DriverConfig, EditorLinkConfig, CONFIG_FILE};
pub use family::{AssetSourceConfig, FamilyConfig};
