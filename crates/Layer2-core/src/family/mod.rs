//! Editor Families - `EditorPlugin` 구현체
//!
//! - `ConfiguredFamily`: 설정 파일(`families`)로 정의한 패밀리

mod configured;

pub use configured::ConfiguredFamily;
