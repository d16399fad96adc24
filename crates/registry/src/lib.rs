//! Gatekeeper 서버 레지스트리
//!
//! 스캔을 통과한 MCP 서버 레코드를 서버 이름 기준으로 저장합니다.
//! 스캔 파이프라인은 레지스트리를 호출하지 않으며, 프로세스 경계 어댑터가
//! 명시적인 요청을 받았을 때만 사용합니다.
//!
//! - [`record`]: 서버 레코드 (`ServerRecord`, `RecordMeta`)
//! - [`store`]: 저장소 trait과 JSON 파일 구현 (`RegistryStore`, `FileRegistry`)

pub mod record;
pub mod store;

pub use record::{RecordMeta, ServerRecord};
pub use store::{FileRegistry, RegistryStore};
