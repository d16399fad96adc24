//! 레지스트리 저장소 -- 서버 이름을 키로 하는 JSON 문서
//!
//! [`RegistryStore`] trait은 프로세스 경계 어댑터가 사용하는 저장소 인터페이스입니다.
//! [`FileRegistry`]는 `{"servers": [...]}` 형식의 JSON 파일 하나를 저장소로 사용합니다.
//!
//! # 갱신 규칙
//!
//! - 같은 이름의 레코드가 있으면 통째로 교체하되 `meta.created_at`은 유지합니다.
//! - `meta.updated_at`은 매 갱신마다 현재 시각으로 기록합니다.
//! - 파일이 없으면 빈 레지스트리로 간주합니다.
//! - 쓰기는 임시 파일에 기록한 뒤 rename합니다.

use std::future::Future;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};

use gatekeeper_core::error::RegistryError;

use crate::record::ServerRecord;

/// 레지스트리 저장소 trait
pub trait RegistryStore: Send + Sync {
    /// 이름으로 레코드를 조회합니다.
    fn get(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<ServerRecord>, RegistryError>> + Send;

    /// 모든 레코드를 저장 순서대로 반환합니다.
    fn list(&self) -> impl Future<Output = Result<Vec<ServerRecord>, RegistryError>> + Send;

    /// 레코드를 추가하거나 교체하고, 저장된 레코드를 반환합니다.
    fn upsert(
        &self,
        record: ServerRecord,
    ) -> impl Future<Output = Result<ServerRecord, RegistryError>> + Send;

    /// 레코드를 삭제합니다.
    ///
    /// # Errors
    ///
    /// 레코드가 없으면 `RegistryError::NotFound`를 반환합니다.
    fn delete(&self, name: &str) -> impl Future<Output = Result<(), RegistryError>> + Send;
}

/// 레지스트리 JSON 문서
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    servers: Vec<ServerRecord>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// JSON 파일 기반 레지스트리
#[derive(Debug)]
pub struct FileRegistry {
    path: PathBuf,
    // 같은 프로세스 안의 read-modify-write 직렬화
    write_lock: Mutex<()>,
}

impl FileRegistry {
    /// 주어진 경로의 레지스트리를 엽니다. 파일은 첫 쓰기 때 생성됩니다.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// 레지스트리 파일 경로
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<RegistryDocument, RegistryError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "registry file not found, starting empty");
                return Ok(RegistryDocument::default());
            }
            Err(e) => {
                return Err(RegistryError::ReadFailed {
                    path: self.path.display().to_string(),
                    reason: e.to_string(),
                });
            }
        };

        if content.trim().is_empty() {
            return Ok(RegistryDocument::default());
        }

        serde_json::from_str(&content).map_err(|e| RegistryError::Corrupt {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }

    async fn save(&self, document: &RegistryDocument) -> Result<(), RegistryError> {
        let write_failed = |reason: String| RegistryError::WriteFailed {
            path: self.path.display().to_string(),
            reason,
        };

        let body = serde_json::to_string_pretty(document).map_err(|e| write_failed(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| write_failed(e.to_string()))?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| write_failed(e.to_string()))?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(write_failed(e.to_string()));
        }
        Ok(())
    }
}

impl RegistryStore for FileRegistry {
    async fn get(&self, name: &str) -> Result<Option<ServerRecord>, RegistryError> {
        let document = self.load().await?;
        Ok(document.servers.into_iter().find(|s| s.name == name))
    }

    async fn list(&self) -> Result<Vec<ServerRecord>, RegistryError> {
        Ok(self.load().await?.servers)
    }

    async fn upsert(&self, mut record: ServerRecord) -> Result<ServerRecord, RegistryError> {
        record.validate()?;

        let _guard = self.write_lock.lock().await;
        let mut document = self.load().await?;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

        let existing_created = document
            .servers
            .iter()
            .find(|s| s.name == record.name)
            .and_then(|s| s.created_at().map(str::to_owned));

        let replaced = document.servers.iter().any(|s| s.name == record.name);
        match existing_created {
            Some(created_at) => record.set_created_at(created_at),
            None if record.created_at().is_none() => record.set_created_at(now.clone()),
            None => {}
        }
        record.set_updated_at(now);

        document.servers.retain(|s| s.name != record.name);
        document.servers.push(record.clone());
        self.save(&document).await?;

        info!(server = %record.name, replaced, "registry record saved");
        Ok(record)
    }

    async fn delete(&self, name: &str) -> Result<(), RegistryError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load().await?;

        let before = document.servers.len();
        document.servers.retain(|s| s.name != name);
        if document.servers.len() == before {
            return Err(RegistryError::NotFound(name.to_owned()));
        }

        self.save(&document).await?;
        info!(server = name, "registry record deleted");
        Ok(())
    }
}
