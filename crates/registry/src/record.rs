//! 서버 레코드 -- 레지스트리 문서의 `servers[]` 항목
//!
//! 레지스트리는 `name`과 `meta`만 해석하고 나머지 필드(리포트, 도구 목록, 가격 정보 등)는
//! 그대로 보존합니다.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use gatekeeper_core::error::RegistryError;

/// 레지스트리에 저장되는 서버 레코드
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRecord {
    /// 고유 서버 이름 (키)
    pub name: String,
    /// 생성/수정 시각
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<RecordMeta>,
    /// 레지스트리가 해석하지 않는 나머지 필드
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// 레코드 메타데이터
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordMeta {
    /// 최초 생성 시각 (RFC 3339). 갱신 시에도 유지됩니다.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// 마지막 갱신 시각 (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// 기타 메타 필드
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ServerRecord {
    /// 이름만 가진 레코드를 생성합니다.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            meta: None,
            fields: Map::new(),
        }
    }

    /// 필드를 추가합니다.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// 임의의 JSON 값에서 레코드를 만듭니다.
    ///
    /// # Errors
    ///
    /// 객체가 아니거나 `name`이 비어 있으면 `RegistryError::InvalidRecord`를 반환합니다.
    pub fn from_value(value: Value) -> Result<Self, RegistryError> {
        if !value.is_object() {
            return Err(RegistryError::InvalidRecord(
                "server record must be a JSON object".to_owned(),
            ));
        }
        let record: Self = serde_json::from_value(value)
            .map_err(|e| RegistryError::InvalidRecord(e.to_string()))?;
        record.validate()?;
        Ok(record)
    }

    /// 레코드를 검증합니다.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.name.trim().is_empty() {
            return Err(RegistryError::InvalidRecord(
                "'name' must not be empty".to_owned(),
            ));
        }
        Ok(())
    }

    /// 생성 시각 (없으면 `None`)
    pub fn created_at(&self) -> Option<&str> {
        self.meta.as_ref()?.created_at.as_deref()
    }

    /// 생성 시각을 설정합니다.
    pub fn set_created_at(&mut self, created_at: String) {
        self.meta.get_or_insert_with(RecordMeta::default).created_at = Some(created_at);
    }

    /// 갱신 시각을 설정합니다.
    pub fn set_updated_at(&mut self, updated_at: String) {
        self.meta.get_or_insert_with(RecordMeta::default).updated_at = Some(updated_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_fields_are_preserved() {
        let value = json!({
            "name": "weather",
            "repository": {"url": "https://github.com/acme/weather"},
            "tools": {"names": ["get_forecast"], "count": 1},
            "meta": {"created_at": "2026-01-01T00:00:00Z", "owner": "acme"}
        });
        let record = ServerRecord::from_value(value.clone()).unwrap();
        assert_eq!(record.created_at(), Some("2026-01-01T00:00:00Z"));
        assert_eq!(record.fields["tools"]["count"], 1);
        assert_eq!(serde_json::to_value(&record).unwrap(), value);
    }

    #[test]
    fn missing_name_is_invalid() {
        let err = ServerRecord::from_value(json!({"description": "x"})).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidRecord(_)));
    }

    #[test]
    fn empty_name_is_invalid() {
        let err = ServerRecord::from_value(json!({"name": "  "})).unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn non_object_is_invalid() {
        assert!(ServerRecord::from_value(json!(["weather"])).is_err());
    }

    #[test]
    fn set_timestamps_creates_meta() {
        let mut record = ServerRecord::new("weather");
        assert!(record.created_at().is_none());
        record.set_created_at("2026-01-01T00:00:00Z".to_owned());
        record.set_updated_at("2026-02-01T00:00:00Z".to_owned());
        let meta = record.meta.unwrap();
        assert_eq!(meta.created_at.as_deref(), Some("2026-01-01T00:00:00Z"));
        assert_eq!(meta.updated_at.as_deref(), Some("2026-02-01T00:00:00Z"));
    }

    #[test]
    fn record_without_meta_serializes_without_meta() {
        let record = ServerRecord::new("weather").with_field("lang", json!("python"));
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"name": "weather", "lang": "python"})
        );
    }
}
