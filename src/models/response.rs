use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Success code used by the OpenList envelope
pub const CODE_OK: i64 = 200;

/// Envelope shared by every OpenList response: `{code, message, data}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Value,
}

impl ApiResponse {
    /// Read the envelope out of a raw response; `None` if `code` is missing
    pub fn from_value(value: &Value) -> Option<Self> {
        let code = value.get("code")?.as_i64()?;
        Some(Self {
            code,
            message: value
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or_default()
                .to_string(),
            data: value.get("data").cloned().unwrap_or(Value::Null),
        })
    }

    pub fn is_success(&self) -> bool {
        self.code == CODE_OK
    }

    /// `data` as a list, empty when it is anything else
    pub fn data_list(&self) -> Vec<Value> {
        self.data.as_array().cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value() {
        let raw = json!({"code": 200, "message": "success", "data": {"content": []}});
        let response = ApiResponse::from_value(&raw).unwrap();
        assert!(response.is_success());
        assert_eq!(response.message, "success");
        assert_eq!(response.data, json!({"content": []}));
    }

    #[test]
    fn test_from_value_missing_fields() {
        let response = ApiResponse::from_value(&json!({"code": 401})).unwrap();
        assert!(!response.is_success());
        assert_eq!(response.message, "");
        assert_eq!(response.data, Value::Null);

        assert!(ApiResponse::from_value(&json!({"message": "no code"})).is_none());
        assert!(ApiResponse::from_value(&json!([1, 2])).is_none());
    }

    #[test]
    fn test_data_list() {
        let response = ApiResponse::from_value(&json!({"code": 200, "data": [{"id": "a"}]})).unwrap();
        assert_eq!(response.data_list().len(), 1);

        let response = ApiResponse::from_value(&json!({"code": 200, "data": null})).unwrap();
        assert!(response.data_list().is_empty());
    }
}
