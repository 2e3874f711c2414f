use serde::{Deserialize, Serialize};

/// Error object returned by the provider, either as the body of a failed
/// HTTP response or as a server-sent event in the middle of a stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorObject {
    /// A human-readable error message.
    #[serde(default)]
    pub message: Option<String>,

    /// The kind of error, e.g. `invalid_request_error`.
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,

    /// Machine readable code, e.g. `model_not_found`.
    #[serde(default)]
    pub code: Option<String>,

    /// Request parameter the error refers to.
    #[serde(default)]
    pub param: Option<String>,
}

/// The `{"error": {...}}` envelope around an [`ApiErrorObject`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// The error itself.
    pub error: ApiErrorObject,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_response_deserialization() {
        let json = r#"{"error":{"message":"The model `nope` does not exist","type":"invalid_request_error","code":"model_not_found"}}"#;
        let response: ErrorResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            response.error.message.as_deref(),
            Some("The model `nope` does not exist")
        );
        assert_eq!(
            response.error.error_type.as_deref(),
            Some("invalid_request_error")
        );
        assert_eq!(response.error.code.as_deref(), Some("model_not_found"));
        assert_eq!(response.error.param, None);
    }

    #[test]
    fn sparse_error_object() {
        let response: ErrorResponse = serde_json::from_str(r#"{"error":{}}"#).unwrap();
        assert_eq!(response.error, ApiErrorObject::default());
    }
}
