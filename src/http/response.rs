use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub status_code: u16,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

impl Default for ApiResponse {
    fn default() -> Self {
        Self::new(200)
    }
}

impl ApiResponse {
    pub fn new(status_code: u16) -> ApiResponse {
        ApiResponse {
            status_code,
            headers: HashMap::new(),
            body: String::new(),
            is_base64_encoded: false,
        }
    }

    /// The default answer for an unmatched route: 404 with the message as body.
    pub fn not_found(message: impl Into<String>) -> ApiResponse {
        let mut response = ApiResponse::new(404);
        response.body(message.into());
        response
    }

    pub fn status(&mut self, status_code: u16) -> &mut Self {
        self.status_code = status_code;
        self
    }

    pub fn body<T: Into<String>>(&mut self, body: T) -> &mut Self {
        self.body = body.into();
        self.is_base64_encoded = false;
        self
    }

    pub fn header<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) -> &mut Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    // Status, body and both content headers in one go.
    pub(crate) fn write(&mut self, status_code: u16, content_type: &str, body: String) -> &mut Self {
        let length = body.len();
        self.status(status_code)
            .body(body)
            .header("Content-Type", content_type)
            .header("Content-Length", length.to_string())
    }

    /// Stores raw bytes base64-encoded, the way gateways expect binary bodies.
    pub fn binary(&mut self, status_code: u16, content_type: &str, bytes: &[u8]) -> &mut Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        self.status(status_code)
            .body(encoded)
            .header("Content-Type", content_type)
            .header("Content-Length", bytes.len().to_string());
        self.is_base64_encoded = true;
        self
    }

    /// The body as raw bytes, undoing base64 encoding when flagged.
    pub fn decoded_body(&self) -> Result<Vec<u8>, base64::DecodeError> {
        if self.is_base64_encoded {
            base64::engine::general_purpose::STANDARD.decode(&self.body)
        } else {
            Ok(self.body.as_bytes().to_vec())
        }
    }
}
