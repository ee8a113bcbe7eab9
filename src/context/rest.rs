use super::{BaseContext, Context};
use crate::http::{ApiRequest, ApiResponse};
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json; charset=utf-8";

/// Convenience context for REST handlers.
///
/// Path and query parameters come from the inbound request as parsed by the
/// gateway; the route table never resolves parameter names itself.
#[derive(Debug)]
pub struct RestContext {
    base: BaseContext,
    response: ApiResponse,
}

impl RestContext {
    pub fn params(&self) -> &HashMap<String, String> {
        &self.base.request.path_parameters
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params().get(key).map(String::as_str)
    }

    pub fn queries(&self) -> &HashMap<String, String> {
        &self.base.request.query_string_parameters
    }

    pub fn query(&self, key: &str) -> Option<&str> {
        self.queries().get(key).map(String::as_str)
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.base.request.get_header(key)
    }

    pub fn body(&self) -> &str {
        &self.base.request.body
    }

    pub fn body_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        let request = &self.base.request;
        if request.is_base64_encoded {
            base64::engine::general_purpose::STANDARD.decode(&request.body)
        } else {
            Ok(request.body.as_bytes().to_vec())
        }
    }

    /// Decodes the JSON request body.
    pub fn bind<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(self.body())
    }

    /// Opaque caller metadata, passed through from the event.
    pub fn caller(&self) -> &Value {
        &self.base.request.request_context
    }

    pub fn response(&self) -> &ApiResponse {
        &self.response
    }

    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.response.header(key, value);
    }

    pub fn text(&mut self, code: u16, text: impl Into<String>) {
        self.response.write(code, TEXT_PLAIN, text.into());
    }

    /// Serializes `value` as the response body. A value that fails to
    /// serialize turns the response into a 500 carrying the error text.
    pub fn json<T: Serialize + ?Sized>(&mut self, code: u16, value: &T) {
        match serde_json::to_string(value) {
            Ok(data) => {
                self.response.write(code, APPLICATION_JSON, data);
            }
            Err(err) => self.server_error(err),
        }
    }

    pub fn binary(&mut self, code: u16, content_type: &str, bytes: &[u8]) {
        self.response.binary(code, content_type, bytes);
    }

    fn server_error(&mut self, err: serde_json::Error) {
        warn!(error = %err, path = %self.base.request.path, "response serialization failed");
        self.response.write(500, TEXT_PLAIN, err.to_string());
    }
}

impl Context for RestContext {
    fn from_request(request: ApiRequest) -> Self {
        Self {
            base: BaseContext::new(request),
            response: ApiResponse::default(),
        }
    }

    fn base(&self) -> &BaseContext {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseContext {
        &mut self.base
    }

    fn into_response(self) -> ApiResponse {
        self.response
    }
}
