use super::{BaseContext, Context};
use crate::http::{ApiRequest, ApiResponse};

/// Passthrough context: handlers shape the response record themselves.
#[derive(Debug)]
pub struct HttpContext {
    base: BaseContext,
    pub response: ApiResponse,
}

impl HttpContext {
    pub fn response_mut(&mut self) -> &mut ApiResponse {
        &mut self.response
    }
}

impl Context for HttpContext {
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
