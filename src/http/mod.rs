pub(crate) mod request;
pub(crate) mod response;

pub use request::{ApiRequest, Method};
pub use response::ApiResponse;
