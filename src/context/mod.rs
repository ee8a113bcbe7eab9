//! Per-request state threaded through a handler chain.
//!
//! Two flavors share a [`BaseContext`] by composition:
//! [`RestContext`] offers parsed parameters and body helpers,
//! [`HttpContext`] hands out the raw request and response records.

mod raw;
mod rest;

pub use raw::HttpContext;
pub use rest::RestContext;

use crate::http::{ApiRequest, ApiResponse};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// String-keyed values handlers leave for later handlers in the same chain.
#[derive(Default)]
pub struct Attributes {
    data: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.data.insert(key.into(), Box::new(value));
    }

    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.data.get(key).and_then(|boxed| boxed.downcast_ref())
    }

    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.data.get_mut(key).and_then(|boxed| boxed.downcast_mut())
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.data.remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.data.keys()).finish()
    }
}

#[derive(Debug)]
pub struct BaseContext {
    pub(crate) request: ApiRequest,
    pub(crate) attributes: Attributes,
    aborted: bool,
}

impl BaseContext {
    pub fn new(request: ApiRequest) -> Self {
        Self {
            request,
            attributes: Attributes::new(),
            aborted: false,
        }
    }
}

/// The capabilities every context flavor exposes to handlers.
///
/// A router is generic over its context type; a fresh context is built with
/// [`Context::from_request`] for each dispatch and turned into the outgoing
/// response with [`Context::into_response`] once the chain is done.
pub trait Context: Sized {
    fn from_request(request: ApiRequest) -> Self;

    fn base(&self) -> &BaseContext;

    fn base_mut(&mut self) -> &mut BaseContext;

    fn into_response(self) -> ApiResponse;

    fn request(&self) -> &ApiRequest {
        &self.base().request
    }

    /// Remembers a value for the handlers that run after this one.
    fn set<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.base_mut().attributes.insert(key, value);
    }

    /// Recalls a value stored by an earlier handler. `None` when the key is
    /// missing or holds a different type.
    fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.base().attributes.get(key)
    }

    fn attributes(&self) -> &Attributes {
        &self.base().attributes
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.base_mut().attributes
    }

    /// Stops the chain: no handler after the current one runs.
    fn abort(&mut self) {
        self.base_mut().aborted = true;
    }

    fn is_aborted(&self) -> bool {
        self.base().aborted
    }
}
