mod group;
pub mod tree;

pub use group::Group;

use crate::context::{Context, HttpContext, RestContext};
use crate::error::{RouteError, RouteMiss, RouteResult};
use crate::handler::{run_all, Chain};
use crate::http::{ApiRequest, ApiResponse, Method};
use std::collections::HashMap;
use tracing::{debug, trace};
use tree::RouteTable;

type ErrorHandler<C> = Box<dyn Fn(&RouteError, &mut C) + Send + Sync>;

pub type RestRouter = Router<RestContext>;
pub type HttpRouter = Router<HttpContext>;

/// Owns the route table, the per-group pre-handler chains and the optional
/// not-found hook.
///
/// Routes are registered once at startup; afterwards the router is only read,
/// so a built router can be shared across threads and [`Router::handle`]
/// called concurrently.
pub struct Router<C> {
    table: RouteTable<C>,
    pre_handlers: HashMap<String, Chain<C>>,
    on_error: Option<ErrorHandler<C>>,
}

impl<C> Default for Router<C> {
    fn default() -> Self {
        Self::new()
    }
}

// Prefixes `path` with the group base, adding the separating slash when the
// caller left it out.
pub(crate) fn join(base: &str, path: &str) -> RouteResult<String> {
    if path.is_empty() {
        return Err(RouteError::EmptyPath);
    }
    if path.starts_with('/') {
        Ok(format!("{}{}", base, path))
    } else {
        Ok(format!("{}/{}", base, path))
    }
}

// Registration runs once at startup, so a bad route stops the build.
fn invalid_route(method: &str, path: &str, err: RouteError) -> ! {
    panic!("invalid route {} {:?}: {}", method, path, err)
}

pub(crate) fn trim_base(path: &str) -> &str {
    path.strip_suffix('/').unwrap_or(path)
}

impl<C> Router<C> {
    pub fn new() -> Self {
        Self {
            table: RouteTable::new(),
            pre_handlers: HashMap::new(),
            on_error: None,
        }
    }

    /// Registers `handler` for `method` and `path` on the root group.
    ///
    /// Returns the stored chain so more handlers can follow:
    ///
    /// ```rust
    /// use waypoint::{Context, RestRouter};
    ///
    /// let mut router = RestRouter::new();
    /// router
    ///     .get("/coffee", |c| c.set("memory", "drink?".to_string()))
    ///     .then(|c| {
    ///         let memory = c.get::<String>("memory").cloned().unwrap_or_default();
    ///         c.text(200, memory + " coffee!");
    ///     });
    /// ```
    ///
    /// # Panics
    ///
    /// Panics when the path is empty, has more than
    /// [`MAX_SEGMENTS`](tree::MAX_SEGMENTS) segments, or the method is empty.
    pub fn add<F>(&mut self, method: impl AsRef<str>, path: &str, handler: F) -> &mut Chain<C>
    where
        F: Fn(&mut C) + Send + Sync + 'static,
    {
        self.register(method.as_ref(), "", path, Chain::single(handler))
    }

    pub fn get<F>(&mut self, path: &str, handler: F) -> &mut Chain<C>
    where
        F: Fn(&mut C) + Send + Sync + 'static,
    {
        self.add(Method::GET, path, handler)
    }

    pub fn post<F>(&mut self, path: &str, handler: F) -> &mut Chain<C>
    where
        F: Fn(&mut C) + Send + Sync + 'static,
    {
        self.add(Method::POST, path, handler)
    }

    pub fn put<F>(&mut self, path: &str, handler: F) -> &mut Chain<C>
    where
        F: Fn(&mut C) + Send + Sync + 'static,
    {
        self.add(Method::PUT, path, handler)
    }

    pub fn patch<F>(&mut self, path: &str, handler: F) -> &mut Chain<C>
    where
        F: Fn(&mut C) + Send + Sync + 'static,
    {
        self.add(Method::PATCH, path, handler)
    }

    pub fn delete<F>(&mut self, path: &str, handler: F) -> &mut Chain<C>
    where
        F: Fn(&mut C) + Send + Sync + 'static,
    {
        self.add(Method::DELETE, path, handler)
    }

    pub fn head<F>(&mut self, path: &str, handler: F) -> &mut Chain<C>
    where
        F: Fn(&mut C) + Send + Sync + 'static,
    {
        self.add(Method::HEAD, path, handler)
    }

    pub fn options<F>(&mut self, path: &str, handler: F) -> &mut Chain<C>
    where
        F: Fn(&mut C) + Send + Sync + 'static,
    {
        self.add(Method::OPTIONS, path, handler)
    }

    /// Installs the pre-handler chain for routes registered directly on the
    /// router, replacing any earlier one. Grouped routes do not see it.
    pub fn pre<F>(&mut self, handler: F) -> &mut Chain<C>
    where
        F: Fn(&mut C) + Send + Sync + 'static,
    {
        self.register_pre("", Chain::single(handler))
    }

    /// Returns a builder that registers routes below `path`.
    pub fn group(&mut self, path: &str) -> Group<'_, C> {
        let base = trim_base(path).to_string();
        debug!(base = %base, "route group");
        Group::new(self, base)
    }

    /// Sets the hook that builds the response for unmatched requests.
    pub fn on_error<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&RouteError, &mut C) + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(handler));
        self
    }

    pub fn routes(&self) -> &RouteTable<C> {
        &self.table
    }

    pub(crate) fn register(
        &mut self,
        method: &str,
        base: &str,
        path: &str,
        chain: Chain<C>,
    ) -> &mut Chain<C> {
        let full = join(base, path).unwrap_or_else(|err| invalid_route(method, path, err));
        match self.table.insert(method, &full, chain, base) {
            Ok(chain) => chain,
            Err(err) => invalid_route(method, path, err),
        }
    }

    pub(crate) fn register_pre(&mut self, group: &str, chain: Chain<C>) -> &mut Chain<C> {
        debug!(group, "pre handlers");
        let slot = self.pre_handlers.entry(group.to_string()).or_default();
        *slot = chain;
        slot
    }
}

impl<C: Context> Router<C> {
    /// Dispatches one request.
    ///
    /// On a match the group's pre-handlers run first, then the route's own
    /// chain, stopping early if a handler aborts. On a miss the error comes
    /// back together with a usable response: whatever the
    /// [`on_error`](Router::on_error) hook wrote, or a 404 carrying the
    /// error message.
    ///
    /// Handler panics are not caught here.
    pub fn handle(&self, request: ApiRequest) -> Result<ApiResponse, RouteMiss> {
        let found = self.table.find(&request.http_method, request.route_path());

        let Some(record) = found else {
            return Err(self.miss(request));
        };

        let pre = self.pre_handlers.get(record.group());
        trace!(
            method = %request.http_method,
            path = %request.route_path(),
            group = record.group(),
            handlers = pre.map_or(0, Chain::len) + record.chain().len(),
            "dispatching"
        );

        let mut ctx = C::from_request(request);
        let handlers = pre
            .into_iter()
            .flat_map(|chain| chain.handlers())
            .chain(record.chain().handlers());
        if !run_all(handlers, &mut ctx) {
            trace!("chain aborted");
        }
        Ok(ctx.into_response())
    }

    fn miss(&self, request: ApiRequest) -> RouteMiss {
        let error = RouteError::NotFound {
            method: request.http_method.clone(),
            path: request.route_path().to_string(),
        };
        debug!(%error, "no route matched");

        let response = match &self.on_error {
            Some(handler) => {
                let mut ctx = C::from_request(request);
                handler(&error, &mut ctx);
                ctx.into_response()
            }
            None => ApiResponse::not_found(error.to_string()),
        };
        RouteMiss { error, response }
    }
}
