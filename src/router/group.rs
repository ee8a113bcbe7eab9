use super::{join, trim_base, Router};
use crate::error::RouteError;
use crate::handler::Chain;
use crate::http::Method;
use tracing::debug;

/// Registers routes below a shared base path.
///
/// A group owns no routing state. It prefixes every path with its base and
/// tags the routes with that base, which is also the key for the group's
/// pre-handler chain. Nested groups get their own key; pre-handlers are not
/// inherited from the enclosing group.
pub struct Group<'r, C> {
    router: &'r mut Router<C>,
    base: String,
}

impl<'r, C> Group<'r, C> {
    pub(crate) fn new(router: &'r mut Router<C>, base: String) -> Self {
        Self { router, base }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn add<F>(&mut self, method: impl AsRef<str>, path: &str, handler: F) -> &mut Chain<C>
    where
        F: Fn(&mut C) + Send + Sync + 'static,
    {
        self.router
            .register(method.as_ref(), &self.base, path, Chain::single(handler))
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

    /// Installs (or replaces) the handlers run before every route of this group.
    pub fn pre<F>(&mut self, handler: F) -> &mut Chain<C>
    where
        F: Fn(&mut C) + Send + Sync + 'static,
    {
        self.router.register_pre(&self.base, Chain::single(handler))
    }

    /// # Panics
    ///
    /// Panics when `path` is empty.
    pub fn group(&mut self, path: &str) -> Group<'_, C> {
        let base = match join(&self.base, path) {
            Ok(joined) => trim_base(&joined).to_string(),
            Err(err) => invalid_group(&self.base, path, err),
        };
        debug!(base = %base, "route group");
        Group::new(self.router, base)
    }
}

fn invalid_group(base: &str, path: &str, err: RouteError) -> ! {
    panic!("invalid group {:?} below {:?}: {}", path, base, err)
}

#[cfg(test)]
mod tests {
    use crate::context::HttpContext;
    use crate::http::ApiRequest;
    use crate::router::HttpRouter;

    fn body(router: &HttpRouter, path: &str) -> Option<String> {
        router.handle(ApiRequest::new("GET", path)).ok().map(|r| r.body)
    }

    fn write(tag: &'static str) -> impl Fn(&mut HttpContext) + Send + Sync + 'static {
        move |c| {
            c.response.body.push_str(tag);
        }
    }

    #[test]
    fn group_prefixes_paths() {
        let mut router = HttpRouter::new();
        {
            let mut api = router.group("/api/");
            assert_eq!(api.base(), "/api");
            api.get("status", write("up"));
            api.get("/users/{id}", write("user"));
        }

        assert_eq!(body(&router, "/api/status").as_deref(), Some("up"));
        assert_eq!(body(&router, "/api/users/3").as_deref(), Some("user"));
        assert_eq!(body(&router, "/status"), None);
    }

    #[test]
    fn pre_handlers_are_scoped_to_their_group() {
        let mut router = HttpRouter::new();
        router.pre(write("root-pre "));
        router.get("/plain", write("plain"));
        {
            let mut admin = router.group("/admin");
            admin.pre(write("admin-pre ")).then(write("admin-pre2 "));
            admin.get("/panel", write("panel"));

            let mut reports = admin.group("reports");
            assert_eq!(reports.base(), "/admin/reports");
            reports.get("/daily", write("daily"));
        }
        {
            let mut open = router.group("/open");
            open.get("/door", write("door"));
        }

        assert_eq!(body(&router, "/plain").as_deref(), Some("root-pre plain"));
        assert_eq!(
            body(&router, "/admin/panel").as_deref(),
            Some("admin-pre admin-pre2 panel")
        );
        // nested groups do not inherit the parent's pre chain
        assert_eq!(body(&router, "/admin/reports/daily").as_deref(), Some("daily"));
        assert_eq!(body(&router, "/open/door").as_deref(), Some("door"));
    }

    #[test]
    fn slash_group_is_the_root_group() {
        let mut router = HttpRouter::new();
        router.pre(write("pre "));
        router.group("/").get("/x", write("x"));

        assert_eq!(body(&router, "/x").as_deref(), Some("pre x"));
    }

    #[test]
    #[should_panic(expected = "route path must not be empty")]
    fn empty_nested_group_fails_fast() {
        let mut router = HttpRouter::new();
        let mut api = router.group("/api");
        api.group("");
    }
}
