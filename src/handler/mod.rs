use crate::context::Context;
use std::fmt;
use std::sync::Arc;

pub type Handler<C> = Arc<dyn Fn(&mut C) + Send + Sync>;

/// An ordered list of handlers run against one context.
///
/// A single function is simply a chain of length one; registration methods
/// hand back the stored chain so further handlers can be appended with
/// [`Chain::then`].
pub struct Chain<C> {
    handlers: Vec<Handler<C>>,
}

impl<C> Chain<C> {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    pub fn single<F>(handler: F) -> Self
    where
        F: Fn(&mut C) + Send + Sync + 'static,
    {
        let mut chain = Self::new();
        chain.then(handler);
        chain
    }

    pub fn then<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut C) + Send + Sync + 'static,
    {
        self.handlers.push(Arc::new(handler));
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub(crate) fn handlers(&self) -> &[Handler<C>] {
        &self.handlers
    }
}

impl<C: Context> Chain<C> {
    /// Runs the handlers in order. Returns `false` when one of them aborted.
    pub fn run(&self, ctx: &mut C) -> bool {
        run_all(self.handlers.iter(), ctx)
    }
}

pub(crate) fn run_all<'a, C, I>(handlers: I, ctx: &mut C) -> bool
where
    C: Context + 'a,
    I: IntoIterator<Item = &'a Handler<C>>,
{
    for handler in handlers {
        if ctx.is_aborted() {
            return false;
        }
        handler(&mut *ctx);
    }
    !ctx.is_aborted()
}

impl<C> Default for Chain<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for Chain<C> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<C> fmt::Debug for Chain<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("len", &self.handlers.len()).finish()
    }
}
