//! The route table: one segment trie per method.
//!
//! Every node stands for one path segment. Literal segments live in a map,
//! parameter segments (`{name}`) collapse onto a single wildcard child per
//! node, so the parameter name plays no part in matching.

use crate::error::{RouteError, RouteResult};
use crate::handler::Chain;
use std::collections::HashMap;
use tracing::debug;

/// Upper bound on segments in a registered path.
pub const MAX_SEGMENTS: usize = 255;

const WILDCARD: &str = "*";

/// What a matched route runs: its own chain plus the group it was
/// registered under (`""` for the router itself).
pub struct Record<C> {
    pub(crate) chain: Chain<C>,
    pub(crate) group: String,
}

impl<C> Record<C> {
    pub fn chain(&self) -> &Chain<C> {
        &self.chain
    }

    pub fn group(&self) -> &str {
        &self.group
    }
}

struct Node<C> {
    children: HashMap<String, Node<C>>,
    wildcard: Option<Box<Node<C>>>,
    record: Option<Record<C>>,
}

impl<C> Default for Node<C> {
    fn default() -> Self {
        Self {
            children: HashMap::new(),
            wildcard: None,
            record: None,
        }
    }
}

pub struct RouteTable<C> {
    roots: HashMap<String, Node<C>>,
    len: usize,
}

impl<C> Default for RouteTable<C> {
    fn default() -> Self {
        Self::new()
    }
}

fn is_param(segment: &str) -> bool {
    segment == WILDCARD
        || (segment.len() > 2 && segment.starts_with('{') && segment.ends_with('}'))
}

fn pattern_segments(pattern: &str) -> RouteResult<Vec<&str>> {
    if pattern.is_empty() {
        return Err(RouteError::EmptyPath);
    }
    let trimmed = pattern.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let segments: Vec<&str> = trimmed.split('/').collect();
    if segments.len() > MAX_SEGMENTS {
        return Err(RouteError::TooManySegments {
            path: pattern.to_string(),
            count: segments.len(),
        });
    }
    Ok(segments)
}

fn request_segments(path: &str) -> impl Iterator<Item = &str> {
    let path = path.strip_prefix('/').unwrap_or(path);
    // "" splits into one empty segment; the root route has none
    path.split('/').filter(move |_| !path.is_empty())
}

impl<C> RouteTable<C> {
    pub fn new() -> Self {
        Self {
            roots: HashMap::new(),
            len: 0,
        }
    }

    /// Attaches `chain` to the node for `pattern`, replacing whatever was
    /// registered for the same method and path shape.
    pub fn insert(
        &mut self,
        method: &str,
        pattern: &str,
        chain: Chain<C>,
        group: &str,
    ) -> RouteResult<&mut Chain<C>> {
        if method.is_empty() {
            return Err(RouteError::EmptyMethod);
        }
        let segments = pattern_segments(pattern)?;

        let mut node = self.roots.entry(method.to_string()).or_default();
        for segment in segments {
            node = if is_param(segment) {
                &mut **node.wildcard.get_or_insert_with(Box::default)
            } else {
                node.children.entry(segment.to_string()).or_default()
            };
        }

        if node.record.is_some() {
            debug!(method, pattern, group, "replacing route");
        } else {
            self.len += 1;
            debug!(method, pattern, group, "registered route");
        }

        let record = node.record.insert(Record {
            chain,
            group: group.to_string(),
        });
        Ok(&mut record.chain)
    }

    /// Greedy walk: a literal child beats the wildcard at the same depth and
    /// there is no backtracking once a segment has been consumed.
    pub fn find(&self, method: &str, path: &str) -> Option<&Record<C>> {
        let mut node = self.roots.get(method)?;
        for segment in request_segments(path) {
            node = match node.children.get(segment) {
                Some(child) => child,
                None => node.wildcard.as_deref()?,
            };
        }
        node.record.as_ref()
    }

    /// Number of distinct (method, path shape) routes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Context, HttpContext};
    use crate::http::ApiRequest;

    fn tagged(tag: &'static str) -> Chain<HttpContext> {
        Chain::single(move |c: &mut HttpContext| {
            c.response.body(tag);
        })
    }

    fn lookup(table: &RouteTable<HttpContext>, method: &str, path: &str) -> Option<String> {
        let record = table.find(method, path)?;
        let mut ctx = HttpContext::from_request(ApiRequest::new(method, path));
        record.chain().run(&mut ctx);
        Some(ctx.into_response().body)
    }

    #[test]
    fn literal_paths_match_exactly() {
        let mut table = RouteTable::new();
        table.insert("GET", "/foo/bar/baz/moin", tagged("moin"), "").unwrap();

        assert_eq!(lookup(&table, "GET", "/foo/bar/baz/moin").as_deref(), Some("moin"));
        assert_eq!(lookup(&table, "GET", "/foo/bar/baz"), None);
        assert_eq!(lookup(&table, "GET", "/foo/bar/baz/bummer"), None);
        assert_eq!(lookup(&table, "GET", "/foo/bar/baz/moin/bummer"), None);
        assert_eq!(lookup(&table, "POST", "/foo/bar/baz/moin"), None);
    }

    #[test]
    fn wildcard_matches_any_segment() {
        let mut table = RouteTable::new();
        table.insert("GET", "/foo/{b}/moin/{name}", tagged("params"), "").unwrap();

        assert_eq!(lookup(&table, "GET", "/foo/bar/moin/jott").as_deref(), Some("params"));
        assert_eq!(lookup(&table, "GET", "/foo/x/moin/y").as_deref(), Some("params"));
        assert_eq!(lookup(&table, "GET", "/foo/bar/baz"), None);
        assert_eq!(lookup(&table, "GET", "/foo/bar/moin/jott/yeah"), None);
        // an empty segment falls through to the wildcard like any other
        assert_eq!(lookup(&table, "GET", "/foo//moin/jott").as_deref(), Some("params"));
    }

    #[test]
    fn empty_segments_fall_through_to_the_wildcard() {
        let mut table = RouteTable::new();
        table.insert("GET", "/foo/{x}/y", tagged("wild"), "").unwrap();

        assert_eq!(lookup(&table, "GET", "/foo//y").as_deref(), Some("wild"));
        // trailing slash: "" is the wildcard value
        table.insert("GET", "/bar/{x}", tagged("trailing"), "").unwrap();
        assert_eq!(lookup(&table, "GET", "/bar/").as_deref(), Some("trailing"));
    }

    #[test]
    fn literal_beats_wildcard() {
        let mut table = RouteTable::new();
        table.insert("GET", "/foo/{x}/y", tagged("wild"), "").unwrap();
        table.insert("GET", "/foo/bar/y", tagged("literal"), "").unwrap();

        assert_eq!(lookup(&table, "GET", "/foo/bar/y").as_deref(), Some("literal"));
        assert_eq!(lookup(&table, "GET", "/foo/baz/y").as_deref(), Some("wild"));
    }

    #[test]
    fn no_backtracking_after_literal_match() {
        let mut table = RouteTable::new();
        table.insert("GET", "/foo/{x}/y", tagged("wild"), "").unwrap();
        table.insert("GET", "/foo/bar/z", tagged("literal"), "").unwrap();

        // "bar" commits to the literal branch, which has no "y"
        assert_eq!(lookup(&table, "GET", "/foo/bar/y"), None);
    }

    #[test]
    fn prefixes_do_not_match_on_their_own() {
        let mut table = RouteTable::new();
        table.insert("GET", "/a/b/c", tagged("deep"), "").unwrap();

        assert_eq!(lookup(&table, "GET", "/a/b"), None);
        assert_eq!(lookup(&table, "GET", "/a"), None);
        assert_eq!(lookup(&table, "GET", "/"), None);
    }

    #[test]
    fn same_shape_replaces_previous_record() {
        let mut table = RouteTable::new();
        table.insert("GET", "/users/{id}", tagged("first"), "").unwrap();
        table.insert("GET", "users/{user}/", tagged("second"), "admin").unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(lookup(&table, "GET", "/users/7").as_deref(), Some("second"));
        assert_eq!(table.find("GET", "/users/7").map(Record::group), Some("admin"));
    }

    #[test]
    fn root_path_registers_on_the_method_root() {
        let mut table = RouteTable::new();
        table.insert("GET", "/", tagged("root"), "").unwrap();

        assert_eq!(lookup(&table, "GET", "/").as_deref(), Some("root"));
        assert_eq!(lookup(&table, "GET", "").as_deref(), Some("root"));
        assert_eq!(lookup(&table, "GET", "/x"), None);
    }

    #[test]
    fn braces_need_a_name_to_be_a_parameter() {
        let mut table = RouteTable::new();
        table.insert("GET", "/x/{}", tagged("literal"), "").unwrap();

        assert_eq!(lookup(&table, "GET", "/x/{}").as_deref(), Some("literal"));
        assert_eq!(lookup(&table, "GET", "/x/anything"), None);
    }

    #[test]
    fn rejects_bad_patterns() {
        let mut table: RouteTable<HttpContext> = RouteTable::new();

        assert_eq!(
            table.insert("GET", "", Chain::new(), "").err(),
            Some(RouteError::EmptyPath)
        );
        assert_eq!(
            table.insert("", "/a", Chain::new(), "").err(),
            Some(RouteError::EmptyMethod)
        );

        let ok = "/s".repeat(MAX_SEGMENTS);
        assert!(table.insert("GET", &ok, Chain::new(), "").is_ok());

        let long = "/s".repeat(MAX_SEGMENTS + 1);
        assert!(matches!(
            table.insert("GET", &long, Chain::new(), ""),
            Err(RouteError::TooManySegments { count, .. }) if count == MAX_SEGMENTS + 1
        ));
    }
}
