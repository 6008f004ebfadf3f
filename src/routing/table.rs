//! Route table
//!
//! Exact-match dispatch on (method, path). Several methods may share one
//! handler instance; the table is frozen once built.

use std::collections::HashMap;
use std::sync::Arc;

use hyper::Method;

use crate::handler::Handler;

type MethodMap = HashMap<Method, Arc<dyn Handler>>;

#[derive(Default)]
pub struct RouteTable {
    routes: HashMap<&'static str, MethodMap>,
}

impl RouteTable {
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    /// Find the handler bound to this exact method and path
    pub fn match_route(&self, method: &Method, path: &str) -> Option<&Arc<dyn Handler>> {
        self.routes.get(path)?.get(method)
    }

    /// Number of (method, path) bindings
    pub fn len(&self) -> usize {
        self.routes.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[derive(Default)]
pub struct RouteTableBuilder {
    routes: HashMap<&'static str, MethodMap>,
}

impl RouteTableBuilder {
    /// Bind `handler` to `method path`; a later binding of the same pair wins
    #[must_use]
    pub fn route(mut self, method: Method, path: &'static str, handler: Arc<dyn Handler>) -> Self {
        self.routes.entry(path).or_default().insert(method, handler);
        self
    }

    /// Bind one handler instance to several methods on the same path
    #[must_use]
    pub fn route_many(
        self,
        methods: impl IntoIterator<Item = Method>,
        path: &'static str,
        handler: &Arc<dyn Handler>,
    ) -> Self {
        methods
            .into_iter()
            .fold(self, |builder, method| builder.route(method, path, Arc::clone(handler)))
    }

    pub fn build(self) -> RouteTable {
        RouteTable {
            routes: self.routes,
        }
    }
}
