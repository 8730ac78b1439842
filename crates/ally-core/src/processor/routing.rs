//! Routing processors.
//!
//! Routers branch the request into another assembly. Once routed, the
//! parent chain is cancelled so the processors after the router only run
//! for requests that were not routed.

use crate::contexts::request;
use ally_design::prelude::*;
use tracing::debug;

fn router_name(assembly: &Assembly) -> String {
    format!("routing_{}", assembly.name())
}

/// Always routes into its assembly.
///
/// Routers are named `routing_<assembly>`, so one assembly can hold a
/// router per routed assembly.
#[derive(Clone)]
pub struct RoutingHandler {
    name: String,
    assembly: Assembly,
}

impl RoutingHandler {
    /// Creates the router.
    #[must_use]
    pub fn new(assembly: Assembly) -> Self {
        Self {
            name: router_name(&assembly),
            assembly,
        }
    }
}

impl Processor for RoutingHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn contexts(&self) -> Vec<ContextSpec> {
        Vec::new()
    }

    fn branches(&self) -> Vec<Assembly> {
        vec![self.assembly.clone()]
    }

    fn process<'a>(&'a self, chain: &'a mut Chain) -> BoxFuture<'a, Result<(), ProcessError>> {
        Box::pin(async move {
            chain.branch(0).await?;
            chain.cancel();
            Ok(())
        })
    }
}

impl std::fmt::Debug for RoutingHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingHandler")
            .field("assembly", &self.assembly.name())
            .finish()
    }
}

/// Routes the requests under a root URI into its assembly.
///
/// The root is stripped from the request URI before branching, so the
/// routed assembly sees paths relative to the root.
#[derive(Clone)]
pub struct RoutingByPathHandler {
    name: String,
    assembly: Assembly,
    root_uri: String,
}

impl RoutingByPathHandler {
    /// Creates the router, surrounding slashes of `root_uri` are ignored.
    #[must_use]
    pub fn new(assembly: Assembly, root_uri: impl Into<String>) -> Self {
        Self {
            name: router_name(&assembly),
            assembly,
            root_uri: root_uri.into().trim_matches('/').to_string(),
        }
    }

    /// Returns the root URI.
    #[must_use]
    pub fn root_uri(&self) -> &str {
        &self.root_uri
    }

    /// Returns the URI relative to the root, if the URI is under it.
    #[must_use]
    pub fn relative<'u>(&self, uri: &'u str) -> Option<&'u str> {
        let uri = uri.trim_matches('/');
        if self.root_uri.is_empty() {
            return Some(uri);
        }
        let rest = uri.strip_prefix(self.root_uri.as_str())?;
        if rest.is_empty() {
            Some(rest)
        } else {
            rest.strip_prefix('/')
        }
    }
}

impl Processor for RoutingByPathHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn contexts(&self) -> Vec<ContextSpec> {
        vec![request::spec().requires(&request::URI)]
    }

    fn branches(&self) -> Vec<Assembly> {
        vec![self.assembly.clone()]
    }

    fn process<'a>(&'a self, chain: &'a mut Chain) -> BoxFuture<'a, Result<(), ProcessError>> {
        Box::pin(async move {
            let req = chain.arg_mut(request::CONTEXT)?;
            let Some(relative) = self
                .relative(req.require(&request::URI)?)
                .map(str::to_string)
            else {
                return Ok(());
            };

            debug!(root = %self.root_uri, uri = %relative, "Routing by path");
            req.set(&request::URI, relative)?;
            chain.branch(0).await?;
            chain.cancel();
            Ok(())
        })
    }
}

impl std::fmt::Debug for RoutingByPathHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingByPathHandler")
            .field("assembly", &self.assembly.name())
            .field("root_uri", &self.root_uri)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ally_design::Attribute;

    const SEEN: Attribute<String> = Attribute::new("seen");

    fn recorder(name: &'static str) -> impl Processor {
        FnProcessor::new(
            name,
            vec![request::spec().requires(&request::URI).defines(&SEEN)],
            move |chain| {
                let req = chain.arg_mut(request::CONTEXT)?;
                let seen = format!("{name}:{}", req.require(&request::URI)?);
                req.set(&SEEN, seen)?;
                Ok(())
            },
        )
    }

    fn processing(router: impl Processor) -> Processing {
        let mut assembly = Assembly::new("server");
        assembly.add(router).unwrap();
        assembly.add(recorder("fallback")).unwrap();
        Processing::builder(&assembly)
            .source(request::spec().defines(&request::URI))
            .build()
            .unwrap()
    }

    async fn seen(processing: &Processing, uri: &str) -> String {
        let mut req = processing.new_context(request::CONTEXT).unwrap();
        req.set(&request::URI, uri.to_string()).unwrap();
        let contexts = processing.execute(Contexts::new().with(req)).await.unwrap();
        contexts
            .get(request::CONTEXT)
            .unwrap()
            .require(&SEEN)
            .unwrap()
            .clone()
    }

    fn target(name: &'static str) -> Assembly {
        let mut assembly = Assembly::new(name);
        assembly.add(recorder(name)).unwrap();
        assembly
    }

    #[test]
    fn test_relative() {
        let router = RoutingByPathHandler::new(Assembly::new("content"), "/content/");
        assert_eq!(router.root_uri(), "content");
        assert_eq!(router.relative("content/a/b.txt"), Some("a/b.txt"));
        assert_eq!(router.relative("/content"), Some(""));
        assert_eq!(router.relative("contents/a"), None);
        assert_eq!(router.relative("resources/User"), None);
    }

    #[tokio::test]
    async fn test_routing_cancels_parent() {
        let processing = processing(RoutingHandler::new(target("resources")));
        assert_eq!(seen(&processing, "User/1").await, "resources:User/1");
    }

    #[tokio::test]
    async fn test_routing_by_path() {
        let processing = processing(RoutingByPathHandler::new(target("content"), "content"));
        assert_eq!(seen(&processing, "content/a.txt").await, "content:a.txt");
        assert_eq!(seen(&processing, "User/1").await, "fallback:User/1");
    }

    #[test]
    fn test_routers_are_named_by_assembly() {
        let mut server = Assembly::new("server");
        server
            .add(RoutingByPathHandler::new(target("content"), "content"))
            .unwrap();
        server
            .add(RoutingByPathHandler::new(target("resources"), "resources"))
            .unwrap();
        let names: Vec<&str> = server.processors().iter().map(|p| p.name()).collect();
        assert_eq!(names, ["routing_content", "routing_resources"]);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn relative_strips_root(segments in proptest::collection::vec("[a-z0-9]{1,8}", 0..4)) {
                let router = RoutingByPathHandler::new(Assembly::new("content"), "content");
                let rest = segments.join("/");
                let uri = format!("/content/{rest}");
                prop_assert_eq!(router.relative(&uri), Some(rest.as_str()));
            }
        }
    }
}
