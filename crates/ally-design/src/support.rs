//! Context utilities.
//!
//! Helpers shared by processors: copying values between contexts, walking
//! trees and linked lists of shared contexts, and schema introspection.

use crate::attribute::{Attribute, AttributeValue};
use crate::context::{Context, ContextSchema, SharedContext};
use crate::error::ContextError;
use indexmap::IndexMap;
use std::any::type_name;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

/// Default bound of [`iterate`].
pub const MAXIMUM: usize = 1000;

/// Returns the attribute names of a schema.
#[must_use]
pub fn attributes_of(schema: &ContextSchema) -> Vec<&'static str> {
    schema.attribute_names().collect()
}

/// Returns true if the context schema has the attribute name.
#[must_use]
pub fn has_attribute(context: &Context, name: &str) -> bool {
    context.schema().has_attribute(name)
}

/// Loose attribute values, not bound to a schema.
#[derive(Default)]
pub struct ContextData {
    values: IndexMap<&'static str, Box<dyn AttributeValue>>,
}

impl ContextData {
    /// Creates empty data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value.
    #[must_use]
    pub fn with<T: Clone + Send + Sync + 'static>(mut self, attribute: &Attribute<T>, value: T) -> Self {
        self.insert(attribute, value);
        self
    }

    /// Inserts a value.
    pub fn insert<T: Clone + Send + Sync + 'static>(&mut self, attribute: &Attribute<T>, value: T) {
        self.values.insert(attribute.name(), Box::new(value));
    }

    /// Returns a value, if present with the attribute type.
    #[must_use]
    pub fn get<T: Clone + Send + Sync + 'static>(&self, attribute: &Attribute<T>) -> Option<&T> {
        self.values
            .get(attribute.name())
            .and_then(|value| (**value).as_any().downcast_ref::<T>())
    }

    /// Returns true if a value exists for the name.
    #[must_use]
    pub fn contains_name(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Returns the names having values.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.keys().copied()
    }

    /// Returns the number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn raw(&self, name: &str) -> Option<&dyn AttributeValue> {
        self.values.get(name).map(|value| &**value)
    }
}

impl Clone for ContextData {
    fn clone(&self) -> Self {
        Self {
            values: self
                .values
                .iter()
                .map(|(name, value)| (*name, (**value).clone_value()))
                .collect(),
        }
    }
}

impl fmt::Debug for ContextData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextData")
            .field("names", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Returns the values of the attributes the context shares with all schemas.
#[must_use]
pub fn as_data(context: &Context, schemas: &[&ContextSchema]) -> ContextData {
    let mut data = ContextData::new();
    for name in context.present() {
        if schemas.iter().all(|schema| schema.has_attribute(name)) {
            if let Some(value) = context.raw(name) {
                data.values.insert(name, value.clone_value());
            }
        }
    }
    data
}

/// A source for [`push_in`].
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    /// A context.
    Context(&'a Context),
    /// Loose data.
    Data(&'a ContextData),
}

impl Source<'_> {
    fn raw(&self, name: &str) -> Option<&dyn AttributeValue> {
        match self {
            Self::Context(context) => context.raw(name),
            Self::Data(data) => data.raw(name),
        }
    }
}

impl<'a> From<&'a Context> for Source<'a> {
    fn from(context: &'a Context) -> Self {
        Self::Context(context)
    }
}

impl<'a> From<&'a ContextData> for Source<'a> {
    fn from(data: &'a ContextData) -> Self {
        Self::Data(data)
    }
}

/// Rewrites a value before [`push_in`] stores it.
pub type Interceptor = dyn Fn(&'static str, Box<dyn AttributeValue>) -> Box<dyn AttributeValue> + Send + Sync;

/// Name filters and value interception for [`push_in`].
#[derive(Clone, Default)]
#[must_use]
pub struct PushOptions {
    exclude: HashSet<String>,
    only: Option<HashSet<String>>,
    interceptor: Option<Arc<Interceptor>>,
}

impl PushOptions {
    /// Pushes every attribute of the destination.
    pub fn new() -> Self {
        Self::default()
    }

    /// Skips an attribute name.
    pub fn exclude(mut self, name: &str) -> Self {
        self.exclude.insert(name.to_string());
        self
    }

    /// Skips every attribute of a schema.
    pub fn exclude_schema(mut self, schema: &ContextSchema) -> Self {
        self.exclude
            .extend(schema.attribute_names().map(str::to_string));
        self
    }

    /// Restricts the push to an attribute name.
    ///
    /// Repeated restrictions narrow each other, so `only("a").only("b")`
    /// pushes nothing.
    pub fn only(self, name: &str) -> Self {
        self.restrict(std::iter::once(name.to_string()).collect())
    }

    /// Restricts the push to the attributes of a schema.
    pub fn only_schema(self, schema: &ContextSchema) -> Self {
        self.restrict(schema.attribute_names().map(str::to_string).collect())
    }

    /// Passes every pushed value through `interceptor`.
    ///
    /// The returned value is stored only if its type matches the destination
    /// attribute.
    pub fn intercept<F>(mut self, interceptor: F) -> Self
    where
        F: Fn(&'static str, Box<dyn AttributeValue>) -> Box<dyn AttributeValue> + Send + Sync + 'static,
    {
        self.interceptor = Some(Arc::new(interceptor));
        self
    }

    fn restrict(mut self, names: HashSet<String>) -> Self {
        self.only = Some(match self.only.take() {
            Some(only) => only.intersection(&names).cloned().collect(),
            None => names,
        });
        self
    }

    fn accepts(&self, name: &str) -> bool {
        !self.exclude.contains(name)
            && self.only.as_ref().map_or(true, |only| only.contains(name))
    }
}

impl fmt::Debug for PushOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushOptions")
            .field("exclude", &self.exclude)
            .field("only", &self.only)
            .field("intercepted", &self.interceptor.is_some())
            .finish()
    }
}

/// Copies values into `dest` from the first source having each attribute.
///
/// Values are cloned, so collections end up as independent copies. Values
/// whose type does not match the destination schema are skipped. Returns the
/// number of values pushed.
pub fn push_in(dest: &mut Context, sources: &[Source<'_>], options: &PushOptions) -> usize {
    let names: Vec<&'static str> = dest
        .schema()
        .attribute_names()
        .filter(|name| options.accepts(name))
        .collect();

    let mut pushed = 0;
    for name in names {
        let Some(value) = sources.iter().find_map(|source| source.raw(name)) else {
            continue;
        };
        let mut value = value.clone_value();
        if let Some(interceptor) = &options.interceptor {
            value = interceptor(name, value);
        }
        if dest.set_raw(name, value) {
            pushed += 1;
        }
    }
    pushed
}

/// Breadth first listing of a context tree.
///
/// Children are read from the `children` attribute of every node. With a
/// `search` name only the nodes having a value for it are listed. The tree
/// must not contain back references.
pub fn list_bfs(
    root: &SharedContext,
    children: &Attribute<Vec<SharedContext>>,
    search: Option<&str>,
) -> Result<Vec<SharedContext>, ContextError> {
    let mut nodes = Vec::new();
    let mut queue = VecDeque::from([Arc::clone(root)]);
    while let Some(node) = queue.pop_front() {
        let context = node.read();
        if search.map_or(true, |name| context.contains_name(name)) {
            nodes.push(Arc::clone(&node));
        }
        if context.has_attribute(children) {
            if let Some(children) = context.get(children)? {
                queue.extend(children.iter().cloned());
            }
        }
    }
    Ok(nodes)
}

/// Iterator over linked contexts, see [`iterate`].
pub struct Iterate<F> {
    next: Option<SharedContext>,
    fetch: F,
    remaining: usize,
}

impl<F> Iterator for Iterate<F>
where
    F: FnMut(&Context) -> Option<SharedContext>,
{
    type Item = SharedContext;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.next.take()?;
        self.remaining -= 1;
        self.next = (self.fetch)(&current.read());
        Some(current)
    }
}

impl<F> fmt::Debug for Iterate<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iterate")
            .field("remaining", &self.remaining)
            .field("fetch", &type_name::<F>())
            .finish_non_exhaustive()
    }
}

/// Iterates from `context` following `fetch`, at most `maximum` contexts.
///
/// The first context is part of the iteration.
pub fn iterate<F>(context: SharedContext, fetch: F, maximum: usize) -> Iterate<F>
where
    F: FnMut(&Context) -> Option<SharedContext>,
{
    Iterate {
        next: Some(context),
        fetch,
        remaining: maximum,
    }
}

fn follow(search: &Attribute<SharedContext>) -> impl FnMut(&Context) -> Option<SharedContext> + '_ {
    move |context| context.get(search).ok().flatten().cloned()
}

/// Lists the contexts linked through `search`, starting with `context`.
#[must_use]
pub fn listing(context: &SharedContext, search: &Attribute<SharedContext>) -> Vec<SharedContext> {
    iterate(Arc::clone(context), follow(search), MAXIMUM).collect()
}

/// Returns the first value `find` provides along the contexts linked through `search`.
pub fn find_first<R>(
    context: &SharedContext,
    search: &Attribute<SharedContext>,
    mut find: impl FnMut(&Context) -> Option<R>,
) -> Option<R> {
    iterate(Arc::clone(context), follow(search), MAXIMUM).find_map(|node| find(&node.read()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{share, ContextSpec};

    const NAME: Attribute<String> = Attribute::new("name");
    const TAGS: Attribute<Vec<String>> = Attribute::new("tags");
    const CHILDREN: Attribute<Vec<SharedContext>> = Attribute::new("children");
    const PARENT: Attribute<SharedContext> = Attribute::new("parent");
    const MARK: Attribute<bool> = Attribute::new("mark");

    fn node_spec() -> ContextSpec {
        ContextSpec::nested("Node")
            .defines(&NAME)
            .defines(&TAGS)
            .defines(&CHILDREN)
            .defines(&PARENT)
            .defines(&MARK)
    }

    fn node(name: &str) -> Context {
        let mut node = Context::from_spec(&node_spec());
        node.set(&NAME, name.to_string()).unwrap();
        node
    }

    fn names(nodes: &[SharedContext]) -> Vec<String> {
        nodes
            .iter()
            .map(|n| n.read().get(&NAME).unwrap().cloned().unwrap())
            .collect()
    }

    #[test]
    fn test_push_in_first_source_wins_and_copies() {
        let mut first = node("first");
        first.set(&TAGS, vec!["a".to_string()]).unwrap();
        let second = ContextData::new()
            .with(&NAME, "second".to_string())
            .with(&MARK, true);

        let mut dest = Context::from_spec(&node_spec());
        let pushed = push_in(
            &mut dest,
            &[Source::from(&first), Source::from(&second)],
            &PushOptions::new(),
        );
        assert_eq!(pushed, 3);
        assert_eq!(dest.get(&NAME).unwrap().map(String::as_str), Some("first"));
        assert_eq!(dest.get(&MARK).unwrap(), Some(&true));

        dest.get_mut(&TAGS).unwrap().unwrap().push("b".to_string());
        assert_eq!(first.get(&TAGS).unwrap().unwrap().len(), 1);
    }

    #[test]
    fn test_push_in_filters() {
        let source = node("source");
        let mut dest = Context::from_spec(&node_spec());
        push_in(&mut dest, &[Source::from(&source)], &PushOptions::new().exclude("name"));
        assert!(!dest.contains(&NAME));

        let only = ContextSchema::from_spec(&ContextSpec::nested("Named").defines(&MARK));
        let mut dest = Context::from_spec(&node_spec());
        push_in(&mut dest, &[Source::from(&source)], &PushOptions::new().only_schema(&only));
        assert!(!dest.contains(&NAME));
    }

    #[test]
    fn test_push_in_only_narrows() {
        let source = ContextData::new()
            .with(&NAME, "a".to_string())
            .with(&MARK, true);

        let mut dest = Context::from_spec(&node_spec());
        let options = PushOptions::new().only("name").only("mark");
        assert_eq!(push_in(&mut dest, &[Source::from(&source)], &options), 0);
        assert!(!dest.contains(&NAME));
        assert!(!dest.contains(&MARK));

        let mut dest = Context::from_spec(&node_spec());
        let named = ContextSchema::from_spec(&ContextSpec::nested("Named").defines(&NAME).defines(&MARK));
        let options = PushOptions::new().only_schema(&named).only("mark");
        assert_eq!(push_in(&mut dest, &[Source::from(&source)], &options), 1);
        assert_eq!(dest.get(&MARK).unwrap(), Some(&true));
        assert!(!dest.contains(&NAME));
    }

    #[test]
    fn test_push_in_intercepts_values() {
        let mut source = node("lower");
        source.set(&MARK, false).unwrap();

        let options = PushOptions::new().intercept(|name, value| -> Box<dyn AttributeValue> {
            if name == "mark" {
                return Box::new("not a bool".to_string());
            }
            let upper = value.as_any().downcast_ref::<String>().map(|text| text.to_uppercase());
            match upper {
                Some(text) => Box::new(text),
                None => value,
            }
        });
        let mut dest = Context::from_spec(&node_spec());
        assert_eq!(push_in(&mut dest, &[Source::from(&source)], &options), 1);
        assert_eq!(dest.get(&NAME).unwrap().map(String::as_str), Some("LOWER"));
        assert!(!dest.contains(&MARK));
    }

    #[test]
    fn test_as_data_common_attributes() {
        let mut source = node("n");
        source.set(&MARK, false).unwrap();
        let named = ContextSchema::from_spec(&ContextSpec::nested("Named").defines(&NAME));
        let data = as_data(&source, &[&named]);
        assert_eq!(data.names().collect::<Vec<_>>(), ["name"]);
        assert_eq!(data.get(&NAME).map(String::as_str), Some("n"));
    }

    #[test]
    fn test_list_bfs() {
        let leaf1 = share(node("leaf1"));
        let mut leaf2 = node("leaf2");
        leaf2.set(&MARK, true).unwrap();
        let leaf2 = share(leaf2);

        let mut middle = node("middle");
        middle.set(&CHILDREN, vec![Arc::clone(&leaf2)]).unwrap();
        let middle = share(middle);

        let mut root = node("root");
        root.set(&CHILDREN, vec![Arc::clone(&middle), Arc::clone(&leaf1)])
            .unwrap();
        let root = share(root);

        let all = list_bfs(&root, &CHILDREN, None).unwrap();
        assert_eq!(names(&all), ["root", "middle", "leaf1", "leaf2"]);

        let marked = list_bfs(&root, &CHILDREN, Some("mark")).unwrap();
        assert_eq!(names(&marked), ["leaf2"]);
    }

    #[test]
    fn test_listing_and_find_first() {
        let top = share(node("top"));
        let mut middle = node("middle");
        middle.set(&PARENT, Arc::clone(&top)).unwrap();
        middle.set(&MARK, true).unwrap();
        let middle = share(middle);
        let mut bottom = node("bottom");
        bottom.set(&PARENT, Arc::clone(&middle)).unwrap();
        let bottom = share(bottom);

        assert_eq!(names(&listing(&bottom, &PARENT)), ["bottom", "middle", "top"]);

        let found = find_first(&bottom, &PARENT, |context| {
            context
                .get(&MARK)
                .ok()
                .flatten()
                .map(|_| context.get(&NAME).ok().flatten().cloned())
        });
        assert_eq!(found.flatten().as_deref(), Some("middle"));
    }

    #[test]
    fn test_iterate_is_bounded() {
        let looped = share(node("loop"));
        let again = Arc::clone(&looped);
        let count = iterate(Arc::clone(&looped), move |_| Some(Arc::clone(&again)), 5).count();
        assert_eq!(count, 5);
    }
}
