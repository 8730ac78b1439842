//! Render tree.
//!
//! Processors describe structured response details, such as input error
//! details, as a tree of named [`Object`], [`List`] and [`Value`] nodes that
//! encoders turn into output. [`Render::to_json`] gives the JSON form:
//! objects become JSON objects keyed by child name, lists become arrays and
//! values become strings.

use serde_json::{Map, Value as Json};

/// A node of the render tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Render {
    /// A named group of children.
    Object(Object),
    /// A named sequence of items.
    List(List),
    /// A named text value.
    Value(Value),
}

impl Render {
    /// Returns the node name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Object(object) => &object.name,
            Self::List(list) => &list.name,
            Self::Value(value) => &value.name,
        }
    }

    /// Returns the JSON form of the node content.
    #[must_use]
    pub fn to_json(&self) -> Json {
        match self {
            Self::Object(object) => object.content(),
            Self::List(list) => Json::Array(list.items.iter().map(Render::to_json).collect()),
            Self::Value(value) => Json::String(value.value.clone()),
        }
    }
}

/// A named group of children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    name: String,
    children: Vec<Render>,
}

impl Object {
    /// Creates an empty object.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Adds a child.
    pub fn with(mut self, child: impl Into<Render>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Adds a child in place.
    pub fn push(&mut self, child: impl Into<Render>) {
        self.children.push(child.into());
    }

    /// Returns the object name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the children.
    #[must_use]
    pub fn children(&self) -> &[Render] {
        &self.children
    }

    /// Returns the first child with the name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Render> {
        self.children.iter().find(|child| child.name() == name)
    }

    /// Returns the JSON form wrapped under the object name.
    #[must_use]
    pub fn to_json(&self) -> Json {
        let mut root = Map::new();
        root.insert(self.name.clone(), self.content());
        Json::Object(root)
    }

    fn content(&self) -> Json {
        let mut map = Map::new();
        for child in &self.children {
            map.insert(child.name().to_string(), child.to_json());
        }
        Json::Object(map)
    }
}

/// A named sequence of items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct List {
    name: String,
    items: Vec<Render>,
}

impl List {
    /// Creates a list from items.
    #[must_use]
    pub fn new(name: impl Into<String>, items: impl IntoIterator<Item = Render>) -> Self {
        Self {
            name: name.into(),
            items: items.into_iter().collect(),
        }
    }

    /// Returns the items.
    #[must_use]
    pub fn items(&self) -> &[Render] {
        &self.items
    }
}

/// A named text value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    name: String,
    value: String,
}

impl Value {
    /// Creates a value.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Returns the text.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl From<Object> for Render {
    fn from(object: Object) -> Self {
        Self::Object(object)
    }
}

impl From<List> for Render {
    fn from(list: List) -> Self {
        Self::List(list)
    }
}

impl From<Value> for Render {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_json() {
        let object = Object::new("model")
            .with(List::new(
                "error",
                [Value::new("message", "Invalid request").into()],
            ))
            .with(Object::new("User").with(Value::new("Name", "Too long")));

        assert_eq!(
            object.to_json(),
            json!({
                "model": {
                    "error": ["Invalid request"],
                    "User": {"Name": "Too long"}
                }
            })
        );
    }

    #[test]
    fn test_child_lookup() {
        let object = Object::new("model").with(Object::new("User"));
        assert!(matches!(object.child("User"), Some(Render::Object(_))));
        assert!(object.child("Group").is_none());
    }
}
