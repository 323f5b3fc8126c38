//! Self-Describing Element Tree
//!
//! Response payloads from the terminal service are nested, heterogeneous
//! trees: composites of named children, arrays of entries, and scalars.
//! The bridge never builds these trees on the hot path, it only reads them,
//! so every accessor here is checked and returns `Option` rather than
//! indexing blindly.
//!
//! # Printing
//!
//! `Display` renders an element in the terminal's indented block style:
//!
//! ```text
//! reason = {
//!     source = "bbdbh1"
//!     errorCode = 1
//!     category = "BAD_SEC"
//! }
//! ```

use std::fmt;

/// Spaces added per nesting level when printing.
const SPACES_PER_LEVEL: usize = 4;

// =============================================================================
// Scalars
// =============================================================================

/// A leaf value in the element tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Explicit null.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Text value.
    String(String),
}

impl Scalar {
    /// Render the scalar as plain text (strings unquoted, null empty).
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(v) => v.to_string(),
            Self::String(s) => s.clone(),
        }
    }

    /// Check if this is the null scalar.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Scalar {
    /// Printing form: strings are quoted, everything else as text.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "\"{s}\""),
            other => f.write_str(&other.as_text()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

// =============================================================================
// Element
// =============================================================================

/// The shape of an element's content.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A single leaf value.
    Scalar(Scalar),
    /// Ordered entries; each entry carries the array's name.
    Array(Vec<Element>),
    /// Ordered named children.
    Composite(Vec<Element>),
}

/// A named node in the element tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    name: String,
    value: Value,
}

impl Element {
    /// Create an element from a name and a value.
    #[must_use]
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Create a scalar element.
    #[must_use]
    pub fn scalar(name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::new(name, Value::Scalar(value.into()))
    }

    /// Create a null element.
    #[must_use]
    pub fn null(name: impl Into<String>) -> Self {
        Self::new(name, Value::Scalar(Scalar::Null))
    }

    /// Create a composite element from its children.
    #[must_use]
    pub fn composite(name: impl Into<String>, children: Vec<Self>) -> Self {
        Self::new(name, Value::Composite(children))
    }

    /// Create an array element from its entries.
    #[must_use]
    pub fn array(name: impl Into<String>, entries: Vec<Self>) -> Self {
        Self::new(name, Value::Array(entries))
    }

    /// Create an array of scalar entries, each named after the array.
    #[must_use]
    pub fn scalar_array<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Scalar>,
    {
        let name = name.into();
        let entries = values
            .into_iter()
            .map(|v| Self::scalar(name.clone(), v))
            .collect();
        Self::new(name, Value::Array(entries))
    }

    /// Build an element tree from a JSON value.
    ///
    /// Objects become composites (key order preserved), arrays become
    /// arrays, and JSON scalars map onto [`Scalar`].
    #[must_use]
    pub fn from_json(name: impl Into<String>, json: &serde_json::Value) -> Self {
        let name = name.into();
        let value = match json {
            serde_json::Value::Null => Value::Scalar(Scalar::Null),
            serde_json::Value::Bool(b) => Value::Scalar(Scalar::Bool(*b)),
            serde_json::Value::Number(n) => Value::Scalar(
                n.as_i64()
                    .map(Scalar::Int)
                    .or_else(|| n.as_f64().map(Scalar::Float))
                    .unwrap_or(Scalar::Null),
            ),
            serde_json::Value::String(s) => Value::Scalar(Scalar::String(s.clone())),
            serde_json::Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| Self::from_json(name.clone(), item))
                    .collect(),
            ),
            serde_json::Value::Object(map) => Value::Composite(
                map.iter()
                    .map(|(key, child)| Self::from_json(key.clone(), child))
                    .collect(),
            ),
        };
        Self { name, value }
    }

    /// Element name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element content.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    /// Check if this element is an array.
    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self.value, Value::Array(_))
    }

    /// Check if this element holds a null scalar.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self.value, Value::Scalar(Scalar::Null))
    }

    /// Number of named children (zero unless composite).
    #[must_use]
    pub fn num_elements(&self) -> usize {
        match &self.value {
            Value::Composite(children) => children.len(),
            _ => 0,
        }
    }

    /// Child at position `index`.
    #[must_use]
    pub fn element_at(&self, index: usize) -> Option<&Self> {
        match &self.value {
            Value::Composite(children) => children.get(index),
            _ => None,
        }
    }

    /// First child named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Self> {
        match &self.value {
            Value::Composite(children) => children.iter().find(|c| c.name == name),
            _ => None,
        }
    }

    /// Iterate over named children.
    pub fn elements(&self) -> impl Iterator<Item = &Self> {
        let children: &[Self] = match &self.value {
            Value::Composite(children) => children,
            _ => &[],
        };
        children.iter()
    }

    /// Number of values: entries for arrays, zero for null, one otherwise.
    #[must_use]
    pub fn num_values(&self) -> usize {
        match &self.value {
            Value::Array(entries) => entries.len(),
            Value::Scalar(Scalar::Null) => 0,
            _ => 1,
        }
    }

    /// Iterate over array entries.
    pub fn values(&self) -> impl Iterator<Item = &Self> {
        let entries: &[Self] = match &self.value {
            Value::Array(entries) => entries,
            _ => &[],
        };
        entries.iter()
    }

    /// Array entry at position `index`.
    #[must_use]
    pub fn value_at(&self, index: usize) -> Option<&Self> {
        match &self.value {
            Value::Array(entries) => entries.get(index),
            _ => None,
        }
    }

    /// Scalar content, if this is a leaf.
    #[must_use]
    pub const fn as_scalar(&self) -> Option<&Scalar> {
        match &self.value {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Leaf value rendered as plain text.
    #[must_use]
    pub fn value_as_string(&self) -> Option<String> {
        self.as_scalar().map(Scalar::as_text)
    }

    /// Text of the child named `name`, if it is a leaf.
    #[must_use]
    pub fn get_as_string(&self, name: &str) -> Option<String> {
        self.get(name).and_then(Self::value_as_string)
    }

    fn print(&self, f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
        let indent = " ".repeat(level * SPACES_PER_LEVEL);
        match &self.value {
            Value::Scalar(s) => writeln!(f, "{indent}{} = {s}", self.name),
            Value::Composite(children) => {
                writeln!(f, "{indent}{} = {{", self.name)?;
                for child in children {
                    child.print(f, level + 1)?;
                }
                writeln!(f, "{indent}}}")
            }
            Value::Array(entries) => {
                writeln!(f, "{indent}{}[] = {{", self.name)?;
                let inner = " ".repeat((level + 1) * SPACES_PER_LEVEL);
                for entry in entries {
                    match &entry.value {
                        Value::Scalar(s) => writeln!(f, "{inner}{s}")?,
                        _ => entry.print(f, level + 1)?,
                    }
                }
                writeln!(f, "{indent}}}")
            }
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.print(f, 0)
    }
}

// =============================================================================
// Tests
// =============================================================================
