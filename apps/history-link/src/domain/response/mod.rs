//! Historical Response Formatting
//!
//! Flattens `securityData.fieldData` blocks into the bracketed text the host
//! side parses:
//!
//! ```text
//! {{"2016-01-04", 135.95},{"2016-01-05", 133.9}}
//! ```
//!
//! Each observation entry is read positionally in pairs: element `k` is the
//! label (normally the date) and element `k + 1` the value. Entries are
//! comma separated inside one block; blocks from successive messages are
//! concatenated with no separator. A message whose root has no children
//! (a bare status message) contributes nothing at all.
//!
//! Downstream consumers parse this text literally, so the layout must not
//! change.

use thiserror::Error;

use crate::domain::element::Element;
use crate::domain::event::{Event, Message, names};

/// Errors raised while walking a response tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// A required child element is absent.
    #[error("element '{parent}' has no '{name}' element")]
    MissingElement {
        /// Element that was searched.
        parent: String,
        /// Name that was not found.
        name: &'static str,
    },

    /// An element expected to be an array is not one.
    #[error("element '{0}' is not an array")]
    NotArray(String),

    /// A label or value is not a leaf.
    #[error("element '{0}' is not a scalar")]
    NotScalar(String),

    /// An observation entry has an odd number of elements.
    #[error("fieldData entry {entry} has no value for label '{label}'")]
    UnpairedElement {
        /// Index of the entry in `fieldData`.
        entry: usize,
        /// Name of the label element left without a value.
        label: String,
    },
}

// =============================================================================
// Error Info
// =============================================================================

/// Error details attached to a response (`securityError`, `errorInfo`,
/// `responseError`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Originating component, when present.
    pub source: Option<String>,
    /// Numeric code, when present.
    pub code: Option<i64>,
    /// Error category (e.g. `BAD_SEC`).
    pub category: String,
    /// Error subcategory, when present.
    pub subcategory: Option<String>,
    /// Human readable text.
    pub message: String,
}

impl ErrorInfo {
    /// Read error details from an element. Requires `category` and `message`.
    #[must_use]
    pub fn from_element(element: &Element) -> Option<Self> {
        let category = element.get_as_string(names::CATEGORY)?;
        let message = element.get_as_string(names::MESSAGE)?;
        let code = element
            .get(names::ERROR_CODE)
            .and_then(Element::value_as_string)
            .and_then(|c| c.parse().ok());

        Some(Self {
            source: element.get_as_string(names::SOURCE),
            code,
            category,
            subcategory: element.get_as_string(names::SUBCATEGORY),
            message,
        })
    }

    /// One-line description: `<prefix><category> (<message>)`.
    #[must_use]
    pub fn describe(&self, prefix: &str) -> String {
        format!("{prefix}{} ({})\n", self.category, self.message)
    }
}

// =============================================================================
// Formatter
// =============================================================================

/// Format every message of a response event.
///
/// # Errors
///
/// Returns an error if a message with content lacks `securityData` /
/// `fieldData` or holds malformed observation entries.
pub fn format_event(event: &Event) -> Result<String, FormatError> {
    let mut out = String::new();
    for message in event.messages() {
        format_message(message, &mut out)?;
    }
    Ok(out)
}

/// Append the formatted `fieldData` block of one message to `out`.
///
/// # Errors
///
/// See [`format_event`].
pub fn format_message(message: &Message, out: &mut String) -> Result<(), FormatError> {
    let root = message.as_element();
    if root.num_elements() == 0 {
        return Ok(());
    }

    if let Some(info) = root.get(names::RESPONSE_ERROR).and_then(ErrorInfo::from_element) {
        tracing::warn!(
            category = %info.category,
            message = %info.message,
            "Response error"
        );
    }

    let security_data = child(root, names::SECURITY_DATA)?;
    report_security_errors(security_data);

    let field_data = child(security_data, names::FIELD_DATA)?;
    if !field_data.is_array() {
        return Err(FormatError::NotArray(field_data.name().to_string()));
    }

    let count = field_data.num_values();
    out.push('{');
    for (j, entry) in field_data.values().enumerate() {
        let mut k = 0;
        while k < entry.num_elements() {
            let Some(label) = entry.element_at(k) else {
                break;
            };
            let value = entry
                .element_at(k + 1)
                .ok_or_else(|| FormatError::UnpairedElement {
                    entry: j,
                    label: label.name().to_string(),
                })?;

            out.push_str("{\"");
            out.push_str(&scalar_text(label)?);
            out.push_str("\", ");
            out.push_str(&scalar_text(value)?);
            out.push('}');

            k += 2;
        }
        if j + 1 < count {
            out.push(',');
        }
    }
    out.push('}');

    Ok(())
}

fn child<'a>(parent: &'a Element, name: &'static str) -> Result<&'a Element, FormatError> {
    parent.get(name).ok_or_else(|| FormatError::MissingElement {
        parent: parent.name().to_string(),
        name,
    })
}

fn scalar_text(element: &Element) -> Result<String, FormatError> {
    element
        .value_as_string()
        .ok_or_else(|| FormatError::NotScalar(element.name().to_string()))
}

/// Log security and field level errors; they never reach the host text.
fn report_security_errors(security_data: &Element) {
    let security = security_data
        .get_as_string(names::SECURITY)
        .unwrap_or_default();

    if let Some(info) = security_data
        .get(names::SECURITY_ERROR)
        .and_then(ErrorInfo::from_element)
    {
        tracing::warn!(
            security = %security,
            "{}",
            info.describe("SECURITY FAILED: ").trim_end()
        );
    }

    if let Some(exceptions) = security_data.get(names::FIELD_EXCEPTIONS) {
        for exception in exceptions.values() {
            let field_id = exception.get_as_string(names::FIELD_ID).unwrap_or_default();
            if let Some(info) = exception
                .get(names::ERROR_INFO)
                .and_then(ErrorInfo::from_element)
            {
                tracing::warn!(
                    security = %security,
                    field = %field_id,
                    "{}",
                    info.describe("FIELD FAILED: ").trim_end()
                );
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
