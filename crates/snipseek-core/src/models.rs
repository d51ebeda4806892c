use serde::{Deserialize, Serialize};

/// A single indexed code snippet
///
/// Snippets come out of the prebuilt index artifacts exactly as they were
/// indexed; nothing here is derived at search time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSnippet {
    /// Snippet source text, stored verbatim
    pub code: String,

    /// Docstring attached to the snippet, when the artifact ships one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl CodeSnippet {
    /// Create a snippet with no docstring
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            doc: None,
        }
    }

    /// Attach a docstring
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}
