//! High-model adapters (§3.9, §1's explicit scoping note): thin value
//! holders over the low-tier worked examples, adding ergonomic accessors
//! and the render-back-to-YAML impl. Every other named OpenAPI object is
//! handled generically via the index plus (for schemas) a `SchemaProxy` —
//! never as a bespoke struct.

pub use rolodex_core::low::{BuildModel, Contact, Info};

impl Info {
    /// The document's `title`, unwrapped from its [`NodeReference`](rolodex_core::low::NodeReference).
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title.value
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version.value
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_ref().map(|d| d.value.as_str())
    }
}

impl Contact {
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().map(|n| n.value.as_str())
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_ref().map(|e| e.value.as_str())
    }
}
