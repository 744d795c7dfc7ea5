//! Interactive-element listing of a rendered page.

use serde::{Deserialize, Serialize};

/// What an interactive element is, for the purposes of locating login controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// `<input type="text">` or an input without a type
    Text,
    /// `<input type="email">`
    Email,
    /// `<input type="password">`
    Password,
    /// Anything that submits or advances a form when activated
    Button,
    /// `<input type="hidden">`
    Hidden,
    /// Checkboxes, selects, textareas and the like
    Other,
}

impl ElementKind {
    /// Classify an element from its lowercase tag name and `type` attribute.
    #[must_use]
    pub fn classify(tag: &str, input_type: &str) -> Self {
        match (tag, input_type) {
            ("input", "" | "text") => Self::Text,
            ("input", "email") => Self::Email,
            ("input", "password") => Self::Password,
            ("input", "submit" | "button" | "image") => Self::Button,
            ("input", "hidden") => Self::Hidden,
            ("button", "" | "submit" | "button") => Self::Button,
            // role="button" on anchors and divs is reported as type "button"
            (_, "button") => Self::Button,
            _ => Self::Other,
        }
    }

    /// Whether a user name can be typed into this kind of element.
    #[must_use]
    pub fn accepts_username(self) -> bool {
        matches!(self, Self::Text | Self::Email)
    }
}

/// One interactive element, in document order.
///
/// `index` is the element's position in the page's interactive-element
/// listing and is only meaningful for the page instance it was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementInfo {
    pub index: usize,
    pub tag: String,
    #[serde(rename = "type", default)]
    pub input_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    pub visible: bool,
}

impl ElementInfo {
    /// A visible `<input>` of the given type.
    pub fn input(index: usize, input_type: &str, name: &str) -> Self {
        Self {
            index,
            tag: "input".to_string(),
            input_type: input_type.to_string(),
            name: Some(name.to_string()).filter(|n| !n.is_empty()),
            id: None,
            visible: true,
        }
    }

    /// A visible submit `<button>`.
    pub fn button(index: usize, name: &str) -> Self {
        Self {
            index,
            tag: "button".to_string(),
            input_type: "submit".to_string(),
            name: Some(name.to_string()).filter(|n| !n.is_empty()),
            id: None,
            visible: true,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    #[must_use]
    pub fn kind(&self) -> ElementKind {
        ElementKind::classify(&self.tag, &self.input_type)
    }

    /// Name, id or position, for log lines.
    #[must_use]
    pub fn label(&self) -> String {
        self.name
            .as_deref()
            .or(self.id.as_deref())
            .map_or_else(|| format!("{}#{}", self.tag, self.index), str::to_string)
    }

    /// Whether two listings refer to the same control by name or id.
    #[must_use]
    pub fn same_control(&self, other: &ElementInfo) -> bool {
        match (&self.name, &other.name, &self.id, &other.id) {
            (Some(a), Some(b), _, _) if a == b => true,
            (_, _, Some(a), Some(b)) if a == b => true,
            _ => false,
        }
    }
}
