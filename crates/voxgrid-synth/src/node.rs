//! Renderable tree produced by invoking a compiled widget.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Host-neutral render tree. The dashboard view maps it onto egui widgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderNode {
    Element {
        tag: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attrs: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<RenderNode>,
    },
    Text {
        text: String,
    },
    Fragment {
        children: Vec<RenderNode>,
    },
    Empty,
    /// Fallback surface shown in place of a widget whose code failed.
    Error {
        message: String,
    },
}

impl RenderNode {
    pub fn text(text: impl Into<String>) -> Self {
        RenderNode::Text { text: text.into() }
    }

    pub fn element(
        tag: impl Into<String>,
        attrs: BTreeMap<String, String>,
        children: Vec<RenderNode>,
    ) -> Self {
        RenderNode::Element {
            tag: tag.into(),
            attrs,
            children,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        RenderNode::Error {
            message: message.into(),
        }
    }

    /// Collapse a list of children: empty list → `Empty`, one child → itself.
    pub fn from_children(mut children: Vec<RenderNode>) -> Self {
        children.retain(|c| !matches!(c, RenderNode::Empty));
        match children.len() {
            0 => RenderNode::Empty,
            1 => children.remove(0),
            _ => RenderNode::Fragment { children },
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RenderNode::Error { .. })
    }

    /// True when this node or any descendant is an error surface.
    pub fn contains_error(&self) -> bool {
        match self {
            RenderNode::Error { .. } => true,
            RenderNode::Element { children, .. } | RenderNode::Fragment { children } => {
                children.iter().any(RenderNode::contains_error)
            }
            RenderNode::Text { .. } | RenderNode::Empty => false,
        }
    }

    /// Concatenated text of the subtree, children separated by nothing.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            RenderNode::Text { text } => out.push_str(text),
            RenderNode::Error { message } => out.push_str(message),
            RenderNode::Element { children, .. } | RenderNode::Fragment { children } => {
                for child in children {
                    child.collect_text(out);
                }
            }
            RenderNode::Empty => {}
        }
    }

    /// True when the tree has more than `limit` levels below this node.
    pub fn depth_exceeds(&self, limit: usize) -> bool {
        match self {
            RenderNode::Element { children, .. } | RenderNode::Fragment { children } => {
                !children.is_empty()
                    && (limit == 0 || children.iter().any(|c| c.depth_exceeds(limit - 1)))
            }
            RenderNode::Text { .. } | RenderNode::Empty | RenderNode::Error { .. } => false,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        match self {
            RenderNode::Element { attrs, .. } => attrs.get(name).map(String::as_str),
            _ => None,
        }
    }
}
