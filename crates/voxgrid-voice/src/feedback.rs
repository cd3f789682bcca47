//! User feedback produced by the capture flow. The host decides how to show it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub title: String,
    pub description: String,
    pub destructive: bool,
}

impl Feedback {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            destructive: false,
        }
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            destructive: true,
        }
    }

    pub(crate) fn listening() -> Self {
        Self::info(
            "Listening...",
            "Speak now. I'm listening for your widget request.",
        )
    }

    pub(crate) fn unclear() -> Self {
        Self::destructive(
            "Couldn't hear that clearly",
            "Please try speaking again more clearly.",
        )
    }
}
