//! Inline text runs

use serde::{Deserialize, Serialize};

/// Formatting flags on a run of text
///
/// The inline parser only ever sets one flag per run, but runs coming back
/// from the store may combine them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub code: bool,
}

impl Annotations {
    pub fn is_plain(&self) -> bool {
        !(self.bold || self.italic || self.underline || self.code)
    }
}

/// A span of inline text with annotations and an optional link
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichTextRun {
    pub content: String,
    #[serde(default)]
    pub annotations: Annotations,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl RichTextRun {
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn bold(content: impl Into<String>) -> Self {
        let annotations = Annotations {
            bold: true,
            ..Annotations::default()
        };
        Self::annotated(content, annotations)
    }

    pub fn italic(content: impl Into<String>) -> Self {
        let annotations = Annotations {
            italic: true,
            ..Annotations::default()
        };
        Self::annotated(content, annotations)
    }

    pub fn underline(content: impl Into<String>) -> Self {
        let annotations = Annotations {
            underline: true,
            ..Annotations::default()
        };
        Self::annotated(content, annotations)
    }

    pub fn code(content: impl Into<String>) -> Self {
        let annotations = Annotations {
            code: true,
            ..Annotations::default()
        };
        Self::annotated(content, annotations)
    }

    pub fn link(content: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            annotations: Annotations::default(),
            link: Some(url.into()),
        }
    }

    fn annotated(content: impl Into<String>, annotations: Annotations) -> Self {
        Self {
            content: content.into(),
            annotations,
            link: None,
        }
    }
}

/// Concatenate the raw content of runs, ignoring annotations
pub fn plain_text(runs: &[RichTextRun]) -> String {
    runs.iter().map(|run| run.content.as_str()).collect()
}
