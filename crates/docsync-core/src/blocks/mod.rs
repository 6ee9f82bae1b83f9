//! Block document model
//!
//! A document is an ordered forest of blocks. List items own their children
//! directly; every other block is a leaf.

mod rich_text;

use serde::{Deserialize, Serialize};

pub use rich_text::{plain_text, Annotations, RichTextRun};

/// A parsed document: the top-level block sequence
pub type Document = Vec<Block>;

/// Heading depth supported by the store (1-3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
}

impl HeadingLevel {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::H1 => 1,
            Self::H2 => 2,
            Self::H3 => 3,
        }
    }

    /// Markdown prefix without the trailing space
    pub fn marker(self) -> &'static str {
        match self {
            Self::H1 => "#",
            Self::H2 => "##",
            Self::H3 => "###",
        }
    }
}

impl TryFrom<u8> for HeadingLevel {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            1 => Ok(Self::H1),
            2 => Ok(Self::H2),
            3 => Ok(Self::H3),
            other => Err(format!("unsupported heading level {}", other)),
        }
    }
}

impl From<HeadingLevel> for u8 {
    fn from(level: HeadingLevel) -> Self {
        level.as_u8()
    }
}

/// Block-level document unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading {
        level: HeadingLevel,
        text: Vec<RichTextRun>,
    },
    Paragraph {
        text: Vec<RichTextRun>,
    },
    BulletedListItem {
        text: Vec<RichTextRun>,
        #[serde(default)]
        children: Vec<Block>,
    },
    NumberedListItem {
        text: Vec<RichTextRun>,
        #[serde(default)]
        children: Vec<Block>,
    },
    /// Checkbox item. The markdown parser never gives todos children.
    Todo {
        text: Vec<RichTextRun>,
        checked: bool,
        #[serde(default)]
        children: Vec<Block>,
    },
    Image {
        url: String,
        #[serde(default)]
        caption: String,
    },
    /// Verbatim code; content is never scanned for inline markers
    Code {
        language: String,
        content: String,
    },
}

impl Block {
    pub fn heading(level: HeadingLevel, text: Vec<RichTextRun>) -> Self {
        Self::Heading { level, text }
    }

    pub fn paragraph(text: Vec<RichTextRun>) -> Self {
        Self::Paragraph { text }
    }

    pub fn bulleted(text: Vec<RichTextRun>) -> Self {
        Self::BulletedListItem {
            text,
            children: Vec::new(),
        }
    }

    pub fn numbered(text: Vec<RichTextRun>) -> Self {
        Self::NumberedListItem {
            text,
            children: Vec::new(),
        }
    }

    pub fn todo(text: Vec<RichTextRun>, checked: bool) -> Self {
        Self::Todo {
            text,
            checked,
            children: Vec::new(),
        }
    }

    /// Store-facing type name (`heading_1`, `bulleted_list_item`, ...)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Heading { level, .. } => match level {
                HeadingLevel::H1 => "heading_1",
                HeadingLevel::H2 => "heading_2",
                HeadingLevel::H3 => "heading_3",
            },
            Self::Paragraph { .. } => "paragraph",
            Self::BulletedListItem { .. } => "bulleted_list_item",
            Self::NumberedListItem { .. } => "numbered_list_item",
            Self::Todo { .. } => "to_do",
            Self::Image { .. } => "image",
            Self::Code { .. } => "code",
        }
    }

    /// Rich text of text-bearing blocks
    pub fn text(&self) -> Option<&[RichTextRun]> {
        match self {
            Self::Heading { text, .. }
            | Self::Paragraph { text }
            | Self::BulletedListItem { text, .. }
            | Self::NumberedListItem { text, .. }
            | Self::Todo { text, .. } => Some(text),
            Self::Image { .. } | Self::Code { .. } => None,
        }
    }

    pub fn children(&self) -> &[Block] {
        match self {
            Self::BulletedListItem { children, .. }
            | Self::NumberedListItem { children, .. }
            | Self::Todo { children, .. } => children,
            _ => &[],
        }
    }

    /// Mutable child list, for blocks that can own children
    pub fn children_mut(&mut self) -> Option<&mut Vec<Block>> {
        match self {
            Self::BulletedListItem { children, .. }
            | Self::NumberedListItem { children, .. }
            | Self::Todo { children, .. } => Some(children),
            _ => None,
        }
    }

    /// Bulleted, numbered and todo items share list spacing rules
    pub fn is_list_item(&self) -> bool {
        matches!(
            self,
            Self::BulletedListItem { .. } | Self::NumberedListItem { .. } | Self::Todo { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_level_conversion() {
        assert_eq!(HeadingLevel::try_from(2), Ok(HeadingLevel::H2));
        assert!(HeadingLevel::try_from(4).is_err());
        assert_eq!(u8::from(HeadingLevel::H3), 3);
        assert_eq!(HeadingLevel::H1.marker(), "#");
    }

    #[test]
    fn test_list_item_classification() {
        assert!(Block::bulleted(vec![]).is_list_item());
        assert!(Block::numbered(vec![]).is_list_item());
        assert!(Block::todo(vec![], true).is_list_item());
        assert!(!Block::paragraph(vec![]).is_list_item());
        assert!(!Block::Code {
            language: "rust".into(),
            content: String::new(),
        }
        .is_list_item());
    }

    #[test]
    fn test_children_access() {
        let mut item = Block::bulleted(vec![RichTextRun::plain("a")]);
        item.children_mut()
            .unwrap()
            .push(Block::bulleted(vec![RichTextRun::plain("b")]));
        assert_eq!(item.children().len(), 1);

        let mut para = Block::paragraph(vec![]);
        assert!(para.children_mut().is_none());
        assert!(para.children().is_empty());
    }

    #[test]
    fn test_serde_tagging() {
        let block = Block::heading(HeadingLevel::H2, vec![RichTextRun::plain("Title")]);
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "heading");
        assert_eq!(json["level"], 2);

        let back: Block = serde_json::from_value(json).unwrap();
        assert_eq!(back, block);
    }
}
