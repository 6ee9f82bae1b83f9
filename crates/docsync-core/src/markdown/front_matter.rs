//! YAML metadata header carried beside the markdown body
//!
//! The header is never part of the block conversion. It is split off before
//! parsing and rendered back in front of the serialized body.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DELIMITER: &str = "---";

#[derive(Debug, Error)]
pub enum FrontMatterError {
    #[error("invalid front matter: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Document properties mirrored to the remote container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrontMatter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Keys we don't interpret, kept so they survive a round trip
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
    /// HTML comments found before the header, verbatim
    #[serde(skip)]
    pub preamble: String,
}

impl FrontMatter {
    /// No header fields (a preamble alone does not count)
    pub fn is_empty(&self) -> bool {
        self.application.is_none()
            && self.status.is_none()
            && self.description.is_none()
            && self.extra.is_empty()
    }
}

/// Split a file into its front matter and markdown body
///
/// Leading HTML comments go to [`FrontMatter::preamble`]. The header must
/// open and close with lines holding only `---`. A file without a complete
/// header yields default fields and the whole text after the preamble.
pub fn split_front_matter(content: &str) -> Result<(FrontMatter, String), FrontMatterError> {
    let (preamble, content) = split_leading_comments(content);
    let no_header = || {
        let front_matter = FrontMatter {
            preamble: preamble.to_string(),
            ..FrontMatter::default()
        };
        Ok((front_matter, content.to_string()))
    };

    let Some((opener, rest)) = content.split_once('\n') else {
        return no_header();
    };
    if opener.trim_end() != DELIMITER {
        return no_header();
    }
    let Some((yaml_end, body_start)) = find_closing_delimiter(rest) else {
        return no_header();
    };

    let yaml = rest[..yaml_end].trim();
    let mut front_matter = if yaml.is_empty() {
        FrontMatter::default()
    } else {
        serde_yaml::from_str::<FrontMatter>(yaml)?
    };
    front_matter.preamble = preamble.to_string();

    Ok((front_matter, rest[body_start..].to_string()))
}

/// Byte range of the first line that is exactly `---` (trailing space allowed)
fn find_closing_delimiter(rest: &str) -> Option<(usize, usize)> {
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == DELIMITER {
            return Some((offset, offset + line.len()));
        }
        offset += line.len();
    }
    None
}

/// Put the preamble and a front matter header back in front of `body`
pub fn render_front_matter(
    front_matter: &FrontMatter,
    body: &str,
) -> Result<String, FrontMatterError> {
    let mut out = front_matter.preamble.clone();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }

    if !front_matter.is_empty() {
        let yaml = serde_yaml::to_string(front_matter)?;
        out.push_str(&format!("{DELIMITER}\n{yaml}{DELIMITER}\n\n"));
    }
    out.push_str(body);
    Ok(out)
}

/// Split off leading HTML comments with the whitespace and line break
/// following each one
fn split_leading_comments(content: &str) -> (&str, &str) {
    let mut rest = content;
    loop {
        let trimmed = rest.trim_start();
        let Some(comment) = trimmed.strip_prefix("<!--") else {
            break;
        };
        let Some(end) = comment.find("-->") else {
            break;
        };
        let after = comment[end + 3..].trim_start_matches([' ', '\t']);
        rest = after
            .strip_prefix("\r\n")
            .or_else(|| after.strip_prefix('\n'))
            .unwrap_or(after);
    }
    content.split_at(content.len() - rest.len())
}
