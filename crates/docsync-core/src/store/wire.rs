//! JSON block objects as the remote store exchanges them
//!
//! Shape: `{"object": "block", "type": "<kind>", "<kind>": {...}}` with
//! list children nested under the kind key.

use serde_json::{json, Map, Value};

use super::RemoteBlock;
use crate::blocks::{Annotations, Block, HeadingLevel, RichTextRun};

/// Convert a block (and its subtree) into the store's JSON shape
pub fn to_wire(block: &Block) -> Value {
    let kind = block.kind();
    let body = match block {
        Block::Heading { text, .. } | Block::Paragraph { text } => {
            json!({ "rich_text": rich_text_to_wire(text) })
        }
        Block::BulletedListItem { text, children } | Block::NumberedListItem { text, children } => {
            let mut body = json!({ "rich_text": rich_text_to_wire(text) });
            insert_children(&mut body, children);
            body
        }
        Block::Todo {
            text,
            checked,
            children,
        } => {
            let mut body = json!({
                "rich_text": rich_text_to_wire(text),
                "checked": checked,
            });
            insert_children(&mut body, children);
            body
        }
        Block::Image { url, caption } => {
            let caption = if caption.is_empty() {
                Vec::new()
            } else {
                vec![run_to_wire(&RichTextRun::plain(caption.as_str()))]
            };
            json!({
                "type": "external",
                "external": { "url": url },
                "caption": caption,
            })
        }
        Block::Code { language, content } => json!({
            "rich_text": [run_to_wire(&RichTextRun::plain(content.as_str()))],
            "language": language,
        }),
    };

    let mut object = Map::new();
    object.insert("object".to_string(), json!("block"));
    object.insert("type".to_string(), json!(kind));
    object.insert(kind.to_string(), body);
    Value::Object(object)
}

fn insert_children(body: &mut Value, children: &[Block]) {
    if children.is_empty() {
        return;
    }
    if let Some(map) = body.as_object_mut() {
        map.insert(
            "children".to_string(),
            Value::Array(children.iter().map(to_wire).collect()),
        );
    }
}

pub fn rich_text_to_wire(runs: &[RichTextRun]) -> Vec<Value> {
    runs.iter().map(run_to_wire).collect()
}

fn run_to_wire(run: &RichTextRun) -> Value {
    let mut text = Map::new();
    text.insert("content".to_string(), json!(run.content));
    if let Some(url) = &run.link {
        text.insert("link".to_string(), json!({ "url": url }));
    }

    json!({
        "type": "text",
        "text": text,
        "annotations": {
            "bold": run.annotations.bold,
            "italic": run.annotations.italic,
            "underline": run.annotations.underline,
            "code": run.annotations.code,
        },
    })
}

/// Read a block object; unsupported types yield `None`
///
/// Children are taken from `<kind>.children` or a top-level `children`
/// array when present.
pub fn from_wire(value: &Value) -> Option<Block> {
    let kind = value.get("type")?.as_str()?;
    let body = value.get(kind)?;
    let text = || rich_text_from_wire(body.get("rich_text"));
    let children = || -> Vec<Block> {
        body.get("children")
            .or_else(|| value.get("children"))
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(from_wire).collect())
            .unwrap_or_default()
    };

    let block = match kind {
        "heading_1" => Block::heading(HeadingLevel::H1, text()),
        "heading_2" => Block::heading(HeadingLevel::H2, text()),
        "heading_3" => Block::heading(HeadingLevel::H3, text()),
        "paragraph" => Block::paragraph(text()),
        "bulleted_list_item" => Block::BulletedListItem {
            text: text(),
            children: children(),
        },
        "numbered_list_item" => Block::NumberedListItem {
            text: text(),
            children: children(),
        },
        "to_do" => Block::Todo {
            text: text(),
            checked: body.get("checked").and_then(Value::as_bool).unwrap_or(false),
            children: children(),
        },
        "image" => {
            let source = body.get("type").and_then(Value::as_str).unwrap_or("external");
            let url = body
                .get(source)
                .and_then(|s| s.get("url"))
                .and_then(Value::as_str)?;
            let caption = rich_text_from_wire(body.get("caption"))
                .into_iter()
                .map(|run| run.content)
                .collect();
            Block::Image {
                url: url.to_string(),
                caption,
            }
        }
        "code" => Block::Code {
            language: body
                .get("language")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            content: rich_text_from_wire(body.get("rich_text"))
                .into_iter()
                .map(|run| run.content)
                .collect(),
        },
        _ => return None,
    };

    Some(block)
}

/// Read a listing entry: id, child flag and (when supported) the block
pub fn remote_block_from_wire(value: &Value) -> Option<RemoteBlock> {
    let id = value.get("id")?.as_str()?.to_string();
    let has_children = value
        .get("has_children")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Some(RemoteBlock {
        id,
        has_children,
        block: from_wire(value),
    })
}

pub fn rich_text_from_wire(value: Option<&Value>) -> Vec<RichTextRun> {
    value
        .and_then(Value::as_array)
        .map(|runs| runs.iter().map(run_from_wire).collect())
        .unwrap_or_default()
}

fn run_from_wire(value: &Value) -> RichTextRun {
    let text = value.get("text");
    let content = value
        .get("plain_text")
        .and_then(Value::as_str)
        .or_else(|| text.and_then(|t| t.get("content")).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();
    let link = value
        .get("href")
        .and_then(Value::as_str)
        .or_else(|| {
            text.and_then(|t| t.get("link"))
                .and_then(|l| l.get("url"))
                .and_then(Value::as_str)
        })
        .map(str::to_string);

    let flag = |name: &str| {
        value
            .get("annotations")
            .and_then(|a| a.get(name))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    };

    RichTextRun {
        content,
        annotations: Annotations {
            bold: flag("bold"),
            italic: flag("italic"),
            underline: flag("underline"),
            code: flag("code"),
        },
        link,
    }
}
