//! Mapping raw CMS records onto post models
//!
//! Structure we depend on (`data` object, arrays, timestamps) fails fast with
//! [`Error::MalformedContent`]; optional leaves (banner, text fields, content)
//! default instead.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde_json::{Map, Value};

use super::post::{ContentSection, PostDetail, PostSummary};
use super::richtext::{self, RichTextBlock};
use crate::cms::RawRecord;
use crate::error::{Error, Result};

/// Map a record to its listing shape
pub fn normalize_summary(raw: &RawRecord) -> Result<PostSummary> {
    let data = data_object(raw)?;
    Ok(PostSummary {
        uid: raw.uid.clone(),
        first_publication_date: parse_timestamp(raw.first_publication_date.as_deref())?,
        title: text_field(data, "title")?,
        subtitle: text_field(data, "subtitle")?,
        author: text_field(data, "author")?,
    })
}

/// Map a record to the full post shape
pub fn normalize_detail(raw: &RawRecord) -> Result<PostDetail> {
    let data = data_object(raw)?;

    let banner_url = data
        .get("banner")
        .and_then(|banner| banner.get("url"))
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_string);

    let content = match data.get("content") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(sections)) => sections
            .iter()
            .enumerate()
            .map(|(i, section)| normalize_section(i, section))
            .collect::<Result<Vec<_>>>()?,
        Some(other) => {
            return Err(Error::malformed(format!(
                "{}: content is {}, expected an array",
                describe(raw),
                type_name(other)
            )))
        }
    };

    Ok(PostDetail {
        id: raw.id.clone(),
        uid: raw.uid.clone(),
        first_publication_date: parse_timestamp(raw.first_publication_date.as_deref())?,
        last_publication_date: parse_timestamp(raw.last_publication_date.as_deref())?,
        title: text_field(data, "title")?,
        subtitle: text_field(data, "subtitle")?,
        author: text_field(data, "author")?,
        banner_url,
        content,
    })
}

/// Parse a CMS timestamp such as `2021-03-15T19:25:28+0000`
pub fn parse_timestamp(value: Option<&str>) -> Result<Option<DateTime<FixedOffset>>> {
    let Some(s) = value.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z") {
        return Ok(Some(dt));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(Some(dt));
    }
    // Offset-less timestamps are UTC
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Some(naive.and_utc().fixed_offset()));
        }
    }

    Err(Error::malformed(format!("unparseable timestamp {:?}", s)))
}

fn normalize_section(index: usize, section: &Value) -> Result<ContentSection> {
    let Value::Object(section) = section else {
        return Err(Error::malformed(format!(
            "content[{}] is {}, expected an object",
            index,
            type_name(section)
        )));
    };

    let body = match section.get("body") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(blocks)) => blocks.iter().cloned().map(RichTextBlock::from).collect(),
        Some(other) => {
            return Err(Error::malformed(format!(
                "content[{}].body is {}, expected an array",
                index,
                type_name(other)
            )))
        }
    };

    Ok(ContentSection {
        heading: text_field(section, "heading")?,
        body,
    })
}

fn data_object(raw: &RawRecord) -> Result<&Map<String, Value>> {
    match &raw.data {
        Some(Value::Object(data)) => Ok(data),
        Some(other) => Err(Error::malformed(format!(
            "{}: data is {}, expected an object",
            describe(raw),
            type_name(other)
        ))),
        None => Err(Error::malformed(format!("{}: missing data", describe(raw)))),
    }
}

/// A text leaf: plain string, or structured text flattened to plain text
fn text_field(object: &Map<String, Value>, key: &str) -> Result<String> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Array(blocks)) => {
            let blocks: Vec<RichTextBlock> = blocks.iter().cloned().map(RichTextBlock::from).collect();
            Ok(richtext::as_text(&blocks))
        }
        Some(other) => Err(Error::malformed(format!(
            "{} is {}, expected text",
            key,
            type_name(other)
        ))),
    }
}

fn describe(raw: &RawRecord) -> String {
    match (&raw.uid, &raw.id) {
        (Some(uid), _) => format!("document {}", uid),
        (None, Some(id)) => format!("document id {}", id),
        (None, None) => "document".to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
