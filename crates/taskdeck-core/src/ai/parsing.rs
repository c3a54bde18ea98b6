//! Parsing of model text into typed outputs
//!
//! Models wrap their JSON in prose or Markdown fences. These helpers strip
//! that, pull out the outermost JSON object, and validate it against the
//! shape for the requested kind. Anything that does not fit is
//! `invalid-response`.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::models::{Category, Priority};

use super::error::{AIError, AIResult};
use super::types::{AIOutput, NextTask, OutputKind, SuggestedTag, TaskDraft};

/// Upper bound on tag suggestions
pub const MAX_SUGGESTED_TAGS: usize = 5;

fn truncate_for_error(s: &str) -> String {
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s.to_string()
    }
}

/// Remove surrounding Markdown code fences (```json ... ```)
pub fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening fence line
    let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// The span from the first `open` to the last `close`, if any
fn bracketed(response: &str, open: char, close: char) -> Option<(usize, &str)> {
    let start = response.find(open)?;
    let end = response.rfind(close)?;
    (start < end).then(|| (start, &response[start..=end]))
}

/// Extract and decode the outermost JSON object or array in a model response
///
/// The bracket that opens first is tried first, so a bare array reply like
/// `["a", "b"]` is accepted alongside `{...}`; prose such as `[1]` before an
/// object falls through to the object.
pub fn extract_json(response: &str) -> AIResult<Value> {
    let response = strip_code_fences(response);

    let mut candidates: Vec<(usize, &str)> = [
        bracketed(response, '{', '}'),
        bracketed(response, '[', ']'),
    ]
    .into_iter()
    .flatten()
    .collect();
    candidates.sort_by_key(|(start, _)| *start);

    let mut first_error = None;
    for (_, json_str) in candidates {
        match serde_json::from_str(json_str) {
            Ok(value) => return Ok(value),
            Err(e) => {
                first_error.get_or_insert_with(|| {
                    AIError::invalid_response(format!(
                        "Invalid JSON from AI: {} | Raw: {}",
                        e,
                        truncate_for_error(json_str)
                    ))
                    .with_source(e)
                });
            }
        }
    }

    Err(first_error.unwrap_or_else(|| {
        AIError::invalid_response(format!(
            "No JSON found in AI response | Raw: {}",
            truncate_for_error(response)
        ))
    }))
}

fn field<'a>(value: &'a Value, name: &str) -> AIResult<&'a Value> {
    value
        .get(name)
        .filter(|v| !v.is_null())
        .ok_or_else(|| AIError::invalid_response(format!("AI response is missing '{}'", name)))
}

fn string_field(value: &Value, name: &str) -> AIResult<String> {
    field(value, name)?
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| AIError::invalid_response(format!("'{}' must be a string", name)))
}

fn parse_priority(raw: &str) -> AIResult<Priority> {
    raw.parse()
        .map_err(|_| AIError::invalid_response(format!("Unknown priority '{}'", raw)))
}

/// A tag entry may be a bare name or `{name, color?}`
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTag {
    Name(String),
    Object { name: String },
}

fn parse_summary(value: &Value) -> AIResult<AIOutput> {
    let text = match value.get("summary") {
        Some(_) => string_field(value, "summary")?,
        None => string_field(value, "text")?,
    };
    if text.is_empty() {
        return Err(AIError::invalid_response("Summary is empty"));
    }
    Ok(AIOutput::Summary { text })
}

/// The tag list: `suggestedTags`, then `tags`, then a top-level array
fn tag_list(value: &Value) -> AIResult<&Value> {
    if value.is_array() {
        return Ok(value);
    }
    ["suggestedTags", "tags"]
        .iter()
        .find_map(|key| value.get(*key).filter(|v| !v.is_null()))
        .ok_or_else(|| AIError::invalid_response("AI response is missing 'suggestedTags'"))
}

fn parse_tags(value: &Value) -> AIResult<AIOutput> {
    let raw: Vec<RawTag> = serde_json::from_value(tag_list(value)?.clone()).map_err(|e| {
        AIError::invalid_response(format!("Tag list has the wrong shape: {}", e)).with_source(e)
    })?;

    let mut suggested: Vec<SuggestedTag> = Vec::new();
    for tag in raw {
        let name = match tag {
            RawTag::Name(n) | RawTag::Object { name: n } => n.trim().to_string(),
        };
        if name.is_empty() || suggested.iter().any(|s| s.name == name) {
            continue;
        }
        suggested.push(SuggestedTag::from_name(&name));
    }
    suggested.truncate(MAX_SUGGESTED_TAGS);

    if suggested.is_empty() {
        return Err(AIError::invalid_response("AI suggested no tags"));
    }
    Ok(AIOutput::Tags {
        suggested_tags: suggested,
    })
}

fn parse_classify(value: &Value) -> AIResult<AIOutput> {
    let raw_category = string_field(value, "category")?;
    let category: Category = raw_category
        .parse()
        .map_err(|_| AIError::invalid_response(format!("Unknown category '{}'", raw_category)))?;

    let confidence = field(value, "confidence")?
        .as_f64()
        .ok_or_else(|| AIError::invalid_response("'confidence' must be a number"))?;
    if !(0.0..=1.0).contains(&confidence) {
        return Err(AIError::invalid_response(format!(
            "Confidence {} is outside [0, 1]",
            confidence
        )));
    }

    let reason = value
        .get("reason")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string();

    Ok(AIOutput::Classify {
        category,
        confidence,
        reason,
    })
}

fn parse_priority_output(value: &Value) -> AIResult<AIOutput> {
    let raw = string_field(value, "priority")?;
    Ok(AIOutput::Priority {
        priority: parse_priority(&raw)?,
    })
}

fn parse_suggest(value: &Value) -> AIResult<AIOutput> {
    let task = field(value, "nextTask")?;

    let title = string_field(task, "title")?;
    if title.is_empty() {
        return Err(AIError::invalid_response("Suggested task has no title"));
    }
    let description = task
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string();
    let priority = match task.get("priority").and_then(Value::as_str) {
        Some(p) => parse_priority(p)?,
        None => Priority::Medium,
    };
    let estimated_duration = task
        .get("estimatedDuration")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let dependencies = match task.get("dependencies") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(_) => {
            return Err(AIError::invalid_response(
                "'dependencies' must be an array",
            ))
        }
    };

    Ok(AIOutput::Suggest {
        next_task: NextTask {
            title,
            description,
            priority,
            estimated_duration,
            dependencies,
        },
    })
}

fn parse_create(value: &Value) -> AIResult<AIOutput> {
    // Some models wrap the draft as {"task": {...}}
    let task = value.get("task").filter(|t| t.is_object()).unwrap_or(value);

    let title = string_field(task, "title")?;
    if title.is_empty() {
        return Err(AIError::invalid_response("Drafted task has no title"));
    }
    let description = task
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string();
    let priority = match task.get("priority").and_then(Value::as_str) {
        Some(p) => parse_priority(p)?,
        None => Priority::Medium,
    };

    let tags = match task.get("tags") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => {
            let mut names: Vec<String> = Vec::new();
            for name in items.iter().filter_map(Value::as_str).map(str::trim) {
                if !name.is_empty() && !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
            names.truncate(MAX_SUGGESTED_TAGS);
            names
        }
        Some(_) => return Err(AIError::invalid_response("'tags' must be an array")),
    };

    let due_date = match task.get("dueDate").and_then(Value::as_str).map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
            AIError::invalid_response(format!("Invalid dueDate '{}'", raw)).with_source(e)
        })?),
    };

    Ok(AIOutput::Create {
        task: TaskDraft {
            title,
            description,
            priority,
            tags,
            due_date,
        },
    })
}

/// Parse a raw model response into the output shape for `kind`
pub fn parse_output(kind: OutputKind, response: &str) -> AIResult<AIOutput> {
    let value = extract_json(response)?;
    match kind {
        OutputKind::Summary => parse_summary(&value),
        OutputKind::Tags => parse_tags(&value),
        OutputKind::Classify => parse_classify(&value),
        OutputKind::Priority => parse_priority_output(&value),
        OutputKind::Suggest => parse_suggest(&value),
        OutputKind::Create => parse_create(&value),
    }
}
