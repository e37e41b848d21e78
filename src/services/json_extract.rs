//! Pulls the first JSON object out of free-form model output.
//!
//! Models wrap structured answers in code fences, prose, or trailing notes.
//! Rather than stripping characters, this scans for a balanced `{...}` span
//! (string- and escape-aware) and hands it to `serde_json`.

use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum JsonExtractError {
    #[error("No JSON object found in model output")]
    NoObject,
    #[error("Unterminated JSON object starting at byte {0}")]
    Unterminated(usize),
    #[error("Malformed JSON object: {0}")]
    Malformed(String),
}

/// Returns the first well-formed JSON object in `text`.
///
/// Candidates that never close or fail to parse are skipped. If none
/// succeeds, the first unterminated position or the last parse error is
/// reported.
pub fn extract_first_object(text: &str) -> Result<Map<String, Value>, JsonExtractError> {
    let mut search_from = 0;
    let mut last_error = None;

    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        match balanced_end(&text[start..]) {
            Some(len) => {
                let candidate = &text[start..start + len];
                match serde_json::from_str::<Value>(candidate) {
                    Ok(Value::Object(map)) => return Ok(map),
                    Ok(_) => {}
                    Err(e) => last_error = Some(JsonExtractError::Malformed(e.to_string())),
                }
            }
            None => {
                last_error.get_or_insert(JsonExtractError::Unterminated(start));
            }
        }
        search_from = start + 1;
    }

    Err(last_error.unwrap_or(JsonExtractError::NoObject))
}

/// Reads a single string field from the first object, e.g. `"sentiment"`.
pub fn extract_label(text: &str, field: &str) -> Result<String, JsonExtractError> {
    let object = extract_first_object(text)?;
    match object.get(field) {
        Some(Value::String(label)) if !label.trim().is_empty() => Ok(label.trim().to_string()),
        Some(other) if !other.is_null() => Ok(other.to_string()),
        _ => Err(JsonExtractError::Malformed(format!("missing field `{}`", field))),
    }
}

/// Byte length of the balanced object at the start of `s`, if it closes.
fn balanced_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in s.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx + 1);
                }
            }
            _ => {}
        }
    }

    None
}
