//! JSON Extraction from LLM Responses
//!
//! Models wrap JSON in prose and code fences no matter how firmly the
//! prompt forbids it. This module recovers the payload: strip fences, try
//! a direct parse, then fall back to the first balanced top-level JSON
//! array or object embedded in the text. Anything unrecoverable is
//! `MalformedLlmResponse`, which callers translate into the local
//! fallback.

use serde_json::Value;
use tracing::debug;

use crate::types::{FolioError, Result};

/// Parse the best JSON value out of a raw response.
pub fn extract_json_value(raw: &str) -> Result<Value> {
    let cleaned = strip_code_fences(raw.trim());

    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        return Ok(value);
    }

    // Whichever top-level bracket appears first wins; a `{` opening an
    // object must not lose to an array nested inside it.
    let mut opens = ['[', '{'];
    if cleaned.find('{').unwrap_or(usize::MAX) < cleaned.find('[').unwrap_or(usize::MAX) {
        opens = ['{', '['];
    }
    for open in opens {
        if let Some(candidate) = balanced_substring(&cleaned, open)
            && let Ok(value) = serde_json::from_str::<Value>(candidate)
        {
            debug!("Recovered JSON payload embedded in prose");
            return Ok(value);
        }
    }

    Err(FolioError::MalformedLlmResponse(format!(
        "no JSON found in response ({} chars)",
        raw.len()
    )))
}

/// Parse a JSON array of strings, the bullet-generation wire shape.
pub fn extract_string_array(raw: &str) -> Result<Vec<String>> {
    let value = extract_json_value(raw)?;
    let Value::Array(items) = value else {
        return Err(FolioError::MalformedLlmResponse(
            "expected a JSON array".to_string(),
        ));
    };
    let strings: Vec<String> = items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect();
    if strings.is_empty() {
        return Err(FolioError::MalformedLlmResponse(
            "array contained no usable strings".to_string(),
        ));
    }
    Ok(strings)
}

fn strip_code_fences(text: &str) -> String {
    let mut result = text.to_string();
    if result.starts_with("```")
        && let Some(newline) = result.find('\n')
    {
        result = result[newline + 1..].to_string();
    }
    if result.trim_end().ends_with("```") {
        let trimmed = result.trim_end().trim_end_matches("```").trim_end();
        result = trimmed.to_string();
    }
    result.trim().to_string()
}

/// First balanced `open..close` substring, honouring JSON string escapes.
fn balanced_substring(text: &str, open: char) -> Option<&str> {
    let close = match open {
        '[' => ']',
        '{' => '}',
        _ => return None,
    };

    let start = text.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            c if c == open && !in_string => depth += 1,
            c if c == close && !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_array() {
        let bullets = extract_string_array(r#"["Built a thing", "Shipped it"]"#).unwrap();
        assert_eq!(bullets.len(), 2);
    }

    #[test]
    fn test_fenced_array() {
        let raw = "```json\n[\"Built a thing\"]\n```";
        let bullets = extract_string_array(raw).unwrap();
        assert_eq!(bullets, vec!["Built a thing"]);
    }

    #[test]
    fn test_array_embedded_in_prose() {
        let raw = "Sure! Here are your bullets:\n[\"First [nested] bullet\", \"Second\"]\nHope that helps!";
        let bullets = extract_string_array(raw).unwrap();
        assert_eq!(bullets.len(), 2);
        assert!(bullets[0].contains("[nested]"));
    }

    #[test]
    fn test_brackets_inside_strings_do_not_confuse() {
        let raw = r#"prefix ["a ] tricky one", "b"] suffix"#;
        let bullets = extract_string_array(raw).unwrap();
        assert_eq!(bullets.len(), 2);
    }

    #[test]
    fn test_object_extraction() {
        let raw = "Result: {\"tools\": [\"Docker\"]} done";
        let value = extract_json_value(raw).unwrap();
        assert_eq!(value["tools"][0], "Docker");
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = extract_string_array("no json here at all").unwrap_err();
        assert!(matches!(err, FolioError::MalformedLlmResponse(_)));
    }

    #[test]
    fn test_non_array_is_malformed() {
        let err = extract_string_array("{\"not\": \"an array\"}").unwrap_err();
        assert!(matches!(err, FolioError::MalformedLlmResponse(_)));
    }

    #[test]
    fn test_empty_array_is_malformed() {
        let err = extract_string_array("[]").unwrap_err();
        assert!(matches!(err, FolioError::MalformedLlmResponse(_)));
    }
}
