//! Structured output extraction.
//!
//! Backends are instructed to answer with a JSON object, but models wrap
//! payloads in prose or fenced code blocks often enough that extraction
//! has to dig: try a ```json fence first, then scan brace pairs until one
//! of them deserializes into the expected shape.

use serde::de::DeserializeOwned;

/// Extract and deserialize a JSON payload from model output.
pub fn extract_payload<T: DeserializeOwned>(content: &str) -> Option<T> {
    if let Some(start) = content.find("```json") {
        if let Some(end) = content[start + 7..].find("```") {
            let json_str = content[start + 7..start + 7 + end].trim();
            if let Ok(value) = serde_json::from_str::<T>(json_str) {
                return Some(value);
            }
        }
    }

    // Try each '{' occurrence to find valid JSON. Handles prose before the
    // payload and multiple objects in one response.
    for (idx, _) in content.match_indices('{') {
        let substring = &content[idx..];
        let mut depth = 0;
        let mut end_idx = None;
        let mut in_string = false;
        let mut escaped = false;

        for (i, ch) in substring.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }

            match ch {
                '\\' if in_string => escaped = true,
                '"' => in_string = !in_string,
                '{' if !in_string => depth += 1,
                '}' if !in_string => {
                    depth -= 1;
                    if depth == 0 {
                        end_idx = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }

        if let Some(end) = end_idx {
            if let Ok(value) = serde_json::from_str::<T>(&substring[..=end]) {
                return Some(value);
            }
        }
    }

    None
}
