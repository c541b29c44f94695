//! Model discovery for the `/models` command.
//!
//! Ollama exposes its locally pulled models at `/api/tags`; the hosted Gemini
//! API is not probed, a short list of known chat models is offered instead.

use serde::Deserialize;

/// Chat-capable Gemini models offered by `/models`.
pub const GEMINI_MODELS: &[&str] = &["gemini-2.5-flash", "gemini-2.5-pro", "gemini-2.0-flash"];

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// Ask the Ollama server at `base_url` which models it has pulled.
///
/// Returns `Err(reason)` when the server is offline or answers with an
/// unexpected payload.
pub fn fetch_ollama_models(base_url: &str) -> Result<Vec<String>, String> {
    let url = format!("{}/api/tags", base_url.trim_end_matches('/'));
    let response = reqwest::blocking::get(&url)
        .map_err(|e| format!("Ollama unreachable at {}: {}", url, e))?;

    if !response.status().is_success() {
        return Err(format!("Ollama returned HTTP {}", response.status()));
    }

    let tags: TagsResponse = response
        .json()
        .map_err(|e| format!("Failed to parse Ollama response: {}", e))?;

    Ok(parse_names(tags))
}

fn parse_names(tags: TagsResponse) -> Vec<String> {
    tags.models.into_iter().map(|m| m.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_names_are_extracted_in_order() {
        let tags: TagsResponse = serde_json::from_str(
            r#"{"models":[{"name":"llama3:latest","size":1},{"name":"mistral"}]}"#,
        )
        .unwrap();
        assert_eq!(parse_names(tags), vec!["llama3:latest", "mistral"]);
    }

    #[test]
    fn unreachable_server_is_an_error() {
        assert!(fetch_ollama_models("http://127.0.0.1:9").is_err());
    }

    #[test]
    fn default_gemini_model_is_offered() {
        assert!(GEMINI_MODELS.contains(&"gemini-2.5-flash"));
    }
}
