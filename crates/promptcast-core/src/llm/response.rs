use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use super::{LlmResponse, WebSearchResult};

/// Extract text, citations, and usage counters from a raw backend payload.
///
/// Tolerant by design: output items with unrecognized types are skipped,
/// absent citation sub-fields become empty strings, and a payload without a
/// usage section yields an empty counter map. A payload with zero output
/// items parses to an empty response, never an error.
pub fn parse_response(payload: Value) -> LlmResponse {
    let model = payload
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let output: Vec<OutputItem> = payload
        .get("output")
        .cloned()
        .and_then(|items| serde_json::from_value(items).ok())
        .unwrap_or_default();

    let mut content = String::new();
    let mut web_search_results = Vec::new();

    for item in output {
        match item {
            OutputItem::Known(KnownItem::Message { content: blocks }) => {
                for block in blocks {
                    if let ContentBlock::Known(KnownBlock::OutputText { text }) = block {
                        content.push_str(&text);
                    }
                }
            }
            OutputItem::Known(KnownItem::WebSearchResult { results }) => {
                web_search_results.extend(results.into_iter().map(RawSearchResult::into_result));
            }
            // A `web_search_call` item only marks that a search ran; any
            // results arrive as separate items.
            OutputItem::Known(KnownItem::WebSearchCall) | OutputItem::Other(_) => {}
        }
    }

    let usage = payload.get("usage").map(usage_counters).unwrap_or_default();

    LlmResponse {
        content,
        model,
        web_search_results,
        usage,
        raw_response: payload,
    }
}

fn usage_counters(usage: &Value) -> HashMap<String, u64> {
    let mut counters = HashMap::new();
    for (counter, field) in [
        ("prompt_tokens", "input_tokens"),
        ("completion_tokens", "output_tokens"),
        ("total_tokens", "total_tokens"),
    ] {
        counters.insert(
            counter.to_string(),
            usage.get(field).and_then(Value::as_u64).unwrap_or(0),
        );
    }
    counters
}

/// Output items are a tagged union with an explicit ignore arm: anything that
/// does not decode as a known shape falls through to `Other` untouched.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OutputItem {
    Known(KnownItem),
    Other(Value),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum KnownItem {
    Message {
        #[serde(default)]
        content: Vec<ContentBlock>,
    },
    WebSearchCall,
    WebSearchResult {
        #[serde(default)]
        results: Vec<RawSearchResult>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentBlock {
    Known(KnownBlock),
    Other(Value),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum KnownBlock {
    OutputText {
        #[serde(default)]
        text: String,
    },
}

#[derive(Debug, Deserialize)]
struct RawSearchResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    snippet: String,
}

impl RawSearchResult {
    fn into_result(self) -> WebSearchResult {
        WebSearchResult {
            title: self.title,
            url: self.url,
            snippet: self.snippet,
        }
    }
}
