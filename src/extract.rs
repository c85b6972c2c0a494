// Locating the generated image inside the generation response.
// The response shape is not guaranteed, so the documented path is tried
// first and a tree walk over the whole body covers everything else.

use serde_json::Value;

/// Find the image value in `response`: the documented
/// `output.choices[0].message.content[0].image` path, else the first
/// match of [`search_image_field`].
pub fn extract_image(response: &Value) -> Option<&str> {
    expected_image(response).or_else(|| search_image_field(response))
}

/// `output.choices[0].message.content[0].image`, if present and a
/// non-empty string.
pub fn expected_image(response: &Value) -> Option<&str> {
    response
        .get("output")?
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .get(0)?
        .get("image")?
        .as_str()
        .filter(|image| !image.is_empty())
}

/// Depth-first, pre-order search for the first string that is either the
/// value of an `image` key or itself starts with a data/HTTP scheme.
/// Object keys are visited in document order.
pub fn search_image_field(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) if looks_like_image_ref(s) => Some(s.as_str()),
        Value::Array(items) => items.iter().find_map(search_image_field),
        Value::Object(map) => map.iter().find_map(|(key, val)| match val {
            Value::String(s) if key == "image" && !s.is_empty() => Some(s.as_str()),
            _ => search_image_field(val),
        }),
        _ => None,
    }
}

fn looks_like_image_ref(s: &str) -> bool {
    s.starts_with("data:") || s.starts_with("http://") || s.starts_with("https://")
}
