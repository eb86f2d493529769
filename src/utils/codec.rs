use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::Path;

/// Drops a `data:<mime>;base64,` header. Anything up to the first comma is
/// treated as the header.
pub fn strip_data_url(payload: &str) -> &str {
    match payload.split_once(',') {
        Some((_, data)) => data,
        None => payload,
    }
}

/// Decodes a base64 payload, with or without a data-URL header.
pub fn decode_base64(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let data = strip_data_url(payload);
    if data.bytes().any(|b| b.is_ascii_whitespace()) {
        let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        STANDARD.decode(compact)
    } else {
        STANDARD.decode(data)
    }
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Builds a data URL, labelling it with the sniffed MIME type.
pub fn to_data_url(bytes: &[u8]) -> String {
    let mime = infer::get(bytes)
        .map(|k| k.mime_type())
        .filter(|m| m.starts_with("image/"))
        .unwrap_or("image/jpeg");
    format!("data:{};base64,{}", mime, encode_base64(bytes))
}

/// Reads an image file and returns it as a data URL.
pub async fn image_to_data_url(path: &Path) -> std::io::Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(to_data_url(&bytes))
}
