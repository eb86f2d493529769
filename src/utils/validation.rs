use crate::config::FACE_SELECTOR_MODES;
use std::path::Path;
use validator::ValidationError;

/// Checks that the bytes are an image: the magic number must sniff as
/// `image/*` and the `image` crate must be able to read the header.
pub fn is_image_bytes(bytes: &[u8]) -> bool {
    if !infer::is_image(bytes) {
        return false;
    }

    image::io::Reader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.into_dimensions().ok())
        .is_some_and(|(w, h)| w > 0 && h > 0)
}

/// Checks a file on disk with [`is_image_bytes`].
pub async fn is_image_file(path: &Path) -> bool {
    match tokio::fs::read(path).await {
        Ok(bytes) => is_image_bytes(&bytes),
        Err(e) => {
            tracing::warn!("Could not read {} for image check: {}", path.display(), e);
            false
        }
    }
}

/// Custom validator for `face_selector_mode`
pub fn validate_selector_mode(mode: &str) -> Result<(), ValidationError> {
    if FACE_SELECTOR_MODES.contains(&mode) {
        return Ok(());
    }

    let mut err = ValidationError::new("invalid_selector_mode");
    err.message = Some(
        format!(
            "Unsupported face_selector_mode '{}'. Expected one of: {}",
            mode,
            FACE_SELECTOR_MODES.join(", ")
        )
        .into(),
    );
    Err(err)
}
