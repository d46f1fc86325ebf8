//! Display-name policy for rewritten references.

use crate::config::{ImageDescMode, Settings};

/// File name the default screenshot capture produces; `RemoveDefault` mode
/// blanks exactly this name.
const DEFAULT_CAPTURE_NAME: &str = "image.png";

/// Derive the display name for a rewritten reference from the original file
/// name. Pure and deterministic; used by both the batch and single-document
/// rewrite paths.
pub fn display_name(original: &str, settings: &Settings) -> String {
    let suffix = settings.image_size_suffix.as_str();

    match settings.image_desc {
        ImageDescMode::None => String::new(),
        ImageDescMode::RemoveDefault if original == DEFAULT_CAPTURE_NAME => String::new(),
        ImageDescMode::Origin | ImageDescMode::RemoveDefault => format!("{original}{suffix}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(mode: ImageDescMode, suffix: &str) -> Settings {
        Settings {
            image_desc: mode,
            image_size_suffix: suffix.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_origin_appends_suffix() {
        let s = settings(ImageDescMode::Origin, "|300");
        assert_eq!(display_name("photo.png", &s), "photo.png|300");
    }

    #[test]
    fn test_none_blanks_name() {
        let s = settings(ImageDescMode::None, "|300");
        assert_eq!(display_name("photo.png", &s), "");
    }

    #[test]
    fn test_remove_default_blanks_only_default_capture() {
        let s = settings(ImageDescMode::RemoveDefault, "");
        assert_eq!(display_name("image.png", &s), "");
        assert_eq!(display_name("photo.png", &s), "photo.png");
    }

    #[test]
    fn test_deterministic() {
        let s = settings(ImageDescMode::Origin, "");
        assert_eq!(display_name("a.png", &s), display_name("a.png", &s));
    }
}
