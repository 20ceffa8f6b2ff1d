use std::{
    fmt::{self, Display},
    path::PathBuf,
};

use base64::{engine::general_purpose::STANDARD, Engine};
use potion::HtmlError;

pub const INVALID_IMAGE: &str = "Upload a valid image.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageError {
    NotADataUrl,
    InvalidBase64,
    NotAnImage,
}

impl Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::NotADataUrl => write!(f, "expected data:image/<type>;base64,<data>"),
            ImageError::InvalidBase64 => write!(f, "image data is not valid base64"),
            ImageError::NotAnImage => write!(f, "image data is not a supported image"),
        }
    }
}

impl std::error::Error for ImageError {}

/// Decodes `data:image/<type>;base64,<data>`. The extension comes from the content, not the header.
pub fn decode_data_url(data: &str) -> Result<DecodedImage, ImageError> {
    let (header, payload) = data
        .trim()
        .split_once(";base64,")
        .ok_or(ImageError::NotADataUrl)?;

    if !header.starts_with("data:image/") {
        return Err(ImageError::NotADataUrl);
    }

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|_e| ImageError::InvalidBase64)?;
    let extension = sniff_extension(&bytes).ok_or(ImageError::NotAnImage)?;

    Ok(DecodedImage { extension, bytes })
}

fn sniff_extension(bytes: &[u8]) -> Option<&'static str> {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"\x89PNG\r\n\x1a\n", "png"),
        (b"\xff\xd8\xff", "jpg"),
        (b"GIF87a", "gif"),
        (b"GIF89a", "gif"),
        (b"BM", "bmp"),
    ];

    if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("webp");
    }

    SIGNATURES
        .iter()
        .find(|(signature, _)| bytes.starts_with(signature))
        .map(|(_, extension)| *extension)
}

/// Stored uploads: relative paths in the database, files under `root`, served below `/media/`.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    base_url: String,
}

impl MediaStore {
    pub fn new(root: PathBuf, base_url: &str) -> Self {
        Self {
            root,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/media/{}", self.base_url, path)
    }

    pub async fn save(&self, folder: &str, image: &DecodedImage) -> Result<String, potion::Error> {
        let name = format!("{}.{}", uuid::Uuid::new_v4(), image.extension);
        let directory = self.root.join(folder);

        tokio::fs::create_dir_all(&directory).await.map_err(|e| {
            log::error!("Failed to create {}: {e}", directory.display());
            HtmlError::InternalServerError.new("Failed to store image")
        })?;
        tokio::fs::write(directory.join(&name), &image.bytes)
            .await
            .map_err(|e| {
                log::error!("Failed to write {name}: {e}");
                HtmlError::InternalServerError.new("Failed to store image")
            })?;

        Ok(format!("{folder}/{name}"))
    }

    /// Best effort; a file that can't be removed is only logged.
    pub async fn remove(&self, path: &str) {
        if path.split('/').any(|segment| segment == "..") {
            log::warn!("Refusing to remove {path}");
            return;
        }

        if let Err(e) = tokio::fs::remove_file(self.root.join(path)).await {
            log::warn!("Failed to remove media {path}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const PNG_PIXEL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

    #[test]
    fn decodes_png_data_url() {
        let Ok(image) = decode_data_url(PNG_PIXEL) else {
            panic!("png rejected");
        };

        assert_eq!(image.extension, "png");
        assert!(image.bytes.starts_with(b"\x89PNG"));
    }

    #[test]
    fn extension_follows_content() {
        let gif = format!("data:image/png;base64,{}", STANDARD.encode(b"GIF89a\x01\x00\x01\x00"));
        assert_eq!(decode_data_url(&gif).map(|i| i.extension), Ok("gif"));

        let webp = format!(
            "data:image/webp;base64,{}",
            STANDARD.encode(b"RIFF\x24\x00\x00\x00WEBPVP8 ")
        );
        assert_eq!(decode_data_url(&webp).map(|i| i.extension), Ok("webp"));
    }

    #[rstest]
    #[case("iVBORw0KGgo=", ImageError::NotADataUrl)]
    #[case("data:text/plain;base64,aGVsbG8=", ImageError::NotADataUrl)]
    #[case("data:image/png;base64,***", ImageError::InvalidBase64)]
    #[case("data:image/png;base64,aGVsbG8gd29ybGQ=", ImageError::NotAnImage)]
    fn rejects_bad_payloads(#[case] data: &str, #[case] expected: ImageError) {
        assert_eq!(decode_data_url(data), Err(expected));
    }

    #[tokio::test]
    async fn saves_under_folder_and_removes() {
        let root = std::env::temp_dir().join(format!("foodgram-media-{}", uuid::Uuid::new_v4()));
        let store = MediaStore::new(root.clone(), "http://localhost:8000/");
        let Ok(image) = decode_data_url(PNG_PIXEL) else {
            panic!("png rejected");
        };

        let Ok(path) = store.save("recipes", &image).await else {
            panic!("save failed");
        };
        assert!(path.starts_with("recipes/") && path.ends_with(".png"));
        assert!(root.join(&path).exists());
        assert_eq!(
            store.url(&path),
            format!("http://localhost:8000/media/{path}")
        );

        store.remove(&path).await;
        assert!(!root.join(&path).exists());

        let _ = std::fs::remove_dir_all(root);
    }
}
