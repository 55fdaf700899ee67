use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("unsupported image type for '{0}' (accepted: jpg, jpeg, png)")]
    UnsupportedType(String),
    #[error("uploaded image '{0}' is empty")]
    Empty(String),
    #[error("failed reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A screenshot handed over by the user. The bytes are never interpreted
/// here; the solver backend decides how to read them.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedImage {
    file_name: String,
    format: ImageFormat,
    bytes: Vec<u8>,
}

impl UploadedImage {
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, UploadError> {
        let file_name = file_name.into();
        let format = Path::new(&file_name)
            .extension()
            .and_then(|value| value.to_str())
            .and_then(ImageFormat::from_extension)
            .ok_or_else(|| UploadError::UnsupportedType(file_name.clone()))?;
        if bytes.is_empty() {
            return Err(UploadError::Empty(file_name));
        }
        Ok(Self {
            file_name,
            format,
            bytes,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, UploadError> {
        let file_name = path
            .file_name()
            .and_then(|value| value.to_str())
            .unwrap_or_default()
            .to_string();
        if ImageFormat::from_extension(
            path.extension()
                .and_then(|value| value.to_str())
                .unwrap_or_default(),
        )
        .is_none()
        {
            return Err(UploadError::UnsupportedType(path.display().to_string()));
        }
        let bytes = std::fs::read(path).map_err(|source| UploadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_bytes(file_name, bytes)
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Hex SHA-256 of the bytes; the reference used in logs.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }
}

impl std::fmt::Debug for UploadedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedImage")
            .field("file_name", &self.file_name)
            .field("format", &self.format)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_jpeg_and_png_case_insensitively() -> anyhow::Result<()> {
        let jpg = UploadedImage::from_bytes("Problem.JPG", vec![1, 2, 3])?;
        assert_eq!(jpg.format(), ImageFormat::Jpeg);
        let jpeg = UploadedImage::from_bytes("problem.jpeg", vec![1])?;
        assert_eq!(jpeg.format().mime(), "image/jpeg");
        let png = UploadedImage::from_bytes("problem.png", vec![1])?;
        assert_eq!(png.format().extension(), "png");
        Ok(())
    }

    #[test]
    fn rejects_other_types_and_empty_files() {
        assert!(matches!(
            UploadedImage::from_bytes("problem.gif", vec![1]),
            Err(UploadError::UnsupportedType(_))
        ));
        assert!(matches!(
            UploadedImage::from_bytes("problem", vec![1]),
            Err(UploadError::UnsupportedType(_))
        ));
        assert!(matches!(
            UploadedImage::from_bytes("problem.png", Vec::new()),
            Err(UploadError::Empty(_))
        ));
    }

    #[test]
    fn from_path_reads_bytes_and_file_name() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("algebra.png");
        std::fs::write(&path, b"not really a png")?;

        let image = UploadedImage::from_path(&path)?;
        assert_eq!(image.file_name(), "algebra.png");
        assert_eq!(image.bytes(), b"not really a png");
        assert_eq!(image.len(), 16);
        Ok(())
    }

    #[test]
    fn from_path_checks_type_before_reading() {
        let missing = Path::new("/definitely/missing/problem.bmp");
        assert!(matches!(
            UploadedImage::from_path(missing),
            Err(UploadError::UnsupportedType(_))
        ));
        let missing_png = Path::new("/definitely/missing/problem.png");
        assert!(matches!(
            UploadedImage::from_path(missing_png),
            Err(UploadError::Io { .. })
        ));
    }

    #[test]
    fn digest_is_stable_sha256_hex() -> anyhow::Result<()> {
        let image = UploadedImage::from_bytes("a.png", b"abc".to_vec())?;
        assert_eq!(
            image.digest(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        Ok(())
    }
}
