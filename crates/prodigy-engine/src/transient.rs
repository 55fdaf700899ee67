use std::io::{self, Write};
use std::path::Path;

use prodigy_contracts::upload::UploadedImage;
use tempfile::NamedTempFile;

/// The uploaded screenshot written to a temporary file for the model call.
///
/// The file is removed when the guard drops, on success and failure alike.
#[derive(Debug)]
pub struct TransientImage {
    file: NamedTempFile,
}

impl TransientImage {
    /// Writes `image` under `dir`, or the system temp directory when `None`.
    pub fn persist(image: &UploadedImage, dir: Option<&Path>) -> io::Result<Self> {
        let suffix = format!(".{}", image.format().extension());
        let mut builder = tempfile::Builder::new();
        builder.prefix("math-prodigy-").suffix(&suffix);
        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(image.bytes())?;
        file.flush()?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_holds_upload_bytes_until_dropped() -> anyhow::Result<()> {
        let image = UploadedImage::from_bytes("problem.jpeg", vec![0xFF, 0xD8, 0xFF, 0x00])?;
        let transient = TransientImage::persist(&image, None)?;
        let path = transient.path().to_path_buf();

        assert_eq!(std::fs::read(&path)?, image.bytes());
        assert_eq!(path.extension().and_then(|ext| ext.to_str()), Some("jpg"));

        drop(transient);
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn staging_dir_is_honoured() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let image = UploadedImage::from_bytes("problem.png", vec![1, 2, 3])?;
        let transient = TransientImage::persist(&image, Some(temp.path()))?;
        assert_eq!(transient.path().parent(), Some(temp.path()));

        let missing = temp.path().join("absent");
        assert!(TransientImage::persist(&image, Some(&missing)).is_err());
        Ok(())
    }
}
