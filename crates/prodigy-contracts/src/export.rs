use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::session::SessionState;

pub const SOLUTION_FILE_NAME: &str = "math_solution.md";
pub const SOLUTION_MIME: &str = "text/markdown";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no solution to download yet; generate one first")]
    NothingToExport,
    #[error("failed writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Where the download lands: `target/math_solution.md` for a directory,
/// `target` itself otherwise.
pub fn solution_path(target: &Path) -> PathBuf {
    if target.is_dir() {
        target.join(SOLUTION_FILE_NAME)
    } else {
        target.to_path_buf()
    }
}

/// Writes the stored normalized solution verbatim.
pub fn export_solution(session: &SessionState, target: &Path) -> Result<PathBuf, ExportError> {
    let solution = session.solution().ok_or(ExportError::NothingToExport)?;
    let path = solution_path(target);
    let io_err = |source| ExportError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(&path, solution).map_err(io_err)?;
    Ok(path)
}
