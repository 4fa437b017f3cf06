use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A source asset and the `.ico` file generated from it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IconEntry {
    /// Path to the source image, usually a Krita document.
    pub src: PathBuf,
    /// Path to the destination icon file.
    pub dst: PathBuf,
}

impl IconEntry {
    pub fn new(src: impl Into<PathBuf>, dst: impl Into<PathBuf>) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
        }
    }

    /// Returns a copy with relative `src` and `dst` joined onto `base`.
    pub fn resolve<P: AsRef<Path>>(&self, base: P) -> Self {
        let base = base.as_ref();
        Self {
            src: base.join(&self.src),
            dst: base.join(&self.dst),
        }
    }
}
