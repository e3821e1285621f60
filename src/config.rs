use std::path::{Path, PathBuf};

/// Name of the environment variable that overrides the default artifact
/// directory, mirroring the teacher's `DB_URL`-style lookup.
pub const OUTPUT_DIR_ENV: &str = "COVERGRAD_OUTPUT_DIR";

const DEFAULT_OUTPUT_DIR: &str = "output";

/// Where the compiler pass's `instrumentation_meta.txt` and `edges.txt`
/// live. One source variant left the path as a literal `"to do (by
/// configs)"`; this is that config, finally written.
#[derive(Debug, Clone)]
pub struct Config {
    dir: PathBuf,
}

impl Config {
    /// `dir` wins over everything else, including the environment.
    #[must_use]
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Reads `COVERGRAD_OUTPUT_DIR` if set, otherwise falls back to `output/`.
    #[must_use]
    pub fn from_env() -> Self {
        match std::env::var_os(OUTPUT_DIR_ENV) {
            Some(dir) => Self::with_dir(dir),
            None => Self::default(),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn meta_path(&self) -> PathBuf {
        self.dir.join("instrumentation_meta.txt")
    }

    #[must_use]
    pub fn edges_path(&self) -> PathBuf {
        self.dir.join("edges.txt")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::with_dir(DEFAULT_OUTPUT_DIR)
    }
}
