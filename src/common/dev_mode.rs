use std::path::PathBuf;
use std::fs;
use crate::common::error::Result;
use crate::common::paths;

#[derive(Debug, Clone)]
pub struct DevMode {
    enabled: bool,
    base_dir: PathBuf,
}

impl DevMode {
    pub fn new(enabled: bool) -> Result<Self> {
        Self::with_base_dir(enabled, PathBuf::from("./dev_data"))
    }

    pub fn with_base_dir(enabled: bool, base_dir: PathBuf) -> Result<Self> {
        // Create dev directories if in dev mode
        if enabled {
            fs::create_dir_all(&base_dir)?;
            fs::create_dir_all(base_dir.join("identity"))?;
            fs::create_dir_all(base_dir.join("feedback"))?;

            tracing::info!("Development mode enabled - data will be saved to: {}",
                     base_dir.display());
        }

        Ok(Self { enabled, base_dir })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn identity_file(&self) -> PathBuf {
        if self.enabled {
            self.base_dir.join("identity").join("identity.json")
        } else {
            paths::user_identity_file()
        }
    }

    pub fn feedback_dir(&self) -> PathBuf {
        if self.enabled {
            self.base_dir.join("feedback")
        } else {
            paths::user_feedback_dir()
        }
    }
}
