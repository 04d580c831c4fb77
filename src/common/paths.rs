use std::path::PathBuf;
use directories::ProjectDirs;

pub fn system_config_file() -> PathBuf {
    PathBuf::from("/etc/deepguard/deepguard.toml")
}

/// Per-user data directory, falling back to the working directory when the
/// platform exposes no home directory.
pub fn user_data_dir() -> PathBuf {
    ProjectDirs::from("com", "deepguard", "DeepGuard")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".deepguard"))
}

pub fn user_identity_file() -> PathBuf {
    user_data_dir().join("identity.json")
}

pub fn user_feedback_dir() -> PathBuf {
    user_data_dir().join("feedback")
}
