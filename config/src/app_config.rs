use directories::ProjectDirs;
use std::{
    env,
    path::PathBuf,
};

lazy_static::lazy_static! {
    pub(crate) static ref PROJECT_NAME: String = "SIRIDB_MONITOR".to_string();
    static ref CONFIG_FOLDER: Option<PathBuf> = env::var(format!("{}_CONFIG", PROJECT_NAME.clone()))
        .ok()
        .map(PathBuf::from);
}

/// Directory searched for `config.yaml`.
///
/// `SIRIDB_MONITOR_CONFIG` overrides the platform default.
pub fn get_config_dir() -> PathBuf {
    if let Some(s) = CONFIG_FOLDER.clone() {
        s
    } else if let Some(proj_dirs) = project_directory() {
        proj_dirs.config_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".config")
    }
}

fn project_directory() -> Option<ProjectDirs> {
    ProjectDirs::from("technology", "transceptor", "siridb-monitor")
}
