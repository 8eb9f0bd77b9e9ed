use once_cell::sync::Lazy;
use serde::Serialize;
use std::{
    fs, io,
    path::{Path, PathBuf},
};

pub const EVENTS_FILE: &str = "fortune_events.json";
pub const CONVERTED_FILE: &str = "fortune_events_converted.json";

static PROGRAM_DIR: Lazy<PathBuf> = Lazy::new(|| {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
});

/// Directory holding the running executable; output files default to living beside it.
pub fn program_dir() -> PathBuf {
    PROGRAM_DIR.clone()
}

pub fn default_events_path() -> PathBuf {
    program_dir().join(EVENTS_FILE)
}

pub fn default_converted_path() -> PathBuf {
    program_dir().join(CONVERTED_FILE)
}

pub fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Pretty-prints `value` to a sibling temp file and renames it over `path`,
/// so readers never observe a half-written file.
pub fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    ensure_parent(path)?;
    let contents = serde_json::to_string_pretty(value)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp);
    })
}
