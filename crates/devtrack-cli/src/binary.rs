use std::path::PathBuf;

use anyhow::Result;

/// Locate the `devtrackd` binary to exec for a background start: prefer
/// a sibling of the running CLI, then a debug-build sibling under
/// `target/debug` when the CLI itself is a debug build, then fall back
/// to a bare `PATH` lookup (§4.3 Start, mirroring the teacher's
/// `find_ojd_binary`).
pub fn find_devtrackd_binary() -> Result<PathBuf> {
    let current_exe = std::env::current_exe().ok();

    if let Some(ref exe) = current_exe {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("devtrackd");
            if sibling.exists() {
                return Ok(sibling);
            }
        }
    }

    let is_debug_build = current_exe
        .as_ref()
        .and_then(|p| p.to_str())
        .map(|s| s.contains("target/debug"))
        .unwrap_or(false);

    if is_debug_build {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let dev_path = PathBuf::from(manifest_dir)
                .parent()
                .and_then(|p| p.parent())
                .map(|p| p.join("target/debug/devtrackd"));
            if let Some(path) = dev_path {
                if path.exists() {
                    return Ok(path);
                }
            }
        }
    }

    Ok(PathBuf::from("devtrackd"))
}
