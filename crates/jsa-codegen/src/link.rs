//! Object file linking via system `cc`.
//!
//! Links compiled object files with the jsa runtime library (`libjsa_rt.a`)
//! to produce native executables. Uses the system C compiler (`cc`) as the
//! linker driver, which handles platform-specific details (CRT objects, libc,
//! macOS vs Linux linker flags) automatically.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Link an object file with the jsa runtime to produce a native executable.
///
/// # Arguments
///
/// * `object_path` - Path to the compiled `.o` file
/// * `output_path` - Path for the output executable
/// * `rt_lib_path` - Optional path to `libjsa_rt.a`; if None, attempts to
///   locate it in the workspace target directory
///
/// # Errors
///
/// Returns an error string if the linker cannot be found or linking fails.
pub fn link(
    object_path: &Path,
    output_path: &Path,
    rt_lib_path: Option<&Path>,
) -> Result<(), String> {
    let rt_path = match rt_lib_path {
        Some(p) => p.to_path_buf(),
        None => find_jsa_rt()?,
    };

    if !rt_path.exists() {
        return Err(format!(
            "jsa runtime library not found at '{}'. Run `cargo build -p jsa-rt` first.",
            rt_path.display()
        ));
    }

    let rt_dir = rt_path
        .parent()
        .ok_or_else(|| "Cannot determine runtime library directory".to_string())?;

    let mut cmd = Command::new("cc");
    cmd.arg(object_path)
        .arg("-L")
        .arg(rt_dir)
        .arg("-ljsa_rt")
        .arg("-o")
        .arg(output_path);

    #[cfg(target_os = "macos")]
    {
        cmd.arg("-framework").arg("Security");
    }

    let output = cmd
        .output()
        .map_err(|e| format!("Failed to invoke linker (cc): {}", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("Linking failed:\n{}", stderr));
    }

    std::fs::remove_file(object_path).ok();

    Ok(())
}

/// Locate the jsa runtime static library (`libjsa_rt.a`).
///
/// Searches in the workspace target directory under both `debug` and
/// `release` profiles. Prefers the profile matching the compiler's own
/// build: a release `jsac` links the release runtime, a debug `jsac`
/// links the debug runtime, so a stale cross-profile archive is never
/// picked up ahead of a freshly rebuilt one.
fn find_jsa_rt() -> Result<PathBuf, String> {
    let candidates = [find_workspace_target_dir()];

    let profiles: &[&str] = if cfg!(debug_assertions) {
        &["debug", "release"]
    } else {
        &["release", "debug"]
    };

    for candidate in candidates.iter().flatten() {
        for profile in profiles {
            let path = candidate.join(profile).join("libjsa_rt.a");
            if path.exists() {
                return Ok(path);
            }
        }
    }

    Err("Could not locate libjsa_rt.a. Ensure `cargo build -p jsa-rt` has been run.".to_string())
}

/// Attempt to find the workspace target directory.
///
/// Uses the `CARGO_TARGET_DIR` env var if set, otherwise walks up from the
/// current executable to find a `target/` directory.
fn find_workspace_target_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("CARGO_TARGET_DIR") {
        return Some(PathBuf::from(dir));
    }

    if let Ok(exe) = std::env::current_exe() {
        let mut dir = exe.parent().map(|p| p.to_path_buf());
        while let Some(d) = dir {
            if d.file_name().map_or(false, |n| n == "target") {
                return Some(d);
            }
            let target_dir = d.join("target");
            if target_dir.exists() {
                return Some(target_dir);
            }
            dir = d.parent().map(|p| p.to_path_buf());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_workspace_target_dir() {
        let result = find_workspace_target_dir();
        assert!(
            result.is_some(),
            "Should find workspace target dir during cargo test"
        );
    }
}
