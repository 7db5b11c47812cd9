//! Host identification

/// Identifier of the running application, from the executable's file stem.
///
/// Lower-cased, so `Maya.exe` and `maya` both report `maya`.
pub fn current_host() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.file_stem().map(|stem| stem.to_string_lossy().to_lowercase()))
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
