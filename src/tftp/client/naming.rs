use std::path::{Path, PathBuf};

/// Picks the first free destination in `directory` for `base_name`.
///
/// The plain name is tried first, then `base_name(1).ext`, `base_name(2).ext`
/// and so on. `exists` decides what counts as taken, which keeps this free of
/// filesystem access.
pub fn next_available_name<F>(
    directory: &Path,
    base_name: &str,
    extension: Option<&str>,
    exists: F,
) -> PathBuf
where
    F: Fn(&Path) -> bool,
{
    let file_name = |suffix: Option<u64>| {
        let mut name = base_name.to_string();
        if let Some(n) = suffix {
            name.push_str(&format!("({})", n));
        }
        if let Some(ext) = extension {
            name.push('.');
            name.push_str(ext);
        }
        directory.join(name)
    };

    let plain = file_name(None);
    if !exists(&plain) {
        return plain;
    }

    let mut n = 1;
    loop {
        let candidate = file_name(Some(n));
        if !exists(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Local path a download of `remote_name` should be written to. Only the
/// final component of the remote name is used. Returns `None` when the remote
/// name has no usable final component.
pub fn download_destination(directory: &Path, remote_name: &str) -> Option<PathBuf> {
    let name = Path::new(remote_name).file_name()?;
    let name = Path::new(name);
    let stem = name.file_stem()?.to_str()?;
    let extension = name.extension().and_then(|e| e.to_str());

    Some(next_available_name(directory, stem, extension, |p| p.exists()))
}
