//! Mapping of FTP session paths onto flat object keys.
//!
//! A working directory is stored in key form: no leading `/`, no trailing
//! `/`, and the empty string for the root. [`resolve`] joins a client path onto
//! it and normalizes `.`/`..` segments lexically, so resolved keys never
//! contain them. [`prefix_for`] turns a resolved path into the listing prefix.

/// Resolve `input` against `working_dir` into an object key.
///
/// Absolute inputs (leading `/`) ignore the working directory. `..` above the
/// root stays at the root, and empty segments are dropped.
///
/// # Examples
///
/// ```
/// use ftp2s3_core::path::resolve;
///
/// assert_eq!(resolve("", "/photos/2024"), "photos/2024");
/// assert_eq!(resolve("photos", "2024/jan.jpg"), "photos/2024/jan.jpg");
/// assert_eq!(resolve("photos/2024", ".."), "photos");
/// ```
#[must_use]
pub fn resolve(working_dir: &str, input: &str) -> String {
    let joined = if let Some(absolute) = input.strip_prefix('/') {
        absolute.to_owned()
    } else if working_dir.is_empty() || working_dir.ends_with('/') {
        format!("{working_dir}{input}")
    } else {
        format!("{working_dir}/{input}")
    };
    normalize(&joined)
}

/// Listing prefix for a resolved path.
///
/// Empty paths and paths already ending in `/` are used verbatim; anything
/// else gets a trailing `/` so that `a` does not match `ab/...`.
///
/// # Examples
///
/// ```
/// use ftp2s3_core::path::prefix_for;
///
/// assert_eq!(prefix_for(""), "");
/// assert_eq!(prefix_for("a"), "a/");
/// assert_eq!(prefix_for("a/"), "a/");
/// ```
#[must_use]
pub fn prefix_for(resolved: &str) -> String {
    let trimmed = resolved.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.ends_with('/') {
        trimmed.to_owned()
    } else {
        format!("{trimmed}/")
    }
}

/// Client-facing form of a key-form path (`""` becomes `/`).
#[must_use]
pub fn display(resolved: &str) -> String {
    format!("/{}", resolved.trim_matches('/'))
}

fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
