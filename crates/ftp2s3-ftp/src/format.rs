//! Rendering of listings and timestamps for the wire.

use chrono::{DateTime, Duration, Utc};

use ftp2s3_core::DirEntry;

/// Entries older (or newer) than this relative to now show a year instead of a time.
const RECENT_WINDOW_DAYS: i64 = 180;

/// One `ls -l` style line for `LIST`, without the line terminator.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use ftp2s3_core::DirEntry;
/// use ftp2s3_ftp::format::list_line;
///
/// let dir = DirEntry::Directory { name: "photos".into() };
/// assert_eq!(
///     list_line(&dir, Utc::now()),
///     "drwxr-xr-x 1 ftp ftp             0 Jan 01  1970 photos"
/// );
/// ```
#[must_use]
pub fn list_line(entry: &DirEntry, now: DateTime<Utc>) -> String {
    let mode = if entry.is_dir() {
        "drwxr-xr-x"
    } else {
        "-rw-r--r--"
    };
    let modified = entry.last_modified();
    let age = now.signed_duration_since(modified);
    let stamp = if age.abs() < Duration::days(RECENT_WINDOW_DAYS) {
        modified.format("%b %d %H:%M")
    } else {
        modified.format("%b %d  %Y")
    };

    format!(
        "{mode} 1 ftp ftp {size:>13} {stamp} {name}",
        size = entry.size(),
        name = entry.name()
    )
}

/// `MDTM` timestamp: `YYYYMMDDHHMMSS` in UTC.
#[must_use]
pub fn mdtm(time: DateTime<Utc>) -> String {
    time.format("%Y%m%d%H%M%S").to_string()
}

/// Quote a path for a `257` reply, doubling embedded quotes.
#[must_use]
pub fn quote_path(path: &str) -> String {
    format!("\"{}\"", path.replace('"', "\"\""))
}
