//! Directory synthesis over prefix listings.
//!
//! S3 has no directories, only keys that happen to contain `/`. A listing of
//! directory `P` fetches every key under `prefix_for(P)` page by page, then
//! folds the flat keys into one entry per distinct first segment: a
//! [`DirEntry::Directory`] when the key continues past that segment, a
//! [`DirEntry::File`] when it does not.
//!
//! A listing is all-or-nothing. If any page fails, the accumulated keys are
//! dropped and the error is returned; a partial listing is never presented
//! as complete.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use ftp2s3_core::{DirEntry, DriverError, DriverResult};

use crate::store::{LIST_PAGE_SIZE, ObjectStore, ObjectSummary};

/// Lists synthetic directories on top of an [`ObjectStore`].
#[derive(Debug, Clone)]
pub struct DirectoryLister {
    store: Arc<dyn ObjectStore>,
    page_size: i32,
}

impl DirectoryLister {
    /// Create a lister that requests [`LIST_PAGE_SIZE`] keys per page.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            page_size: LIST_PAGE_SIZE,
        }
    }

    /// Override the page size (tests use small pages).
    #[must_use]
    pub fn with_page_size(mut self, page_size: i32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// List the directory whose listing prefix is `prefix`.
    pub async fn list(&self, prefix: &str) -> DriverResult<Vec<DirEntry>> {
        let objects = self.collect_all(prefix).await?;
        let entries = fold_entries(prefix, &objects);
        debug!(
            prefix,
            objects = objects.len(),
            entries = entries.len(),
            "listed directory"
        );
        Ok(entries)
    }

    /// Whether at least one key exists under `prefix`.
    pub async fn exists(&self, prefix: &str) -> DriverResult<bool> {
        let page = self.store.list_page(prefix, 1, None).await?;
        Ok(!page.objects.is_empty())
    }

    async fn collect_all(&self, prefix: &str) -> DriverResult<Vec<ObjectSummary>> {
        let mut objects: Vec<ObjectSummary> = Vec::new();
        let mut marker: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .store
                .list_page(prefix, self.page_size, marker.as_deref())
                .await
                .inspect_err(|e| {
                    warn!(
                        prefix,
                        pages,
                        accumulated = objects.len(),
                        error = %e,
                        "listing page failed, discarding partial result"
                    );
                })?;
            pages += 1;

            let truncated = page.is_truncated;
            let next_marker = page.next_marker;
            objects.extend(page.objects);

            if !truncated {
                break;
            }

            let next = next_marker.or_else(|| objects.last().map(|o| o.key.clone()));
            match next {
                Some(next) if marker.as_deref() != Some(next.as_str()) => marker = Some(next),
                _ => {
                    return Err(DriverError::IncompleteListing {
                        prefix: prefix.to_owned(),
                    });
                }
            }
        }

        Ok(objects)
    }
}

/// Fold flat keys into directory entries, in key order, one per first segment.
#[must_use]
pub fn fold_entries(prefix: &str, objects: &[ObjectSummary]) -> Vec<DirEntry> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut entries = Vec::new();

    for obj in objects {
        let Some(remainder) = obj.key.strip_prefix(prefix) else {
            continue;
        };

        match remainder.split_once('/') {
            Some((dir, _)) => {
                if !is_listable(dir) || !seen.insert(dir) {
                    continue;
                }
                entries.push(DirEntry::Directory {
                    name: dir.to_owned(),
                });
            }
            None => {
                if !is_listable(remainder) || !seen.insert(remainder) {
                    continue;
                }
                entries.push(DirEntry::File {
                    key: obj.key.clone(),
                    name: remainder.to_owned(),
                    size: obj.size,
                    last_modified: obj.last_modified,
                });
            }
        }
    }

    entries
}

/// Names that path resolution can reach. `.` and `..` would be normalized
/// away, so a key segment spelled that way is unaddressable.
fn is_listable(name: &str) -> bool {
    !matches!(name, "" | "." | "..")
}
