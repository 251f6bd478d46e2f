//! Memoised file mtime lookups, shared across worker threads.

use std::io::ErrorKind;
use std::sync::RwLock;
use std::time::SystemTime;

/// MTime info gathered for a file.  This also models "file is absent" and
/// "stat failed"; callers treat both the same way, so the error kind is
/// carried but never propagated.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MTime {
    Missing,
    Stamp(SystemTime),
    Error(ErrorKind),
}

/// stat() an on-disk path, producing its MTime.
pub fn stat(path: &str) -> MTime {
    match std::fs::metadata(path).and_then(|meta| meta.modified()) {
        Ok(time) => MTime::Stamp(time),
        Err(err) if err.kind() == ErrorKind::NotFound => MTime::Missing,
        Err(err) => MTime::Error(err.kind()),
    }
}

struct Entry {
    path: String,
    mtime: MTime,
}

/// A per-execution cache of file mtimes: an ordered vector binary-searched
/// by path.  Reads take the shared lock; a miss upgrades to the exclusive
/// lock, re-checks, stats, and inserts in sort position.
#[derive(Default)]
pub struct StatCache {
    cache: RwLock<Vec<Entry>>,
}

impl StatCache {
    pub fn new() -> StatCache {
        StatCache::default()
    }

    pub fn get_or_stat(&self, path: &str) -> MTime {
        {
            let cache = self.cache.read().unwrap();
            if let Ok(pos) = cache.binary_search_by(|entry| entry.path.as_str().cmp(path)) {
                return cache[pos].mtime;
            }
        }

        let mut cache = self.cache.write().unwrap();
        // Another thread may have inserted while we waited for the lock.
        match cache.binary_search_by(|entry| entry.path.as_str().cmp(path)) {
            Ok(pos) => cache[pos].mtime,
            Err(pos) => {
                let mtime = stat(path);
                cache.insert(
                    pos,
                    Entry {
                        path: path.to_owned(),
                        mtime,
                    },
                );
                mtime
            }
        }
    }

    /// Whether `input` requires rebuilding an output stamped `output_time`.
    /// A missing or erroring input conservatively reports changed.  The
    /// comparison is >= so same-stamp modifications still trigger a rebuild.
    pub fn changed_since(&self, input: &str, output_time: SystemTime) -> bool {
        match self.get_or_stat(input) {
            MTime::Stamp(input_time) => input_time >= output_time,
            MTime::Missing | MTime::Error(_) => true,
        }
    }
}
