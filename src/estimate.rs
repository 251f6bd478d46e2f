//! Work estimates: an optional sidecar file mapping output paths to integer
//! weights, used to order the ready queue so heavy steps start first.

use std::collections::HashMap;

#[derive(Default)]
pub struct WorkEstimate {
    estimates: HashMap<String, u64>,
}

impl WorkEstimate {
    /// Load estimates from `path|integer` lines.  A missing file is the same
    /// as an empty one, and lines that don't parse are skipped; the build
    /// merely loses its priority signal.
    pub fn load(path: &str) -> WorkEstimate {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return WorkEstimate::default(),
        };
        WorkEstimate::parse(&content)
    }

    fn parse(content: &str) -> WorkEstimate {
        let mut estimates = HashMap::new();
        for line in content.lines() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            let Some((path, weight)) = line.split_once('|') else {
                continue;
            };
            if let Ok(weight) = weight.parse::<u64>() {
                estimates.insert(path.to_owned(), weight);
            }
        }
        WorkEstimate { estimates }
    }

    pub fn get(&self, path: &str) -> u64 {
        self.estimates.get(path).copied().unwrap_or(0)
    }
}
