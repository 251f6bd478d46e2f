//! Decides whether a step's output is out of date relative to its inputs
//! and the manifest.

use crate::graph::{Graph, Step};
use crate::stat::{MTime, StatCache};

pub struct StalenessOracle<'a> {
    graph: &'a Graph,
    stats: &'a StatCache,
    manifest_mtime: MTime,
}

impl<'a> StalenessOracle<'a> {
    pub fn new(graph: &'a Graph, stats: &'a StatCache, manifest_mtime: MTime) -> Self {
        StalenessOracle {
            graph,
            stats,
            manifest_mtime,
        }
    }

    /// True when the step's output must be regenerated: the output is
    /// missing, the manifest changed, or any input (depfile, opaque, or
    /// parsed) is at least as new as the output.
    pub fn needs_rebuild(&self, step: &Step) -> bool {
        let out = self.graph.file(step.out);
        let out_time = match self.stats.get_or_stat(&out.path) {
            MTime::Stamp(time) => time,
            MTime::Missing | MTime::Error(_) => return true,
        };

        // A manifest edit invalidates every output.
        match self.manifest_mtime {
            MTime::Stamp(time) => {
                if time >= out_time {
                    return true;
                }
            }
            MTime::Missing | MTime::Error(_) => return true,
        }

        for ins in [&step.depfile_ins, &step.opaque_ins, &step.parsed_ins] {
            for &id in ins.iter() {
                if self.stats.changed_since(&self.graph.file(id).path, out_time) {
                    return true;
                }
            }
        }
        false
    }
}
