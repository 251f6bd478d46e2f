//! Synthesises the argument vector for a build step from its tool kind,
//! the manifest definitions, and the step's inputs and output.

use crate::graph::{Graph, Step, Tool};
use crate::load::Definitions;
use crate::stat::{MTime, StatCache};

/// A response file to write just before the command is spawned: one link
/// input per line, referenced from argv as `@path`.
#[derive(Debug, PartialEq)]
pub struct RspFile {
    pub path: String,
    pub content: String,
}

/// Link lines with more inputs than this spill to a response file to stay
/// clear of command-line length limits.
const RSP_THRESHOLD: usize = 50;

/// Tokenise a definition value on ASCII spaces, discarding empty tokens.
fn split<'a>(defs: &'a Definitions, key: &str) -> impl Iterator<Item = String> + 'a {
    defs.get(key)
        .map(|value| value.as_str())
        .unwrap_or("")
        .split(' ')
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
}

pub struct CommandSynth<'a> {
    graph: &'a Graph,
    defs: &'a Definitions,
    stats: &'a StatCache,
    manifest_mtime: MTime,
}

impl<'a> CommandSynth<'a> {
    pub fn new(
        graph: &'a Graph,
        defs: &'a Definitions,
        stats: &'a StatCache,
        manifest_mtime: MTime,
    ) -> Self {
        CommandSynth {
            graph,
            defs,
            stats,
            manifest_mtime,
        }
    }

    /// Produce the argv for a step.  Only parsed inputs appear; opaque and
    /// depfile inputs never do.  Given identical inputs and definitions the
    /// result is identical.
    pub fn synthesize(&self, step: &Step) -> (Vec<String>, Option<RspFile>) {
        let out = self.graph.file(step.out).path.clone();
        let ins: Vec<String> = step
            .parsed_ins
            .iter()
            .map(|&id| self.graph.file(id).path.clone())
            .collect();

        match step.tool {
            Tool::Cc => (self.compile("cc", "cflags", ins, &out), None),
            Tool::Cxx => (self.compile("cxx", "cxxflags", ins, &out), None),
            Tool::Ld => self.link(ins, &out),
            Tool::Ar => {
                let mut argv = vec!["ar".to_owned(), "rcs".to_owned(), out];
                argv.extend(ins);
                (argv, None)
            }
            Tool::Sld => {
                let mut argv: Vec<String> = split(self.defs, "cxx").collect();
                argv.push("-shared".to_owned());
                argv.extend(ins);
                argv.push("-o".to_owned());
                argv.push(out);
                (argv, None)
            }
        }
    }

    fn compile(&self, tool_key: &str, flags_key: &str, ins: Vec<String>, out: &str) -> Vec<String> {
        let mut argv: Vec<String> = split(self.defs, tool_key).collect();
        argv.extend(split(self.defs, flags_key));
        argv.push("-MMD".to_owned());
        argv.push("-MF".to_owned());
        argv.push(format!("{}.d", out));
        argv.push("-c".to_owned());
        argv.extend(ins);
        argv.push("-o".to_owned());
        argv.push(out.to_owned());
        argv
    }

    fn link(&self, ins: Vec<String>, out: &str) -> (Vec<String>, Option<RspFile>) {
        let mut argv: Vec<String> = split(self.defs, "cxx").collect();
        let rsp_path = format!("{}.rsp", out);

        // A response file left by an earlier link is reused as long as the
        // manifest hasn't changed since it was written.
        let reuse = matches!(
            (self.stats.get_or_stat(&rsp_path), self.manifest_mtime),
            (MTime::Stamp(rsp), MTime::Stamp(manifest)) if rsp > manifest
        );

        let mut rspfile = None;
        if reuse {
            argv.push(format!("@{}", rsp_path));
        } else if ins.len() > RSP_THRESHOLD {
            let mut content = ins.join("\n");
            content.push('\n');
            argv.push(format!("@{}", rsp_path));
            rspfile = Some(RspFile {
                path: rsp_path,
                content,
            });
        } else {
            argv.extend(ins);
        }

        argv.push("-o".to_owned());
        argv.push(out.to_owned());
        argv.extend(split(self.defs, "ldflags"));
        argv.extend(split(self.defs, "ldlibs"));
        (argv, rspfile)
    }
}
