//! The executor facade: owns the loaded graph and definitions and exposes
//! the execute, clean, and emit entry points.

use crate::cmdline::CommandSynth;
use crate::densemap::Index;
use crate::estimate::WorkEstimate;
use crate::graph::Graph;
use crate::load::{Definitions, State};
use crate::process::Runner;
use crate::progress::ConsoleProgress;
use crate::stale::StalenessOracle;
use crate::stat::{MTime, StatCache};
use crate::work::{Options, Work};
use std::io::{ErrorKind, Write};

pub struct Executor {
    graph: Graph,
    defs: Definitions,
    manifest_mtime: MTime,
    estimates: WorkEstimate,
}

impl Executor {
    pub fn new(state: State, estimates: WorkEstimate) -> Executor {
        Executor {
            graph: state.graph,
            defs: state.defs,
            manifest_mtime: state.manifest_mtime,
            estimates,
        }
    }

    /// Bring every output up to date.  Returns the number of steps run.
    pub fn execute(
        &self,
        runner: &dyn Runner,
        progress: &ConsoleProgress,
        options: &Options,
    ) -> anyhow::Result<usize> {
        let stats = StatCache::new();
        let work = Work::new(
            &self.graph,
            &self.defs,
            &stats,
            &self.estimates,
            self.manifest_mtime,
            runner,
            progress,
            options,
        );
        work.run()
    }

    /// Remove each step's output and its `.d` sibling.  Per-path errors are
    /// reported but don't abort the sweep.
    pub fn clean(&self) {
        for (_, step) in self.graph.steps.iter() {
            let out = &self.graph.file(step.out).path;
            for path in [out.clone(), format!("{}.d", out)] {
                match std::fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(err) if err.kind() == ErrorKind::NotFound => {}
                    Err(err) => eprintln!("catalyst: clean {}: {}", path, err),
                }
            }
        }
    }

    /// Stream a DOT rendering of the graph: producers filled green when
    /// stale and white when up to date, source files light grey.
    pub fn emit_graph(&self, w: &mut dyn Write) -> anyhow::Result<()> {
        self.graph.topo_sort()?;

        let stats = StatCache::new();
        let oracle = StalenessOracle::new(&self.graph, &stats, self.manifest_mtime);

        writeln!(w, "digraph build {{")?;
        for (id, file) in self.graph.files.iter() {
            let fillcolor = match file.producer {
                Some(step) => {
                    if oracle.needs_rebuild(self.graph.step(step)) {
                        "green"
                    } else {
                        "white"
                    }
                }
                None => "lightgrey",
            };
            writeln!(
                w,
                "  n{} [label={:?} style=filled fillcolor={}];",
                id.index(),
                file.path,
                fillcolor
            )?;
        }
        for (_, step) in self.graph.steps.iter() {
            for &input in step
                .parsed_ins
                .iter()
                .chain(&step.depfile_ins)
                .chain(&step.opaque_ins)
            {
                writeln!(w, "  n{} -> n{};", input.index(), step.out.index())?;
            }
        }
        writeln!(w, "}}")?;
        Ok(())
    }

    /// Emit a JSON compilation database covering the compile steps, using
    /// the same argv synthesis as execution.
    pub fn emit_compdb(&self, w: &mut dyn Write) -> anyhow::Result<()> {
        self.graph.topo_sort()?;

        let stats = StatCache::new();
        let synth = CommandSynth::new(&self.graph, &self.defs, &stats, self.manifest_mtime);
        let directory = std::env::current_dir()?.display().to_string();

        writeln!(w, "[")?;
        let mut first = true;
        for (_, step) in self.graph.steps.iter() {
            if !step.tool.is_compile() {
                continue;
            }
            if !first {
                writeln!(w, ",")?;
            }
            first = false;

            let (argv, _) = synth.synthesize(step);
            let file = step
                .parsed_ins
                .first()
                .map(|&id| self.graph.file(id).path.as_str())
                .unwrap_or("");

            writeln!(w, "  {{")?;
            writeln!(w, "    \"directory\": {:?},", directory)?;
            write!(w, "    \"arguments\": [")?;
            for (i, arg) in argv.iter().enumerate() {
                if i > 0 {
                    write!(w, ", ")?;
                }
                write!(w, "{:?}", arg)?;
            }
            writeln!(w, "],")?;
            writeln!(w, "    \"file\": {:?},", file)?;
            writeln!(w, "    \"output\": {:?}", self.graph.file(step.out).path)?;
            write!(w, "  }}")?;
        }
        writeln!(w)?;
        writeln!(w, "]")?;
        Ok(())
    }
}
