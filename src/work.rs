//! The parallel scheduler: multiplexes worker threads over a shared
//! priority-ordered ready set under a Kahn-style in-degree protocol.

use crate::cmdline::{CommandSynth, RspFile};
use crate::densemap::DenseMap;
use crate::estimate::WorkEstimate;
use crate::graph::{FileId, Graph};
use crate::load::Definitions;
use crate::process::{Runner, Termination};
use crate::progress::ConsoleProgress;
use crate::stale::StalenessOracle;
use crate::stat::{MTime, StatCache};
use anyhow::bail;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};

pub struct Options {
    pub parallelism: usize,
    /// Print planned commands instead of running them; bookkeeping proceeds
    /// as if each command succeeded.
    pub dry_run: bool,
}

/// A node whose predecessors have all completed, keyed for the max-heap:
/// heavier estimates pop first, ties are arbitrary.
#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct ReadyTask {
    weight: u64,
    id: FileId,
}

struct State {
    /// Remaining incoming-edge count per node; counts every occurrence of a
    /// duplicated edge, matching the per-occurrence decrements on completion.
    in_degree: DenseMap<FileId, usize>,
    ready: BinaryHeap<ReadyTask>,
    completed: usize,
    active: usize,
    error: bool,
    failures: Vec<String>,
    /// Steps whose command was actually issued (or listed, in a dry run).
    ran: usize,
}

pub struct Work<'a> {
    graph: &'a Graph,
    oracle: StalenessOracle<'a>,
    synth: CommandSynth<'a>,
    estimates: &'a WorkEstimate,
    runner: &'a dyn Runner,
    progress: &'a ConsoleProgress,
    options: &'a Options,
    total: usize,
    /// Completed producer nodes, mirrored outside the lock for progress.
    done_steps: AtomicUsize,
    state: Mutex<State>,
    cond: Condvar,
}

impl<'a> Work<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        graph: &'a Graph,
        defs: &'a Definitions,
        stats: &'a StatCache,
        estimates: &'a WorkEstimate,
        manifest_mtime: MTime,
        runner: &'a dyn Runner,
        progress: &'a ConsoleProgress,
        options: &'a Options,
    ) -> Self {
        Work {
            graph,
            oracle: StalenessOracle::new(graph, stats, manifest_mtime),
            synth: CommandSynth::new(graph, defs, stats, manifest_mtime),
            estimates,
            runner,
            progress,
            options,
            total: graph.files.len(),
            done_steps: AtomicUsize::new(0),
            state: Mutex::new(State {
                in_degree: DenseMap::new(),
                ready: BinaryHeap::new(),
                completed: 0,
                active: 0,
                error: false,
                failures: Vec::new(),
                ran: 0,
            }),
            cond: Condvar::new(),
        }
    }

    /// Drive every node in the graph to completion.  Returns the number of
    /// steps that ran.
    pub fn run(&self) -> anyhow::Result<usize> {
        self.seed();

        let workers = self.options.parallelism.max(1);
        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| self.worker());
            }
        });

        let state = self.state.lock().unwrap();
        if state.error {
            bail!("build failed: {}", state.failures.join("; "));
        }
        if state.completed != self.total {
            // No ready work, no active workers, unfinished nodes: the
            // remaining nodes hold each other in a cycle.
            let stuck = self
                .graph
                .files
                .iter()
                .find(|&(id, _)| *state.in_degree.get(id) > 0)
                .map(|(_, file)| file.path.clone())
                .unwrap_or_default();
            bail!("cycle detected in the build graph at: {}", stuck);
        }
        Ok(state.ran)
    }

    fn seed(&self) {
        let mut state = self.state.lock().unwrap();
        state.in_degree = DenseMap::new_sized(self.graph.files.next_id(), 0);
        for (_, file) in self.graph.files.iter() {
            for &out in &file.dependents {
                *state.in_degree.get_mut(out) += 1;
            }
        }
        for id in self.graph.files.keys() {
            if *state.in_degree.get(id) == 0 {
                let weight = self.estimates.get(&self.graph.file(id).path);
                state.ready.push(ReadyTask { weight, id });
            }
        }
    }

    fn worker(&self) {
        let mut state = self.state.lock().unwrap();
        loop {
            let id = loop {
                if state.completed >= self.total {
                    return;
                }
                if let Some(task) = state.ready.pop() {
                    break task.id;
                }
                if state.active == 0 {
                    // Stall: unfinished nodes but nothing can make progress.
                    return;
                }
                state = self.cond.wait(state).unwrap();
            };
            state.active += 1;
            drop(state);

            let result = self.advance(id);

            state = self.state.lock().unwrap();
            state.active -= 1;
            match result {
                Err(err) => {
                    state.error = true;
                    state.failures.push(err.to_string());
                    // Poison the wait predicate so every worker exits at its
                    // next wakeup.
                    state.completed = self.total;
                    self.cond.notify_all();
                }
                Ok(_) if state.error => {
                    // The build already failed; this result is ignored.
                    self.cond.notify_all();
                }
                Ok(ran) => {
                    if ran {
                        state.ran += 1;
                    }
                    if self.graph.file(id).producer.is_some() {
                        self.done_steps.fetch_add(1, Ordering::Relaxed);
                    }
                    state.completed += 1;

                    let mut new_ready = 0;
                    for &out in &self.graph.file(id).dependents {
                        let degree = state.in_degree.get_mut(out);
                        *degree -= 1;
                        if *degree == 0 {
                            let weight = self.estimates.get(&self.graph.file(out).path);
                            state.ready.push(ReadyTask { weight, id: out });
                            new_ready += 1;
                        }
                    }

                    let finished = state.completed == self.total;
                    let stalled = !finished && state.active == 0 && state.ready.is_empty();
                    if finished || stalled || new_ready >= 10 {
                        self.cond.notify_all();
                    } else {
                        for _ in 0..new_ready {
                            self.cond.notify_one();
                        }
                    }
                }
            }
        }
    }

    /// Bring one node up to date: nothing for source leaves; for producer
    /// nodes, consult the staleness oracle and invoke the tool if needed.
    /// Returns whether a command ran (or was listed, in a dry run).
    fn advance(&self, id: FileId) -> anyhow::Result<bool> {
        let file = self.graph.file(id);
        let Some(step_id) = file.producer else {
            return Ok(false);
        };
        let step = self.graph.step(step_id);
        if !self.oracle.needs_rebuild(step) {
            return Ok(false);
        }

        let (argv, rspfile) = self.synth.synthesize(step);
        if self.options.dry_run {
            self.progress.log(&argv.join(" "));
            return Ok(true);
        }
        if let Some(rspfile) = &rspfile {
            write_rspfile(rspfile)?;
        }

        let done = self.done_steps.load(Ordering::Relaxed);
        self.progress
            .task_started(done, self.graph.steps.len(), step.tool, &file.path, &argv);
        let result = self.runner.run(&argv)?;
        self.progress.task_finished(step.tool, &file.path, &result);

        match result.termination {
            Termination::Success => Ok(true),
            Termination::Interrupted => {
                bail!("step interrupted: {} {}", step.tool.name(), file.path)
            }
            Termination::Failure(code) => bail!(
                "step failed: {} {} (exit {})",
                step.tool.name(),
                file.path,
                code
            ),
        }
    }
}

fn write_rspfile(rspfile: &RspFile) -> anyhow::Result<()> {
    let path = std::path::Path::new(&rspfile.path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &rspfile.content)?;
    Ok(())
}
