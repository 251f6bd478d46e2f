//! The build graph: file nodes, the steps that produce them, and the
//! producer->consumer edges between them.

use crate::densemap::{self, DenseMap};
use anyhow::bail;
use std::collections::HashMap;

/// Id for a File node in the Graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileId(u32);

impl densemap::Index for FileId {
    fn index(&self) -> usize {
        self.0 as usize
    }
}
impl From<usize> for FileId {
    fn from(u: usize) -> FileId {
        FileId(u as u32)
    }
}

/// Id for a Step in the Graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepId(u32);

impl densemap::Index for StepId {
    fn index(&self) -> usize {
        self.0 as usize
    }
}
impl From<usize> for StepId {
    fn from(u: usize) -> StepId {
        StepId(u as u32)
    }
}

/// The closed set of tools a step may invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Cc,
    Cxx,
    Ld,
    Ar,
    Sld,
}

impl Tool {
    /// Tool for a manifest token, or None when the token names no known tool.
    pub fn from_name(name: &str) -> Option<Tool> {
        match name {
            "cc" => Some(Tool::Cc),
            "cxx" => Some(Tool::Cxx),
            "ld" => Some(Tool::Ld),
            "ar" => Some(Tool::Ar),
            "sld" => Some(Tool::Sld),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Tool::Cc => "cc",
            Tool::Cxx => "cxx",
            Tool::Ld => "ld",
            Tool::Ar => "ar",
            Tool::Sld => "sld",
        }
    }

    /// Whether the tool is a compile step that emits a `.d` dependency file.
    pub fn is_compile(self) -> bool {
        matches!(self, Tool::Cc | Tool::Cxx)
    }
}

/// A file vertex in the graph.
#[derive(Debug)]
pub struct File {
    pub path: String,
    /// Output nodes of the steps that consume this file as an input.
    pub dependents: Vec<FileId>,
    /// The step that produces this file; source files have none.
    pub producer: Option<StepId>,
}

/// A declared build action: one tool invocation producing one output.
#[derive(Debug)]
pub struct Step {
    pub tool: Tool,
    /// Inputs that appear on the tool's command line.
    pub parsed_ins: Vec<FileId>,
    /// Inputs that trigger rebuilds but are never passed to the tool.
    pub opaque_ins: Vec<FileId>,
    /// Inputs discovered from a compiler-emitted `.d` file on a prior build.
    pub depfile_ins: Vec<FileId>,
    pub out: FileId,
}

#[derive(Default, Debug)]
pub struct Graph {
    pub files: DenseMap<FileId, File>,
    pub steps: DenseMap<StepId, Step>,
    by_path: HashMap<String, FileId>,
}

impl Graph {
    pub fn new() -> Graph {
        Graph::default()
    }

    /// Look up the id for a path, creating a fresh node if absent.
    /// Ids are stable for the life of the graph.
    pub fn file_id(&mut self, path: &str) -> FileId {
        match self.by_path.get(path) {
            Some(&id) => id,
            None => {
                let id = self.files.push(File {
                    path: path.to_owned(),
                    dependents: Vec::new(),
                    producer: None,
                });
                self.by_path.insert(path.to_owned(), id);
                id
            }
        }
    }

    pub fn lookup(&self, path: &str) -> Option<FileId> {
        self.by_path.get(path).copied()
    }

    pub fn file(&self, id: FileId) -> &File {
        self.files.get(id)
    }

    pub fn step(&self, id: StepId) -> &Step {
        self.steps.get(id)
    }

    /// Add a step producing `out` from the given inputs.  Fails when another
    /// step already produces `out`; in that case the step list is unchanged.
    pub fn add_step(
        &mut self,
        tool: Tool,
        parsed: &[String],
        opaque: &[String],
        out: &str,
    ) -> anyhow::Result<StepId> {
        let out_id = self.file_id(out);
        if self.files.get(out_id).producer.is_some() {
            bail!("duplicate producer for output: {}", out);
        }

        let step_id = self.steps.next_id();
        self.files.get_mut(out_id).producer = Some(step_id);

        let mut parsed_ins = Vec::with_capacity(parsed.len());
        for path in parsed {
            let id = self.file_id(path);
            self.files.get_mut(id).dependents.push(out_id);
            parsed_ins.push(id);
        }
        let mut opaque_ins = Vec::with_capacity(opaque.len());
        for path in opaque {
            let id = self.file_id(path);
            self.files.get_mut(id).dependents.push(out_id);
            opaque_ins.push(id);
        }

        Ok(self.steps.push(Step {
            tool,
            parsed_ins,
            opaque_ins,
            depfile_ins: Vec::new(),
            out: out_id,
        }))
    }

    /// Record inputs discovered from a prior build's `.d` file.  They gain
    /// edges like any other input but never appear on the command line.
    pub fn add_discovered_deps(&mut self, id: StepId, paths: &[String]) {
        let out_id = self.steps.get(id).out;
        for path in paths {
            let in_id = self.file_id(path);
            self.files.get_mut(in_id).dependents.push(out_id);
            self.steps.get_mut(id).depfile_ins.push(in_id);
        }
    }

    /// Depth-first post-order, reversed, so every file precedes its
    /// dependents.  Ties break in node insertion order.  Uses an explicit
    /// stack; deep graphs must not overflow the thread stack.
    pub fn topo_sort(&self) -> anyhow::Result<Vec<FileId>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Status {
            Unvisited,
            Working,
            Finished,
        }

        let mut status = DenseMap::new_sized(self.files.next_id(), Status::Unvisited);
        let mut order = Vec::with_capacity(self.files.len());
        // (node, index of the next out-edge to follow)
        let mut stack: Vec<(FileId, usize)> = Vec::new();

        for root in self.files.keys() {
            if *status.get(root) != Status::Unvisited {
                continue;
            }
            *status.get_mut(root) = Status::Working;
            stack.push((root, 0));
            while !stack.is_empty() {
                let (u, next) = {
                    let top = stack.last_mut().unwrap();
                    let copied = *top;
                    top.1 += 1;
                    copied
                };
                let edges = &self.file(u).dependents;
                if next < edges.len() {
                    let v = edges[next];
                    match *status.get(v) {
                        Status::Unvisited => {
                            *status.get_mut(v) = Status::Working;
                            stack.push((v, 0));
                        }
                        Status::Working => {
                            bail!("cycle detected in the build graph at: {}", self.file(v).path)
                        }
                        Status::Finished => {}
                    }
                } else {
                    *status.get_mut(u) = Status::Finished;
                    order.push(u);
                    stack.pop();
                }
            }
        }

        order.reverse();
        Ok(order)
    }
}
