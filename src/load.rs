//! Loads the manifest (and any `.d` files from prior builds) into a Graph.

use crate::graph::Graph;
use crate::parse::{Parser, Statement};
use crate::smallmap::SmallMap;
use crate::stat::{self, MTime};
use crate::{depfile, graph};
use anyhow::anyhow;
use std::io::ErrorKind;

/// Variable definitions consumed by command synthesis.
pub type Definitions = SmallMap<String, String>;

/// The result of loading a manifest.
#[derive(Debug)]
pub struct State {
    pub graph: Graph,
    pub defs: Definitions,
    pub manifest_mtime: MTime,
}

/// Read `manifest_path` and build the graph it describes.  For compile
/// steps, inputs recorded in a prior build's `.d` file are folded in as
/// depfile inputs; a first build has no `.d` files yet, which is expected.
pub fn read(manifest_path: &str) -> anyhow::Result<State> {
    let content = std::fs::read_to_string(manifest_path)
        .map_err(|err| anyhow!("read {}: {}", manifest_path, err))?;

    let mut parser = Parser::new(manifest_path, &content);
    let mut graph = Graph::new();
    let mut defs = Definitions::new();

    while let Some(statement) = parser.read()? {
        match statement {
            Statement::Def { key, value } => {
                defs.insert(key.to_owned(), value.to_owned());
            }
            Statement::Step {
                tool,
                inputs,
                output,
            } => {
                let mut parsed = Vec::new();
                let mut opaque = Vec::new();
                for input in inputs {
                    if input.opaque {
                        opaque.push(input.path.to_owned());
                    } else {
                        parsed.push(input.path.to_owned());
                    }
                }
                let step = graph.add_step(tool, &parsed, &opaque, output)?;
                if tool.is_compile() {
                    read_discovered_deps(&mut graph, step, output)?;
                }
            }
        }
    }

    Ok(State {
        graph,
        defs,
        manifest_mtime: stat::stat(manifest_path),
    })
}

/// Ingest `output.d` if a prior build left one behind.
fn read_discovered_deps(
    graph: &mut Graph,
    step: graph::StepId,
    output: &str,
) -> anyhow::Result<()> {
    let path = format!("{}.d", output);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(anyhow!("read {}: {}", path, err)),
    };
    let parsed = depfile::parse(&content).map_err(|err| anyhow!("parse {}: {}", path, err))?;
    for (_, deps) in parsed.iter() {
        let deps: Vec<String> = deps.iter().map(|dep| dep.to_string()).collect();
        graph.add_discovered_deps(step, &deps);
    }
    Ok(())
}
