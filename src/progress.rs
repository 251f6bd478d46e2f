//! Build progress reporting for the console.
//!
//! Workers print concurrently, so a single mutex serialises all writes:
//! progress and dry-run listings go to stdout, failures and captured tool
//! output to stderr.

use crate::graph::Tool;
use crate::process::{TaskResult, Termination};
use std::io::Write;
use std::sync::Mutex;

pub struct ConsoleProgress {
    /// Whether to print full command lines of started tools.
    verbose: bool,
    /// Whether stdout is a terminal that understands color escapes.
    color: bool,
    lock: Mutex<()>,
}

impl ConsoleProgress {
    pub fn new(verbose: bool, color: bool) -> Self {
        ConsoleProgress {
            verbose,
            color,
            lock: Mutex::new(()),
        }
    }

    pub fn task_started(&self, done: usize, total: usize, tool: Tool, output: &str, argv: &[String]) {
        let _guard = self.lock.lock().unwrap();
        if self.verbose {
            println!("{}", argv.join(" "));
        } else if self.color {
            println!("\x1b[32m[{}/{}]\x1b[0m {} {}", done + 1, total, tool.name(), output);
        } else {
            println!("[{}/{}] {} {}", done + 1, total, tool.name(), output);
        }
    }

    pub fn task_finished(&self, tool: Tool, output: &str, result: &TaskResult) {
        let _guard = self.lock.lock().unwrap();
        match result.termination {
            Termination::Success => {}
            Termination::Interrupted => eprintln!("interrupted: {} {}", tool.name(), output),
            Termination::Failure(code) => {
                eprintln!("failed (exit {}): {} {}", code, tool.name(), output)
            }
        }
        if !result.output.is_empty() {
            std::io::stderr().write_all(&result.output).unwrap();
        }
    }

    pub fn log(&self, msg: &str) {
        let _guard = self.lock.lock().unwrap();
        println!("{}", msg);
    }
}
