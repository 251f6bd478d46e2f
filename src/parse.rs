//! Parsing of the build manifest.
//!
//! The manifest is line-based UTF-8: `#` starts a comment, blank lines are
//! ignored, CRLF is tolerated.  `DEF|key|value` defines a variable whose
//! value runs to the end of the line (only the first two pipes delimit);
//! `tool|comma,separated,inputs|output` declares a step.

use crate::graph::Tool;
use anyhow::bail;

/// One input token of a step line.  A `!` prefix marks the input opaque:
/// it participates in rebuild decisions but never reaches the command line.
#[derive(Debug, PartialEq)]
pub struct Input<'a> {
    pub path: &'a str,
    pub opaque: bool,
}

#[derive(Debug, PartialEq)]
pub enum Statement<'a> {
    Def {
        key: &'a str,
        value: &'a str,
    },
    Step {
        tool: Tool,
        inputs: Vec<Input<'a>>,
        output: &'a str,
    },
}

pub struct Parser<'a> {
    filename: &'a str,
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
}

impl<'a> Parser<'a> {
    pub fn new(filename: &'a str, content: &'a str) -> Parser<'a> {
        Parser {
            filename,
            lines: content.lines().enumerate(),
        }
    }

    /// Read the next statement, or None at end of input.
    pub fn read(&mut self) -> anyhow::Result<Option<Statement<'a>>> {
        loop {
            let Some((idx, line)) = self.lines.next() else {
                return Ok(None);
            };
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            return self.parse_line(idx + 1, line).map(Some);
        }
    }

    fn parse_line(&self, lineno: usize, line: &'a str) -> anyhow::Result<Statement<'a>> {
        if let Some(rest) = line.strip_prefix("DEF|") {
            let Some((key, value)) = rest.split_once('|') else {
                bail!(
                    "{}:{}: malformed definition (missing second pipe): {}",
                    self.filename,
                    lineno,
                    line
                );
            };
            return Ok(Statement::Def { key, value });
        }

        let Some((tool_name, rest)) = line.split_once('|') else {
            bail!(
                "{}:{}: malformed step (missing first pipe): {}",
                self.filename,
                lineno,
                line
            );
        };
        let Some((inputs, output)) = rest.split_once('|') else {
            bail!(
                "{}:{}: malformed step (missing second pipe): {}",
                self.filename,
                lineno,
                line
            );
        };
        let Some(tool) = Tool::from_name(tool_name) else {
            bail!("{}:{}: unknown tool {:?}", self.filename, lineno, tool_name);
        };

        let inputs = inputs
            .split(',')
            .filter(|token| !token.is_empty())
            .map(|token| match token.strip_prefix('!') {
                Some(path) => Input { path, opaque: true },
                None => Input {
                    path: token,
                    opaque: false,
                },
            })
            .collect();

        Ok(Statement::Step {
            tool,
            inputs,
            output,
        })
    }
}
