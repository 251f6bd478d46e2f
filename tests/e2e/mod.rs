//! Support code for e2e tests, which run catalyst as a binary in a
//! temporary directory.

mod basic;
mod emit;

pub fn catalyst_binary() -> std::path::PathBuf {
    std::env::current_exe()
        .expect("test binary path")
        .parent()
        .expect("test binary directory")
        .parent()
        .expect("binary directory")
        .join("catalyst")
}

pub fn catalyst_command(args: Vec<&str>) -> std::process::Command {
    let mut cmd = std::process::Command::new(catalyst_binary());
    cmd.args(args);
    cmd
}

fn print_output(out: &std::process::Output) {
    // Gross: use print! instead of writing to stdout so Rust test
    // framework can capture it.
    print!("{}", String::from_utf8_lossy(&out.stdout));
    print!("{}", String::from_utf8_lossy(&out.stderr));
}

pub fn assert_output_contains(out: &std::process::Output, text: &str) {
    let stdout = std::str::from_utf8(&out.stdout).unwrap();
    if !stdout.contains(text) {
        panic!(
            "assertion failed; expected output to contain {:?} but got:\n{}",
            text, stdout
        );
    }
}

pub fn assert_output_not_contains(out: &std::process::Output, text: &str) {
    let stdout = std::str::from_utf8(&out.stdout).unwrap();
    if stdout.contains(text) {
        panic!(
            "assertion failed; expected output to not contain {:?} but got:\n{}",
            text, stdout
        );
    }
}

pub fn assert_stderr_contains(out: &std::process::Output, text: &str) {
    let stderr = std::str::from_utf8(&out.stderr).unwrap();
    if !stderr.contains(text) {
        panic!(
            "assertion failed; expected stderr to contain {:?} but got:\n{}",
            text, stderr
        );
    }
}

/// Manages a temporary directory for invoking catalyst.
pub struct TestSpace {
    dir: tempfile::TempDir,
}

impl TestSpace {
    pub fn new() -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        Ok(TestSpace { dir })
    }

    /// Write a file into the working space.
    pub fn write(&self, path: &str, content: &str) -> std::io::Result<()> {
        std::fs::write(self.dir.path().join(path), content)
    }

    /// Read a file from the working space.
    pub fn read(&self, path: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.dir.path().join(path))
    }

    /// Push a file's mtime into the past, so later writes clearly supersede
    /// it even on coarse-grained filesystems.
    pub fn sub_mtime(&self, path: &str, dur: std::time::Duration) -> std::io::Result<()> {
        let file = std::fs::File::options()
            .write(true)
            .open(self.dir.path().join(path))?;
        file.set_modified(std::time::SystemTime::now() - dur)
    }

    /// Write an executable helper script into the working space.
    #[cfg(unix)]
    pub fn write_tool(&self, name: &str, script: &str) -> std::io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        let path = self.dir.path().join(name);
        std::fs::write(&path, script)?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
    }

    /// Invoke catalyst, returning process output.
    pub fn run(&self, cmd: &mut std::process::Command) -> std::io::Result<std::process::Output> {
        cmd.current_dir(self.dir.path()).output()
    }

    /// Like run, but also print output if the build failed.
    pub fn run_expect(
        &self,
        cmd: &mut std::process::Command,
    ) -> anyhow::Result<std::process::Output> {
        let out = self.run(cmd)?;
        if !out.status.success() {
            print_output(&out);
            anyhow::bail!("build failed, status {}", out.status);
        }
        Ok(out)
    }
}

/// A stand-in compiler: touches whatever `-o` names and ignores the rest.
#[cfg(unix)]
pub const TOUCH_TOOL: &str = r#"#!/bin/sh
out=""
while [ "$#" -gt 0 ]; do
  if [ "$1" = "-o" ]; then shift; out="$1"; fi
  shift
done
: > "$out"
"#;

/// Like TOUCH_TOOL, but also emits a dependency file recording an extra
/// header, the way a real compiler's -MMD would.
#[cfg(unix)]
pub const DEPFILE_TOOL: &str = r#"#!/bin/sh
out=""
while [ "$#" -gt 0 ]; do
  if [ "$1" = "-o" ]; then shift; out="$1"; fi
  shift
done
: > "$out"
printf '%s: in.c hdr.h\n' "$out" > "$out.d"
"#;
