//! CLI argument parsing and top-level dispatch.

use crate::estimate::WorkEstimate;
use crate::process::ProcessRunner;
use crate::progress::ConsoleProgress;
use crate::{exec, load, terminal, trace, work};
use anyhow::anyhow;

#[derive(argh::FromArgs)] // this struct generates the flags and --help output
/// catalyst, a parallel incremental build engine
struct Opts {
    /// chdir before running
    #[argh(option, short = 'C')]
    chdir: Option<String>,

    /// input build manifest [default=catalyst.build]
    #[argh(option, short = 'f', default = "(\"catalyst.build\".into())")]
    manifest: String,

    /// work estimates file [default=catalyst.estimates]
    #[argh(option, short = 'e', default = "(\"catalyst.estimates\".into())")]
    estimates: String,

    /// parallelism [default uses system thread count]
    #[argh(option, short = 'j')]
    jobs: Option<usize>,

    /// print planned commands without executing them
    #[argh(switch)]
    dry_run: bool,

    /// remove build artifacts and exit
    #[argh(switch)]
    clean: bool,

    /// emit a JSON compilation database and exit
    #[argh(switch)]
    compdb: bool,

    /// emit a DOT graph of the build and exit
    #[argh(switch)]
    graph: bool,

    /// debugging tools
    #[argh(option, short = 'd')]
    debug: Option<String>,

    /// print executed command lines
    #[argh(switch, short = 'v')]
    verbose: bool,
}

fn default_parallelism() -> anyhow::Result<usize> {
    let par = std::thread::available_parallelism()?;
    Ok(usize::from(par))
}

fn run_impl() -> anyhow::Result<i32> {
    let opts: Opts = argh::from_env();

    if let Some(debug) = &opts.debug {
        match debug.as_str() {
            "list" => {
                println!("debug tools:");
                println!("  trace  generate json performance trace");
                return Ok(1);
            }
            "trace" => trace::open("trace.json")?,
            _ => anyhow::bail!("unknown -d {:?}, use -d list to list", debug),
        }
    }

    if let Some(dir) = &opts.chdir {
        std::env::set_current_dir(dir).map_err(|err| anyhow!("chdir {:?}: {}", dir, err))?;
    }

    let state = trace::scope("load", || load::read(&opts.manifest))?;
    let estimates = WorkEstimate::load(&opts.estimates);
    let executor = exec::Executor::new(state, estimates);

    if opts.compdb {
        executor.emit_compdb(&mut std::io::stdout().lock())?;
        return Ok(0);
    }
    if opts.graph {
        executor.emit_graph(&mut std::io::stdout().lock())?;
        return Ok(0);
    }
    if opts.clean {
        executor.clean();
        return Ok(0);
    }

    let options = work::Options {
        parallelism: match opts.jobs {
            Some(jobs) => jobs,
            None => default_parallelism()?,
        },
        dry_run: opts.dry_run,
    };
    let progress = ConsoleProgress::new(opts.verbose, terminal::use_fancy());
    let runner = ProcessRunner;

    let tasks = trace::scope("execute", || executor.execute(&runner, &progress, &options))?;
    match tasks {
        0 => println!("catalyst: no work to do"),
        n => println!(
            "catalyst: ran {} task{}, now up to date",
            n,
            if n == 1 { "" } else { "s" }
        ),
    }
    Ok(0)
}

pub fn run() -> anyhow::Result<i32> {
    let res = run_impl();
    let _ = trace::close();
    res
}
