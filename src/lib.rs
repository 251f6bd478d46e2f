pub mod cmdline;
mod densemap;
pub mod depfile;
pub mod estimate;
pub mod exec;
pub mod graph;
pub mod load;
pub mod parse;
pub mod process;
pub mod progress;
pub mod run;
mod smallmap;
pub mod stale;
pub mod stat;
mod terminal;
pub mod trace;
pub mod work;

pub use smallmap::SmallMap;

#[cfg(not(windows))]
use jemallocator::Jemalloc;

#[cfg(not(windows))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;
