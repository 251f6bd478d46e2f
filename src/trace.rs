//! Chrome trace-event output, for profiling where a build spends its time.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Mutex;
use std::time::Instant;

struct Trace {
    start: Instant,
    w: BufWriter<File>,
}

impl Trace {
    fn new(path: &str) -> std::io::Result<Self> {
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(w, "[")?;
        Ok(Trace {
            start: Instant::now(),
            w,
        })
    }

    fn write_complete(&mut self, name: &str, start: Instant, end: Instant) -> std::io::Result<()> {
        writeln!(
            self.w,
            "{{ \"pid\": 0, \"name\": {:?}, \"ts\": {}, \"ph\": \"X\", \"dur\": {} }},",
            name,
            start.duration_since(self.start).as_micros(),
            end.duration_since(start).as_micros(),
        )
    }

    fn close(&mut self) -> std::io::Result<()> {
        let start = self.start;
        self.write_complete("main", start, Instant::now())?;
        writeln!(self.w, "]")?;
        self.w.flush()
    }
}

static TRACE: Mutex<Option<Trace>> = Mutex::new(None);

pub fn open(path: &str) -> std::io::Result<()> {
    let trace = Trace::new(path)?;
    *TRACE.lock().unwrap() = Some(trace);
    Ok(())
}

/// Time `f`, attributing the span to `name` when tracing is enabled.
pub fn scope<T>(name: &'static str, f: impl FnOnce() -> T) -> T {
    if TRACE.lock().unwrap().is_none() {
        return f();
    }
    let start = Instant::now();
    let result = f();
    let end = Instant::now();
    if let Some(trace) = TRACE.lock().unwrap().as_mut() {
        let _ = trace.write_complete(name, start, end);
    }
    result
}

pub fn close() -> std::io::Result<()> {
    if let Some(trace) = TRACE.lock().unwrap().as_mut() {
        return trace.close();
    }
    Ok(())
}
