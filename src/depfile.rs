//! Parsing of Makefile syntax as found in `.d` files emitted by C compilers.

use crate::smallmap::SmallMap;
use anyhow::bail;

struct Cursor<'a> {
    buf: &'a [u8],
    ofs: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<u8> {
        self.buf.get(self.ofs).copied()
    }

    fn next(&mut self) {
        self.ofs += 1;
    }

    /// If a backslash-newline (optionally CRLF) starts at `ofs`, return the
    /// offset just past it.
    fn continuation(&self, ofs: usize) -> Option<usize> {
        let mut ahead = ofs + 1;
        if self.buf.get(ahead) == Some(&b'\r') {
            ahead += 1;
        }
        if self.buf.get(ahead) == Some(&b'\n') {
            Some(ahead + 1)
        } else {
            None
        }
    }

    /// Skip spaces and backslashed newlines.
    fn skip_spaces(&mut self) -> anyhow::Result<()> {
        loop {
            match self.peek() {
                Some(b' ') => self.next(),
                Some(b'\\') => match self.continuation(self.ofs) {
                    Some(ofs) => self.ofs = ofs,
                    None => bail!("invalid backslash escape"),
                },
                _ => break,
            }
        }
        Ok(())
    }

    /// Read one path.  Backslash-newline ends a path; a backslash before
    /// anything else is part of it (Windows-style separators).  Note this
    /// means a `target:` token keeps its trailing colon.
    fn read_path(&mut self) -> anyhow::Result<Option<&'a str>> {
        self.skip_spaces()?;
        let start = self.ofs;
        loop {
            match self.peek() {
                None | Some(b' ') | Some(b'\n') | Some(b'\r') => break,
                Some(b'\\') => {
                    if self.continuation(self.ofs).is_some() {
                        break;
                    }
                    self.next();
                }
                Some(_) => self.next(),
            }
        }
        if self.ofs == start {
            return Ok(None);
        }
        Ok(Some(std::str::from_utf8(&self.buf[start..self.ofs])?))
    }
}

/// Parse a `.d` file into target -> dependency lists.
pub fn parse(content: &str) -> anyhow::Result<SmallMap<&str, Vec<&str>>> {
    let mut cursor = Cursor {
        buf: content.as_bytes(),
        ofs: 0,
    };
    let mut result = SmallMap::new();
    loop {
        while matches!(cursor.peek(), Some(b' ') | Some(b'\n') | Some(b'\r')) {
            cursor.next();
        }
        let Some(target) = cursor.read_path()? else {
            break;
        };
        cursor.skip_spaces()?;
        let target = match target.strip_suffix(':') {
            Some(target) => target,
            None => {
                if cursor.peek() != Some(b':') {
                    bail!("expected ':' after depfile target {:?}", target);
                }
                cursor.next();
                target
            }
        };
        let mut deps = Vec::new();
        while let Some(path) = cursor.read_path()? {
            deps.push(path);
        }
        result.insert(target, deps);
    }
    Ok(result)
}
