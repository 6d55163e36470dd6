//! Destination for committed selections
//!
//! The host application owns the note being edited. It receives plain text and
//! image references; cursor placement and buffer editing stay on its side.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;

/// Host document insertion API
pub trait NoteSink {
    /// Directory where extracted images are stored.
    fn attachment_dir(&self) -> PathBuf;

    fn insert_text(&mut self, text: &str) -> Result<()>;

    /// Insert the image at `path`, displayed at `width_px` x `height_px`.
    fn insert_image(&mut self, path: &Path, width_px: u32, height_px: u32) -> Result<()>;
}

/// Writes inserted payloads to a stream, one entry per line
pub struct WriterSink<W> {
    out: W,
    attachment_dir: PathBuf,
}

impl<W: Write> WriterSink<W> {
    pub fn new(out: W, attachment_dir: impl Into<PathBuf>) -> Self {
        Self {
            out,
            attachment_dir: attachment_dir.into(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> NoteSink for WriterSink<W> {
    fn attachment_dir(&self) -> PathBuf {
        self.attachment_dir.clone()
    }

    fn insert_text(&mut self, text: &str) -> Result<()> {
        // Image commits send a bare newline as separator
        if text == "\n" {
            return Ok(());
        }
        writeln!(self.out, "{text}")?;
        Ok(())
    }

    fn insert_image(&mut self, path: &Path, width_px: u32, height_px: u32) -> Result<()> {
        writeln!(self.out, "{{{{{}?width={width_px}&height={height_px}}}}}", path.display())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_sink_formats_entries() {
        let mut sink = WriterSink::new(Vec::new(), "/tmp/notes");
        sink.insert_text("Hello").unwrap();
        sink.insert_text("\n").unwrap();
        sink.insert_image(Path::new("/tmp/notes/a.png"), 10, 20)
            .unwrap();

        assert_eq!(sink.attachment_dir(), PathBuf::from("/tmp/notes"));
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "Hello\n{{/tmp/notes/a.png?width=10&height=20}}\n");
    }
}
