// THEORY:
// The `Recorder` writes the tracked trajectory as a small delimited text log. The
// format is line oriented: comma-separated fields, every logical line terminated
// by `;`. A header block (frame rate, date, author, a blank line, column names) is
// written exactly once when the log is created; after that each recorded sample
// appends one `<sequence>, <x>, <y>;` line.
//
// Sequence numbers start at 1 and restart at 1 whenever recording is toggled, in
// either direction. Between toggles they are gap-free and strictly increasing.
//
// The recorder is generic over `Write` so the session can log to a file in
// production and to an in-memory buffer under test.

use crate::core_modules::tracker::TargetPosition;
use crate::error::{Result, TrackerError};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Metadata written once at the top of every log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogHeader {
    pub frame_rate: u32,
    pub date: String,
    pub author: String,
}

impl LogHeader {
    /// Header stamped with today's local date.
    pub fn today(frame_rate: u32, author: &str) -> Self {
        Self {
            frame_rate,
            date: chrono::Local::now().format("%Y-%m-%d").to_string(),
            author: author.to_string(),
        }
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "FPS, {};", self.frame_rate)?;
        writeln!(writer, "Date, {};", self.date)?;
        writeln!(writer, "Author, {};", self.author)?;
        writeln!(writer)?;
        writeln!(writer, "Lp., X, Y;")
    }
}

pub struct Recorder<W: Write> {
    writer: W,
    next_sequence: u64,
}

impl Recorder<BufWriter<File>> {
    /// Creates (or truncates) the log file at `path` and writes the header.
    pub fn create(path: &Path, header: &LogHeader) -> Result<Self> {
        let log_create = |source| TrackerError::LogCreate {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(log_create)?;
        let mut writer = BufWriter::new(file);
        header.write_to(&mut writer).map_err(log_create)?;
        tracing::info!(path = %path.display(), "recording log created");
        Ok(Self {
            writer,
            next_sequence: 1,
        })
    }
}

impl<W: Write> Recorder<W> {
    /// Wraps an arbitrary writer and writes the header into it.
    pub fn new(mut writer: W, header: &LogHeader) -> Result<Self> {
        header.write_to(&mut writer)?;
        Ok(Self {
            writer,
            next_sequence: 1,
        })
    }

    /// Appends one sample and returns the sequence number it was written with.
    pub fn record(&mut self, position: TargetPosition) -> Result<u64> {
        let sequence = self.next_sequence;
        writeln!(self.writer, "{}, {}, {};", sequence, position.x, position.y)?;
        self.next_sequence += 1;
        Ok(sequence)
    }

    /// Numbering starts again from 1 with the next sample.
    pub fn restart_sequence(&mut self) {
        self.next_sequence = 1;
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Flushes and hands back the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> LogHeader {
        LogHeader {
            frame_rate: 20,
            date: "2026-10-17".to_string(),
            author: "bench".to_string(),
        }
    }

    fn text(recorder: Recorder<Vec<u8>>) -> String {
        String::from_utf8(recorder.finish().unwrap()).unwrap()
    }

    #[test]
    fn header_is_written_once_on_creation() {
        let recorder = Recorder::new(Vec::new(), &header()).unwrap();
        assert_eq!(
            text(recorder),
            "FPS, 20;\nDate, 2026-10-17;\nAuthor, bench;\n\nLp., X, Y;\n"
        );
    }

    #[test]
    fn samples_are_numbered_from_one() {
        let mut recorder = Recorder::new(Vec::new(), &header()).unwrap();
        assert_eq!(recorder.record(TargetPosition { x: 120, y: 120 }).unwrap(), 1);
        assert_eq!(recorder.record(TargetPosition { x: 121, y: 119 }).unwrap(), 2);

        let log = text(recorder);
        assert!(log.ends_with("Lp., X, Y;\n1, 120, 120;\n2, 121, 119;\n"));
    }

    #[test]
    fn restart_resets_numbering() {
        let mut recorder = Recorder::new(Vec::new(), &header()).unwrap();
        recorder.record(TargetPosition::default()).unwrap();
        recorder.record(TargetPosition::default()).unwrap();
        recorder.restart_sequence();

        assert_eq!(recorder.next_sequence(), 1);
        assert_eq!(recorder.record(TargetPosition { x: -3, y: 4 }).unwrap(), 1);
        assert!(text(recorder).ends_with("1, -3, 4;\n"));
    }

    #[test]
    fn today_header_uses_iso_date() {
        let header = LogHeader::today(20, "someone");
        assert_eq!(header.date.len(), 10);
        assert_eq!(header.date.as_bytes()[4], b'-');
        assert_eq!(header.date.as_bytes()[7], b'-');
    }

    #[test]
    fn create_fails_for_unwritable_path() {
        let path = Path::new("/definitely/not/a/dir/track.csv");
        let err = Recorder::create(path, &header()).err().unwrap();
        assert!(matches!(err, TrackerError::LogCreate { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn create_truncates_and_writes_header() {
        let path = std::env::temp_dir().join(format!("motion_reticle_{}.csv", std::process::id()));
        std::fs::write(&path, "stale contents that must disappear\n").unwrap();

        let mut recorder = Recorder::create(&path, &header()).unwrap();
        recorder.record(TargetPosition { x: 1, y: 2 }).unwrap();
        recorder.finish().unwrap();

        let log = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert!(log.starts_with("FPS, 20;\n"));
        assert!(log.ends_with("1, 1, 2;\n"));
        assert!(!log.contains("stale"));
    }
}
