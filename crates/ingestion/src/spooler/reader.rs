//! Line reader resuming at a byte position

use std::io::SeekFrom;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};

/// One line read from a spool file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Byte position at which the line began
    pub offset: u64,
    /// Line content without delimiter (and without a trailing `\r`)
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct Chunk {
    pub lines: Vec<Line>,
    /// Position after the last consumed line
    pub next_offset: u64,
}

/// Read up to `max_lines` newline-delimited lines starting at `offset`
///
/// Each line consumes its length plus one delimiter byte, including a final
/// line with no trailing `\n`.
pub async fn read_lines(path: &Path, offset: u64, max_lines: usize) -> std::io::Result<Chunk> {
    let mut file = File::open(path).await?;
    file.seek(SeekFrom::Start(offset)).await?;
    let mut reader = BufReader::new(file);

    let mut chunk = Chunk {
        lines: Vec::new(),
        next_offset: offset,
    };
    let mut buf = Vec::new();

    while chunk.lines.len() < max_lines {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf).await?;
        if read == 0 {
            break;
        }

        let start = chunk.next_offset;
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        chunk.next_offset += buf.len() as u64 + 1;
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        chunk.lines.push(Line {
            offset: start,
            bytes: buf.clone(),
        });
    }

    Ok(chunk)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn lines_of(content: &[u8], offset: u64, max: usize) -> Chunk {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, content).unwrap();
        read_lines(&path, offset, max).await.unwrap()
    }

    #[tokio::test]
    async fn test_final_line_without_delimiter() {
        let chunk = lines_of(b"123\n456", 0, 10).await;
        let offsets: Vec<_> = chunk.lines.iter().map(|l| l.offset).collect();
        assert_eq!(offsets, vec![0, 4]);
        assert_eq!(chunk.lines[1].bytes, b"456");
        assert_eq!(chunk.next_offset, 8);
    }

    #[tokio::test]
    async fn test_stops_at_max_lines() {
        let chunk = lines_of(b"111112113\n114115116\n117118119", 0, 2).await;
        assert_eq!(chunk.lines.len(), 2);
        assert_eq!(chunk.lines[1].offset, 10);
        assert_eq!(chunk.next_offset, 20);

        let rest = lines_of(b"111112113\n114115116\n117118119", 20, 2).await;
        assert_eq!(rest.lines.len(), 1);
        assert_eq!(rest.lines[0].bytes, b"117118119");
    }

    #[tokio::test]
    async fn test_trailing_delimiter_without_empty_record() {
        let chunk = lines_of(b"a\nb\n", 0, 2).await;
        assert_eq!(chunk.lines.len(), 2);
        assert_eq!(chunk.next_offset, 4);
    }

    #[tokio::test]
    async fn test_crlf_stripped() {
        let chunk = lines_of(b"a\r\nb", 0, 5).await;
        assert_eq!(chunk.lines[0].bytes, b"a");
        assert_eq!(chunk.lines[1].offset, 3);
    }

    #[tokio::test]
    async fn test_offset_past_end() {
        let chunk = lines_of(b"123\n456", 8, 5).await;
        assert!(chunk.lines.is_empty());
        assert_eq!(chunk.next_offset, 8);
    }
}
