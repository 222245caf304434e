use std::io::SeekFrom;

use tokio::io::{self, AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

const BACKWARDS_CHUNK: usize = 1024;

/// Moves backwards in a file to the beginning of the previous line.
/// Stays at 0 when already at the start of the file.
pub async fn seek_line_backwards(
    file: &mut (impl AsyncSeek + AsyncRead + Unpin),
    buffer: &mut [u8],
) -> Result<(), io::Error> {
    // The newline right before the cursor terminates the line we want to land on, so it is
    // skipped. For example: previous\nwe_want_this\n<cursor>
    let mut need_to_skip = 1usize;
    loop {
        let leftover = file.stream_position().await?;
        if leftover == 0 {
            return Ok(());
        }
        let next_chunk = u64::min(leftover, buffer.len() as u64) as usize;
        file.seek(SeekFrom::Current(-(next_chunk as i64))).await?;

        file.read_exact(&mut buffer[..next_chunk]).await?;
        let newline = buffer[..next_chunk]
            .iter()
            .rev()
            .enumerate()
            .skip(need_to_skip)
            .find(|(_, value)| **value == b'\n');
        if let Some((index, _)) = newline {
            file.seek(SeekFrom::Current(-(index as i64))).await?;
            return Ok(());
        }

        need_to_skip = need_to_skip.saturating_sub(1);
        file.seek(SeekFrom::Current(-(next_chunk as i64))).await?;
    }
}

/// Reads up to `limit` non-blank lines from the end of the file, newest (last) first.
/// Only the tail of the file is touched, so this stays cheap for long logs.
pub async fn read_last_lines(
    file: &mut (impl AsyncSeek + AsyncRead + Unpin),
    limit: usize,
) -> Result<Vec<String>, io::Error> {
    let mut buffer = vec![0; BACKWARDS_CHUNK];
    let mut lines = Vec::new();
    let mut line_end = file.seek(SeekFrom::End(0)).await?;

    while lines.len() < limit && line_end > 0 {
        seek_line_backwards(file, &mut buffer).await?;
        let line_start = file.stream_position().await?;

        let mut raw = vec![0; (line_end - line_start) as usize];
        file.read_exact(&mut raw).await?;
        let line = String::from_utf8_lossy(&raw);
        let line = line.trim_end_matches(['\n', '\r']);
        if !line.trim().is_empty() {
            lines.push(line.to_string());
        }

        file.seek(SeekFrom::Start(line_start)).await?;
        line_end = line_start;
    }

    Ok(lines)
}
