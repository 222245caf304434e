use anyhow::Result;
use tokio::io::{
    self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout,
};

/// Line oriented terminal used by the interactive loops. Generic so tests can drive it with
/// in-memory buffers.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl Console<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: AsyncBufRead + Unpin, W: AsyncWrite + Unpin> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Prints `prompt` and reads one line without its line terminator. `None` on end of input.
    pub async fn prompt(&mut self, prompt: &str) -> Result<Option<String>> {
        self.write(prompt).await?;
        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    pub async fn write(&mut self, text: &str) -> Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.flush().await?;
        Ok(())
    }

    pub async fn println(&mut self, text: impl AsRef<str>) -> Result<()> {
        self.output.write_all(text.as_ref().as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await?;
        Ok(())
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

#[cfg(test)]
pub mod test_console {
    use super::Console;

    pub type TestConsole = Console<&'static [u8], Vec<u8>>;

    /// Console that reads `input` and collects everything written.
    pub fn scripted(input: &'static str) -> TestConsole {
        Console::new(input.as_bytes(), Vec::new())
    }

    pub fn output_of(console: TestConsole) -> String {
        String::from_utf8(console.into_output()).expect("Console output should be utf-8")
    }
}
