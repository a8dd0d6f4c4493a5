//! Debug console over a blocking byte-wide UART.

use bsp_common::error::{BspError, BspResult};
use std::fmt;
use std::io::Write as _;
use std::sync::{Arc, Mutex, PoisonError};

/// Console line ending.
pub const EOL: &str = "\r\n";

/// Blocking single-byte transmitter.
pub trait ByteSink: Send {
    /// Send one byte, waiting as long as needed.
    fn transmit_byte(&mut self, byte: u8) -> BspResult<()>;
}

/// Formatted text output over a [`ByteSink`].
///
/// Writes are byte-by-byte and blocking; concurrent writers must serialize
/// access themselves.
#[derive(Debug)]
pub struct DebugConsole<S: ByteSink> {
    sink: S,
    last_error: Option<BspError>,
}

impl<S: ByteSink> DebugConsole<S> {
    /// Wrap a sink.
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            last_error: None,
        }
    }

    /// Write formatted text followed by [`EOL`].
    pub fn writeln_crlf(&mut self, args: fmt::Arguments<'_>) -> BspResult<()> {
        let result = fmt::Write::write_fmt(self, args)
            .and_then(|()| fmt::Write::write_str(self, EOL));
        match result {
            Ok(()) => Ok(()),
            Err(fmt::Error) => Err(self
                .last_error
                .take()
                .unwrap_or_else(|| BspError::Io("formatting failed".into()))),
        }
    }

    /// The underlying sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S: ByteSink> fmt::Write for DebugConsole<S> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            if let Err(e) = self.sink.transmit_byte(byte) {
                self.last_error = Some(e);
                return Err(fmt::Error);
            }
        }
        Ok(())
    }
}

/// Simulated UART capturing transmitted bytes. Clones share the buffer.
#[derive(Debug, Clone, Default)]
pub struct SimulatedUart {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl SimulatedUart {
    /// Create an empty UART.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything transmitted so far.
    pub fn captured(&self) -> Vec<u8> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Transmitted bytes as text (lossy).
    pub fn captured_text(&self) -> String {
        String::from_utf8_lossy(&self.captured()).into_owned()
    }
}

impl ByteSink for SimulatedUart {
    fn transmit_byte(&mut self, byte: u8) -> BspResult<()> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(byte);
        Ok(())
    }
}

/// Sink writing to the host's standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl ByteSink for StdoutSink {
    fn transmit_byte(&mut self, byte: u8) -> BspResult<()> {
        let mut out = std::io::stdout().lock();
        out.write_all(&[byte])
            .and_then(|()| if byte == b'\n' { out.flush() } else { Ok(()) })
            .map_err(|e| BspError::Io(e.to_string()))
    }
}
