// ## Normalized I/O for the pipeline: sized input sources and output sinks

use std::fs::File;
use std::io::{self, Cursor, Read, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use crate::types::StreamError;

/// Canonical input abstraction. The total length must be known up front,
/// since the segment count is fixed before any worker starts.
pub enum InputSource {
    File(PathBuf),
    Memory(Vec<u8>),
    Reader { reader: Box<dyn Read + Send>, len: u64 },
}

/// Canonical output abstraction
pub enum OutputSink {
    /// Create-or-truncate the file at this path.
    File(PathBuf),
    Writer(Box<dyn Write + Send>),
    /// Capture the output in memory; returned in the pipeline report.
    Memory,
}

pub struct OpenedInput {
    pub reader: Box<dyn Read + Send>,
    pub len: u64,
}

pub struct OpenedOutput {
    pub writer: Box<dyn Write + Send>,
    /// Present for `OutputSink::Memory`.
    pub captured: Option<Arc<Mutex<Vec<u8>>>>,
    /// Present for `OutputSink::File`; used to remove partial output.
    pub path: Option<PathBuf>,
}

/// Normalize input source into a boxed reader plus its length
pub fn open_input(src: InputSource) -> Result<OpenedInput, StreamError> {
    let opened = match src {
        InputSource::File(p) => {
            let file = File::open(&p)?;
            let len = file.metadata()?.len();
            OpenedInput { reader: Box::new(file), len }
        }
        InputSource::Memory(b) => {
            let len = b.len() as u64;
            OpenedInput { reader: Box::new(Cursor::new(b)), len }
        }
        InputSource::Reader { reader, len } => OpenedInput { reader, len },
    };
    Ok(opened)
}

/// Normalize output sink into a boxed writer
pub fn open_output(sink: OutputSink) -> Result<OpenedOutput, StreamError> {
    match sink {
        OutputSink::File(p) => Ok(OpenedOutput {
            writer: Box::new(File::create(&p)?),
            captured: None,
            path: Some(p),
        }),
        OutputSink::Writer(w) => Ok(OpenedOutput { writer: w, captured: None, path: None }),
        OutputSink::Memory => {
            let buf = Arc::new(Mutex::new(Vec::new()));
            let writer = SharedBufferWriter { buf: buf.clone() };
            Ok(OpenedOutput { writer: Box::new(writer), captured: Some(buf), path: None })
        }
    }
}

/// `Write` adapter appending into a shared buffer the caller can read back.
pub struct SharedBufferWriter {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl SharedBufferWriter {
    pub fn new(buf: Arc<Mutex<Vec<u8>>>) -> Self {
        Self { buf }
    }
}

impl Write for SharedBufferWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .buf
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "shared output buffer poisoned"))?;
        guard.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Read up to `len` bytes, topping up short reads until `len` or EOF.
/// The returned buffer is shorter than `len` only at EOF.
pub fn read_exact_or_eof<R: Read + ?Sized>(r: &mut R, len: usize) -> io::Result<Bytes> {
    let mut buf = vec![0u8; len];
    let mut off = 0;

    while off < len {
        match r.read(&mut buf[off..]) {
            Ok(0) => break,
            Ok(n) => off += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    buf.truncate(off);
    Ok(Bytes::from(buf))
}
