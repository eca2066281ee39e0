//! IoReader - a stage that turns a byte source into payloads.
//!
//! Line mode emits one [`Payload::Text`] per `\n` separated line with the
//! line ending stripped; a line that is not valid UTF-8 is emitted as
//! [`Payload::Raw`] with its exact bytes. Block mode emits [`Payload::Binary`] chunks of
//! `buffer_size` bytes; only the last chunk of the stream may be shorter.
//! Optionally the source is gzip decompressed first.

use crate::abort::AbortSignal;
use crate::payload::Payload;
use crate::processor::{emit, PayloadSender, Processor, ProcessorError};
use async_trait::async_trait;
use flate2::bufread::MultiGzDecoder;
use logger::Logger;
use parking_lot::Mutex;
use serde::Deserialize;
use std::fmt;
use std::io::{self, BufRead, BufReader, Cursor, Read};
use tokio::sync::mpsc;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Units buffered between the blocking worker and the async side.
const READ_AHEAD: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IoReaderConfig {
    pub line_by_line: bool,
    pub buffer_size: usize,
    pub gzipped: bool,
}

impl Default for IoReaderConfig {
    fn default() -> Self {
        Self {
            line_by_line: true,
            buffer_size: 1024,
            gzipped: false,
        }
    }
}

type Source = Box<dyn Read + Send>;

pub struct IoReader {
    id: String,
    config: IoReaderConfig,
    source: Mutex<Option<Source>>,
    logger: Logger,
}

pub struct IoReaderBuilder {
    id: String,
    config: IoReaderConfig,
    source: Source,
    logger: Option<Logger>,
}

impl IoReaderBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn config(mut self, config: IoReaderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn line_by_line(mut self, line_by_line: bool) -> Self {
        self.config.line_by_line = line_by_line;
        self
    }

    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.config.buffer_size = buffer_size;
        self
    }

    pub fn gzipped(mut self, gzipped: bool) -> Self {
        self.config.gzipped = gzipped;
        self
    }

    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Validate the configuration and, for gzipped input, set up decompression.
    ///
    /// A source that does not start with a gzip header is rejected here, before
    /// anything has been read downstream.
    pub fn build(self) -> Result<IoReader, ProcessorError> {
        if self.config.buffer_size == 0 {
            return Err(ProcessorError::InvalidConfiguration(
                "buffer_size must be greater than zero".to_string(),
            ));
        }
        let source = if self.config.gzipped {
            open_gzip(self.source).map_err(|err| ProcessorError::decompression(&self.id, err))?
        } else {
            self.source
        };
        Ok(IoReader {
            id: self.id,
            config: self.config,
            source: Mutex::new(Some(source)),
            logger: self.logger.unwrap_or_default(),
        })
    }
}

fn open_gzip(mut source: Source) -> io::Result<Source> {
    let mut head = [0u8; GZIP_MAGIC.len()];
    let (read, failure) = fill_block(&mut source, &mut head);
    if let Some(err) = failure {
        return Err(err);
    }
    if read == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "empty input has no gzip header",
        ));
    }
    if read < GZIP_MAGIC.len() || head != GZIP_MAGIC {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "input does not start with a gzip header",
        ));
    }
    // The peeked magic is put back in front of the rest of the stream.
    let rejoined = Cursor::new(head).chain(source);
    Ok(Box::new(MultiGzDecoder::new(BufReader::new(rejoined))))
}

impl IoReader {
    pub fn builder(reader: impl Read + Send + 'static) -> IoReaderBuilder {
        IoReaderBuilder {
            id: "io_reader".to_string(),
            config: IoReaderConfig::default(),
            source: Box::new(reader),
            logger: None,
        }
    }

    /// Reader with the default configuration: line mode, no decompression.
    pub fn new(reader: impl Read + Send + 'static) -> Result<Self, ProcessorError> {
        Self::builder(reader).build()
    }

    pub fn config(&self) -> &IoReaderConfig {
        &self.config
    }

    fn take_source(&self) -> Option<Source> {
        self.source.lock().take()
    }

    /// Read the whole source synchronously, handing every unit to `f`.
    ///
    /// Follows the same rules as the pipeline path: a read failure raises
    /// `abort`, and nothing is delivered once `abort` is set.
    pub fn for_each_data(&self, abort: &AbortSignal, mut f: impl FnMut(Payload)) {
        let Some(source) = self.take_source() else {
            self.logger
                .info(format_args!("{}: source already consumed", self.id));
            return;
        };
        read_units(source, &self.config, abort, |event| match event {
            ReadEvent::Unit(payload) => {
                if abort.is_aborted() {
                    return false;
                }
                f(payload);
                true
            }
            ReadEvent::Failed(err) => {
                self.raise(abort, err);
                false
            }
        });
    }

    fn raise(&self, abort: &AbortSignal, err: io::Error) {
        let err = ProcessorError::source_read(&self.id, err);
        self.logger.error(&err);
        abort.abort(err);
    }
}

impl fmt::Debug for IoReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoReader")
            .field("id", &self.id)
            .field("config", &self.config)
            .finish()
    }
}

#[async_trait]
impl Processor for IoReader {
    fn id(&self) -> &str {
        &self.id
    }

    async fn process_data(&self, _payload: Payload, output: &PayloadSender, abort: &AbortSignal) {
        let Some(source) = self.take_source() else {
            self.logger
                .info(format_args!("{}: source already consumed", self.id));
            return;
        };

        let (tx, mut rx) = mpsc::channel(READ_AHEAD);
        let config = self.config.clone();
        let worker_abort = abort.clone();
        // Detached. The worker stops before its next read once the pipeline is
        // aborted or `rx` is gone; a read already blocked in the source keeps
        // its blocking-pool thread until that read returns.
        let _worker = tokio::task::spawn_blocking(move || {
            read_units(source, &config, &worker_abort, |event| {
                tx.blocking_send(event).is_ok()
            })
        });

        let mut emitted = 0usize;
        loop {
            let event = tokio::select! {
                biased;
                _ = abort.aborted() => break,
                event = rx.recv() => event,
            };
            match event {
                Some(ReadEvent::Unit(payload)) => match emit(output, abort, payload).await {
                    Ok(()) => emitted += 1,
                    Err(ProcessorError::ChannelClosed) => {
                        self.logger
                            .debug(format_args!("{}: downstream closed", self.id));
                        break;
                    }
                    Err(_) => break,
                },
                Some(ReadEvent::Failed(err)) => self.raise(abort, err),
                None => break,
            }
        }
        drop(rx);
        self.logger.debug(format_args!(
            "{}: emitted {} payloads",
            self.id, emitted
        ));
    }

    async fn finish(&self, _output: &PayloadSender, _abort: &AbortSignal) {
        self.logger.debug(format_args!("{}: finished", self.id));
    }
}

enum ReadEvent {
    Unit(Payload),
    Failed(io::Error),
}

/// Blocking read loop. Stops at end of stream, when `sink` returns `false`
/// or, checked before every read, once `abort` is raised.
fn read_units(
    source: Source,
    config: &IoReaderConfig,
    abort: &AbortSignal,
    sink: impl FnMut(ReadEvent) -> bool,
) {
    if config.line_by_line {
        scan_lines(source, abort, sink);
    } else {
        read_blocks(source, config.buffer_size, abort, sink);
    }
}

fn scan_lines(source: Source, abort: &AbortSignal, mut sink: impl FnMut(ReadEvent) -> bool) {
    let mut reader = BufReader::new(source);
    let mut line = Vec::new();
    while !abort.is_aborted() {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => return,
            Ok(_) => {
                trim_line_ending(&mut line);
                // Lines that are not UTF-8 keep their exact bytes.
                let payload = match String::from_utf8(std::mem::take(&mut line)) {
                    Ok(text) => Payload::Text(text),
                    Err(err) => Payload::raw(err.into_bytes()),
                };
                if !sink(ReadEvent::Unit(payload)) {
                    return;
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                sink(ReadEvent::Failed(err));
                return;
            }
        }
    }
}

fn trim_line_ending(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
}

fn read_blocks(
    mut source: Source,
    buffer_size: usize,
    abort: &AbortSignal,
    mut sink: impl FnMut(ReadEvent) -> bool,
) {
    let mut block = vec![0u8; buffer_size];
    while !abort.is_aborted() {
        let (filled, failure) = fill_block(&mut source, &mut block);
        if filled > 0 && !sink(ReadEvent::Unit(Payload::binary(&block[..filled]))) {
            return;
        }
        match failure {
            Some(err) => {
                if !sink(ReadEvent::Failed(err)) {
                    return;
                }
            }
            None if filled < block.len() => return,
            None => {}
        }
    }
}

/// Read until `block` is full, the stream ends or a read fails.
fn fill_block(source: &mut impl Read, block: &mut [u8]) -> (usize, Option<io::Error>) {
    let mut filled = 0;
    while filled < block.len() {
        match source.read(&mut block[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return (filled, Some(err)),
        }
    }
    (filled, None)
}
