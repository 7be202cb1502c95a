// ## Stable public API

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::compression::{CompressionCodec, decompress_stream as decode_units};
use crate::stream::config::PipelineConfig;
use crate::stream::io::{InputSource, OutputSink};
use crate::stream::pipeline::{Pipeline, PipelineHandle, PipelineReport};
use crate::types::{PipelineError, StreamError};

/// Compress `input` into `output` and block until the run ends.
pub fn compress_stream(
    input: InputSource,
    output: OutputSink,
    config: PipelineConfig,
) -> Result<PipelineReport, StreamError> {
    Pipeline::new(config).start(input, output)?.wait()
}

/// File-to-file convenience wrapper around `compress_stream`.
pub fn compress_file(src: &Path, dst: &Path, config: PipelineConfig) -> Result<PipelineReport, StreamError> {
    compress_stream(
        InputSource::File(src.to_path_buf()),
        OutputSink::File(dst.to_path_buf()),
        config,
    )
}

/// Callback flavor: exactly one of `on_success` / `on_error` fires.
///
/// Opening failures arrive through `on_error` like any runtime failure.
/// An invalid configuration is returned synchronously and fires neither.
/// The returned handle belongs to the supervising thread; it is `None` when
/// that thread could not be spawned and the run was supervised inline.
pub fn compress_with_callbacks<S, E>(
    input: InputSource,
    output: OutputSink,
    config: PipelineConfig,
    on_success: S,
    on_error: E,
) -> Result<Option<JoinHandle<()>>, StreamError>
where
    S: FnOnce(PipelineReport) + Send + 'static,
    E: FnOnce(PipelineError) + Send + 'static,
{
    let handle = match Pipeline::new(config).start(input, output) {
        Ok(handle) => handle,
        Err(StreamError::Pipeline(e)) => {
            on_error(e);
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    let job = Arc::new(Mutex::new(Some((handle, on_success, on_error))));
    let job_thread = job.clone();

    let spawned = thread::Builder::new()
        .name("parzip-supervisor".into())
        .spawn(move || supervise(&job_thread));

    match spawned {
        Ok(h) => Ok(Some(h)),
        Err(e) => {
            tracing::warn!("supervisor thread unavailable, waiting inline: {e}");
            supervise(&job);
            Ok(None)
        }
    }
}

type CallbackJob<S, E> = Arc<Mutex<Option<(PipelineHandle, S, E)>>>;

fn supervise<S, E>(job: &CallbackJob<S, E>)
where
    S: FnOnce(PipelineReport),
    E: FnOnce(PipelineError),
{
    let taken = job.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).take();
    let Some((handle, on_success, on_error)) = taken else { return };

    match handle.wait() {
        Ok(report) => on_success(report),
        Err(StreamError::Pipeline(e)) => on_error(e),
        Err(other) => on_error(PipelineError::aborted(other.to_string())),
    }
}

/// Decode every compressed unit in `src` into `dst`. Codec detected from magic bytes.
/// Returns the number of decompressed bytes. A partial `dst` is removed on failure.
pub fn decompress_file(src: &Path, dst: &Path) -> Result<u64, StreamError> {
    let reader = BufReader::new(File::open(src)?);
    let mut writer = BufWriter::new(File::create(dst)?);

    let result = decode_units(reader, &mut writer, None)
        .map_err(StreamError::from)
        .and_then(|n| writer.flush().map(|_| n).map_err(StreamError::from));

    match result {
        Ok(n) => {
            tracing::info!(src = %src.display(), dst = %dst.display(), bytes = n, "decompression finished");
            Ok(n)
        }
        Err(e) => {
            drop(writer);
            let _ = fs::remove_file(dst);
            Err(e)
        }
    }
}

/// `<src>.<ext>` for the codec, e.g. `data.bin` -> `data.bin.gz`.
pub fn default_output_path(src: &Path, codec: CompressionCodec) -> PathBuf {
    let mut name = src.as_os_str().to_os_string();
    name.push(".");
    name.push(codec.extension());
    PathBuf::from(name)
}

/// Strip a known codec extension: `data.bin.gz` -> `data.bin`.
/// `None` when the name carries no recognized extension.
pub fn default_decompressed_path(src: &Path) -> Option<PathBuf> {
    let ext = src.extension()?.to_str()?;
    ext.parse::<CompressionCodec>().ok()?;
    let stem = src.file_stem()?;
    Some(src.with_file_name(stem))
}
