//! YUV4MPEG2 file sink.
//!
//! Every successful `start` opens a new numbered file next to the base
//! path, so each canvas geometry ends up in its own stream.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tessera_common::error::{TesseraError, TesseraResult};
use tessera_frame::{FrameConsumer, PixelFormat, SourceId, VideoFrame};
use tessera_mixer::SinkEndpoint;

struct OpenStream {
    name: String,
    writer: BufWriter<File>,
    geometry: Option<(u32, u32)>,
    frames: u64,
}

pub struct Y4mSink {
    dir: PathBuf,
    stem: String,
    fps: u32,
    sequence: AtomicU32,
    stream: Mutex<Option<OpenStream>>,
    last_name: Mutex<String>,
    files: Mutex<Vec<PathBuf>>,
}

impl Y4mSink {
    /// Files are written as `<dir>/<stem>-NNN.y4m`.
    pub fn new(dir: impl AsRef<Path>, stem: impl Into<String>, fps: u32) -> Self {
        let stem = stem.into();
        Self {
            dir: dir.as_ref().to_path_buf(),
            last_name: Mutex::new(stem.clone()),
            stem,
            fps: fps.max(1),
            sequence: AtomicU32::new(0),
            stream: Mutex::new(None),
            files: Mutex::new(Vec::new()),
        }
    }

    /// Every file opened so far.
    pub fn files(&self) -> Vec<PathBuf> {
        lock(&self.files).clone()
    }

    fn write_frame(&self, stream: &mut OpenStream, frame: &VideoFrame) -> std::io::Result<()> {
        let geometry = (frame.width(), frame.height());
        match stream.geometry {
            None => {
                writeln!(
                    stream.writer,
                    "YUV4MPEG2 W{} H{} F{}:1 Ip A1:1 C420jpeg",
                    geometry.0, geometry.1, self.fps
                )?;
                stream.geometry = Some(geometry);
            }
            Some(expected) if expected != geometry => {
                tracing::warn!(
                    sink = %stream.name,
                    width = geometry.0,
                    height = geometry.1,
                    "Frame geometry differs from stream header, dropping"
                );
                return Ok(());
            }
            Some(_) => {}
        }
        stream.writer.write_all(b"FRAME\n")?;
        stream.writer.write_all(frame.data())?;
        stream.frames += 1;
        Ok(())
    }
}

impl FrameConsumer for Y4mSink {
    fn on_frame(&self, _source: SourceId, frame: &Arc<VideoFrame>) {
        if frame.format() != PixelFormat::Yuv420p {
            tracing::warn!(format = %frame.format(), "Y4M sink only accepts yuv420p");
            return;
        }
        let mut guard = lock(&self.stream);
        let Some(stream) = guard.as_mut() else {
            return;
        };
        if let Err(e) = self.write_frame(stream, frame) {
            tracing::warn!(sink = %stream.name, error = %e, "Failed to write frame");
        }
    }
}

impl SinkEndpoint for Y4mSink {
    fn start(&self) -> TesseraResult<()> {
        let mut guard = lock(&self.stream);
        if guard.is_some() {
            return Err(TesseraError::sink(format!("{} is already open", self.stem)));
        }

        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let name = format!("{}-{seq:03}.y4m", self.stem);
        let path = self.dir.join(&name);
        let file = File::create(&path)?;

        tracing::info!(sink = %name, path = %path.display(), "Opened Y4M stream");
        *lock(&self.last_name) = name.clone();
        lock(&self.files).push(path);
        *guard = Some(OpenStream {
            name,
            writer: BufWriter::new(file),
            geometry: None,
            frames: 0,
        });
        Ok(())
    }

    fn stop(&self) {
        let Some(mut stream) = lock(&self.stream).take() else {
            return;
        };
        if let Err(e) = stream.writer.flush() {
            tracing::warn!(sink = %stream.name, error = %e, "Failed to flush stream");
        }
        tracing::info!(sink = %stream.name, frames = stream.frames, "Closed Y4M stream");
    }

    fn opened_name(&self) -> String {
        lock(&self.last_name).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
