//! Background decoding off the render thread.
//!
//! Every request gets a monotonically increasing sequence id. Completions come back over a
//! channel tagged with that id so the consumer can drop results that were overtaken by a newer
//! request.

use std::{path::PathBuf, sync::mpsc};

use anyhow::Context as _;

use crate::{
    assets::{Bitmap, decode_background},
    foundation::error::{CoverError, CoverResult},
};

/// Result of one decode request.
#[derive(Debug)]
pub struct LoadCompletion {
    pub sequence_id: u64,
    pub result: CoverResult<Bitmap>,
}

pub struct ImageLoader {
    pool: rayon::ThreadPool,
    tx: mpsc::Sender<LoadCompletion>,
    rx: mpsc::Receiver<LoadCompletion>,
    next_sequence: u64,
    in_flight: usize,
}

impl std::fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLoader")
            .field("next_sequence", &self.next_sequence)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl ImageLoader {
    pub fn new(threads: usize) -> CoverResult<Self> {
        if threads == 0 {
            return Err(CoverError::validation("loader threads must be >= 1"));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("covercraft-decode-{i}"))
            .build()
            .map_err(|e| CoverError::render(format!("failed to build decode thread pool: {e}")))?;
        let (tx, rx) = mpsc::channel();
        Ok(Self {
            pool,
            tx,
            rx,
            next_sequence: 1,
            in_flight: 0,
        })
    }

    /// Sequence id of the most recent request, if any was made.
    pub fn latest_sequence(&self) -> Option<u64> {
        (self.next_sequence > 1).then(|| self.next_sequence - 1)
    }

    /// Number of requests whose completion has not been taken yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Decode in-memory bytes on the pool.
    pub fn submit_bytes(&mut self, bytes: Vec<u8>) -> u64 {
        self.spawn(move || decode_background(&bytes))
    }

    /// Read and decode a file on the pool.
    pub fn submit_file(&mut self, path: PathBuf) -> u64 {
        self.spawn(move || {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("read background '{}'", path.display()))?;
            decode_background(&bytes)
        })
    }

    fn spawn<F>(&mut self, job: F) -> u64
    where
        F: FnOnce() -> CoverResult<Bitmap> + Send + 'static,
    {
        let sequence_id = self.next_sequence;
        self.next_sequence += 1;
        self.in_flight += 1;

        let tx = self.tx.clone();
        self.pool.spawn(move || {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(job))
                .unwrap_or_else(|payload| {
                    let msg = payload
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_owned())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_owned());
                    tracing::error!(sequence_id, %msg, "background decode panicked");
                    Err(CoverError::decode(format!("decode job panicked: {msg}")))
                });
            // The receiver lives as long as the loader; a send error means it was dropped and
            // nobody is interested in the result any more.
            let _ = tx.send(LoadCompletion {
                sequence_id,
                result,
            });
        });
        tracing::debug!(sequence_id, "submitted background decode");
        sequence_id
    }

    /// Next finished completion, without blocking.
    pub fn try_next(&mut self) -> Option<LoadCompletion> {
        let c = self.rx.try_recv().ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(c)
    }

    /// Block until the next completion arrives. Returns `None` when nothing is in flight.
    pub fn wait_next(&mut self) -> Option<LoadCompletion> {
        if self.in_flight == 0 {
            return None;
        }
        let c = self.rx.recv().ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(c)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(image::RgbaImage::new(w, h))
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn sequence_ids_are_monotonic() {
        let mut loader = ImageLoader::new(1).unwrap();
        assert_eq!(loader.latest_sequence(), None);
        let a = loader.submit_bytes(png_bytes(1, 1));
        let b = loader.submit_bytes(png_bytes(1, 1));
        assert!(b > a);
        assert_eq!(loader.latest_sequence(), Some(b));
        assert_eq!(loader.in_flight(), 2);

        let mut seen = vec![
            loader.wait_next().unwrap().sequence_id,
            loader.wait_next().unwrap().sequence_id,
        ];
        seen.sort_unstable();
        assert_eq!(seen, vec![a, b]);
        assert!(loader.wait_next().is_none());
    }

    #[test]
    fn failures_are_reported_with_their_id() {
        let mut loader = ImageLoader::new(2).unwrap();
        let id = loader.submit_bytes(b"nope".to_vec());
        let c = loader.wait_next().unwrap();
        assert_eq!(c.sequence_id, id);
        assert!(c.result.is_err());

        let id = loader.submit_file(PathBuf::from("does/not/exist.png"));
        let c = loader.wait_next().unwrap();
        assert_eq!(c.sequence_id, id);
        assert!(c.result.is_err());
    }

    #[test]
    fn panicking_job_becomes_a_decode_error() {
        let mut loader = ImageLoader::new(1).unwrap();
        let id = loader.spawn(|| panic!("boom"));
        let c = loader.wait_next().unwrap();
        assert_eq!(c.sequence_id, id);
        match c.result {
            Err(CoverError::Decode(msg)) => assert!(msg.contains("boom"), "{msg}"),
            other => panic!("expected a decode error, got {other:?}"),
        }
        assert_eq!(loader.in_flight(), 0);

        // the worker survives
        let id = loader.submit_bytes(png_bytes(2, 2));
        let c = loader.wait_next().unwrap();
        assert_eq!(c.sequence_id, id);
        assert!(c.result.is_ok());
    }

    #[test]
    fn zero_threads_is_rejected() {
        assert!(ImageLoader::new(0).is_err());
    }
}
