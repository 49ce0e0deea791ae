// src/exec/capture.rs

//! Bounded capture of child process output.
//!
//! - [`RingBuffer`] keeps the most recent `capacity` bytes written to it,
//!   evicting the oldest bytes first.
//! - [`SharedCapture`] is the handle the drain task writes through and the
//!   executor snapshots from once it stops waiting.
//! - [`TeeReader`] copies every byte read from a source into a writer, so a
//!   line reader stacked on top sees exactly the bytes that were captured.

use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard};

/// Fixed-capacity circular byte buffer with overwrite-oldest semantics.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    buf: Vec<u8>,
    start: usize,
    len: usize,
    total_written: u64,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity],
            start: 0,
            len: 0,
            total_written: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of bytes ever written, including evicted ones.
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Whether any bytes have been evicted.
    pub fn is_truncated(&self) -> bool {
        self.total_written > self.len as u64
    }

    pub fn push(&mut self, data: &[u8]) {
        self.total_written += data.len() as u64;

        let cap = self.capacity();
        if cap == 0 || data.is_empty() {
            return;
        }

        // Only the last `cap` bytes of an oversized write can survive.
        let data = if data.len() > cap {
            &data[data.len() - cap..]
        } else {
            data
        };
        let n = data.len();

        let end = (self.start + self.len) % cap;
        let first = n.min(cap - end);
        self.buf[end..end + first].copy_from_slice(&data[..first]);
        self.buf[..n - first].copy_from_slice(&data[first..]);

        if self.len + n > cap {
            let overflow = self.len + n - cap;
            self.start = (self.start + overflow) % cap;
            self.len = cap;
        } else {
            self.len += n;
        }
    }

    /// Current contents, oldest byte first.
    pub fn snapshot(&self) -> Vec<u8> {
        let cap = self.capacity();
        let mut out = Vec::with_capacity(self.len);
        if self.len == 0 {
            return out;
        }
        let first = self.len.min(cap - self.start);
        out.extend_from_slice(&self.buf[self.start..self.start + first]);
        out.extend_from_slice(&self.buf[..self.len - first]);
        out
    }
}

impl Write for RingBuffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.push(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Cloneable handle to a [`RingBuffer`] shared between the drain task and
/// the executor.
#[derive(Debug, Clone)]
pub struct SharedCapture {
    inner: Arc<Mutex<RingBuffer>>,
}

impl SharedCapture {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RingBuffer::new(capacity))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RingBuffer> {
        // A panicking sink must not hide the output captured so far.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> Vec<u8> {
        self.lock().snapshot()
    }

    /// Current contents decoded as text (invalid UTF-8 replaced).
    pub fn snapshot_string(&self) -> String {
        String::from_utf8_lossy(&self.snapshot()).into_owned()
    }

    pub fn total_written(&self) -> u64 {
        self.lock().total_written()
    }
}

impl Write for SharedCapture {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.lock().push(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Reader adapter that writes every byte it returns into `sink` first.
pub struct TeeReader<R, W> {
    source: R,
    sink: W,
}

impl<R: Read, W: Write> TeeReader<R, W> {
    pub fn new(source: R, sink: W) -> Self {
        Self { source, sink }
    }
}

impl<R: Read, W: Write> Read for TeeReader<R, W> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.source.read(buf)?;
        if n > 0 {
            self.sink.write_all(&buf[..n])?;
        }
        Ok(n)
    }
}
