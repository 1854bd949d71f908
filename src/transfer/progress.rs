//! Transfer progress tracking

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::transfer::observer::Observer;

/// Progress of one transfer
#[derive(Debug, Clone)]
pub struct TransferProgress {
    /// Name of the file being moved
    pub name: String,
    /// Expected size, 0 when unknown
    pub total_bytes: u64,
    pub transferred_bytes: u64,
    start_time: Instant,
}

impl TransferProgress {
    pub fn new(name: impl Into<String>, total_bytes: u64) -> Self {
        Self {
            name: name.into(),
            total_bytes,
            transferred_bytes: 0,
            start_time: Instant::now(),
        }
    }

    pub fn add_bytes(&mut self, bytes: u64) {
        self.transferred_bytes += bytes;
    }

    /// Percentage done, or `None` when the total is unknown
    pub fn percentage(&self) -> Option<f64> {
        if self.total_bytes == 0 {
            None
        } else {
            Some((self.transferred_bytes as f64 / self.total_bytes as f64 * 100.0).min(100.0))
        }
    }

    /// Transfer speed in bytes per second
    pub fn speed_bps(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.transferred_bytes as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Receives progress snapshots from a [`ProgressObserver`]
pub trait ProgressSink: Send + Sync {
    fn update(&self, progress: &TransferProgress);
    fn finish(&self, progress: &TransferProgress);
}

/// Observer that turns byte events into [`TransferProgress`] updates
pub struct ProgressObserver<S: ProgressSink> {
    current: Mutex<Option<TransferProgress>>,
    sink: S,
}

impl<S: ProgressSink> ProgressObserver<S> {
    pub fn new(sink: S) -> Self {
        Self {
            current: Mutex::new(None),
            sink,
        }
    }

    /// Snapshot of the running transfer
    pub fn current(&self) -> Option<TransferProgress> {
        self.current.lock().ok().and_then(|guard| guard.clone())
    }

    fn start(&self, name: &str, total: u64) {
        if let Ok(mut current) = self.current.lock() {
            *current = Some(TransferProgress::new(name, total));
        }
    }

    fn advance(&self, bytes: usize) {
        if let Ok(mut current) = self.current.lock() {
            if let Some(progress) = current.as_mut() {
                progress.add_bytes(bytes as u64);
                self.sink.update(progress);
            }
        }
    }

    fn end(&self) {
        if let Ok(mut current) = self.current.lock() {
            if let Some(progress) = current.take() {
                self.sink.finish(&progress);
            }
        }
    }
}

impl<S: ProgressSink> Observer for ProgressObserver<S> {
    fn on_pre_receive_file(&self, source: &str, _target: &str, size: Option<u64>) {
        self.start(source, size.unwrap_or(0));
    }

    fn on_post_receive_file(&self, _source: &str, _target: &str, _size: Option<u64>) {
        self.end();
    }

    fn on_pre_send_file(&self, source: &str, _target: &str, size: u64) {
        self.start(source, size);
    }

    fn on_post_send_file(&self, _source: &str, _target: &str, _size: u64) {
        self.end();
    }

    fn on_bytes_received(&self, data: &[u8]) {
        self.advance(data.len());
    }

    fn on_bytes_sent(&self, data: &[u8]) {
        self.advance(data.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Default)]
    struct Recorder {
        updates: Mutex<Vec<u64>>,
        finished: Mutex<Vec<(String, u64)>>,
    }

    impl ProgressSink for Arc<Recorder> {
        fn update(&self, progress: &TransferProgress) {
            self.updates.lock().unwrap().push(progress.transferred_bytes);
        }

        fn finish(&self, progress: &TransferProgress) {
            self.finished
                .lock()
                .unwrap()
                .push((progress.name.clone(), progress.transferred_bytes));
        }
    }

    #[test]
    fn test_percentage() {
        let mut progress = TransferProgress::new("a.bin", 200);
        progress.add_bytes(50);
        assert_eq!(progress.percentage(), Some(25.0));
        assert_eq!(TransferProgress::new("b", 0).percentage(), None);
    }

    #[test]
    fn test_observer_tracks_one_file() {
        let recorder = Arc::new(Recorder::default());
        let observer = ProgressObserver::new(recorder.clone());

        observer.on_bytes_received(b"ignored before start");
        observer.on_pre_receive_file("remote.txt", "local.txt", Some(10));
        observer.on_bytes_received(b"1234");
        observer.on_bytes_received(b"567890");
        assert_eq!(observer.current().unwrap().percentage(), Some(100.0));
        observer.on_post_receive_file("remote.txt", "local.txt", Some(10));

        assert_eq!(*recorder.updates.lock().unwrap(), vec![4, 10]);
        assert_eq!(
            *recorder.finished.lock().unwrap(),
            vec![("remote.txt".to_string(), 10)]
        );
        assert!(observer.current().is_none());
    }
}
