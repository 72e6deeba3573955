//! Test doubles shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

use objcache::cache::{Clock, Entry, PersistentStore};
use objcache::executor::{Executor, Task};

/// In-memory store that counts calls and can be told to fail
#[derive(Default)]
pub struct CountingStore {
    values: Mutex<HashMap<String, Vec<u8>>>,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
    pub contains_calls: AtomicUsize,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl CountingStore {
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.values.lock().unwrap().len()
    }

    /// Decodes the envelope stored under an internal key
    pub fn entry(&self, internal_key: &str) -> Option<Entry> {
        let values = self.values.lock().unwrap();
        values
            .get(internal_key)
            .map(|bytes| serde_json::from_slice(bytes).expect("Stored bytes should be an entry"))
    }

    fn injected(&self, flag: &AtomicBool) -> io::Result<()> {
        if flag.load(Ordering::SeqCst) {
            Err(io::Error::new(io::ErrorKind::Other, "injected failure"))
        } else {
            Ok(())
        }
    }
}

impl PersistentStore for CountingStore {
    fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.injected(&self.fail_reads)?;
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> io::Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.injected(&self.fail_writes)?;
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn contains(&self, key: &str) -> io::Result<bool> {
        self.contains_calls.fetch_add(1, Ordering::SeqCst);
        self.injected(&self.fail_reads)?;
        Ok(self.values.lock().unwrap().contains_key(key))
    }

    fn clear(&self) -> io::Result<()> {
        self.injected(&self.fail_writes)?;
        self.values.lock().unwrap().clear();
        Ok(())
    }
}

/// Clock that only moves when told to
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn at(now: i64) -> Self {
        Self(AtomicI64::new(now))
    }

    pub fn advance(&self, seconds: i64) {
        self.0.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Executor that queues tasks until `run_pending` is called
#[derive(Default)]
pub struct DeferredExecutor {
    queue: Mutex<Vec<Task>>,
}

impl DeferredExecutor {
    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    /// Runs every queued task and returns how many ran
    pub fn run_pending(&self) -> usize {
        let tasks: Vec<Task> = std::mem::take(&mut *self.queue.lock().unwrap());
        let count = tasks.len();
        for task in tasks {
            task();
        }
        count
    }
}

impl Executor for DeferredExecutor {
    fn submit(&self, task: Task) {
        self.queue.lock().unwrap().push(task);
    }
}
