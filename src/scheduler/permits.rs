use std::sync::{Arc, Condvar, Mutex, MutexGuard};

/// Counting semaphore bounding how many backups run at once.
#[derive(Debug)]
pub struct PermitPool {
    capacity: usize,
    available: Mutex<usize>,
    returned: Condvar,
}

/// Held by one running backup; returns its slot on drop.
#[derive(Debug)]
pub struct Permit {
    pool: Arc<PermitPool>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        let mut available = self.pool.lock();
        *available += 1;
        self.pool.returned.notify_all();
    }
}

impl PermitPool {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            capacity,
            available: Mutex::new(capacity),
            returned: Condvar::new(),
        })
    }

    /// Blocks until a slot is free.
    pub fn acquire(self: &Arc<Self>) -> Permit {
        let mut available = self.lock();
        while *available == 0 {
            available = self.returned.wait(available).unwrap_or_else(|e| e.into_inner());
        }
        *available -= 1;
        Permit { pool: Arc::clone(self) }
    }

    /// Blocks until every permit has been returned.
    pub fn drain(&self) {
        let mut available = self.lock();
        while *available < self.capacity {
            available = self.returned.wait(available).unwrap_or_else(|e| e.into_inner());
        }
    }

    pub fn available(&self) -> usize {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.available.lock().unwrap_or_else(|e| e.into_inner())
    }
}
