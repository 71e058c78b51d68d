//! Nesting counter that rejects overlapping operations on one instance.

use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("no concurrent I/O operations are allowed on this instance")]
pub struct ConcurrentIo;

#[derive(Debug, Default)]
pub struct IoGuard {
    depth: AtomicUsize,
}

/// Held for the duration of one operation; releases the guard on drop.
#[derive(Debug)]
pub struct IoToken<'a> {
    depth: &'a AtomicUsize,
}

impl IoGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter an operation, failing if another one is already in flight.
    pub fn enter(&self) -> Result<IoToken<'_>, ConcurrentIo> {
        if self.depth.fetch_add(1, Ordering::AcqRel) != 0 {
            self.depth.fetch_sub(1, Ordering::AcqRel);
            return Err(ConcurrentIo);
        }
        Ok(IoToken { depth: &self.depth })
    }

    pub fn is_busy(&self) -> bool {
        self.depth.load(Ordering::Acquire) != 0
    }
}

impl Drop for IoToken<'_> {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_enter_rejected() {
        let guard = IoGuard::new();
        let token = guard.enter().unwrap();
        assert!(guard.is_busy());
        assert_eq!(guard.enter().unwrap_err(), ConcurrentIo);
        drop(token);
        assert!(!guard.is_busy());
        assert!(guard.enter().is_ok());
    }

    #[test]
    fn test_rejected_enter_does_not_leak_depth() {
        let guard = IoGuard::new();
        let token = guard.enter().unwrap();
        for _ in 0..5 {
            let _ = guard.enter();
        }
        drop(token);
        assert!(!guard.is_busy());
    }
}
