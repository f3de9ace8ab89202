/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! One way readiness gate that holds database operations until a table is initialized.
//!
//! The gate starts not ready. Operations submitted while it is not ready are queued; the first
//! call to [`ReadinessGate::mark_ready`] releases them in submission order and discards the
//! queue. Every later operation passes straight through.

use std::collections::VecDeque;
use std::fmt;
use std::ops::DerefMut;
use std::sync::Mutex;
use tokio::sync::oneshot;

type Resolver = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct Inner {
    ready: bool,
    pending: VecDeque<Resolver>,
}

/// Readiness gate for one table.
#[derive(Default)]
pub struct ReadinessGate {
    inner: Mutex<Inner>,
}

impl fmt::Debug for ReadinessGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock().unwrap();
        f.debug_struct("ReadinessGate")
            .field("ready", &inner.ready)
            .field("pending", &inner.pending.len())
            .finish()
    }
}

impl ReadinessGate {
    /// Creates a gate in the not ready state.
    pub fn new() -> Self {
        Self::default()
    }

    fn get_mut(&self) -> impl DerefMut<Target = Inner> + '_ {
        self.inner.lock().unwrap()
    }

    /// True once [`mark_ready`](Self::mark_ready) has been called.
    pub fn is_ready(&self) -> bool {
        self.get_mut().ready
    }

    /// Number of operations currently waiting.
    pub fn pending(&self) -> usize {
        self.get_mut().pending.len()
    }

    /// Runs `resolve` once the gate is ready.
    ///
    /// When the gate is already ready `resolve` runs immediately and is never queued.
    pub fn enqueue_until_ready(&self, resolve: impl FnOnce() + Send + 'static) {
        {
            let mut inner = self.get_mut();
            if !inner.ready {
                inner.pending.push_back(Box::new(resolve));
                return;
            }
        }
        resolve();
    }

    /// Waits until the gate is ready.
    pub async fn wait_ready(&self) {
        let rx = {
            let mut inner = self.get_mut();
            if inner.ready {
                return;
            }
            let (tx, rx) = oneshot::channel::<()>();
            inner.pending.push_back(Box::new(move || {
                let _ = tx.send(());
            }));
            rx
        };
        let _ = rx.await;
    }

    /// Transitions to ready and releases every queued operation in FIFO order.
    ///
    /// Returns the number of operations released. Calling this again has no effect.
    pub fn mark_ready(&self) -> usize {
        let drained = {
            let mut inner = self.get_mut();
            if inner.ready {
                return 0;
            }
            inner.ready = true;
            std::mem::take(&mut inner.pending)
        };
        let count = drained.len();
        tracing::debug!(released = count, "readiness gate opened");
        for resolve in drained {
            resolve();
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn opening_is_logged() {
        let gate = ReadinessGate::new();
        gate.enqueue_until_ready(|| {});
        gate.mark_ready();
        assert!(logs_contain("readiness gate opened"));
        assert!(logs_contain("released=1"));
    }

    #[test]
    fn queued_resolvers_run_in_submission_order() {
        let gate = ReadinessGate::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = order.clone();
            gate.enqueue_until_ready(move || order.lock().unwrap().push(i));
        }
        assert!(order.lock().unwrap().is_empty());
        assert_eq!(gate.pending(), 3);

        assert_eq!(gate.mark_ready(), 3);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(gate.pending(), 0);
        assert_eq!(gate.mark_ready(), 0);
    }

    #[test]
    fn resolvers_run_immediately_after_ready() {
        let gate = ReadinessGate::new();
        gate.mark_ready();
        let ran = Arc::new(Mutex::new(false));
        let flag = ran.clone();
        gate.enqueue_until_ready(move || *flag.lock().unwrap() = true);
        assert!(*ran.lock().unwrap());
        assert_eq!(gate.pending(), 0);
    }

    #[tokio::test]
    async fn waiters_resume_once_ready() {
        let gate = Arc::new(ReadinessGate::new());
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut tasks = Vec::new();
        for i in 0..3 {
            let waiter = gate.clone();
            let order = order.clone();
            tasks.push(tokio::spawn(async move {
                waiter.wait_ready().await;
                order.lock().unwrap().push(i);
            }));
            while gate.pending() <= i {
                tokio::task::yield_now().await;
            }
        }
        assert!(!gate.is_ready());
        gate.mark_ready();
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(order.lock().unwrap().len(), 3);

        gate.wait_ready().await;
        assert_eq!(gate.pending(), 0);
    }
}
