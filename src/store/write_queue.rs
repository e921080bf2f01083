// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowsplit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowsplit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Per-document write serialization.
//!
//! Each write against a document path is chained behind the write admitted before it for the
//! same path. The position in the chain is taken when [`WriteQueue::admit`] is called, not when
//! the returned permit is first polled, so passes apply in call order. Paths do not affect each
//! other. A path's registry entry is dropped as soon as its last admitted pass settles.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

/// What a settled permit passes to the permit queued behind it.
///
/// A permit that is dropped before its turn forwards its own predecessor so the chain stays
/// intact.
#[derive(Debug)]
struct Handoff(Option<Predecessor>);

#[derive(Debug)]
struct Predecessor {
    ticket: u64,
    settled: oneshot::Receiver<Handoff>,
}

#[derive(Debug, Default)]
struct QueueState {
    tails: HashMap<PathBuf, Predecessor>,
    next_ticket: u64,
}

#[derive(Debug, Clone, Default)]
pub struct WriteQueue {
    state: Arc<Mutex<QueueState>>,
}

impl WriteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes the next place in line for `path`.
    pub fn admit(&self, path: &Path) -> WritePermit {
        let (done, settled) = oneshot::channel();

        let mut state = self.lock();
        let ticket = state.next_ticket;
        state.next_ticket = state.next_ticket.wrapping_add(1);
        let previous = state
            .tails
            .insert(path.to_path_buf(), Predecessor { ticket, settled });

        WritePermit {
            queue: self.clone(),
            path: path.to_path_buf(),
            ticket,
            done: Some(done),
            previous,
        }
    }

    /// Runs `pass` once every earlier pass for `path` has settled.
    pub fn run<F>(&self, path: &Path, pass: F) -> impl Future<Output = F::Output>
    where
        F: Future,
    {
        let permit = self.admit(path);
        async move {
            let _permit = permit.ready().await;
            pass.await
        }
    }

    /// Number of paths with a pass in flight or queued.
    pub fn active_paths(&self) -> usize {
        self.lock().tails.len()
    }
}

/// A place in line for one document path. The pass it guards is over when it is dropped.
#[derive(Debug)]
pub struct WritePermit {
    queue: WriteQueue,
    path: PathBuf,
    ticket: u64,
    done: Option<oneshot::Sender<Handoff>>,
    previous: Option<Predecessor>,
}

impl WritePermit {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Waits until every earlier permit for the same path has been dropped.
    pub async fn ready(mut self) -> Self {
        while let Some(previous) = self.previous.as_mut() {
            self.previous = match (&mut previous.settled).await {
                Ok(Handoff(next)) => next,
                Err(_) => None,
            };
        }
        self
    }
}

impl Drop for WritePermit {
    fn drop(&mut self) {
        let previous = self.previous.take();

        let mut state = self.queue.lock();
        let is_tail = state
            .tails
            .get(&self.path)
            .is_some_and(|tail| tail.ticket == self.ticket);

        if is_tail {
            match previous {
                Some(previous) => {
                    state.tails.insert(self.path.clone(), previous);
                }
                None => {
                    state.tails.remove(&self.path);
                }
            }
        } else if let Some(done) = self.done.take() {
            let _ = done.send(Handoff(previous));
        }
    }
}
