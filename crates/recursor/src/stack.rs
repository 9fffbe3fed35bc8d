// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! loop protection for a resolution in progress
//!
//! Every nested resolution (CNAME chase, glue lookup, DNSKEY/DS fetch)
//! shares one stack of active (name, type, class) triples. Pushing a triple
//! that is already on the stack means the resolution has looped.

use std::sync::Arc;

use parking_lot::Mutex;

use quill_proto::op::Query;

use crate::error::{Error, ErrorKind};

/// The set of queries currently being resolved within one top-level call
#[derive(Clone, Default)]
pub(crate) struct ResolutionStack {
    active: Arc<Mutex<Vec<Query>>>,
}

impl ResolutionStack {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Push `query` onto the stack, failing with `LoopDetected` when it is
    /// already active. The returned guard pops the entry on every exit path,
    /// including early returns and errors.
    pub(crate) fn enter(&self, query: &Query) -> Result<StackGuard, Error> {
        let mut active = self.active.lock();
        if active.contains(query) {
            return Err(ErrorKind::LoopDetected(query.clone()).into());
        }
        active.push(query.clone());

        Ok(StackGuard {
            active: Arc::clone(&self.active),
            query: query.clone(),
        })
    }

    /// Current nesting depth
    pub(crate) fn depth(&self) -> usize {
        self.active.lock().len()
    }
}

/// Removes its query from the stack when dropped
#[derive(Debug)]
pub(crate) struct StackGuard {
    active: Arc<Mutex<Vec<Query>>>,
    query: Query,
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        let mut active = self.active.lock();
        if let Some(position) = active.iter().rposition(|q| q == &self.query) {
            active.remove(position);
        }
    }
}
