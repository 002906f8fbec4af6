//! Applies parsed replies and streamed deltas to editor buffers.
//!
//! Every write goes through a [`BufferLease`]. A lease is acquired for a whole
//! set of buffers at once and released on drop, so at most one operation ever
//! writes to a given buffer.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex};

use futures_util::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::buffer::{ActionScope, BufferId, EditorBuffers};
use crate::error::AssistError;
use crate::fence::ParsedFence;
use crate::lock_unpoisoned;

type InFlight = Arc<Mutex<BTreeSet<BufferId>>>;

#[derive(Clone)]
pub struct SyncEngine {
    buffers: Arc<dyn EditorBuffers>,
    in_flight: InFlight,
}

impl fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncEngine")
            .field("in_flight", &*lock_unpoisoned(&self.in_flight))
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    pub fn new(buffers: Arc<dyn EditorBuffers>) -> Self {
        Self {
            buffers,
            in_flight: Arc::new(Mutex::new(BTreeSet::new())),
        }
    }

    pub fn buffers(&self) -> &Arc<dyn EditorBuffers> {
        &self.buffers
    }

    pub fn is_busy(&self, buffer: BufferId) -> bool {
        lock_unpoisoned(&self.in_flight).contains(&buffer)
    }

    /// Claims every buffer in `ids` or none of them.
    pub fn acquire(&self, ids: &[BufferId]) -> Result<BufferLease, AssistError> {
        let mut in_flight = lock_unpoisoned(&self.in_flight);
        if let Some(busy) = ids.iter().find(|id| in_flight.contains(*id)) {
            warn!(buffer = %busy, "rejecting operation on busy buffer");
            return Err(AssistError::Busy(*busy));
        }

        let held: BTreeSet<BufferId> = ids.iter().copied().collect();
        in_flight.extend(held.iter().copied());
        Ok(BufferLease {
            held,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    /// Replaces each in-scope buffer that has a fence with that fence's body.
    ///
    /// Buffers without a fence are left untouched. Returns the buffers written.
    pub fn apply_fences(
        &self,
        lease: &BufferLease,
        fences: &[ParsedFence],
        scope: ActionScope,
    ) -> BTreeSet<BufferId> {
        let mut applied = BTreeSet::new();
        for fence in fences {
            let Some(buffer) = fence.buffer() else {
                continue;
            };
            if !scope.includes(buffer) || !lease.covers(buffer) {
                continue;
            }
            self.buffers.replace_all(buffer, &fence.body);
            applied.insert(buffer);
        }
        debug!(applied = ?applied, fences = fences.len(), "applied reply fences");
        applied
    }

    /// Clears `target` and appends each delta in arrival order.
    ///
    /// The stream is consumed exactly once. A failure mid-stream leaves the
    /// partially written content in place and is returned to the caller.
    pub async fn apply_stream<S>(
        &self,
        lease: &BufferLease,
        target: BufferId,
        mut deltas: S,
    ) -> Result<String, AssistError>
    where
        S: Stream<Item = Result<String, AssistError>> + Unpin,
    {
        if !lease.covers(target) {
            return Err(AssistError::validation(format!(
                "{target} buffer is not held by this operation"
            )));
        }

        self.buffers.replace_all(target, "");
        let mut written = String::new();
        while let Some(delta) = deltas.next().await {
            let delta = delta?;
            self.buffers.append(target, &delta);
            written.push_str(&delta);
        }
        debug!(buffer = %target, bytes = written.len(), "stream applied");
        Ok(written)
    }
}

/// Exclusive claim on a set of buffers, released on drop.
#[derive(Debug)]
pub struct BufferLease {
    held: BTreeSet<BufferId>,
    in_flight: InFlight,
}

impl BufferLease {
    pub fn covers(&self, buffer: BufferId) -> bool {
        self.held.contains(&buffer)
    }

    pub fn held(&self) -> &BTreeSet<BufferId> {
        &self.held
    }
}

impl Drop for BufferLease {
    fn drop(&mut self) {
        let mut in_flight = lock_unpoisoned(&self.in_flight);
        for buffer in &self.held {
            in_flight.remove(buffer);
        }
    }
}
