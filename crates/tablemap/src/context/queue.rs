use std::sync::{Mutex, MutexGuard, PoisonError};

use tablemap_core::store::PendingOperation;

/// FIFO of operations waiting for the next commit.
///
/// Appends take a short lock; [`OperationQueue::take`] swaps the whole queue
/// out so a commit never holds the lock while talking to the store.
#[derive(Debug, Default)]
pub(crate) struct OperationQueue {
    pending: Mutex<Vec<PendingOperation>>,
}

impl OperationQueue {
    pub(crate) fn push(&self, operation: PendingOperation) {
        self.lock().push(operation);
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    /// Removes every queued operation, leaving the queue empty.
    pub(crate) fn take(&self) -> Batch {
        Batch {
            operations: std::mem::take(&mut *self.lock()),
        }
    }

    // A panic while holding the lock cannot leave the Vec half-written.
    fn lock(&self) -> MutexGuard<'_, Vec<PendingOperation>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Operations owned by one commit. Whatever is not executed is dropped with it.
#[derive(Debug, Default)]
pub(crate) struct Batch {
    operations: Vec<PendingOperation>,
}

impl Batch {
    pub(crate) fn len(&self) -> usize {
        self.operations.len()
    }
}

impl IntoIterator for Batch {
    type Item = PendingOperation;
    type IntoIter = std::vec::IntoIter<PendingOperation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablemap_core::entity::Entity;
    use tablemap_core::store::OperationKind;

    fn op(row_key: &str) -> PendingOperation {
        PendingOperation::new("t", OperationKind::Upsert, Entity::new("p", row_key))
    }

    #[test]
    fn test_take_preserves_order_and_empties_queue() {
        let queue = OperationQueue::default();
        queue.push(op("a"));
        queue.push(op("b"));
        queue.push(op("c"));

        let batch = queue.take();

        assert_eq!(batch.len(), 3);
        assert_eq!(queue.len(), 0);
        let keys: Vec<_> = batch
            .into_iter()
            .map(|o| o.entity.row_key().to_string())
            .collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_push_after_take_starts_new_batch() {
        let queue = OperationQueue::default();
        queue.push(op("a"));
        let _first = queue.take();

        queue.push(op("b"));

        assert_eq!(queue.take().len(), 1);
    }
}
