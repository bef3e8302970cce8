use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::ops::{LinkId, Operation};

/// Errors returned when an operation batch is not safely ordered.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("operation {index} inserts id {id}, which operation {first} already inserted")]
    DuplicateId { index: usize, id: LinkId, first: usize },

    #[error("operation {index} references id {id} before operation {inserted_at} inserts it")]
    ForwardReference {
        index: usize,
        id: LinkId,
        inserted_at: usize,
    },
}

/// Check the referential ordering of a batch.
///
/// Every id is inserted at most once, and an operation may only reference an
/// id of this batch after the operation that inserts it. Ids the batch never
/// inserts are treated as already existing in the store; whether they really
/// exist is the store's concern.
///
/// Returns the first violation in operation order.
pub fn verify_batch(ops: &[Operation]) -> Result<(), BatchError> {
    let mut inserted_at: HashMap<LinkId, usize> = HashMap::new();
    for (index, op) in ops.iter().enumerate() {
        if let Some(id) = op.inserted_id() {
            if let Some(&first) = inserted_at.get(&id) {
                return Err(BatchError::DuplicateId { index, id, first });
            }
            inserted_at.insert(id, index);
        }
    }

    let mut seen: HashSet<LinkId> = HashSet::new();
    for (index, op) in ops.iter().enumerate() {
        for id in op.references() {
            if let Some(&at) = inserted_at.get(&id) {
                // A node may not reference itself either.
                if !seen.contains(&id) {
                    return Err(BatchError::ForwardReference {
                        index,
                        id,
                        inserted_at: at,
                    });
                }
            }
        }
        if let Some(id) = op.inserted_id() {
            seen.insert(id);
        }
    }

    Ok(())
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_batch_passes() {
        let ops = vec![
            Operation::node(10, 1),
            Operation::edge(11, 2, 500, 10),
            Operation::value(11, "name"),
        ];
        assert_eq!(verify_batch(&ops), Ok(()));
    }

    #[test]
    fn empty_batch_passes() {
        assert_eq!(verify_batch(&[]), Ok(()));
    }

    #[test]
    fn value_before_target() {
        let ops = vec![Operation::value(11, "name"), Operation::edge(11, 2, 500, 10)];
        assert_eq!(
            verify_batch(&ops),
            Err(BatchError::ForwardReference {
                index: 0,
                id: 11,
                inserted_at: 1
            })
        );
    }

    #[test]
    fn contain_before_its_target() {
        let ops = vec![Operation::edge(11, 2, 500, 10), Operation::node(10, 1)];
        assert!(matches!(
            verify_batch(&ops),
            Err(BatchError::ForwardReference { id: 10, .. })
        ));
    }

    #[test]
    fn self_reference_is_rejected() {
        let ops = vec![Operation::anchored(10, 1, Some(10))];
        assert!(matches!(
            verify_batch(&ops),
            Err(BatchError::ForwardReference { index: 0, id: 10, .. })
        ));
    }

    #[test]
    fn duplicate_insert() {
        let ops = vec![Operation::node(10, 1), Operation::node(10, 1)];
        assert_eq!(
            verify_batch(&ops),
            Err(BatchError::DuplicateId {
                index: 1,
                id: 10,
                first: 0
            })
        );
    }
}
