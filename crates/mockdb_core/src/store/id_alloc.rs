//! Identifier allocation.
//!
//! Allocation is `max(existing) + 1`, or `0` for an empty store. Gaps left
//! by deletions are never refilled, and deleting the current maximum makes
//! its id available again. Round-trip tests rely on this exact scheme.
//!
//! Once `RecordId::MAX` is in use nothing can be allocated above it; the
//! allocator reports exhaustion instead of wrapping back onto id 0.

use crate::model::kind::RecordId;
use crate::repo::record_repo::{RepoError, RepoResult};

/// Returns the next identifier for the given set of ids in use.
///
/// # Errors
/// - `IdSpaceExhausted` when `RecordId::MAX` is already taken.
pub fn next_id<I>(existing: I) -> RepoResult<RecordId>
where
    I: IntoIterator<Item = RecordId>,
{
    match existing.into_iter().max() {
        None => Ok(0),
        Some(max) => max.checked_add(1).ok_or(RepoError::IdSpaceExhausted),
    }
}

#[cfg(test)]
mod tests {
    use super::next_id;
    use crate::repo::record_repo::RepoError;

    #[test]
    fn empty_set_starts_at_zero() {
        assert_eq!(next_id(Vec::new()), Ok(0));
    }

    #[test]
    fn gaps_are_not_filled() {
        assert_eq!(next_id([0, 1, 3]), Ok(4));
        assert_eq!(next_id([5]), Ok(6));
    }

    #[test]
    fn order_does_not_matter() {
        assert_eq!(next_id([3, 0, 1]), next_id([0, 1, 3]));
    }

    #[test]
    fn maximum_id_exhausts_the_allocator() {
        assert_eq!(next_id([0, u64::MAX]), Err(RepoError::IdSpaceExhausted));
        assert_eq!(next_id([u64::MAX - 1]), Ok(u64::MAX));
    }
}
