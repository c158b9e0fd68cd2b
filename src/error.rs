use thiserror::Error;

use crate::unit::OwnerId;

/// Coarse classification of an [`AllocError`], for callers that pick their
/// messaging by category rather than by variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Capacity,
    Fragmentation,
    NotFound,
    Protected,
    OutOfRange,
    NotPresent,
    NotReady,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    #[error("simulation has not been initialized")]
    Uninitialized,
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("name must not be empty")]
    EmptyName,
    #[error("name already in use: {0}")]
    DuplicateName(String),
    #[error("size must be at least {min}, got {size}")]
    InvalidSize { size: usize, min: usize },
    #[error("operating system needs {needed} frame(s) but memory only has {total}")]
    OsTooLarge { needed: usize, total: usize },
    #[error("operating system size {os_size} exceeds memory size {memory_size}")]
    OsExceedsMemory { os_size: usize, memory_size: usize },
    #[error("not enough free frames: need {needed}, {available} free")]
    NotEnoughFrames { needed: usize, available: usize },
    #[error("not enough free memory: need {requested} cell(s), {available} free")]
    NotEnoughMemory { requested: usize, available: usize },
    #[error("no contiguous free run of {requested} cell(s) ({free} free in total)")]
    Fragmented { requested: usize, free: usize },
    #[error("program not found: {0}")]
    ProgramNotFound(String),
    #[error("no resident program with id {0}")]
    UnknownProgram(OwnerId),
    #[error("no resident segment with id {0}")]
    SegmentNotFound(OwnerId),
    #[error("the operating system unit cannot be removed")]
    Protected,
    #[error("offset {offset} is outside the unit (size {limit})")]
    OutOfRange { offset: usize, limit: usize },
    #[error("page {page} of {owner} is not present in memory")]
    PageNotPresent { owner: OwnerId, page: usize },
    #[error("segment {0} is not present in memory")]
    SegmentNotPresent(OwnerId),
    #[error("operation not supported by {0}")]
    Unsupported(&'static str),
}

impl AllocError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AllocError::Uninitialized => ErrorKind::NotReady,
            AllocError::InvalidParameter(_)
            | AllocError::EmptyName
            | AllocError::DuplicateName(_)
            | AllocError::InvalidSize { .. }
            | AllocError::Unsupported(_) => ErrorKind::Validation,
            AllocError::OsTooLarge { .. }
            | AllocError::OsExceedsMemory { .. }
            | AllocError::NotEnoughFrames { .. }
            | AllocError::NotEnoughMemory { .. } => ErrorKind::Capacity,
            AllocError::Fragmented { .. } => ErrorKind::Fragmentation,
            AllocError::ProgramNotFound(_)
            | AllocError::UnknownProgram(_)
            | AllocError::SegmentNotFound(_) => ErrorKind::NotFound,
            AllocError::Protected => ErrorKind::Protected,
            AllocError::OutOfRange { .. } => ErrorKind::OutOfRange,
            AllocError::PageNotPresent { .. } | AllocError::SegmentNotPresent(_) => {
                ErrorKind::NotPresent
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(AllocError::EmptyName.kind(), ErrorKind::Validation);
        assert_eq!(
            AllocError::NotEnoughFrames { needed: 5, available: 3 }.kind(),
            ErrorKind::Capacity
        );
        assert_eq!(
            AllocError::Fragmented { requested: 5, free: 7 }.kind(),
            ErrorKind::Fragmentation
        );
        assert_eq!(AllocError::SegmentNotFound(OwnerId::User(3)).kind(), ErrorKind::NotFound);
        assert_eq!(AllocError::Protected.kind(), ErrorKind::Protected);
        assert_eq!(AllocError::Uninitialized.kind(), ErrorKind::NotReady);
    }

    #[test]
    fn test_display() {
        let err = AllocError::NotEnoughFrames { needed: 5, available: 3 };
        assert_eq!(err.to_string(), "not enough free frames: need 5, 3 free");

        let err = AllocError::UnknownProgram(OwnerId::User(7));
        assert_eq!(err.to_string(), "no resident program with id 7");
    }
}
