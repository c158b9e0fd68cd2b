use crate::constants::INVALID_ADDRESS;
use crate::error::AllocError;
use crate::unit::OwnerId;

/// A program offset split into its page number and the position inside that page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSplit {
    pub offset: usize,
    pub page: usize,
    pub in_page: usize,
}

impl PageSplit {
    /// Decompose a logical offset for a given frame size
    pub fn from_offset(offset: usize, frame_size: usize) -> Self {
        PageSplit {
            offset,
            page: offset / frame_size,
            in_page: offset % frame_size,
        }
    }
}

impl std::fmt::Display for PageSplit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "offset({}) = (page={}, w={})", self.offset, self.page, self.in_page)
    }
}

/// Logical-to-physical translation shared by the paging and segmentation managers
pub trait AddressTranslator {
    /// Physical address of byte `offset` of unit `id`
    fn translate(&self, id: OwnerId, offset: usize) -> Result<usize, AllocError>;
}

/// Translate a batch of (unit, offset) queries, one result per query
pub fn translate_batch<T>(translator: &T, queries: &[(OwnerId, usize)]) -> Vec<Result<usize, AllocError>>
where
    T: AddressTranslator + ?Sized,
{
    queries
        .iter()
        .map(|&(id, offset)| translator.translate(id, offset))
        .collect()
}

/// Convert to the output format (-1 for errors, PA otherwise)
pub fn to_output(result: &Result<usize, AllocError>) -> i64 {
    match result {
        Ok(pa) => *pa as i64,
        Err(_) => INVALID_ADDRESS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Translator over a fixed base/limit table
    struct BaseLimit(HashMap<OwnerId, (usize, usize)>);

    impl AddressTranslator for BaseLimit {
        fn translate(&self, id: OwnerId, offset: usize) -> Result<usize, AllocError> {
            let &(base, limit) = self.0.get(&id).ok_or(AllocError::SegmentNotFound(id))?;
            if offset >= limit {
                return Err(AllocError::OutOfRange { offset, limit });
            }
            Ok(base + offset)
        }
    }

    #[test]
    fn test_page_split() {
        let split = PageSplit::from_offset(4, 4);
        assert_eq!(split.page, 1);
        assert_eq!(split.in_page, 0);

        let split = PageSplit::from_offset(2999, 512);
        assert_eq!(split.page, 5);
        assert_eq!(split.in_page, 439);
    }

    #[test]
    fn test_page_split_reconstruction() {
        for frame_size in [1, 3, 4, 512] {
            for offset in [0, 1, 7, 100, 2999] {
                let split = PageSplit::from_offset(offset, frame_size);
                assert_eq!(split.page * frame_size + split.in_page, offset);
                assert!(split.in_page < frame_size);
            }
        }
    }

    #[test]
    fn test_display() {
        let display = PageSplit::from_offset(10, 4).to_string();
        assert!(display.contains("offset(10)"));
        assert!(display.contains("page=2"));
        assert!(display.contains("w=2"));
    }

    #[test]
    fn test_to_output() {
        assert_eq!(to_output(&Ok(4608)), 4608);
        assert_eq!(to_output(&Err(AllocError::Protected)), -1);
        assert_eq!(to_output(&Err(AllocError::OutOfRange { offset: 3, limit: 3 })), -1);
    }

    #[test]
    fn test_translate_batch() {
        let table = BaseLimit(HashMap::from([
            (OwnerId::System, (0, 4)),
            (OwnerId::User(0), (10, 3)),
        ]));

        let results = translate_batch(
            &table,
            &[
                (OwnerId::System, 3),
                (OwnerId::User(0), 2),
                (OwnerId::User(0), 3),
                (OwnerId::User(9), 0),
            ],
        );
        let output: Vec<i64> = results.iter().map(to_output).collect();
        assert_eq!(output, vec![3, 12, -1, -1]);
        assert_eq!(results[3], Err(AllocError::SegmentNotFound(OwnerId::User(9))));
    }

    #[test]
    fn test_translate_batch_empty() {
        let table = BaseLimit(HashMap::new());
        assert!(translate_batch(&table, &[]).is_empty());
    }
}
