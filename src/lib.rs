pub mod constants;
pub mod error;
pub mod io;
pub mod memory;
pub mod paging;
pub mod segmentation;
pub mod session;
pub mod translation;
pub mod unit;
pub mod util;

// Re-export commonly used items for convenience
pub use constants::*;
pub use error::{AllocError, ErrorKind};
pub use memory::Cell;
pub use paging::{Page, PagingManager, Program};
pub use segmentation::{Segment, SegmentationManager};
pub use translation::{AddressTranslator, PageSplit};
pub use unit::{Color, OwnerId};
