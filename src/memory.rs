use std::fmt;
use std::ops::Range;

use rand::Rng;
use serde::Serialize;

use crate::unit::OwnerId;

/// Display tag of one memory cell.
///
/// Tags only mirror the allocation state for display and lookup, the
/// managers' programs and segments remain authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Cell {
    Free,
    Os,
    /// `unit` is the page index (paging) or 0 (segmentation), `offset` the
    /// byte position within that page or segment
    Owned { owner: u32, unit: usize, offset: usize },
}

impl Cell {
    #[inline]
    pub fn is_free(&self) -> bool {
        matches!(self, Cell::Free)
    }

    pub fn owner(&self) -> Option<OwnerId> {
        match self {
            Cell::Free => None,
            Cell::Os => Some(OwnerId::System),
            Cell::Owned { owner, .. } => Some(OwnerId::User(*owner)),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Free => write!(f, "Free"),
            Cell::Os => write!(f, "OS"),
            Cell::Owned { owner, unit, offset } => write!(f, "{} - {} - {}", owner, unit, offset),
        }
    }
}

/// Physical memory of the simulation, one tag per addressable cell
#[derive(Debug, Clone, Default)]
pub struct PhysicalMemory {
    cells: Vec<Cell>,
}

impl PhysicalMemory {
    /// Create a memory of `size` cells, all free
    pub fn new(size: usize) -> Self {
        PhysicalMemory {
            cells: vec![Cell::Free; size],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn read(&self, address: usize) -> Cell {
        self.cells[address]
    }

    #[inline]
    pub fn write(&mut self, address: usize, cell: Cell) {
        self.cells[address] = cell;
    }

    /// Tag every cell of `range` with `cell`
    pub fn fill(&mut self, range: Range<usize>, cell: Cell) {
        self.cells[range].fill(cell);
    }

    /// Read-only view of all cells
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Whether `[start, start + size)` lies inside memory and is entirely free
    pub fn is_run_free(&self, start: usize, size: usize) -> bool {
        match start.checked_add(size) {
            Some(end) if end <= self.cells.len() => {
                self.cells[start..end].iter().all(Cell::is_free)
            }
            _ => false,
        }
    }

    /// Addresses of all free cells, ascending
    pub fn free_addresses(&self) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_free())
            .map(|(address, _)| address)
            .collect()
    }

    pub fn free_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_free()).count()
    }

    /// Maximal runs of free cells, ascending by start address
    pub fn free_runs(&self) -> Vec<Range<usize>> {
        let mut runs = Vec::new();
        let mut start = None;
        for (address, cell) in self.cells.iter().enumerate() {
            match (cell.is_free(), start) {
                (true, None) => start = Some(address),
                (false, Some(s)) => {
                    runs.push(s..address);
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            runs.push(s..self.cells.len());
        }
        runs
    }

    /// Calculate the starting address of a frame
    #[inline]
    pub fn frame_to_address(frame: usize, frame_size: usize) -> usize {
        frame * frame_size
    }
}

/// Tracks which frames are available for allocation
#[derive(Debug, Clone, Default)]
pub struct FreeFrameList {
    frames: Vec<usize>,
}

impl FreeFrameList {
    /// All frames `0..total` start out free
    pub fn new(total: usize) -> Self {
        FreeFrameList {
            frames: (0..total).collect(),
        }
    }

    pub fn free_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_free(&self, frame: usize) -> bool {
        self.frames.contains(&frame)
    }

    /// Take a specific frame out of the pool; false if it was not free
    pub fn mark_occupied(&mut self, frame: usize) -> bool {
        match self.frames.iter().position(|&f| f == frame) {
            Some(index) => {
                self.frames.remove(index);
                true
            }
            None => false,
        }
    }

    /// Draw a frame uniformly at random from the pool and remove it
    pub fn take_random<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
        if self.frames.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..self.frames.len());
        Some(self.frames.swap_remove(index))
    }

    /// Draw `count` distinct frames at random, in draw order. Leaves the pool
    /// untouched and returns `None` when fewer than `count` frames are free.
    pub fn take_random_many<R: Rng + ?Sized>(
        &mut self,
        count: usize,
        rng: &mut R,
    ) -> Option<Vec<usize>> {
        if count > self.frames.len() {
            return None;
        }
        let mut taken = Vec::with_capacity(count);
        while taken.len() < count {
            taken.extend(self.take_random(rng));
        }
        Some(taken)
    }

    /// Return a frame to the pool
    pub fn release(&mut self, frame: usize) {
        debug_assert!(!self.frames.contains(&frame), "frame {} released twice", frame);
        self.frames.push(frame);
    }

    pub fn frames(&self) -> &[usize] {
        &self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::SmallRng};
    use std::collections::HashSet;

    #[test]
    fn test_pm_initialization() {
        let pm = PhysicalMemory::new(16);
        assert_eq!(pm.len(), 16);
        assert!(pm.cells().iter().all(Cell::is_free));
        assert_eq!(pm.free_count(), 16);
    }

    #[test]
    fn test_pm_read_write() {
        let mut pm = PhysicalMemory::new(8);
        let owned = Cell::Owned { owner: 2, unit: 1, offset: 3 };
        pm.write(5, owned);
        assert_eq!(pm.read(5), owned);
        assert_eq!(pm.read(5).owner(), Some(OwnerId::User(2)));

        pm.write(5, Cell::Free);
        assert!(pm.read(5).is_free());
    }

    #[test]
    fn test_fill_and_runs() {
        let mut pm = PhysicalMemory::new(20);
        pm.fill(0..4, Cell::Os);
        pm.fill(7..10, Cell::Owned { owner: 0, unit: 0, offset: 0 });
        pm.fill(14..20, Cell::Owned { owner: 1, unit: 0, offset: 0 });

        assert_eq!(pm.free_runs(), vec![4..7, 10..14]);
        assert_eq!(pm.free_count(), 7);
        assert_eq!(pm.free_addresses(), vec![4, 5, 6, 10, 11, 12, 13]);
    }

    #[test]
    fn test_free_run_reaching_end() {
        let mut pm = PhysicalMemory::new(6);
        pm.fill(0..2, Cell::Os);
        assert_eq!(pm.free_runs(), vec![2..6]);
    }

    #[test]
    fn test_is_run_free() {
        let mut pm = PhysicalMemory::new(10);
        pm.fill(0..2, Cell::Os);

        assert!(pm.is_run_free(2, 8));
        assert!(!pm.is_run_free(1, 3)); // overlaps OS
        assert!(!pm.is_run_free(5, 6)); // runs past the end
        assert!(!pm.is_run_free(usize::MAX, 2));
    }

    #[test]
    fn test_frame_to_address() {
        assert_eq!(PhysicalMemory::frame_to_address(0, 4), 0);
        assert_eq!(PhysicalMemory::frame_to_address(3, 4), 12);
        assert_eq!(PhysicalMemory::frame_to_address(10, 512), 5120);
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(Cell::Free.to_string(), "Free");
        assert_eq!(Cell::Os.to_string(), "OS");
        assert_eq!(Cell::Owned { owner: 1, unit: 2, offset: 3 }.to_string(), "1 - 2 - 3");
    }

    #[test]
    fn test_free_frame_list_mark_occupied() {
        let mut ffl = FreeFrameList::new(4);
        assert_eq!(ffl.free_count(), 4);
        assert!(ffl.mark_occupied(0));
        assert!(!ffl.mark_occupied(0));
        assert!(!ffl.is_free(0));
        assert_eq!(ffl.free_count(), 3);
    }

    #[test]
    fn test_take_random_distinct() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut ffl = FreeFrameList::new(32);
        let mut seen = HashSet::new();

        while let Some(frame) = ffl.take_random(&mut rng) {
            assert!(frame < 32);
            assert!(seen.insert(frame), "frame {} handed out twice", frame);
        }
        assert_eq!(seen.len(), 32);
        assert_eq!(ffl.free_count(), 0);
    }

    #[test]
    fn test_take_random_many_is_all_or_nothing() {
        let mut rng = SmallRng::seed_from_u64(9);
        let mut ffl = FreeFrameList::new(3);

        assert_eq!(ffl.take_random_many(5, &mut rng), None);
        assert_eq!(ffl.free_count(), 3);

        let taken = ffl.take_random_many(2, &mut rng).unwrap();
        assert_eq!(taken.len(), 2);
        assert_ne!(taken[0], taken[1]);
        assert_eq!(ffl.free_count(), 1);
        assert!(taken.iter().all(|f| !ffl.is_free(*f)));
    }

    #[test]
    fn test_release() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut ffl = FreeFrameList::new(2);
        let frame = ffl.take_random(&mut rng).unwrap();
        assert!(!ffl.is_free(frame));
        ffl.release(frame);
        assert!(ffl.is_free(frame));
        assert_eq!(ffl.free_count(), 2);
    }
}
