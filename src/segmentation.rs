//! Variable-size segmentation: each segment occupies one contiguous run of
//! cells. Start addresses are drawn at random among the free cells and
//! rejected until one leaves room for the whole segment.

use std::ops::Range;

use log::{debug, info, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::constants::{MIN_UNIT_SIZE, OS_NAME};
use crate::error::AllocError;
use crate::memory::{Cell, PhysicalMemory};
use crate::translation::AddressTranslator;
use crate::unit::{Color, OwnerId, names_match, validate_name};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    sid: OwnerId,
    name: String,
    address: usize,
    length: usize,
    present: bool,
    color: Color,
}

impl Segment {
    fn new(sid: OwnerId, name: &str, address: usize, length: usize, color: Color) -> Self {
        Segment {
            sid,
            name: name.to_string(),
            address,
            length,
            present: false,
            color,
        }
    }

    pub fn sid(&self) -> OwnerId {
        self.sid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Physical start address
    pub fn address(&self) -> usize {
        self.address
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// Physical cells covered by the segment
    pub fn range(&self) -> Range<usize> {
        self.address..self.address + self.length
    }
}

#[derive(Debug, Clone)]
struct SegmentationState {
    memory: PhysicalMemory,
    segments: Vec<Segment>,
    next_sid: u32,
}

impl SegmentationState {
    fn find(&self, sid: OwnerId) -> Option<&Segment> {
        self.segments.iter().find(|segment| segment.sid == sid)
    }
}

/// Pick a random free cell, keep it if `size` cells starting there are free,
/// otherwise drop that candidate and draw again
fn find_random_start<R: Rng + ?Sized>(memory: &PhysicalMemory, size: usize, rng: &mut R) -> Option<usize> {
    let mut candidates = memory.free_addresses();
    while !candidates.is_empty() {
        let index = rng.gen_range(0..candidates.len());
        let start = candidates[index];
        if memory.is_run_free(start, size) {
            return Some(start);
        }
        trace!("Start address {} has no room for {} cell(s)", start, size);
        candidates.swap_remove(index);
    }
    None
}

/// Segmentation simulation, same lifecycle as the paging manager.
#[derive(Debug)]
pub struct SegmentationManager<R = StdRng> {
    rng: R,
    state: Option<SegmentationState>,
}

impl SegmentationManager<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl Default for SegmentationManager<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> SegmentationManager<R> {
    pub fn with_rng(rng: R) -> Self {
        SegmentationManager { rng, state: None }
    }

    /// Reset memory to `memory_size` free cells and place the OS segment at address 0
    pub fn initialize(&mut self, memory_size: usize, os_size: usize) -> Result<(), AllocError> {
        if memory_size == 0 {
            return Err(AllocError::InvalidParameter("memory size must be at least 1".into()));
        }
        if os_size == 0 {
            return Err(AllocError::InvalidParameter("OS size must be at least 1".into()));
        }
        if os_size > memory_size {
            return Err(AllocError::OsExceedsMemory { os_size, memory_size });
        }

        let mut memory = PhysicalMemory::new(memory_size);
        memory.fill(0..os_size, Cell::Os);

        let mut os = Segment::new(OwnerId::System, OS_NAME, 0, os_size, Color::LIGHT_GRAY);
        os.present = true;

        info!("Segmentation initialized: {} cells, OS in [0, {})", memory_size, os_size);
        self.state = Some(SegmentationState {
            memory,
            segments: vec![os],
            next_sid: 0,
        });
        Ok(())
    }

    /// Place a segment of `size` cells in one contiguous free run. Returns the new SID.
    pub fn add_segment(&mut self, name: &str, size: usize, color: Color) -> Result<OwnerId, AllocError> {
        let state = self.state.as_mut().ok_or(AllocError::Uninitialized)?;

        validate_name(name, state.segments.iter().map(Segment::name))?;
        if size < MIN_UNIT_SIZE {
            return Err(AllocError::InvalidSize { size, min: MIN_UNIT_SIZE });
        }

        let available = state.memory.free_count();
        if size > available {
            warn!("Cannot place '{}': needs {} cell(s), {} free", name, size, available);
            return Err(AllocError::NotEnoughMemory {
                requested: size,
                available,
            });
        }
        let Some(address) = find_random_start(&state.memory, size, &mut self.rng) else {
            warn!(
                "Cannot place '{}': {} cell(s) free but no run of {}",
                name, available, size
            );
            return Err(AllocError::Fragmented {
                requested: size,
                free: available,
            });
        };

        let sid = state.next_sid;
        state.next_sid += 1;

        for offset in 0..size {
            state.memory.write(address + offset, Cell::Owned { owner: sid, unit: 0, offset });
        }
        let mut segment = Segment::new(OwnerId::User(sid), name, address, size, color);
        segment.present = true;

        debug!("Placed '{}' as SID {} at [{}, {})", name, sid, address, address + size);
        state.segments.push(segment);
        Ok(OwnerId::User(sid))
    }

    /// Free the cells of segment `sid`
    pub fn remove_segment(&mut self, sid: OwnerId) -> Result<(), AllocError> {
        let state = self.state.as_mut().ok_or(AllocError::Uninitialized)?;
        if sid.is_system() {
            return Err(AllocError::Protected);
        }

        let index = state
            .segments
            .iter()
            .position(|segment| segment.sid == sid)
            .ok_or(AllocError::SegmentNotFound(sid))?;
        let segment = state.segments.remove(index);
        state.memory.fill(segment.range(), Cell::Free);

        debug!(
            "Removed '{}' (SID {}), [{}, {}) is free again",
            segment.name,
            sid,
            segment.address,
            segment.address + segment.length
        );
        Ok(())
    }

    /// Physical address of cell `offset` of segment `sid`
    pub fn translate_address(&self, sid: OwnerId, offset: usize) -> Result<usize, AllocError> {
        let state = self.state.as_ref().ok_or(AllocError::Uninitialized)?;
        let segment = state.find(sid).ok_or(AllocError::SegmentNotFound(sid))?;

        if !segment.present {
            return Err(AllocError::SegmentNotPresent(sid));
        }
        if offset >= segment.length {
            return Err(AllocError::OutOfRange {
                offset,
                limit: segment.length,
            });
        }
        Ok(segment.address + offset)
    }
}

impl<R> SegmentationManager<R> {
    pub fn is_ready(&self) -> bool {
        self.state.is_some()
    }

    /// Resident segments in creation order, OS first
    pub fn segments(&self) -> &[Segment] {
        self.state.as_ref().map(|s| s.segments.as_slice()).unwrap_or_default()
    }

    pub fn memory(&self) -> &[Cell] {
        self.state.as_ref().map(|s| s.memory.cells()).unwrap_or_default()
    }

    pub fn free_cell_count(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.memory.free_count())
    }

    /// Holes between segments, ascending
    pub fn free_runs(&self) -> Vec<Range<usize>> {
        self.state.as_ref().map(|s| s.memory.free_runs()).unwrap_or_default()
    }

    /// Size of the biggest segment that could still be placed
    pub fn largest_free_run(&self) -> usize {
        self.free_runs().iter().map(|run| run.len()).max().unwrap_or(0)
    }

    pub fn find_segment_by_sid(&self, sid: OwnerId) -> Option<&Segment> {
        self.state.as_ref().and_then(|s| s.find(sid))
    }

    pub fn find_segment_by_name(&self, name: &str) -> Option<&Segment> {
        self.segments().iter().find(|s| names_match(&s.name, name))
    }

    pub fn is_segment_name_taken(&self, name: &str) -> bool {
        self.find_segment_by_name(name).is_some()
    }
}

impl<R: Rng> AddressTranslator for SegmentationManager<R> {
    fn translate(&self, id: OwnerId, offset: usize) -> Result<usize, AllocError> {
        self.translate_address(id, offset)
    }
}
