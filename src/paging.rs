//! Fixed-size paging: memory is cut into frames and every page of a program
//! lands in a frame drawn at random from the free pool, so programs end up
//! scattered across memory.

use log::{debug, info, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::constants::{MIN_UNIT_SIZE, OS_NAME};
use crate::error::AllocError;
use crate::memory::{Cell, FreeFrameList, PhysicalMemory};
use crate::translation::{AddressTranslator, PageSplit};
use crate::unit::{Color, OwnerId, names_match, validate_name};
use crate::util::ceil_div;

/// One page of a program, bound to the frame holding its bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    page_index: usize,
    frame_index: usize,
    present: bool,
}

impl Page {
    pub fn new(page_index: usize, frame_index: usize) -> Self {
        Page {
            page_index,
            frame_index,
            present: false,
        }
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Always true for pages created by the manager; kept separate for a
    /// future eviction policy
    pub fn is_present(&self) -> bool {
        self.present
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Program {
    pid: OwnerId,
    name: String,
    size: usize,
    color: Color,
    pages: Vec<Page>,
}

impl Program {
    fn new(pid: OwnerId, name: &str, size: usize, color: Color) -> Self {
        Program {
            pid,
            name: name.to_string(),
            size,
            color,
            pages: Vec::new(),
        }
    }

    /// Attach a page and mark it present
    fn add_page(&mut self, mut page: Page) {
        page.present = true;
        self.pages.push(page);
    }

    pub fn pid(&self) -> OwnerId {
        self.pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// Pages in page-index order
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, page_index: usize) -> Option<&Page> {
        self.pages.get(page_index)
    }

    /// Bytes of the last frame the program owns but does not use
    pub fn internal_fragmentation(&self, frame_size: usize) -> usize {
        self.pages.len() * frame_size - self.size
    }
}

#[derive(Debug, Clone)]
struct PagingState {
    frame_size: usize,
    total_frames: usize,
    memory: PhysicalMemory,
    programs: Vec<Program>,
    free_frames: FreeFrameList,
    next_pid: u32,
}

impl PagingState {
    fn find(&self, pid: OwnerId) -> Option<&Program> {
        self.programs.iter().find(|program| program.pid == pid)
    }

    /// Tag every cell of `frame` with `cell_for(byte_in_frame)`
    fn tag_frame(&mut self, frame: usize, cell_for: impl Fn(usize) -> Cell) {
        let start = PhysicalMemory::frame_to_address(frame, self.frame_size);
        for i in 0..self.frame_size {
            self.memory.write(start + i, cell_for(i));
        }
    }
}

/// Paging simulation. Starts uninitialized; every mutating call other than
/// [`PagingManager::initialize`] fails until the first initialize.
#[derive(Debug)]
pub struct PagingManager<R = StdRng> {
    rng: R,
    state: Option<PagingState>,
}

impl PagingManager<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl Default for PagingManager<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> PagingManager<R> {
    /// Use `rng` for every placement decision
    pub fn with_rng(rng: R) -> Self {
        PagingManager { rng, state: None }
    }

    /// Reset the simulation: `memory_size / frame_size` frames, the OS
    /// occupying the first `ceil(os_size / frame_size)` of them.
    ///
    /// Bytes past the last full frame are never handed out. On error the
    /// previous simulation, if any, is kept as is.
    pub fn initialize(&mut self, memory_size: usize, frame_size: usize, os_size: usize) -> Result<(), AllocError> {
        if frame_size == 0 {
            return Err(AllocError::InvalidParameter("frame size must be at least 1".into()));
        }
        if memory_size == 0 {
            return Err(AllocError::InvalidParameter("memory size must be at least 1".into()));
        }
        if os_size == 0 {
            return Err(AllocError::InvalidParameter("OS size must be at least 1".into()));
        }

        let total_frames = memory_size / frame_size;
        let os_frames = ceil_div(os_size, frame_size);
        if os_frames > total_frames {
            return Err(AllocError::OsTooLarge {
                needed: os_frames,
                total: total_frames,
            });
        }

        let mut state = PagingState {
            frame_size,
            total_frames,
            memory: PhysicalMemory::new(memory_size),
            programs: Vec::new(),
            free_frames: FreeFrameList::new(total_frames),
            next_pid: 0,
        };

        // the OS sits in the lowest frames, page i in frame i
        let mut os = Program::new(OwnerId::System, OS_NAME, os_size, Color::LIGHT_GRAY);
        for page_index in 0..os_frames {
            state.free_frames.mark_occupied(page_index);
            state.tag_frame(page_index, |_| Cell::Os);
            os.add_page(Page::new(page_index, page_index));
        }
        state.programs.push(os);

        info!(
            "Paging initialized: {} bytes, {} frames of {} bytes, OS in {} frame(s), {} unaddressable byte(s)",
            memory_size,
            total_frames,
            frame_size,
            os_frames,
            memory_size - total_frames * frame_size
        );
        self.state = Some(state);
        Ok(())
    }

    /// Load a program of `size` bytes, each page into a random free frame.
    /// Returns the new PID.
    pub fn add_program(&mut self, name: &str, size: usize, color: Color) -> Result<OwnerId, AllocError> {
        let state = self.state.as_mut().ok_or(AllocError::Uninitialized)?;

        validate_name(name, state.programs.iter().map(Program::name))?;
        if size < MIN_UNIT_SIZE {
            return Err(AllocError::InvalidSize { size, min: MIN_UNIT_SIZE });
        }

        let needed = ceil_div(size, state.frame_size);
        let available = state.free_frames.free_count();
        let Some(frames) = state.free_frames.take_random_many(needed, &mut self.rng) else {
            warn!("Cannot load '{}': needs {} frame(s), {} free", name, needed, available);
            return Err(AllocError::NotEnoughFrames { needed, available });
        };

        let pid = state.next_pid;
        state.next_pid += 1;

        let mut program = Program::new(OwnerId::User(pid), name, size, color);
        for (page_index, &frame) in frames.iter().enumerate() {
            state.tag_frame(frame, |offset| Cell::Owned {
                owner: pid,
                unit: page_index,
                offset,
            });
            program.add_page(Page::new(page_index, frame));
        }

        debug!("Loaded '{}' as PID {} into frames {:?}", name, pid, frames);
        state.programs.push(program);
        Ok(OwnerId::User(pid))
    }

    /// Unload a program by name (case-insensitive) and return its frames to the pool
    pub fn delete_program(&mut self, name: &str) -> Result<(), AllocError> {
        let state = self.state.as_mut().ok_or(AllocError::Uninitialized)?;

        let index = state
            .programs
            .iter()
            .position(|program| names_match(&program.name, name))
            .ok_or_else(|| AllocError::ProgramNotFound(name.to_string()))?;
        if state.programs[index].pid.is_system() {
            return Err(AllocError::Protected);
        }

        let program = state.programs.remove(index);
        for page in &program.pages {
            state.tag_frame(page.frame_index, |_| Cell::Free);
            state.free_frames.release(page.frame_index);
        }

        debug!(
            "Deleted '{}' (PID {}), {} frame(s) released",
            program.name,
            program.pid,
            program.pages.len()
        );
        Ok(())
    }

    /// Physical address of byte `offset` of program `pid`
    pub fn translate_address(&self, pid: OwnerId, offset: usize) -> Result<usize, AllocError> {
        let state = self.state.as_ref().ok_or(AllocError::Uninitialized)?;
        let program = state.find(pid).ok_or(AllocError::UnknownProgram(pid))?;

        if offset >= program.size {
            return Err(AllocError::OutOfRange {
                offset,
                limit: program.size,
            });
        }

        let split = PageSplit::from_offset(offset, state.frame_size);
        trace!("PID {}: {}", pid, split);
        let page = program.page(split.page).ok_or(AllocError::OutOfRange {
            offset,
            limit: program.pages.len() * state.frame_size,
        })?;
        if !page.present {
            return Err(AllocError::PageNotPresent {
                owner: pid,
                page: split.page,
            });
        }

        Ok(PhysicalMemory::frame_to_address(page.frame_index, state.frame_size) + split.in_page)
    }
}

impl<R> PagingManager<R> {
    pub fn is_ready(&self) -> bool {
        self.state.is_some()
    }

    pub fn frame_size(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.frame_size)
    }

    pub fn total_frames(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.total_frames)
    }

    pub fn free_frame_count(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.free_frames.free_count())
    }

    /// Free frame indices, in pool order
    pub fn free_frames(&self) -> &[usize] {
        self.state.as_ref().map(|s| s.free_frames.frames()).unwrap_or_default()
    }

    /// Bytes beyond the last full frame
    pub fn unaddressable_bytes(&self) -> usize {
        self.state
            .as_ref()
            .map_or(0, |s| s.memory.len() - s.total_frames * s.frame_size)
    }

    /// Resident programs in creation order, OS first
    pub fn programs(&self) -> &[Program] {
        self.state.as_ref().map(|s| s.programs.as_slice()).unwrap_or_default()
    }

    /// Cell tags, one per byte of memory
    pub fn memory(&self) -> &[Cell] {
        self.state.as_ref().map(|s| s.memory.cells()).unwrap_or_default()
    }

    pub fn find_program_by_pid(&self, pid: OwnerId) -> Option<&Program> {
        self.state.as_ref().and_then(|s| s.find(pid))
    }

    pub fn find_program_by_name(&self, name: &str) -> Option<&Program> {
        self.programs().iter().find(|p| names_match(&p.name, name))
    }

    pub fn is_program_name_taken(&self, name: &str) -> bool {
        self.find_program_by_name(name).is_some()
    }
}

impl<R: Rng> AddressTranslator for PagingManager<R> {
    fn translate(&self, id: OwnerId, offset: usize) -> Result<usize, AllocError> {
        self.translate_address(id, offset)
    }
}
