use log::debug;
use rand::rngs::{SmallRng, StdRng};
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::error::AllocError;
use crate::io::Command;
use crate::memory::Cell;
use crate::paging::{PagingManager, Program};
use crate::segmentation::{Segment, SegmentationManager};
use crate::translation::{AddressTranslator, to_output};
use crate::unit::{Color, OwnerId};

/// The allocation scheme a session simulates
#[derive(Debug)]
pub enum Manager<R = StdRng> {
    Paging(PagingManager<R>),
    Segmentation(SegmentationManager<R>),
}

impl<R> Manager<R> {
    pub fn scheme(&self) -> &'static str {
        match self {
            Manager::Paging(_) => "paging",
            Manager::Segmentation(_) => "segmentation",
        }
    }

    pub fn memory(&self) -> &[Cell] {
        match self {
            Manager::Paging(m) => m.memory(),
            Manager::Segmentation(m) => m.memory(),
        }
    }

    pub fn stats(&self) -> Stats {
        match self {
            Manager::Paging(m) => Stats::Paging {
                total_frames: m.total_frames(),
                free_frames: m.free_frame_count(),
                unaddressable_bytes: m.unaddressable_bytes(),
                internal_fragmentation: m
                    .frame_size()
                    .map_or(0, |fs| m.programs().iter().map(|p| p.internal_fragmentation(fs)).sum()),
            },
            Manager::Segmentation(m) => Stats::Segmentation {
                free_cells: m.free_cell_count(),
                holes: m.free_runs().len(),
                largest_hole: m.largest_free_run(),
            },
        }
    }
}

/// Fragmentation figures printed by the `stats` command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Stats {
    Paging {
        total_frames: usize,
        free_frames: usize,
        unaddressable_bytes: usize,
        /// unused tail bytes summed over all programs
        internal_fragmentation: usize,
    },
    Segmentation {
        free_cells: usize,
        holes: usize,
        largest_hole: usize,
    },
}

/// Result of one executed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Initialized,
    Added(OwnerId),
    Removed,
    Translated { id: OwnerId, offset: usize, address: usize },
    Show,
    Stats(Stats),
    Failed(AllocError),
}

/// Serializable view of the whole simulation state
#[derive(Debug, Serialize)]
#[serde(tag = "scheme", rename_all = "lowercase")]
pub enum Snapshot<'a> {
    Paging {
        frame_size: Option<usize>,
        free_frames: &'a [usize],
        programs: &'a [Program],
        memory: &'a [Cell],
    },
    Segmentation {
        segments: &'a [Segment],
        memory: &'a [Cell],
    },
}

/// Runs script commands against one manager and keeps the translation results
#[derive(Debug)]
pub struct Session<R = StdRng> {
    manager: Manager<R>,
    palette: SmallRng,
    translations: Vec<i64>,
}

impl<R: Rng> Session<R> {
    /// `palette_seed` drives the colors picked for units added without one
    pub fn new(manager: Manager<R>, palette_seed: u64) -> Self {
        Session {
            manager,
            palette: SmallRng::seed_from_u64(palette_seed),
            translations: Vec::new(),
        }
    }

    pub fn manager(&self) -> &Manager<R> {
        &self.manager
    }

    /// Translation results so far, `-1` for failed ones
    pub fn translations(&self) -> &[i64] {
        &self.translations
    }

    pub fn execute(&mut self, command: &Command) -> Outcome {
        debug!("[{}] {}", self.manager.scheme(), command);
        match self.apply(command) {
            Ok(outcome) => outcome,
            Err(e) => Outcome::Failed(e),
        }
    }

    fn apply(&mut self, command: &Command) -> Result<Outcome, AllocError> {
        match (command, &mut self.manager) {
            (Command::Init { memory_size, frame_size: Some(frame_size), os_size }, Manager::Paging(m)) => {
                m.initialize(*memory_size, *frame_size, *os_size)?;
                Ok(Outcome::Initialized)
            }
            (Command::Init { frame_size: None, .. }, Manager::Paging(_)) => Err(AllocError::InvalidParameter(
                "paging init takes memory, frame and OS size".into(),
            )),
            (Command::Init { memory_size, frame_size: None, os_size }, Manager::Segmentation(m)) => {
                m.initialize(*memory_size, *os_size)?;
                Ok(Outcome::Initialized)
            }
            (Command::Init { frame_size: Some(_), .. }, Manager::Segmentation(_)) => Err(
                AllocError::InvalidParameter("segmentation init takes memory and OS size".into()),
            ),
            (Command::Add { name, size, color }, manager) => {
                let color = color.unwrap_or_else(|| Color::random(&mut self.palette));
                let id = match manager {
                    Manager::Paging(m) => m.add_program(name, *size, color)?,
                    Manager::Segmentation(m) => m.add_segment(name, *size, color)?,
                };
                Ok(Outcome::Added(id))
            }
            (Command::Delete { name }, Manager::Paging(m)) => {
                m.delete_program(name)?;
                Ok(Outcome::Removed)
            }
            (Command::Remove { sid }, Manager::Segmentation(m)) => {
                m.remove_segment(*sid)?;
                Ok(Outcome::Removed)
            }
            (Command::Delete { .. }, Manager::Segmentation(_)) => Err(AllocError::Unsupported("segmentation")),
            (Command::Remove { .. }, Manager::Paging(_)) => Err(AllocError::Unsupported("paging")),
            (Command::Translate { id, offset }, manager) => {
                let result = match manager {
                    Manager::Paging(m) => m.translate(*id, *offset),
                    Manager::Segmentation(m) => m.translate(*id, *offset),
                };
                self.translations.push(to_output(&result));
                let address = result?;
                Ok(Outcome::Translated { id: *id, offset: *offset, address })
            }
            (Command::Show, _) => Ok(Outcome::Show),
            (Command::Stats, manager) => Ok(Outcome::Stats(manager.stats())),
        }
    }
}

impl<R> Session<R> {
    pub fn stats(&self) -> Stats {
        self.manager.stats()
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        match &self.manager {
            Manager::Paging(m) => Snapshot::Paging {
                frame_size: m.frame_size(),
                free_frames: m.free_frames(),
                programs: m.programs(),
                memory: m.memory(),
            },
            Manager::Segmentation(m) => Snapshot::Segmentation {
                segments: m.segments(),
                memory: m.memory(),
            },
        }
    }
}
