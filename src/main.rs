//! Memory allocation simulator - Main Entry Point
//!
//! Usage: rust-memory-allocation [OPTIONS] <paging|segmentation> [SIZES] <script>
//!
//! The script holds one command per line (`add`, `delete`, `remove`,
//! `translate`, `init`, `show`, `stats`); every command's outcome is printed,
//! followed by the final memory map.
//!
//! Options:
//!   --seed <N>       Reproducible placement
//!   --json           Print the final state as JSON
//!   -o, --output     Write translation results (-1 for errors)
//!   -v, --verbose    More logging, repeatable

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::{ColoredString, Colorize};
use log::{LevelFilter, info};
use rand::SeedableRng;
use rand::rngs::StdRng;

use mem_alloc::io::{Command, Script, write_results};
use mem_alloc::session::{Manager, Outcome, Session, Stats};
use mem_alloc::{
    Cell, Color, DEFAULT_FRAME_SIZE, DEFAULT_MEMORY_SIZE, DEFAULT_OS_SIZE, OwnerId, PagingManager,
    SegmentationManager,
};

#[derive(Parser, Debug)]
#[command(version)]
#[command(about = "Paging and segmentation memory allocation simulator", long_about = None)]
struct Args {
    #[command(subcommand)]
    mode: Mode,

    /// Seed for placement and color choices
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Print the final state as JSON instead of a memory map
    #[arg(long, global = true)]
    json: bool,

    /// Write translation results, space separated, -1 for failed ones
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Print detailed information (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Fixed-size frames, every page in a random free frame
    Paging {
        #[arg(long, default_value_t = DEFAULT_MEMORY_SIZE)]
        memory_size: usize,
        #[arg(long, default_value_t = DEFAULT_FRAME_SIZE)]
        frame_size: usize,
        #[arg(long, default_value_t = DEFAULT_OS_SIZE)]
        os_size: usize,
        script: PathBuf,
    },
    /// Variable-size segments, each in one contiguous free run
    Segmentation {
        #[arg(long, default_value_t = DEFAULT_MEMORY_SIZE)]
        memory_size: usize,
        #[arg(long, default_value_t = DEFAULT_OS_SIZE)]
        os_size: usize,
        script: PathBuf,
    },
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("{} {:#}", "[!]".red(), e);
        process::exit(1);
    }
}

fn level_from_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// RUST_LOG, when set, overrides the -v level
fn init_logging(verbosity: u8) {
    env_logger::Builder::new()
        .filter_level(level_from_verbosity(verbosity))
        .parse_default_env()
        .init();
}

/// Main logic separated from main() for cleaner error handling
fn run(args: &Args) -> Result<()> {
    let seed = args.seed.unwrap_or_else(rand::random);
    info!("Placement seed: {}", seed);
    let rng = StdRng::seed_from_u64(seed);

    let (script_path, manager, init) = match &args.mode {
        Mode::Paging { memory_size, frame_size, os_size, script } => (
            script,
            Manager::Paging(PagingManager::with_rng(rng)),
            Command::Init {
                memory_size: *memory_size,
                frame_size: Some(*frame_size),
                os_size: *os_size,
            },
        ),
        Mode::Segmentation { memory_size, os_size, script } => (
            script,
            Manager::Segmentation(SegmentationManager::with_rng(rng)),
            Command::Init {
                memory_size: *memory_size,
                frame_size: None,
                os_size: *os_size,
            },
        ),
    };

    let script = Script::from_file(script_path)
        .with_context(|| format!("Failed to load script {}", script_path.display()))?;
    info!("{} command(s) in {}", script.commands.len(), script_path.display());

    let mut session = Session::new(manager, seed);
    if let Outcome::Failed(e) = session.execute(&init) {
        return Err(e).context("Failed to initialize memory");
    }

    for (line, command) in &script.commands {
        let outcome = session.execute(command);
        if args.json {
            if let Outcome::Failed(e) = &outcome {
                eprintln!("{} line {}: {}: {}", "[!]".red(), line, command, e);
            }
        } else {
            report(&session, *line, command, &outcome);
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
    } else {
        println!();
        print_units(session.manager());
        print_memory_map(session.manager());
    }

    if let Some(path) = &args.output {
        write_results(path, session.translations())
            .with_context(|| format!("Failed to write results to {}", path.display()))?;
        info!("Results written to: {}", path.display());
    }

    Ok(())
}

fn report(session: &Session, line: usize, command: &Command, outcome: &Outcome) {
    match outcome {
        Outcome::Initialized => println!("{} {}: memory ready", "[+]".green(), command),
        Outcome::Added(id) => println!("{} {}: id {}", "[+]".green(), command, id),
        Outcome::Removed => println!("{} {}: removed", "[+]".green(), command),
        Outcome::Translated { address, .. } => {
            println!("{} {}: physical address {}", "[+]".green(), command, address)
        }
        Outcome::Show => {
            println!("{} {}", "[*]".blue(), command);
            print_units(session.manager());
            print_memory_map(session.manager());
        }
        Outcome::Stats(stats) => println!("{} {}: {}", "[*]".blue(), command, describe_stats(stats)),
        Outcome::Failed(e) => println!("{} line {}: {}: {}", "[!]".red(), line, command, e),
    }
}

fn describe_stats(stats: &Stats) -> String {
    match stats {
        Stats::Paging { total_frames, free_frames, unaddressable_bytes, internal_fragmentation } => format!(
            "{}/{} frame(s) free, {} unaddressable byte(s), {} byte(s) lost inside last pages",
            free_frames, total_frames, unaddressable_bytes, internal_fragmentation
        ),
        Stats::Segmentation { free_cells, holes, largest_hole } => format!(
            "{} free cell(s) in {} hole(s), largest hole {}",
            free_cells, holes, largest_hole
        ),
    }
}

fn paint(text: String, color: Color) -> ColoredString {
    text.black().on_truecolor(color.r, color.g, color.b)
}

/// Name and color of the unit owning a cell, if it is still resident
fn owner_of(manager: &Manager, owner: OwnerId) -> Option<(&str, Color)> {
    match manager {
        Manager::Paging(m) => m.find_program_by_pid(owner).map(|p| (p.name(), p.color())),
        Manager::Segmentation(m) => m.find_segment_by_sid(owner).map(|s| (s.name(), s.color())),
    }
}

fn cell_label(manager: &Manager, cell: &Cell) -> ColoredString {
    match *cell {
        Cell::Free => "Free".normal(),
        Cell::Os => paint("OS".to_string(), Color::LIGHT_GRAY),
        Cell::Owned { owner, unit, offset } => {
            let (name, color) = owner_of(manager, OwnerId::User(owner)).unwrap_or(("?", Color::LIGHT_GRAY));
            let text = match manager {
                Manager::Paging(_) => format!("PID {} - Page {} - {} ({})", owner, unit, offset, name),
                Manager::Segmentation(_) => format!("SID {} - {} ({})", owner, offset, name),
            };
            paint(text, color)
        }
    }
}

fn print_memory_map(manager: &Manager) {
    let frame_size = match manager {
        Manager::Paging(m) => m.frame_size(),
        Manager::Segmentation(_) => None,
    };

    for (address, cell) in manager.memory().iter().enumerate() {
        if let Some(fs) = frame_size {
            if address % fs == 0 {
                println!("{}", format!("-- frame {} --", address / fs).dimmed());
            }
        }
        println!("@{:<5} {}", address, cell_label(manager, cell));
    }
}

fn print_units(manager: &Manager) {
    match manager {
        Manager::Paging(m) => {
            println!("{:<5} {:<12} {:>6}  pages (page -> frame)", "PID", "Name", "Size");
            for program in m.programs() {
                let pages: Vec<String> = program
                    .pages()
                    .iter()
                    .map(|p| format!("{}->{}", p.page_index(), p.frame_index()))
                    .collect();
                println!(
                    "{:<5} {:<12} {:>6}  {}",
                    program.pid().to_string(),
                    paint(program.name().to_string(), program.color()),
                    program.size(),
                    pages.join(" ")
                );
            }
        }
        Manager::Segmentation(m) => {
            println!("{:<5} {:<12} {:>7} {:>6}", "SID", "Name", "Address", "Length");
            for segment in m.segments() {
                println!(
                    "{:<5} {:<12} {:>7} {:>6}",
                    segment.sid().to_string(),
                    paint(segment.name().to_string(), segment.color()),
                    segment.address(),
                    segment.length()
                );
            }
        }
    }
    println!();
}
