use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::Serialize;

use crate::constants::OS_NAME;
use crate::error::AllocError;

/// Identity of a resident unit (program or segment).
///
/// The operating system is kept out of the user-visible id sequence, which
/// starts at 0 on every initialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum OwnerId {
    System,
    User(u32),
}

impl OwnerId {
    pub fn is_system(&self) -> bool {
        matches!(self, OwnerId::System)
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnerId::System => write!(f, "{}", OS_NAME),
            OwnerId::User(id) => write!(f, "{}", id),
        }
    }
}

impl FromStr for OwnerId {
    type Err = String;

    /// Accepts `OS` (any case) or a non-negative integer
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(OS_NAME) {
            return Ok(OwnerId::System);
        }
        s.parse::<u32>()
            .map(OwnerId::User)
            .map_err(|_| format!("Invalid unit id: {}", s))
    }
}

/// Display color of a unit, plain 8-bit RGB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const LIGHT_GRAY: Color = Color::rgb(192, 192, 192);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    /// Random opaque color, kept away from the darkest shades so labels stay
    /// readable on top of it
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Color {
            r: rng.gen_range(64..=255),
            g: rng.gen_range(64..=255),
            b: rng.gen_range(64..=255),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().strip_prefix('#').unwrap_or(s.trim());
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("Invalid color: {}", s));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| format!("Invalid color: {}", s))
        };
        Ok(Color {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

/// Case-insensitive name comparison used for admission checks
pub fn names_match(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Check a requested name against the names of the currently resident units.
pub fn validate_name<'a, I>(name: &str, resident: I) -> Result<(), AllocError>
where
    I: IntoIterator<Item = &'a str>,
{
    if name.trim().is_empty() {
        return Err(AllocError::EmptyName);
    }
    if resident.into_iter().any(|existing| names_match(existing, name)) {
        return Err(AllocError::DuplicateName(name.to_string()));
    }
    Ok(())
}
