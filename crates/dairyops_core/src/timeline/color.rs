//! Deterministic resource coloring.
//!
//! Two tasks with the same resource text always get the same color. Distinct
//! names may collide; that is acceptable.

/// Ordered bar palette. Order is part of the hashing contract.
pub const PALETTE: [ResourceColor; 12] = [
    ResourceColor::Blue,
    ResourceColor::Green,
    ResourceColor::Indigo,
    ResourceColor::Yellow,
    ResourceColor::Red,
    ResourceColor::Purple,
    ResourceColor::Pink,
    ResourceColor::Teal,
    ResourceColor::Orange,
    ResourceColor::Cyan,
    ResourceColor::Lime,
    ResourceColor::Rose,
];

/// Bar color for a resource row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceColor {
    Blue,
    Green,
    Indigo,
    Yellow,
    Red,
    Purple,
    Pink,
    Teal,
    Orange,
    Cyan,
    Lime,
    Rose,
    /// Used for rows without a resource; never produced by hashing.
    Neutral,
}

impl ResourceColor {
    /// Utility class name understood by the web front end.
    pub fn css_class(self) -> &'static str {
        match self {
            Self::Blue => "bg-blue-500",
            Self::Green => "bg-green-500",
            Self::Indigo => "bg-indigo-500",
            Self::Yellow => "bg-yellow-500",
            Self::Red => "bg-red-500",
            Self::Purple => "bg-purple-500",
            Self::Pink => "bg-pink-500",
            Self::Teal => "bg-teal-500",
            Self::Orange => "bg-orange-500",
            Self::Cyan => "bg-cyan-600",
            Self::Lime => "bg-lime-600",
            Self::Rose => "bg-rose-500",
            Self::Neutral => "bg-slate-400",
        }
    }

    pub fn hex(self) -> &'static str {
        match self {
            Self::Blue => "#3b82f6",
            Self::Green => "#22c55e",
            Self::Indigo => "#6366f1",
            Self::Yellow => "#eab308",
            Self::Red => "#ef4444",
            Self::Purple => "#a855f7",
            Self::Pink => "#ec4899",
            Self::Teal => "#14b8a6",
            Self::Orange => "#f97316",
            Self::Cyan => "#0891b2",
            Self::Lime => "#65a30d",
            Self::Rose => "#f43f5e",
            Self::Neutral => "#94a3b8",
        }
    }
}

/// Returns the palette color for a resource name.
pub fn color_for(name: &str) -> ResourceColor {
    if name.is_empty() {
        return ResourceColor::Neutral;
    }
    PALETTE[palette_index(name)]
}

/// [`color_for`] for an optional name; `None` is neutral.
pub fn color_for_opt(name: Option<&str>) -> ResourceColor {
    name.map_or(ResourceColor::Neutral, color_for)
}

/// `hash = unit + ((hash << 5) - hash)` over UTF-16 code units with wrapping
/// 32-bit signed arithmetic, then `|hash| mod len`.
fn palette_index(name: &str) -> usize {
    let hash = name.encode_utf16().fold(0_i32, |hash, unit| {
        i32::from(unit).wrapping_add(hash.wrapping_shl(5).wrapping_sub(hash))
    });
    // unsigned_abs keeps i32::MIN representable.
    (hash.unsigned_abs() as usize) % PALETTE.len()
}
