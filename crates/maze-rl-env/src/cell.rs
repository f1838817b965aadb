//! Cell kinds and the item catalog

use serde::{Deserialize, Serialize};
use std::fmt;

/// Key kinds; the exit opens with exactly one of them per episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    /// Ruby key
    Ruby,
    /// Sapphire key
    Sapphire,
    /// Diamond key
    Diamond,
}

impl KeyKind {
    /// Every key kind, in catalog order
    pub const ALL: [KeyKind; 3] = [KeyKind::Ruby, KeyKind::Sapphire, KeyKind::Diamond];

    /// Character used in maze files
    #[must_use]
    pub fn symbol(self) -> char {
        match self {
            KeyKind::Ruby => 'U',
            KeyKind::Sapphire => 'A',
            KeyKind::Diamond => 'I',
        }
    }

    /// Lowercase display name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            KeyKind::Ruby => "ruby",
            KeyKind::Sapphire => "sapphire",
            KeyKind::Diamond => "diamond",
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Collectible kinds with their score and time-bonus values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectibleKind {
    /// 50 points, 5 seconds
    Gold,
    /// 25 points, 4 seconds
    Pink,
    /// 10 points, 3 seconds
    Red,
    /// 5 points, 1 second
    Green,
    /// 1 point
    Blue,
}

impl CollectibleKind {
    /// Every collectible kind, in catalog order
    pub const ALL: [CollectibleKind; 5] = [
        CollectibleKind::Gold,
        CollectibleKind::Pink,
        CollectibleKind::Red,
        CollectibleKind::Green,
        CollectibleKind::Blue,
    ];

    /// Character used in maze files
    #[must_use]
    pub fn symbol(self) -> char {
        match self {
            CollectibleKind::Gold => 'G',
            CollectibleKind::Pink => 'P',
            CollectibleKind::Red => 'R',
            CollectibleKind::Green => 'F',
            CollectibleKind::Blue => 'B',
        }
    }

    /// Points added to the score on pickup
    #[must_use]
    pub fn points(self) -> i64 {
        match self {
            CollectibleKind::Gold => 50,
            CollectibleKind::Pink => 25,
            CollectibleKind::Red => 10,
            CollectibleKind::Green => 5,
            CollectibleKind::Blue => 1,
        }
    }

    /// Seconds credited to the time bonus on pickup
    #[must_use]
    pub fn time_bonus(self) -> i64 {
        match self {
            CollectibleKind::Gold => 5,
            CollectibleKind::Pink => 4,
            CollectibleKind::Red => 3,
            CollectibleKind::Green => 1,
            CollectibleKind::Blue => 0,
        }
    }
}

/// One grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    /// Impassable
    Wall,
    /// Open cell
    Floor,
    /// Start marker; after loading it tracks the player
    Start,
    /// Exit door
    Exit,
    /// Key lying on the floor
    Key(KeyKind),
    /// Collectible lying on the floor
    Collectible(CollectibleKind),
}

impl Cell {
    /// Character used in the maze text format
    #[must_use]
    pub fn symbol(self) -> char {
        match self {
            Cell::Wall => 'W',
            Cell::Floor => ' ',
            Cell::Start => 'S',
            Cell::Exit => 'E',
            Cell::Key(kind) => kind.symbol(),
            Cell::Collectible(kind) => kind.symbol(),
        }
    }

    /// Parse a character of the maze text format
    #[must_use]
    pub fn from_symbol(symbol: char) -> Option<Self> {
        let cell = match symbol {
            'W' => Cell::Wall,
            ' ' => Cell::Floor,
            'S' => Cell::Start,
            'E' => Cell::Exit,
            other => {
                if let Some(kind) = KeyKind::ALL.into_iter().find(|k| k.symbol() == other) {
                    Cell::Key(kind)
                } else {
                    let kind = CollectibleKind::ALL.into_iter().find(|k| k.symbol() == other)?;
                    Cell::Collectible(kind)
                }
            }
        };
        Some(cell)
    }

    /// Blocks movement
    #[must_use]
    pub fn is_wall(self) -> bool {
        matches!(self, Cell::Wall)
    }

    /// Keys and collectibles
    #[must_use]
    pub fn is_item(self) -> bool {
        matches!(self, Cell::Key(_) | Cell::Collectible(_))
    }
}
