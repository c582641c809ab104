#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Foxtrot puzzle client.
//!
//! This crate defines the vocabulary that connects the editor board, the
//! solution playback model, and the storage adapters: grid coordinates, tile
//! and pawn enumerations with their integer wire codings, the record types
//! exchanged with the persistent store and the external solver, the numeric
//! normalizer used by the board size setters, the change-notification
//! primitives delivered to view layers, and the key-value store seam the
//! editor persists through.

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Smallest accepted board dimension in tiles.
pub const MIN_BOARD_SIZE: u32 = 3;
/// Largest accepted board dimension in tiles.
pub const MAX_BOARD_SIZE: u32 = 32;

/// Cardinal directions connecting a tile to its neighbors.
///
/// The discriminants are single-bit flags so that several directions combine
/// into an edge mask via bitwise OR; the bit values are fixed by the solver
/// wire format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    /// Toward decreasing row indices.
    Up = 0b0001,
    /// Toward increasing row indices.
    Down = 0b0010,
    /// Toward decreasing column indices.
    Left = 0b0100,
    /// Toward increasing column indices.
    Right = 0b1000,
}

impl Direction {
    /// All four directions in wire-bit order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Single-bit wire value for the direction.
    #[must_use]
    pub const fn bit(self) -> u8 {
        self as u8
    }

    /// Decodes a direction from its single-bit wire value.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Option<Direction> {
        match bits {
            0b0001 => Some(Direction::Up),
            0b0010 => Some(Direction::Down),
            0b0100 => Some(Direction::Left),
            0b1000 => Some(Direction::Right),
            _ => None,
        }
    }

    /// Direction pointing back along this one.
    ///
    /// Edge bits are stored redundantly on both tiles of a connection; the
    /// neighbor records the connection under the opposite direction.
    #[must_use]
    pub const fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// Kind of a single grid tile.
///
/// Coded as a plain integer on the wire, matching the solver payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum TileType {
    /// Traversable tile.
    Empty = 0,
    /// Tile the fox must reach.
    Goal = 1,
    /// Impassable tile.
    Wall = 2,
}

impl TileType {
    /// Next kind in the editor's rotation cycle Empty → Goal → Wall → Empty.
    #[must_use]
    pub const fn rotated(self) -> TileType {
        match self {
            TileType::Empty => TileType::Goal,
            TileType::Goal => TileType::Wall,
            TileType::Wall => TileType::Empty,
        }
    }
}

/// Occupant of a tile.
///
/// Coded as a plain integer on the wire, matching the solver payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Pawn {
    /// The player's pawn.
    Fox = 0,
    /// An adversarial pawn.
    Monster = 1,
}

impl Pawn {
    /// Next occupant in the editor's rotation ring None → Fox → Monster → None.
    #[must_use]
    pub const fn rotated(current: Option<Pawn>) -> Option<Pawn> {
        match current {
            None => Some(Pawn::Fox),
            Some(Pawn::Fox) => Some(Pawn::Monster),
            Some(Pawn::Monster) => None,
        }
    }
}

/// Four-bit mask of open edge connections on a tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct EdgeSet(u8);

impl EdgeSet {
    /// Mask with no open connections.
    pub const EMPTY: EdgeSet = EdgeSet(0);

    const MASK: u8 = 0b1111;

    /// Builds a mask from its wire byte, discarding bits outside the four
    /// direction flags.
    #[must_use]
    pub const fn from_bits(bits: u8) -> EdgeSet {
        EdgeSet(bits & Self::MASK)
    }

    /// Wire byte for the mask.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Reports whether the direction's connection is open.
    #[must_use]
    pub const fn contains(self, direction: Direction) -> bool {
        self.0 & direction.bit() != 0
    }

    /// Mask with the direction's connection flipped.
    #[must_use]
    pub const fn toggled(self, direction: Direction) -> EdgeSet {
        EdgeSet(self.0 ^ direction.bit())
    }

    /// Reports whether no connection is open.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Location of a single tile expressed as column and row coordinates.
///
/// Positions order row-major (row outer, column inner) so that ordered
/// collections keyed by position iterate the way grids are presented.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TilePos {
    x: u32,
    y: u32,
}

impl TilePos {
    /// Creates a new tile position.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column index of the tile.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row index of the tile.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Position of the adjacent tile in the given direction, or `None` when
    /// the step would leave the grid on the zero side.
    #[must_use]
    pub fn neighbor(self, direction: Direction) -> Option<TilePos> {
        match direction {
            Direction::Up => self.y.checked_sub(1).map(|y| TilePos::new(self.x, y)),
            Direction::Down => Some(TilePos::new(self.x, self.y + 1)),
            Direction::Left => self.x.checked_sub(1).map(|x| TilePos::new(x, self.y)),
            Direction::Right => Some(TilePos::new(self.x + 1, self.y)),
        }
    }
}

impl Ord for TilePos {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl PartialOrd for TilePos {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Wire shape of a single tile, shared by the persisted editor payload and
/// the solver step payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRecord {
    /// Kind of the tile.
    pub tile_type: TileType,
    /// Occupant of the tile, if any.
    pub pawn: Option<Pawn>,
    /// Raw edge mask byte.
    pub edges: u8,
    /// Zero-based column index.
    pub x: u32,
    /// Zero-based row index.
    pub y: u32,
}

/// Wire shape of the persisted editor board.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardRecord {
    /// Every materialized tile, in storage order.
    pub tiles: Vec<TileRecord>,
    /// Board width in tiles.
    pub width: u32,
    /// Board height in tiles.
    pub height: u32,
}

/// Grid portion of one solver step.
///
/// The solver echoes its own board dimensions alongside the tiles; only the
/// tiles matter here, unknown fields are ignored on deserialization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepBoardRecord {
    /// Tiles present in the step snapshot, possibly sparse.
    pub tiles: Vec<TileRecord>,
}

/// Wire shape of one solver step: a grid snapshot plus an optional pawn-move
/// annotation naming the cell a pawn is entering and the travel direction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Grid snapshot for the step.
    pub board: StepBoardRecord,
    /// `(x, y, direction-bits)` of the cell a pawn is moving into, if the
    /// step captures a move in flight.
    pub pawn_at_move_to: Option<(u32, u32, u8)>,
}

/// Wire shape of a complete solver solution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionRecord {
    /// Board width in tiles.
    pub width: u32,
    /// Board height in tiles.
    pub height: u32,
    /// Ordered step sequence from the initial position to the solved one.
    pub steps: Vec<StepRecord>,
}

/// Clamps a numeric value into the inclusive `[min, max]` range.
#[must_use]
pub fn clamp_dimension(value: i64, min: u32, max: u32) -> u32 {
    if value < i64::from(min) {
        min
    } else if value > i64::from(max) {
        max
    } else {
        value as u32
    }
}

/// Parses a dimension from user input and clamps it into `[min, max]`.
///
/// Text that does not parse as an integer yields `min`.
#[must_use]
pub fn parse_dimension(text: &str, min: u32, max: u32) -> u32 {
    match text.trim().parse::<i64>() {
        Ok(value) => clamp_dimension(value, min, max),
        Err(_) => min,
    }
}

/// Process-unique handle identifying the board that emitted a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoardId(u64);

impl BoardId {
    /// Allocates the next process-unique board identifier.
    #[must_use]
    pub fn allocate() -> BoardId {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        BoardId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Monotonic logical time advanced by one on every board mutation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Revision(u64);

impl Revision {
    /// Logical time of a freshly constructed board.
    pub const ZERO: Revision = Revision(0);

    /// Revision one mutation later than this one.
    #[must_use]
    pub const fn next(self) -> Revision {
        Revision(self.0 + 1)
    }

    /// Retrieves the numeric logical time.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Versioned change token handed to subscribers on every mutation.
///
/// Subscribers compare revisions to detect staleness without diffing board
/// values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChangeNotice {
    /// Board that emitted the notification.
    pub board: BoardId,
    /// Logical time of the board when the notification was emitted.
    pub revision: Revision,
}

/// Identifier returned by [`Subscribers::subscribe`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Callback invoked with the current [`ChangeNotice`] after every mutation.
pub type ChangeCallback = Box<dyn FnMut(ChangeNotice)>;

/// Registry of change subscribers owned by a board.
///
/// Delivery is synchronous and in registration order; the registry also owns
/// the board's revision counter so that every notification carries the
/// logical time of the mutation that produced it.
pub struct Subscribers {
    board: BoardId,
    revision: Revision,
    next_subscriber: u64,
    callbacks: Vec<(SubscriberId, ChangeCallback)>,
}

impl Subscribers {
    /// Creates an empty registry for the given board at logical time zero.
    #[must_use]
    pub fn new(board: BoardId) -> Self {
        Self {
            board,
            revision: Revision::ZERO,
            next_subscriber: 0,
            callbacks: Vec::new(),
        }
    }

    /// Board the registry belongs to.
    #[must_use]
    pub const fn board(&self) -> BoardId {
        self.board
    }

    /// Current logical time of the board.
    #[must_use]
    pub const fn revision(&self) -> Revision {
        self.revision
    }

    /// Change token describing the board's current state.
    #[must_use]
    pub const fn notice(&self) -> ChangeNotice {
        ChangeNotice {
            board: self.board,
            revision: self.revision,
        }
    }

    /// Registers a callback and returns its identifier.
    ///
    /// The callback immediately receives the current notice so a view can
    /// render the present state without waiting for the next mutation.
    pub fn subscribe(&mut self, mut callback: ChangeCallback) -> SubscriberId {
        callback(self.notice());

        let id = SubscriberId(self.next_subscriber);
        self.next_subscriber += 1;
        self.callbacks.push((id, callback));
        id
    }

    /// Removes a previously registered callback.
    ///
    /// Returns `false` when the identifier was already removed or never
    /// issued by this registry.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(candidate, _)| *candidate != id);
        self.callbacks.len() != before
    }

    /// Advances the logical time and delivers the new notice to every
    /// current subscriber, synchronously and in registration order.
    pub fn notify(&mut self) {
        self.revision = self.revision.next();
        let notice = self.notice();
        for (_, callback) in &mut self.callbacks {
            callback(notice);
        }
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Reports whether no subscriber is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("board", &self.board)
            .field("revision", &self.revision)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

/// String-keyed store the editor board persists through.
///
/// Implementations live in the storage adapter crate; the editor receives a
/// boxed handle at construction so tests and embeddings pick their own
/// backend.
pub trait KeyValueStore {
    /// Reads the value stored under `key`, `None` when absent.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes the value stored under `key`, if any.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Errors surfaced by [`KeyValueStore`] backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend rejected the key before touching storage.
    #[error("store key '{0}' contains unsupported characters")]
    InvalidKey(String),
    /// The backend failed to read or write the underlying storage.
    #[error("store access for key '{key}' failed: {source}")]
    Io {
        /// Key whose access failed.
        key: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}
