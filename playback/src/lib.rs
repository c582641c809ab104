#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Read-only playback model for solved Foxtrot puzzles.
//!
//! The external solver delivers a solution as an ordered sequence of full
//! grid snapshots. This crate ingests that payload into immutable steps,
//! fills any cells the sparse step data omitted, and exposes one step at a
//! time through an active-step cursor that views navigate with. Nothing here
//! is ever persisted; the model lives only as long as the viewing session.

use std::collections::BTreeMap;

use foxtrot_core::{
    BoardId, ChangeCallback, ChangeNotice, Direction, EdgeSet, Pawn, Revision, SolutionRecord,
    StepRecord, SubscriberId, Subscribers, TilePos, TileRecord, TileType, MIN_BOARD_SIZE,
};
use thiserror::Error;

/// Errors surfaced by the playback model.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// A step index was requested outside the loaded sequence.
    #[error("step index {index} is out of range for {len} loaded steps")]
    StepOutOfRange {
        /// Index that was requested.
        index: usize,
        /// Number of steps currently loaded.
        len: usize,
    },
    /// A pawn-move annotation carried bits that name no single direction.
    #[error("direction bits {0:#06b} do not name a single direction")]
    InvalidDirection(u8),
    /// The solution payload could not be parsed as JSON.
    #[error("solution payload could not be parsed: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// One tile of a solution step, immutable after construction.
///
/// `moving_direction` is set only on the tile a pawn is entering during the
/// step, so a view can animate the move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepTile {
    pos: TilePos,
    tile_type: TileType,
    pawn: Option<Pawn>,
    edges: EdgeSet,
    moving_direction: Option<Direction>,
}

impl StepTile {
    fn from_record(record: &TileRecord) -> Self {
        Self {
            pos: TilePos::new(record.x, record.y),
            tile_type: record.tile_type,
            pawn: record.pawn,
            edges: EdgeSet::from_bits(record.edges),
            moving_direction: None,
        }
    }

    /// Default filler tile for a cell the raw step data omitted.
    fn default_at(pos: TilePos) -> Self {
        Self {
            pos,
            tile_type: TileType::Wall,
            pawn: None,
            edges: EdgeSet::EMPTY,
            moving_direction: None,
        }
    }

    /// Position of the tile within the grid.
    #[must_use]
    pub const fn pos(&self) -> TilePos {
        self.pos
    }

    /// Kind of the tile.
    #[must_use]
    pub const fn tile_type(&self) -> TileType {
        self.tile_type
    }

    /// Occupant of the tile, if any.
    #[must_use]
    pub const fn pawn(&self) -> Option<Pawn> {
        self.pawn
    }

    /// Mask of open edge connections.
    #[must_use]
    pub const fn edges(&self) -> EdgeSet {
        self.edges
    }

    /// Direction a pawn is traveling while entering this tile, if any.
    #[must_use]
    pub const fn moving_direction(&self) -> Option<Direction> {
        self.moving_direction
    }

    /// Reports whether a pawn is entering this tile during the step.
    #[must_use]
    pub const fn is_moving(&self) -> bool {
        self.moving_direction.is_some()
    }

    /// Reports whether this is a goal tile.
    #[must_use]
    pub fn is_goal(&self) -> bool {
        self.tile_type == TileType::Goal
    }

    /// Reports whether this is a wall tile.
    #[must_use]
    pub fn is_wall(&self) -> bool {
        self.tile_type == TileType::Wall
    }

    /// Reports whether the connection toward `direction` is open.
    #[must_use]
    pub const fn is_edge_active(&self, direction: Direction) -> bool {
        self.edges.contains(direction)
    }
}

/// One immutable grid snapshot of a solved sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Step {
    tiles: BTreeMap<TilePos, StepTile>,
}

impl Step {
    /// Builds a step from one solver record, applying the pawn-move
    /// annotation to the matching tile.
    ///
    /// When the raw data lists a coordinate twice the first record wins.
    /// The annotation only attaches to a coordinate present in the raw
    /// payload; filler tiles added later never carry a moving direction.
    pub fn from_record(record: &StepRecord) -> Result<Self, PlaybackError> {
        let movement = match record.pawn_at_move_to {
            Some((x, y, bits)) => {
                let direction =
                    Direction::from_bits(bits).ok_or(PlaybackError::InvalidDirection(bits))?;
                Some((TilePos::new(x, y), direction))
            }
            None => None,
        };

        let mut tiles = BTreeMap::new();
        for raw in &record.board.tiles {
            let pos = TilePos::new(raw.x, raw.y);
            let mut tile = StepTile::from_record(raw);
            if let Some((target, direction)) = movement {
                if target == pos {
                    tile.moving_direction = Some(direction);
                }
            }
            let _ = tiles.entry(pos).or_insert(tile);
        }

        Ok(Self { tiles })
    }

    /// Appends the default wall tile for every in-grid coordinate the raw
    /// data omitted; afterwards exactly `width × height` tiles exist, one
    /// per coordinate, with the original tiles untouched.
    pub fn fill_missing_tiles(&mut self, width: u32, height: u32) {
        for y in 0..height {
            for x in 0..width {
                let pos = TilePos::new(x, y);
                let _ = self
                    .tiles
                    .entry(pos)
                    .or_insert_with(|| StepTile::default_at(pos));
            }
        }
    }

    /// Returns the tile at `pos`, if the step covers that coordinate.
    #[must_use]
    pub fn tile_at(&self, pos: TilePos) -> Option<&StepTile> {
        self.tiles.get(&pos)
    }

    /// Number of tiles covered by the step.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Iterator over the step's tiles in row-major order.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &StepTile> {
        self.tiles.values()
    }
}

/// Read-only solution board replaying a solver-produced step sequence.
pub struct Solution {
    width: u32,
    height: u32,
    steps: Vec<Step>,
    active_step_index: usize,
    subscribers: Subscribers,
}

impl Default for Solution {
    fn default() -> Self {
        Self::new()
    }
}

impl Solution {
    /// Constructs the empty pre-population state: a 3×3 board with no steps.
    #[must_use]
    pub fn new() -> Self {
        Self {
            width: MIN_BOARD_SIZE,
            height: MIN_BOARD_SIZE,
            steps: Vec::new(),
            active_step_index: 0,
            subscribers: Subscribers::new(BoardId::allocate()),
        }
    }

    /// Constructs a solution directly from a solver record.
    pub fn from_record(record: &SolutionRecord) -> Result<Self, PlaybackError> {
        let mut solution = Self::new();
        solution.load_record(record)?;
        Ok(solution)
    }

    /// Constructs a solution from the solver's JSON payload.
    pub fn from_json(payload: &str) -> Result<Self, PlaybackError> {
        let record: SolutionRecord = serde_json::from_str(payload)?;
        Self::from_record(&record)
    }

    /// Populates the board from a solver record: adopts the dimensions,
    /// converts every step and fills its gaps, and resets the cursor to the
    /// first step.
    ///
    /// Population precedes presentation, so no notification is emitted; the
    /// board is left untouched when any step fails to convert.
    pub fn load_record(&mut self, record: &SolutionRecord) -> Result<(), PlaybackError> {
        let mut steps = Vec::with_capacity(record.steps.len());
        for raw in &record.steps {
            let mut step = Step::from_record(raw)?;
            step.fill_missing_tiles(record.width, record.height);
            steps.push(step);
        }

        self.width = record.width;
        self.height = record.height;
        self.steps = steps;
        self.active_step_index = 0;
        Ok(())
    }

    /// Board width in tiles.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Board height in tiles.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Number of loaded steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Index of the step the cursor currently rests on.
    #[must_use]
    pub const fn active_step_index(&self) -> usize {
        self.active_step_index
    }

    /// Moves the cursor to `index` and notifies subscribers.
    ///
    /// An out-of-range index is rejected without moving the cursor or
    /// emitting a notification.
    pub fn set_active_step(&mut self, index: usize) -> Result<(), PlaybackError> {
        if index >= self.steps.len() {
            return Err(PlaybackError::StepOutOfRange {
                index,
                len: self.steps.len(),
            });
        }
        self.active_step_index = index;
        self.subscribers.notify();
        Ok(())
    }

    /// The step the cursor currently rests on; an error when no steps are
    /// loaded.
    pub fn active_step(&self) -> Result<&Step, PlaybackError> {
        self.steps
            .get(self.active_step_index)
            .ok_or(PlaybackError::StepOutOfRange {
                index: self.active_step_index,
                len: self.steps.len(),
            })
    }

    /// The active step's full grid in row-major order (row outer, column
    /// inner); an error when no steps are loaded.
    pub fn all_tiles(&self) -> Result<Vec<StepTile>, PlaybackError> {
        let step = self.active_step()?;
        let mut tiles = Vec::with_capacity((self.width * self.height) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                let pos = TilePos::new(x, y);
                tiles.push(step.tile_at(pos).copied().unwrap_or(StepTile::default_at(pos)));
            }
        }
        Ok(tiles)
    }

    /// Display names for the loaded steps: index 0 is "Start", the last
    /// index is "End", everything in between its decimal index. A lone step
    /// is named "Start".
    #[must_use]
    pub fn step_names(&self) -> Vec<String> {
        let last = self.steps.len().saturating_sub(1);
        self.steps
            .iter()
            .enumerate()
            .map(|(index, _)| {
                if index == 0 {
                    "Start".to_owned()
                } else if index == last {
                    "End".to_owned()
                } else {
                    index.to_string()
                }
            })
            .collect()
    }

    /// Identifier carried by this board's change notices.
    #[must_use]
    pub const fn board_id(&self) -> BoardId {
        self.subscribers.board()
    }

    /// Current logical time of the board.
    #[must_use]
    pub const fn revision(&self) -> Revision {
        self.subscribers.revision()
    }

    /// Change token describing the board's current state.
    #[must_use]
    pub const fn change_notice(&self) -> ChangeNotice {
        self.subscribers.notice()
    }

    /// Registers a change callback and returns its identifier.
    ///
    /// The callback immediately receives the current notice.
    pub fn subscribe(&mut self, callback: ChangeCallback) -> SubscriberId {
        self.subscribers.subscribe(callback)
    }

    /// Removes a previously registered change callback.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.subscribers.unsubscribe(id)
    }
}

impl std::fmt::Debug for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solution")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("steps", &self.steps.len())
            .field("active_step_index", &self.active_step_index)
            .field("subscribers", &self.subscribers)
            .finish()
    }
}
