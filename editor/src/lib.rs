#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Mutable creator board for the Foxtrot puzzle editor.
//!
//! The board owns a sparse tile grid that materializes cells on first access,
//! exposes the mutation operations the editor UI drives (rotating tile kinds
//! and pawns, toggling edge connections, resizing, clearing), and notifies
//! registered subscribers synchronously after every mutation. Each
//! notification also serializes the board back into the injected key-value
//! store, so the session survives a reload without an explicit save action.

use std::{collections::BTreeMap, fmt};

use foxtrot_core::{
    clamp_dimension, parse_dimension, BoardId, BoardRecord, ChangeCallback, ChangeNotice,
    Direction, EdgeSet, KeyValueStore, Pawn, Revision, SubscriberId, Subscribers, TilePos,
    TileRecord, TileType, MAX_BOARD_SIZE, MIN_BOARD_SIZE,
};

/// Store key the creator board persists under.
pub const STORAGE_KEY: &str = "board";

/// State of a single editable tile.
///
/// A freshly materialized tile is a wall with no pawn and no open edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tile {
    tile_type: TileType,
    pawn: Option<Pawn>,
    edges: EdgeSet,
}

impl Default for Tile {
    fn default() -> Self {
        Self {
            tile_type: TileType::Wall,
            pawn: None,
            edges: EdgeSet::EMPTY,
        }
    }
}

impl Tile {
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

    /// Reports whether the connection toward `direction` is open.
    #[must_use]
    pub const fn is_edge_active(&self, direction: Direction) -> bool {
        self.edges.contains(direction)
    }

    fn to_record(self, pos: TilePos) -> TileRecord {
        TileRecord {
            tile_type: self.tile_type,
            pawn: self.pawn,
            edges: self.edges.bits(),
            x: pos.x(),
            y: pos.y(),
        }
    }

    fn from_record(record: &TileRecord) -> Self {
        Self {
            tile_type: record.tile_type,
            pawn: record.pawn,
            edges: EdgeSet::from_bits(record.edges),
        }
    }
}

/// Immutable copy of a single tile's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileSnapshot {
    /// Position of the tile within the grid.
    pub pos: TilePos,
    /// Kind of the tile.
    pub tile_type: TileType,
    /// Occupant of the tile, if any.
    pub pawn: Option<Pawn>,
    /// Mask of open edge connections.
    pub edges: EdgeSet,
}

/// Read-only snapshot describing every tile of the current grid.
#[derive(Clone, Debug, Default)]
pub struct TileView {
    snapshots: Vec<TileSnapshot>,
}

impl TileView {
    /// Creates a new tile view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TileSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.pos);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in row-major order.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &TileSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<TileSnapshot> {
        self.snapshots
    }

    /// Number of captured snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view captured no tiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Mutable creator board owning the sparse tile grid and its subscribers.
pub struct Board {
    width: u32,
    height: u32,
    tiles: BTreeMap<TilePos, Tile>,
    subscribers: Subscribers,
    store: Box<dyn KeyValueStore>,
}

impl Board {
    /// Constructs a board backed by the provided store.
    ///
    /// The board starts at the 3×3 default and then attempts to restore the
    /// previous session from the store: a well-formed payload is applied
    /// (dimensions clamped into bounds, out-of-bounds tiles dropped) and
    /// announced through one change notification; a payload that fails to
    /// parse is deleted from the store and the defaults remain. Store read
    /// failures also leave the defaults in place.
    #[must_use]
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        let mut board = Self {
            width: MIN_BOARD_SIZE,
            height: MIN_BOARD_SIZE,
            tiles: BTreeMap::new(),
            subscribers: Subscribers::new(BoardId::allocate()),
            store,
        };
        board.restore();
        board
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

    /// Number of currently materialized tiles.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
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

    /// Store handle the board persists through.
    #[must_use]
    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
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

    /// Resizes the board width, clamping into `[3, 32]` and dropping tiles
    /// left outside the new bounds.
    pub fn set_width(&mut self, width: i64) {
        self.width = clamp_dimension(width, MIN_BOARD_SIZE, MAX_BOARD_SIZE);
        self.evict_out_of_bounds();
        self.notify_change();
    }

    /// Resizes the board width from user input text; non-numeric text falls
    /// back to the minimum dimension.
    pub fn set_width_from_input(&mut self, text: &str) {
        self.width = parse_dimension(text, MIN_BOARD_SIZE, MAX_BOARD_SIZE);
        self.evict_out_of_bounds();
        self.notify_change();
    }

    /// Resizes the board height, clamping into `[3, 32]` and dropping tiles
    /// left outside the new bounds.
    pub fn set_height(&mut self, height: i64) {
        self.height = clamp_dimension(height, MIN_BOARD_SIZE, MAX_BOARD_SIZE);
        self.evict_out_of_bounds();
        self.notify_change();
    }

    /// Resizes the board height from user input text; non-numeric text falls
    /// back to the minimum dimension.
    pub fn set_height_from_input(&mut self, text: &str) {
        self.height = parse_dimension(text, MIN_BOARD_SIZE, MAX_BOARD_SIZE);
        self.evict_out_of_bounds();
        self.notify_change();
    }

    /// Returns the tile at `pos`, materializing the default tile first when
    /// the cell has never been touched. `None` outside the current bounds.
    ///
    /// Materialization alone is not a mutation of the visible board state,
    /// so this read does not notify or persist.
    pub fn get_or_create_tile(&mut self, pos: TilePos) -> Option<&Tile> {
        if !self.in_bounds(pos) {
            return None;
        }
        Some(self.tiles.entry(pos).or_default())
    }

    /// Returns the tile at `pos` without materializing it.
    #[must_use]
    pub fn tile_at(&self, pos: TilePos) -> Option<&Tile> {
        if !self.in_bounds(pos) {
            return None;
        }
        self.tiles.get(&pos)
    }

    /// Materializes every cell of the current grid and returns the full
    /// grid as snapshots in row-major order (row outer, column inner).
    pub fn all_tiles(&mut self) -> TileView {
        let mut snapshots = Vec::with_capacity((self.width * self.height) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                let pos = TilePos::new(x, y);
                let tile = *self.tiles.entry(pos).or_default();
                snapshots.push(TileSnapshot {
                    pos,
                    tile_type: tile.tile_type,
                    pawn: tile.pawn,
                    edges: tile.edges,
                });
            }
        }
        TileView::from_snapshots(snapshots)
    }

    /// Advances the tile's occupant along the ring None → Fox → Monster →
    /// None. Out-of-bounds positions are ignored without a notification.
    pub fn rotate_pawn(&mut self, pos: TilePos) {
        if !self.in_bounds(pos) {
            return;
        }
        let tile = self.tiles.entry(pos).or_default();
        tile.pawn = Pawn::rotated(tile.pawn);
        self.notify_change();
    }

    /// Advances the tile's kind along the cycle Empty → Goal → Wall →
    /// Empty. Out-of-bounds positions are ignored without a notification.
    pub fn rotate_type(&mut self, pos: TilePos) {
        if !self.in_bounds(pos) {
            return;
        }
        let tile = self.tiles.entry(pos).or_default();
        tile.tile_type = tile.tile_type.rotated();
        self.notify_change();
    }

    /// Reports whether the connection from `pos` toward `direction` is open.
    #[must_use]
    pub fn is_edge_active(&self, pos: TilePos, direction: Direction) -> bool {
        self.tile_at(pos)
            .map_or(false, |tile| tile.is_edge_active(direction))
    }

    /// Flips the edge bit at `pos` toward `direction`, together with the
    /// mirrored bit on the in-bounds neighbor, which is materialized if
    /// needed. One notification covers both sides. A border toggle flips
    /// only the present side; toggling twice restores both masks.
    pub fn toggle_edge(&mut self, pos: TilePos, direction: Direction) {
        if !self.in_bounds(pos) {
            return;
        }

        let tile = self.tiles.entry(pos).or_default();
        tile.edges = tile.edges.toggled(direction);

        let neighbor = pos
            .neighbor(direction)
            .filter(|candidate| self.in_bounds(*candidate));
        if let Some(neighbor) = neighbor {
            let tile = self.tiles.entry(neighbor).or_default();
            tile.edges = tile.edges.toggled(direction.opposite());
        }

        self.notify_change();
    }

    /// Reports whether the editor should offer the edge toggle at `pos`
    /// toward `direction`: false when this tile is a wall, when the
    /// neighbor lies outside the board, or when the neighbor is a wall.
    /// An unmaterialized in-bounds neighbor counts as the default wall.
    ///
    /// Purely advisory for view layers; [`Board::toggle_edge`] is not gated
    /// by it.
    #[must_use]
    pub fn is_edge_possible(&self, pos: TilePos, direction: Direction) -> bool {
        if !self.in_bounds(pos) {
            return false;
        }
        let tile_type = self
            .tiles
            .get(&pos)
            .map_or(TileType::Wall, |tile| tile.tile_type);
        if tile_type == TileType::Wall {
            return false;
        }

        let neighbor = match pos
            .neighbor(direction)
            .filter(|candidate| self.in_bounds(*candidate))
        {
            Some(neighbor) => neighbor,
            None => return false,
        };
        let neighbor_type = self
            .tiles
            .get(&neighbor)
            .map_or(TileType::Wall, |tile| tile.tile_type);
        neighbor_type != TileType::Wall
    }

    /// Drops every materialized tile, keeping the current dimensions.
    pub fn clear(&mut self) {
        self.tiles.clear();
        self.notify_change();
    }

    /// Serializes the board into its wire record, tiles in row-major order.
    #[must_use]
    pub fn to_record(&self) -> BoardRecord {
        BoardRecord {
            tiles: self
                .tiles
                .iter()
                .map(|(pos, tile)| tile.to_record(*pos))
                .collect(),
            width: self.width,
            height: self.height,
        }
    }

    const fn in_bounds(&self, pos: TilePos) -> bool {
        pos.x() < self.width && pos.y() < self.height
    }

    fn evict_out_of_bounds(&mut self) {
        let (width, height) = (self.width, self.height);
        self.tiles
            .retain(|pos, _| pos.x() < width && pos.y() < height);
    }

    fn restore(&mut self) {
        let raw = match self.store.get(STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) | Err(_) => return,
        };

        match serde_json::from_str::<BoardRecord>(&raw) {
            Ok(record) => self.apply_record(&record),
            Err(_) => {
                // Corrupt payloads are deleted so the next session starts clean.
                let _ = self.store.remove(STORAGE_KEY);
            }
        }
    }

    fn apply_record(&mut self, record: &BoardRecord) {
        self.width = clamp_dimension(i64::from(record.width), MIN_BOARD_SIZE, MAX_BOARD_SIZE);
        self.height = clamp_dimension(i64::from(record.height), MIN_BOARD_SIZE, MAX_BOARD_SIZE);
        self.tiles.clear();
        for raw in &record.tiles {
            let pos = TilePos::new(raw.x, raw.y);
            if !self.in_bounds(pos) {
                continue;
            }
            // The first record for a coordinate wins, matching the original
            // find-first tile lookup.
            let _ = self.tiles.entry(pos).or_insert_with(|| Tile::from_record(raw));
        }
        self.notify_change();
    }

    fn notify_change(&mut self) {
        self.subscribers.notify();
        self.persist();
    }

    fn persist(&mut self) {
        let json = serde_json::to_string(&self.to_record())
            .expect("board record serialization never fails");
        // Write failures are absorbed; the in-memory board stays authoritative.
        let _ = self.store.set(STORAGE_KEY, &json);
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("tiles", &self.tiles)
            .field("subscribers", &self.subscribers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{Board, STORAGE_KEY};
    use foxtrot_core::{Direction, KeyValueStore, Pawn, TilePos, TileType};
    use foxtrot_storage::MemoryStore;
    use std::{cell::RefCell, rc::Rc};

    fn empty_board() -> Board {
        Board::new(Box::new(MemoryStore::new()))
    }

    #[test]
    fn fresh_board_defaults_to_three_by_three_with_no_tiles() {
        let board = empty_board();
        assert_eq!(board.width(), 3);
        assert_eq!(board.height(), 3);
        assert_eq!(board.tile_count(), 0);
    }

    #[test]
    fn get_or_create_materializes_the_default_wall_once() {
        let mut board = empty_board();
        let pos = TilePos::new(1, 2);

        let tile = board.get_or_create_tile(pos).copied().expect("in bounds");
        assert_eq!(tile.tile_type(), TileType::Wall);
        assert_eq!(tile.pawn(), None);
        assert!(tile.edges().is_empty());
        assert_eq!(board.tile_count(), 1);

        let again = board.get_or_create_tile(pos).copied().expect("in bounds");
        assert_eq!(again, tile, "second access returns the same tile");
        assert_eq!(board.tile_count(), 1, "no duplicate materialization");
    }

    #[test]
    fn get_or_create_returns_none_outside_current_bounds() {
        let mut board = empty_board();
        assert!(board.get_or_create_tile(TilePos::new(3, 0)).is_none());
        assert!(board.get_or_create_tile(TilePos::new(0, 3)).is_none());
        assert_eq!(board.tile_count(), 0);
    }

    #[test]
    fn set_width_clamps_into_editor_bounds() {
        let mut board = empty_board();
        board.set_width(50);
        assert_eq!(board.width(), 32);
        board.set_width(-5);
        assert_eq!(board.width(), 3);
    }

    #[test]
    fn set_width_from_input_falls_back_to_minimum_on_invalid_text() {
        let mut board = empty_board();
        board.set_width(10);
        board.set_width_from_input("abc");
        assert_eq!(board.width(), 3);
        board.set_height_from_input("7");
        assert_eq!(board.height(), 7);
    }

    #[test]
    fn shrinking_evicts_exactly_the_tiles_outside_the_new_bounds() {
        let mut board = empty_board();
        board.set_width(5);
        board.set_height(5);
        let _ = board.get_or_create_tile(TilePos::new(4, 4));
        let _ = board.get_or_create_tile(TilePos::new(4, 0));
        let _ = board.get_or_create_tile(TilePos::new(0, 4));
        board.rotate_type(TilePos::new(1, 1));

        board.set_width(3);
        board.set_height(3);

        assert_eq!(board.tile_count(), 1, "only the in-bounds tile survives");
        let survivor = board.tile_at(TilePos::new(1, 1)).expect("tile kept");
        assert_eq!(survivor.tile_type(), TileType::Empty, "survivor unchanged");
    }

    #[test]
    fn rotate_type_cycles_empty_goal_wall() {
        let mut board = empty_board();
        let pos = TilePos::new(0, 0);

        board.rotate_type(pos);
        assert_eq!(board.tile_at(pos).map(|t| t.tile_type()), Some(TileType::Empty));
        board.rotate_type(pos);
        assert_eq!(board.tile_at(pos).map(|t| t.tile_type()), Some(TileType::Goal));
        board.rotate_type(pos);
        assert_eq!(board.tile_at(pos).map(|t| t.tile_type()), Some(TileType::Wall));
    }

    #[test]
    fn rotate_pawn_rings_through_fox_and_monster() {
        let mut board = empty_board();
        let pos = TilePos::new(2, 2);

        board.rotate_pawn(pos);
        assert_eq!(board.tile_at(pos).and_then(|t| t.pawn()), Some(Pawn::Fox));
        board.rotate_pawn(pos);
        assert_eq!(board.tile_at(pos).and_then(|t| t.pawn()), Some(Pawn::Monster));
        board.rotate_pawn(pos);
        assert_eq!(board.tile_at(pos).and_then(|t| t.pawn()), None);
    }

    #[test]
    fn toggle_edge_mirrors_onto_the_neighbor_and_is_self_inverse() {
        let mut board = empty_board();
        let pos = TilePos::new(1, 1);
        let above = TilePos::new(1, 0);

        board.toggle_edge(pos, Direction::Up);
        assert!(board.is_edge_active(pos, Direction::Up));
        assert!(
            board.is_edge_active(above, Direction::Down),
            "the neighbor stores the mirrored bit",
        );

        board.toggle_edge(pos, Direction::Up);
        assert!(!board.is_edge_active(pos, Direction::Up));
        assert!(!board.is_edge_active(above, Direction::Down));
    }

    #[test]
    fn toggle_edge_at_the_border_flips_only_the_present_side() {
        let mut board = empty_board();
        let corner = TilePos::new(0, 0);

        board.toggle_edge(corner, Direction::Up);
        assert!(board.is_edge_active(corner, Direction::Up));
        assert_eq!(board.tile_count(), 1, "no neighbor exists to materialize");
    }

    #[test]
    fn edge_is_possible_only_between_two_non_wall_tiles() {
        let mut board = empty_board();
        let pos = TilePos::new(1, 1);
        let right = TilePos::new(2, 1);

        assert!(!board.is_edge_possible(pos, Direction::Right), "walls never connect");

        board.rotate_type(pos);
        assert!(
            !board.is_edge_possible(pos, Direction::Right),
            "the unmaterialized neighbor counts as a wall",
        );

        board.rotate_type(right);
        assert!(board.is_edge_possible(pos, Direction::Right));
        assert!(
            !board.is_edge_possible(right, Direction::Right),
            "the neighbor beyond the border is absent",
        );
    }

    #[test]
    fn mutations_on_out_of_bounds_positions_are_silent_no_ops() {
        let mut board = empty_board();
        let outside = TilePos::new(9, 9);
        let before = board.revision();

        board.rotate_pawn(outside);
        board.rotate_type(outside);
        board.toggle_edge(outside, Direction::Up);

        assert_eq!(board.revision(), before, "no notification was emitted");
        assert_eq!(board.tile_count(), 0);
    }

    #[test]
    fn all_tiles_materializes_the_full_grid_in_row_major_order() {
        let mut board = empty_board();
        let view = board.all_tiles();

        assert_eq!(view.len(), 9);
        assert_eq!(board.tile_count(), 9);
        let positions: Vec<(u32, u32)> = view.iter().map(|s| (s.pos.x(), s.pos.y())).collect();
        assert_eq!(
            positions[..4],
            [(0, 0), (1, 0), (2, 0), (0, 1)],
            "rows come before columns",
        );
    }

    #[test]
    fn clear_drops_tiles_but_keeps_dimensions() {
        let mut board = empty_board();
        board.set_width(5);
        let _ = board.all_tiles();
        assert_ne!(board.tile_count(), 0);

        board.clear();

        assert_eq!(board.tile_count(), 0);
        assert_eq!(board.width(), 5);
    }

    #[test]
    fn subscribers_observe_every_mutation_synchronously() {
        let mut board = empty_board();
        let seen: Rc<RefCell<Vec<u64>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let id = board.subscribe(Box::new(move |notice| {
            sink.borrow_mut().push(notice.revision.get());
        }));
        board.rotate_type(TilePos::new(0, 0));
        board.clear();
        assert!(board.unsubscribe(id));
        board.rotate_type(TilePos::new(0, 0));

        assert_eq!(
            *seen.borrow(),
            vec![0, 1, 2],
            "immediate delivery, then one notice per mutation until unsubscribed",
        );
    }

    #[test]
    fn every_mutation_persists_the_board_under_the_storage_key() {
        let mut board = empty_board();
        board.rotate_type(TilePos::new(1, 0));

        let stored = board
            .store()
            .get(STORAGE_KEY)
            .expect("memory store reads never fail")
            .expect("mutation persisted the board");
        assert!(stored.contains("\"width\":3"));
        assert!(stored.contains("\"tiles\""));
    }
}
