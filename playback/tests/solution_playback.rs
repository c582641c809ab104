use std::{cell::RefCell, rc::Rc};

use foxtrot_core::{Direction, Pawn, TilePos};
use foxtrot_playback::Solution;

/// Two-step solver payload for a 3x3 puzzle: the fox slides one tile to the
/// right onto the goal. The solver echoes its own board dimensions inside
/// each step; those extra fields are ignored.
const SOLVER_PAYLOAD: &str = r#"{
    "width": 3,
    "height": 3,
    "steps": [
        {
            "board": {
                "tiles": [
                    {"tile_type": 0, "pawn": 0, "edges": 8, "x": 0, "y": 1},
                    {"tile_type": 1, "pawn": null, "edges": 4, "x": 1, "y": 1},
                    {"tile_type": 0, "pawn": 1, "edges": 0, "x": 2, "y": 2}
                ],
                "width": 3,
                "height": 3
            },
            "pawn_at_move_to": null
        },
        {
            "board": {
                "tiles": [
                    {"tile_type": 0, "pawn": null, "edges": 8, "x": 0, "y": 1},
                    {"tile_type": 1, "pawn": 0, "edges": 4, "x": 1, "y": 1},
                    {"tile_type": 0, "pawn": 1, "edges": 0, "x": 2, "y": 2}
                ],
                "width": 3,
                "height": 3
            },
            "pawn_at_move_to": [1, 1, 8]
        }
    ]
}"#;

#[test]
fn solver_payload_loads_into_full_grids() {
    let solution = Solution::from_json(SOLVER_PAYLOAD).expect("payload parses");

    assert_eq!(solution.width(), 3);
    assert_eq!(solution.height(), 3);
    assert_eq!(solution.step_count(), 2);
    assert_eq!(solution.step_names(), vec!["Start".to_owned(), "End".to_owned()]);

    let start = solution.all_tiles().expect("start step is active");
    assert_eq!(start.len(), 9, "sparse step data was filled to the full grid");

    let fox = start
        .iter()
        .find(|tile| tile.pawn() == Some(Pawn::Fox))
        .expect("the fox is on the board");
    assert_eq!(fox.pos(), TilePos::new(0, 1));
    assert!(fox.is_edge_active(Direction::Right));
    assert!(!fox.is_moving(), "the initial step carries no move annotation");
}

#[test]
fn navigating_to_the_end_step_shows_the_move_annotation() {
    let mut solution = Solution::from_json(SOLVER_PAYLOAD).expect("payload parses");

    solution.set_active_step(1).expect("the end step exists");

    let tiles = solution.all_tiles().expect("end step is active");
    let target = tiles
        .iter()
        .find(|tile| tile.pos() == TilePos::new(1, 1))
        .expect("the goal tile is present");
    assert!(target.is_goal());
    assert_eq!(target.pawn(), Some(Pawn::Fox));
    assert_eq!(target.moving_direction(), Some(Direction::Right));

    let moving: Vec<_> = tiles.iter().filter(|tile| tile.is_moving()).collect();
    assert_eq!(moving.len(), 1, "only the entered tile carries the annotation");
}

#[test]
fn navigation_notifies_subscribers_with_monotonic_revisions() {
    let mut solution = Solution::from_json(SOLVER_PAYLOAD).expect("payload parses");
    let seen: Rc<RefCell<Vec<u64>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);

    let id = solution.subscribe(Box::new(move |notice| {
        sink.borrow_mut().push(notice.revision.get());
    }));
    solution.set_active_step(1).expect("the end step exists");
    solution.set_active_step(0).expect("the start step exists");
    assert!(solution.unsubscribe(id));
    solution.set_active_step(1).expect("the end step exists");

    assert_eq!(
        *seen.borrow(),
        vec![0, 1, 2],
        "population does not notify, navigation does",
    );
}

#[test]
fn filler_tiles_are_walls_without_pawns() {
    let solution = Solution::from_json(SOLVER_PAYLOAD).expect("payload parses");

    let tiles = solution.all_tiles().expect("start step is active");
    let filler = tiles
        .iter()
        .find(|tile| tile.pos() == TilePos::new(0, 0))
        .expect("the filled corner is present");
    assert!(filler.is_wall());
    assert_eq!(filler.pawn(), None);
    assert!(filler.edges().is_empty());
}
