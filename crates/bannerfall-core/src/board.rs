//! Board layout and plateau terrain.
//!
//! The battlefield is a fixed hexagon-like board of nine rows. Rows widen
//! towards the middle (No Man's Land) and each side deploys into its own
//! half. Plateau terrain lives here as well: it is owned by the player who
//! placed it but is independent of any unit record.

use crate::hex::HexCoord;
use crate::units::Team;
use serde::{Deserialize, Serialize};

/// Number of hexes in each row, top to bottom
pub const ROW_SIZES: [i32; 9] = [5, 6, 7, 8, 9, 8, 7, 6, 5];

/// Widest row; narrower rows are centered against it
pub const MAX_COLUMNS: i32 = 9;

/// Maximum plateaus each player may raise during setup
pub const MAX_PLATEAUS_PER_PLAYER: usize = 2;

/// Last row of Player 1's deployment zone
pub const PLAYER1_ZONE_LAST_ROW: i32 = 3;

/// First row of Player 2's deployment zone
pub const PLAYER2_ZONE_FIRST_ROW: i32 = 5;

/// A raised plateau hex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlateauTile {
    pub coord: HexCoord,
    /// Player who raised it during setup
    pub owner: Team,
}

/// A board hex as presented to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardTile {
    pub coord: HexCoord,
    pub plateau_owner: Option<Team>,
}

/// The game board: fixed geometry plus plateau terrain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// Plateau tiles in placement order
    plateaus: Vec<PlateauTile>,
}

/// First column of a row, or None if the row is off the board
fn row_span(r: i32) -> Option<(i32, i32)> {
    let width = *ROW_SIZES.get(usize::try_from(r).ok()?)?;
    let offset = (MAX_COLUMNS - width) / 2;
    Some((offset, offset + width))
}

impl Board {
    /// Create an empty board with no plateaus
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a coordinate lies on the board
    pub fn contains(&self, hex: &HexCoord) -> bool {
        is_on_board(hex)
    }

    /// Every on-board hex, row by row
    pub fn hexes(&self) -> Vec<HexCoord> {
        (0..ROW_SIZES.len() as i32)
            .filter_map(|r| row_span(r).map(|(start, end)| (r, start, end)))
            .flat_map(|(r, start, end)| (start..end).map(move |q| HexCoord::new(q, r)))
            .collect()
    }

    /// Every on-board hex with its plateau ownership
    pub fn tiles(&self) -> Vec<BoardTile> {
        self.hexes()
            .into_iter()
            .map(|coord| BoardTile {
                coord,
                plateau_owner: self.plateau_owner(&coord),
            })
            .collect()
    }

    /// All plateau tiles
    pub fn plateaus(&self) -> &[PlateauTile] {
        &self.plateaus
    }

    /// Check whether a hex is raised
    pub fn is_plateau(&self, hex: &HexCoord) -> bool {
        self.plateaus.iter().any(|p| p.coord == *hex)
    }

    /// Owner of the plateau at a hex, if any
    pub fn plateau_owner(&self, hex: &HexCoord) -> Option<Team> {
        self.plateaus
            .iter()
            .find(|p| p.coord == *hex)
            .map(|p| p.owner)
    }

    /// Number of plateaus a player has raised
    pub fn plateau_count(&self, owner: Team) -> usize {
        self.plateaus.iter().filter(|p| p.owner == owner).count()
    }

    /// Raise a plateau. Returns false if the hex is already raised.
    pub fn add_plateau(&mut self, coord: HexCoord, owner: Team) -> bool {
        if self.is_plateau(&coord) {
            return false;
        }
        self.plateaus.push(PlateauTile { coord, owner });
        true
    }

    /// Remove the plateau at a hex, returning it if there was one
    pub fn remove_plateau(&mut self, coord: &HexCoord) -> Option<PlateauTile> {
        let index = self.plateaus.iter().position(|p| p.coord == *coord)?;
        Some(self.plateaus.remove(index))
    }
}

/// Check whether a coordinate lies on the board
pub fn is_on_board(hex: &HexCoord) -> bool {
    row_span(hex.r).is_some_and(|(start, end)| hex.q >= start && hex.q < end)
}

/// Check whether a hex is inside a team's deployment zone
pub fn in_deployment_zone(team: Team, hex: &HexCoord) -> bool {
    match team {
        Team::Player1 => hex.r <= PLAYER1_ZONE_LAST_ROW,
        Team::Player2 => hex.r >= PLAYER2_ZONE_FIRST_ROW,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_shape() {
        let board = Board::new();
        let hexes = board.hexes();

        assert_eq!(hexes.len(), ROW_SIZES.iter().sum::<i32>() as usize);
        assert_eq!(hexes.len(), 61);

        // Narrow rows are centered
        assert!(is_on_board(&HexCoord::new(2, 0)));
        assert!(is_on_board(&HexCoord::new(6, 0)));
        assert!(!is_on_board(&HexCoord::new(1, 0)));
        assert!(!is_on_board(&HexCoord::new(7, 0)));

        // Middle row spans the full width
        assert!(is_on_board(&HexCoord::new(0, 4)));
        assert!(is_on_board(&HexCoord::new(8, 4)));
        assert!(!is_on_board(&HexCoord::new(9, 4)));

        assert!(!is_on_board(&HexCoord::new(4, -1)));
        assert!(!is_on_board(&HexCoord::new(4, 9)));
    }

    #[test]
    fn test_deployment_zones() {
        assert!(in_deployment_zone(Team::Player1, &HexCoord::new(4, 3)));
        assert!(!in_deployment_zone(Team::Player1, &HexCoord::new(4, 4)));
        assert!(!in_deployment_zone(Team::Player2, &HexCoord::new(4, 4)));
        assert!(in_deployment_zone(Team::Player2, &HexCoord::new(4, 5)));
    }

    #[test]
    fn test_plateau_bookkeeping() {
        let mut board = Board::new();
        let hex = HexCoord::new(3, 2);

        assert!(board.add_plateau(hex, Team::Player1));
        assert!(!board.add_plateau(hex, Team::Player2));
        assert!(board.is_plateau(&hex));
        assert_eq!(board.plateau_owner(&hex), Some(Team::Player1));
        assert_eq!(board.plateau_count(Team::Player1), 1);
        assert_eq!(board.plateau_count(Team::Player2), 0);

        let tiles = board.tiles();
        assert_eq!(
            tiles.iter().filter(|t| t.plateau_owner.is_some()).count(),
            1
        );

        assert!(board.remove_plateau(&hex).is_some());
        assert!(!board.is_plateau(&hex));
        assert!(board.remove_plateau(&hex).is_none());
    }
}
