//! Passage carving: room links, border exits, corridors

use tracing::debug;

use crate::config::PieceConfig;
use crate::exit::{Exit, WallDir};
use crate::grid::{OccupancyGrid, Tile, TileCoord};

use super::regions::Room;

/// Integer line walk from `from` to `to`, both endpoints included
pub fn line(from: TileCoord, to: TileCoord) -> Vec<TileCoord> {
    let (mut x, mut y) = (from.x, from.y);
    let dx = to.x - from.x;
    let dy = to.y - from.y;

    let mut inverted = false;
    let mut step = dx.signum();
    let mut gradient_step = dy.signum();
    let mut longest = dx.abs();
    let mut shortest = dy.abs();

    if longest < shortest {
        inverted = true;
        longest = dy.abs();
        shortest = dx.abs();
        step = dy.signum();
        gradient_step = dx.signum();
    }

    let mut tiles = Vec::with_capacity(longest as usize + 1);
    let mut accumulation = longest / 2;
    for _ in 0..=longest {
        tiles.push(TileCoord::new(x, y));
        if inverted {
            y += step;
        } else {
            x += step;
        }
        accumulation += shortest;
        if accumulation >= longest {
            if inverted {
                x += gradient_step;
            } else {
                y += gradient_step;
            }
            accumulation -= longest;
        }
    }

    tiles
}

/// Clear every in-range tile with `dx² + dy² <= radius²` around `center`
///
/// Returns how many walls were turned empty.
pub fn carve_disk(grid: &mut OccupancyGrid, center: TileCoord, radius: i32) -> usize {
    let mut cleared = 0;
    for dx in -radius..=radius {
        for dy in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                let (x, y) = (center.x + dx, center.y + dy);
                if grid.get(x, y) == Some(Tile::Wall) {
                    grid.set(x, y, Tile::Empty);
                    cleared += 1;
                }
            }
        }
    }
    cleared
}

/// Clear a corridor of `radius` along the line between two tiles
///
/// Returns how many walls were turned empty.
pub fn carve_passage(grid: &mut OccupancyGrid, from: TileCoord, to: TileCoord, radius: i32) -> usize {
    line(from, to)
        .into_iter()
        .map(|tile| carve_disk(grid, tile, radius))
        .sum()
}

/// Link each room to its nearest eligible neighbor
///
/// For every room below `max_connections`, the closest edge-tile pair to
/// another room with squared distance strictly under `max_distance` is
/// carved. Targets must be unconnected to the source and below the cap.
/// Returns the number of passages carved.
pub fn connect_closest_rooms(
    grid: &mut OccupancyGrid,
    rooms: &mut [Room],
    max_connections: usize,
    max_distance: i32,
    radius: i32,
) -> usize {
    let mut carved = 0;

    for a in 0..rooms.len() {
        if rooms[a].connections.len() >= max_connections {
            continue;
        }

        let mut best: Option<(usize, TileCoord, TileCoord)> = None;
        let mut best_distance = max_distance;

        for b in 0..rooms.len() {
            if a == b || rooms[a].is_connected(b) || rooms[b].connections.len() >= max_connections {
                continue;
            }
            for &tile_a in &rooms[a].edge_tiles {
                for &tile_b in &rooms[b].edge_tiles {
                    let distance = tile_a.distance_squared(tile_b);
                    if distance < best_distance {
                        best_distance = distance;
                        best = Some((b, tile_a, tile_b));
                    }
                }
            }
        }

        if let Some((b, tile_a, tile_b)) = best {
            carve_passage(grid, tile_a, tile_b, radius);
            rooms[a].connections.push(b);
            rooms[b].connections.push(a);
            carved += 1;
        }
    }

    carved
}

/// Whether edge index `index` sits within `space` of any chosen index,
/// wrapping past the end of the edge list
fn too_close_to_chosen(chosen: &[usize], index: usize, count: usize, space: usize) -> bool {
    chosen
        .iter()
        .any(|&f| f.abs_diff(index) <= space || (count - index) + f <= space)
}

/// Open exits from rooms to the outer border
///
/// Exits get ids `1, 2, 4, ...` in placement order and a corridor is carved
/// from the room edge to the border tile.
pub fn place_exits(grid: &mut OccupancyGrid, rooms: &mut [Room], config: &PieceConfig) -> Vec<Exit> {
    let border: Vec<TileCoord> = grid
        .border_tiles()
        .filter(|c| !grid.is_corner(c.x, c.y))
        .collect();
    let mut exits: Vec<Exit> = Vec::new();

    'rooms: for room in rooms.iter_mut() {
        let mut chosen: Vec<usize> = Vec::new();
        let count = room.edge_tiles.len();

        for _ in 0..config.max_exits_per_room {
            if room.exits >= config.max_exits_per_room {
                break;
            }
            if exits.len() >= config.max_exits_per_piece {
                break 'rooms;
            }

            let mut best: Option<(usize, TileCoord, TileCoord)> = None;
            let mut best_distance = config.max_exit_distance;

            for (index, &edge) in room.edge_tiles.iter().enumerate() {
                if too_close_to_chosen(&chosen, index, count, config.space_between_exits) {
                    continue;
                }
                for &target in &border {
                    if exits
                        .iter()
                        .any(|e| e.coords.distance(target) < config.min_border_exit_distance)
                    {
                        continue;
                    }
                    let distance = edge.distance_squared(target);
                    if distance < best_distance {
                        best_distance = distance;
                        best = Some((index, edge, target));
                    }
                }
            }

            let Some((index, edge, target)) = best else {
                break;
            };

            chosen.push(index);
            let wall_dir = WallDir::for_border_tile(target, grid.width(), grid.height());
            let exit = Exit::new(target, wall_dir, Exit::id_for_index(exits.len()));
            debug!(id = exit.id, x = target.x, y = target.y, ?wall_dir, "placed exit");
            exits.push(exit);
            room.exits += 1;
            carve_passage(grid, edge, target, config.passage_radius);
        }
    }

    exits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::regions::{consolidate_regions, find_regions};

    #[test]
    fn test_straight_corridor_radius_zero() {
        let mut grid = OccupancyGrid::filled(10, 5, Tile::Wall);
        let cleared = carve_passage(&mut grid, TileCoord::new(0, 0), TileCoord::new(5, 0), 0);
        assert_eq!(cleared, 6);
        assert_eq!(grid.count(Tile::Empty), 6);
        for x in 0..=5 {
            assert_eq!(grid.get(x, 0), Some(Tile::Empty));
        }
        assert_eq!(grid.get(6, 0), Some(Tile::Wall));
    }

    #[test]
    fn test_line_endpoints_and_steepness() {
        let tiles = line(TileCoord::new(1, 1), TileCoord::new(3, 8));
        assert_eq!(tiles.first(), Some(&TileCoord::new(1, 1)));
        assert_eq!(tiles.last(), Some(&TileCoord::new(3, 8)));
        assert_eq!(tiles.len(), 8);

        // Each step moves exactly one row along the major axis
        for pair in tiles.windows(2) {
            assert_eq!(pair[1].y - pair[0].y, 1);
            assert!((pair[1].x - pair[0].x).abs() <= 1);
        }

        let single = line(TileCoord::new(4, 4), TileCoord::new(4, 4));
        assert_eq!(single, vec![TileCoord::new(4, 4)]);
    }

    #[test]
    fn test_disk_radius() {
        let mut grid = OccupancyGrid::filled(9, 9, Tile::Wall);
        let cleared = carve_disk(&mut grid, TileCoord::new(4, 4), 2);
        // Lattice points with dx² + dy² <= 4
        assert_eq!(cleared, 13);

        // Clipped at the grid edge
        let mut grid = OccupancyGrid::filled(9, 9, Tile::Wall);
        assert_eq!(carve_disk(&mut grid, TileCoord::new(0, 0), 1), 3);
    }

    fn two_rooms(gap_columns: usize) -> (OccupancyGrid, Vec<Room>) {
        // Two 3x3 rooms on one row separated by `gap_columns` wall columns
        let wall_gap = "#".repeat(gap_columns);
        let middle = format!("#...{}...#", wall_gap);
        let solid = "#".repeat(middle.len());
        let rows = [
            solid.as_str(),
            middle.as_str(),
            middle.as_str(),
            middle.as_str(),
            solid.as_str(),
        ];
        let mut grid = OccupancyGrid::from_rows(&rows);
        let rooms = consolidate_regions(&mut grid, 1, 1).rooms;
        (grid, rooms)
    }

    #[test]
    fn test_room_distance_limit_is_strict() {
        // Edge tiles 3 columns apart: squared distance 9
        let (mut grid, mut rooms) = two_rooms(2);
        assert_eq!(rooms.len(), 2);
        assert_eq!(connect_closest_rooms(&mut grid, &mut rooms, 1, 10, 0), 1);
        assert!(rooms[0].is_connected(1));
        assert!(rooms[1].is_connected(0));
        assert_eq!(find_regions(&grid, Tile::Empty).len(), 1);

        let (mut grid, mut rooms) = two_rooms(2);
        assert_eq!(connect_closest_rooms(&mut grid, &mut rooms, 1, 8, 0), 0);
        assert_eq!(find_regions(&grid, Tile::Empty).len(), 2);

        let (mut grid, mut rooms) = two_rooms(2);
        assert_eq!(connect_closest_rooms(&mut grid, &mut rooms, 1, 9, 0), 0);
    }

    #[test]
    fn test_connected_room_not_reused_as_source() {
        let (mut grid, mut rooms) = two_rooms(1);
        // Room 0 links to room 1; room 1 is then at its cap
        assert_eq!(connect_closest_rooms(&mut grid, &mut rooms, 1, 100, 0), 1);
        assert_eq!(rooms[0].connections, vec![1]);
        assert_eq!(rooms[1].connections, vec![0]);
    }

    #[test]
    fn test_exit_ids_are_powers_of_two() {
        let mut grid = OccupancyGrid::from_rows(&[
            "##################",
            "##################",
            "##################",
            "###............###",
            "###............###",
            "###............###",
            "###............###",
            "###............###",
            "###............###",
            "##################",
            "##################",
            "##################",
        ]);
        let mut rooms = consolidate_regions(&mut grid, 5, 5).rooms;
        let config = PieceConfig {
            max_exits_per_room: 4,
            max_exits_per_piece: 4,
            space_between_exits: 3,
            passage_radius: 0,
            ..PieceConfig::default()
        };
        let exits = place_exits(&mut grid, &mut rooms, &config);
        assert!(!exits.is_empty());
        assert!(exits.len() <= 4);

        let mut seen = 0u32;
        for (n, exit) in exits.iter().enumerate() {
            assert_eq!(exit.id, 1 << n);
            assert!(exit.id.is_power_of_two());
            assert_eq!(seen & exit.id, 0);
            seen |= exit.id;
            assert!(grid.is_border(exit.coords.x, exit.coords.y));
            assert!(!grid.is_corner(exit.coords.x, exit.coords.y));
            assert_ne!(exit.wall_dir, WallDir::Error);
            assert_eq!(grid.get(exit.coords.x, exit.coords.y), Some(Tile::Empty));
        }

        for (i, a) in exits.iter().enumerate() {
            for b in &exits[i + 1..] {
                assert!(a.coords.distance(b.coords) >= config.min_border_exit_distance);
            }
        }
    }

    #[test]
    fn test_exit_cap_per_piece() {
        let mut grid = OccupancyGrid::from_rows(&[
            "##############",
            "##############",
            "##############",
            "###........###",
            "###........###",
            "###........###",
            "###........###",
            "##############",
            "##############",
            "##############",
        ]);
        let mut rooms = consolidate_regions(&mut grid, 5, 5).rooms;
        let config = PieceConfig {
            max_exits_per_room: 4,
            max_exits_per_piece: 1,
            space_between_exits: 2,
            ..PieceConfig::default()
        };
        let exits = place_exits(&mut grid, &mut rooms, &config);
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].id, 1);
    }
}
