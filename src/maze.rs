//! Logical maze grid: walls, spawn designations, live occupancy and fruit.
//!
//! The grid is a pure data structure. Rendering layers read it back through
//! [`Maze::occupancy_snapshot`] and [`Maze::fruit`]; nothing here knows about
//! pixels or sprites.

use crate::error::MazeError;
use crate::geometry::{Direction, Location};
use crate::kind::AgentKind;
use ahash::AHashSet;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// The 19x19 reference grid. Fixed fruit slots sit in the four corners.
pub const REFERENCE_MAZE: &str = "\
###################
#o.......#.......o#
#.##.###.#.###.##.#
#.................#
#.##.#.#####.#.##.#
#....#...#...#....#
####.###.#.###.####
#......#...#......#
#.##.#.##.##.#.##.#
#....#...P...#....#
#.##.#.#####.#.##.#
#.................#
#.##.###.#.###.##.#
#..#.....#.....#..#
##.#.#.#####.#.#.##
#....#...F...#....#
#.######.#.######.#
#o...............o#
###################
";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cell {
    pub wall: bool,
    /// Static designation from the template.
    pub spawn: AgentKind,
    /// Who is standing here right now.
    pub occupancy: AgentKind,
}

/// How fruit is laid out at the start of every episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FruitPlacement {
    /// The template's `o` slots, in reading order.
    #[default]
    Fixed,
    /// Uniformly random free floor cells.
    Random,
}

/// Parsed maze layout, before any simulation state exists.
///
/// Glyphs: `#` wall, `.` or space floor, `F` forager spawn, `P` pursuer spawn,
/// `o` fixed fruit slot. Border cells are always walls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MazeTemplate {
    width: usize,
    height: usize,
    walls: Vec<bool>,
    forager_spawn: Location,
    pursuer_spawn: Location,
    fruit_slots: Vec<Location>,
}

impl MazeTemplate {
    pub fn parse(text: &str) -> Result<Self, MazeError> {
        let rows: Vec<Vec<char>> = text
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.is_empty())
            .map(|line| line.chars().collect())
            .collect();

        if rows.is_empty() {
            return Err(MazeError::Empty);
        }
        let height = rows.len();
        let width = rows[0].len();
        if width < 3 || height < 3 {
            return Err(MazeError::TooSmall { width, height });
        }

        let mut walls = vec![false; width * height];
        let mut forager = None;
        let mut pursuer = None;
        let mut fruit_slots = Vec::new();

        for (y, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(MazeError::Ragged { row: y, expected: width, found: row.len() });
            }
            for (x, &glyph) in row.iter().enumerate() {
                let border = x == 0 || y == 0 || x == width - 1 || y == height - 1;
                let loc = Location::new(x as i32, y as i32);
                match glyph {
                    '#' => walls[y * width + x] = true,
                    '.' | ' ' => walls[y * width + x] = border,
                    'F' | 'P' | 'o' if border => {
                        let what = match glyph {
                            'F' => "forager spawn",
                            'P' => "pursuer spawn",
                            _ => "fruit slot",
                        };
                        return Err(MazeError::OnBorder { what, x, y });
                    }
                    'F' => {
                        if forager.replace(loc).is_some() {
                            return Err(MazeError::DuplicateSpawn("forager"));
                        }
                    }
                    'P' => {
                        if pursuer.replace(loc).is_some() {
                            return Err(MazeError::DuplicateSpawn("pursuer"));
                        }
                    }
                    'o' => fruit_slots.push(loc),
                    other => return Err(MazeError::UnknownGlyph { glyph: other, x, y }),
                }
            }
        }

        Ok(Self {
            width,
            height,
            walls,
            forager_spawn: forager.ok_or(MazeError::MissingSpawn("forager"))?,
            pursuer_spawn: pursuer.ok_or(MazeError::MissingSpawn("pursuer"))?,
            fruit_slots,
        })
    }

    /// The built-in 19x19 grid.
    pub fn reference() -> Self {
        Self::parse(REFERENCE_MAZE).expect("reference maze is well formed")
    }

    /// A grid with walls only on the border.
    pub fn open(
        width: usize,
        height: usize,
        forager_spawn: Location,
        pursuer_spawn: Location,
        fruit_slots: Vec<Location>,
    ) -> Result<Self, MazeError> {
        let mut text = String::with_capacity((width + 1) * height);
        for y in 0..height {
            for x in 0..width {
                let loc = Location::new(x as i32, y as i32);
                let glyph = if x == 0 || y == 0 || x + 1 == width || y + 1 == height {
                    '#'
                } else if loc == forager_spawn {
                    'F'
                } else if loc == pursuer_spawn {
                    'P'
                } else if fruit_slots.contains(&loc) {
                    'o'
                } else {
                    '.'
                };
                text.push(glyph);
            }
            text.push('\n');
        }
        let mut template = Self::parse(&text)?;
        // Keep the caller's slot order rather than reading order.
        template.fruit_slots.sort_by_key(|slot| fruit_slots.iter().position(|s| s == slot));
        Ok(template)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn forager_spawn(&self) -> Location {
        self.forager_spawn
    }

    pub fn pursuer_spawn(&self) -> Location {
        self.pursuer_spawn
    }

    pub fn fruit_slots(&self) -> &[Location] {
        &self.fruit_slots
    }
}

/// Bounded grid of cells plus the live fruit set.
#[derive(Debug, Clone)]
pub struct Maze {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    fruit: AHashSet<Location>,
    fruit_slots: Vec<Location>,
}

impl Maze {
    /// Builds the grid and stands each agent kind on its spawn cell.
    pub fn from_template(template: &MazeTemplate) -> Self {
        let mut cells: Vec<Cell> = template
            .walls
            .iter()
            .map(|&wall| Cell { wall, ..Cell::default() })
            .collect();

        for (loc, kind) in [
            (template.forager_spawn, AgentKind::FORAGER),
            (template.pursuer_spawn, AgentKind::PURSUER),
        ] {
            let cell = &mut cells[loc.y as usize * template.width + loc.x as usize];
            cell.spawn.insert(kind);
            cell.occupancy.insert(kind);
        }

        Self {
            width: template.width,
            height: template.height,
            cells,
            fruit: AHashSet::new(),
            fruit_slots: template.fruit_slots.clone(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Longest straight-line span the pursuer fitness is normalised against.
    pub fn max_distance(&self) -> f32 {
        (self.width.max(self.height) as f32 - 2.0).max(1.0)
    }

    fn index(&self, loc: Location) -> Option<usize> {
        if loc.x < 0 || loc.y < 0 {
            return None;
        }
        let (x, y) = (loc.x as usize, loc.y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y * self.width + x)
    }

    pub fn cell_at(&self, loc: Location) -> Option<&Cell> {
        self.index(loc).map(|i| &self.cells[i])
    }

    fn cell_mut(&mut self, loc: Location) -> Option<&mut Cell> {
        let i = self.index(loc)?;
        Some(&mut self.cells[i])
    }

    /// The adjacent cell in `dir` when it exists and is not a wall. Every
    /// movement and turning check goes through here.
    pub fn neighbor_towards(&self, loc: Location, dir: Direction) -> Option<Location> {
        let next = loc.step(dir);
        match self.cell_at(next) {
            Some(cell) if !cell.wall => Some(next),
            _ => None,
        }
    }

    pub fn can_move(&self, loc: Location, dir: Direction) -> bool {
        self.neighbor_towards(loc, dir).is_some()
    }

    pub fn available_directions(&self, loc: Location) -> Vec<(Direction, Location)> {
        Direction::ALL
            .iter()
            .filter_map(|&dir| self.neighbor_towards(loc, dir).map(|next| (dir, next)))
            .collect()
    }

    /// What the first non-empty cell in `dir` holds, looking through empty
    /// floor until a wall. `NONE` if only empty floor is visible.
    pub fn ray_look(&self, from: Location, dir: Direction) -> AgentKind {
        let mut at = from;
        while let Some(next) = self.neighbor_towards(at, dir) {
            let mut seen = self.cell_at(next).map(|c| c.occupancy).unwrap_or_default();
            if self.fruit.contains(&next) {
                seen.insert(AgentKind::FRUIT);
            }
            if !seen.is_empty() {
                return seen;
            }
            at = next;
        }
        AgentKind::NONE
    }

    pub fn look_all(&self, from: Location) -> [(Direction, AgentKind); 4] {
        Direction::ALL.map(|dir| (dir, self.ray_look(from, dir)))
    }

    /// Moves `kind` from one cell to another in a single step.
    pub fn move_occupant(&mut self, kind: AgentKind, from: Location, to: Location) {
        if let Some(cell) = self.cell_mut(from) {
            cell.occupancy.remove(kind);
        }
        if let Some(cell) = self.cell_mut(to) {
            cell.occupancy.insert(kind);
        }
    }

    /// Number of cells whose occupancy includes `kind`.
    pub fn count_occupied(&self, kind: AgentKind) -> usize {
        self.cells.iter().filter(|c| c.occupancy.contains(kind)).count()
    }

    pub fn spawn_of(&self, kind: AgentKind) -> Option<Location> {
        self.cells
            .iter()
            .position(|c| !kind.is_empty() && c.spawn.contains(kind))
            .map(|i| Location::new((i % self.width) as i32, (i / self.width) as i32))
    }

    /// Row-major copy of every cell's occupancy, with the fruit bit folded in.
    pub fn occupancy_snapshot(&self) -> Vec<AgentKind> {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let loc = Location::new((i % self.width) as i32, (i / self.width) as i32);
                let mut mask = cell.occupancy;
                if self.fruit.contains(&loc) {
                    mask.insert(AgentKind::FRUIT);
                }
                mask
            })
            .collect()
    }

    pub fn fixed_fruit_slots(&self) -> &[Location] {
        &self.fruit_slots
    }

    /// Floor cells with no spawn designation, nobody standing on them and no
    /// fruit, in reading order.
    pub fn free_locations(&self) -> Vec<Location> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.wall && c.spawn.is_empty() && c.occupancy.is_empty())
            .map(|(i, _)| Location::new((i % self.width) as i32, (i / self.width) as i32))
            .filter(|loc| !self.fruit.contains(loc))
            .collect()
    }

    pub fn place_fruit<I: IntoIterator<Item = Location>>(&mut self, locations: I) {
        self.fruit.extend(locations);
    }

    /// Removes the fruit at `loc`, reporting whether there was one.
    pub fn collect_fruit(&mut self, loc: Location) -> bool {
        self.fruit.remove(&loc)
    }

    pub fn has_fruit(&self, loc: Location) -> bool {
        self.fruit.contains(&loc)
    }

    pub fn fruit_count(&self) -> usize {
        self.fruit.len()
    }

    /// Fruit locations in a stable order.
    pub fn fruit(&self) -> Vec<Location> {
        let mut all: Vec<Location> = self.fruit.iter().copied().collect();
        all.sort_by_key(|loc| (loc.y, loc.x));
        all
    }

    pub fn clear_fruit(&mut self) {
        self.fruit.clear();
    }

    /// Clears the fruit set and lays out `count` fresh fruit.
    pub fn replace_fruit<R: Rng + ?Sized>(
        &mut self,
        count: usize,
        placement: FruitPlacement,
        rng: &mut R,
    ) -> Result<(), MazeError> {
        self.clear_fruit();
        let chosen: Vec<Location> = match placement {
            FruitPlacement::Fixed => {
                if self.fruit_slots.len() < count {
                    return Err(MazeError::NotEnoughFruitSlots {
                        requested: count,
                        available: self.fruit_slots.len(),
                    });
                }
                self.fruit_slots[..count].to_vec()
            }
            FruitPlacement::Random => {
                let free = self.free_locations();
                if free.len() < count {
                    return Err(MazeError::NotEnoughFreeCells {
                        requested: count,
                        available: free.len(),
                    });
                }
                free.choose_multiple(rng, count).copied().collect()
            }
        };
        self.place_fruit(chosen);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn open_five() -> Maze {
        let template =
            MazeTemplate::open(5, 5, Location::new(1, 1), Location::new(3, 3), vec![]).unwrap();
        Maze::from_template(&template)
    }

    #[test]
    fn reference_template_shape() {
        let t = MazeTemplate::reference();
        assert_eq!((t.width(), t.height()), (19, 19));
        assert_eq!(
            t.fruit_slots(),
            &[
                Location::new(1, 1),
                Location::new(17, 1),
                Location::new(1, 17),
                Location::new(17, 17)
            ]
        );
        let maze = Maze::from_template(&t);
        assert_eq!(maze.max_distance(), 17.0);
        assert_eq!(maze.spawn_of(AgentKind::FORAGER), Some(t.forager_spawn()));
        assert_eq!(maze.count_occupied(AgentKind::PURSUER), 1);
    }

    #[test]
    fn border_is_always_wall() {
        // Floor glyphs on the border parse, they just become walls.
        let t = MazeTemplate::parse("....\n.FP.\n....\n").unwrap();
        let maze = Maze::from_template(&t);
        assert!(maze.cell_at(Location::new(0, 1)).unwrap().wall);
        assert!(!maze.can_move(Location::new(1, 1), Direction::North));

        let maze = open_five();
        for i in 0..5 {
            for edge in [
                Location::new(i, 0),
                Location::new(i, 4),
                Location::new(0, i),
                Location::new(4, i),
            ] {
                assert!(maze.cell_at(edge).unwrap().wall, "{edge} should be a wall");
            }
        }
    }

    #[test]
    fn parse_rejects_bad_templates() {
        assert_eq!(MazeTemplate::parse(""), Err(MazeError::Empty));
        assert_eq!(
            MazeTemplate::parse("####\n#FP#\n###\n"),
            Err(MazeError::Ragged { row: 2, expected: 4, found: 3 })
        );
        assert_eq!(
            MazeTemplate::parse("#####\n#FPx#\n#####\n"),
            Err(MazeError::UnknownGlyph { glyph: 'x', x: 3, y: 1 })
        );
        assert_eq!(
            MazeTemplate::parse("#####\n#FPF#\n#####\n"),
            Err(MazeError::DuplicateSpawn("forager"))
        );
        assert_eq!(
            MazeTemplate::parse("##F##\n#.P.#\n#####\n"),
            Err(MazeError::OnBorder { what: "forager spawn", x: 2, y: 0 })
        );
    }

    #[test]
    fn out_of_bounds_queries_are_none() {
        let maze = open_five();
        assert!(maze.cell_at(Location::new(-1, 2)).is_none());
        assert!(maze.cell_at(Location::new(5, 2)).is_none());
        assert!(maze.neighbor_towards(Location::new(1, 1), Direction::North).is_none());
        assert!(maze.neighbor_towards(Location::new(1, 1), Direction::West).is_none());
        assert_eq!(
            maze.neighbor_towards(Location::new(1, 1), Direction::East),
            Some(Location::new(2, 1))
        );
    }

    #[test]
    fn available_directions_keep_canonical_order() {
        let maze = open_five();
        let dirs: Vec<Direction> =
            maze.available_directions(Location::new(2, 2)).into_iter().map(|(d, _)| d).collect();
        assert_eq!(dirs, Direction::ALL.to_vec());

        let corner: Vec<Direction> =
            maze.available_directions(Location::new(3, 1)).into_iter().map(|(d, _)| d).collect();
        assert_eq!(corner, vec![Direction::South, Direction::West]);
    }

    #[test]
    fn ray_look_sees_through_empty_floor() {
        let mut maze = open_five();
        // Pursuer at (3,3), forager at (1,1).
        assert_eq!(maze.ray_look(Location::new(3, 1), Direction::South), AgentKind::PURSUER);
        assert_eq!(maze.ray_look(Location::new(3, 1), Direction::West), AgentKind::FORAGER);
        assert_eq!(maze.ray_look(Location::new(3, 1), Direction::North), AgentKind::NONE);

        maze.place_fruit([Location::new(3, 2)]);
        assert_eq!(maze.ray_look(Location::new(3, 1), Direction::South), AgentKind::FRUIT);

        let first = maze.look_all(Location::new(3, 1));
        let second = maze.look_all(Location::new(3, 1));
        assert_eq!(first, second);
    }

    #[test]
    fn move_occupant_keeps_single_cell() {
        let mut maze = open_five();
        maze.move_occupant(AgentKind::FORAGER, Location::new(1, 1), Location::new(2, 1));
        assert_eq!(maze.count_occupied(AgentKind::FORAGER), 1);
        assert!(maze.cell_at(Location::new(2, 1)).unwrap().occupancy.contains(AgentKind::FORAGER));
        assert!(maze.cell_at(Location::new(1, 1)).unwrap().occupancy.is_empty());
    }

    #[test]
    fn fruit_is_collected_once() {
        let mut maze = open_five();
        maze.place_fruit([Location::new(2, 2)]);
        assert!(maze.has_fruit(Location::new(2, 2)));
        assert!(maze.collect_fruit(Location::new(2, 2)));
        assert!(!maze.collect_fruit(Location::new(2, 2)));
        assert_eq!(maze.fruit_count(), 0);
    }

    #[test]
    fn random_fruit_avoids_spawns_and_agents() {
        let mut maze = open_five();
        let mut rng = SmallRng::seed_from_u64(7);
        maze.replace_fruit(7, FruitPlacement::Random, &mut rng).unwrap();
        assert_eq!(maze.fruit_count(), 7);
        assert!(!maze.has_fruit(Location::new(1, 1)));
        assert!(!maze.has_fruit(Location::new(3, 3)));

        let err = maze.replace_fruit(8, FruitPlacement::Random, &mut rng).unwrap_err();
        assert_eq!(err, MazeError::NotEnoughFreeCells { requested: 8, available: 7 });
        let err = maze.replace_fruit(1, FruitPlacement::Fixed, &mut rng).unwrap_err();
        assert_eq!(err, MazeError::NotEnoughFruitSlots { requested: 1, available: 0 });
    }
}
