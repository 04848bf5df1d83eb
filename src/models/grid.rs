use super::Coord;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::instrument;

/// Grid extent along each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: i32,
    pub height: i32,
    pub depth: i32,
}

impl Dimensions {
    pub fn new(width: i32, height: i32, depth: i32) -> Result<Self, GridError> {
        if width < 1 || height < 1 || depth < 1 {
            return Err(GridError::InvalidDimensions {
                width,
                height,
                depth,
            });
        }

        Ok(Self {
            width,
            height,
            depth,
        })
    }

    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize * self.depth as usize
    }

    pub fn contains(&self, c: Coord) -> bool {
        (0..self.width).contains(&c.x)
            && (0..self.height).contains(&c.y)
            && (0..self.depth).contains(&c.z)
    }

    /// Linear index of an in-bounds coordinate.
    pub fn index(&self, c: Coord) -> usize {
        (c.z as usize * self.height as usize + c.y as usize) * self.width as usize + c.x as usize
    }

    pub fn coord(&self, index: usize) -> Coord {
        let plane = self.width as usize * self.height as usize;
        let z = index / plane;
        let rem = index % plane;
        Coord::new(
            (rem % self.width as usize) as i32,
            (rem / self.width as usize) as i32,
            z as i32,
        )
    }

    pub fn is_boundary(&self, c: Coord) -> bool {
        c.x == 0
            || c.x == self.width - 1
            || c.y == 0
            || c.y == self.height - 1
            || c.z == 0
            || c.z == self.depth - 1
    }

    fn random_coord<R: Rng>(&self, rng: &mut R) -> Coord {
        Coord::new(
            rng.random_range(0..self.width),
            rng.random_range(0..self.height),
            rng.random_range(0..self.depth),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellState {
    Empty,
    Obstacle,
    Survivor,
}

#[derive(Debug, thiserror::Error)]
pub enum GridError {
    #[error("InvalidDimensions: every axis must be at least 1, got {width}x{height}x{depth}")]
    InvalidDimensions { width: i32, height: i32, depth: i32 },
    #[error("Overcrowded: {requested} entities do not fit into {cells} cells")]
    Overcrowded { requested: usize, cells: usize },
    #[error("OutOfBounds: {0} lies outside the grid")]
    OutOfBounds(Coord),
    #[error("Occupied: {0} already holds an obstacle or survivor")]
    Occupied(Coord),
    #[error("InvalidPriority: survivor priorities must be at least 1")]
    InvalidPriority,
}

/// Static occupancy map. Immutable once generated.
#[derive(Debug, Clone)]
pub struct Grid {
    dimensions: Dimensions,
    cells: Vec<CellState>,
}

impl Grid {
    pub fn empty(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            cells: vec![CellState::Empty; dimensions.cell_count()],
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn is_valid(&self, c: Coord) -> bool {
        self.dimensions.contains(c)
    }

    /// Out-of-bounds coordinates read as obstacles.
    pub fn cell_at(&self, c: Coord) -> CellState {
        if !self.is_valid(c) {
            return CellState::Obstacle;
        }
        self.cells[self.dimensions.index(c)]
    }

    pub fn is_passable(&self, c: Coord) -> bool {
        self.cell_at(c) != CellState::Obstacle
    }

    fn place(&mut self, c: Coord, state: CellState) -> Result<(), GridError> {
        if !self.is_valid(c) {
            return Err(GridError::OutOfBounds(c));
        }
        let index = self.dimensions.index(c);
        if self.cells[index] != CellState::Empty {
            return Err(GridError::Occupied(c));
        }
        self.cells[index] = state;
        Ok(())
    }

    /// Samples a random cell until it lands on an empty one, then marks it.
    fn place_random<R: Rng>(&mut self, state: CellState, rng: &mut R) -> Coord {
        loop {
            let c = self.dimensions.random_coord(rng);
            let index = self.dimensions.index(c);
            if self.cells[index] == CellState::Empty {
                self.cells[index] = state;
                return c;
            }
        }
    }
}

/// A rescue target and how much reaching it is worth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Survivor {
    pub position: Coord,
    pub priority: u32,
}

/// Priority assignment for generated survivors: listed values first, default for the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Priorities {
    pub listed: Vec<u32>,
    pub default: u32,
}

impl Priorities {
    pub fn uniform(default: u32) -> Self {
        Self {
            listed: Vec::new(),
            default,
        }
    }

    pub fn priority_of(&self, survivor: usize) -> u32 {
        self.listed
            .get(survivor)
            .copied()
            .unwrap_or(self.default)
            .max(1)
    }
}

/// The grid together with its survivor registry and obstacle list.
#[derive(Debug, Clone)]
pub struct Environment {
    grid: Grid,
    survivors: Vec<Survivor>,
    survivor_index: HashMap<Coord, usize>,
    obstacles: Vec<Coord>,
    total_priority: u64,
}

impl Environment {
    /// Places obstacles, then survivors, by rejection sampling against the current grid.
    #[instrument(level = "debug", skip(priorities, rng), fields(width = dimensions.width, height = dimensions.height, depth = dimensions.depth))]
    pub fn generate<R: Rng>(
        dimensions: Dimensions,
        num_obstacles: usize,
        num_survivors: usize,
        priorities: &Priorities,
        rng: &mut R,
    ) -> Result<Self, GridError> {
        let requested = num_obstacles + num_survivors;
        if requested > dimensions.cell_count() {
            return Err(GridError::Overcrowded {
                requested,
                cells: dimensions.cell_count(),
            });
        }

        let mut grid = Grid::empty(dimensions);

        let obstacles: Vec<Coord> = (0..num_obstacles)
            .map(|_| grid.place_random(CellState::Obstacle, rng))
            .collect();

        let survivors: Vec<Survivor> = (0..num_survivors)
            .map(|i| Survivor {
                position: grid.place_random(CellState::Survivor, rng),
                priority: priorities.priority_of(i),
            })
            .collect();

        Ok(Self::assemble(grid, survivors, obstacles))
    }

    /// Builds an environment from a fixed layout.
    pub fn from_parts(
        dimensions: Dimensions,
        obstacles: Vec<Coord>,
        survivors: Vec<Survivor>,
    ) -> Result<Self, GridError> {
        let mut grid = Grid::empty(dimensions);

        for &c in &obstacles {
            grid.place(c, CellState::Obstacle)?;
        }
        for survivor in &survivors {
            if survivor.priority < 1 {
                return Err(GridError::InvalidPriority);
            }
            grid.place(survivor.position, CellState::Survivor)?;
        }

        Ok(Self::assemble(grid, survivors, obstacles))
    }

    fn assemble(grid: Grid, survivors: Vec<Survivor>, obstacles: Vec<Coord>) -> Self {
        let survivor_index = survivors
            .iter()
            .enumerate()
            .map(|(i, s)| (s.position, i))
            .collect();
        let total_priority = survivors.iter().map(|s| s.priority as u64).sum();

        Self {
            grid,
            survivors,
            survivor_index,
            obstacles,
            total_priority,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn dimensions(&self) -> Dimensions {
        self.grid.dimensions()
    }

    pub fn is_valid(&self, c: Coord) -> bool {
        self.grid.is_valid(c)
    }

    pub fn cell_at(&self, c: Coord) -> CellState {
        self.grid.cell_at(c)
    }

    pub fn is_passable(&self, c: Coord) -> bool {
        self.grid.is_passable(c)
    }

    pub fn survivors(&self) -> &[Survivor] {
        &self.survivors
    }

    pub fn obstacles(&self) -> &[Coord] {
        &self.obstacles
    }

    pub fn total_priority(&self) -> u64 {
        self.total_priority
    }

    /// Registry index of the survivor standing on `c`, if any.
    pub fn survivor_at(&self, c: Coord) -> Option<usize> {
        self.survivor_index.get(&c).copied()
    }
}
