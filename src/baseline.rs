//! Deterministic grid-search baseline for comparison with the genetic algorithm.
//!
//! Survivors are visited in descending priority order (ties keep registry order). Each
//! leg is an A* shortest path over the six axis-aligned moves with a Manhattan
//! heuristic. Unreachable survivors are skipped. The baseline takes no part in the
//! concurrent search.

use crate::models::{Coord, Direction, Environment, FitnessModel, Path};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::instrument;

/// Shortest path from `start` to `goal`, both inclusive, or `None` when `goal` cannot be
/// reached through passable cells.
pub fn shortest_path(environment: &Environment, start: Coord, goal: Coord) -> Option<Vec<Coord>> {
    if !environment.is_passable(start) || !environment.is_passable(goal) {
        return None;
    }

    let dimensions = environment.dimensions();
    let cells = dimensions.cell_count();
    let mut cost = vec![u32::MAX; cells];
    let mut came_from: Vec<Option<usize>> = vec![None; cells];
    let mut closed = vec![false; cells];
    let mut open = BinaryHeap::new();

    let source = dimensions.index(start);
    let target = dimensions.index(goal);
    cost[source] = 0;
    open.push(Reverse((start.manhattan(goal) as u32, source)));

    while let Some(Reverse((_, current))) = open.pop() {
        if current == target {
            let mut path = vec![goal];
            let mut cursor = current;
            while let Some(previous) = came_from[cursor] {
                path.push(dimensions.coord(previous));
                cursor = previous;
            }
            path.reverse();
            return Some(path);
        }
        if closed[current] {
            continue;
        }
        closed[current] = true;

        let position = dimensions.coord(current);
        for direction in Direction::ALL {
            let next = position.step(direction);
            if !environment.is_passable(next) {
                continue;
            }

            let index = dimensions.index(next);
            let tentative = cost[current] + 1;
            if !closed[index] && tentative < cost[index] {
                cost[index] = tentative;
                came_from[index] = Some(current);
                open.push(Reverse((tentative + next.manhattan(goal) as u32, index)));
            }
        }
    }

    None
}

/// Builds and evaluates the baseline path from `start`, capped at `max_path_length`.
#[instrument(level = "debug", skip(model), fields(start = %start, max_path_length = max_path_length))]
pub fn build_baseline(model: &FitnessModel, start: Coord, max_path_length: usize) -> Path {
    let environment = model.environment();

    let mut order: Vec<usize> = (0..environment.survivors().len()).collect();
    order.sort_by_key(|&i| Reverse(environment.survivors()[i].priority));

    let mut genes = vec![start];
    let mut current = start;
    for i in order {
        if genes.len() >= max_path_length {
            break;
        }

        let goal = environment.survivors()[i].position;
        let Some(leg) = shortest_path(environment, current, goal) else {
            tracing::debug!(survivor = i, goal = %goal, "Survivor unreachable, skipping");
            continue;
        };

        let room = max_path_length - genes.len();
        genes.extend(leg.into_iter().skip(1).take(room));
        current = *genes.last().unwrap_or(&start);
    }

    let mut path = Path::new(genes);
    model.evaluate(&mut path);
    path
}
