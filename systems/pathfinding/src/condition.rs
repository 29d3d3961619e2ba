//! Predicates deciding which cells end a search.

use overworld_core::{FindPathParams, Position};
use overworld_system_line_of_sight::is_sight_clear;
use overworld_world::World;

/// Decides whether a visited cell is an acceptable end of the path.
///
/// The pathfinder only knows coordinates; implementations encode what the
/// caller is actually looking for.
pub trait PathCondition {
    /// Reports whether `candidate` lies inside the area the search may
    /// consider around its goal. Used to prune neighbors when
    /// [`FindPathParams::keep_distance`] is set.
    fn is_in_range(&self, start: Position, candidate: Position, params: &FindPathParams) -> bool;

    /// Reports whether the search may end on `candidate`.
    ///
    /// `best_match_dist` carries the quality of the best match so far across
    /// calls. An implementation sets it to `0` to stop the search on an
    /// exact match; any other value keeps the search looking for something
    /// better while remembering the latest match.
    fn matches(
        &self,
        world: &World,
        start: Position,
        candidate: Position,
        params: &FindPathParams,
        best_match_dist: &mut i32,
    ) -> bool;
}

/// Seeks cells at a distance band around a fixed target.
///
/// Distances are Chebyshev distances. Cells at exactly
/// [`FindPathParams::max_target_dist`] end the search immediately; closer
/// cells inside the band are remembered as fallbacks, preferring the
/// farthest one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetCondition {
    target: Position,
}

impl TargetCondition {
    /// Creates a condition around `target`.
    #[must_use]
    pub const fn new(target: Position) -> Self {
        Self { target }
    }

    /// Position the condition is centered on.
    #[must_use]
    pub const fn target(&self) -> Position {
        self.target
    }
}

impl PathCondition for TargetCondition {
    fn is_in_range(&self, start: Position, candidate: Position, params: &FindPathParams) -> bool {
        let reach = params.max_target_dist;
        let target_x = i32::from(self.target.x());
        let target_y = i32::from(self.target.y());
        let x = i32::from(candidate.x());
        let y = i32::from(candidate.y());

        if params.full_path_search {
            return x <= target_x.saturating_add(reach)
                && x >= target_x.saturating_sub(reach)
                && y <= target_y.saturating_add(reach)
                && y >= target_y.saturating_sub(reach);
        }

        // Only the side of the target facing the start is searched.
        let offset_x = i32::from(start.x()) - target_x;
        let offset_y = i32::from(start.y()) - target_y;
        let east = if offset_x >= 0 { reach } else { 0 };
        let west = if offset_x <= 0 { reach } else { 0 };
        let south = if offset_y >= 0 { reach } else { 0 };
        let north = if offset_y <= 0 { reach } else { 0 };
        x <= target_x.saturating_add(east)
            && x >= target_x.saturating_sub(west)
            && y <= target_y.saturating_add(south)
            && y >= target_y.saturating_sub(north)
    }

    fn matches(
        &self,
        world: &World,
        start: Position,
        candidate: Position,
        params: &FindPathParams,
        best_match_dist: &mut i32,
    ) -> bool {
        if !self.is_in_range(start, candidate, params) {
            return false;
        }
        if params.clear_sight && !is_sight_clear(world, candidate, self.target, true) {
            return false;
        }

        let distance = i32::from(candidate.chebyshev_distance(self.target));
        if params.max_target_dist == 1 {
            return distance >= params.min_target_dist && distance <= params.max_target_dist;
        }
        if distance > params.max_target_dist || distance < params.min_target_dist {
            return false;
        }
        if distance == params.max_target_dist {
            *best_match_dist = 0;
            return true;
        }
        if distance > *best_match_dist {
            *best_match_dist = distance;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(min: i32, max: i32) -> FindPathParams {
        FindPathParams {
            min_target_dist: min,
            max_target_dist: max,
            clear_sight: false,
            ..FindPathParams::default()
        }
    }

    #[test]
    fn full_search_accepts_a_box_around_the_target() {
        let condition = TargetCondition::new(Position::new(10, 10, 7));
        let start = Position::new(0, 10, 7);
        let params = params(0, 3);

        assert!(condition.is_in_range(start, Position::new(13, 7, 7), &params));
        assert!(!condition.is_in_range(start, Position::new(14, 10, 7), &params));
    }

    #[test]
    fn partial_search_keeps_to_the_approach_side() {
        let condition = TargetCondition::new(Position::new(10, 10, 7));
        let start = Position::new(0, 4, 7);
        let params = FindPathParams {
            full_path_search: false,
            ..params(0, 3)
        };

        assert!(condition.is_in_range(start, Position::new(7, 7, 7), &params));
        assert!(!condition.is_in_range(start, Position::new(11, 10, 7), &params));
        assert!(!condition.is_in_range(start, Position::new(10, 11, 7), &params));
    }

    #[test]
    fn exact_distance_ends_the_search_and_closer_cells_become_fallbacks() {
        let world = World::new();
        let target = Position::new(10, 10, 7);
        let condition = TargetCondition::new(target);
        let start = Position::new(0, 10, 7);
        let params = params(2, 4);
        let mut best = 0;

        assert!(!condition.matches(&world, start, Position::new(9, 10, 7), &params, &mut best));
        assert!(condition.matches(&world, start, Position::new(8, 10, 7), &params, &mut best));
        assert_eq!(best, 2);
        assert!(!condition.matches(&world, start, Position::new(8, 9, 7), &params, &mut best));
        assert!(condition.matches(&world, start, Position::new(7, 10, 7), &params, &mut best));
        assert_eq!(best, 3);
        assert!(condition.matches(&world, start, Position::new(6, 10, 7), &params, &mut best));
        assert_eq!(best, 0);
    }

    #[test]
    fn melee_range_matches_without_touching_best_distance() {
        let world = World::new();
        let target = Position::new(10, 10, 7);
        let condition = TargetCondition::new(target);
        let mut best = 0;

        assert!(condition.matches(
            &world,
            Position::new(0, 0, 7),
            Position::new(11, 11, 7),
            &params(1, 1),
            &mut best
        ));
        assert_eq!(best, 0);
    }

    #[test]
    fn extreme_reaches_saturate_at_the_coordinate_limits() {
        let condition = TargetCondition::new(Position::new(u16::MAX, 0, 7));
        let start = Position::new(0, 0, 7);
        let corner = Position::new(0, u16::MAX, 7);

        assert!(condition.is_in_range(start, corner, &params(0, i32::MAX)));
        let one_sided = FindPathParams {
            full_path_search: false,
            ..params(0, i32::MAX)
        };
        assert!(condition.is_in_range(start, Position::new(0, 0, 7), &one_sided));

        assert!(!condition.is_in_range(start, corner, &params(0, i32::MIN)));
        assert!(!condition.is_in_range(start, Position::new(u16::MAX, 0, 7), &params(0, -1)));
    }
}
