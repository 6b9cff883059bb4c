use std::collections::{HashMap, HashSet};

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::{
    EntityId, Position,
    config::{RenderMode, WarehouseConfig},
    error::WarehouseError,
    layout::Layout,
    map::Grid,
};

/// Number of distinct per-robot actions.
pub const ACTION_COUNT: usize = 6;

/// Represents actions a robot can take during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    Pickup,
    Drop,
}

impl Action {
    /// All actions, ordered by their integer code.
    pub const ALL: [Action; ACTION_COUNT] = [
        Action::Up,
        Action::Down,
        Action::Left,
        Action::Right,
        Action::Pickup,
        Action::Drop,
    ];

    /// The integer code of this action (`0=up .. 5=drop`).
    pub fn code(self) -> usize {
        self as usize
    }

    /// Grid displacement for movement actions. `y` grows downwards.
    fn offset(self) -> Option<(isize, isize)> {
        match self {
            Action::Up => Some((0, -1)),
            Action::Down => Some((0, 1)),
            Action::Left => Some((-1, 0)),
            Action::Right => Some((1, 0)),
            Action::Pickup | Action::Drop => None,
        }
    }
}

impl TryFrom<usize> for Action {
    type Error = WarehouseError;

    fn try_from(code: usize) -> Result<Self, Self::Error> {
        Action::ALL
            .get(code)
            .copied()
            .ok_or(WarehouseError::InvalidAction(code))
    }
}

/// A robot and what it is holding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Robot {
    pub id: EntityId,
    pub position: Position,
    /// Id of the item being carried, if any.
    pub carrying: Option<EntityId>,
}

/// A pickup-and-deliver task.
///
/// `delivered` implies `picked`; each flag flips to `true` at most once per
/// episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: EntityId,
    pub pickup: Position,
    pub dropoff: Position,
    pub picked: bool,
    pub delivered: bool,
}

/// Flat observation: `[x, y, carrying_or_-1]` per robot followed by
/// `[pickup_x, pickup_y, picked, delivered]` per item.
pub type Observation = Vec<i32>;

/// Auxiliary diagnostics returned with resets and steps. Currently always empty.
pub type Info = HashMap<String, String>;

pub const ROBOT_FEATURES: usize = 3;
pub const ITEM_FEATURES: usize = 4;

/// Element-wise inclusive bounds of an `Observation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationSpace {
    pub low: Vec<i32>,
    pub high: Vec<i32>,
}

impl ObservationSpace {
    pub fn len(&self) -> usize {
        self.low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.low.is_empty()
    }

    /// Returns true if `observation` has the right length and every value is in bounds.
    pub fn contains(&self, observation: &[i32]) -> bool {
        observation.len() == self.len()
            && observation
                .iter()
                .zip(self.low.iter().zip(&self.high))
                .all(|(value, (low, high))| low <= value && value <= high)
    }
}

/// Everything returned by a single `WarehouseEnv::step`.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub observation: Observation,
    pub reward: f32,
    pub terminated: bool,
    pub truncated: bool,
    pub info: Info,
}

/// Provides a read-only view of the episode for policies.
#[derive(Debug, Clone, Copy)]
pub struct WarehouseView<'a> {
    pub grid_size: usize,
    pub robots: &'a [Robot],
    pub items: &'a [Item],
}

/// The warehouse simulation engine.
///
/// Owns the robots and items of the current episode and advances them one tick
/// per `step`. Not meant to be shared between threads; run one instance per
/// rollout worker instead.
#[derive(Debug, Clone)]
pub struct WarehouseEnv {
    config: WarehouseConfig,
    layout: Option<Layout>,
    robots: Vec<Robot>,
    items: Vec<Item>,
    steps: usize,
    max_steps: usize,
    finished: bool,
    rng: StdRng,
}

impl WarehouseEnv {
    /// Creates an environment with a randomly placed first episode, seeded from the OS.
    pub fn new(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        Self::build(config, None, StdRng::from_os_rng())
    }

    /// Creates an environment whose placements are reproducible from `seed`.
    pub fn with_seed(config: WarehouseConfig, seed: u64) -> Result<Self, WarehouseError> {
        Self::build(config, None, StdRng::seed_from_u64(seed))
    }

    /// Creates an environment that starts every episode from `layout`.
    ///
    /// The layout's grid size, robot count and item count replace those in `config`.
    pub fn from_layout(mut config: WarehouseConfig, layout: Layout) -> Result<Self, WarehouseError> {
        layout.validate()?;
        config.grid_size = layout.grid_size;
        config.n_robots = layout.robots.len();
        config.n_items = layout.items.len();
        Self::build(config, Some(layout), StdRng::from_os_rng())
    }

    fn build(
        config: WarehouseConfig,
        layout: Option<Layout>,
        rng: StdRng,
    ) -> Result<Self, WarehouseError> {
        config.validate()?;
        let mut env = WarehouseEnv {
            max_steps: config.max_steps(),
            config,
            layout,
            robots: Vec::new(),
            items: Vec::new(),
            steps: 0,
            finished: false,
            rng,
        };
        env.reset(None);
        Ok(env)
    }

    /// Starts a fresh episode.
    ///
    /// A `seed` reseeds this instance's random source; without one the current
    /// stream continues. Environments built from a layout restore it instead of
    /// sampling positions.
    pub fn reset(&mut self, seed: Option<u64>) -> (Observation, Info) {
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }

        match &self.layout {
            Some(layout) => {
                self.robots = layout
                    .robots
                    .iter()
                    .enumerate()
                    .map(|(id, &position)| Robot {
                        id,
                        position,
                        carrying: None,
                    })
                    .collect();
                self.items = layout
                    .items
                    .iter()
                    .enumerate()
                    .map(|(id, &(pickup, dropoff))| Item {
                        id,
                        pickup,
                        dropoff,
                        picked: false,
                        delivered: false,
                    })
                    .collect();
            }
            None => self.place_randomly(),
        }

        self.steps = 0;
        self.max_steps = self.config.max_steps();
        self.finished = false;
        debug!(
            grid_size = self.config.grid_size,
            robots = ?self.robots.iter().map(|r| r.position).collect::<Vec<_>>(),
            items = ?self.items.iter().map(|i| (i.pickup, i.dropoff)).collect::<Vec<_>>(),
            "Warehouse episode reset"
        );
        (self.observation(), Info::new())
    }

    /// Draws every robot, then each item's pickup and dropoff, from the cells
    /// not yet used. The capacity check in `WarehouseConfig::validate` keeps
    /// the free list from running dry.
    fn place_randomly(&mut self) {
        let size = self.config.grid_size;
        let mut free: Vec<Position> = (0..size * size)
            .map(|index| Position {
                x: index % size,
                y: index / size,
            })
            .collect();

        let rng = &mut self.rng;
        let mut draw = || {
            let index = rng.random_range(0..free.len());
            free.swap_remove(index)
        };

        self.robots = (0..self.config.n_robots)
            .map(|id| Robot {
                id,
                position: draw(),
                carrying: None,
            })
            .collect();
        self.items = (0..self.config.n_items)
            .map(|id| {
                let pickup = draw();
                let dropoff = draw();
                Item {
                    id,
                    pickup,
                    dropoff,
                    picked: false,
                    delivered: false,
                }
            })
            .collect();
    }

    /// Advances the episode by one tick given raw action codes.
    pub fn step_codes(&mut self, codes: &[usize]) -> Result<StepOutcome, WarehouseError> {
        self.check_action_count(codes.len())?;
        let actions = codes
            .iter()
            .map(|&code| Action::try_from(code))
            .collect::<Result<Vec<_>, _>>()?;
        self.step(&actions)
    }

    /// Advances the episode by one tick, applying `actions[i]` to robot `i`.
    ///
    /// Robots act in index order and each action takes effect immediately, so
    /// when two robots race for the same item the lower index wins.
    pub fn step(&mut self, actions: &[Action]) -> Result<StepOutcome, WarehouseError> {
        self.check_action_count(actions.len())?;
        if self.finished {
            warn!(steps = self.steps, "Stepping a warehouse episode that has already ended");
        }

        let rewards = self.config.rewards;
        let mut reward = 0.0;
        self.steps += 1;

        for (robot_id, &action) in actions.iter().enumerate() {
            reward += self.apply_action(robot_id, action);
        }

        if self.has_collision() {
            trace!(step = self.steps, "Robots collided");
            reward += rewards.collision;
        }
        reward += rewards.step;

        let all_delivered = self.all_delivered();
        let out_of_time = self.steps >= self.max_steps;
        let (terminated, truncated) = if self.config.truncate_on_step_limit {
            (all_delivered, out_of_time && !all_delivered)
        } else {
            (all_delivered || out_of_time, false)
        };
        self.finished = terminated || truncated;

        Ok(StepOutcome {
            observation: self.observation(),
            reward,
            terminated,
            truncated,
            info: Info::new(),
        })
    }

    fn check_action_count(&self, actual: usize) -> Result<(), WarehouseError> {
        if actual != self.robots.len() {
            return Err(WarehouseError::ActionCountMismatch {
                expected: self.robots.len(),
                actual,
            });
        }
        Ok(())
    }

    /// Applies one robot's action and returns the reward it earned.
    fn apply_action(&mut self, robot_id: EntityId, action: Action) -> f32 {
        let rewards = self.config.rewards;
        let robot = &mut self.robots[robot_id];

        if let Some((dx, dy)) = action.offset() {
            robot.position = robot.position.offset_clamped(dx, dy, self.config.grid_size);
            return 0.0;
        }

        match action {
            Action::Pickup => {
                if robot.carrying.is_some() {
                    return 0.0;
                }
                let Some(item) = self
                    .items
                    .iter_mut()
                    .find(|item| !item.picked && !item.delivered && item.pickup == robot.position)
                else {
                    return 0.0;
                };
                item.picked = true;
                robot.carrying = Some(item.id);
                trace!(robot = robot_id, item = item.id, "Item picked up");
                rewards.pickup
            }
            Action::Drop => {
                let Some(item_id) = robot.carrying else {
                    return 0.0;
                };
                let item = &mut self.items[item_id];
                if robot.position != item.dropoff || !item.picked || item.delivered {
                    return 0.0;
                }
                item.delivered = true;
                robot.carrying = None;
                trace!(robot = robot_id, item = item_id, "Item delivered");
                rewards.delivery
            }
            _ => 0.0,
        }
    }

    /// True if two or more robots share a cell.
    fn has_collision(&self) -> bool {
        let mut occupied = HashSet::with_capacity(self.robots.len());
        self.robots
            .iter()
            .any(|robot| !occupied.insert(robot.position))
    }

    /// True once every item has been delivered (vacuously true with no items).
    pub fn all_delivered(&self) -> bool {
        self.items.iter().all(|item| item.delivered)
    }

    /// Encodes the current state as a flat observation vector.
    pub fn observation(&self) -> Observation {
        let mut obs = Vec::with_capacity(self.observation_len());
        for robot in &self.robots {
            obs.extend([
                robot.position.x as i32,
                robot.position.y as i32,
                robot.carrying.map_or(-1, |id| id as i32),
            ]);
        }
        for item in &self.items {
            obs.extend([
                item.pickup.x as i32,
                item.pickup.y as i32,
                i32::from(item.picked),
                i32::from(item.delivered),
            ]);
        }
        obs
    }

    pub fn observation_len(&self) -> usize {
        ROBOT_FEATURES * self.robots.len() + ITEM_FEATURES * self.items.len()
    }

    /// Bounds of every observation element. Coordinates lie in
    /// `[0, max(grid_size - 1, 1)]`; the carrying slot also admits the `-1`
    /// "empty-handed" sentinel.
    pub fn observation_space(&self) -> ObservationSpace {
        let coord_high = self.config.grid_size.saturating_sub(1).max(1) as i32;
        let carry_high = self.items.len().saturating_sub(1) as i32;
        let mut low = Vec::with_capacity(self.observation_len());
        let mut high = Vec::with_capacity(self.observation_len());
        for _ in &self.robots {
            low.extend([0, 0, -1]);
            high.extend([coord_high, coord_high, carry_high]);
        }
        for _ in &self.items {
            low.extend([0, 0, 0, 0]);
            high.extend([coord_high, coord_high, 1, 1]);
        }
        ObservationSpace { low, high }
    }

    /// Number of choices per robot, one entry per robot.
    pub fn action_space(&self) -> Vec<usize> {
        vec![ACTION_COUNT; self.robots.len()]
    }

    /// Draws the episode as a character grid.
    ///
    /// `.` empty, `I` unpicked pickup, `D` dropoff of a carried item, `R` idle
    /// robot, `C` robot carrying an item. Robots are drawn over items.
    pub fn render_to_string(&self) -> String {
        let mut glyphs = Grid::filled(self.config.grid_size, '.');
        for item in &self.items {
            if !item.picked {
                glyphs[item.pickup] = 'I';
            } else if !item.delivered {
                glyphs[item.dropoff] = 'D';
            }
        }
        for robot in &self.robots {
            glyphs[robot.position] = if robot.carrying.is_none() { 'R' } else { 'C' };
        }

        let mut out = String::from("Warehouse:\n");
        for row in glyphs.rows() {
            let line: Vec<String> = row.iter().map(char::to_string).collect();
            out.push_str(&line.join(" "));
            out.push('\n');
        }
        out.push('\n');
        out
    }

    /// Prints the episode to standard output in terminal mode; otherwise does nothing.
    pub fn render(&self) {
        match self.config.render_mode {
            RenderMode::Terminal => print!("{}", self.render_to_string()),
            RenderMode::Human => trace!("Human render mode has no output"),
            RenderMode::None => {}
        }
    }

    pub fn view(&self) -> WarehouseView<'_> {
        WarehouseView {
            grid_size: self.config.grid_size,
            robots: &self.robots,
            items: &self.items,
        }
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }
    pub fn grid_size(&self) -> usize {
        self.config.grid_size
    }
    pub fn robots(&self) -> &[Robot] {
        &self.robots
    }
    pub fn items(&self) -> &[Item] {
        &self.items
    }
    pub fn steps(&self) -> usize {
        self.steps
    }
    pub fn max_steps(&self) -> usize {
        self.max_steps
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::layout::load_layout_from_string;

    use Action::*;

    fn env_from(layout: &str) -> WarehouseEnv {
        let layout = load_layout_from_string(layout).unwrap();
        WarehouseEnv::from_layout(WarehouseConfig::default(), layout).unwrap()
    }

    #[test]
    fn reset_places_every_entity_on_a_distinct_cell() {
        let config = WarehouseConfig {
            grid_size: 3,
            n_robots: 3,
            n_items: 3,
            ..Default::default()
        };
        let mut env = WarehouseEnv::with_seed(config, 7).unwrap();
        for seed in 0..50 {
            env.reset(Some(seed));
            let mut used = HashSet::new();
            for robot in env.robots() {
                assert!(used.insert(robot.position));
                assert_eq!(robot.carrying, None);
            }
            for item in env.items() {
                assert!(used.insert(item.pickup));
                assert!(used.insert(item.dropoff));
                assert!(!item.picked && !item.delivered);
            }
            assert_eq!(used.len(), 9);
            assert!(used.iter().all(|p| p.x < 3 && p.y < 3));
        }
    }

    #[test]
    fn same_seed_reproduces_placement() {
        let mut a = WarehouseEnv::with_seed(WarehouseConfig::default(), 42).unwrap();
        let mut b = WarehouseEnv::new(WarehouseConfig::default()).unwrap();
        assert_eq!(a.reset(Some(3)).0, b.reset(Some(3)).0);
        // Unseeded resets continue the stream identically too.
        assert_eq!(a.reset(None).0, b.reset(None).0);
    }

    #[test]
    fn new_rejects_grid_too_small() {
        let config = WarehouseConfig {
            grid_size: 2,
            n_robots: 2,
            n_items: 2,
            ..Default::default()
        };
        assert!(matches!(
            WarehouseEnv::new(config),
            Err(WarehouseError::GridTooSmall { required: 6, available: 4, .. })
        ));
    }

    #[test]
    fn reset_reports_bounds_and_empty_info() {
        let mut env = WarehouseEnv::with_seed(WarehouseConfig::default(), 1).unwrap();
        let (obs, info) = env.reset(None);
        assert!(info.is_empty());
        assert_eq!(obs.len(), 3 * 2 + 4 * 2);
        assert_eq!(env.steps(), 0);
        assert_eq!(env.max_steps(), 72);
        assert!(env.observation_space().contains(&obs));
        assert_eq!(env.action_space(), vec![6, 6]);
    }

    #[test]
    fn observation_layout_uses_sentinel_for_empty_hands() {
        let env = env_from(
            "
            R  P0 .
            .  .  .
            .  .  D0
            ",
        );
        assert_eq!(env.observation(), vec![0, 0, -1, 1, 0, 0, 0]);
        let space = env.observation_space();
        assert_eq!(space.low, vec![0, 0, -1, 0, 0, 0, 0]);
        assert_eq!(space.high, vec![2, 2, 0, 2, 2, 1, 1]);
    }

    #[test]
    fn moves_cost_one_and_clamp_at_edges() {
        let mut env = env_from(
            "
            R  .  .
            .  .  P0
            .  .  D0
            ",
        );
        let out = env.step(&[Up]).unwrap();
        assert_eq!(out.reward, -1.0);
        assert_eq!(env.robots()[0].position, Position::new(0, 0));
        let out = env.step(&[Left]).unwrap();
        assert_eq!(out.reward, -1.0);
        assert_eq!(env.robots()[0].position, Position::new(0, 0));
        env.step(&[Down]).unwrap();
        env.step(&[Right]).unwrap();
        assert_eq!(env.robots()[0].position, Position::new(1, 1));
        assert!(!out.terminated && !out.truncated);
        assert!(out.info.is_empty());
    }

    #[test]
    fn pickup_rewards_once_then_is_a_noop() {
        let mut env = env_from(
            "
            R  P0 P1
            .  .  .
            .  D1 D0
            ",
        );
        env.step(&[Right]).unwrap();
        let out = env.step(&[Pickup]).unwrap();
        assert_eq!(out.reward, 9.0);
        assert_eq!(env.robots()[0].carrying, Some(0));
        assert!(env.items()[0].picked);
        assert_eq!(out.observation[2], 0);

        let out = env.step(&[Pickup]).unwrap();
        assert_eq!(out.reward, -1.0);

        // Already carrying: a second item cannot be picked up.
        env.step(&[Right]).unwrap();
        let out = env.step(&[Pickup]).unwrap();
        assert_eq!(out.reward, -1.0);
        assert!(!env.items()[1].picked);
        assert_eq!(env.robots()[0].carrying, Some(0));
    }

    #[test]
    fn pickup_on_empty_cell_is_a_noop() {
        let mut env = env_from(
            "
            R  .  P0
            .  .  .
            .  .  D0
            ",
        );
        let out = env.step(&[Pickup]).unwrap();
        assert_eq!(out.reward, -1.0);
        assert_eq!(env.robots()[0].carrying, None);
    }

    #[test]
    fn drop_only_counts_at_the_dropoff() {
        let mut env = env_from(
            "
            P0 D0 .
            R  .  .
            .  .  .
            ",
        );
        env.step(&[Up]).unwrap();
        env.step(&[Pickup]).unwrap();
        env.step(&[Down]).unwrap();
        let out = env.step(&[Drop]).unwrap();
        assert_eq!(out.reward, -1.0);
        assert_eq!(env.robots()[0].carrying, Some(0));
        assert!(!env.items()[0].delivered);

        env.step(&[Up]).unwrap();
        env.step(&[Right]).unwrap();
        let out = env.step(&[Drop]).unwrap();
        assert_eq!(out.reward, 49.0);
        assert_eq!(env.robots()[0].carrying, None);
        assert!(env.items()[0].delivered && env.items()[0].picked);
        assert!(out.terminated);
    }

    #[test]
    fn drop_without_cargo_is_a_noop() {
        let mut env = env_from(
            "
            R  D0 .
            .  .  .
            .  .  P0
            ",
        );
        env.step(&[Right]).unwrap();
        let out = env.step(&[Drop]).unwrap();
        assert_eq!(out.reward, -1.0);
        assert!(!env.items()[0].delivered);
    }

    #[test]
    fn collision_costs_twenty_one() {
        let mut env = env_from(
            "
            R  .  R
            .  .  .
            P0 .  D0
            ",
        );
        let out = env.step(&[Right, Left]).unwrap();
        assert_eq!(env.robots()[0].position, env.robots()[1].position);
        assert_eq!(out.reward, -21.0);
    }

    #[test]
    fn collision_penalty_is_per_tick_not_per_pair() {
        let mut env = env_from(
            "
            .  R  .
            R  .  R
            P0 .  D0
            ",
        );
        let out = env.step(&[Down, Right, Left]).unwrap();
        assert!(env.robots().iter().all(|r| r.position == Position::new(1, 1)));
        assert_eq!(out.reward, -21.0);
    }

    #[test]
    fn lower_index_wins_a_pickup_race() {
        let mut env = env_from(
            "
            R  P0 R
            .  .  .
            .  .  D0
            ",
        );
        env.step(&[Right, Left]).unwrap();
        let out = env.step(&[Pickup, Pickup]).unwrap();
        assert_eq!(env.robots()[0].carrying, Some(0));
        assert_eq!(env.robots()[1].carrying, None);
        // +10 pickup, -20 collision (still sharing the cell), -1 step
        assert_eq!(out.reward, -11.0);
    }

    #[test]
    fn scripted_delivery_on_three_by_three() {
        let mut env = env_from(
            "
            R  P0 .
            .  .  .
            .  .  D0
            ",
        );
        let script = [Right, Pickup, Down, Down, Right, Drop];
        let mut total = 0.0;
        let mut last = None;
        for (i, action) in script.into_iter().enumerate() {
            let out = env.step(&[action]).unwrap();
            total += out.reward;
            assert_eq!(out.terminated, i == script.len() - 1);
            last = Some(out);
        }
        // four moves at -1, pickup +10 -1, drop +50 -1
        assert_eq!(total, 54.0);
        assert!(env.items()[0].delivered);
        assert!(last.unwrap().terminated);
    }

    #[test]
    fn adjacent_robots_do_not_collide() {
        let mut env = env_from(
            "
            R  R  .
            .  .  .
            P0 .  D0
            ",
        );
        let out = env.step(&[Left, Right]).unwrap();
        assert_eq!(out.reward, -1.0);
        let out = env.step(&[Down, Down]).unwrap();
        assert_eq!(out.reward, -1.0);
        let out = env.step(&[Right, Left]).unwrap();
        assert_eq!(env.robots()[0].position, Position::new(1, 1));
        assert_eq!(out.reward, -21.0);
    }

    #[test]
    fn seeded_delivery_on_three_by_three() {
        let config = WarehouseConfig {
            grid_size: 3,
            n_robots: 1,
            n_items: 1,
            ..Default::default()
        };
        let mut env = WarehouseEnv::with_seed(config, 0).unwrap();
        let seed = (0..1000)
            .find(|&seed| {
                env.reset(Some(seed));
                env.robots()[0].position.manhattan_distance(&env.items()[0].pickup) == 1
            })
            .expect("some seed starts the robot next to the pickup");
        env.reset(Some(seed));

        let towards = |from: Position, to: Position| {
            if to.x < from.x {
                Left
            } else if to.x > from.x {
                Right
            } else if to.y < from.y {
                Up
            } else {
                Down
            }
        };

        let pickup = env.items()[0].pickup;
        let dropoff = env.items()[0].dropoff;
        let mut total = env.step(&[towards(env.robots()[0].position, pickup)]).unwrap().reward;
        assert_eq!(env.robots()[0].position, pickup);
        total += env.step(&[Pickup]).unwrap().reward;
        assert_eq!(env.robots()[0].carrying, Some(0));

        let carry_moves = pickup.manhattan_distance(&dropoff);
        for _ in 0..carry_moves {
            let out = env.step(&[towards(env.robots()[0].position, dropoff)]).unwrap();
            assert!(!out.terminated);
            total += out.reward;
        }
        let out = env.step(&[Drop]).unwrap();
        total += out.reward;

        assert!(out.terminated);
        assert!(env.items()[0].delivered);
        assert_eq!(env.steps(), carry_moves + 3);
        // one move, pickup, carry moves, drop: every tick also costs 1
        assert_eq!(total, -1.0 + 9.0 - carry_moves as f32 + 49.0);
    }

    #[test]
    fn step_limit_terminates_undelivered_episode() {
        let mut env = env_from(
            "
            R  P0
            .  D0
            ",
        );
        assert_eq!(env.max_steps(), 8);
        for _ in 0..7 {
            assert!(!env.step(&[Up]).unwrap().terminated);
        }
        let out = env.step(&[Up]).unwrap();
        assert!(out.terminated);
        assert!(!out.truncated);
        assert!(!env.items()[0].delivered);
    }

    #[test]
    fn step_limit_can_report_truncation() {
        let layout = load_layout_from_string("R P0\n. D0").unwrap();
        let config = WarehouseConfig {
            truncate_on_step_limit: true,
            ..Default::default()
        };
        let mut env = WarehouseEnv::from_layout(config, layout).unwrap();
        for _ in 0..7 {
            env.step(&[Left]).unwrap();
        }
        let out = env.step(&[Left]).unwrap();
        assert!(!out.terminated);
        assert!(out.truncated);
    }

    #[test]
    fn stepping_past_the_end_keeps_reporting_termination() {
        let mut env = env_from("R P0\n. D0");
        for _ in 0..8 {
            env.step(&[Up]).unwrap();
        }
        let out = env.step(&[Up]).unwrap();
        assert!(out.terminated);
        assert_eq!(env.steps(), 9);

        env.reset(None);
        assert_eq!(env.steps(), 0);
        assert_eq!(env.robots()[0].position, Position::new(0, 0));
    }

    #[test]
    fn invalid_actions_leave_state_untouched() {
        let mut env = env_from(
            "
            R  .  R
            .  .  .
            P0 .  D0
            ",
        );
        let before = env.observation();
        assert_eq!(
            env.step(&[Right]),
            Err(WarehouseError::ActionCountMismatch {
                expected: 2,
                actual: 1,
            })
        );
        assert_eq!(
            env.step_codes(&[3, 6]),
            Err(WarehouseError::InvalidAction(6))
        );
        assert_eq!(env.observation(), before);
        assert_eq!(env.steps(), 0);

        let out = env.step_codes(&[3, 2]).unwrap();
        assert_eq!(out.reward, -21.0);
    }

    #[test]
    fn action_codes_round_trip() {
        for (code, action) in Action::ALL.into_iter().enumerate() {
            assert_eq!(action.code(), code);
            assert_eq!(Action::try_from(code), Ok(action));
        }
    }

    #[test]
    fn render_draws_robots_over_items() {
        let mut env = env_from(
            "
            R  P0 .
            .  .  .
            .  R  D0
            ",
        );
        assert_eq!(
            env.render_to_string(),
            "Warehouse:\nR I .\n. . .\n. R .\n\n"
        );
        env.step(&[Right, Up]).unwrap();
        assert_eq!(
            env.render_to_string(),
            "Warehouse:\n. R .\n. R .\n. . .\n\n"
        );
        env.step(&[Pickup, Down]).unwrap();
        assert_eq!(
            env.render_to_string(),
            "Warehouse:\n. C .\n. . .\n. R D\n\n"
        );
    }
}
