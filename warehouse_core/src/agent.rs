use std::collections::HashSet;

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    EntityId, Position,
    environment::{ACTION_COUNT, Action, WarehouseView},
};

/// Trait defining the behavior of a policy driving the robots.
/// Policies decide one action per robot based on the WarehouseView.
pub trait Policy {
    /// Determines the action of every robot, in robot index order.
    /// `&mut self` allows the policy to maintain internal state between ticks.
    fn act(&mut self, view: &WarehouseView) -> Vec<Action>;
}

/// A policy that picks uniformly among the six actions for each robot.
#[derive(Debug)]
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Policy for RandomPolicy {
    fn act(&mut self, view: &WarehouseView) -> Vec<Action> {
        view.robots
            .iter()
            .map(|_| Action::ALL[self.rng.random_range(0..ACTION_COUNT)])
            .collect()
    }
}

/// A scripted baseline that walks each robot straight to its next target.
///
/// A carrying robot heads for its item's dropoff. An empty-handed robot heads
/// for the nearest pickup that no lower-indexed robot has already claimed this
/// tick. Collisions are not avoided.
#[derive(Debug, Default)]
pub struct GreedyPolicy;

impl GreedyPolicy {
    pub fn new() -> Self {
        Self
    }

    /// Converts a move towards `dst` into an Action, horizontal axis first.
    /// Returns `None` once `src == dst`.
    fn step_towards(src: Position, dst: Position) -> Option<Action> {
        if dst.x < src.x {
            Some(Action::Left)
        } else if dst.x > src.x {
            Some(Action::Right)
        } else if dst.y < src.y {
            Some(Action::Up)
        } else if dst.y > src.y {
            Some(Action::Down)
        } else {
            None
        }
    }

    /// Finds the nearest unpicked item not yet claimed by another robot.
    fn nearest_open_item(
        from: Position,
        view: &WarehouseView,
        claimed: &HashSet<EntityId>,
    ) -> Option<(EntityId, Position)> {
        view.items
            .iter()
            .filter(|item| !item.picked && !item.delivered && !claimed.contains(&item.id))
            .min_by_key(|item| (from.manhattan_distance(&item.pickup), item.id))
            .map(|item| (item.id, item.pickup))
    }
}

impl Policy for GreedyPolicy {
    fn act(&mut self, view: &WarehouseView) -> Vec<Action> {
        let mut claimed = HashSet::new();

        view.robots
            .iter()
            .map(|robot| {
                if let Some(item_id) = robot.carrying {
                    let dropoff = view.items[item_id].dropoff;
                    return Self::step_towards(robot.position, dropoff).unwrap_or(Action::Drop);
                }

                match Self::nearest_open_item(robot.position, view, &claimed) {
                    Some((item_id, pickup)) => {
                        claimed.insert(item_id);
                        Self::step_towards(robot.position, pickup).unwrap_or(Action::Pickup)
                    }
                    // Nothing left to fetch; a pickup on an empty cell is a no-op.
                    None => Action::Pickup,
                }
            })
            .collect()
    }
}
