//! Per-tick snake movement: lead target advance, waypoint trail, and segment following.
//!
//! The lead always heads for the newest waypoint. When it arrives (within
//! [`ARRIVE_EPSILON`]) a new waypoint one block further in the current
//! direction is appended, so turns only happen at block centres. Trailing
//! segment `i` heads for the waypoint `i` places behind the newest one, which
//! keeps a constant gap between consecutive segments.
//!
//! Trailing assignments only change on ticks where the lead takes a new
//! waypoint. Every segment then travels one block in the same number of
//! ticks as the lead, so all of them sit on block centres together.
//!
//! The controller never moves entities itself: it reports a [`SegmentMotion`]
//! per segment to a [`SessionSink`] and the host applies it.

use std::collections::VecDeque;

use mc_snake_world::{Direction, GridCell, Vec3};
use tracing::debug;

use crate::pathfinding::yaw_toward;

/// Distance (blocks) at which the lead counts as having reached its target.
pub const ARRIVE_EPSILON: f32 = 0.1;

/// When trailing segments pick up the waypoint trail relative to the lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FollowMode {
    /// Segments are handed the trail as it stood before the lead took its
    /// new waypoint, so the whole body runs one waypoint further back.
    #[default]
    Deferred,
    /// Segments are handed the trail right after the lead's advance.
    Immediate,
}

#[derive(Debug, Clone, Copy)]
pub struct MovementSettings {
    pub speed_blocks_per_second: f32,
    pub ticks_per_second: f32,
    pub arrive_epsilon: f32,
    pub follow_mode: FollowMode,
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            speed_blocks_per_second: 5.0,
            ticks_per_second: 10.0,
            arrive_epsilon: ARRIVE_EPSILON,
            follow_mode: FollowMode::Deferred,
        }
    }
}

impl MovementSettings {
    pub fn blocks_per_tick(&self) -> f32 {
        self.speed_blocks_per_second / self.ticks_per_second
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementState {
    /// Created, no movement tick yet; the lead has no target.
    Idle,
    Moving,
    Terminated,
}

/// Motion update for one segment this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentMotion {
    pub target: Vec3,
    /// Displacement to apply this tick (blocks/tick).
    pub velocity: Vec3,
    pub yaw: f32,
}

/// Receives per-segment motion. Index 0 is the lead.
pub trait SessionSink {
    fn segment_moved(&mut self, index: usize, motion: SegmentMotion);
}

impl SessionSink for Vec<(usize, SegmentMotion)> {
    fn segment_moved(&mut self, index: usize, motion: SegmentMotion) {
        self.push((index, motion));
    }
}

/// Movement state machine for one snake.
#[derive(Debug, Clone)]
pub struct MovementController {
    settings: MovementSettings,
    state: MovementState,
    direction: Direction,
    target: Option<Vec3>,
    waypoints: VecDeque<Vec3>,
    /// Positions at the start of the latest step, lead first.
    last_positions: Vec<Vec3>,
    /// Waypoint last handed to each trailing segment.
    assigned: Vec<Option<Vec3>>,
}

impl MovementController {
    pub fn new(settings: MovementSettings, direction: Direction) -> Self {
        Self {
            settings,
            state: MovementState::Idle,
            direction,
            target: None,
            waypoints: VecDeque::new(),
            last_positions: Vec::new(),
            assigned: Vec::new(),
        }
    }

    pub fn settings(&self) -> &MovementSettings {
        &self.settings
    }

    pub fn state(&self) -> MovementState {
        self.state
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Change heading. Takes effect the next time the lead reaches its target.
    pub fn set_direction(&mut self, direction: Direction) {
        if self.state != MovementState::Terminated {
            self.direction = direction;
        }
    }

    pub fn target(&self) -> Option<Vec3> {
        self.target
    }

    pub fn waypoints(&self) -> &VecDeque<Vec3> {
        &self.waypoints
    }

    /// Number of trailing segments (the lead is not counted).
    pub fn segment_count(&self) -> usize {
        self.assigned.len()
    }

    /// Waypoint currently assigned to trailing segment `index` (1-based, like sink indices).
    pub fn assigned_waypoint(&self, index: usize) -> Option<Vec3> {
        index
            .checked_sub(1)
            .and_then(|i| self.assigned.get(i).copied().flatten())
    }

    /// Positions recorded at the start of the latest step, lead first.
    pub fn last_known_positions(&self) -> &[Vec3] {
        &self.last_positions
    }

    pub fn terminate(&mut self) {
        self.state = MovementState::Terminated;
    }

    /// Advance the snake by one tick.
    ///
    /// `positions` holds the current lead position followed by each trailing
    /// segment in order. Segments with no usable waypoint, or already sitting
    /// on their waypoint, get no motion this tick.
    pub fn step(&mut self, positions: &[Vec3], sink: &mut dyn SessionSink) {
        if self.state == MovementState::Terminated {
            return;
        }
        let Some(&lead) = positions.first() else {
            return;
        };

        self.last_positions.clear();
        self.last_positions.extend_from_slice(positions);

        let was_moving = self.state == MovementState::Moving;
        let taking_waypoint = self
            .target
            .map_or(true, |t| lead.distance(t) <= self.settings.arrive_epsilon);

        if was_moving && self.settings.follow_mode == FollowMode::Deferred {
            if taking_waypoint {
                self.assign_trailing(positions.len());
            }
            self.move_trailing(positions, sink);
        }

        let target = self.advance_target(lead);
        let velocity = self.velocity_toward(lead, target);
        if velocity.is_finite() {
            sink.segment_moved(
                0,
                SegmentMotion {
                    target,
                    velocity,
                    yaw: yaw_toward(lead, target),
                },
            );
        }

        if self.settings.follow_mode == FollowMode::Immediate {
            if taking_waypoint {
                self.assign_trailing(positions.len());
            }
            self.move_trailing(positions, sink);
        }
    }

    /// Register one more trailing segment at the tail.
    ///
    /// Returns where the new segment should be placed: the tail's last known
    /// position. The waypoint trail is left alone; its length bound catches up
    /// on the next step. Returns `None` before the first step or after
    /// termination.
    pub fn grow(&mut self) -> Option<Vec3> {
        if self.state == MovementState::Terminated {
            return None;
        }
        let spawn = self.last_positions.last().copied()?;
        self.assigned.push(None);
        self.last_positions.push(spawn);
        Some(spawn)
    }

    fn advance_target(&mut self, lead: Vec3) -> Vec3 {
        let next = match self.target {
            None => {
                self.state = MovementState::Moving;
                GridCell::containing(lead).center().step(self.direction)
            }
            Some(t) if lead.distance(t) <= self.settings.arrive_epsilon => t.step(self.direction),
            Some(t) => return t,
        };

        self.target = Some(next);
        self.waypoints.push_back(next);
        while self.waypoints.len() > self.segment_count() + 1 {
            self.waypoints.pop_front();
        }
        next
    }

    /// Hand each trailing segment the waypoint `index` places behind the
    /// newest one. Segments the trail is too short for keep what they had.
    fn assign_trailing(&mut self, position_count: usize) {
        let len = self.waypoints.len();
        let count = self.assigned.len().min(position_count.saturating_sub(1));

        for index in 1..=count {
            let Some(slot) = len.checked_sub(index + 1) else {
                debug!("Waypoint trail too short for segment {index} ({len} waypoints)");
                break;
            };
            self.assigned[index - 1] = Some(self.waypoints[slot]);
        }
    }

    fn move_trailing(&self, positions: &[Vec3], sink: &mut dyn SessionSink) {
        for (index, &position) in positions.iter().enumerate().skip(1) {
            let Some(waypoint) = self.assigned_waypoint(index) else {
                continue;
            };
            let velocity = self.velocity_toward(position, waypoint);
            if !velocity.is_finite() {
                continue;
            }
            sink.segment_moved(
                index,
                SegmentMotion {
                    target: waypoint,
                    velocity,
                    yaw: yaw_toward(position, waypoint),
                },
            );
        }
    }

    /// Per-tick displacement toward `to`, clamped so it never overshoots.
    /// Non-finite when `from == to`.
    fn velocity_toward(&self, from: Vec3, to: Vec3) -> Vec3 {
        let delta = to - from;
        let step = self.settings.blocks_per_tick().min(delta.length());
        delta.normalized() * step
    }
}
