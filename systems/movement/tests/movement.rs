use std::time::Duration;

use ant_maze_core::{
    heading_vector, AgentId, AgentMode, AgentState, AgentView, Command, Event, GridTopology,
    StateCorruptionError,
};
use ant_maze_system_collision::Collision;
use ant_maze_system_movement::{advance_agent, Movement, MovementTuning, StepContext};
use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const FRAME: Duration = Duration::from_millis(16);

fn step(
    topology: &GridTopology,
    view: &AgentView,
    agent: &AgentState,
    now: Duration,
    seed: u64,
) -> Result<AgentState, StateCorruptionError> {
    step_with(&MovementTuning::default(), topology, view, agent, now, seed)
}

fn step_with(
    tuning: &MovementTuning,
    topology: &GridTopology,
    view: &AgentView,
    agent: &AgentState,
    now: Duration,
    seed: u64,
) -> Result<AgentState, StateCorruptionError> {
    let context = StepContext {
        collision: Collision::new(topology),
        view,
        now,
        tuning,
        extent: topology.extent(),
    };
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    advance_agent(agent, &context, &mut rng)
}

/// Records `pink` samples one frame apart, finishing with a single clear one.
fn mostly_pink_history(agent: &mut AgentState, pink: u32, window: Duration) -> Duration {
    let mut at = Duration::ZERO;
    for _ in 0..pink {
        agent.monitor.record(at, true, window);
        at += FRAME;
    }
    agent.monitor.record(at, false, window);
    at + FRAME
}

fn solo(topology: &GridTopology, point: Vec2, heading: f32) -> (AgentState, AgentView) {
    let origin = topology.origin();
    let agent = AgentState::spawn(AgentId::new(0), point, origin, heading);
    let view = AgentView::from_states(vec![agent.clone()], origin);
    (agent, view)
}

#[test]
fn blocked_agent_turns_toward_a_clear_probe_without_moving() {
    let topology = GridTopology::fully_walled(3, 3);
    let start = Vec2::new(71.0, 60.0);

    for seed in 0..32 {
        let (agent, view) = solo(&topology, start, 0.0);
        let next = step(&topology, &view, &agent, FRAME, seed).expect("agent is in view");

        assert!(!next.is_phasing(), "seed {seed} phased with a clear probe");
        assert_eq!(next.mode, AgentMode::Roaming);
        assert!(next.cartesian(topology.origin()).distance(start) < 1e-3);
        assert!(
            heading_vector(next.heading).x < 0.17,
            "seed {seed} kept pushing into the wall with heading {}",
            next.heading
        );
    }
}

#[test]
fn clear_path_moves_by_speed() {
    let topology = GridTopology::fully_walled(3, 3);
    let start = Vec2::new(60.0, 60.0);
    let (agent, view) = solo(&topology, start, 90.0);

    let next = step(&topology, &view, &agent, FRAME, 5).expect("agent is in view");
    let moved = next.cartesian(topology.origin()).distance(start);
    assert!((moved - 1.2).abs() < 1e-3, "moved {moved}");
    assert!(!next.is_phasing());
}

#[test]
fn straddling_without_escape_starts_phasing_in_place() {
    let topology = GridTopology::fully_walled(3, 3);
    let start = Vec2::new(44.5, 60.0);
    let (agent, view) = solo(&topology, start, 0.0);

    let next = step(&topology, &view, &agent, FRAME, 9).expect("agent is in view");
    assert!(next.is_phasing());
    assert_eq!(next.mode, AgentMode::Phasing);
    assert!(next.wall_between_points);
    assert!(next.cartesian(topology.origin()).distance(start) < 1e-3);
}

#[test]
fn sustained_pink_streak_forces_phasing_move() {
    let topology = GridTopology::fully_walled(3, 3);
    let tuning = MovementTuning::default();
    let start = Vec2::new(44.5, 60.0);
    let (mut agent, _) = solo(&topology, start, 0.0);

    let mut at = Duration::ZERO;
    while at <= tuning.pink_window() {
        agent.monitor.record(at, true, tuning.pink_window());
        at += FRAME;
    }
    let view = AgentView::from_states(vec![agent.clone()], topology.origin());

    let next = step(&topology, &view, &agent, at, 3).expect("agent is in view");
    let moved = next.cartesian(topology.origin()).distance(start);
    let expected = tuning.speed * tuning.phasing_speed_factor;
    assert!((moved - expected).abs() < 1e-3, "moved {moved}");
}

#[test]
fn head_on_agents_hold_position() {
    let topology = GridTopology::fully_walled(5, 3);
    let origin = topology.origin();
    let left = AgentState::spawn(AgentId::new(0), Vec2::new(95.0, 60.0), origin, 0.0);
    let right = AgentState::spawn(AgentId::new(1), Vec2::new(105.0, 60.0), origin, 180.0);
    let view = AgentView::from_states(vec![left, right], origin);

    let mut movement = Movement::new(17, MovementTuning::default());
    let events = [Event::TimeAdvanced {
        dt: FRAME,
        now: FRAME,
    }];
    let mut commands = Vec::new();
    movement
        .handle(&events, &view, &topology, &mut commands)
        .expect("view is consistent");

    let [Command::CommitAgents { agents }] = commands.as_slice() else {
        panic!("expected a single commit, got {commands:?}");
    };
    assert_eq!(agents.len(), 2);
    for (before, after) in view.iter().zip(agents) {
        assert_eq!(before.id, after.id);
        assert!(!after.is_phasing());
        assert!(before.cartesian(origin).distance(after.cartesian(origin)) < 1e-3);
    }
    let gap = agents[0].cartesian(origin).distance(agents[1].cartesian(origin));
    assert!(gap >= 9.0, "agents closed to {gap}");
}

#[test]
fn agent_missing_from_view_is_reported() {
    let topology = GridTopology::fully_walled(3, 3);
    let (agent, _) = solo(&topology, Vec2::new(60.0, 60.0), 0.0);
    let empty = AgentView::from_states(Vec::new(), topology.origin());

    assert_eq!(
        step(&topology, &empty, &agent, FRAME, 1),
        Err(StateCorruptionError::UnknownAgent {
            agent: AgentId::new(0)
        })
    );
}

#[test]
fn phasing_agent_recovers_once_clear() {
    let topology = GridTopology::fully_walled(3, 3);
    let start = Vec2::new(60.0, 60.0);
    let (mut agent, _) = solo(&topology, start, 90.0);
    agent.mode = AgentMode::Phasing;
    let view = AgentView::from_states(vec![agent.clone()], topology.origin());

    let next = step(&topology, &view, &agent, FRAME, 21).expect("agent is in view");
    let moved = next.cartesian(topology.origin()).distance(start);
    assert!((moved - 1.8).abs() < 1e-3, "moved {moved}");
    assert!(!next.is_phasing());
    assert_eq!(next.mode, AgentMode::Roaming);
}

#[test]
fn phasing_is_clamped_to_the_map() {
    let topology = GridTopology::fully_walled(3, 3);
    let start = Vec2::new(6.5, 60.0);
    let (mut agent, _) = solo(&topology, start, 180.0);
    agent.mode = AgentMode::Stuck;
    let view = AgentView::from_states(vec![agent.clone()], topology.origin());

    for seed in 0..16 {
        let next = step(&topology, &view, &agent, FRAME, seed).expect("agent is in view");
        let position = next.cartesian(topology.origin());
        assert!(position.x >= 6.0 - 1e-3 && position.x <= 114.0 + 1e-3);
        assert!(position.y >= 6.0 - 1e-3 && position.y <= 114.0 + 1e-3);
    }
}

#[test]
fn frequent_pink_samples_force_phasing_without_a_long_streak() {
    let topology = GridTopology::fully_walled(3, 3);
    let tuning = MovementTuning::default();
    let start = Vec2::new(44.5, 60.0);
    let (mut agent, _) = solo(&topology, start, 0.0);
    let now = mostly_pink_history(&mut agent, 20, tuning.pink_window());
    assert_eq!(agent.monitor.since(), None);
    let view = AgentView::from_states(vec![agent.clone()], topology.origin());

    let next = step(&topology, &view, &agent, now, 4).expect("agent is in view");

    assert_eq!(next.monitor.since(), Some(now), "streak must be fresh");
    assert_eq!(next.monitor.len(), 22);
    assert!(next.monitor.pink_ratio() > tuning.pink_ratio_threshold);
    let moved = next.cartesian(topology.origin()).distance(start);
    let expected = tuning.speed * tuning.phasing_speed_factor;
    assert!((moved - expected).abs() < 1e-3, "moved {moved}");
}

#[test]
fn sparse_pink_history_does_not_force_phasing() {
    let topology = GridTopology::fully_walled(3, 3);
    let tuning = MovementTuning::default();
    let start = Vec2::new(44.5, 60.0);
    let (mut agent, _) = solo(&topology, start, 0.0);
    let now = mostly_pink_history(&mut agent, 8, tuning.pink_window());
    let view = AgentView::from_states(vec![agent.clone()], topology.origin());

    let next = step(&topology, &view, &agent, now, 9).expect("agent is in view");

    assert_eq!(next.monitor.len(), 10);
    assert!(next.is_phasing(), "straddling footprint has no escape");
    assert!(next.cartesian(topology.origin()).distance(start) < 1e-3);
}

#[test]
fn forced_phasing_draws_a_fresh_heading() {
    let topology = GridTopology::fully_walled(3, 3);
    let tuning = MovementTuning {
        phasing_jitter_chance: 0.0,
        heading_jitter_chance: 0.0,
        ..MovementTuning::default()
    };
    let (mut agent, _) = solo(&topology, Vec2::new(44.5, 60.0), 37.0);
    let now = mostly_pink_history(&mut agent, 20, tuning.pink_window());
    let view = AgentView::from_states(vec![agent.clone()], topology.origin());

    for seed in 0..8 {
        let next = step_with(&tuning, &topology, &view, &agent, now, seed)
            .expect("agent is in view");
        assert_ne!(next.heading, 37.0, "seed {seed} kept the old heading");
    }
}

#[test]
fn already_phasing_agent_keeps_heading_without_jitter() {
    let topology = GridTopology::fully_walled(3, 3);
    let tuning = MovementTuning {
        phasing_jitter_chance: 0.0,
        heading_jitter_chance: 0.0,
        ..MovementTuning::default()
    };
    let (mut agent, _) = solo(&topology, Vec2::new(60.0, 60.0), 37.0);
    agent.mode = AgentMode::Phasing;
    let view = AgentView::from_states(vec![agent.clone()], topology.origin());

    for seed in 0..8 {
        let next = step_with(&tuning, &topology, &view, &agent, FRAME, seed)
            .expect("agent is in view");
        assert_eq!(next.heading, 37.0);
    }
}
