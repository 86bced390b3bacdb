use navbots_core::{
    AGENT_RADIUS, Actuation, ArenaConfig, Controller, Observation, Simulation, SteeringAssist,
    Termination, World,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;

/// Steers toward the goal while accelerating; reads only the observation.
struct GoalSeeker;

impl Controller for GoalSeeker {
    fn kind(&self) -> &'static str {
        "test.goal_seeker"
    }

    fn act(&self, observation: &Observation) -> Actuation {
        Actuation::new(0.3, observation.goal_angle)
    }
}

fn seeded_world(seed: u64) -> World {
    let config = ArenaConfig {
        rng_seed: Some(seed),
        ..ArenaConfig::default()
    };
    World::from_config(config).expect("world")
}

#[test]
fn seeded_episodes_produce_identical_trajectories() {
    let mut sim_a = Simulation::with_default_agent(seeded_world(0xC0FFEE));
    let mut sim_b = Simulation::with_default_agent(seeded_world(0xC0FFEE));
    let mut rng_a = SmallRng::seed_from_u64(42);
    let mut rng_b = SmallRng::seed_from_u64(42);

    sim_a.begin_episode(&mut rng_a);
    sim_b.begin_episode(&mut rng_b);
    assert_eq!(sim_a.agent(), sim_b.agent());

    loop {
        let step_a = sim_a.step(&GoalSeeker, &mut rng_a);
        let step_b = sim_b.step(&GoalSeeker, &mut rng_b);
        assert_eq!(step_a, step_b);
        assert_eq!(sim_a.agent(), sim_b.agent());
        if step_a.termination.is_some() {
            break;
        }
    }
    assert_eq!(sim_a.world().status(), sim_b.world().status());
}

#[test]
fn run_episode_matches_manual_stepping() {
    let mut manual = Simulation::with_default_agent(seeded_world(5));
    let mut driven = Simulation::with_default_agent(seeded_world(5));
    let mut rng_manual = SmallRng::seed_from_u64(9);
    let mut rng_driven = SmallRng::seed_from_u64(9);

    manual.begin_episode(&mut rng_manual);
    let mut last = None;
    while last.is_none() {
        last = manual.step(&GoalSeeker, &mut rng_manual).termination;
    }

    let summary = driven.run_episode(&GoalSeeker, &mut rng_driven);
    assert_eq!(Some(summary.termination), last);
    assert_eq!(summary.ticks, manual.world().tick());
    assert_eq!(summary.distance_traveled, manual.agent().distance_traveled);
    assert_eq!(summary.collisions, manual.agent().collisions);
}

#[test]
fn episodes_always_terminate_within_tick_limit() {
    let mut sim = Simulation::new(seeded_world(77), AGENT_RADIUS)
        .with_assist(Some(SteeringAssist::default()));
    let mut rng = SmallRng::seed_from_u64(1);
    for _ in 0..3 {
        let summary = sim.run_episode(&GoalSeeker, &mut rng);
        assert!(summary.ticks.0 <= 1_000);
        if summary.termination == Termination::TimeLimit {
            assert_eq!(summary.ticks.0, 1_000);
        }
        assert!(summary.energy >= 0.0 && summary.energy <= 100.0);
        assert!(summary.resources_collected as usize + summary.resources_remaining == 5);
    }
}
