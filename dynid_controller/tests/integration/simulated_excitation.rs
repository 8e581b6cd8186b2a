//! Integration test: closed loop against the simulated plant.
//!
//! The excited joint swings back and forth across its bounds, chunks arrive
//! through the pooled channel with contiguous ticks, and the other joints
//! never move.

use std::time::Duration;

use dynid_common::config::SimulationConfig;
use dynid_common::messages::StartCommand;
use dynid_controller::clock::ManualClock;
use dynid_controller::controller::ExcitationController;
use dynid_controller::cycle::CycleRunner;
use dynid_controller::inbox::command_channel;
use dynid_controller::sim::SimRobot;
use dynid_controller::sink::chunk_channel;

const JOINTS: [&str; 3] = ["base", "elbow", "wrist"];
const CHUNKSIZE: usize = 100;
const CYCLES: usize = 3000;

#[test]
fn joint_oscillates_between_bounds() {
    let mut robot = SimRobot::new(&JOINTS, SimulationConfig::default());
    let clock = ManualClock::new();
    let (sink, chunks) = chunk_channel(4, CHUNKSIZE);
    let mut controller = ExcitationController::new(sink, clock.clone(), CHUNKSIZE);
    controller.init(&JOINTS, &robot).unwrap();

    let (tx, inbox) = command_channel(1);
    let mut runner = CycleRunner::new(controller, inbox, 1000);
    let dt = runner.cycle_time();

    // Start below the lower bound so the first decision pushes up.
    robot.joint("elbow").unwrap().set_position(-0.3);
    tx.send(StartCommand::new("elbow", CHUNKSIZE as i64, -0.2, 0.2, 2.0))
        .unwrap();

    let mut ticks = Vec::new();
    let mut positions = Vec::new();
    let mut torques = Vec::new();
    for _ in 0..CYCLES {
        robot.step(dt);
        clock.advance(dt);
        runner.cycle_body();
        while let Some(chunk) = chunks.try_recv() {
            assert!(chunk.is_consistent());
            assert_eq!(chunk.len(), CHUNKSIZE);
            ticks.extend_from_slice(&chunk.tick);
            positions.extend_from_slice(&chunk.position);
            torques.extend_from_slice(&chunk.command_torque);
            chunks.recycle(chunk);
        }
    }
    runner.shutdown();

    assert_eq!(ticks.len(), (CYCLES / CHUNKSIZE - 1) * CHUNKSIZE);
    assert!(ticks.iter().enumerate().all(|(i, &t)| t == i as u64));

    let max = positions.iter().cloned().fold(f64::MIN, f64::max);
    let min = positions.iter().cloned().fold(f64::MAX, f64::min);
    assert!(max > 0.2, "never reached the upper bound: {max}");
    assert!(min < -0.2, "never reached the lower bound: {min}");

    assert!(torques.iter().all(|&t| t == 2.0 || t == -2.0));
    let flips = torques.windows(2).filter(|w| w[0] != w[1]).count();
    assert!(flips >= 4, "only {flips} torque reversals");

    for name in ["base", "wrist"] {
        let joint = robot.joint(name).unwrap();
        assert_eq!(joint.commanded_effort(), 0.0);
    }
    assert_eq!(robot.joint("elbow").unwrap().commanded_effort(), 0.0);
    assert_eq!(runner.controller().sink().stats().dropped, 0);
}
