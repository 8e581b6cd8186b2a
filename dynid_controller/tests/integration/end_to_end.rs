//! Integration test: three joints, chunk size 4, nine ticks.
//!
//! j1 oscillates across its bounds; exactly two chunks are published, on
//! tick 4 and tick 8, carrying ticks {0..3} and {4..7}.

use dynid_common::config::SimulationConfig;
use dynid_common::messages::{DataChunk, StartCommand};
use dynid_controller::clock::ManualClock;
use dynid_controller::controller::ExcitationController;
use dynid_controller::sim::SimRobot;
use std::time::Duration;

const JOINTS: [&str; 3] = ["j0", "j1", "j2"];

/// Positions fed to j1 on each tick: crosses the upper bound, then the lower.
const J1_POSITIONS: [f64; 9] = [0.0, 0.5, 1.2, 0.4, -0.6, -1.3, -0.2, 0.8, 1.0];

#[test]
fn two_chunks_in_nine_ticks() {
    let robot = SimRobot::new(&JOINTS, SimulationConfig::default());
    let clock = ManualClock::new();
    let mut controller: ExcitationController<_, Vec<DataChunk>, _> =
        ExcitationController::new(Vec::new(), clock.clone(), 100);
    controller.init(&JOINTS, &robot).unwrap();

    controller
        .handle_start(&StartCommand::new("j1", 4, -1.0, 1.0, 2.0))
        .unwrap();
    assert_eq!(controller.active_joint(), Some(1));
    assert_eq!(controller.tick(), 0);

    let j1 = robot.joint("j1").unwrap();
    let mut publish_ticks = Vec::new();
    for (tick, position) in J1_POSITIONS.iter().enumerate() {
        j1.set_position(*position);
        let before = controller.sink().len();
        controller.update();
        if controller.sink().len() > before {
            publish_ticks.push(tick);
        }
        assert_eq!(robot.joint("j0").unwrap().commanded_effort(), 0.0);
        assert_eq!(robot.joint("j2").unwrap().commanded_effort(), 0.0);
        clock.advance(Duration::from_millis(1));
    }

    assert_eq!(publish_ticks, vec![4, 8]);

    let chunks = controller.sink();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].tick, vec![0, 1, 2, 3]);
    assert_eq!(chunks[1].tick, vec![4, 5, 6, 7]);
    for chunk in chunks {
        assert_eq!(chunk.len(), 4);
        assert!(chunk.is_consistent());
    }

    assert_eq!(chunks[0].position, vec![0.0, 0.5, 1.2, 0.4]);
    assert_eq!(chunks[0].command_torque, vec![0.0, 0.0, -2.0, -2.0]);
    assert_eq!(chunks[1].command_torque, vec![-2.0, 2.0, 2.0, 2.0]);
    for (ms, expected) in chunks[1].milliseconds.iter().zip([4.0, 5.0, 6.0, 7.0]) {
        assert!((ms - expected).abs() < 1e-9);
    }

    // Tick 8 (position 1.0, at the upper bound) sits in slot 0 of the next chunk.
    assert_eq!(controller.buffer().chunk().tick[0], 8);
    assert_eq!(controller.buffer().chunk().command_torque[0], -2.0);
    assert_eq!(j1.commanded_effort(), -2.0);
}
