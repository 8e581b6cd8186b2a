//! Integration test: start commands arriving from another thread.
//!
//! Commands only take effect at the top of a cycle, and a malformed command
//! stops a running excitation.

use std::thread;

use dynid_common::config::SimulationConfig;
use dynid_common::messages::{DataChunk, StartCommand};
use dynid_controller::clock::ManualClock;
use dynid_controller::controller::ExcitationController;
use dynid_controller::cycle::CycleRunner;
use dynid_controller::inbox::{InboxError, command_channel};
use dynid_controller::sim::{SimJoint, SimRobot};

const JOINTS: [&str; 2] = ["hip", "knee"];

fn runner() -> (
    CycleRunner<SimJoint, Vec<DataChunk>, ManualClock>,
    dynid_controller::inbox::StartSender,
    SimRobot,
) {
    let robot = SimRobot::new(&JOINTS, SimulationConfig::default());
    let mut controller = ExcitationController::new(Vec::new(), ManualClock::new(), 32);
    controller.init(&JOINTS, &robot).unwrap();
    let (tx, inbox) = command_channel(1);
    (CycleRunner::new(controller, inbox, 1000), tx, robot)
}

#[test]
fn command_from_other_thread_applies_on_next_cycle() {
    let (mut runner, tx, _robot) = runner();

    runner.cycle_body();
    assert_eq!(runner.controller().active_joint(), None);

    thread::spawn(move || {
        tx.send(StartCommand::new("knee", 2, -0.5, 0.5, 1.0))
            .unwrap();
    })
    .join()
    .unwrap();

    assert_eq!(runner.controller().active_joint(), None);
    runner.cycle_body();
    assert_eq!(runner.controller().active_joint(), Some(1));
}

#[test]
fn malformed_command_stops_running_excitation() {
    let (mut runner, tx, robot) = runner();
    robot.joint("hip").unwrap().set_position(2.0);

    tx.send(StartCommand::new("hip", 4, -1.0, 1.0, 3.0))
        .unwrap();
    for _ in 0..6 {
        runner.cycle_body();
    }
    assert_eq!(robot.joint("hip").unwrap().commanded_effort(), -3.0);
    assert_eq!(runner.controller().sink().len(), 1);

    tx.send(StartCommand::new("hip", 0, -1.0, 1.0, 3.0))
        .unwrap();
    runner.cycle_body();

    assert_eq!(runner.controller().active_joint(), None);
    assert_eq!(robot.joint("hip").unwrap().commanded_effort(), 0.0);
    assert_eq!(robot.joint("knee").unwrap().commanded_effort(), 0.0);

    for _ in 0..20 {
        runner.cycle_body();
    }
    assert_eq!(runner.controller().sink().len(), 1);
    assert_eq!(runner.controller().stats().rejected_commands, 1);
}

#[test]
fn second_command_in_same_cycle_is_refused_by_full_inbox() {
    let (mut runner, tx, _robot) = runner();
    tx.send(StartCommand::new("hip", 4, -1.0, 1.0, 1.0))
        .unwrap();
    assert_eq!(
        tx.send(StartCommand::new("knee", 4, -1.0, 1.0, 1.0)),
        Err(InboxError::Full)
    );

    runner.cycle_body();
    assert_eq!(runner.controller().active_joint(), Some(0));

    tx.send(StartCommand::new("knee", 4, -1.0, 1.0, 1.0))
        .unwrap();
    runner.cycle_body();
    assert_eq!(runner.controller().active_joint(), Some(1));
    assert_eq!(runner.controller().tick(), 1);
}

#[test]
fn over_long_joint_name_from_the_wire_stops_excitation() {
    let (mut runner, tx, robot) = runner();
    robot.joint("knee").unwrap().set_position(-1.0);
    tx.send(StartCommand::new("knee", 4, -0.5, 0.5, 2.0))
        .unwrap();
    runner.cycle_body();
    assert_eq!(robot.joint("knee").unwrap().commanded_effort(), 2.0);

    let json = format!(
        r#"{{"joint_name":"knee{}","chunksize":4,"lower_position":-0.5,"upper_position":0.5,"torque_magnitude":2.0}}"#,
        "_".repeat(100)
    );
    let command: StartCommand = serde_json::from_str(&json).unwrap();
    tx.send(command).unwrap();
    runner.cycle_body();

    assert_eq!(runner.controller().active_joint(), None);
    assert_eq!(robot.joint("knee").unwrap().commanded_effort(), 0.0);
    assert_eq!(runner.controller().stats().rejected_commands, 1);
}
