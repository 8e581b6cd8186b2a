//! Deterministic RT cycle: plant → commands → excitation tick.
//!
//! Implements the control loop with `clock_nanosleep(TIMER_ABSTIME)` under
//! the `rt` feature (thread sleep otherwise), cycle time measurement,
//! overrun detection, and the cycle body.
//!
//! ## RT Setup Sequence
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)`: lock all pages.
//! 2. Prefault stack pages.
//! 3. `sched_setaffinity`: pin to isolated CPU core.
//! 4. `sched_setscheduler(SCHED_FIFO, prio)`: RT priority.
//!
//! ## Cycle Body
//! 1. Plant hook (simulation step or hardware read).
//! 2. Drain the start command inbox into the controller.
//! 3. `ExcitationController::update()`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dynid_common::joint::JointState;
use thiserror::Error;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::controller::ExcitationController;
use crate::inbox::StartInbox;
use crate::sink::ChunkSink;

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: i64,
    /// Minimum cycle duration [ns].
    pub min_cycle_ns: i64,
    /// Maximum cycle duration [ns].
    pub max_cycle_ns: i64,
    /// Running sum for average computation.
    pub sum_cycle_ns: i64,
    /// Number of overruns detected.
    pub overruns: u64,
    /// Maximum wake-up latency [ns].
    pub max_latency_ns: i64,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
        }
    }

    /// Record a cycle duration. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns += duration_ns;
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    /// Average cycle time [ns] (0 if no cycles).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

/// Errors during RT setup or cycle execution.
#[derive(Debug, Error)]
pub enum CycleError {
    /// RT system call failed.
    #[error("RT setup error: {0}")]
    RtSetup(String),

    /// A cycle took longer than its budget.
    #[error("cycle overrun: {actual_ns}ns > {budget_ns}ns budget")]
    CycleOverrun {
        /// Actual cycle duration [ns].
        actual_ns: i64,
        /// Configured cycle budget [ns].
        budget_ns: i64,
    },
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Stack touched before entering the loop.
const STACK_PREFAULT_BYTES: usize = 256 * 1024;

#[cfg(feature = "rt")]
fn setup_error(step: &str, err: impl std::fmt::Display) -> CycleError {
    CycleError::RtSetup(format!("{step} failed: {err}"))
}

/// Materialize `STACK_PREFAULT_BYTES` of stack so the loop never faults on it.
#[inline(never)]
fn prefault_stack() {
    let buf = [0xFFu8; STACK_PREFAULT_BYTES];
    core::hint::black_box(&buf);
}

/// Prepare the calling thread for the cycle loop.
///
/// Locks memory, prefaults the stack, pins the thread to `cpu_core` and
/// switches it to `SCHED_FIFO` at `rt_priority`. Without the `rt` feature
/// only the stack is prefaulted.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    #[cfg(feature = "rt")]
    {
        use nix::sched::{CpuSet, sched_setaffinity};
        use nix::sys::mman::{MlockallFlags, mlockall};
        use nix::unistd::Pid;

        mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
            .map_err(|e| setup_error("mlockall", e))?;
        prefault_stack();

        let mut cpus = CpuSet::new();
        cpus.set(cpu_core)
            .map_err(|e| setup_error(&format!("CpuSet::set({cpu_core})"), e))?;
        sched_setaffinity(Pid::from_raw(0), &cpus)
            .map_err(|e| setup_error("sched_setaffinity", e))?;

        // nix has no sched_setscheduler wrapper.
        let param = libc::sched_param {
            sched_priority: rt_priority,
        };
        // SAFETY: `param` outlives the call; pid 0 is the calling thread.
        if unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) } != 0 {
            return Err(setup_error(
                &format!("sched_setscheduler(SCHED_FIFO, {rt_priority})"),
                std::io::Error::last_os_error(),
            ));
        }
    }

    #[cfg(not(feature = "rt"))]
    {
        let _ = (cpu_core, rt_priority);
        prefault_stack();
    }

    Ok(())
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Owns the controller and its inbox and paces the tick.
pub struct CycleRunner<J, S, C> {
    controller: ExcitationController<J, S, C>,
    inbox: StartInbox,
    stats: CycleStats,
    cycle_time_ns: i64,
}

impl<J, S, C> CycleRunner<J, S, C>
where
    J: JointState,
    S: ChunkSink,
    C: Clock,
{
    pub fn new(
        controller: ExcitationController<J, S, C>,
        inbox: StartInbox,
        cycle_time_us: u32,
    ) -> Self {
        Self {
            controller,
            inbox,
            stats: CycleStats::new(),
            cycle_time_ns: i64::from(cycle_time_us) * 1000,
        }
    }

    pub fn controller(&self) -> &ExcitationController<J, S, C> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ExcitationController<J, S, C> {
        &mut self.controller
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    /// Nominal cycle period.
    pub fn cycle_time(&self) -> Duration {
        Duration::from_nanos(self.cycle_time_ns as u64)
    }

    /// One cycle without the plant hook: drain commands, then tick.
    pub fn cycle_body(&mut self) {
        let controller = &mut self.controller;
        self.inbox.drain(|command| {
            // Rejections are logged and counted by the controller.
            let _ = controller.handle_start(&command);
        });
        self.controller.update();
    }

    /// Run cycles until `running` is cleared or `max_cycles` is reached.
    ///
    /// `plant` is called at the top of every cycle with the nominal period,
    /// before commands are drained.
    ///
    /// # Errors
    /// Under the `rt` feature, the first cycle overrun stops the loop with
    /// `CycleError::CycleOverrun`. Without it, overruns are only counted.
    pub fn run<P>(
        &mut self,
        running: &AtomicBool,
        max_cycles: Option<u64>,
        plant: P,
    ) -> Result<(), CycleError>
    where
        P: FnMut(Duration),
    {
        info!(
            cycle_time_us = self.cycle_time_ns / 1000,
            max_cycles, "entering cycle loop"
        );

        #[cfg(feature = "rt")]
        {
            self.run_rt_loop(running, max_cycles, plant)
        }

        #[cfg(not(feature = "rt"))]
        {
            self.run_sim_loop(running, max_cycles, plant)
        }
    }

    #[inline]
    fn should_continue(&self, running: &AtomicBool, max_cycles: Option<u64>) -> bool {
        running.load(Ordering::Relaxed)
            && max_cycles.is_none_or(|max| self.stats.cycle_count < max)
    }

    /// RT cycle loop using `clock_nanosleep(TIMER_ABSTIME)`.
    #[cfg(feature = "rt")]
    fn run_rt_loop<P>(
        &mut self,
        running: &AtomicBool,
        max_cycles: Option<u64>,
        mut plant: P,
    ) -> Result<(), CycleError>
    where
        P: FnMut(Duration),
    {
        use nix::sys::time::{TimeSpec, TimeValLike};
        use nix::time::{ClockId, ClockNanosleepFlags, clock_gettime, clock_nanosleep};

        let clock = ClockId::CLOCK_MONOTONIC;
        let now = || {
            clock_gettime(clock).map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")))
        };
        let dt = self.cycle_time();
        let period = TimeSpec::nanoseconds(self.cycle_time_ns);
        let mut next_wake = now()?;

        while self.should_continue(running, max_cycles) {
            next_wake = next_wake + period;
            let cycle_start = now()?;

            plant(dt);
            self.cycle_body();

            let duration_ns = (now()? - cycle_start).num_nanoseconds();
            // Wake-up lateness relative to the deadline this cycle started on.
            let wake_latency_ns = (cycle_start - next_wake + period).num_nanoseconds().abs();
            self.stats.record(duration_ns, wake_latency_ns);

            if duration_ns > self.cycle_time_ns {
                self.stats.overruns += 1;
                self.controller.go_idle();
                return Err(CycleError::CycleOverrun {
                    actual_ns: duration_ns,
                    budget_ns: self.cycle_time_ns,
                });
            }

            let _ = clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, &next_wake);
        }
        Ok(())
    }

    /// Simulation cycle loop using `std::thread::sleep`.
    #[cfg(not(feature = "rt"))]
    fn run_sim_loop<P>(
        &mut self,
        running: &AtomicBool,
        max_cycles: Option<u64>,
        mut plant: P,
    ) -> Result<(), CycleError>
    where
        P: FnMut(Duration),
    {
        use std::time::Instant;

        let dt = self.cycle_time();

        while self.should_continue(running, max_cycles) {
            let cycle_start = Instant::now();

            plant(dt);
            self.cycle_body();

            let elapsed = cycle_start.elapsed();
            let duration_ns = elapsed.as_nanos() as i64;
            self.stats.record(duration_ns, 0);

            if duration_ns > self.cycle_time_ns {
                self.stats.overruns += 1;
            }

            if let Some(remaining) = dt.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }
        Ok(())
    }

    /// Stop exciting, zero every joint and report statistics.
    pub fn shutdown(&mut self) {
        self.controller.go_idle();
        if self.stats.overruns > 0 {
            warn!(overruns = self.stats.overruns, "cycle overruns occurred");
        }
        info!(
            cycles = self.stats.cycle_count,
            avg_ns = self.stats.avg_cycle_ns(),
            max_ns = self.stats.max_cycle_ns,
            chunks = self.controller.stats().published_chunks,
            "cycle loop stopped"
        );
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::inbox::command_channel;
    use crate::sim::{SimJoint, SimRobot};
    use dynid_common::config::SimulationConfig;
    use dynid_common::messages::{DataChunk, StartCommand};

    type TestRunner = CycleRunner<SimJoint, Vec<DataChunk>, ManualClock>;

    fn runner(cycle_time_us: u32) -> (TestRunner, crate::inbox::StartSender, SimRobot) {
        let robot = SimRobot::new(&["j0", "j1"], SimulationConfig::default());
        let mut controller = ExcitationController::new(Vec::new(), ManualClock::new(), 16);
        controller.init(&["j0", "j1"], &robot).unwrap();
        let (tx, inbox) = command_channel(1);
        (CycleRunner::new(controller, inbox, cycle_time_us), tx, robot)
    }

    #[test]
    fn cycle_stats_basic() {
        let mut stats = CycleStats::new();
        assert_eq!(stats.cycle_count, 0);
        assert_eq!(stats.avg_cycle_ns(), 0);

        stats.record(500_000, 1_000);
        assert_eq!(stats.cycle_count, 1);
        assert_eq!(stats.min_cycle_ns, 500_000);
        assert_eq!(stats.max_cycle_ns, 500_000);
        assert_eq!(stats.max_latency_ns, 1_000);

        stats.record(600_000, 500);
        assert_eq!(stats.min_cycle_ns, 500_000);
        assert_eq!(stats.max_cycle_ns, 600_000);
        assert_eq!(stats.max_latency_ns, 1_000);
        assert_eq!(stats.avg_cycle_ns(), 550_000);
    }

    #[test]
    fn rt_setup_no_rt_feature_is_noop() {
        #[cfg(not(feature = "rt"))]
        {
            assert!(rt_setup(0, 80).is_ok());
        }
    }

    #[test]
    fn cycle_error_display() {
        let err = CycleError::CycleOverrun {
            actual_ns: 1_500_000,
            budget_ns: 1_000_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("1500000"));
        assert!(msg.contains("1000000"));
    }

    #[test]
    fn cycle_body_applies_pending_command_before_tick() {
        let (mut runner, tx, _robot) = runner(1000);
        tx.send(StartCommand::new("j1", 4, -1.0, 1.0, 1.0))
            .unwrap();

        runner.cycle_body();
        assert_eq!(runner.controller().active_joint(), Some(1));
        assert_eq!(runner.controller().tick(), 1);
    }

    #[test]
    fn run_stops_after_max_cycles() {
        let (mut runner, tx, mut robot) = runner(100);
        tx.send(StartCommand::new("j0", 4, -1.0, 1.0, 1.0))
            .unwrap();

        let running = AtomicBool::new(true);
        let mut plant_steps = 0;
        runner
            .run(&running, Some(9), |dt| {
                robot.step(dt);
                plant_steps += 1;
            })
            .unwrap();

        assert_eq!(plant_steps, 9);
        assert_eq!(runner.stats().cycle_count, 9);
        assert_eq!(runner.controller().sink().len(), 2);
    }

    #[test]
    fn run_returns_immediately_when_not_running() {
        let (mut runner, _tx, _robot) = runner(100);
        let running = AtomicBool::new(false);
        runner.run(&running, None, |_| {}).unwrap();
        assert_eq!(runner.stats().cycle_count, 0);
    }

    #[test]
    fn shutdown_goes_idle() {
        let (mut runner, tx, robot) = runner(1000);
        robot.joint("j0").unwrap().set_position(-3.0);
        tx.send(StartCommand::new("j0", 4, -1.0, 1.0, 2.0))
            .unwrap();
        runner.cycle_body();
        assert_eq!(robot.joint("j0").unwrap().commanded_effort(), 2.0);

        runner.shutdown();
        assert_eq!(runner.controller().active_joint(), None);
        assert_eq!(robot.joint("j0").unwrap().commanded_effort(), 0.0);
    }
}
