//! Real-time simulation loop.
//!
//! [`SimulationLoop`] drives a shared [`Simulator`] from a dedicated timer
//! thread and fans each snapshot out to subscribers. It is a two-state
//! machine:
//!
//! ```text
//!            start()
//!   Stopped ---------> Running
//!      ^                  |
//!      +------------------+
//!            stop()
//! ```
//!
//! Editing and ticking share one lock, so a tick always sees a consistent
//! graph and every edit lands between two ticks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Receiver, Sender, TrySendError};
use tracing::{debug, info, warn};

use crate::circuit::{ComponentId, Connection, ConnectionId};
use crate::components::{Component, ComponentKind};
use crate::error::{BreadboardError, Result};
use crate::snapshot::Snapshot;
use crate::solver::{check_tick_rate, Simulator};

/// Snapshots buffered per subscriber before new ones are skipped.
const SUBSCRIBER_CAPACITY: usize = 16;

enum Control {
    SetPeriod(Duration),
    Stop,
}

struct Shared {
    simulator: Mutex<Simulator>,
    subscribers: Mutex<Vec<Sender<Arc<Snapshot>>>>,
    /// Set before the worker is told to stop; checked under the simulator
    /// lock right before each tick
    stopping: AtomicBool,
}

impl Shared {
    fn publish(&self, snapshot: &Arc<Snapshot>) {
        lock(&self.subscribers).retain(|tx| match tx.try_send(Arc::clone(snapshot)) {
            Ok(()) | Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => false,
        });
    }
}

struct Worker {
    control: Sender<Control>,
    handle: JoinHandle<()>,
}

/// Timer-driven simulation loop.
pub struct SimulationLoop {
    shared: Arc<Shared>,
    worker: Option<Worker>,
}

impl SimulationLoop {
    /// Wrap a simulator. The loop starts out stopped.
    pub fn new(simulator: Simulator) -> Self {
        Self {
            shared: Arc::new(Shared {
                simulator: Mutex::new(simulator),
                subscribers: Mutex::new(Vec::new()),
                stopping: AtomicBool::new(false),
            }),
            worker: None,
        }
    }

    /// Start ticking. Does nothing if already running.
    ///
    /// Fails without spawning anything if the configured tick rate is out
    /// of range.
    pub fn start(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }

        let hz = self.rate();
        check_tick_rate(hz)?;
        let period = period(hz);
        let (control_tx, control_rx) = bounded(4);
        self.shared.stopping.store(false, Ordering::SeqCst);

        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("breadboard-sim".into())
            .spawn(move || run(shared, control_rx, period))
            .map_err(|e| BreadboardError::LoopStart {
                message: e.to_string(),
            })?;

        self.worker = Some(Worker {
            control: control_tx,
            handle,
        });
        info!(hz, "simulation started");
        Ok(())
    }

    /// Stop ticking and wait for the timer thread to exit. No tick runs
    /// after this returns. Does nothing if already stopped.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        self.shared.stopping.store(true, Ordering::SeqCst);
        // The worker may already be gone; joining is what matters
        let _ = worker.control.send(Control::Stop);
        if worker.handle.join().is_err() {
            warn!("simulation thread panicked");
        }
        info!("simulation stopped");
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Change the tick rate, live if running.
    pub fn set_rate(&mut self, hz: f64) -> Result<()> {
        check_tick_rate(hz)?;
        self.edit(|sim| {
            let config = sim.config().clone().with_tick_rate(hz);
            sim.set_config(config)
        })?;

        if let Some(worker) = &self.worker {
            let _ = worker.control.send(Control::SetPeriod(period(hz)));
        }
        info!(hz, "simulation rate changed");
        Ok(())
    }

    /// Current tick rate in Hz.
    pub fn rate(&self) -> f64 {
        lock(&self.shared.simulator).config().tick_rate_hz
    }

    /// Receive every snapshot published from now on.
    ///
    /// A subscriber that falls behind misses snapshots rather than
    /// blocking the loop; dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> Receiver<Arc<Snapshot>> {
        let (tx, rx) = bounded(SUBSCRIBER_CAPACITY);
        lock(&self.shared.subscribers).push(tx);
        rx
    }

    /// Run `f` with exclusive access to the simulator, between ticks.
    pub fn edit<R>(&self, f: impl FnOnce(&mut Simulator) -> R) -> R {
        f(&mut lock(&self.shared.simulator))
    }

    pub fn latest_snapshot(&self) -> Arc<Snapshot> {
        lock(&self.shared.simulator).latest_snapshot()
    }

    pub fn add_component(&self, kind: ComponentKind, params: &[(&str, f64)]) -> Result<ComponentId> {
        self.edit(|sim| sim.add_component(kind, params))
    }

    pub fn remove_component(&self, id: ComponentId) -> Result<Component> {
        self.edit(|sim| sim.remove_component(id))
    }

    pub fn add_connection(&self, a: (ComponentId, &str), b: (ComponentId, &str)) -> Result<ConnectionId> {
        self.edit(|sim| sim.add_connection(a, b))
    }

    pub fn remove_connection(&self, id: ConnectionId) -> Result<Connection> {
        self.edit(|sim| sim.remove_connection(id))
    }
}

impl Drop for SimulationLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

fn period(hz: f64) -> Duration {
    Duration::from_secs_f64(1.0 / hz)
}

/// Lock a mutex, recovering the data if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn run(shared: Arc<Shared>, control: Receiver<Control>, period: Duration) {
    let mut ticker = tick(period);

    loop {
        let mut new_period = None;
        select! {
            recv(control) -> msg => match msg {
                Ok(Control::SetPeriod(p)) => new_period = Some(p),
                Ok(Control::Stop) | Err(_) => break,
            },
            recv(ticker) -> _ => {
                let snapshot = {
                    let mut sim = lock(&shared.simulator);
                    if shared.stopping.load(Ordering::SeqCst) {
                        break;
                    }
                    sim.tick()
                };
                shared.publish(&snapshot);
            }
        }

        if let Some(p) = new_period {
            debug!(?p, "tick period changed");
            ticker = tick(p);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::CircuitGraph;
    use crate::solver::SimulatorConfig;

    fn battery_resistor() -> Simulator {
        let mut graph = CircuitGraph::new();
        let bat = graph.add_battery(5.0).unwrap();
        let r = graph.add_resistor(220.0).unwrap();
        graph.add_connection((bat, "positive"), (r, "pin1")).unwrap();
        graph.add_connection((r, "pin2"), (bat, "negative")).unwrap();
        Simulator::new(graph)
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut sim_loop = SimulationLoop::new(battery_resistor());
        assert!(!sim_loop.is_running());
        sim_loop.start().unwrap();
        sim_loop.start().unwrap();
        assert!(sim_loop.is_running());
        sim_loop.stop();
        sim_loop.stop();
        assert!(!sim_loop.is_running());
    }

    #[test]
    fn test_start_rejects_bad_configured_rate() {
        let graph = battery_resistor().graph().clone();
        let config = SimulatorConfig::new().with_tick_rate(0.0);
        let mut sim_loop = SimulationLoop::new(Simulator::with_config(graph, config));

        let err = sim_loop.start().unwrap_err();
        assert!(matches!(err, BreadboardError::InvalidSimulationParam { .. }));
        assert!(!sim_loop.is_running());

        // Fixing the rate lets the loop run
        sim_loop.set_rate(500.0).unwrap();
        let rx = sim_loop.subscribe();
        sim_loop.start().unwrap();
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
        sim_loop.stop();
    }

    #[test]
    fn test_rate_bounds() {
        let mut sim_loop = SimulationLoop::new(battery_resistor());
        assert_eq!(sim_loop.rate(), 20.0);
        assert!(sim_loop.set_rate(0.0).is_err());
        assert!(sim_loop.set_rate(-5.0).is_err());
        assert!(sim_loop.set_rate(f64::INFINITY).is_err());
        sim_loop.set_rate(200.0).unwrap();
        assert_eq!(sim_loop.rate(), 200.0);
    }

    #[test]
    fn test_subscribers_receive_snapshots() {
        let mut sim_loop = SimulationLoop::new(battery_resistor());
        sim_loop.set_rate(500.0).unwrap();
        let rx = sim_loop.subscribe();
        sim_loop.start().unwrap();
        let snap = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        sim_loop.stop();
        assert!(snap.tick >= 1);
        assert!((snap.current(ComponentId(1)) - 5.0 / 220.0).abs() < 1e-9);
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let sim_loop = SimulationLoop::new(battery_resistor());
        let shared = Arc::clone(&sim_loop.shared);
        let _ = thread::spawn(move || {
            let _guard = shared.simulator.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert_eq!(sim_loop.edit(|sim| sim.graph().component_count()), 2);
    }
}
