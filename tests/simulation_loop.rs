use std::thread;
use std::time::Duration;

use breadboard_core::demos;
use breadboard_core::{ComponentId, ComponentKind, FaultKind, SimulationLoop, Simulator};

const TIMEOUT: Duration = Duration::from_secs(5);

fn running_loop(hz: f64) -> SimulationLoop {
    let mut sim_loop = SimulationLoop::new(Simulator::new(demos::battery_led().unwrap()));
    sim_loop.set_rate(hz).unwrap();
    sim_loop
}

#[test]
fn snapshots_arrive_in_tick_order() {
    let mut sim_loop = running_loop(200.0);
    let rx = sim_loop.subscribe();
    sim_loop.start().unwrap();

    let ticks: Vec<u64> = (0..5).map(|_| rx.recv_timeout(TIMEOUT).unwrap().tick).collect();
    sim_loop.stop();

    assert!(ticks.windows(2).all(|w| w[0] < w[1]), "{ticks:?}");
    let latest = sim_loop.latest_snapshot();
    assert!(latest.tick >= ticks[4]);
    assert!(latest.led_brightness[&ComponentId(2)] > 0.0);
}

#[test]
fn no_tick_runs_after_stop() {
    let mut sim_loop = running_loop(500.0);
    let rx = sim_loop.subscribe();
    sim_loop.start().unwrap();
    rx.recv_timeout(TIMEOUT).unwrap();

    sim_loop.stop();
    assert!(!sim_loop.is_running());
    let frozen = sim_loop.latest_snapshot().tick;
    while rx.try_recv().is_ok() {}

    thread::sleep(Duration::from_millis(50));
    assert_eq!(sim_loop.latest_snapshot().tick, frozen);
    assert!(rx.try_recv().is_err());
}

#[test]
fn restart_continues_counting() {
    let mut sim_loop = running_loop(500.0);
    let rx = sim_loop.subscribe();

    sim_loop.start().unwrap();
    rx.recv_timeout(TIMEOUT).unwrap();
    sim_loop.stop();
    let before = sim_loop.latest_snapshot().tick;
    while rx.try_recv().is_ok() {}

    sim_loop.start().unwrap();
    let next = rx.recv_timeout(TIMEOUT).unwrap();
    sim_loop.stop();
    assert!(next.tick > before);
}

#[test]
fn edits_while_running_show_up_in_later_snapshots() {
    let mut sim_loop = running_loop(500.0);
    let rx = sim_loop.subscribe();
    sim_loop.start().unwrap();
    rx.recv_timeout(TIMEOUT).unwrap();

    // A second battery straight across the first one
    let extra = sim_loop.add_component(ComponentKind::Battery, &[("voltage", 3.0)]).unwrap();
    sim_loop.add_connection((extra, "positive"), (ComponentId(0), "positive")).unwrap();
    sim_loop.add_connection((extra, "negative"), (ComponentId(0), "negative")).unwrap();

    let faulted = (0..100)
        .filter_map(|_| rx.recv_timeout(TIMEOUT).ok())
        .find(|snap| snap.has_fault(FaultKind::Singular));
    assert!(faulted.is_some());

    // Removing it clears the fault again
    sim_loop.remove_component(extra).unwrap();
    let cleared = (0..100)
        .filter_map(|_| rx.recv_timeout(TIMEOUT).ok())
        .find(|snap| snap.faults.is_empty());
    sim_loop.stop();
    assert!(cleared.is_some());
}

#[test]
fn rate_changes_apply_while_running() {
    let mut sim_loop = running_loop(20.0);
    let rx = sim_loop.subscribe();
    sim_loop.start().unwrap();

    sim_loop.set_rate(1000.0).unwrap();
    assert_eq!(sim_loop.rate(), 1000.0);
    assert!(sim_loop.set_rate(2000.0).is_err());
    assert_eq!(sim_loop.rate(), 1000.0);

    for _ in 0..10 {
        rx.recv_timeout(TIMEOUT).unwrap();
    }
    sim_loop.stop();
}

#[test]
fn dropped_subscriber_does_not_stall_the_loop() {
    let mut sim_loop = running_loop(500.0);
    drop(sim_loop.subscribe());
    let rx = sim_loop.subscribe();
    sim_loop.start().unwrap();

    for _ in 0..3 {
        rx.recv_timeout(TIMEOUT).unwrap();
    }
    sim_loop.stop();
}

#[test]
fn edit_runs_with_exclusive_access() {
    let sim_loop = running_loop(20.0);
    let count = sim_loop.edit(|sim| {
        sim.add_resistor(1000.0).unwrap();
        sim.graph().component_count()
    });
    assert_eq!(count, 4);
    assert!(!sim_loop.is_running());
}
