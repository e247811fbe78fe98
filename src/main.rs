//! Breadboard - Interactive Circuit Simulator
//!
//! Runs the bundled demo circuits through the simulation engine.
//!
//! # Usage
//!
//! ```bash
//! breadboard run battery-led --ticks 10 --rate 20
//! RUST_LOG=breadboard_core=debug breadboard run short-circuit
//! breadboard trace two-circuits
//! ```

use clap::{Parser, Subcommand};
use breadboard_core::{
    demos::Demo,
    error::Result,
    solver::{DEFAULT_MAX_ITERATIONS, DEFAULT_TICK_RATE_HZ, DEFAULT_TOLERANCE},
    ConnectionTrace, PinLevel, SimulationLoop, Simulator, SimulatorConfig, Snapshot,
};

/// Interactive circuit simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a demo circuit in real time and print each snapshot
    Run {
        #[arg(value_enum)]
        demo: Demo,

        /// Number of ticks to print before stopping
        #[arg(short, long, default_value_t = 5)]
        ticks: usize,

        /// Ticks per second
        #[arg(short, long, default_value_t = DEFAULT_TICK_RATE_HZ)]
        rate: f64,

        /// Convergence tolerance in volts
        #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
        tolerance: f64,

        /// Maximum Newton iterations per tick
        #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
        max_iterations: usize,
    },

    /// Solve a demo circuit once and print its connection trace
    Trace {
        #[arg(value_enum)]
        demo: Demo,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Command::Run {
            demo,
            ticks,
            rate,
            tolerance,
            max_iterations,
        } => {
            let config = SimulatorConfig::new()
                .with_tick_rate(rate)
                .with_tolerance(tolerance)
                .with_max_iterations(max_iterations);
            config.validate()?;

            let simulator = Simulator::with_config(demo.build()?, config);
            let mut sim_loop = SimulationLoop::new(simulator);
            let snapshots = sim_loop.subscribe();
            sim_loop.start()?;

            for snapshot in snapshots.iter().take(ticks) {
                print_snapshot(&snapshot);
            }

            sim_loop.stop();
        }

        Command::Trace { demo } => {
            let mut simulator = Simulator::new(demo.build()?);
            let snapshot = simulator.tick();
            let node_map = simulator.node_map();
            print!(
                "{}",
                ConnectionTrace::new(simulator.graph(), &node_map).with_snapshot(&snapshot)
            );
        }
    }

    Ok(())
}

fn print_snapshot(snapshot: &Snapshot) {
    println!("tick {} ({} iteration(s))", snapshot.tick, snapshot.iterations);
    for (pin, voltage) in &snapshot.pin_voltages {
        println!("  {:<14} {voltage:>7.3} V  {:?}", pin.to_string(), PinLevel::from_voltage(*voltage));
    }
    for (id, current) in &snapshot.component_currents {
        println!("  {:<14} {:>7.2} mA", id.to_string(), current * 1000.0);
    }
    for (id, level) in &snapshot.led_brightness {
        println!("  {:<14} glow {:.0}%", id.to_string(), level * 100.0);
    }
    for fault in &snapshot.faults {
        println!("  fault: {fault}");
    }
}
