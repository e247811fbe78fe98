use proptest::prelude::*;

use breadboard_core::{CircuitGraph, ComponentKind, PinRef};

/// A component to place: kind plus its main parameter.
#[derive(Debug, Clone, Copy)]
pub struct Part {
    pub kind: ComponentKind,
    pub value: f64,
}

/// A wire between `(part index, pin index)` pairs on distinct parts.
pub type Wire = ((usize, usize), (usize, usize));

pub fn arbitrary_part() -> impl Strategy<Value = Part> {
    prop_oneof![
        (1.0_f64..9.0).prop_map(|v| Part { kind: ComponentKind::Battery, value: v }),
        resistor(),
        (1.5_f64..3.5).prop_map(|vf| Part { kind: ComponentKind::Led, value: vf }),
    ]
}

fn resistor() -> impl Strategy<Value = Part> {
    (1.0_f64..10_000.0).prop_map(|r| Part { kind: ComponentKind::Resistor, value: r })
}

fn wires(parts: usize) -> impl Strategy<Value = Vec<Wire>> {
    prop::collection::vec(
        ((0..parts, 0..2usize), (0..parts, 0..2usize)).prop_filter("distinct parts", |((a, _), (b, _))| a != b),
        0..=(parts * 2),
    )
}

/// Generate a layout: placed parts plus wires between their pins.
pub fn arbitrary_layout(part: impl Strategy<Value = Part>) -> impl Strategy<Value = (Vec<Part>, Vec<Wire>)> {
    prop::collection::vec(part, 2..=8).prop_flat_map(|parts| {
        let n = parts.len();
        (Just(parts), wires(n))
    })
}

/// Generate a layout with one battery (placed first) and resistors.
pub fn single_source_layout() -> impl Strategy<Value = (Vec<Part>, Vec<Wire>)> {
    (1.0_f64..9.0, prop::collection::vec(resistor(), 1..=7))
        .prop_map(|(v, mut parts)| {
            parts.insert(0, Part { kind: ComponentKind::Battery, value: v });
            parts
        })
        .prop_flat_map(|parts| {
            let n = parts.len();
            (Just(parts), wires(n))
        })
}

/// Place the parts and wires of a layout into a fresh graph.
pub fn build_graph(parts: &[Part], wires: &[Wire]) -> CircuitGraph {
    let mut graph = CircuitGraph::new();
    let ids: Vec<_> = parts
        .iter()
        .map(|p| match p.kind {
            ComponentKind::Battery => graph.add_battery(p.value),
            ComponentKind::Resistor => graph.add_resistor(p.value),
            ComponentKind::Led => graph.add_led(p.value),
        })
        .collect::<Result<_, _>>()
        .unwrap();

    for &((a, pa), (b, pb)) in wires {
        let pin_a = parts[a].kind.pin_names()[pa];
        let pin_b = parts[b].kind.pin_names()[pb];
        graph.add_connection((ids[a], pin_a), (ids[b], pin_b)).unwrap();
    }
    graph
}

/// Reference connectivity: pins reachable from `start` by following wires.
pub fn reachable(graph: &CircuitGraph, start: PinRef) -> Vec<PinRef> {
    let mut seen = vec![start];
    let mut frontier = vec![start];
    while let Some(pin) = frontier.pop() {
        for conn in graph.connections() {
            let next = if conn.from == pin {
                conn.to
            } else if conn.to == pin {
                conn.from
            } else {
                continue;
            };
            if !seen.contains(&next) {
                seen.push(next);
                frontier.push(next);
            }
        }
    }
    seen.sort();
    seen
}
