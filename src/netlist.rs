use super::*;

use std::collections::BTreeMap;

use log::*;
use petgraph::graph::{DiGraph, NodeIndex};

/// A primitive gate in the flattened design.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gate {
    pub name: Path,
    pub kind: GateKind,
    pub inputs: Vec<SignalId>,
    pub outputs: Vec<SignalId>,
}

/// The flattened instance graph of a top module.
///
/// Nodes of [`Netlist::graph`] are gates (the node index equals the [`GateId`])
/// and each edge goes from the gate driving a signal to a gate reading it,
/// labelled with that signal. Nothing here changes after elaboration.
#[derive(Debug, Clone)]
pub struct Netlist {
    top: ModuleName,
    signals: Vec<Signal>,
    gates: Vec<Gate>,
    drivers: Vec<Option<GateId>>,
    loads: Vec<Vec<GateId>>,
    graph: DiGraph<GateId, SignalId>,
    signal_id_by_name: BTreeMap<Path, SignalId>,
    top_scope: Scope,
    instance_ports: BTreeMap<Path, Vec<(PortName, Vec<SignalId>)>>,
}

impl Netlist {
    pub(crate) fn new(
        top: ModuleName,
        signals: Vec<Signal>,
        gates: Vec<Gate>,
        top_scope: Scope,
        instance_ports: BTreeMap<Path, Vec<(PortName, Vec<SignalId>)>>,
    ) -> Result<Netlist, CircuitError> {
        let mut drivers: Vec<Option<GateId>> = vec![None; signals.len()];
        let mut loads: Vec<Vec<GateId>> = vec![vec![]; signals.len()];

        for (gate_id, gate) in gates.iter().enumerate() {
            for &output in &gate.outputs {
                if signals[output].role() == Role::PrimaryInput || drivers[output].is_some() {
                    return Err(CircuitError::MultipleDrivers(signals[output].name()));
                }
                drivers[output] = Some(gate_id);
            }
            for &input in &gate.inputs {
                if !loads[input].contains(&gate_id) {
                    loads[input].push(gate_id);
                }
            }
        }

        let mut graph: DiGraph<GateId, SignalId> = DiGraph::with_capacity(gates.len(), gates.len());
        for gate_id in 0..gates.len() {
            graph.add_node(gate_id);
        }
        for (consumer, gate) in gates.iter().enumerate() {
            for &input in &gate.inputs {
                if let Some(producer) = drivers[input] {
                    let (producer, consumer) = (NodeIndex::new(producer), NodeIndex::new(consumer));
                    if !graph.edges_connecting(producer, consumer).any(|edge| *edge.weight() == input) {
                        graph.add_edge(producer, consumer, input);
                    }
                }
            }
        }

        let signal_id_by_name = signals
            .iter()
            .enumerate()
            .map(|(signal_id, signal)| (signal.name(), signal_id))
            .collect();

        let netlist = Netlist {
            top,
            signals,
            gates,
            drivers,
            loads,
            graph,
            signal_id_by_name,
            top_scope,
            instance_ports,
        };

        for signal_id in netlist.undriven() {
            let signal = netlist.signal(signal_id);
            if !netlist.loads(signal_id).is_empty() || signal.role() == Role::PrimaryOutput {
                warn!("{} is never driven and will stay X", signal.name());
            }
        }
        Ok(netlist)
    }

    /// Name of the module this netlist was elaborated from.
    pub fn top(&self) -> &str {
        &self.top
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn signal(&self, signal_id: SignalId) -> &Signal {
        &self.signals[signal_id]
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub fn gate(&self, gate_id: GateId) -> &Gate {
        &self.gates[gate_id]
    }

    pub fn driver(&self, signal_id: SignalId) -> Option<GateId> {
        self.drivers[signal_id]
    }

    /// Gates that read the signal, in creation order.
    pub fn loads(&self, signal_id: SignalId) -> &[GateId] {
        &self.loads[signal_id]
    }

    pub fn graph(&self) -> &DiGraph<GateId, SignalId> {
        &self.graph
    }

    pub fn signal_id<P: Into<Path>>(&self, name: P) -> Option<SignalId> {
        self.signal_id_by_name.get(&name.into()).copied()
    }

    pub fn gate_id<P: Into<Path>>(&self, name: P) -> Option<GateId> {
        let name: Path = name.into();
        self.gates.iter().position(|gate| gate.name == name)
    }

    /// Resolves a reference against the top module's ports and wires.
    pub fn resolve(&self, reference: &SignalRef) -> Result<Vec<SignalId>, CircuitError> {
        self.top_scope.resolve(reference)
    }

    /// Paths of the composite module instances, in name order.
    pub fn instances(&self) -> impl Iterator<Item = &Path> {
        self.instance_ports.keys()
    }

    /// The ports of a composite instance and the signals behind them.
    ///
    /// Ports are not signals of their own: each one names bits owned by the
    /// instantiating scope.
    pub fn instance_ports<P: Into<Path>>(&self, instance: P) -> Option<&[(PortName, Vec<SignalId>)]> {
        self.instance_ports.get(&instance.into()).map(|ports| ports.as_slice())
    }

    pub fn primary_inputs(&self) -> Vec<SignalId> {
        self.signals_with_role(Role::PrimaryInput)
    }

    pub fn primary_outputs(&self) -> Vec<SignalId> {
        self.signals_with_role(Role::PrimaryOutput)
    }

    fn signals_with_role(&self, role: Role) -> Vec<SignalId> {
        self.signals
            .iter()
            .enumerate()
            .filter(|(_signal_id, signal)| signal.role() == role)
            .map(|(signal_id, _signal)| signal_id)
            .collect()
    }

    /// Non-input signals that no gate drives.
    pub fn undriven(&self) -> Vec<SignalId> {
        (0..self.signals.len())
            .filter(|&signal_id| self.drivers[signal_id].is_none())
            .filter(|&signal_id| self.signals[signal_id].role() != Role::PrimaryInput)
            .collect()
    }

    /// The gates driving the inputs of `gate_id`, deduplicated, in creation order.
    pub fn fanin(&self, gate_id: GateId) -> Vec<GateId> {
        let mut producers: Vec<GateId> = self.gates[gate_id]
            .inputs
            .iter()
            .filter_map(|&input| self.drivers[input])
            .collect();
        producers.sort();
        producers.dedup();
        producers
    }

    pub fn gate_counts(&self) -> BTreeMap<GateKind, usize> {
        let mut counts = BTreeMap::new();
        for gate in &self.gates {
            *counts.entry(gate.kind).or_insert(0) += 1;
        }
        counts
    }
}

impl std::fmt::Display for Netlist {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let names = |signal_ids: &[SignalId]| -> String {
            signal_ids
                .iter()
                .map(|&signal_id| self.signals[signal_id].name().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };

        writeln!(f, "netlist {} {{", self.top)?;
        for (signal_id, signal) in self.signals.iter().enumerate() {
            if signal.role() != Role::Internal {
                writeln!(f, "    {}{}", signal.role(), names(&[signal_id]))?;
            }
        }
        for gate in &self.gates {
            writeln!(f, "    {} : {} ({}) -> ({})", gate.name, gate.kind, names(&gate.inputs), names(&gate.outputs))?;
        }
        write!(f, "}}")
    }
}
