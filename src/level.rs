use super::*;

use log::*;
use petgraph::algo::tarjan_scc;
use petgraph::graph::NodeIndex;
use petgraph::Direction::{Incoming, Outgoing};

/// The evaluation order of a netlist.
///
/// Every gate sits strictly after the gates driving its inputs. Gates fed only
/// by primary inputs or undriven signals are on level 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Levels {
    level_of: Vec<usize>,
    levels: Vec<Vec<GateId>>,
}

impl Levels {
    pub fn level(&self, gate_id: GateId) -> usize {
        self.level_of[gate_id]
    }

    /// The gates of each level in creation order.
    pub fn levels(&self) -> &[Vec<GateId>] {
        &self.levels
    }

    pub fn get(&self, level: usize) -> Option<&[GateId]> {
        self.levels.get(level).map(|gates| gates.as_slice())
    }

    /// Number of levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Every gate, level by level.
    pub fn gates(&self) -> impl Iterator<Item = GateId> + '_ {
        self.levels.iter().flatten().copied()
    }
}

pub fn compute_levels(netlist: &Netlist) -> Result<Levels, CircuitError> {
    let graph = netlist.graph();
    let num_gates = netlist.gates().len();

    let mut pending: Vec<usize> = (0..num_gates)
        .map(|gate_id| graph.edges_directed(NodeIndex::new(gate_id), Incoming).count())
        .collect();
    let mut level_of: Vec<Option<usize>> = vec![None; num_gates];
    let mut levels: Vec<Vec<GateId>> = vec![];

    let mut frontier: Vec<GateId> = (0..num_gates).filter(|&gate_id| pending[gate_id] == 0).collect();
    while !frontier.is_empty() {
        let level = levels.len();
        let mut next = vec![];
        for &gate_id in &frontier {
            level_of[gate_id] = Some(level);
            for consumer in graph.neighbors_directed(NodeIndex::new(gate_id), Outgoing) {
                let consumer = consumer.index();
                pending[consumer] -= 1;
                if pending[consumer] == 0 {
                    next.push(consumer);
                }
            }
        }
        trace!("level {level}: {} gates", frontier.len());
        levels.push(frontier);
        next.sort();
        frontier = next;
    }

    if level_of.iter().any(|level| level.is_none()) {
        let mut cyclic: Vec<GateId> = tarjan_scc(graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .flatten()
            .map(|node| node.index())
            .collect();
        cyclic.sort();
        let names: Vec<Path> = cyclic.iter().map(|&gate_id| netlist.gate(gate_id).name.clone()).collect();
        warn!("{} gates lie on combinational cycles", names.len());
        return Err(CircuitError::CombinationalCycle(names));
    }

    debug!("Leveled {num_gates} gates into {} levels", levels.len());
    Ok(Levels {
        level_of: level_of.into_iter().flatten().collect(),
        levels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels_of(top: ModuleDef) -> Result<(Netlist, Levels), CircuitError> {
        let table = ModuleTable::from_modules([top])?;
        let netlist = elaborate(&table, "top")?;
        let levels = compute_levels(&netlist)?;
        Ok((netlist, levels))
    }

    #[test]
    fn chain_levels() {
        let top = ModuleDef::new("top")
            .input("a", 1)
            .input("b", 1)
            .output("y", 1)
            .wire("w0", 1)
            .wire("w1", 1)
            .instance(InstanceDef::new("g2", "and").connect(["y", "w1", "w0"]))
            .instance(InstanceDef::new("g1", "not").connect(["w1", "w0"]))
            .instance(InstanceDef::new("g0", "or").connect(["w0", "a", "b"]));
        let (netlist, levels) = levels_of(top).unwrap();
        let g = |name: &str| netlist.gate_id(name).unwrap();

        assert_eq!(levels.len(), 3);
        assert_eq!(levels.level(g("g0")), 0);
        assert_eq!(levels.level(g("g1")), 1);
        assert_eq!(levels.level(g("g2")), 2);
    }

    #[test]
    fn producers_come_first() {
        let top = ModuleDef::new("top")
            .input("a", 4)
            .input("b", 4)
            .output("y", 4)
            .wire("t", 4)
            .wire("u", 4)
            .instance(InstanceDef::new("x0", "xor").connect(["t", "a", "b"]))
            .instance(InstanceDef::new("n0", "nand").connect(["u", "t", "a"]))
            .instance(InstanceDef::new("o0", "or").connect(["y", "u", "t"]));
        let (netlist, levels) = levels_of(top).unwrap();
        for edge in netlist.graph().edge_indices() {
            let (producer, consumer) = netlist.graph().edge_endpoints(edge).unwrap();
            assert!(levels.level(producer.index()) < levels.level(consumer.index()));
        }
        assert_eq!(levels.gates().count(), netlist.gates().len());
        assert_eq!(levels.get(0).unwrap(), &[0, 1, 2, 3]);
    }

    #[test]
    fn undriven_inputs_are_level_zero() {
        let top = ModuleDef::new("top")
            .input("a", 1)
            .output("y", 1)
            .wire("floating", 1)
            .instance(InstanceDef::new("g", "and").connect(["y", "a", "floating"]));
        let (_netlist, levels) = levels_of(top).unwrap();
        assert_eq!(levels.levels(), &[vec![0]]);
    }

    #[test]
    fn cycle_reports_only_cyclic_gates() {
        let top = ModuleDef::new("top")
            .input("a", 1)
            .output("y", 1)
            .wire("p", 1)
            .wire("q", 1)
            .instance(InstanceDef::new("before", "buf").connect(["y", "q"]))
            .instance(InstanceDef::new("g0", "and").connect(["p", "a", "q"]))
            .instance(InstanceDef::new("g1", "not").connect(["q", "p"]));
        assert_eq!(
            levels_of(top).unwrap_err(),
            CircuitError::CombinationalCycle(vec!["g0".into(), "g1".into()]),
        );
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let top = ModuleDef::new("top")
            .input("a", 1)
            .output("y", 1)
            .instance(InstanceDef::new("latch", "or").connect(["y", "a", "y"]));
        assert_eq!(levels_of(top).unwrap_err(), CircuitError::CombinationalCycle(vec!["latch".into()]));
    }
}
