use super::*;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use log::*;

/// Flattens `top` and everything it instantiates into a [`Netlist`].
///
/// The ports of `top` become the primary inputs and outputs. If `top` names a
/// primitive gate kind, the netlist is that single gate with its ports exposed.
pub fn elaborate(table: &ModuleTable, top: &str) -> Result<Netlist, CircuitError> {
    let module = match table.lookup(top)? {
        Entry::Composite(module) => module.clone(),
        Entry::Primitive(kind) => Arc::new(primitive_module(top, *kind)),
    };
    info!("Elaborating {top}");

    let mut elaborator = Elaborator {
        table,
        signals: vec![],
        gates: vec![],
        gate_names: BTreeSet::new(),
        instance_ports: BTreeMap::new(),
        stack: vec![module.name.clone()],
    };

    let mut scope = Scope::new(Path::root());
    for port in &module.ports {
        scope.declare(&port.name, port.width, port.direction.into(), &mut elaborator.signals)?;
    }
    elaborator.module_body(&module, &mut scope)?;

    let Elaborator { signals, gates, instance_ports, .. } = elaborator;
    info!("Elaborated {top}: {} gates, {} signals", gates.len(), signals.len());
    Netlist::new(module.name.clone(), signals, gates, scope, instance_ports)
}

/// A module exposing every port of a single primitive gate.
fn primitive_module(name: &str, kind: GateKind) -> ModuleDef {
    let num_inputs = match kind.arity() {
        Arity::Exactly(n) => n,
        Arity::AtLeast(n) => n,
    };
    let mut module = ModuleDef::new(name);
    let mut instance = InstanceDef::new("g", name);
    for (port, direction) in kind.port_order(num_inputs) {
        module = match direction {
            Direction::Input => module.input(port, 1),
            Direction::Output => module.output(port, 1),
        };
        instance = instance.port(port, port);
    }
    module.instance(instance)
}

struct Elaborator<'a> {
    table: &'a ModuleTable,
    signals: Vec<Signal>,
    gates: Vec<Gate>,
    gate_names: BTreeSet<Path>,
    /// The caller's bits behind each port of every composite instance.
    instance_ports: BTreeMap<Path, Vec<(PortName, Vec<SignalId>)>>,
    /// Modules currently being elaborated, outermost first.
    stack: Vec<ModuleName>,
}

impl<'a> Elaborator<'a> {
    fn module_body(&mut self, module: &ModuleDef, scope: &mut Scope) -> Result<(), CircuitError> {
        for wire in &module.wires {
            scope.declare(&wire.name, wire.width, Role::Internal, &mut self.signals)?;
        }

        let mut seen = BTreeSet::new();
        for instance in &module.instances {
            if !seen.insert(instance.name.as_str()) {
                return Err(CircuitError::DuplicateInstance(scope.path().join(instance.name.as_str())));
            }
            self.instantiate(scope, instance)?;
        }
        Ok(())
    }

    fn instantiate(&mut self, scope: &Scope, instance: &InstanceDef) -> Result<(), CircuitError> {
        let path = scope.path().join(instance.name.as_str());
        let table = self.table;
        match table.lookup(&instance.kind)? {
            Entry::Primitive(kind) => self.primitive(scope, &path, *kind, instance),
            Entry::Composite(module) => self.composite(scope, &path, module, instance),
        }
    }

    fn primitive(
        &mut self,
        scope: &Scope,
        path: &Path,
        kind: GateKind,
        instance: &InstanceDef,
    ) -> Result<(), CircuitError> {
        let found = instance.num_bindings();
        let num_inputs = found.saturating_sub(kind.num_outputs());
        if found < kind.num_outputs() || !kind.accepts_inputs(num_inputs) {
            let expected = match kind.arity() {
                Arity::Exactly(n) => (n + kind.num_outputs()).to_string(),
                Arity::AtLeast(n) => format!(
                    "between {} and {}",
                    n + kind.num_outputs(),
                    kind.max_inputs() + kind.num_outputs(),
                ),
            };
            return Err(CircuitError::ArityMismatch {
                instance: path.clone(),
                kind: instance.kind.clone(),
                expected,
                found,
            });
        }

        let formals: Vec<(String, Direction)> = kind
            .port_order(num_inputs)
            .into_iter()
            .map(|(name, direction)| (name.to_string(), direction))
            .collect();
        let actuals = bind(path, &formals, instance)?;

        let mut bits = vec![];
        for actual in &actuals {
            bits.push(scope.resolve(actual)?);
        }

        let width = bits.iter().map(|bits| bits.len()).max().unwrap_or(1);
        for ((formal, _direction), actual) in formals.iter().zip(&bits) {
            if actual.len() != 1 && actual.len() != width {
                return Err(CircuitError::port_binding(
                    path,
                    format!("port {formal} is {} bits wide but the instance is {width} bits wide", actual.len()),
                ));
            }
        }

        for i in 0..width {
            let bit = |actual: &Vec<SignalId>| if actual.len() == 1 { actual[0] } else { actual[i] };
            let name: Path = if width == 1 { path.clone() } else { format!("{path}[{i}]").into() };

            let mut inputs = vec![];
            let mut outputs = vec![];
            for ((_formal, direction), actual) in formals.iter().zip(&bits) {
                match direction {
                    Direction::Input => inputs.push(bit(actual)),
                    Direction::Output => outputs.push(bit(actual)),
                }
            }

            if !self.gate_names.insert(name.clone()) {
                return Err(CircuitError::DuplicateInstance(name));
            }
            trace!("gate {name} : {kind}");
            self.gates.push(Gate { name, kind, inputs, outputs });
        }
        Ok(())
    }

    fn composite(
        &mut self,
        scope: &Scope,
        path: &Path,
        module: &Arc<ModuleDef>,
        instance: &InstanceDef,
    ) -> Result<(), CircuitError> {
        if self.stack.contains(&module.name) {
            let mut stack = self.stack.clone();
            stack.push(module.name.clone());
            return Err(CircuitError::RecursiveInstantiation(stack));
        }
        debug!("instance {path} : {}", module.name);

        let formals: Vec<(String, Direction)> = module
            .ports
            .iter()
            .map(|port| (port.name.clone(), port.direction))
            .collect();
        let actuals = bind(path, &formals, instance)?;

        let mut nested = Scope::new(path.clone());
        let mut ports = vec![];
        for (port, actual) in module.ports.iter().zip(&actuals) {
            let bits = scope.resolve(actual)?;
            if bits.len() != port.width as usize {
                return Err(CircuitError::port_binding(
                    path,
                    format!("port {} is {} bits wide but {actual} is {}", port.name, port.width, bits.len()),
                ));
            }
            nested.alias(&port.name, bits.clone())?;
            ports.push((port.name.clone(), bits));
        }
        self.instance_ports.insert(path.clone(), ports);

        self.stack.push(module.name.clone());
        self.module_body(module, &mut nested)?;
        self.stack.pop();
        Ok(())
    }
}

/// Matches the actuals of `instance` to `formals`, returned in formal order.
///
/// Named bindings go first. The positional ones then fill the unbound formals
/// in order and must cover them exactly.
fn bind(
    path: &Path,
    formals: &[(String, Direction)],
    instance: &InstanceDef,
) -> Result<Vec<SignalRef>, CircuitError> {
    let mut slots: Vec<Option<&SignalRef>> = vec![None; formals.len()];

    for (port, actual) in &instance.ports {
        let index = formals
            .iter()
            .position(|(formal, _direction)| formal == port)
            .ok_or_else(|| CircuitError::port_binding(path, format!("no port named {port}")))?;
        if slots[index].is_some() {
            return Err(CircuitError::port_binding(path, format!("port {port} is bound more than once")));
        }
        slots[index] = Some(actual);
    }

    let unbound: Vec<usize> = (0..formals.len()).filter(|&i| slots[i].is_none()).collect();
    if unbound.len() != instance.connections.len() {
        let missing: Vec<&str> = unbound.iter().map(|&i| formals[i].0.as_str()).collect();
        return Err(CircuitError::port_binding(
            path,
            format!(
                "{} positional connections for {} unbound ports ({})",
                instance.connections.len(),
                unbound.len(),
                missing.join(", "),
            ),
        ));
    }
    for (&i, actual) in unbound.iter().zip(&instance.connections) {
        slots[i] = Some(actual);
    }

    Ok(slots.into_iter().flatten().cloned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn half_adder() -> ModuleDef {
        ModuleDef::new("half_adder")
            .input("a", 1)
            .input("b", 1)
            .output("s", 1)
            .output("c", 1)
            .instance(InstanceDef::new("g0", "xor").connect(["s", "a", "b"]))
            .instance(InstanceDef::new("g1", "and").connect(["c", "a", "b"]))
    }

    #[test]
    fn flat_module() {
        let table = ModuleTable::from_modules([half_adder()]).unwrap();
        let netlist = elaborate(&table, "half_adder").unwrap();
        assert_eq!(netlist.gates().len(), 2);
        assert_eq!(netlist.primary_inputs().len(), 2);
        assert_eq!(netlist.primary_outputs().len(), 2);

        let g1 = netlist.gate(netlist.gate_id("g1").unwrap());
        assert_eq!(g1.kind, GateKind::And);
        assert_eq!(g1.outputs, vec![netlist.signal_id("c").unwrap()]);
        assert_eq!(g1.inputs, vec![netlist.signal_id("a").unwrap(), netlist.signal_id("b").unwrap()]);
    }

    #[test]
    fn nested_names_and_aliases() {
        let top = ModuleDef::new("top")
            .input("x", 1)
            .input("y", 1)
            .output("sum", 1)
            .output("carry", 1)
            .wire("t", 1)
            .instance(InstanceDef::new("ha0", "half_adder").port("c", "carry").connect(["x", "y", "t"]))
            .instance(InstanceDef::new("b0", "buf").connect(["sum", "t"]));
        let table = ModuleTable::from_modules([half_adder(), top]).unwrap();
        let netlist = elaborate(&table, "top").unwrap();

        let names: Vec<&str> = netlist.gates().iter().map(|gate| gate.name.as_str()).collect();
        assert_eq!(names, vec!["ha0.g0", "ha0.g1", "b0"]);

        // ports of ha0 are the caller's signals, not copies
        assert_eq!(netlist.signals().len(), 5);
        let g1 = netlist.gate(netlist.gate_id("ha0.g1").unwrap());
        assert_eq!(g1.outputs, vec![netlist.signal_id("carry").unwrap()]);

        let id = |name: &str| netlist.signal_id(name).unwrap();
        assert_eq!(netlist.instances().collect::<Vec<_>>(), vec![&Path::from("ha0")]);
        let ports = netlist.instance_ports("ha0").unwrap();
        let expected = vec![
            ("a".to_string(), vec![id("x")]),
            ("b".to_string(), vec![id("y")]),
            ("s".to_string(), vec![id("t")]),
            ("c".to_string(), vec![id("carry")]),
        ];
        assert_eq!(ports, expected.as_slice());
        assert!(netlist.instance_ports("b0").is_none());
    }

    #[test]
    fn nested_wires_are_prefixed() {
        let inner = ModuleDef::new("inner")
            .input("a", 1)
            .output("y", 1)
            .wire("w", 1)
            .instance(InstanceDef::new("n0", "not").connect(["w", "a"]))
            .instance(InstanceDef::new("n1", "not").connect(["y", "w"]));
        let outer = ModuleDef::new("outer")
            .input("a", 1)
            .output("y", 1)
            .instance(InstanceDef::new("u0", "inner").connect(["a", "y"]));
        let table = ModuleTable::from_modules([inner, outer]).unwrap();
        let netlist = elaborate(&table, "outer").unwrap();
        assert!(netlist.signal_id("u0.w").is_some());
        assert_eq!(netlist.signal(netlist.signal_id("u0.w").unwrap()).role(), Role::Internal);
    }

    #[test]
    fn binding_errors() {
        let bad = |instance: InstanceDef| {
            let top = ModuleDef::new("top")
                .input("a", 1)
                .input("b", 1)
                .output("s", 1)
                .output("c", 1)
                .instance(instance);
            let table = ModuleTable::from_modules([half_adder(), top]).unwrap();
            elaborate(&table, "top").unwrap_err()
        };

        let err = bad(InstanceDef::new("u", "half_adder").connect(["a", "b", "s"]));
        assert!(matches!(err, CircuitError::PortBindingError { .. }));

        let err = bad(InstanceDef::new("u", "half_adder").port("q", "a").connect(["a", "b", "s", "c"]));
        assert!(matches!(err, CircuitError::PortBindingError { .. }));

        let err = bad(InstanceDef::new("u", "half_adder").port("a", "a").port("a", "b").connect(["s", "c"]));
        assert!(matches!(err, CircuitError::PortBindingError { .. }));

        let err = bad(InstanceDef::new("u", "half_adder").connect(["a", "b", "s", "nope"]));
        assert_eq!(err, CircuitError::UnknownSignal("nope".to_string()));

        let err = bad(InstanceDef::new("u", "xor").connect(["s", "a"]));
        assert!(matches!(err, CircuitError::ArityMismatch { found: 2, .. }));

        let err = bad(InstanceDef::new("u", "fa").connect(["a", "b", "s", "c"]));
        assert!(matches!(err, CircuitError::ArityMismatch { found: 4, .. }));

        let err = bad(InstanceDef::new("u", "nand_of_three").connect(["s", "a", "b"]));
        assert_eq!(err, CircuitError::UnknownModule("nand_of_three".to_string()));
    }

    #[test]
    fn named_primitive_ports() {
        let top = ModuleDef::new("top")
            .input("p", 1)
            .input("q", 1)
            .input("r", 1)
            .output("out", 1)
            .instance(InstanceDef::new("g", "or").port("c", "r").port("y", "out").connect(["p", "q"]));
        let table = ModuleTable::from_modules([top]).unwrap();
        let netlist = elaborate(&table, "top").unwrap();
        let gate = &netlist.gates()[0];
        let ids: Vec<SignalId> = ["p", "q", "r"].iter().map(|name| netlist.signal_id(*name).unwrap()).collect();
        assert_eq!(gate.inputs, ids);
    }

    #[test]
    fn vectorized_primitives() {
        let top = ModuleDef::new("top")
            .input("a", 4)
            .input("en", 1)
            .output("y", 4)
            .instance(InstanceDef::new("g", "and").connect(["y", "a", "en"]));
        let table = ModuleTable::from_modules([top]).unwrap();
        let netlist = elaborate(&table, "top").unwrap();
        let names: Vec<&str> = netlist.gates().iter().map(|gate| gate.name.as_str()).collect();
        assert_eq!(names, vec!["g[0]", "g[1]", "g[2]", "g[3]"]);

        let en = netlist.signal_id("en").unwrap();
        let g2 = &netlist.gates()[2];
        assert_eq!(g2.inputs, vec![netlist.signal_id("a[2]").unwrap(), en]);
        assert_eq!(g2.outputs, vec![netlist.signal_id("y[2]").unwrap()]);

        let mixed = ModuleDef::new("mixed")
            .input("a", 4)
            .input("b", 2)
            .output("y", 4)
            .instance(InstanceDef::new("g", "and").connect(["y", "a", "b"]));
        let table = ModuleTable::from_modules([mixed]).unwrap();
        assert!(matches!(elaborate(&table, "mixed"), Err(CircuitError::PortBindingError { .. })));
    }

    #[test]
    fn composite_width_mismatch() {
        let top = ModuleDef::new("top")
            .input("a", 2)
            .input("b", 1)
            .output("s", 1)
            .output("c", 1)
            .instance(InstanceDef::new("u", "half_adder").connect(["a", "b", "s", "c"]));
        let table = ModuleTable::from_modules([half_adder(), top]).unwrap();
        assert!(matches!(elaborate(&table, "top"), Err(CircuitError::PortBindingError { .. })));
    }

    #[test]
    fn recursion_is_detected() {
        let a = ModuleDef::new("ping")
            .input("x", 1)
            .output("y", 1)
            .instance(InstanceDef::new("u", "pong").connect(["x", "y"]));
        let b = ModuleDef::new("pong")
            .input("x", 1)
            .output("y", 1)
            .instance(InstanceDef::new("u", "ping").connect(["x", "y"]));
        let table = ModuleTable::from_modules([a, b]).unwrap();
        assert_eq!(
            elaborate(&table, "ping").unwrap_err(),
            CircuitError::RecursiveInstantiation(vec!["ping".to_string(), "pong".to_string(), "ping".to_string()]),
        );
    }

    #[test]
    fn duplicate_names() {
        let top = ModuleDef::new("top")
            .input("a", 1)
            .output("y", 1)
            .wire("a", 1);
        let table = ModuleTable::from_modules([top]).unwrap();
        assert_eq!(elaborate(&table, "top").unwrap_err(), CircuitError::DuplicateSignal("a".into()));

        let top = ModuleDef::new("top")
            .input("a", 1)
            .output("y", 1)
            .output("z", 1)
            .instance(InstanceDef::new("g", "not").connect(["y", "a"]))
            .instance(InstanceDef::new("g", "buf").connect(["z", "a"]));
        let table = ModuleTable::from_modules([top]).unwrap();
        assert_eq!(elaborate(&table, "top").unwrap_err(), CircuitError::DuplicateInstance("g".into()));
    }

    #[test]
    fn gate_names_stay_unique() {
        let top = ModuleDef::new("top")
            .input("a", 2)
            .output("y", 2)
            .output("z", 1)
            .instance(InstanceDef::new("g", "not").connect(["y", "a"]))
            .instance(InstanceDef::new("g[0]", "buf").connect(["z", "a[0]"]));
        let table = ModuleTable::from_modules([top]).unwrap();
        assert_eq!(elaborate(&table, "top").unwrap_err(), CircuitError::DuplicateInstance("g[0]".into()));
    }

    #[test]
    fn multiple_drivers() {
        let top = ModuleDef::new("top")
            .input("a", 1)
            .output("y", 1)
            .instance(InstanceDef::new("g0", "not").connect(["y", "a"]))
            .instance(InstanceDef::new("g1", "buf").connect(["y", "a"]));
        let table = ModuleTable::from_modules([top]).unwrap();
        assert_eq!(elaborate(&table, "top").unwrap_err(), CircuitError::MultipleDrivers("y".into()));

        let top = ModuleDef::new("top")
            .input("a", 1)
            .input("b", 1)
            .instance(InstanceDef::new("g0", "not").connect(["b", "a"]));
        let table = ModuleTable::from_modules([top]).unwrap();
        assert_eq!(elaborate(&table, "top").unwrap_err(), CircuitError::MultipleDrivers("b".into()));
    }

    #[test]
    fn primitive_as_top() {
        let table = ModuleTable::new();
        let netlist = elaborate(&table, "fa").unwrap();
        assert_eq!(netlist.gates().len(), 1);
        let names: Vec<String> = netlist.primary_inputs().iter().map(|&id| netlist.signal(id).name().to_string()).collect();
        assert_eq!(names, vec!["a", "b", "cin"]);
    }
}
