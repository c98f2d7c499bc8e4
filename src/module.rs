use super::*;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use log::*;

use serde::{Deserialize, Serialize};

fn default_width() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDef {
    pub name: PortName,
    pub direction: Direction,
    #[serde(default = "default_width")]
    pub width: u32,
}

/// An internal net of a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireDecl {
    pub name: String,
    #[serde(default = "default_width")]
    pub width: u32,
}

/// One instantiation of a primitive gate or another module.
///
/// `connections` are positional and `ports` are named. Named bindings are
/// matched first and the positional ones fill the ports left over, in the
/// callee's declared order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceDef {
    pub name: InstanceName,
    pub kind: ModuleName,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<SignalRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<(PortName, SignalRef)>,
}

impl InstanceDef {
    pub fn new<S: Into<String>, K: Into<String>>(name: S, kind: K) -> InstanceDef {
        InstanceDef {
            name: name.into(),
            kind: kind.into(),
            connections: vec![],
            ports: vec![],
        }
    }

    pub fn connect<I, R>(mut self, actuals: I) -> InstanceDef
    where
        I: IntoIterator<Item = R>,
        R: Into<SignalRef>,
    {
        self.connections.extend(actuals.into_iter().map(|actual| actual.into()));
        self
    }

    pub fn port<P: Into<String>, R: Into<SignalRef>>(mut self, port: P, actual: R) -> InstanceDef {
        self.ports.push((port.into(), actual.into()));
        self
    }

    pub fn num_bindings(&self) -> usize {
        self.connections.len() + self.ports.len()
    }
}

/// A user-defined module: ports, internal wires and the instances wiring them up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDef {
    pub name: ModuleName,
    #[serde(default)]
    pub ports: Vec<PortDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub wires: Vec<WireDecl>,
    #[serde(default)]
    pub instances: Vec<InstanceDef>,
}

impl ModuleDef {
    pub fn new<S: Into<String>>(name: S) -> ModuleDef {
        ModuleDef {
            name: name.into(),
            ports: vec![],
            wires: vec![],
            instances: vec![],
        }
    }

    pub fn input<S: Into<String>>(mut self, name: S, width: u32) -> ModuleDef {
        self.ports.push(PortDef { name: name.into(), direction: Direction::Input, width });
        self
    }

    pub fn output<S: Into<String>>(mut self, name: S, width: u32) -> ModuleDef {
        self.ports.push(PortDef { name: name.into(), direction: Direction::Output, width });
        self
    }

    pub fn wire<S: Into<String>>(mut self, name: S, width: u32) -> ModuleDef {
        self.wires.push(WireDecl { name: name.into(), width });
        self
    }

    pub fn instance(mut self, instance: InstanceDef) -> ModuleDef {
        self.instances.push(instance);
        self
    }

    pub fn port(&self, name: &str) -> Option<&PortDef> {
        self.ports.iter().find(|port| port.name == name)
    }

    pub fn inputs(&self) -> impl Iterator<Item = &PortDef> {
        self.ports.iter().filter(|port| port.direction == Direction::Input)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &PortDef> {
        self.ports.iter().filter(|port| port.direction == Direction::Output)
    }

    /// Names of the modules and gate kinds this module instantiates, deduplicated.
    pub fn depends_on(&self) -> BTreeSet<&str> {
        self.instances.iter().map(|instance| instance.kind.as_str()).collect()
    }
}

/// What a name in the [`ModuleTable`] refers to.
#[derive(Debug, Clone)]
pub enum Entry {
    Primitive(GateKind),
    Composite(Arc<ModuleDef>),
}

impl Entry {
    pub fn is_primitive(&self) -> bool {
        matches!(self, Entry::Primitive(_))
    }
}

/// Every module definition available for elaboration, by name.
///
/// The primitive gate kinds are registered up front under their canonical
/// names and mapped-cell aliases. Only their shape is recorded here.
#[derive(Debug, Clone)]
pub struct ModuleTable {
    entries: BTreeMap<ModuleName, Entry>,
    order: Vec<ModuleName>,
}

impl Default for ModuleTable {
    fn default() -> Self {
        ModuleTable::new()
    }
}

impl ModuleTable {
    pub fn new() -> ModuleTable {
        let mut entries = BTreeMap::new();
        for kind in GateKind::ALL {
            entries.insert(kind.name().to_string(), Entry::Primitive(kind));
            for alias in kind.aliases() {
                entries.insert(alias.to_string(), Entry::Primitive(kind));
            }
        }
        ModuleTable {
            entries,
            order: vec![],
        }
    }

    pub fn from_modules<I: IntoIterator<Item = ModuleDef>>(modules: I) -> Result<ModuleTable, CircuitError> {
        let mut table = ModuleTable::new();
        for module in modules {
            table.define(module)?;
        }
        Ok(table)
    }

    pub fn define(&mut self, module: ModuleDef) -> Result<(), CircuitError> {
        if self.entries.contains_key(&module.name) {
            return Err(CircuitError::DuplicateModule(module.name));
        }
        debug!("define module {} ({} ports, {} instances)", module.name, module.ports.len(), module.instances.len());
        self.order.push(module.name.clone());
        self.entries.insert(module.name.clone(), Entry::Composite(Arc::new(module)));
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&Entry, CircuitError> {
        self.entries.get(name).ok_or_else(|| CircuitError::UnknownModule(name.to_string()))
    }

    pub fn module(&self, name: &str) -> Option<Arc<ModuleDef>> {
        match self.entries.get(name) {
            Some(Entry::Composite(module)) => Some(module.clone()),
            _ => None,
        }
    }

    /// User-defined modules in definition order.
    pub fn modules(&self) -> Vec<Arc<ModuleDef>> {
        self.order.iter().filter_map(|name| self.module(name)).collect()
    }

    /// User-defined modules that no other user-defined module instantiates.
    pub fn top_candidates(&self) -> Vec<Arc<ModuleDef>> {
        let modules = self.modules();
        let instantiated: BTreeSet<&str> = modules
            .iter()
            .flat_map(|module| module.depends_on())
            .collect();
        modules
            .iter()
            .filter(|module| !instantiated.contains(module.name.as_str()))
            .cloned()
            .collect()
    }
}
