use super::*;

use std::collections::BTreeMap;

use serde::Serialize;

/// The value of every signal of a netlist at one point of a run.
///
/// Port names of composite instances (`fa1.cin`) are kept apart from the
/// signals, since they only name bits owned by the instantiating scope. They
/// answer [`Snapshot::get`] and show up as ordinary names in a
/// [`Snapshot::scoped`] view of their instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    levels_done: usize,
    values: BTreeMap<Path, Logic>,
    ports: BTreeMap<Path, Logic>,
}

impl Snapshot {
    /// Names each value in `values`, which is indexed by [`SignalId`].
    pub fn project(netlist: &Netlist, values: &[Logic], levels_done: usize) -> Snapshot {
        let named = netlist
            .signals()
            .iter()
            .zip(values)
            .map(|(signal, value)| (signal.name(), *value))
            .collect();

        let mut ports = BTreeMap::new();
        for instance in netlist.instances() {
            for (port, bits) in netlist.instance_ports(instance.clone()).unwrap_or_default() {
                for (i, &signal_id) in bits.iter().enumerate() {
                    let name = if bits.len() == 1 {
                        instance.join(port.as_str())
                    } else {
                        instance.join(format!("{port}[{i}]"))
                    };
                    ports.insert(name, values[signal_id]);
                }
            }
        }
        Snapshot {
            levels_done,
            values: named,
            ports,
        }
    }

    /// How many levels had been evaluated when this was taken.
    pub fn levels_done(&self) -> usize {
        self.levels_done
    }

    pub fn get<P: Into<Path>>(&self, name: P) -> Option<Logic> {
        let name: Path = name.into();
        self.values.get(&name).or_else(|| self.ports.get(&name)).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, Logic)> {
        self.values.iter().map(|(name, value)| (name, *value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Reads a scalar or bus as an integer, bit 0 first.
    ///
    /// Returns `None` if the name is unknown, any bit is X, or the bus is
    /// wider than 64 bits.
    pub fn word(&self, bus: &str) -> Option<u64> {
        if let Some(value) = self.get(bus) {
            return value.to_bool().map(|bit| bit as u64);
        }

        let mut word = 0u64;
        let mut width = 0;
        while let Some(value) = self.get(format!("{bus}[{width}]")) {
            if width == 64 {
                return None;
            }
            if value.to_bool()? {
                word |= 1 << width;
            }
            width += 1;
        }
        if width == 0 {
            None
        } else {
            Some(word)
        }
    }

    /// Everything named inside the instance at `path`, relative to it.
    ///
    /// The instance's own ports become plain names of the view. Ports of
    /// instances nested deeper stay ports.
    pub fn scoped<P: Into<Path>>(&self, path: P) -> Snapshot {
        let path: Path = path.into();
        let mut values: BTreeMap<Path, Logic> = self
            .values
            .iter()
            .filter_map(|(name, value)| Some((name.strip_prefix(&path)?, *value)))
            .collect();
        let mut ports = BTreeMap::new();
        for (name, value) in &self.ports {
            if let Some(name) = name.strip_prefix(&path) {
                if name.contains('.') {
                    ports.insert(name, *value);
                } else {
                    values.insert(name, *value);
                }
            }
        }
        Snapshot {
            levels_done: self.levels_done,
            values,
            ports,
        }
    }

    /// Just the primary outputs of `netlist`.
    pub fn outputs(&self, netlist: &Netlist) -> Snapshot {
        let values = netlist
            .primary_outputs()
            .into_iter()
            .filter_map(|signal_id| {
                let name = netlist.signal(signal_id).name();
                let value = self.values.get(&name).copied()?;
                Some((name, value))
            })
            .collect();
        Snapshot {
            levels_done: self.levels_done,
            values,
            ports: BTreeMap::new(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.values)
    }
}

impl std::fmt::Display for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for (name, value) in &self.values {
            writeln!(f, "{name} = {value}")?;
        }
        Ok(())
    }
}
