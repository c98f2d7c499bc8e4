use super::*;

use std::collections::BTreeMap;
use std::sync::Arc;

use log::*;
use serde::{Deserialize, Serialize};

/// How [`run`] drives the evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Evaluate every level and return the final values.
    Full,
    /// Hand back a [`Sim`] positioned before level 0.
    Stepwise,
}

/// Values assigned to primary inputs, keyed by signal reference.
///
/// A key may name a scalar, a single bit (`a[2]`), a range or a whole bus. A
/// value given for several bits is applied to each of them. Inputs not
/// mentioned are X.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stimulus {
    values: BTreeMap<String, Logic>,
}

impl Stimulus {
    pub fn new() -> Stimulus {
        Stimulus::default()
    }

    pub fn set<S: Into<String>, V: Into<Logic>>(mut self, name: S, value: V) -> Stimulus {
        self.insert(name, value);
        self
    }

    pub fn insert<S: Into<String>, V: Into<Logic>>(&mut self, name: S, value: V) {
        self.values.insert(name.into(), value.into());
    }

    /// Assigns the low `width` bits of `value` to `name[0]` .. `name[width-1]`.
    pub fn word(mut self, name: &str, width: u32, value: u64) -> Stimulus {
        for i in 0..width {
            let bit = i < 64 && (value >> i) & 1 == 1;
            self.insert(format!("{name}[{i}]"), bit);
        }
        self
    }

    pub fn from_json_str(json: &str) -> anyhow::Result<Stimulus> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Logic)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The value of every signal of `netlist` before any gate is evaluated.
    fn apply(&self, netlist: &Netlist) -> Result<Vec<Logic>, CircuitError> {
        let mut values = vec![Logic::X; netlist.signals().len()];
        for (name, value) in self.iter() {
            let bits = match netlist.signal_id(name) {
                Some(signal_id) => vec![signal_id],
                None => netlist.resolve(&name.parse::<SignalRef>()?)?,
            };
            for signal_id in bits {
                if netlist.signal(signal_id).role() != Role::PrimaryInput {
                    return Err(CircuitError::NotAnInput(name.to_string()));
                }
                values[signal_id] = value;
            }
        }
        Ok(values)
    }
}

impl<S: Into<String>, V: Into<Logic>> FromIterator<(S, V)> for Stimulus {
    fn from_iter<I: IntoIterator<Item = (S, V)>>(pairs: I) -> Stimulus {
        let mut stimulus = Stimulus::new();
        for (name, value) in pairs {
            stimulus.insert(name, value);
        }
        stimulus
    }
}

impl From<BTreeMap<String, Logic>> for Stimulus {
    fn from(values: BTreeMap<String, Logic>) -> Stimulus {
        Stimulus { values }
    }
}

/// A simulation in progress.
///
/// The state is the next level to evaluate plus the value of every signal.
/// Levels are evaluated in order and each gate exactly once, so the values
/// after the last level do not depend on how the run was split into steps.
#[derive(Debug, Clone)]
pub struct Sim {
    netlist: Arc<Netlist>,
    levels: Arc<Levels>,
    initial: Vec<Logic>,
    values: Vec<Logic>,
    next_level: usize,
}

impl Sim {
    /// Fails with [`CircuitError::LevelsMismatch`] unless `levels` covers
    /// exactly the gates of `netlist`.
    pub fn new(netlist: Arc<Netlist>, levels: Arc<Levels>, stimulus: &Stimulus) -> Result<Sim, CircuitError> {
        let leveled = levels.gates().count();
        if leveled != netlist.gates().len() {
            return Err(CircuitError::LevelsMismatch {
                gates: netlist.gates().len(),
                leveled,
            });
        }
        let initial = stimulus.apply(&netlist)?;
        debug!("Simulating {} over {} levels", netlist.top(), levels.len());
        Ok(Sim {
            netlist,
            levels,
            values: initial.clone(),
            initial,
            next_level: 0,
        })
    }

    pub fn netlist(&self) -> &Netlist {
        &self.netlist
    }

    pub fn levels(&self) -> &Levels {
        &self.levels
    }

    /// Index of the level the next [`Sim::step`] evaluates.
    pub fn next_level(&self) -> usize {
        self.next_level
    }

    pub fn is_finished(&self) -> bool {
        self.next_level >= self.levels.len()
    }

    pub fn peek<P: Into<Path>>(&self, name: P) -> Option<Logic> {
        let signal_id = self.netlist.signal_id(name)?;
        Some(self.values[signal_id])
    }

    /// Evaluates one level and returns the values after it.
    ///
    /// Returns `None` once every level has been evaluated.
    pub fn step(&mut self) -> Option<Snapshot> {
        if self.is_finished() {
            return None;
        }
        self.eval_level();
        Some(self.snapshot())
    }

    /// Evaluates the remaining levels.
    pub fn run_to_end(&mut self) -> Snapshot {
        while !self.is_finished() {
            self.eval_level();
        }
        self.snapshot()
    }

    /// Goes back to the stimulus values with no level evaluated.
    pub fn restart(&mut self) {
        self.values.clone_from(&self.initial);
        self.next_level = 0;
    }

    /// The snapshots after each remaining level, in order.
    pub fn steps(&mut self) -> Steps<'_> {
        Steps { sim: self }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::project(&self.netlist, &self.values, self.next_level)
    }

    fn eval_level(&mut self) {
        let levels = self.levels.clone();
        let level = self.next_level;
        for &gate_id in &levels.levels()[level] {
            self.eval_gate(gate_id);
        }
        trace!("evaluated level {level}");
        self.next_level += 1;
    }

    fn eval_gate(&mut self, gate_id: GateId) {
        let gate = self.netlist.gate(gate_id);
        let inputs: Vec<Logic> = gate.inputs.iter().map(|&input| self.values[input]).collect();
        let outputs = gate.kind.eval(&inputs);
        for (&signal_id, value) in gate.outputs.iter().zip(outputs) {
            self.values[signal_id] = value;
        }
    }
}

pub struct Steps<'a> {
    sim: &'a mut Sim,
}

impl<'a> Iterator for Steps<'a> {
    type Item = Snapshot;

    fn next(&mut self) -> Option<Snapshot> {
        self.sim.step()
    }
}

/// What [`run`] returns for each [`Mode`].
#[derive(Debug, Clone)]
pub enum Run {
    Full(Snapshot),
    Stepwise(Sim),
}

impl Run {
    /// The final values, finishing a stepwise run if needed.
    pub fn into_snapshot(self) -> Snapshot {
        match self {
            Run::Full(snapshot) => snapshot,
            Run::Stepwise(mut sim) => sim.run_to_end(),
        }
    }
}

pub fn run(
    netlist: Arc<Netlist>,
    levels: Arc<Levels>,
    stimulus: &Stimulus,
    mode: Mode,
) -> Result<Run, CircuitError> {
    let mut sim = Sim::new(netlist, levels, stimulus)?;
    Ok(match mode {
        Mode::Full => Run::Full(sim.run_to_end()),
        Mode::Stepwise => Run::Stepwise(sim),
    })
}

/// Elaborates `top`, levels it and runs it to the end.
pub fn simulate(table: &ModuleTable, top: &str, stimulus: &Stimulus) -> Result<Snapshot, CircuitError> {
    let netlist = elaborate(table, top)?;
    let levels = compute_levels(&netlist)?;
    let run = run(Arc::new(netlist), Arc::new(levels), stimulus, Mode::Full)?;
    Ok(run.into_snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn majority() -> (Arc<Netlist>, Arc<Levels>) {
        let top = ModuleDef::new("top")
            .input("a", 1)
            .input("b", 1)
            .input("c", 1)
            .output("y", 1)
            .wire("t", 3)
            .instance(InstanceDef::new("g0", "and").connect(["t[0]", "a", "b"]))
            .instance(InstanceDef::new("g1", "and").connect(["t[1]", "b", "c"]))
            .instance(InstanceDef::new("g2", "and").connect(["t[2]", "a", "c"]))
            .instance(InstanceDef::new("g3", "or").connect(["y", "t[0]", "t[1]", "t[2]"]));
        let table = ModuleTable::from_modules([top]).unwrap();
        let netlist = elaborate(&table, "top").unwrap();
        let levels = compute_levels(&netlist).unwrap();
        (Arc::new(netlist), Arc::new(levels))
    }

    #[test]
    fn full_run() {
        let (netlist, levels) = majority();
        let stimulus = Stimulus::new().set("a", true).set("b", true).set("c", false);
        let snap = run(netlist, levels, &stimulus, Mode::Full).unwrap().into_snapshot();
        assert_eq!(snap.get("y"), Some(Logic::One));
        assert_eq!(snap.word("t"), Some(0b001));
        assert_eq!(snap.levels_done(), 2);
    }

    #[test]
    fn stepwise_run() {
        let (netlist, levels) = majority();
        let stimulus = Stimulus::new().set("a", true).set("b", false).set("c", true);
        let mut sim = match run(netlist.clone(), levels.clone(), &stimulus, Mode::Stepwise).unwrap() {
            Run::Stepwise(sim) => sim,
            Run::Full(_) => panic!("expected a stepwise run"),
        };

        assert_eq!(sim.next_level(), 0);
        assert_eq!(sim.peek("t[2]"), Some(Logic::X));

        let first = sim.step().unwrap();
        assert_eq!(first.get("t[2]"), Some(Logic::One));
        assert_eq!(first.get("y"), Some(Logic::X));

        let second = sim.step().unwrap();
        assert_eq!(second.get("y"), Some(Logic::One));
        assert!(sim.is_finished());
        assert_eq!(sim.step(), None);

        sim.restart();
        assert_eq!(sim.peek("y"), Some(Logic::X));
        let snapshots: Vec<Snapshot> = sim.steps().collect();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[1], second);

        let full = run(netlist, levels, &stimulus, Mode::Full).unwrap().into_snapshot();
        assert_eq!(full, second);
    }

    #[test]
    fn missing_inputs_are_x() {
        let (netlist, levels) = majority();
        let snap = run(netlist.clone(), levels.clone(), &Stimulus::new().set("a", true), Mode::Full)
            .unwrap()
            .into_snapshot();
        assert_eq!(snap.get("y"), Some(Logic::X));

        let snap = run(netlist, levels, &Stimulus::new().set("a", false).set("b", false), Mode::Full)
            .unwrap()
            .into_snapshot();
        assert_eq!(snap.get("y"), Some(Logic::Zero));
    }

    #[test]
    fn bad_stimulus() {
        let (netlist, levels) = majority();
        let err = Sim::new(netlist.clone(), levels.clone(), &Stimulus::new().set("y", true)).unwrap_err();
        assert_eq!(err, CircuitError::NotAnInput("y".to_string()));

        let err = Sim::new(netlist.clone(), levels.clone(), &Stimulus::new().set("t[1]", true)).unwrap_err();
        assert_eq!(err, CircuitError::NotAnInput("t[1]".to_string()));

        let err = Sim::new(netlist, levels, &Stimulus::new().set("q", true)).unwrap_err();
        assert_eq!(err, CircuitError::UnknownSignal("q".to_string()));
    }

    #[test]
    fn levels_from_another_netlist() {
        let (netlist, _levels) = majority();
        let top = ModuleDef::new("top")
            .input("a", 1)
            .output("y", 1)
            .instance(InstanceDef::new("g", "not").connect(["y", "a"]));
        let table = ModuleTable::from_modules([top]).unwrap();
        let small = compute_levels(&elaborate(&table, "top").unwrap()).unwrap();

        let err = Sim::new(netlist.clone(), Arc::new(small.clone()), &Stimulus::new()).unwrap_err();
        assert_eq!(err, CircuitError::LevelsMismatch { gates: 4, leveled: 1 });
        assert!(run(netlist, Arc::new(small), &Stimulus::new(), Mode::Full).is_err());
    }

    #[test]
    fn bus_stimulus() {
        let top = ModuleDef::new("top")
            .input("a", 4)
            .output("y", 4)
            .instance(InstanceDef::new("inv", "not").connect(["y", "a"]));
        let table = ModuleTable::from_modules([top]).unwrap();

        let snap = simulate(&table, "top", &Stimulus::new().word("a", 4, 0b0110)).unwrap();
        assert_eq!(snap.word("y"), Some(0b1001));

        let snap = simulate(&table, "top", &Stimulus::new().set("a", true)).unwrap();
        assert_eq!(snap.word("y"), Some(0));

        let snap = simulate(&table, "top", &Stimulus::new().set("a[3:2]", true)).unwrap();
        assert_eq!(snap.get("y[3]"), Some(Logic::Zero));
        assert_eq!(snap.get("y[0]"), Some(Logic::X));
    }

    #[test]
    fn stimulus_from_json() {
        let stimulus = Stimulus::from_json_str(r#"{"a": "1", "b": "0", "c": "x"}"#).unwrap();
        let expected: Stimulus = [("a", Logic::One), ("b", Logic::Zero), ("c", Logic::X)].into_iter().collect();
        assert_eq!(stimulus, expected);
        assert!(Stimulus::from_json_str(r#"{"a": "2"}"#).is_err());
    }

    #[test]
    fn sims_share_structure() {
        let (netlist, levels) = majority();
        let handles: Vec<_> = [false, true]
            .into_iter()
            .map(|bit| {
                let (netlist, levels) = (netlist.clone(), levels.clone());
                std::thread::spawn(move || {
                    let stimulus = Stimulus::new().set("a", bit).set("b", bit).set("c", bit);
                    let mut sim = Sim::new(netlist, levels, &stimulus).unwrap();
                    sim.run_to_end().get("y")
                })
            })
            .collect();
        let results: Vec<Option<Logic>> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();
        assert_eq!(results, vec![Some(Logic::Zero), Some(Logic::One)]);
    }
}
