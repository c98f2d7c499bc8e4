use crate::common::*;
use crate::path::Path;

/// Everything that can go wrong while building or simulating a netlist.
///
/// All variants are terminal for the call that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CircuitError {
    DuplicateSignal(Path),
    UnknownSignal(String),
    IndexOutOfRange {
        signal: Path,
        index: u32,
        width: u32,
    },
    ZeroWidth(Path),
    DuplicateModule(ModuleName),
    UnknownModule(ModuleName),
    DuplicateInstance(Path),
    PortBindingError {
        instance: Path,
        message: String,
    },
    ArityMismatch {
        instance: Path,
        kind: String,
        expected: String,
        found: usize,
    },
    RecursiveInstantiation(Vec<ModuleName>),
    MultipleDrivers(Path),
    CombinationalCycle(Vec<Path>),
    UndefinedGateKind(String),
    NotAnInput(String),
    LevelsMismatch {
        gates: usize,
        leveled: usize,
    },
}

impl CircuitError {
    pub(crate) fn port_binding<S: Into<String>>(instance: &Path, message: S) -> CircuitError {
        CircuitError::PortBindingError {
            instance: instance.clone(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for CircuitError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            CircuitError::DuplicateSignal(name) => write!(f, "Duplicate signal: {name}"),
            CircuitError::UnknownSignal(name) => write!(f, "Unknown signal: {name}"),
            CircuitError::IndexOutOfRange { signal, index, width } => {
                write!(f, "Index out of range: {signal}[{index}] but {signal} is {width} bits wide")
            },
            CircuitError::ZeroWidth(name) => write!(f, "Signal declared with width 0: {name}"),
            CircuitError::DuplicateModule(name) => write!(f, "Duplicate module: {name}"),
            CircuitError::UnknownModule(name) => write!(f, "Unknown module: {name}"),
            CircuitError::DuplicateInstance(name) => write!(f, "Duplicate instance: {name}"),
            CircuitError::PortBindingError { instance, message } => write!(f, "Port binding error on {instance}: {message}"),
            CircuitError::ArityMismatch { instance, kind, expected, found } => {
                write!(f, "Arity mismatch on {instance}: {kind} expects {expected} connections but has {found}")
            },
            CircuitError::RecursiveInstantiation(stack) => write!(f, "Module instantiates itself: {}", stack.join(" -> ")),
            CircuitError::MultipleDrivers(name) => write!(f, "Signal has multiple drivers: {name}"),
            CircuitError::CombinationalCycle(gates) => {
                let names: Vec<&str> = gates.iter().map(|gate| gate.as_str()).collect();
                write!(f, "Combinational cycle through: {}", names.join(", "))
            },
            CircuitError::UndefinedGateKind(kind) => write!(f, "No semantics for gate kind: {kind}"),
            CircuitError::NotAnInput(name) => write!(f, "Not a primary input: {name}"),
            CircuitError::LevelsMismatch { gates, leveled } => {
                write!(f, "Levels cover {leveled} gates but the netlist has {gates}")
            },
        }
    }
}

impl std::error::Error for CircuitError {}
