use serde::{Deserialize, Serialize};

pub type ModuleName = String;
pub type PortName = String;
pub type InstanceName = String;

pub type SignalId = usize;
pub type GateId = usize;

/// Direction of a module port, seen from inside the module.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
        }
    }
}

/// Where a signal sits in the flattened design.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum Role {
    PrimaryInput,
    PrimaryOutput,
    Internal,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::PrimaryInput => write!(f, "+"),
            Role::PrimaryOutput => write!(f, "-"),
            Role::Internal => write!(f, "~"),
        }
    }
}

impl From<Direction> for Role {
    fn from(direction: Direction) -> Role {
        match direction {
            Direction::Input => Role::PrimaryInput,
            Direction::Output => Role::PrimaryOutput,
        }
    }
}
