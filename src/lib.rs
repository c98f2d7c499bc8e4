//! Gate-level netlists and three-valued combinational simulation.
//!
//! A design is a list of [`ModuleDef`]s registered in a [`ModuleTable`]
//! alongside the built-in gate kinds. [`elaborate`] flattens a top module into
//! a [`Netlist`] of primitive gates, [`compute_levels`] orders those gates,
//! and [`run`] evaluates them over a [`Stimulus`], either all at once or one
//! level at a time, producing [`Snapshot`]s of every signal.

mod common;
mod error;
mod path;
mod value;
mod signal;
mod gate;
mod module;
mod netlist;
mod elaborate;
mod level;
mod sim;
mod snapshot;
pub mod design;
pub mod logging;


pub use common::*;
pub use error::CircuitError;
pub use path::Path;
pub use value::Logic;
pub use signal::{Scope, Select, Signal, SignalRef};
pub use gate::{Arity, GateKind};
pub use module::{Entry, InstanceDef, ModuleDef, ModuleTable, PortDef, WireDecl};
pub use netlist::{Gate, Netlist};
pub use elaborate::elaborate;
pub use level::{compute_levels, Levels};
pub use sim::{run, simulate, Mode, Run, Sim, Steps, Stimulus};
pub use snapshot::Snapshot;
pub use design::{load_design_from_file, load_design_from_str, Design};
