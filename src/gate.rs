use super::*;

/// The built-in primitive gate kinds.
///
/// Every kind knows its port names and how to compute its outputs, so there is
/// no name-to-behavior lookup left to fail at simulation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GateKind {
    Buf,
    Not,
    And,
    Or,
    Nand,
    Nor,
    Xor,
    Xnor,
    HalfAdder,
    FullAdder,
    HalfSubtractor,
    FullSubtractor,
    Mux2,
    Mux4,
}

/// How many inputs a gate kind takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "{n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

/// Input port names of the multi-input boolean gates, in order.
const VARIADIC_INPUTS: [&str; 26] = [
    "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m",
    "n", "o", "p", "q", "r", "s", "t", "u", "v", "w", "x", "z", "aa",
];

impl GateKind {
    pub const ALL: [GateKind; 14] = [
        GateKind::Buf,
        GateKind::Not,
        GateKind::And,
        GateKind::Or,
        GateKind::Nand,
        GateKind::Nor,
        GateKind::Xor,
        GateKind::Xnor,
        GateKind::HalfAdder,
        GateKind::FullAdder,
        GateKind::HalfSubtractor,
        GateKind::FullSubtractor,
        GateKind::Mux2,
        GateKind::Mux4,
    ];

    /// The canonical module name the kind is registered under.
    pub fn name(&self) -> &'static str {
        match self {
            GateKind::Buf => "buf",
            GateKind::Not => "not",
            GateKind::And => "and",
            GateKind::Or => "or",
            GateKind::Nand => "nand",
            GateKind::Nor => "nor",
            GateKind::Xor => "xor",
            GateKind::Xnor => "xnor",
            GateKind::HalfAdder => "ha",
            GateKind::FullAdder => "fa",
            GateKind::HalfSubtractor => "hs",
            GateKind::FullSubtractor => "fs",
            GateKind::Mux2 => "mux2",
            GateKind::Mux4 => "mux4",
        }
    }

    /// Alternative names used by technology-mapped netlists.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            GateKind::Buf => &["BUF"],
            GateKind::Not => &["NOT", "INV"],
            GateKind::And => &["AND"],
            GateKind::Or => &["OR"],
            GateKind::Nand => &["NAND"],
            GateKind::Nor => &["NOR"],
            GateKind::Xor => &["XOR"],
            GateKind::Xnor => &["XNOR"],
            GateKind::HalfAdder => &["HA"],
            GateKind::FullAdder => &["FA"],
            GateKind::HalfSubtractor => &["HS"],
            GateKind::FullSubtractor => &["FS"],
            GateKind::Mux2 => &["MUX2", "MUX", "mux"],
            GateKind::Mux4 => &["MUX4"],
        }
    }

    pub fn from_name(name: &str) -> Option<GateKind> {
        GateKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == name || kind.aliases().contains(&name))
    }

    pub fn arity(&self) -> Arity {
        match self {
            GateKind::Buf | GateKind::Not => Arity::Exactly(1),
            GateKind::And | GateKind::Or | GateKind::Nand | GateKind::Nor | GateKind::Xor | GateKind::Xnor => {
                Arity::AtLeast(2)
            },
            GateKind::HalfAdder | GateKind::HalfSubtractor => Arity::Exactly(2),
            GateKind::FullAdder | GateKind::FullSubtractor => Arity::Exactly(3),
            GateKind::Mux2 => Arity::Exactly(3),
            GateKind::Mux4 => Arity::Exactly(6),
        }
    }

    pub fn is_variadic(&self) -> bool {
        matches!(self.arity(), Arity::AtLeast(_))
    }

    pub fn num_outputs(&self) -> usize {
        self.output_names().len()
    }

    pub fn output_names(&self) -> &'static [&'static str] {
        match self {
            GateKind::HalfAdder | GateKind::FullAdder => &["cout", "sum"],
            GateKind::HalfSubtractor | GateKind::FullSubtractor => &["bout", "diff"],
            _ => &["y"],
        }
    }

    /// Input port names for an instance with `num_inputs` inputs.
    pub fn input_names(&self, num_inputs: usize) -> Vec<&'static str> {
        match self {
            GateKind::Buf | GateKind::Not => vec!["a"],
            GateKind::HalfAdder | GateKind::HalfSubtractor => vec!["a", "b"],
            GateKind::FullAdder => vec!["a", "b", "cin"],
            GateKind::FullSubtractor => vec!["a", "b", "bin"],
            GateKind::Mux2 => vec!["a", "b", "s"],
            GateKind::Mux4 => vec!["a", "b", "c", "d", "s1", "s0"],
            _ => VARIADIC_INPUTS.iter().copied().take(num_inputs).collect(),
        }
    }

    pub fn max_inputs(&self) -> usize {
        match self.arity() {
            Arity::Exactly(n) => n,
            Arity::AtLeast(_) => VARIADIC_INPUTS.len(),
        }
    }

    pub fn accepts_inputs(&self, num_inputs: usize) -> bool {
        match self.arity() {
            Arity::Exactly(n) => num_inputs == n,
            Arity::AtLeast(n) => n <= num_inputs && num_inputs <= self.max_inputs(),
        }
    }

    /// The declared port order used for positional binding.
    ///
    /// The single-output boolean gates put the output first, the way Verilog
    /// gate primitives do (`and g1 (y, a, b)`). Arithmetic cells and muxes list
    /// their inputs first (`fa u0 (a, b, cin, cout, sum)`).
    pub fn port_order(&self, num_inputs: usize) -> Vec<(&'static str, Direction)> {
        let inputs = self.input_names(num_inputs).into_iter().map(|name| (name, Direction::Input));
        let outputs = self.output_names().iter().map(|name| (*name, Direction::Output));
        match self {
            GateKind::Buf
            | GateKind::Not
            | GateKind::And
            | GateKind::Or
            | GateKind::Nand
            | GateKind::Nor
            | GateKind::Xor
            | GateKind::Xnor => outputs.chain(inputs).collect(),
            _ => inputs.chain(outputs).collect(),
        }
    }

    /// Computes the outputs (in [`GateKind::output_names`] order) from the inputs.
    ///
    /// # Panics
    ///
    /// Panics if `inputs` is shorter than the kind's input count. Netlists
    /// built by [`elaborate`] always supply the full count.
    pub fn eval(&self, inputs: &[Logic]) -> Vec<Logic> {
        match self {
            GateKind::Buf => vec![inputs[0]],
            GateKind::Not => vec![inputs[0].not()],
            GateKind::And => vec![Logic::and_all(inputs.iter().copied())],
            GateKind::Or => vec![Logic::or_all(inputs.iter().copied())],
            GateKind::Nand => vec![Logic::and_all(inputs.iter().copied()).not()],
            GateKind::Nor => vec![Logic::or_all(inputs.iter().copied()).not()],
            GateKind::Xor => vec![Logic::xor_all(inputs.iter().copied())],
            GateKind::Xnor => vec![Logic::xor_all(inputs.iter().copied()).not()],
            GateKind::HalfAdder => {
                let (a, b) = (inputs[0], inputs[1]);
                vec![a.and(b), a.xor(b)]
            },
            GateKind::FullAdder => {
                let (a, b, cin) = (inputs[0], inputs[1], inputs[2]);
                vec![majority(a, b, cin), Logic::xor_all([a, b, cin])]
            },
            GateKind::HalfSubtractor => {
                let (a, b) = (inputs[0], inputs[1]);
                vec![a.not().and(b), a.xor(b)]
            },
            GateKind::FullSubtractor => {
                let (a, b, bin) = (inputs[0], inputs[1], inputs[2]);
                let borrow = Logic::or_all([a.not().and(b), a.not().and(bin), b.and(bin)]);
                vec![borrow, Logic::xor_all([a, b, bin])]
            },
            GateKind::Mux2 => {
                let (a, b, s) = (inputs[0], inputs[1], inputs[2]);
                let y = match s {
                    Logic::Zero => a,
                    Logic::One => b,
                    Logic::X => Logic::agree([a, b]),
                };
                vec![y]
            },
            GateKind::Mux4 => {
                let data = &inputs[0..4];
                let (s1, s0) = (inputs[4], inputs[5]);
                let candidates = (0..4usize)
                    .filter(|i| selectable(s1, i & 0b10 != 0) && selectable(s0, i & 0b01 != 0))
                    .map(|i| data[i]);
                vec![Logic::agree(candidates)]
            },
        }
    }
}

fn majority(a: Logic, b: Logic, c: Logic) -> Logic {
    Logic::or_all([a.and(b), b.and(c), a.and(c)])
}

/// Whether a select bit with value `sel` can pick the branch where it is `bit`.
fn selectable(sel: Logic, bit: bool) -> bool {
    match sel.to_bool() {
        Some(sel) => sel == bit,
        None => true,
    }
}

impl std::fmt::Display for GateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
