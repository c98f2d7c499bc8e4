use super::*;

use std::collections::BTreeMap;

use log::*;

/// A single bit of a scalar or bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    base: Path,
    index: Option<u32>,
    role: Role,
}

impl Signal {
    /// The full hierarchical name of the bit, eg `fa0.w1` or `sum[3]`.
    pub fn name(&self) -> Path {
        match self.index {
            Some(i) => format!("{}[{i}]", self.base).into(),
            None => self.base.clone(),
        }
    }

    /// The name of the scalar or bus this bit belongs to.
    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn index(&self) -> Option<u32> {
        self.index
    }

    pub fn role(&self) -> Role {
        self.role
    }
}

/// Which bits of a named net a reference picks out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Select {
    All,
    Bit(u32),
    /// `name[hi:lo]`, inclusive on both ends.
    Range(u32, u32),
}

/// A textual reference to a signal: `name`, `name[i]` or `name[hi:lo]`.
#[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SignalRef {
    pub name: String,
    pub select: Select,
}

impl SignalRef {
    pub fn new<S: Into<String>>(name: S) -> SignalRef {
        SignalRef { name: name.into(), select: Select::All }
    }

    pub fn bit<S: Into<String>>(name: S, index: u32) -> SignalRef {
        SignalRef { name: name.into(), select: Select::Bit(index) }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => (),
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

impl std::str::FromStr for SignalRef {
    type Err = CircuitError;

    fn from_str(text: &str) -> Result<SignalRef, CircuitError> {
        let text = text.trim();
        let malformed = || CircuitError::UnknownSignal(text.to_string());

        let (name, select) = match text.split_once('[') {
            None => (text, Select::All),
            Some((name, rest)) => {
                let inner = rest.strip_suffix(']').ok_or_else(malformed)?;
                let select = match inner.split_once(':') {
                    None => Select::Bit(inner.trim().parse().map_err(|_| malformed())?),
                    Some((hi, lo)) => {
                        let hi: u32 = hi.trim().parse().map_err(|_| malformed())?;
                        let lo: u32 = lo.trim().parse().map_err(|_| malformed())?;
                        Select::Range(hi, lo)
                    },
                };
                (name.trim(), select)
            },
        };

        if !is_identifier(name) {
            return Err(malformed());
        }
        Ok(SignalRef { name: name.to_string(), select })
    }
}

impl TryFrom<String> for SignalRef {
    type Error = CircuitError;
    fn try_from(text: String) -> Result<SignalRef, CircuitError> {
        text.parse()
    }
}

impl From<&str> for SignalRef {
    /// Panics on malformed references. Meant for literals in code and tests.
    fn from(text: &str) -> SignalRef {
        match text.parse() {
            Ok(reference) => reference,
            Err(e) => panic!("{e}"),
        }
    }
}

impl From<SignalRef> for String {
    fn from(reference: SignalRef) -> String {
        reference.to_string()
    }
}

impl std::fmt::Display for SignalRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.select {
            Select::All => write!(f, "{}", self.name),
            Select::Bit(i) => write!(f, "{}[{i}]", self.name),
            Select::Range(hi, lo) => write!(f, "{}[{hi}:{lo}]", self.name),
        }
    }
}

impl std::fmt::Debug for SignalRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SignalRef(\"{self}\")")
    }
}

#[derive(Debug, Clone)]
struct Net {
    path: Path,
    bits: Vec<SignalId>,
}

/// The names visible inside one module instantiation.
///
/// Ports of a nested module are aliases of the caller's signals, so two scopes
/// can map different names onto the same [`SignalId`].
#[derive(Debug, Clone)]
pub struct Scope {
    path: Path,
    nets: BTreeMap<String, Net>,
}

impl Scope {
    pub fn new(path: Path) -> Scope {
        Scope {
            path,
            nets: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates `width` fresh bit signals for `name`.
    pub fn declare(
        &mut self,
        name: &str,
        width: u32,
        role: Role,
        signals: &mut Vec<Signal>,
    ) -> Result<Vec<SignalId>, CircuitError> {
        let path = self.path.join(name);
        if self.nets.contains_key(name) {
            return Err(CircuitError::DuplicateSignal(path));
        }
        if width == 0 {
            return Err(CircuitError::ZeroWidth(path));
        }

        let bits: Vec<SignalId> = (0..width)
            .map(|i| {
                let index = if width == 1 { None } else { Some(i) };
                signals.push(Signal { base: path.clone(), index, role });
                signals.len() - 1
            })
            .collect();

        trace!("declare {path} : {width} ({role})");
        self.nets.insert(name.to_string(), Net { path, bits: bits.clone() });
        Ok(bits)
    }

    /// Makes `name` refer to existing signals.
    pub fn alias(&mut self, name: &str, bits: Vec<SignalId>) -> Result<(), CircuitError> {
        let path = self.path.join(name);
        if self.nets.contains_key(name) {
            return Err(CircuitError::DuplicateSignal(path));
        }
        self.nets.insert(name.to_string(), Net { path, bits });
        Ok(())
    }

    pub fn width(&self, name: &str) -> Option<u32> {
        self.nets.get(name).map(|net| net.bits.len() as u32)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nets.keys().map(|name| name.as_str())
    }

    /// The bits a reference denotes, in ascending index order.
    pub fn resolve(&self, reference: &SignalRef) -> Result<Vec<SignalId>, CircuitError> {
        let net = self
            .nets
            .get(&reference.name)
            .ok_or_else(|| CircuitError::UnknownSignal(self.path.join(reference.to_string()).to_string()))?;
        let width = net.bits.len() as u32;
        let check = |index: u32| {
            if index < width {
                Ok(index as usize)
            } else {
                Err(CircuitError::IndexOutOfRange { signal: net.path.clone(), index, width })
            }
        };

        match reference.select {
            Select::All => Ok(net.bits.clone()),
            Select::Bit(i) => Ok(vec![net.bits[check(i)?]]),
            Select::Range(hi, lo) => {
                let (lo, hi) = (lo.min(hi), lo.max(hi));
                let (lo, hi) = (check(lo)?, check(hi)?);
                Ok(net.bits[lo..=hi].to_vec())
            },
        }
    }

    /// Like [`Scope::resolve`], but the reference must denote exactly one bit.
    pub fn resolve_bit(&self, reference: &SignalRef) -> Result<SignalId, CircuitError> {
        let bits = self.resolve(reference)?;
        match bits.as_slice() {
            [bit] => Ok(*bit),
            _ => Err(CircuitError::IndexOutOfRange {
                signal: self.path.join(reference.name.as_str()),
                index: bits.len() as u32,
                width: 1,
            }),
        }
    }
}
