use serde::{Deserialize, Serialize};

/// A three-valued logic level carried by a single-bit signal.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Logic {
    Zero,
    One,
    /// An unknown or not-yet-driven value.
    #[default]
    X,
}

impl Logic {
    pub fn is_x(&self) -> bool {
        matches!(self, Logic::X)
    }

    pub fn is_known(&self) -> bool {
        !self.is_x()
    }

    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Logic::Zero => Some(false),
            Logic::One => Some(true),
            Logic::X => None,
        }
    }

    pub fn not(self) -> Logic {
        match self {
            Logic::Zero => Logic::One,
            Logic::One => Logic::Zero,
            Logic::X => Logic::X,
        }
    }

    /// A known 0 decides the result even when the other operands are unknown.
    pub fn and_all<I: IntoIterator<Item = Logic>>(values: I) -> Logic {
        let mut result = Logic::One;
        for value in values {
            match value {
                Logic::Zero => return Logic::Zero,
                Logic::X => result = Logic::X,
                Logic::One => (),
            }
        }
        result
    }

    /// A known 1 decides the result even when the other operands are unknown.
    pub fn or_all<I: IntoIterator<Item = Logic>>(values: I) -> Logic {
        let mut result = Logic::Zero;
        for value in values {
            match value {
                Logic::One => return Logic::One,
                Logic::X => result = Logic::X,
                Logic::Zero => (),
            }
        }
        result
    }

    /// Parity has no dominant value: any unknown operand makes the result unknown.
    pub fn xor_all<I: IntoIterator<Item = Logic>>(values: I) -> Logic {
        let mut parity = false;
        for value in values {
            match value.to_bool() {
                Some(bit) => parity ^= bit,
                None => return Logic::X,
            }
        }
        parity.into()
    }

    pub fn and(self, other: Logic) -> Logic {
        Logic::and_all([self, other])
    }

    pub fn or(self, other: Logic) -> Logic {
        Logic::or_all([self, other])
    }

    pub fn xor(self, other: Logic) -> Logic {
        Logic::xor_all([self, other])
    }

    /// The common value of `values` if they all agree on a known value.
    pub fn agree<I: IntoIterator<Item = Logic>>(values: I) -> Logic {
        let mut common = None;
        for value in values {
            if value.is_x() {
                return Logic::X;
            }
            match common {
                None => common = Some(value),
                Some(c) if c != value => return Logic::X,
                Some(_) => (),
            }
        }
        common.unwrap_or(Logic::X)
    }

    pub fn to_char(&self) -> char {
        match self {
            Logic::Zero => '0',
            Logic::One => '1',
            Logic::X => 'X',
        }
    }
}

impl From<bool> for Logic {
    fn from(x: bool) -> Logic {
        if x {
            Logic::One
        } else {
            Logic::Zero
        }
    }
}

impl TryFrom<Logic> for bool {
    type Error = ();
    fn try_from(value: Logic) -> Result<bool, Self::Error> {
        value.to_bool().ok_or(())
    }
}

impl std::str::FromStr for Logic {
    type Err = String;

    fn from_str(s: &str) -> Result<Logic, Self::Err> {
        match s.trim() {
            "0" | "1'b0" => Ok(Logic::Zero),
            "1" | "1'b1" => Ok(Logic::One),
            "x" | "X" | "1'bx" | "1'bX" => Ok(Logic::X),
            other => Err(format!("Not a logic value: {other:?}")),
        }
    }
}

impl TryFrom<String> for Logic {
    type Error = String;
    fn try_from(s: String) -> Result<Logic, Self::Error> {
        s.parse()
    }
}

impl From<Logic> for String {
    fn from(value: Logic) -> String {
        value.to_char().to_string()
    }
}

impl std::fmt::Debug for Logic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.to_char())
    }
}

impl std::fmt::Display for Logic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.to_char())
    }
}

#[test]
fn logic_from_str() {
    assert_eq!("0".parse::<Logic>(), Ok(Logic::Zero));
    assert_eq!(" 1 ".parse::<Logic>(), Ok(Logic::One));
    assert_eq!("x".parse::<Logic>(), Ok(Logic::X));
    assert!("2".parse::<Logic>().is_err());
}

#[test]
fn dominant_values() {
    use Logic::*;
    assert_eq!(Zero.and(X), Zero);
    assert_eq!(X.and(Zero), Zero);
    assert_eq!(One.and(X), X);
    assert_eq!(One.and(One), One);

    assert_eq!(One.or(X), One);
    assert_eq!(Zero.or(X), X);
    assert_eq!(Zero.or(Zero), Zero);

    assert_eq!(One.xor(X), X);
    assert_eq!(One.xor(One), Zero);
    assert_eq!(X.not(), X);
}

#[test]
fn agreement() {
    use Logic::*;
    assert_eq!(Logic::agree([One, One, One]), One);
    assert_eq!(Logic::agree([Zero, One]), X);
    assert_eq!(Logic::agree([Zero, X]), X);
    assert_eq!(Logic::agree([]), X);
}
