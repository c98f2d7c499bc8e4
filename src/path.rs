use std::sync::Arc;

/// A dotted hierarchical name, eg `adder.fa0.g1`.
///
/// The empty path is the top-level scope.
#[derive(Ord, PartialOrd, Eq, PartialEq, Clone, Hash)]
pub struct Path(Arc<String>);

impl Path {
    pub fn root() -> Path {
        "".into()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn parent(&self) -> Path {
        let mut path_parts: Vec<&str> = self.split('.').collect();
        path_parts.pop();
        path_parts.join(".").into()
    }

    /// The last component of the path.
    pub fn leaf(&self) -> &str {
        self.rsplit('.').next().unwrap_or("")
    }

    pub fn join<P: Into<Path>>(&self, path: P) -> Path {
        let path: Path = path.into();
        if self.is_root() {
            path
        } else if path.is_root() {
            self.clone()
        } else {
            format!("{}.{}", self, path).into()
        }
    }

    /// Returns the rest of this path when it lies strictly inside `prefix`.
    pub fn strip_prefix(&self, prefix: &Path) -> Option<Path> {
        if prefix.is_root() {
            return Some(self.clone());
        }
        let rest = self.0.strip_prefix(prefix.as_str())?;
        rest.strip_prefix('.').map(|rest| rest.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::ops::Deref for Path {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", &self.0)
    }
}

impl std::fmt::Debug for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "Path(\"{}\")", &self.0)
    }
}

impl From<String> for Path {
    fn from(path: String) -> Path {
        Path(Arc::new(path))
    }
}

impl From<&str> for Path {
    fn from(path: &str) -> Path {
        Path(Arc::new(path.to_string()))
    }
}

impl From<&String> for Path {
    fn from(path: &String) -> Path {
        Path(Arc::new(path.clone()))
    }
}

impl serde::Serialize for Path {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
