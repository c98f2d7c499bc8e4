use super::*;

use log::*;
use serde::{Deserialize, Serialize};

/// The JSON interchange form of a module list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Design {
    pub modules: Vec<ModuleDef>,
}

impl Design {
    pub fn from_table(table: &ModuleTable) -> Design {
        Design {
            modules: table.modules().iter().map(|module| module.as_ref().clone()).collect(),
        }
    }

    pub fn into_table(self) -> Result<ModuleTable, CircuitError> {
        ModuleTable::from_modules(self.modules)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

pub fn load_design_from_file<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<ModuleTable> {
    let path = path.as_ref();
    info!("Loading design from {}", path.display());
    let design_text = std::fs::read_to_string(path)?;
    load_design_from_str(&design_text)
}

pub fn load_design_from_str(design_text: &str) -> anyhow::Result<ModuleTable> {
    let design: Design = serde_json::from_str(design_text)?;
    debug!("Parsed {} modules", design.modules.len());
    Ok(design.into_table()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_minimal() {
        let table = load_design_from_str(
            r#"{
                "modules": [{
                    "name": "inv",
                    "ports": [
                        {"name": "a", "direction": "input"},
                        {"name": "y", "direction": "output"}
                    ],
                    "instances": [{"name": "g", "kind": "not", "connections": ["y", "a"]}]
                }]
            }"#,
        )
        .unwrap();
        let module = table.module("inv").unwrap();
        assert_eq!(module.ports[0].width, 1);
        assert_eq!(module.instances[0].connections, vec![SignalRef::from("y"), SignalRef::from("a")]);
    }

    #[test]
    fn load_errors() {
        assert!(load_design_from_str("{").is_err());
        assert!(load_design_from_str(r#"{"modules": [{"name": "m", "ports": [{"name": "a", "direction": "sideways"}]}]}"#).is_err());

        let err = load_design_from_str(r#"{"modules": [{"name": "m"}, {"name": "m"}]}"#).unwrap_err();
        assert_eq!(err.downcast::<CircuitError>().unwrap(), CircuitError::DuplicateModule("m".to_string()));
    }

    #[test]
    fn missing_file() {
        assert!(load_design_from_file("no/such/design.json").is_err());
    }
}
