//! Configuration de pmoxspf
//!
//! La configuration se charge depuis du YAML (typiquement une section du
//! fichier de configuration de l'application) puis peut être surchargée par
//! des variables d'environnement `PMOXSPF_CONFIG__<CHEMIN>`, où `__` sépare
//! les niveaux :
//!
//! ```text
//! PMOXSPF_CONFIG__STRICT=false
//! PMOXSPF_CONFIG__SAVE__INDENT=false
//! ```

use crate::{Mode, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::path::Path;
use std::{env, fs};

const ENV_PREFIX: &str = "PMOXSPF_CONFIG__";

const DEFAULT_INDENT_STRING: &str = "  ";

/// Configuration du chargement et de l'écriture des playlists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XspfConfig {
    /// Mode strict (namespace canonique uniquement) ou tolérant
    pub strict: bool,
    /// Options d'écriture
    pub save: SaveOptions,
}

impl Default for XspfConfig {
    fn default() -> Self {
        Self {
            strict: true,
            save: SaveOptions::default(),
        }
    }
}

impl XspfConfig {
    /// Charge la configuration depuis une chaîne YAML.
    /// Les clés absentes prennent leur valeur par défaut.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Charge la configuration depuis un fichier YAML
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        tracing::debug!("Loading XSPF configuration from {}", path.as_ref().display());
        Self::from_yaml_str(&content)
    }

    /// Applique les surcharges `PMOXSPF_CONFIG__*` de l'environnement
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(env::vars())
    }

    /// Applique des surcharges `(clé, valeur)` au format des variables
    /// d'environnement. Les clés sans le préfixe sont ignorées.
    pub fn apply_overrides<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut tree = serde_yaml::to_value(&*self)?;
        let mut changed = false;

        for (key, value) in vars {
            let Some(path) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let key_path: Vec<String> = path.split("__").map(str::to_lowercase).collect();
            tracing::debug!("Configuration override {} = {}", key_path.join("."), value);
            set_value(&mut tree, &key_path, convert_env_value(&value));
            changed = true;
        }

        if changed {
            *self = serde_yaml::from_value(tree)?;
        }
        Ok(())
    }

    /// Mode de résolution correspondant à `strict`
    pub fn mode(&self) -> Mode {
        Mode::from_strict(self.strict)
    }
}

fn convert_env_value(value: &str) -> Value {
    serde_yaml::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()))
}

fn set_value(tree: &mut Value, path: &[String], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        *tree = value;
        return;
    };

    if !tree.is_mapping() {
        *tree = Value::Mapping(Mapping::new());
    }
    if let Value::Mapping(map) = tree {
        let key = Value::String(head.clone());
        let entry = map.entry(key).or_insert(Value::Null);
        set_value(entry, rest, value);
    }
}

/// Options d'écriture XML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveOptions {
    /// Indente la sortie
    pub indent: bool,
    /// Chaîne d'indentation
    pub indent_string: String,
    /// Écrit la déclaration `<?xml ...?>`
    pub write_document_declaration: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            indent: true,
            indent_string: DEFAULT_INDENT_STRING.to_string(),
            write_document_declaration: true,
        }
    }
}

impl SaveOptions {
    /// Sortie compacte, sans indentation
    pub fn compact() -> Self {
        Self {
            indent: false,
            ..Self::default()
        }
    }

    /// Configuration de l'émetteur xmltree correspondante
    pub fn emitter_config(&self) -> xmltree::EmitterConfig {
        xmltree::EmitterConfig::new()
            .write_document_declaration(self.write_document_declaration)
            .perform_indent(self.indent)
            .indent_string(self.indent_string.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = XspfConfig::default();
        assert!(config.strict);
        assert_eq!(config.mode(), Mode::Strict);
        assert!(config.save.indent);
        assert_eq!(config.save.indent_string, "  ");
    }

    #[test]
    fn test_from_yaml_partial() {
        let config = XspfConfig::from_yaml_str("strict: false\n").unwrap();
        assert_eq!(config.mode(), Mode::Lenient);
        assert_eq!(config.save, SaveOptions::default());

        let config = XspfConfig::from_yaml_str("save:\n  indent: false\n").unwrap();
        assert!(config.strict);
        assert!(!config.save.indent);
        assert!(config.save.write_document_declaration);
    }

    #[test]
    fn test_empty_yaml() {
        assert_eq!(XspfConfig::from_yaml_str("").unwrap(), XspfConfig::default());
    }

    #[test]
    fn test_overrides() {
        let mut config = XspfConfig::default();
        config
            .apply_overrides(vars(&[
                ("PMOXSPF_CONFIG__STRICT", "false"),
                ("PMOXSPF_CONFIG__SAVE__INDENT", "false"),
                ("OTHER_VARIABLE", "ignored"),
            ]))
            .unwrap();

        assert!(!config.strict);
        assert!(!config.save.indent);
        assert_eq!(config.save.indent_string, "  ");
    }

    #[test]
    fn test_override_type_error() {
        let mut config = XspfConfig::default();
        let result = config.apply_overrides(vars(&[("PMOXSPF_CONFIG__STRICT", "maybe")]));
        assert!(matches!(result, Err(crate::Error::Yaml(_))));
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xspf.yaml");
        fs::write(&path, "strict: false\nsave:\n  write_document_declaration: false\n").unwrap();

        let config = XspfConfig::from_yaml_file(&path).unwrap();
        assert!(!config.strict);
        assert!(!config.save.write_document_declaration);
    }
}
