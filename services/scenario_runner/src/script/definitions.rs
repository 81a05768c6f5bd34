//! Shared definitions: message templates and variables every scenario sees.
//!
//! ```toml
//! [variables]
//! account = "ACC-1"
//!
//! [templates.limit_order]
//! kind = "NewOrderSingle"
//! fields = { ClOrdID = "${uid}", Symbol = "EUR/USD", Side = "1", OrderQty = 100, OrdType = "2", Price = 1.1 }
//! ```

use super::values::{field_table, scalar, Variables};
use crate::bindings;
use crate::error::ScriptError;
use fix_types::MessageKind;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize, Default)]
struct DefinitionsFile {
    #[serde(default)]
    variables: toml::Table,
    #[serde(default)]
    templates: BTreeMap<String, TemplateFile>,
}

#[derive(Debug, Deserialize)]
struct TemplateFile {
    kind: String,
    #[serde(default)]
    fields: toml::Table,
}

/// A named message skeleton. Field text is substituted at send time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub kind: MessageKind,
    pub fields: Vec<(u32, String)>,
}

#[derive(Debug, Clone, Default)]
pub struct Definitions {
    pub variables: Variables,
    pub templates: HashMap<String, Template>,
}

impl Definitions {
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let text = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let definitions = Self::parse(&text, path)?;
        info!(
            path = %path.display(),
            templates = definitions.templates.len(),
            variables = definitions.variables.len(),
            "Definitions loaded"
        );
        Ok(definitions)
    }

    pub fn parse(text: &str, path: &Path) -> Result<Self, ScriptError> {
        let file: DefinitionsFile =
            toml::from_str(text).map_err(|e| ScriptError::parse(path, e))?;

        let variables = file
            .variables
            .iter()
            .map(|(name, value)| Ok((name.clone(), scalar(name, value)?)))
            .collect::<Result<Variables, ScriptError>>()?;

        let mut templates = HashMap::with_capacity(file.templates.len());
        for (name, template) in file.templates {
            let kind = bindings::kind(&template.kind)
                .ok_or_else(|| ScriptError::UnknownKind(template.kind.clone()))?;
            let fields = field_table(&template.fields)?;
            templates.insert(name, Template { kind, fields });
        }

        Ok(Self {
            variables,
            templates,
        })
    }

    pub fn template(&self, name: &str) -> Result<&Template, ScriptError> {
        self.templates
            .get(name)
            .ok_or_else(|| ScriptError::UnknownTemplate(name.to_string()))
    }
}
