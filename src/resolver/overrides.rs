use super::MappedParameterResolver;
use crate::error::InvokeError;
use crate::metadata::MappedParameterDeclaration;
use std::collections::BTreeMap;

/// Explicit values supplied on the command line or through `SDM_MAPPED_*` variables.
/// Names match exactly first, then case-insensitively.
pub struct OverrideResolver {
    values: BTreeMap<String, String>,
}

impl OverrideResolver {
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }
}

impl MappedParameterResolver for OverrideResolver {
    fn name(&self) -> &str {
        "override"
    }

    fn resolve(
        &self,
        declaration: &MappedParameterDeclaration,
    ) -> Result<Option<String>, InvokeError> {
        if let Some(value) = self.values.get(&declaration.name) {
            return Ok(Some(value.clone()));
        }
        Ok(self
            .values
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(&declaration.name))
            .map(|(_, value)| value.clone()))
    }
}
