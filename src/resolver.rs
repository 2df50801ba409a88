//! Mapped parameter resolution.
//!
//! A [`ResolverChain`] asks each strategy in order and keeps the first non-empty
//! answer. "No answer" moves on to the next strategy; an error stops the chain at
//! once, because it means the value must not be resolved at all.

use crate::context::ExecutionContext;
use crate::error::InvokeError;
use crate::invocation::ArgumentSet;
use crate::metadata::MappedParameterDeclaration;
use tracing::debug;

mod context;
mod overrides;

pub use context::{uris, ContextResolver};
pub use overrides::OverrideResolver;

/// One way of finding a mapped parameter's value.
pub trait MappedParameterResolver: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn resolve(
        &self,
        declaration: &MappedParameterDeclaration,
    ) -> Result<Option<String>, InvokeError>;
}

/// Ordered list of strategies; first match wins.
#[derive(Default)]
pub struct ResolverChain {
    resolvers: Vec<Box<dyn MappedParameterResolver>>,
}

impl ResolverChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// The chain used for command-line runs: explicit overrides, then the context vocabulary.
    pub fn for_context(context: &ExecutionContext) -> Self {
        Self::new()
            .with(OverrideResolver::new(context.mapped_overrides.clone()))
            .with(ContextResolver::new(context.clone()))
    }

    pub fn with(mut self, resolver: impl MappedParameterResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    pub fn resolve(
        &self,
        declaration: &MappedParameterDeclaration,
    ) -> Result<Option<String>, InvokeError> {
        for resolver in &self.resolvers {
            if let Some(value) = resolver.resolve(declaration)? {
                if !value.is_empty() {
                    debug!(
                        parameter = %declaration.name,
                        uri = %declaration.uri,
                        resolver = resolver.name(),
                        "Resolved mapped parameter"
                    );
                    return Ok(Some(value));
                }
            }
        }
        Ok(None)
    }

    /// Resolve every declaration; only those with a value end up in the set.
    pub fn resolve_all(
        &self,
        declarations: &[MappedParameterDeclaration],
    ) -> Result<ArgumentSet, InvokeError> {
        let mut resolved = ArgumentSet::new();
        for declaration in declarations {
            if let Some(value) = self.resolve(declaration)? {
                resolved.insert(declaration.name.clone(), value);
            }
        }
        Ok(resolved)
    }
}
