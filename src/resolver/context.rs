use super::MappedParameterResolver;
use crate::context::ExecutionContext;
use crate::error::InvokeError;
use crate::metadata::MappedParameterDeclaration;
use tracing::warn;

/// Mapping URIs understood by [`ContextResolver`].
pub mod uris {
    pub const REPOSITORY_OWNER: &str = "atomist://github/repository/owner";
    pub const REPOSITORY: &str = "atomist://github/repository";
    pub const TEAM: &str = "atomist://slack/team";
    pub const USER: &str = "atomist://slack/user";
    pub const WEBHOOK_URL: &str = "atomist://github_webhook_url";
    pub const API_URL: &str = "atomist://github_api_url";
    pub const REPOSITORY_PROVIDER: &str = "atomist://github/repository/provider";
}

const PLACEHOLDER_WEBHOOK_URL: &str = "http://not.a.real.url";
const API_BASE_URL: &str = "https://api.github.com";
const PLACEHOLDER_PROVIDER_ID: &str = "not-configured";

/// Resolves the fixed mapping vocabulary against the execution context. Owner and
/// repository come from a `.../owner/repo` directory layout.
pub struct ContextResolver {
    context: ExecutionContext,
}

impl ContextResolver {
    pub fn new(context: ExecutionContext) -> Self {
        Self { context }
    }
}

impl MappedParameterResolver for ContextResolver {
    fn name(&self) -> &str {
        "context"
    }

    fn resolve(
        &self,
        declaration: &MappedParameterDeclaration,
    ) -> Result<Option<String>, InvokeError> {
        let value = match declaration.uri.as_str() {
            uris::REPOSITORY_OWNER => self.context.repository_owner(),
            uris::REPOSITORY => self.context.repository_name(),
            uris::TEAM => Some(self.context.workspace_id.clone()),
            uris::USER => self.context.user_name(),
            uris::WEBHOOK_URL => Some(PLACEHOLDER_WEBHOOK_URL.to_string()),
            uris::API_URL => Some(API_BASE_URL.to_string()),
            uris::REPOSITORY_PROVIDER => Some(PLACEHOLDER_PROVIDER_ID.to_string()),
            other => {
                warn!(
                    parameter = %declaration.name,
                    uri = other,
                    required = declaration.required,
                    "Cannot resolve mapped parameter"
                );
                if declaration.required {
                    return Err(InvokeError::Resolution {
                        name: declaration.name.clone(),
                        uri: declaration.uri.clone(),
                    });
                }
                None
            }
        };
        Ok(value)
    }
}
