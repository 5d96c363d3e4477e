pub mod resources;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, Provider, ProviderMetadataRequest,
    ProviderMetadataResponse, ProviderSchemaRequest, ProviderSchemaResponse, ResourceFactory,
    StopProviderRequest, StopProviderResponse, ValidateProviderConfigRequest,
    ValidateProviderConfigResponse,
};
use tfplug::resource::ResourceWithConfigure;
use tfplug::schema::SchemaBuilder;
use tfplug::types::ServerCapabilities;
use tracing::info;

pub const PROVIDER_TYPE_NAME: &str = "reusevalue";

/// Provider data passed to resources
#[derive(Debug, Clone)]
pub struct ReuseValueProviderData {
    pub provider_version: String,
    pub terraform_version: String,
}

pub struct ReuseValueProvider {
    version: String,
}

impl ReuseValueProvider {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl Default for ReuseValueProvider {
    fn default() -> Self {
        Self::new("dev")
    }
}

#[async_trait]
impl Provider for ReuseValueProvider {
    fn type_name(&self) -> &str {
        PROVIDER_TYPE_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
            server_capabilities: ServerCapabilities::default(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: SchemaBuilder::new()
                .description("Stores string values that are only replaced by non-blank input.")
                .build(),
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        info!(
            provider_version = %self.version,
            terraform_version = %request.terraform_version,
            "configured provider"
        );

        let data = ReuseValueProviderData {
            provider_version: self.version.clone(),
            terraform_version: request.terraform_version,
        };

        ConfigureProviderResponse {
            diagnostics: vec![],
            provider_data: Some(Arc::new(data)),
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        ValidateProviderConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn stop(&self, _ctx: Context, _request: StopProviderRequest) -> StopProviderResponse {
        StopProviderResponse { error: None }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        factories.insert(
            resources::string_reuse::TYPE_NAME.to_string(),
            Box::new(|| {
                Box::new(resources::StringReuseResource::new()) as Box<dyn ResourceWithConfigure>
            }),
        );
        factories
    }
}
