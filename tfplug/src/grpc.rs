//! gRPC service implementation
//!
//! This module implements the Terraform Plugin Protocol v6.9 on top of the
//! [`Provider`] and [`Resource`](crate::resource::Resource) traits. Resources
//! are created from their factories for every call and configured with the
//! provider data recorded by `ConfigureProvider`.

use crate::context::Context;
use crate::plan::{null_write_only_attributes, plan_resource_change, PlanRequest};
use crate::proto::{self, ProtoProvider};
use crate::provider::{
    ConfigureProviderRequest, Provider, ProviderMetadataRequest, ProviderSchemaRequest,
    StopProviderRequest, ValidateProviderConfigRequest,
};
use crate::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ReadResourceRequest, ResourceSchemaRequest,
    ResourceWithConfigure, UpdateResourceRequest, ValidateResourceConfigRequest,
};
use crate::schema::{Attribute, Schema};
use crate::types::{
    has_errors, AttributePath, AttributePathStep, ClientCapabilities, Diagnostic,
    DiagnosticSeverity, Dynamic, DynamicValue, ServerCapabilities,
};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tonic::{Request, Response, Status};
use tracing::{debug, info, warn};

type RpcResult<T> = std::result::Result<Response<T>, Status>;

/// Serves a [`Provider`] over the Terraform plugin protocol
pub struct ProviderService<P: Provider> {
    provider: Arc<RwLock<P>>,
    provider_data: RwLock<Option<Arc<dyn Any + Send + Sync>>>,
    root: Context,
}

impl<P: Provider + 'static> ProviderService<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(RwLock::new(provider)),
            provider_data: RwLock::new(None),
            root: Context::new(),
        }
    }

    /// Root context; cancelled by StopProvider
    pub fn context(&self) -> &Context {
        &self.root
    }

    /// Instantiate and configure a resource, or explain why that failed
    async fn resource(
        &self,
        ctx: &Context,
        type_name: &str,
    ) -> std::result::Result<Box<dyn ResourceWithConfigure>, Vec<Diagnostic>> {
        let mut resource = {
            let provider = self.provider.read().await;
            let factories = provider.resources();
            match factories.get(type_name) {
                Some(factory) => factory(),
                None => {
                    return Err(vec![Diagnostic::error(
                        "Resource Type Not Found",
                        format!(
                            "The provider does not support the resource type {:?}.",
                            type_name
                        ),
                    )])
                }
            }
        };

        let provider_data = self.provider_data.read().await.clone();
        let response = resource
            .configure(ctx.clone(), ConfigureResourceRequest { provider_data })
            .await;

        if has_errors(&response.diagnostics) {
            return Err(response.diagnostics);
        }

        Ok(resource)
    }

    async fn resource_and_schema(
        &self,
        ctx: &Context,
        type_name: &str,
    ) -> std::result::Result<(Box<dyn ResourceWithConfigure>, Schema), Vec<Diagnostic>> {
        let resource = self.resource(ctx, type_name).await?;
        let response = resource.schema(ctx.clone(), ResourceSchemaRequest).await;
        if has_errors(&response.diagnostics) {
            return Err(response.diagnostics);
        }
        Ok((resource, response.schema))
    }
}

#[tonic::async_trait]
impl<P: Provider + 'static> ProtoProvider for ProviderService<P> {
    async fn get_metadata(
        &self,
        _request: Request<proto::get_metadata::Request>,
    ) -> RpcResult<proto::get_metadata::Response> {
        let ctx = self.root.for_operation("GetMetadata");
        let provider = self.provider.read().await;
        let metadata = provider.metadata(ctx, ProviderMetadataRequest).await;

        let mut resources: Vec<_> = provider
            .resources()
            .into_keys()
            .map(|type_name| proto::get_metadata::ResourceMetadata { type_name })
            .collect();
        resources.sort_by(|a, b| a.type_name.cmp(&b.type_name));

        Ok(Response::new(proto::get_metadata::Response {
            server_capabilities: Some(server_capabilities_to_proto(
                &metadata.server_capabilities,
            )),
            diagnostics: vec![],
            data_sources: vec![],
            resources,
            functions: vec![],
            ephemeral_resources: vec![],
        }))
    }

    async fn get_provider_schema(
        &self,
        _request: Request<proto::get_provider_schema::Request>,
    ) -> RpcResult<proto::get_provider_schema::Response> {
        let ctx = self.root.for_operation("GetProviderSchema");
        let provider = self.provider.read().await;

        let metadata = provider
            .metadata(ctx.clone(), ProviderMetadataRequest)
            .await;
        let provider_schema = provider.schema(ctx.clone(), ProviderSchemaRequest).await;
        let mut diagnostics = provider_schema.diagnostics;

        let mut resource_schemas = HashMap::new();
        for (type_name, factory) in provider.resources() {
            let resource = factory();
            let response = resource.schema(ctx.clone(), ResourceSchemaRequest).await;
            diagnostics.extend(response.diagnostics);
            resource_schemas.insert(type_name, schema_to_proto(&response.schema));
        }

        debug!(resources = resource_schemas.len(), "returning provider schema");

        Ok(Response::new(proto::get_provider_schema::Response {
            provider: Some(schema_to_proto(&provider_schema.schema)),
            resource_schemas,
            data_source_schemas: HashMap::new(),
            diagnostics: diagnostics_to_proto(diagnostics),
            provider_meta: None,
            server_capabilities: Some(server_capabilities_to_proto(
                &metadata.server_capabilities,
            )),
            functions: HashMap::new(),
            ephemeral_resource_schemas: HashMap::new(),
        }))
    }

    async fn validate_provider_config(
        &self,
        request: Request<proto::validate_provider_config::Request>,
    ) -> RpcResult<proto::validate_provider_config::Response> {
        let ctx = self.root.for_operation("ValidateProviderConfig");
        let req = request.into_inner();
        let config = decode_dynamic_value(req.config.as_ref())?;

        let provider = self.provider.read().await;
        let response = provider
            .validate(ctx, ValidateProviderConfigRequest { config })
            .await;

        Ok(Response::new(proto::validate_provider_config::Response {
            diagnostics: diagnostics_to_proto(response.diagnostics),
        }))
    }

    async fn validate_resource_config(
        &self,
        request: Request<proto::validate_resource_config::Request>,
    ) -> RpcResult<proto::validate_resource_config::Response> {
        let ctx = self.root.for_operation("ValidateResourceConfig");
        let req = request.into_inner();
        debug!(type_name = %req.type_name, "validating resource config");

        let (resource, schema) = match self.resource_and_schema(&ctx, &req.type_name).await {
            Ok(found) => found,
            Err(diagnostics) => return Ok(Response::new(validate_resource_response(diagnostics))),
        };

        let config = decode_dynamic_value(req.config.as_ref())?;
        let client_capabilities = client_capabilities_from_proto(req.client_capabilities);

        let mut diagnostics = validate_config_against_schema(&schema, &config, &client_capabilities);
        if !has_errors(&diagnostics) {
            let response = resource
                .validate(
                    ctx,
                    ValidateResourceConfigRequest {
                        type_name: req.type_name,
                        config,
                        client_capabilities,
                    },
                )
                .await;
            diagnostics.extend(response.diagnostics);
        }

        Ok(Response::new(validate_resource_response(diagnostics)))
    }

    async fn validate_data_resource_config(
        &self,
        request: Request<proto::validate_data_resource_config::Request>,
    ) -> RpcResult<proto::validate_data_resource_config::Response> {
        let req = request.into_inner();
        Ok(Response::new(proto::validate_data_resource_config::Response {
            diagnostics: diagnostics_to_proto(vec![not_supported("Data Source", &req.type_name)]),
        }))
    }

    async fn upgrade_resource_state(
        &self,
        request: Request<proto::upgrade_resource_state::Request>,
    ) -> RpcResult<proto::upgrade_resource_state::Response> {
        let ctx = self.root.for_operation("UpgradeResourceState");
        let req = request.into_inner();
        debug!(type_name = %req.type_name, version = req.version, "upgrading resource state");

        let schema = match self.resource_and_schema(&ctx, &req.type_name).await {
            Ok((_, schema)) => schema,
            Err(diagnostics) => return Ok(Response::new(upgrade_response(None, diagnostics))),
        };

        if req.version > schema.version {
            return Ok(Response::new(upgrade_response(
                None,
                vec![Diagnostic::error(
                    "Unable to Upgrade Resource State",
                    format!(
                        "The stored state version {} is newer than the provider's schema version {}. \
                         Upgrade the provider to work with this state.",
                        req.version, schema.version
                    ),
                )],
            )));
        }

        let raw_json = req
            .raw_state
            .map(|raw| raw.json)
            .filter(|json| !json.is_empty());
        let Some(raw_json) = raw_json else {
            return Ok(Response::new(upgrade_response(
                None,
                vec![Diagnostic::error(
                    "Unable to Read Previously Saved State for UpgradeResourceState",
                    "There was no JSON state to upgrade. Flatmap state is not supported.",
                )],
            )));
        };

        let stored = match DynamicValue::decode_json(&raw_json) {
            Ok(stored) => stored,
            Err(e) => {
                return Ok(Response::new(upgrade_response(
                    None,
                    vec![Diagnostic::error(
                        "Unable to Read Previously Saved State for UpgradeResourceState",
                        e.to_string(),
                    )],
                )))
            }
        };

        let upgraded = encode_dynamic_value(&schema.conform(&stored))?;
        Ok(Response::new(upgrade_response(Some(upgraded), vec![])))
    }

    async fn get_resource_identity_schemas(
        &self,
        _request: Request<proto::get_resource_identity_schemas::Request>,
    ) -> RpcResult<proto::get_resource_identity_schemas::Response> {
        Ok(Response::new(proto::get_resource_identity_schemas::Response {
            identity_schemas: HashMap::new(),
            diagnostics: vec![],
        }))
    }

    async fn upgrade_resource_identity(
        &self,
        request: Request<proto::upgrade_resource_identity::Request>,
    ) -> RpcResult<proto::upgrade_resource_identity::Response> {
        let req = request.into_inner();
        Ok(Response::new(proto::upgrade_resource_identity::Response {
            upgraded_identity: None,
            diagnostics: diagnostics_to_proto(vec![not_supported(
                "Resource Identity",
                &req.type_name,
            )]),
        }))
    }

    async fn configure_provider(
        &self,
        request: Request<proto::configure_provider::Request>,
    ) -> RpcResult<proto::configure_provider::Response> {
        let ctx = self.root.for_operation("ConfigureProvider");
        let req = request.into_inner();
        let config = decode_dynamic_value(req.config.as_ref())?;

        info!(terraform_version = %req.terraform_version, "configuring provider");

        let response = {
            let mut provider = self.provider.write().await;
            provider
                .configure(
                    ctx,
                    ConfigureProviderRequest {
                        terraform_version: req.terraform_version,
                        config,
                        client_capabilities: client_capabilities_from_proto(
                            req.client_capabilities,
                        ),
                    },
                )
                .await
        };

        if !has_errors(&response.diagnostics) {
            *self.provider_data.write().await = response.provider_data;
        }

        Ok(Response::new(proto::configure_provider::Response {
            diagnostics: diagnostics_to_proto(response.diagnostics),
        }))
    }

    async fn read_resource(
        &self,
        request: Request<proto::read_resource::Request>,
    ) -> RpcResult<proto::read_resource::Response> {
        let ctx = self.root.for_operation("ReadResource");
        let req = request.into_inner();
        debug!(type_name = %req.type_name, "reading resource");

        let current_state = decode_dynamic_value(req.current_state.as_ref())?;
        let unchanged = |diagnostics: Vec<Diagnostic>| proto::read_resource::Response {
            new_state: req.current_state.clone(),
            diagnostics: diagnostics_to_proto(diagnostics),
            private: req.private.clone(),
            deferred: None,
            new_identity: None,
        };

        if current_state.is_null() {
            return Ok(Response::new(unchanged(vec![])));
        }

        let (resource, schema) = match self.resource_and_schema(&ctx, &req.type_name).await {
            Ok(found) => found,
            Err(diagnostics) => return Ok(Response::new(unchanged(diagnostics))),
        };

        let response = resource
            .read(
                ctx,
                ReadResourceRequest {
                    type_name: req.type_name.clone(),
                    current_state,
                    private: req.private.clone(),
                    client_capabilities: client_capabilities_from_proto(
                        req.client_capabilities,
                    ),
                },
            )
            .await;

        if has_errors(&response.diagnostics) {
            return Ok(Response::new(unchanged(response.diagnostics)));
        }

        let new_state = match response.new_state {
            Some(state) => {
                let mut state = schema.conform(&state);
                null_write_only_attributes(&schema, &mut state)?;
                state
            }
            None => {
                info!(type_name = %req.type_name, "resource no longer exists, removing from state");
                DynamicValue::null()
            }
        };

        Ok(Response::new(proto::read_resource::Response {
            new_state: Some(encode_dynamic_value(&new_state)?),
            diagnostics: diagnostics_to_proto(response.diagnostics),
            private: response.private,
            deferred: None,
            new_identity: None,
        }))
    }

    async fn plan_resource_change(
        &self,
        request: Request<proto::plan_resource_change::Request>,
    ) -> RpcResult<proto::plan_resource_change::Response> {
        let ctx = self.root.for_operation("PlanResourceChange");
        let req = request.into_inner();
        debug!(type_name = %req.type_name, "planning resource change");

        let prior_state = decode_dynamic_value(req.prior_state.as_ref())?;
        let proposed_new_state = decode_dynamic_value(req.proposed_new_state.as_ref())?;
        let config = decode_dynamic_value(req.config.as_ref())?;

        let schema = match self.resource_and_schema(&ctx, &req.type_name).await {
            Ok((_, schema)) => schema,
            Err(diagnostics) => {
                return Ok(Response::new(proto::plan_resource_change::Response {
                    planned_state: req.proposed_new_state,
                    requires_replace: vec![],
                    planned_private: req.prior_private,
                    diagnostics: diagnostics_to_proto(diagnostics),
                    legacy_type_system: false,
                    deferred: None,
                    planned_identity: None,
                }))
            }
        };

        let result = plan_resource_change(PlanRequest {
            schema: &schema,
            prior_state: &prior_state,
            proposed_new_state: &proposed_new_state,
            config: &config,
        });

        Ok(Response::new(proto::plan_resource_change::Response {
            planned_state: Some(encode_dynamic_value(&result.planned_state)?),
            requires_replace: result
                .requires_replace
                .iter()
                .map(attribute_path_to_proto)
                .collect(),
            planned_private: req.prior_private,
            diagnostics: diagnostics_to_proto(result.diagnostics),
            legacy_type_system: false,
            deferred: None,
            planned_identity: None,
        }))
    }

    async fn apply_resource_change(
        &self,
        request: Request<proto::apply_resource_change::Request>,
    ) -> RpcResult<proto::apply_resource_change::Response> {
        let ctx = self.root.for_operation("ApplyResourceChange");
        let req = request.into_inner();

        let prior_state = decode_dynamic_value(req.prior_state.as_ref())?;
        let planned_state = decode_dynamic_value(req.planned_state.as_ref())?;
        let config = decode_dynamic_value(req.config.as_ref())?;

        let failed = |state: Option<proto::DynamicValue>, diagnostics: Vec<Diagnostic>| {
            proto::apply_resource_change::Response {
                new_state: state,
                private: vec![],
                diagnostics: diagnostics_to_proto(diagnostics),
                legacy_type_system: false,
                new_identity: None,
            }
        };

        let (resource, schema) = match self.resource_and_schema(&ctx, &req.type_name).await {
            Ok(found) => found,
            Err(diagnostics) => return Ok(Response::new(failed(req.prior_state, diagnostics))),
        };

        if planned_state.is_null() {
            info!(type_name = %req.type_name, "deleting resource");
            let response = resource
                .delete(
                    ctx,
                    DeleteResourceRequest {
                        type_name: req.type_name,
                        prior_state,
                        planned_private: req.planned_private,
                    },
                )
                .await;

            let new_state = if has_errors(&response.diagnostics) {
                req.prior_state
            } else {
                None
            };
            return Ok(Response::new(failed(new_state, response.diagnostics)));
        }

        let is_create = prior_state.is_null();
        let (new_state, private, diagnostics) = if is_create {
            info!(type_name = %req.type_name, "creating resource");
            let response = resource
                .create(
                    ctx,
                    CreateResourceRequest {
                        type_name: req.type_name,
                        planned_state,
                        config,
                        planned_private: req.planned_private,
                    },
                )
                .await;
            (response.new_state, response.private, response.diagnostics)
        } else {
            info!(type_name = %req.type_name, "updating resource");
            let response = resource
                .update(
                    ctx,
                    UpdateResourceRequest {
                        type_name: req.type_name,
                        prior_state,
                        planned_state,
                        config,
                        planned_private: req.planned_private,
                    },
                )
                .await;
            (response.new_state, response.private, response.diagnostics)
        };

        if has_errors(&diagnostics) {
            warn!(create = is_create, "apply returned errors");
            let state = if is_create { None } else { req.prior_state };
            return Ok(Response::new(failed(state, diagnostics)));
        }

        let mut new_state = schema.conform(&new_state);
        null_write_only_attributes(&schema, &mut new_state)?;

        Ok(Response::new(proto::apply_resource_change::Response {
            new_state: Some(encode_dynamic_value(&new_state)?),
            private,
            diagnostics: diagnostics_to_proto(diagnostics),
            legacy_type_system: false,
            new_identity: None,
        }))
    }

    async fn import_resource_state(
        &self,
        request: Request<proto::import_resource_state::Request>,
    ) -> RpcResult<proto::import_resource_state::Response> {
        let ctx = self.root.for_operation("ImportResourceState");
        let req = request.into_inner();
        info!(type_name = %req.type_name, id = %req.id, "importing resource");

        let failed = |diagnostics: Vec<Diagnostic>| proto::import_resource_state::Response {
            imported_resources: vec![],
            diagnostics: diagnostics_to_proto(diagnostics),
            deferred: None,
        };

        let (resource, schema) = match self.resource_and_schema(&ctx, &req.type_name).await {
            Ok(found) => found,
            Err(diagnostics) => return Ok(Response::new(failed(diagnostics))),
        };

        let Some(importer) = resource.as_import_state() else {
            return Ok(Response::new(failed(vec![Diagnostic::error(
                "Resource Import Not Implemented",
                format!(
                    "This resource does not support import. Resource type: {}",
                    req.type_name
                ),
            )])));
        };

        let response = importer
            .import_state(
                ctx,
                ImportResourceStateRequest {
                    type_name: req.type_name,
                    id: req.id,
                    client_capabilities: client_capabilities_from_proto(req.client_capabilities),
                },
            )
            .await;

        if has_errors(&response.diagnostics) {
            return Ok(Response::new(failed(response.diagnostics)));
        }

        let mut imported_resources = Vec::with_capacity(response.imported_resources.len());
        for imported in response.imported_resources {
            let mut state = schema.conform(&imported.state);
            null_write_only_attributes(&schema, &mut state)?;
            imported_resources.push(proto::import_resource_state::ImportedResource {
                type_name: imported.type_name,
                state: Some(encode_dynamic_value(&state)?),
                private: imported.private,
                identity: None,
            });
        }

        Ok(Response::new(proto::import_resource_state::Response {
            imported_resources,
            diagnostics: diagnostics_to_proto(response.diagnostics),
            deferred: None,
        }))
    }

    async fn move_resource_state(
        &self,
        request: Request<proto::move_resource_state::Request>,
    ) -> RpcResult<proto::move_resource_state::Response> {
        let req = request.into_inner();
        Ok(Response::new(proto::move_resource_state::Response {
            target_state: None,
            diagnostics: diagnostics_to_proto(vec![Diagnostic::error(
                "Unable to Move Resource State",
                format!(
                    "The resource type {:?} does not support moving state from {:?}.",
                    req.target_type_name, req.source_type_name
                ),
            )]),
            target_private: vec![],
            target_identity: None,
        }))
    }

    async fn read_data_source(
        &self,
        request: Request<proto::read_data_source::Request>,
    ) -> RpcResult<proto::read_data_source::Response> {
        let req = request.into_inner();
        Ok(Response::new(proto::read_data_source::Response {
            state: None,
            diagnostics: diagnostics_to_proto(vec![not_supported("Data Source", &req.type_name)]),
            deferred: None,
        }))
    }

    async fn validate_ephemeral_resource_config(
        &self,
        request: Request<proto::validate_ephemeral_resource_config::Request>,
    ) -> RpcResult<proto::validate_ephemeral_resource_config::Response> {
        let req = request.into_inner();
        Ok(Response::new(
            proto::validate_ephemeral_resource_config::Response {
                diagnostics: diagnostics_to_proto(vec![not_supported(
                    "Ephemeral Resource",
                    &req.type_name,
                )]),
            },
        ))
    }

    async fn open_ephemeral_resource(
        &self,
        request: Request<proto::open_ephemeral_resource::Request>,
    ) -> RpcResult<proto::open_ephemeral_resource::Response> {
        let req = request.into_inner();
        Ok(Response::new(proto::open_ephemeral_resource::Response {
            diagnostics: diagnostics_to_proto(vec![not_supported(
                "Ephemeral Resource",
                &req.type_name,
            )]),
            renew_at: None,
            result: None,
            private: None,
            deferred: None,
        }))
    }

    async fn renew_ephemeral_resource(
        &self,
        request: Request<proto::renew_ephemeral_resource::Request>,
    ) -> RpcResult<proto::renew_ephemeral_resource::Response> {
        let req = request.into_inner();
        Ok(Response::new(proto::renew_ephemeral_resource::Response {
            diagnostics: diagnostics_to_proto(vec![not_supported(
                "Ephemeral Resource",
                &req.type_name,
            )]),
            renew_at: None,
            private: None,
        }))
    }

    async fn close_ephemeral_resource(
        &self,
        request: Request<proto::close_ephemeral_resource::Request>,
    ) -> RpcResult<proto::close_ephemeral_resource::Response> {
        let req = request.into_inner();
        Ok(Response::new(proto::close_ephemeral_resource::Response {
            diagnostics: diagnostics_to_proto(vec![not_supported(
                "Ephemeral Resource",
                &req.type_name,
            )]),
        }))
    }

    async fn get_functions(
        &self,
        _request: Request<proto::get_functions::Request>,
    ) -> RpcResult<proto::get_functions::Response> {
        Ok(Response::new(proto::get_functions::Response {
            functions: HashMap::new(),
            diagnostics: vec![],
        }))
    }

    async fn call_function(
        &self,
        request: Request<proto::call_function::Request>,
    ) -> RpcResult<proto::call_function::Response> {
        let req = request.into_inner();
        Ok(Response::new(proto::call_function::Response {
            result: None,
            error: Some(proto::FunctionError {
                text: format!("Function {:?} not found", req.name),
                function_argument: None,
            }),
        }))
    }

    async fn stop_provider(
        &self,
        _request: Request<proto::stop_provider::Request>,
    ) -> RpcResult<proto::stop_provider::Response> {
        let ctx = self.root.for_operation("StopProvider");
        info!("stop requested, cancelling in-flight operations");
        self.root.cancel();

        let provider = self.provider.read().await;
        let response = provider.stop(ctx, StopProviderRequest).await;

        Ok(Response::new(proto::stop_provider::Response {
            error: response.error.unwrap_or_default(),
        }))
    }
}

fn validate_resource_response(
    diagnostics: Vec<Diagnostic>,
) -> proto::validate_resource_config::Response {
    proto::validate_resource_config::Response {
        diagnostics: diagnostics_to_proto(diagnostics),
    }
}

fn upgrade_response(
    upgraded_state: Option<proto::DynamicValue>,
    diagnostics: Vec<Diagnostic>,
) -> proto::upgrade_resource_state::Response {
    proto::upgrade_resource_state::Response {
        upgraded_state,
        diagnostics: diagnostics_to_proto(diagnostics),
    }
}

fn not_supported(kind: &str, type_name: &str) -> Diagnostic {
    Diagnostic::error(
        format!("{} Type Not Found", kind),
        format!(
            "The provider does not support the {} type {:?}.",
            kind.to_lowercase(),
            type_name
        ),
    )
}

/// Checks the framework can make without the resource: unknown attributes,
/// type mismatches and write-only support
fn validate_config_against_schema(
    schema: &Schema,
    config: &DynamicValue,
    client_capabilities: &ClientCapabilities,
) -> Vec<Diagnostic> {
    let Dynamic::Map(entries) = &config.value else {
        return vec![];
    };

    let mut names: Vec<&String> = entries.keys().collect();
    names.sort();

    let mut diagnostics = Vec::new();
    for name in names {
        let value = &entries[name];
        let path = AttributePath::new(name);

        let Some(attr) = schema.attribute(name) else {
            diagnostics.push(
                Diagnostic::error(
                    "Unsupported argument",
                    format!("An argument named {:?} is not expected here.", name),
                )
                .with_attribute(path),
            );
            continue;
        };

        if !attr.r#type.accepts(value) {
            diagnostics.push(
                Diagnostic::error(
                    "Incorrect attribute value type",
                    format!(
                        "Inappropriate value for attribute {:?}: {} required, got {}.",
                        name,
                        attr.r#type.name(),
                        value.type_name()
                    ),
                )
                .with_attribute(path),
            );
            continue;
        }

        if write_only_not_allowed(attr, value, client_capabilities) {
            diagnostics.push(
                Diagnostic::error(
                    "WriteOnly Attribute Not Allowed",
                    format!(
                        "The resource contains a non-null value for write-only attribute {:?}. \
                         Write-only attributes are only supported in Terraform 1.11 and later.",
                        name
                    ),
                )
                .with_attribute(path),
            );
        }
    }

    diagnostics
}

fn write_only_not_allowed(
    attr: &Attribute,
    value: &Dynamic,
    client_capabilities: &ClientCapabilities,
) -> bool {
    attr.write_only && !value.is_null() && !client_capabilities.write_only_attributes_allowed
}

/// Terraform sends msgpack for everything except legacy stored state
pub fn decode_dynamic_value(
    value: Option<&proto::DynamicValue>,
) -> std::result::Result<DynamicValue, Status> {
    let Some(value) = value else {
        return Ok(DynamicValue::null());
    };

    let decoded = if !value.msgpack.is_empty() {
        DynamicValue::decode_msgpack(&value.msgpack)?
    } else if !value.json.is_empty() {
        DynamicValue::decode_json(&value.json)?
    } else {
        DynamicValue::null()
    };
    Ok(decoded)
}

pub fn encode_dynamic_value(
    value: &DynamicValue,
) -> std::result::Result<proto::DynamicValue, Status> {
    Ok(proto::DynamicValue {
        msgpack: value.encode_msgpack()?,
        json: vec![],
    })
}

pub fn diagnostics_to_proto(diagnostics: Vec<Diagnostic>) -> Vec<proto::Diagnostic> {
    diagnostics
        .into_iter()
        .map(|d| {
            let severity = match d.severity {
                DiagnosticSeverity::Invalid => proto::diagnostic::Severity::Invalid,
                DiagnosticSeverity::Error => proto::diagnostic::Severity::Error,
                DiagnosticSeverity::Warning => proto::diagnostic::Severity::Warning,
            };
            proto::Diagnostic {
                severity: severity as i32,
                summary: d.summary,
                detail: d.detail,
                attribute: d.attribute.as_ref().map(attribute_path_to_proto),
            }
        })
        .collect()
}

pub fn attribute_path_to_proto(path: &AttributePath) -> proto::AttributePath {
    use proto::attribute_path::{step::Selector, Step};

    proto::AttributePath {
        steps: path
            .steps
            .iter()
            .map(|step| Step {
                selector: Some(match step {
                    AttributePathStep::AttributeName(name) => Selector::AttributeName(name.clone()),
                    AttributePathStep::ElementKeyString(key) => {
                        Selector::ElementKeyString(key.clone())
                    }
                    AttributePathStep::ElementKeyInt(idx) => Selector::ElementKeyInt(*idx),
                }),
            })
            .collect(),
    }
}

pub fn schema_to_proto(schema: &Schema) -> proto::Schema {
    let block = &schema.block;
    proto::Schema {
        version: schema.version,
        block: Some(proto::schema::Block {
            version: block.version,
            attributes: block.attributes.iter().map(attribute_to_proto).collect(),
            block_types: vec![],
            description: block.description.clone(),
            description_kind: string_kind_to_proto(block.description_kind) as i32,
            deprecated: block.deprecated,
        }),
    }
}

fn attribute_to_proto(attr: &Attribute) -> proto::schema::Attribute {
    proto::schema::Attribute {
        name: attr.name.clone(),
        r#type: attr.r#type.to_json_bytes(),
        nested_type: None,
        description: attr.description.clone(),
        required: attr.required,
        optional: attr.optional,
        computed: attr.computed,
        sensitive: attr.sensitive,
        description_kind: proto::StringKind::Plain as i32,
        deprecated: attr.deprecated,
        write_only: attr.write_only,
    }
}

fn string_kind_to_proto(kind: crate::schema::StringKind) -> proto::StringKind {
    match kind {
        crate::schema::StringKind::Plain => proto::StringKind::Plain,
        crate::schema::StringKind::Markdown => proto::StringKind::Markdown,
    }
}

fn server_capabilities_to_proto(capabilities: &ServerCapabilities) -> proto::ServerCapabilities {
    proto::ServerCapabilities {
        plan_destroy: capabilities.plan_destroy,
        get_provider_schema_optional: capabilities.get_provider_schema_optional,
        move_resource_state: capabilities.move_resource_state,
    }
}

fn client_capabilities_from_proto(
    capabilities: Option<proto::ClientCapabilities>,
) -> ClientCapabilities {
    capabilities
        .map(|c| ClientCapabilities {
            deferral_allowed: c.deferral_allowed,
            write_only_attributes_allowed: c.write_only_attributes_allowed,
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeBuilder, AttributeType, SchemaBuilder};

    fn schema() -> Schema {
        SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("token", AttributeType::String)
                    .optional()
                    .write_only()
                    .build(),
            )
            .build()
    }

    fn config(pairs: &[(&str, Dynamic)]) -> DynamicValue {
        DynamicValue::new(Dynamic::Map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        ))
    }

    #[test]
    fn missing_dynamic_value_decodes_as_null() {
        assert!(decode_dynamic_value(None).unwrap().is_null());
        assert!(decode_dynamic_value(Some(&proto::DynamicValue::default()))
            .unwrap()
            .is_null());
    }

    #[test]
    fn malformed_msgpack_is_invalid_argument() {
        let value = proto::DynamicValue {
            msgpack: vec![0xc1],
            json: vec![],
        };
        let status = decode_dynamic_value(Some(&value)).unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[test]
    fn unsupported_argument_is_rejected() {
        let diagnostics = validate_config_against_schema(
            &schema(),
            &config(&[("nope", Dynamic::Null)]),
            &ClientCapabilities::default(),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Unsupported argument");
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let diagnostics = validate_config_against_schema(
            &schema(),
            &config(&[("token", Dynamic::Bool(true))]),
            &ClientCapabilities {
                write_only_attributes_allowed: true,
                ..Default::default()
            },
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Incorrect attribute value type");
    }

    #[test]
    fn write_only_requires_client_support() {
        let value = config(&[("token", Dynamic::String("s".to_string()))]);

        let rejected =
            validate_config_against_schema(&schema(), &value, &ClientCapabilities::default());
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].summary, "WriteOnly Attribute Not Allowed");

        let accepted = validate_config_against_schema(
            &schema(),
            &value,
            &ClientCapabilities {
                write_only_attributes_allowed: true,
                ..Default::default()
            },
        );
        assert!(accepted.is_empty());

        let null_value = config(&[("token", Dynamic::Null)]);
        assert!(
            validate_config_against_schema(&schema(), &null_value, &ClientCapabilities::default())
                .is_empty()
        );
    }

    #[test]
    fn schema_conversion_carries_write_only_flag() {
        let converted = schema_to_proto(&schema());
        let block = converted.block.unwrap();
        let token = block
            .attributes
            .iter()
            .find(|a| a.name == "token")
            .unwrap();
        assert!(token.write_only);
        assert!(token.optional);
        assert_eq!(token.r#type, b"\"string\"");
    }

    #[test]
    fn diagnostic_conversion_keeps_attribute_path() {
        let converted = diagnostics_to_proto(vec![Diagnostic::warning("careful", "detail")
            .with_attribute(AttributePath::new("items").index(2))]);

        assert_eq!(converted.len(), 1);
        assert_eq!(
            converted[0].severity,
            proto::diagnostic::Severity::Warning as i32
        );
        let steps = &converted[0].attribute.as_ref().unwrap().steps;
        assert_eq!(steps.len(), 2);
        assert_eq!(
            steps[1].selector,
            Some(proto::attribute_path::step::Selector::ElementKeyInt(2))
        );
    }
}
