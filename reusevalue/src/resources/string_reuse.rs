//! String reuse resource implementation
//!
//! `value` keeps whatever it last resolved to until a non-blank
//! `set_if_not_null_or_empty` is configured. The setter is write-only, so it
//! is never persisted and has to be supplied again for every change.

use crate::ReuseValueProviderData;
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::import::import_state_passthrough_id;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{
    AttributeBuilder, AttributeType, PlanModifier, PlanModifierRequest, PlanModifierResponse,
    SchemaBuilder,
};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue, Value};
use tracing::{debug, trace};

pub const TYPE_NAME: &str = "reusevalue_string";

pub const ATTR_ID: &str = "id";
pub const ATTR_SETTER: &str = "set_if_not_null_or_empty";
pub const ATTR_VALUE: &str = "value";

/// Resolve the planned `value` from its prior state and the configured setter
///
/// A setter that is known and non-blank after trimming wins. Otherwise a known
/// prior value is kept, and with neither the result stays unknown.
pub fn resolve_value(prior: &Value<String>, setter: &Value<String>) -> Value<String> {
    if let Value::Known(raw) = setter {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return Value::Known(trimmed.to_string());
        }
    }

    match prior {
        Value::Known(prior) => Value::Known(prior.clone()),
        _ => Value::Unknown,
    }
}

/// Typed view of the resource object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringReuseModel {
    pub id: Value<String>,
    pub set_if_not_null_or_empty: Value<String>,
    pub value: Value<String>,
}

impl StringReuseModel {
    pub fn from_dynamic(state: &DynamicValue) -> Result<Self, Diagnostic> {
        let read = |name: &str| {
            state
                .get_string_value(&AttributePath::new(name))
                .map_err(|e| {
                    Diagnostic::error(
                        "Unable to Read Resource Data",
                        format!("Attribute {:?}: {}", name, e),
                    )
                    .with_attribute(AttributePath::new(name))
                })
        };

        Ok(Self {
            id: read(ATTR_ID)?,
            set_if_not_null_or_empty: read(ATTR_SETTER)?,
            value: read(ATTR_VALUE)?,
        })
    }

    /// Every attribute is present in the object, null when absent
    pub fn to_dynamic(&self) -> DynamicValue {
        DynamicValue::new(Dynamic::Map(
            [
                (ATTR_ID, &self.id),
                (ATTR_SETTER, &self.set_if_not_null_or_empty),
                (ATTR_VALUE, &self.value),
            ]
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.clone().into_dynamic()))
            .collect(),
        ))
    }
}

/// Plans `value` from the configured setter, falling back to the prior state
pub struct ValueFromSetterOrState;

impl PlanModifier for ValueFromSetterOrState {
    fn description(&self) -> String {
        "Sets value from set_if_not_null_or_empty when it is not blank; otherwise keeps the value from state."
            .to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let setter = match request
            .config
            .get_string_value(&AttributePath::new(ATTR_SETTER))
        {
            Ok(setter) => setter,
            Err(e) => {
                return PlanModifierResponse {
                    plan_value: request.plan_value,
                    requires_replace: false,
                    diagnostics: vec![Diagnostic::error(
                        "Unable to Read Configuration",
                        format!("Attribute {:?}: {}", ATTR_SETTER, e),
                    )],
                }
            }
        };

        // The outcome depends on a setter Terraform cannot resolve yet
        if setter.is_unknown() {
            return PlanModifierResponse::unchanged(DynamicValue::unknown());
        }

        let prior = Value::<String>::from_dynamic(&request.state_value.value).unwrap_or_default();

        match resolve_value(&prior, &setter) {
            // Nothing to resolve from: leave the framework's plan value alone
            Value::Unknown | Value::Null => PlanModifierResponse::unchanged(request.plan_value),
            resolved => {
                debug!(path = %request.path, "planned value from setter or state");
                PlanModifierResponse::unchanged(DynamicValue::new(resolved.into_dynamic()))
            }
        }
    }
}

#[derive(Default)]
pub struct StringReuseResource {
    provider_data: Option<ReuseValueProviderData>,
}

impl StringReuseResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider_data(&self) -> Option<&ReuseValueProviderData> {
        self.provider_data.as_ref()
    }

    fn new_id() -> String {
        chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
    }

    fn read_setter(config: &DynamicValue) -> Result<Value<String>, Diagnostic> {
        config
            .get_string_value(&AttributePath::new(ATTR_SETTER))
            .map_err(|e| {
                Diagnostic::error(
                    "Unable to Read Configuration",
                    format!("Attribute {:?}: {}", ATTR_SETTER, e),
                )
            })
    }
}

#[async_trait]
impl Resource for StringReuseResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description(
                "Keeps a string value across applies. The value changes only when \
                 set_if_not_null_or_empty is given a non-blank string.",
            )
            .attribute(
                AttributeBuilder::new(ATTR_ID, AttributeType::String)
                    .description("Identifier assigned at creation")
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(ATTR_SETTER, AttributeType::String)
                    .description(
                        "When set to a non-blank string, its trimmed content becomes value. \
                         Never stored in state.",
                    )
                    .optional()
                    .write_only()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(ATTR_VALUE, AttributeType::String)
                    .description("The last non-blank value of set_if_not_null_or_empty")
                    .computed()
                    .plan_modifier(Box::new(ValueFromSetterOrState))
                    .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn create(
        &self,
        _ctx: Context,
        request: CreateResourceRequest,
    ) -> CreateResourceResponse {
        let setter = match Self::read_setter(&request.config) {
            Ok(setter) => setter,
            Err(diag) => {
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics: vec![diag],
                }
            }
        };

        // No backend can supply a value later, so unresolved becomes null
        let model = StringReuseModel {
            id: Value::Known(Self::new_id()),
            set_if_not_null_or_empty: Value::Null,
            value: resolve_value(&Value::Null, &setter).known_or_null(),
        };

        trace!(id = ?model.id, "created a resource");

        CreateResourceResponse {
            new_state: model.to_dynamic(),
            private: request.planned_private,
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut model = match StringReuseModel::from_dynamic(&request.current_state) {
            Ok(model) => model,
            Err(diag) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![diag],
                    private: request.private,
                }
            }
        };

        model.set_if_not_null_or_empty = Value::Null;

        ReadResourceResponse {
            new_state: Some(model.to_dynamic()),
            diagnostics: vec![],
            private: request.private,
        }
    }

    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        let failed = |diag: Diagnostic, prior_state: DynamicValue| UpdateResourceResponse {
            new_state: prior_state,
            private: vec![],
            diagnostics: vec![diag],
        };

        let prior = match StringReuseModel::from_dynamic(&request.prior_state) {
            Ok(prior) => prior,
            Err(diag) => return failed(diag, request.prior_state),
        };
        let setter = match Self::read_setter(&request.config) {
            Ok(setter) => setter,
            Err(diag) => return failed(diag, request.prior_state),
        };

        let model = StringReuseModel {
            id: prior.id,
            set_if_not_null_or_empty: Value::Null,
            value: resolve_value(&prior.value, &setter).known_or_null(),
        };

        trace!(id = ?model.id, "updated a resource");

        UpdateResourceResponse {
            new_state: model.to_dynamic(),
            private: request.planned_private,
            diagnostics: vec![],
        }
    }

    async fn delete(
        &self,
        _ctx: Context,
        _request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        trace!("deleted a resource");
        DeleteResourceResponse {
            diagnostics: vec![],
        }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for StringReuseResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        // Not configured yet, e.g. during schema or validation calls
        let Some(data) = request.provider_data else {
            return ConfigureResourceResponse { diagnostics };
        };

        match data.downcast_ref::<ReuseValueProviderData>() {
            Some(provider_data) => self.provider_data = Some(provider_data.clone()),
            None => diagnostics.push(Diagnostic::error(
                "Unexpected Resource Configure Type",
                "Expected ReuseValueProviderData. Please report this issue to the provider developers.",
            )),
        }

        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for StringReuseResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse::default();
        import_state_passthrough_id(&ctx, AttributePath::new(ATTR_ID), &request, &mut response);
        response
    }
}

#[cfg(test)]
#[path = "./string_reuse_test.rs"]
mod string_reuse_test;
