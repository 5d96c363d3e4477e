#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::super::*;
    use std::any::Any;
    use std::sync::Arc;
    use tfplug::context::Context;
    use tfplug::resource::{
        ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
        ImportResourceStateRequest, ReadResourceRequest, Resource, ResourceMetadataRequest,
        ResourceSchemaRequest, ResourceWithConfigure, ResourceWithImportState,
        UpdateResourceRequest,
    };
    use tfplug::schema::{PlanModifier, PlanModifierRequest};
    use tfplug::types::{AttributePath, ClientCapabilities, Dynamic, DynamicValue, Value};

    fn known(s: &str) -> Value<String> {
        Value::Known(s.to_string())
    }

    fn record(id: Value<String>, setter: Value<String>, value: Value<String>) -> DynamicValue {
        StringReuseModel {
            id,
            set_if_not_null_or_empty: setter,
            value,
        }
        .to_dynamic()
    }

    fn config(setter: Value<String>) -> DynamicValue {
        record(Value::Null, setter, Value::Null)
    }

    fn model(state: &DynamicValue) -> StringReuseModel {
        StringReuseModel::from_dynamic(state).unwrap()
    }

    fn modifier_request(
        prior: Value<String>,
        setter: Value<String>,
        plan: Dynamic,
    ) -> PlanModifierRequest {
        PlanModifierRequest {
            config_value: DynamicValue::null(),
            state_value: DynamicValue::new(prior.into_dynamic()),
            plan_value: DynamicValue::new(plan),
            path: AttributePath::new(ATTR_VALUE),
            config: config(setter),
        }
    }

    #[test]
    fn resolve_uses_trimmed_setter_regardless_of_prior() {
        for prior in [Value::Null, Value::Unknown, known("old")] {
            assert_eq!(resolve_value(&prior, &known("  new \t")), known("new"));
        }
    }

    #[test]
    fn resolve_keeps_prior_for_blank_or_absent_setter() {
        let prior = known("kept");
        for setter in [Value::Null, Value::Unknown, known(""), known("   ")] {
            assert_eq!(resolve_value(&prior, &setter), known("kept"));
        }
    }

    #[test]
    fn resolve_without_prior_or_setter_is_unknown() {
        assert_eq!(resolve_value(&Value::Null, &Value::Null), Value::Unknown);
        assert_eq!(resolve_value(&Value::Unknown, &known(" ")), Value::Unknown);
    }

    #[test]
    fn resolve_is_idempotent() {
        let first = resolve_value(&Value::Null, &known("same"));
        let second = resolve_value(&first, &known("same"));
        assert_eq!(first, second);
    }

    #[test]
    fn modifier_plans_setter_value() {
        let response = ValueFromSetterOrState.modify(modifier_request(
            known("old"),
            known(" updated "),
            Dynamic::String("old".to_string()),
        ));

        assert_eq!(
            response.plan_value.value,
            Dynamic::String("updated".to_string())
        );
        assert!(!response.requires_replace);
        assert!(response.diagnostics.is_empty());
    }

    #[test]
    fn modifier_keeps_state_when_setter_absent() {
        let response = ValueFromSetterOrState.modify(modifier_request(
            known("updated"),
            Value::Null,
            Dynamic::Unknown,
        ));

        assert_eq!(
            response.plan_value.value,
            Dynamic::String("updated".to_string())
        );
    }

    #[test]
    fn modifier_leaves_create_plan_unknown() {
        let response =
            ValueFromSetterOrState.modify(modifier_request(Value::Null, Value::Null, Dynamic::Unknown));

        assert!(response.plan_value.is_unknown());
    }

    #[test]
    fn modifier_leaves_null_state_null_without_setter() {
        let response =
            ValueFromSetterOrState.modify(modifier_request(Value::Null, known(""), Dynamic::Null));

        assert!(response.plan_value.is_null());
    }

    #[test]
    fn modifier_plans_unknown_for_unknown_setter() {
        let response = ValueFromSetterOrState.modify(modifier_request(
            known("old"),
            Value::Unknown,
            Dynamic::String("old".to_string()),
        ));

        assert!(response.plan_value.is_unknown());
    }

    #[test]
    fn model_round_trips_through_dynamic_value() {
        let original = StringReuseModel {
            id: known("id-1"),
            set_if_not_null_or_empty: Value::Null,
            value: known("v"),
        };

        assert_eq!(model(&original.to_dynamic()), original);
    }

    #[test]
    fn model_rejects_non_string_attribute() {
        let mut state = record(known("id-1"), Value::Null, Value::Null);
        state
            .set_value(&AttributePath::new(ATTR_VALUE), Dynamic::Number(1.0))
            .unwrap();

        let diag = StringReuseModel::from_dynamic(&state).unwrap_err();
        assert!(diag.is_error());
        assert_eq!(diag.attribute, Some(AttributePath::new(ATTR_VALUE)));
    }

    #[test]
    fn resource_type_name() {
        let resource = StringReuseResource::new();
        assert_eq!(resource.type_name(), "reusevalue_string");
    }

    #[tokio::test]
    async fn resource_metadata() {
        let resource = StringReuseResource::new();
        let response = resource
            .metadata(Context::new(), ResourceMetadataRequest)
            .await;

        assert_eq!(response.type_name, "reusevalue_string");
    }

    #[tokio::test]
    async fn resource_schema() {
        let resource = StringReuseResource::new();
        let response = resource.schema(Context::new(), ResourceSchemaRequest).await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(response.schema.version, 0);

        let attrs = &response.schema.block.attributes;
        assert_eq!(attrs.len(), 3);
        assert!(attrs
            .iter()
            .any(|a| a.name == "id" && a.computed && a.plan_modifiers.len() == 1));
        assert!(attrs.iter().any(|a| a.name == "set_if_not_null_or_empty"
            && a.optional
            && a.write_only
            && !a.computed));
        assert!(attrs
            .iter()
            .any(|a| a.name == "value" && a.computed && !a.optional));
    }

    #[tokio::test]
    async fn create_assigns_id_and_clears_setter() {
        let resource = StringReuseResource::new();
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    planned_state: record(Value::Unknown, Value::Null, known("initial")),
                    config: config(known(" initial ")),
                    planned_private: vec![],
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let created = model(&response.new_state);
        let Value::Known(id) = &created.id else {
            panic!("id should be known after create");
        };
        assert!(chrono::DateTime::parse_from_rfc3339(id).is_ok());
        assert!(id.ends_with('Z'));
        assert_eq!(created.set_if_not_null_or_empty, Value::Null);
        assert_eq!(created.value, known("initial"));
    }

    #[tokio::test]
    async fn create_without_setter_stores_null_value() {
        let resource = StringReuseResource::new();
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    planned_state: record(Value::Unknown, Value::Null, Value::Unknown),
                    config: config(Value::Null),
                    planned_private: vec![],
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let created = model(&response.new_state);
        assert!(created.id.is_known());
        assert_eq!(created.value, Value::Null);
    }

    #[tokio::test]
    async fn read_clears_setter_and_keeps_record() {
        let resource = StringReuseResource::new();
        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    current_state: record(known("id-1"), known("leftover"), known("v")),
                    private: vec![],
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let read = model(&response.new_state.unwrap());
        assert_eq!(read.id, known("id-1"));
        assert_eq!(read.set_if_not_null_or_empty, Value::Null);
        assert_eq!(read.value, known("v"));
    }

    #[tokio::test]
    async fn read_reports_unreadable_state() {
        let resource = StringReuseResource::new();
        let mut current_state = record(known("id-1"), Value::Null, Value::Null);
        current_state
            .set_value(&AttributePath::new(ATTR_ID), Dynamic::Bool(true))
            .unwrap();

        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    current_state: current_state.clone(),
                    private: vec![],
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.new_state, Some(current_state));
    }

    async fn update(prior_value: Value<String>, setter: Value<String>) -> StringReuseModel {
        let resource = StringReuseResource::new();
        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    prior_state: record(known("id-1"), Value::Null, prior_value),
                    planned_state: record(known("id-1"), Value::Null, Value::Unknown),
                    config: config(setter),
                    planned_private: vec![],
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        model(&response.new_state)
    }

    #[tokio::test]
    async fn update_with_setter_replaces_value() {
        let updated = update(known("initial"), known("updated")).await;

        assert_eq!(updated.id, known("id-1"));
        assert_eq!(updated.value, known("updated"));
        assert_eq!(updated.set_if_not_null_or_empty, Value::Null);
    }

    #[tokio::test]
    async fn update_without_setter_keeps_value() {
        let updated = update(known("updated"), Value::Null).await;
        assert_eq!(updated.value, known("updated"));

        let updated = update(known("updated"), known("   ")).await;
        assert_eq!(updated.value, known("updated"));
    }

    #[tokio::test]
    async fn update_reports_unreadable_prior_state() {
        let resource = StringReuseResource::new();
        let mut prior_state = record(known("id-1"), Value::Null, Value::Null);
        prior_state
            .set_value(&AttributePath::new(ATTR_VALUE), Dynamic::Number(7.0))
            .unwrap();

        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    prior_state: prior_state.clone(),
                    planned_state: record(known("id-1"), Value::Null, Value::Unknown),
                    config: config(known("next")),
                    planned_private: vec![],
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].is_error());
        assert_eq!(
            response.diagnostics[0].attribute,
            Some(AttributePath::new(ATTR_VALUE))
        );
        assert_eq!(response.new_state, prior_state);
    }

    #[tokio::test]
    async fn delete_has_no_side_effects() {
        let resource = StringReuseResource::new();
        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    prior_state: record(known("id-1"), Value::Null, known("v")),
                    planned_private: vec![],
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn import_passes_id_through() {
        let resource = StringReuseResource::new();
        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: TYPE_NAME.to_string(),
                    id: "2025-01-02T03:04:05.000000006Z".to_string(),
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(response.imported_resources.len(), 1);
        let imported = model(&response.imported_resources[0].state);
        assert_eq!(imported.id, known("2025-01-02T03:04:05.000000006Z"));
        assert_eq!(imported.value, Value::Null);
        assert!(resource.as_import_state().is_some());
    }

    #[tokio::test]
    async fn configure_accepts_provider_data() {
        let mut resource = StringReuseResource::new();
        let data: Arc<dyn Any + Send + Sync> = Arc::new(crate::ReuseValueProviderData {
            provider_version: "test".to_string(),
            terraform_version: "1.11.0".to_string(),
        });

        let response = resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(data),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(resource.provider_data().unwrap().terraform_version, "1.11.0");
    }

    #[tokio::test]
    async fn configure_without_provider_data_is_a_no_op() {
        let mut resource = StringReuseResource::new();
        let response = resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert!(resource.provider_data().is_none());
    }

    #[tokio::test]
    async fn configure_rejects_unexpected_provider_data() {
        let mut resource = StringReuseResource::new();
        let data: Arc<dyn Any + Send + Sync> = Arc::new("not provider data".to_string());

        let response = resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(data),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(
            response.diagnostics[0].summary,
            "Unexpected Resource Configure Type"
        );
    }
}
