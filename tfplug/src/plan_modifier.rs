//! Built-in attribute plan modifiers

use crate::schema::{PlanModifier, PlanModifierRequest, PlanModifierResponse};

/// A plan modifier that uses the current state value when the planned value is unknown
///
/// Attach this to computed attributes that never change after creation, such as
/// identifiers, so updates do not show them as "known after apply".
pub struct UseStateForUnknown;

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "Once set, the value of this attribute in state will not change.".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        // Nothing to carry over on create, and known plans and unknown config
        // are left alone
        if request.state_value.is_null()
            || !request.plan_value.is_unknown()
            || request.config_value.is_unknown()
        {
            return PlanModifierResponse::unchanged(request.plan_value);
        }

        PlanModifierResponse::unchanged(request.state_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributePath, Dynamic, DynamicValue};

    fn request(state: Dynamic, plan: Dynamic, config: Dynamic) -> PlanModifierRequest {
        PlanModifierRequest {
            config_value: DynamicValue::new(config),
            state_value: DynamicValue::new(state),
            plan_value: DynamicValue::new(plan),
            path: AttributePath::new("id"),
            config: DynamicValue::object(),
        }
    }

    #[test]
    fn use_state_for_unknown_copies_prior_value() {
        let response = UseStateForUnknown.modify(request(
            Dynamic::String("abc".to_string()),
            Dynamic::Unknown,
            Dynamic::Null,
        ));

        assert_eq!(
            response.plan_value.value,
            Dynamic::String("abc".to_string())
        );
        assert!(!response.requires_replace);
        assert!(response.diagnostics.is_empty());
    }

    #[test]
    fn use_state_for_unknown_leaves_create_unknown() {
        let response =
            UseStateForUnknown.modify(request(Dynamic::Null, Dynamic::Unknown, Dynamic::Null));

        assert!(response.plan_value.is_unknown());
    }

    #[test]
    fn use_state_for_unknown_keeps_known_plan() {
        let response = UseStateForUnknown.modify(request(
            Dynamic::String("old".to_string()),
            Dynamic::String("new".to_string()),
            Dynamic::String("new".to_string()),
        ));

        assert_eq!(
            response.plan_value.value,
            Dynamic::String("new".to_string())
        );
    }

    #[test]
    fn use_state_for_unknown_respects_unknown_config() {
        let response = UseStateForUnknown.modify(request(
            Dynamic::String("old".to_string()),
            Dynamic::Unknown,
            Dynamic::Unknown,
        ));

        assert!(response.plan_value.is_unknown());
    }
}
