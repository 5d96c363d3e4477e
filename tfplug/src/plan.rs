//! Framework-side planning for managed resources
//!
//! [`plan_resource_change`] turns Terraform's proposed new state into the
//! planned state returned from `PlanResourceChange`. It runs before the
//! resource sees anything and needs no I/O.

use crate::schema::{PlanModifierRequest, Schema};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tracing::trace;

pub struct PlanRequest<'a> {
    pub schema: &'a Schema,
    pub prior_state: &'a DynamicValue,
    pub proposed_new_state: &'a DynamicValue,
    pub config: &'a DynamicValue,
}

#[derive(Debug)]
pub struct PlanResult {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn plan_resource_change(request: PlanRequest<'_>) -> PlanResult {
    let PlanRequest {
        schema,
        prior_state,
        proposed_new_state,
        config,
    } = request;

    // Destroy plans are passed through untouched
    if proposed_new_state.is_null() {
        return PlanResult {
            planned_state: proposed_new_state.clone(),
            requires_replace: vec![],
            diagnostics: vec![],
        };
    }

    let mut planned = proposed_new_state.clone();
    let mut diagnostics = Vec::new();

    for attr in schema.write_only_attributes() {
        if let Err(e) = planned.set_null(&AttributePath::new(&attr.name)) {
            diagnostics.push(Diagnostic::error(
                "Error nulling write-only attribute",
                e.to_string(),
            ));
        }
    }

    let is_create = prior_state.is_null();
    if is_create || planned != *prior_state {
        for attr in schema.block.attributes.iter().filter(|a| a.computed) {
            let path = AttributePath::new(&attr.name);
            if config.get_or_null(&path).is_null() {
                trace!(attribute = %path, "marking computed attribute unknown");
                if let Err(e) = planned.mark_unknown(&path) {
                    diagnostics.push(Diagnostic::error(
                        "Error marking computed attribute unknown",
                        e.to_string(),
                    ));
                }
            }
        }
    }

    let mut requires_replace = Vec::new();

    for attr in &schema.block.attributes {
        if attr.plan_modifiers.is_empty() {
            continue;
        }

        let path = AttributePath::new(&attr.name);
        let mut plan_value = planned.get_or_null(&path);

        for modifier in &attr.plan_modifiers {
            let response = modifier.modify(PlanModifierRequest {
                config_value: DynamicValue::new(config.get_or_null(&path)),
                state_value: DynamicValue::new(prior_state.get_or_null(&path)),
                plan_value: DynamicValue::new(plan_value),
                path: path.clone(),
                config: config.clone(),
            });

            plan_value = response.plan_value.value;
            if response.requires_replace && !requires_replace.contains(&path) {
                requires_replace.push(path.clone());
            }
            diagnostics.extend(
                response
                    .diagnostics
                    .into_iter()
                    .map(|d| match d.attribute {
                        Some(_) => d,
                        None => d.with_attribute(path.clone()),
                    }),
            );
        }

        if let Err(e) = planned.set_value(&path, plan_value) {
            diagnostics.push(Diagnostic::error(
                "Error applying plan modifier",
                e.to_string(),
            ));
        }
    }

    PlanResult {
        planned_state: planned,
        requires_replace,
        diagnostics,
    }
}

/// Null every write-only attribute of a non-null state object
pub fn null_write_only_attributes(schema: &Schema, state: &mut DynamicValue) -> crate::Result<()> {
    if !matches!(state.value, Dynamic::Map(_)) {
        return Ok(());
    }
    for attr in schema.write_only_attributes() {
        state.set_null(&AttributePath::new(&attr.name))?;
    }
    Ok(())
}
