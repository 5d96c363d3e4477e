//! Schema types and builders for tfplug
//!
//! This module provides the schema system for defining provider and resource
//! schemas: attribute types, attribute flags (including write-only) and the
//! plan modifier hook attached to attributes.

use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::collections::BTreeMap;

/// AttributeType defines the type system for Terraform attributes
/// This must match Terraform's type system exactly
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number, // Always f64
    Bool,
    List(Box<AttributeType>),                // Ordered, allows duplicates
    Set(Box<AttributeType>),                 // Unordered, no duplicates
    Map(Box<AttributeType>),                 // String keys only
    Object(BTreeMap<String, AttributeType>), // Fixed structure
}

impl AttributeType {
    /// JSON encoding of the type as Terraform expects it in schemas
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::{json, Value};

        match self {
            AttributeType::String => json!("string"),
            AttributeType::Number => json!("number"),
            AttributeType::Bool => json!("bool"),
            AttributeType::List(inner) => json!(["list", inner.to_json()]),
            AttributeType::Set(inner) => json!(["set", inner.to_json()]),
            AttributeType::Map(inner) => json!(["map", inner.to_json()]),
            AttributeType::Object(fields) => {
                let fields: serde_json::Map<String, Value> = fields
                    .iter()
                    .map(|(name, ty)| (name.clone(), ty.to_json()))
                    .collect();
                json!(["object", fields])
            }
        }
    }

    pub fn to_json_bytes(&self) -> Vec<u8> {
        self.to_json().to_string().into_bytes()
    }

    /// Whether a configuration value conforms to this type
    /// Null and unknown conform to every type
    pub fn accepts(&self, value: &Dynamic) -> bool {
        match (self, value) {
            (_, Dynamic::Null) | (_, Dynamic::Unknown) => true,
            (AttributeType::String, Dynamic::String(_)) => true,
            (AttributeType::Number, Dynamic::Number(_)) => true,
            (AttributeType::Bool, Dynamic::Bool(_)) => true,
            (AttributeType::List(inner), Dynamic::List(items))
            | (AttributeType::Set(inner), Dynamic::List(items)) => {
                items.iter().all(|item| inner.accepts(item))
            }
            (AttributeType::Map(inner), Dynamic::Map(entries)) => {
                entries.values().all(|entry| inner.accepts(entry))
            }
            (AttributeType::Object(fields), Dynamic::Map(entries)) => {
                entries.iter().all(|(name, entry)| {
                    fields.get(name).is_some_and(|ty| ty.accepts(entry))
                })
            }
            _ => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Number => "number",
            AttributeType::Bool => "bool",
            AttributeType::List(_) => "list",
            AttributeType::Set(_) => "set",
            AttributeType::Map(_) => "map",
            AttributeType::Object(_) => "object",
        }
    }
}

/// Schema is returned by providers and resources
/// Version is used for state migration
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64, // Increment when schema changes require migration
    pub block: Block, // Root block containing all attributes
}

impl Schema {
    /// Schema with no attributes, used by providers without configuration
    pub fn empty() -> Self {
        SchemaBuilder::new().build()
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.block.attributes.iter().find(|a| a.name == name)
    }

    pub fn write_only_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.block.attributes.iter().filter(|a| a.write_only)
    }

    /// Reshape an object to exactly this schema's attributes
    /// Missing attributes become null and unknown ones are dropped; null stays null
    pub fn conform(&self, value: &DynamicValue) -> DynamicValue {
        let Dynamic::Map(entries) = &value.value else {
            return value.clone();
        };

        let conformed = self
            .block
            .attributes
            .iter()
            .map(|attr| {
                let entry = entries.get(&attr.name).cloned().unwrap_or(Dynamic::Null);
                (attr.name.clone(), entry)
            })
            .collect();

        DynamicValue::new(Dynamic::Map(conformed))
    }
}

/// Block represents a configuration block
#[derive(Debug, Clone)]
pub struct Block {
    pub version: i64,
    pub attributes: Vec<Attribute>,
    pub description: String,
    pub description_kind: StringKind,
    pub deprecated: bool,
}

/// Attribute represents a single configuration attribute
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    /// Value is only available in configuration; always null in plan and state
    pub write_only: bool,
    pub plan_modifiers: Vec<Box<dyn PlanModifier>>,
    pub deprecated: bool,
}

// Manual Debug implementation since modifiers don't implement Debug
impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("description", &self.description)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field("write_only", &self.write_only)
            .field(
                "plan_modifiers",
                &format!("{} plan modifiers", self.plan_modifiers.len()),
            )
            .field("deprecated", &self.deprecated)
            .finish()
    }
}

// Plan modifiers are not cloneable; a cloned attribute keeps only its shape
impl Clone for Attribute {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            r#type: self.r#type.clone(),
            description: self.description.clone(),
            required: self.required,
            optional: self.optional,
            computed: self.computed,
            sensitive: self.sensitive,
            write_only: self.write_only,
            plan_modifiers: vec![],
            deprecated: self.deprecated,
        }
    }
}

/// StringKind represents the format of string values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StringKind {
    Plain,
    Markdown,
}

/// PlanModifier modifies planned values during planning
/// Common uses: RequiresReplace, UseStateForUnknown
pub trait PlanModifier: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;
    /// Modify the planned value
    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse;
}

/// Request for plan modifiers
pub struct PlanModifierRequest {
    pub config_value: DynamicValue,
    pub state_value: DynamicValue,
    pub plan_value: DynamicValue,
    pub path: AttributePath,
    /// Whole resource configuration, for modifiers derived from sibling attributes
    pub config: DynamicValue,
}

/// Response from plan modifiers
pub struct PlanModifierResponse {
    pub plan_value: DynamicValue,
    pub requires_replace: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl PlanModifierResponse {
    /// Response that leaves the plan value as it was
    pub fn unchanged(plan_value: DynamicValue) -> Self {
        Self {
            plan_value,
            requires_replace: false,
            diagnostics: vec![],
        }
    }
}

/// AttributeBuilder provides fluent API for building attributes
/// ALWAYS use this instead of constructing Attribute directly
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                write_only: false,
                plan_modifiers: Vec::new(),
                deprecated: false,
            },
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    /// Mark as sensitive (hidden)
    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    /// Mark as write-only; cannot be combined with computed
    pub fn write_only(mut self) -> Self {
        self.attribute.write_only = true;
        self.attribute.computed = false;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.attribute.deprecated = true;
        self
    }

    pub fn plan_modifier(mut self, modifier: Box<dyn PlanModifier>) -> Self {
        self.attribute.plan_modifiers.push(modifier);
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// SchemaBuilder provides fluent API for building schemas
/// ALWAYS use this for consistency
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                block: Block {
                    version: 0,
                    attributes: Vec::new(),
                    description: String::new(),
                    description_kind: StringKind::Plain,
                    deprecated: false,
                },
            },
        }
    }

    /// Set schema version
    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self.schema.block.version = version;
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.block.attributes.push(attr);
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = desc.to_string();
        self
    }

    pub fn description_kind(mut self, kind: StringKind) -> Self {
        self.schema.block.description_kind = kind;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.schema.block.deprecated = true;
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_builder_creates_required_string() {
        let attr = AttributeBuilder::new("name", AttributeType::String)
            .description("The name of the resource")
            .required()
            .build();

        assert_eq!(attr.name, "name");
        assert!(matches!(attr.r#type, AttributeType::String));
        assert!(attr.required);
        assert!(!attr.optional);
        assert_eq!(attr.description, "The name of the resource");
    }

    #[test]
    fn write_only_attribute_is_never_computed() {
        let attr = AttributeBuilder::new("secret", AttributeType::String)
            .optional()
            .computed()
            .write_only()
            .build();

        assert!(attr.write_only);
        assert!(attr.optional);
        assert!(!attr.computed);
    }

    #[test]
    fn schema_builder_creates_schema_with_attributes() {
        let schema = SchemaBuilder::new()
            .version(1)
            .description("Test resource schema")
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
            .build();

        assert_eq!(schema.version, 1);
        assert_eq!(schema.block.attributes.len(), 2);
        assert_eq!(schema.block.description, "Test resource schema");
        assert!(schema.attribute("id").is_some());
        assert!(schema.attribute("missing").is_none());

        let write_only: Vec<_> = schema.write_only_attributes().map(|a| &a.name).collect();
        assert_eq!(write_only, vec!["token"]);
    }

    #[test]
    fn conform_fills_missing_and_drops_unknown_attributes() {
        let schema = SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("value", AttributeType::String)
                    .computed()
                    .build(),
            )
            .build();

        let stored = DynamicValue::new(Dynamic::Map(
            [
                ("id".to_string(), Dynamic::String("abc".to_string())),
                ("legacy".to_string(), Dynamic::Bool(true)),
            ]
            .into_iter()
            .collect(),
        ));

        let conformed = schema.conform(&stored);
        let Dynamic::Map(entries) = &conformed.value else {
            panic!("expected object");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries["id"], Dynamic::String("abc".to_string()));
        assert_eq!(entries["value"], Dynamic::Null);

        assert!(schema.conform(&DynamicValue::null()).is_null());
    }

    #[test]
    fn type_json_matches_terraform_encoding() {
        assert_eq!(AttributeType::String.to_json_bytes(), b"\"string\"");
        assert_eq!(
            AttributeType::List(Box::new(AttributeType::Number)).to_json_bytes(),
            br#"["list","number"]"#
        );

        let object_type = AttributeType::Object(BTreeMap::from([
            ("host".to_string(), AttributeType::String),
            ("port".to_string(), AttributeType::Number),
        ]));
        assert_eq!(
            object_type.to_json_bytes(),
            br#"["object",{"host":"string","port":"number"}]"#
        );
    }

    #[test]
    fn type_accepts_matching_values() {
        assert!(AttributeType::String.accepts(&Dynamic::String("x".into())));
        assert!(AttributeType::String.accepts(&Dynamic::Null));
        assert!(AttributeType::String.accepts(&Dynamic::Unknown));
        assert!(!AttributeType::String.accepts(&Dynamic::Bool(true)));
        assert!(AttributeType::List(Box::new(AttributeType::Bool))
            .accepts(&Dynamic::List(vec![Dynamic::Bool(false)])));
        assert!(!AttributeType::List(Box::new(AttributeType::Bool))
            .accepts(&Dynamic::List(vec![Dynamic::Number(1.0)])));
    }
}
