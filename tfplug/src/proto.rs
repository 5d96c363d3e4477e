//! Protocol buffer types for Terraform Plugin Protocol v6.9
//!
//! The protobuf code is generated at build time by tonic-build from
//! `proto/tfplugin6.9.proto` and included here.
//!
//! # Type Naming
//!
//! - Top-level messages become structs (e.g., `DynamicValue`, `Schema`)
//! - RPC methods have nested `Request` and `Response` types in snake_case modules
//!   (e.g., `get_provider_schema::Request`, `read_resource::Response`)
//! - Nested messages are in sub-modules (e.g., `diagnostic::Severity`)
//! - The gRPC service trait is re-exported as [`ProtoProvider`]
//!
//! Some protobuf types share names with tfplug framework types. Always use the
//! `proto::` prefix when referring to protobuf types.

// The file name is based on the proto package name (tfplugin6)
include!(concat!(env!("OUT_DIR"), "/tfplugin6.rs"));

pub use provider_server::{Provider as ProtoProvider, ProviderServer};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proto_types_accessible() {
        let _ = DynamicValue::default();
        let _ = Diagnostic::default();
        let _ = AttributePath::default();
        let _ = ServerCapabilities::default();
        let _ = ClientCapabilities::default();
    }

    #[test]
    fn nested_types_accessible() {
        let _ = diagnostic::Severity::Invalid;
        let _ = attribute_path::step::Selector::AttributeName("test".to_string());
        let _ = schema::nested_block::NestingMode::Single;
    }

    #[test]
    fn write_only_field_generated() {
        let attr = schema::Attribute {
            write_only: true,
            ..Default::default()
        };
        assert!(attr.write_only);
    }
}
