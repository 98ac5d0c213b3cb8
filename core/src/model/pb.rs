//! Model description messages.
//!
//! Binary form is protobuf (prost), text form is JSON (serde). Field tags
//! are part of the binary format and must not change.
use serde::{Deserialize, Serialize};

/// A whole network: tensor declarations, operators in execution order, and
/// network-level arguments.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct NetParam {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(message, repeated, tag = "2")]
    pub blob: ::prost::alloc::vec::Vec<BlobParam>,
    #[prost(message, repeated, tag = "3")]
    pub op: ::prost::alloc::vec::Vec<OpParam>,
    #[prost(message, repeated, tag = "4")]
    pub arg: ::prost::alloc::vec::Vec<Argument>,
}

/// A tensor declaration, with optional literal content.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobParam {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(int32, repeated, tag = "2")]
    pub shape: ::prost::alloc::vec::Vec<i32>,
    /// "float" (when absent), "int" or "unsigned char"
    #[prost(string, optional, tag = "3")]
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub r#type: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(float, repeated, tag = "4")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data_f: ::prost::alloc::vec::Vec<f32>,
    #[prost(int32, repeated, tag = "5")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data_i: ::prost::alloc::vec::Vec<i32>,
    #[prost(bytes = "vec", repeated, tag = "6")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data_b: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
}

/// An operator declaration.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct OpParam {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    /// operator kind, looked up in the registry
    #[prost(string, tag = "2")]
    #[serde(rename = "type")]
    pub r#type: ::prost::alloc::string::String,
    #[prost(string, repeated, tag = "3")]
    pub bottom: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(string, repeated, tag = "4")]
    pub top: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(message, repeated, tag = "5")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub arg: ::prost::alloc::vec::Vec<Argument>,
}

/// A named scalar or repeated value.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Argument {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(float, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s_f: ::core::option::Option<f32>,
    #[prost(int32, optional, tag = "3")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s_i: ::core::option::Option<i32>,
    #[prost(string, optional, tag = "4")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s_s: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(float, repeated, tag = "5")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub v_f: ::prost::alloc::vec::Vec<f32>,
    #[prost(int32, repeated, tag = "6")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub v_i: ::prost::alloc::vec::Vec<i32>,
    #[prost(string, repeated, tag = "7")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub v_s: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}
