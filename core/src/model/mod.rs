//! Declarative network description and its encodings.
use crate::internal::*;
use prost::Message;
use std::path::Path;

mod args;
mod pb;

pub use args::{ArgScalarType, ArgumentHelper};
pub use pb::{Argument, BlobParam, NetParam, OpParam};

impl NetParam {
    /// Decode the protobuf binary form.
    pub fn decode_binary(bytes: &[u8]) -> UmbraResult<NetParam> {
        NetParam::decode(bytes).context("Error when decoding binary model")
    }

    pub fn encode_binary(&self) -> Vec<u8> {
        self.encode_to_vec()
    }

    pub fn from_binary_file(path: impl AsRef<Path>) -> UmbraResult<NetParam> {
        let bytes = fs_err::read(path.as_ref())?;
        Self::decode_binary(&bytes)
            .with_context(|| format!("Error when loading binary model {}", path.as_ref().display()))
    }

    /// Parse the JSON text form.
    pub fn from_text(text: &str) -> UmbraResult<NetParam> {
        ensure!(!text.trim().is_empty(), "Empty model text");
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_text(&self) -> UmbraResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse the text form, from a file if `text_or_path` names one.
    pub fn from_text_or_path(text_or_path: &str) -> UmbraResult<NetParam> {
        let path = Path::new(text_or_path);
        if !text_or_path.trim_start().starts_with('{') && path.is_file() {
            let text = fs_err::read_to_string(path)?;
            Self::from_text(&text)
                .with_context(|| format!("Error when loading text model {}", path.display()))
        } else {
            Self::from_text(text_or_path).context("Error when parsing text model")
        }
    }
}

impl BlobParam {
    pub fn datum_type(&self) -> UmbraResult<DatumType> {
        match self.r#type.as_deref() {
            None => Ok(DatumType::F32),
            Some(s) => {
                s.parse().with_context(|| format!("Blob {} has unsupported type", self.name))
            }
        }
    }

    pub fn shape(&self) -> UmbraResult<TVec<usize>> {
        self.shape
            .iter()
            .map(|&d| {
                usize::try_from(d)
                    .map_err(|_| format_err!("Blob {} has negative dimension {}", self.name, d))
            })
            .collect()
    }
}

impl OpParam {
    pub fn new(
        name: &str,
        kind: &str,
        bottom: &[&str],
        top: &[&str],
        arg: Vec<Argument>,
    ) -> OpParam {
        OpParam {
            name: name.to_string(),
            r#type: kind.to_string(),
            bottom: bottom.iter().map(|s| s.to_string()).collect(),
            top: top.iter().map(|s| s.to_string()).collect(),
            arg,
        }
    }
}
