//! Operators: one unit of computation each, bound by name to workspace
//! tensors.
use std::fmt;
use std::ops::RangeInclusive;

use downcast_rs::{impl_downcast, Downcast};

use crate::internal::*;

pub mod activate;
pub mod binary;
pub mod concat;
pub mod conv;
pub mod data_transform;
pub mod input;
pub mod lrn;
pub mod normalize;
pub mod permute;
pub mod pooling;
pub mod proposal;
pub mod reduce;
pub mod registry;
pub mod reorg;
pub mod roi_pooling;
pub mod scale;
pub mod squeeze;

pub use registry::{OpBuilder, Registry};

/// A computation step of a network.
///
/// Operators resolve their inputs and outputs by name through the
/// workspace on every call: they hold no reference to tensors between calls.
pub trait Operator: fmt::Debug + Downcast {
    fn base(&self) -> &OpBase;

    /// Read bottoms, reshape and write tops.
    fn forward(&mut self, ws: &Workspace) -> UmbraResult<()>;

    fn name(&self) -> &str {
        &self.base().name
    }

    fn kind(&self) -> &str {
        &self.base().kind
    }

    /// One-line summary of the operator and the current shapes of its
    /// tensors.
    fn debug_log(&self, ws: &Workspace) -> String {
        let describe = |names: &[String]| {
            names
                .iter()
                .map(|n| match ws.get(n) {
                    Ok(t) => format!("{}{:?}", n, t.shape()),
                    Err(_) => format!("{}[?]", n),
                })
                .join(", ")
        };
        format!(
            "{} ({}): {} -> {}",
            self.name(),
            self.kind(),
            describe(&self.base().bottoms),
            describe(&self.base().tops)
        )
    }
}
impl_downcast!(Operator);

/// What every operator is made of: its declaration, checked against the
/// workspace.
#[derive(Debug, Clone)]
pub struct OpBase {
    pub name: String,
    pub kind: String,
    pub bottoms: TVec<String>,
    pub tops: TVec<String>,
    pub args: ArgumentHelper,
}

impl OpBase {
    pub fn new(param: &OpParam, ws: &Workspace) -> UmbraResult<OpBase> {
        for blob in param.bottom.iter().chain(param.top.iter()) {
            ensure!(ws.has_blob(blob), "Blob {} not found in workspace", blob);
        }
        Ok(OpBase {
            name: param.name.clone(),
            kind: param.r#type.clone(),
            bottoms: param.bottom.iter().cloned().collect(),
            tops: param.top.iter().cloned().collect(),
            args: ArgumentHelper::new(&param.arg)?,
        })
    }

    pub fn bottom(&self, ix: usize) -> UmbraResult<&str> {
        self.bottoms
            .get(ix)
            .map(|s| &**s)
            .with_context(|| format!("Operator {} has no bottom #{}", self.name, ix))
    }

    pub fn top(&self, ix: usize) -> UmbraResult<&str> {
        self.tops
            .get(ix)
            .map(|s| &**s)
            .with_context(|| format!("Operator {} has no top #{}", self.name, ix))
    }

    pub fn check_arity(&self, bottoms: RangeInclusive<usize>, tops: usize) -> UmbraResult<()> {
        ensure!(
            bottoms.contains(&self.bottoms.len()),
            "Wrong input number. Expected {:?}, got {}.",
            bottoms,
            self.bottoms.len()
        );
        ensure!(
            self.tops.len() == tops,
            "Wrong output number. Expected {}, got {}.",
            tops,
            self.tops.len()
        );
        Ok(())
    }

    /// Outputs must all be distinct from inputs.
    pub fn check_not_in_place(&self) -> UmbraResult<()> {
        if let Some(top) = self.tops.iter().find(|t| self.bottoms.contains(t)) {
            bail!("Operator {} can not compute {} in place", self.name, top)
        }
        Ok(())
    }

    pub fn is_in_place(&self) -> bool {
        self.tops.first().is_some_and(|t| self.bottoms.first() == Some(t))
    }
}
