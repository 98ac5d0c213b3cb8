use crate::internal::*;
use crate::vision::{self, Activation};

/// Pointwise activation. PRelu reads its slopes from a second bottom.
#[derive(Debug)]
pub struct Activate {
    base: OpBase,
    activation: Activation,
    channel_shared: bool,
}

pub fn build(param: &OpParam, ws: &Workspace) -> UmbraResult<Box<dyn Operator>> {
    let base = OpBase::new(param, ws)?;
    let slope = base.args.single("slope", 0.1f32)?;
    let activation = Activation::from_code(base.args.single("type", 1)?, slope)?;
    let channel_shared = base.args.single("channel_shared", false)?;
    if activation == Activation::PRelu {
        base.check_arity(2..=2, 1)?;
    } else {
        base.check_arity(1..=1, 1)?;
    }
    Ok(Box::new(Activate { base, activation, channel_shared }))
}

impl Operator for Activate {
    fn base(&self) -> &OpBase {
        &self.base
    }

    fn forward(&mut self, ws: &Workspace) -> UmbraResult<()> {
        if !self.base.is_in_place() {
            let bottom = ws.get(self.base.bottom(0)?)?;
            let mut top = ws.get_mut(self.base.top(0)?)?;
            top.reshape(bottom.shape())?;
            top.as_slice_mut::<f32>()?.copy_from_slice(bottom.as_slice::<f32>()?);
        }
        let mut top = ws.get_mut(self.base.top(0)?)?;
        if self.activation == Activation::PRelu {
            let slope = ws.get(self.base.bottom(1)?)?;
            ensure!(top.rank() >= 2, "PRelu expects at least 2 axes, got {:?}", top.shape());
            let (channels, inner) = (top.shape()[1], top.count_from(2));
            let expected = if self.channel_shared { 1 } else { channels };
            ensure!(
                slope.len() >= expected,
                "Slope of shape {:?} for {} channels",
                slope.shape(),
                channels
            );
            vision::prelu(
                top.as_slice_mut::<f32>()?,
                (channels, inner),
                self.channel_shared,
                slope.as_slice::<f32>()?,
            );
        } else {
            vision::activate(top.as_slice_mut::<f32>()?, self.activation);
        }
        Ok(())
    }
}
