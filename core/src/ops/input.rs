use crate::internal::*;

/// Marks its tops as the network inputs.
///
/// An argument named after a top gives that top its initial shape.
#[derive(Debug)]
pub struct Input {
    pub(crate) base: OpBase,
}

pub fn build(param: &OpParam, ws: &Workspace) -> UmbraResult<Box<dyn Operator>> {
    let base = OpBase::new(param, ws)?;
    for top in &base.tops {
        if base.args.has(top) {
            let shape = base.args.repeated::<usize>(top)?;
            ws.get_mut(top)?.reshape(&shape)?;
        }
    }
    Ok(Box::new(Input { base }))
}

impl Operator for Input {
    fn base(&self) -> &OpBase {
        &self.base
    }

    fn forward(&mut self, _ws: &Workspace) -> UmbraResult<()> {
        Ok(())
    }
}
