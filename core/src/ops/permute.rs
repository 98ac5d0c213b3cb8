use crate::internal::*;
use crate::vision;

#[derive(Debug)]
pub struct Permute {
    base: OpBase,
    order: Vec<usize>,
}

pub fn build(param: &OpParam, ws: &Workspace) -> UmbraResult<Box<dyn Operator>> {
    let base = OpBase::new(param, ws)?;
    let order = base.args.required_repeated::<usize>("order")?;
    ensure!(
        order.iter().sorted().copied().eq(0..order.len()),
        "Order {:?} is not a permutation",
        order
    );
    base.check_arity(1..=1, 1)?;
    base.check_not_in_place()?;
    Ok(Box::new(Permute { base, order }))
}

impl Permute {
    fn eval_t<T: Datum>(&self, input: &Tensor, output: &mut Tensor) -> UmbraResult<()> {
        let new_steps = natural_strides(output.shape());
        let old_steps = natural_strides(input.shape());
        vision::permute(
            input.as_slice::<T>()?,
            &self.order,
            &old_steps,
            &new_steps,
            output.as_slice_mut::<T>()?,
        );
        Ok(())
    }
}

impl Operator for Permute {
    fn base(&self) -> &OpBase {
        &self.base
    }

    fn forward(&mut self, ws: &Workspace) -> UmbraResult<()> {
        let bottom = ws.get(self.base.bottom(0)?)?;
        let mut top = ws.get_mut(self.base.top(0)?)?;
        ensure!(
            bottom.rank() == self.order.len(),
            "Order {:?} does not fit shape {:?}",
            self.order,
            bottom.shape()
        );
        let shape: TVec<usize> = self.order.iter().map(|&a| bottom.shape()[a]).collect();
        top.reshape(&shape)?;
        dispatch_datum!(Self::eval_t(bottom.datum_type())(self, &bottom, &mut top))
    }
}
