use crate::internal::*;
use crate::vision;

#[derive(Debug)]
pub struct Concat {
    base: OpBase,
    axis: i32,
}

pub fn build(param: &OpParam, ws: &Workspace) -> UmbraResult<Box<dyn Operator>> {
    let base = OpBase::new(param, ws)?;
    let axis = base.args.single("axis", 1)?;
    ensure!(!base.bottoms.is_empty(), "Concat needs at least one input");
    base.check_arity(1..=base.bottoms.len(), 1)?;
    base.check_not_in_place()?;
    Ok(Box::new(Concat { base, axis }))
}

impl Concat {
    fn eval_t<T: Datum>(
        &self,
        inputs: &[Ref<Tensor>],
        axis: usize,
        output: &mut Tensor,
    ) -> UmbraResult<()> {
        let num_concats = output.shape()[..axis].iter().product::<usize>();
        let concat_size = output.count_from(axis + 1);
        let top_axis = output.shape()[axis];
        let output = output.as_slice_mut::<T>()?;
        let mut offset_axis = 0;
        for input in inputs {
            let bottom_axis = input.shape()[axis];
            vision::concat(
                input.as_slice::<T>()?,
                num_concats,
                concat_size,
                top_axis,
                bottom_axis,
                offset_axis,
                output,
            );
            offset_axis += bottom_axis;
        }
        Ok(())
    }
}

impl Operator for Concat {
    fn base(&self) -> &OpBase {
        &self.base
    }

    fn forward(&mut self, ws: &Workspace) -> UmbraResult<()> {
        let inputs = self.base.bottoms.iter().map(|b| ws.get(b)).collect::<UmbraResult<Vec<_>>>()?;
        let mut top = ws.get_mut(self.base.top(0)?)?;
        let first = &inputs[0];
        let axis = first.canonical_axis(self.axis)?;
        let mut shape: TVec<usize> = first.shape().into();
        for (ix, input) in inputs.iter().enumerate().skip(1) {
            ensure!(
                input.datum_type() == first.datum_type() && input.rank() == first.rank(),
                "Input {} {:?} does not fit {:?}",
                ix,
                input,
                first
            );
            for (d, (&a, &b)) in input.shape().iter().zip(first.shape()).enumerate() {
                ensure!(
                    d == axis || a == b,
                    "Input {} of shape {:?} does not match {:?} outside axis {}",
                    ix,
                    input.shape(),
                    first.shape(),
                    axis
                );
            }
            shape[axis] += input.shape()[axis];
        }
        top.reshape(&shape)?;
        dispatch_datum!(Self::eval_t(first.datum_type())(self, &inputs, axis, &mut top))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Registry;

    #[test]
    fn channels() {
        let mut ws = Workspace::default();
        ws.create::<f32>("a", &[2, 2]).unwrap().set_data(&[1f32, 2., 3., 4.]).unwrap();
        ws.create::<f32>("b", &[2, 1]).unwrap().set_data(&[5f32, 6.]).unwrap();
        ws.create::<f32>("y", &[]).unwrap();
        let param = OpParam::new("concat", "Concat", &["a", "b"], &["y"], vec![]);
        let mut op = Registry::native().build(&param, &ws).unwrap();
        op.forward(&ws).unwrap();
        let y = ws.get("y").unwrap();
        assert_eq!(y.shape(), &[2, 3]);
        assert_eq!(y.as_slice::<f32>().unwrap(), &[1., 2., 5., 3., 4., 6.]);
    }

    #[test]
    fn mismatch() {
        let mut ws = Workspace::default();
        ws.create::<f32>("a", &[2, 2]).unwrap();
        ws.create::<f32>("b", &[3, 1]).unwrap();
        ws.create::<f32>("y", &[]).unwrap();
        let param = OpParam::new("concat", "Concat", &["a", "b"], &["y"], vec![]);
        let mut op = Registry::native().build(&param, &ws).unwrap();
        assert!(op.forward(&ws).is_err());
    }
}
