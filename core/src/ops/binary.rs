use crate::internal::*;
use crate::vision::{self, BinaryOperation};

/// Elementwise arithmetic, against a literal scalar or a second tensor.
///
/// Tensor operands of different shapes are broadcast. Either operand may
/// also be the output.
#[derive(Debug)]
pub struct Binary {
    base: OpBase,
    operation: BinaryOperation,
    scalar: Option<f32>,
}

pub fn build(param: &OpParam, ws: &Workspace) -> UmbraResult<Box<dyn Operator>> {
    let base = OpBase::new(param, ws)?;
    let operation = BinaryOperation::from_code(base.args.required("operation")?)?;
    let scalar = base.args.single_opt::<f32>("scalar")?;
    let inputs = if scalar.is_some() { 1 } else { 2 };
    base.check_arity(inputs..=inputs, 1)?;
    Ok(Box::new(Binary { base, operation, scalar }))
}

impl Operator for Binary {
    fn base(&self) -> &OpBase {
        &self.base
    }

    fn forward(&mut self, ws: &Workspace) -> UmbraResult<()> {
        // shallow copies: the output may alias either operand
        let a = ws.get(self.base.bottom(0)?)?.clone();
        let x = a.as_slice::<f32>()?;
        if let Some(scalar) = self.scalar {
            let mut top = ws.get_mut(self.base.top(0)?)?;
            top.reshape(a.shape())?;
            vision::binary_scalar(x, scalar, self.operation, top.as_slice_mut::<f32>()?);
            return Ok(());
        }
        let b = ws.get(self.base.bottom(1)?)?.clone();
        let y = b.as_slice::<f32>()?;
        let mut top = ws.get_mut(self.base.top(0)?)?;
        if a.shape() == b.shape() {
            top.reshape(a.shape())?;
            vision::binary(x, y, self.operation, top.as_slice_mut::<f32>()?);
        } else {
            let (a_shape, b_shape, out_shape) =
                broadcast_shapes(a.shape(), b.shape()).with_context(|| {
                    let (a, b) = (&self.base.bottoms[0], &self.base.bottoms[1]);
                    format!("Broadcasting {} against {}", a, b)
                })?;
            top.reshape(&out_shape)?;
            vision::broadcast_binary(
                x,
                &a_shape,
                y,
                &b_shape,
                self.operation,
                &out_shape,
                top.as_slice_mut::<f32>()?,
            );
        }
        Ok(())
    }
}
