use crate::internal::*;
use crate::vision;

/// Where a scale or bias operand comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Operand {
    Absent,
    Literal(f32),
    Bottom(usize),
}

/// Per-channel affine transform: `y = x * scale[c] + bias[c]`.
///
/// Channels are the dimensions of `axis`. Scale and bias are read from
/// bottoms in that order, unless given as literal `scale_value` and
/// `bias_value`.
#[derive(Debug)]
pub struct Scale {
    base: OpBase,
    axis: i32,
    scale: Operand,
    bias: Operand,
}

pub fn build(param: &OpParam, ws: &Workspace) -> UmbraResult<Box<dyn Operator>> {
    let base = OpBase::new(param, ws)?;
    let args = &base.args;
    let axis = args.single("axis", 1)?;
    let mut next = 1;
    let mut operand = |literal: Option<f32>, from_bottom: bool| match literal {
        Some(v) => Operand::Literal(v),
        None if from_bottom => {
            next += 1;
            Operand::Bottom(next - 1)
        }
        None => Operand::Absent,
    };
    let scale = operand(args.single_opt("scale_value")?, args.single("has_scale", true)?);
    let bias = operand(args.single_opt("bias_value")?, args.single("has_bias", false)?);
    base.check_arity(next..=next, 1)?;
    Ok(Box::new(Scale { base, axis, scale, bias }))
}

impl Scale {
    fn operand(&self, ws: &Workspace, operand: Operand, dim: usize) -> UmbraResult<Option<Tensor>> {
        Ok(match operand {
            Operand::Absent => None,
            Operand::Literal(v) => Some(Tensor::from_shape(&[dim], &vec![v; dim])?),
            Operand::Bottom(ix) => {
                let t = ws.get(self.base.bottom(ix)?)?.clone();
                ensure!(t.len() == dim, "Operand {:?} does not fit {} channels", t, dim);
                Some(t)
            }
        })
    }
}

impl Operator for Scale {
    fn base(&self) -> &OpBase {
        &self.base
    }

    fn forward(&mut self, ws: &Workspace) -> UmbraResult<()> {
        let bottom = ws.get(self.base.bottom(0)?)?.clone();
        let axis = bottom.canonical_axis(self.axis)?;
        let dims = (bottom.shape()[axis], bottom.count_from(axis + 1));
        let scale = self.operand(ws, self.scale, dims.0)?;
        let bias = self.operand(ws, self.bias, dims.0)?;
        let mut top = ws.get_mut(self.base.top(0)?)?;
        top.reshape(bottom.shape())?;
        let input = bottom.as_slice::<f32>()?;
        let output = top.as_slice_mut::<f32>()?;
        let bias = bias.as_ref().map(|b| b.as_slice::<f32>()).transpose()?;
        match (&scale, bias) {
            (Some(scale), bias) => {
                vision::scale(input, scale.as_slice::<f32>()?, bias, dims, output)
            }
            (None, Some(bias)) => vision::bias(input, bias, dims, output),
            (None, None) => output.copy_from_slice(input),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Registry;

    fn ws() -> Workspace {
        let mut ws = Workspace::default();
        ws.create::<f32>("x", &[1, 2, 2]).unwrap().set_data(&[1f32, 2., 3., 4.]).unwrap();
        ws.create::<f32>("s", &[2]).unwrap().set_data(&[2f32, -1.]).unwrap();
        ws.create::<f32>("b", &[2]).unwrap().set_data(&[1f32, 0.]).unwrap();
        ws.create::<f32>("y", &[]).unwrap();
        ws
    }

    fn run(bottoms: &[&str], args: Vec<Argument>) -> Vec<f32> {
        let ws = ws();
        let param = OpParam::new("scale", "Scale", bottoms, &["y"], args);
        let mut op = Registry::native().build(&param, &ws).unwrap();
        op.forward(&ws).unwrap();
        let y = ws.get("y").unwrap();
        y.as_slice::<f32>().unwrap().to_vec()
    }

    #[test]
    fn scale_and_bias_bottoms() {
        let y = run(&["x", "s", "b"], vec![Argument::bool("has_bias", true)]);
        assert_eq!(y, [3., 5., -3., -4.]);
    }

    #[test]
    fn literal_scale_bias_bottom() {
        let y = run(
            &["x", "b"],
            vec![Argument::float("scale_value", 10.), Argument::bool("has_bias", true)],
        );
        assert_eq!(y, [11., 21., 30., 40.]);
    }

    #[test]
    fn bias_only() {
        let y = run(
            &["x"],
            vec![Argument::bool("has_scale", false), Argument::float("bias_value", 0.5)],
        );
        assert_eq!(y, [1.5, 2.5, 3.5, 4.5]);
    }

    #[test]
    fn wrong_bottom_count() {
        let ws = ws();
        let param = OpParam::new("scale", "Scale", &["x"], &["y"], vec![]);
        assert!(Registry::native().build(&param, &ws).is_err());
    }
}
