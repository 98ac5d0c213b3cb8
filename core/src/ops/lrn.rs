use crate::internal::*;
use crate::vision::{self, LrnParams};

#[derive(Debug)]
pub struct Lrn {
    base: OpBase,
    params: LrnParams,
}

pub fn build(param: &OpParam, ws: &Workspace) -> UmbraResult<Box<dyn Operator>> {
    let base = OpBase::new(param, ws)?;
    let args = &base.args;
    let params = LrnParams::new(
        args.single("size", 5)?,
        args.single("alpha", 1e-4)?,
        args.single("beta", 0.75)?,
        args.single("k", 1.0)?,
    );
    ensure!(params.size % 2 == 1, "LRN window size must be odd, got {}", params.size);
    base.check_arity(1..=1, 1)?;
    base.check_not_in_place()?;
    Ok(Box::new(Lrn { base, params }))
}

impl Operator for Lrn {
    fn base(&self) -> &OpBase {
        &self.base
    }

    fn forward(&mut self, ws: &Workspace) -> UmbraResult<()> {
        let bottom = ws.get(self.base.bottom(0)?)?;
        let mut top = ws.get_mut(self.base.top(0)?)?;
        let &[batch, channels, in_h, in_w] = bottom.shape() else {
            bail!("LRN expects NCHW input, got {:?}", bottom.shape())
        };
        top.reshape(bottom.shape())?;
        ws.grow_temp_buffer(bottom.len() * std::mem::size_of::<f32>())?;
        let mut scale = ws.temp_buffer::<f32>(bottom.len())?;
        vision::lrn(
            bottom.as_slice::<f32>()?,
            (batch, channels, in_h, in_w),
            &self.params,
            &mut scale,
            top.as_slice_mut::<f32>()?,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Registry;
    use approx::assert_abs_diff_eq;

    #[test]
    fn single_window() {
        let mut ws = Workspace::default();
        ws.create::<f32>("x", &[1, 3, 1, 1]).unwrap().set_data(&[1f32, 2., 3.]).unwrap();
        ws.create::<f32>("y", &[]).unwrap();
        let param = OpParam::new(
            "lrn",
            "LRN",
            &["x"],
            &["y"],
            vec![
                Argument::int("size", 3),
                Argument::float("alpha", 3.),
                Argument::float("beta", 1.),
            ],
        );
        let mut op = Registry::native().build(&param, &ws).unwrap();
        op.forward(&ws).unwrap();
        let y = ws.get("y").unwrap();
        let y = y.as_slice::<f32>().unwrap();
        // scale = 1 + sum of squares over the window
        assert_abs_diff_eq!(y[0], 1. / 6., epsilon = 1e-6);
        assert_abs_diff_eq!(y[1], 2. / 15., epsilon = 1e-6);
        assert_abs_diff_eq!(y[2], 3. / 14., epsilon = 1e-6);
    }
}
