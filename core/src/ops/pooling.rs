use crate::internal::*;
use crate::vision::{self, PoolGeometry, PoolMode};

#[derive(Debug)]
pub struct Pooling {
    base: OpBase,
    mode: PoolMode,
    kernel_size: usize,
    stride: usize,
    pad: usize,
    global_pooling: bool,
    full_pooling: bool,
}

pub fn build(param: &OpParam, ws: &Workspace) -> UmbraResult<Box<dyn Operator>> {
    let base = OpBase::new(param, ws)?;
    let args = &base.args;
    let mode = PoolMode::from_code(args.single("pool", 0)?)?;
    let global_pooling = args.single("global_pooling", false)?;
    let kernel_size =
        if global_pooling { args.single("kernel_size", 0)? } else { args.required("kernel_size")? };
    let stride = args.single("stride", 1)?;
    let pad = args.single("pad", 0)?;
    let full_pooling = args.single("full_pooling", true)?;
    base.check_arity(1..=1, 1)?;
    base.check_not_in_place()?;
    Ok(Box::new(Pooling { base, mode, kernel_size, stride, pad, global_pooling, full_pooling }))
}

impl Operator for Pooling {
    fn base(&self) -> &OpBase {
        &self.base
    }

    fn forward(&mut self, ws: &Workspace) -> UmbraResult<()> {
        let bottom = ws.get(self.base.bottom(0)?)?;
        let mut top = ws.get_mut(self.base.top(0)?)?;
        let &[batch, channels, in_h, in_w] = bottom.shape() else {
            bail!("Pooling expects NCHW input, got {:?}", bottom.shape())
        };
        let geo = if self.global_pooling {
            PoolGeometry::new(in_h, in_w, 1, 1, 0, 0)
        } else {
            let (k, s, p) = (self.kernel_size, self.stride, self.pad);
            PoolGeometry::new(k, k, s, s, p, p)
        };
        let (out_h, out_w) = geo.output_size(in_h, in_w, self.full_pooling)?;
        top.reshape(&[batch, channels, out_h, out_w])?;
        vision::pooling(
            bottom.as_slice::<f32>()?,
            (batch, channels, in_h, in_w),
            &geo,
            self.mode,
            (out_h, out_w),
            top.as_slice_mut::<f32>()?,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Registry;

    #[test]
    fn global_average() {
        let mut ws = Workspace::default();
        let data: Vec<f32> = (0..8).map(|x| x as f32).collect();
        ws.create::<f32>("x", &[1, 2, 2, 2]).unwrap().set_data(&data).unwrap();
        ws.create::<f32>("y", &[]).unwrap();
        let param = OpParam::new(
            "gap",
            "Pooling",
            &["x"],
            &["y"],
            vec![Argument::int("pool", 1), Argument::bool("global_pooling", true)],
        );
        let mut op = Registry::native().build(&param, &ws).unwrap();
        op.forward(&ws).unwrap();
        let y = ws.get("y").unwrap();
        assert_eq!(y.shape(), &[1, 2, 1, 1]);
        assert_eq!(y.as_slice::<f32>().unwrap(), &[1.5, 5.5]);
    }

    #[test]
    fn kernel_required() {
        let mut ws = Workspace::default();
        ws.create::<f32>("x", &[1, 1, 4, 4]).unwrap();
        ws.create::<f32>("y", &[]).unwrap();
        let param = OpParam::new("pool", "Pooling", &["x"], &["y"], vec![]);
        assert!(Registry::native().build(&param, &ws).is_err());
    }
}
