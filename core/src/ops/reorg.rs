use crate::internal::*;
use crate::vision;

/// Space-to-depth over NCHW.
#[derive(Debug)]
pub struct Reorg {
    base: OpBase,
    stride: usize,
}

pub fn build(param: &OpParam, ws: &Workspace) -> UmbraResult<Box<dyn Operator>> {
    let base = OpBase::new(param, ws)?;
    let stride = base.args.single::<usize>("stride", 2)?;
    ensure!(stride > 0, "Reorg stride must be positive");
    base.check_arity(1..=1, 1)?;
    base.check_not_in_place()?;
    Ok(Box::new(Reorg { base, stride }))
}

impl Reorg {
    fn eval_t<T: Datum>(&self, input: &Tensor, output: &mut Tensor) -> UmbraResult<()> {
        let &[batch, channels, in_h, in_w] = input.shape() else {
            bail!("Reorg expects NCHW input, got {:?}", input.shape())
        };
        vision::reorg(
            input.as_slice::<T>()?,
            (batch, channels, in_h, in_w),
            self.stride,
            output.as_slice_mut::<T>()?,
        );
        Ok(())
    }
}

impl Operator for Reorg {
    fn base(&self) -> &OpBase {
        &self.base
    }

    fn forward(&mut self, ws: &Workspace) -> UmbraResult<()> {
        let bottom = ws.get(self.base.bottom(0)?)?;
        let mut top = ws.get_mut(self.base.top(0)?)?;
        let &[batch, channels, in_h, in_w] = bottom.shape() else {
            bail!("Reorg expects NCHW input, got {:?}", bottom.shape())
        };
        let s = self.stride;
        ensure!(
            in_h % s == 0 && in_w % s == 0,
            "Spatial size {}x{} is not a multiple of stride {}",
            in_h,
            in_w,
            s
        );
        top.reshape(&[batch, channels * s * s, in_h / s, in_w / s])?;
        dispatch_datum!(Self::eval_t(bottom.datum_type())(self, &bottom, &mut top))
    }
}
