use crate::internal::*;
use crate::vision;

#[derive(Debug)]
pub struct RoiPooling {
    base: OpBase,
    pooled_h: usize,
    pooled_w: usize,
    spatial_scale: f32,
}

pub fn build(param: &OpParam, ws: &Workspace) -> UmbraResult<Box<dyn Operator>> {
    let base = OpBase::new(param, ws)?;
    let pooled_h = base.args.required("pooled_h")?;
    let pooled_w = base.args.required("pooled_w")?;
    let spatial_scale = base.args.single("spatial_scale", 1. / 16.)?;
    base.check_arity(2..=2, 1)?;
    base.check_not_in_place()?;
    Ok(Box::new(RoiPooling { base, pooled_h, pooled_w, spatial_scale }))
}

impl Operator for RoiPooling {
    fn base(&self) -> &OpBase {
        &self.base
    }

    fn forward(&mut self, ws: &Workspace) -> UmbraResult<()> {
        let bottom = ws.get(self.base.bottom(0)?)?;
        let rois = ws.get(self.base.bottom(1)?)?;
        let mut top = ws.get_mut(self.base.top(0)?)?;
        let &[batch, channels, in_h, in_w] = bottom.shape() else {
            bail!("ROIPooling expects NCHW features, got {:?}", bottom.shape())
        };
        ensure!(rois.len() % 5 == 0, "Regions of shape {:?} are not 5-tuples", rois.shape());
        let num_rois = rois.len() / 5;
        top.reshape(&[num_rois, channels, self.pooled_h, self.pooled_w])?;
        vision::roi_pooling(
            bottom.as_slice::<f32>()?,
            (batch, channels, in_h, in_w),
            rois.as_slice::<f32>()?,
            (self.pooled_h, self.pooled_w),
            self.spatial_scale,
            top.as_slice_mut::<f32>()?,
        )
    }
}
