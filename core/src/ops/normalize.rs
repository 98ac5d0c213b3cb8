use crate::internal::*;
use crate::vision;

#[derive(Debug)]
pub struct Normalize {
    base: OpBase,
    across_spatial: bool,
    channel_shared: bool,
}

pub fn build(param: &OpParam, ws: &Workspace) -> UmbraResult<Box<dyn Operator>> {
    let base = OpBase::new(param, ws)?;
    let across_spatial = base.args.single("across_spatial", true)?;
    let channel_shared = base.args.single("channel_shared", true)?;
    base.check_arity(1..=2, 1)?;
    Ok(Box::new(Normalize { base, across_spatial, channel_shared }))
}

impl Operator for Normalize {
    fn base(&self) -> &OpBase {
        &self.base
    }

    fn forward(&mut self, ws: &Workspace) -> UmbraResult<()> {
        let bottom = ws.get(self.base.bottom(0)?)?.clone();
        let scale = match self.base.bottoms.get(1) {
            Some(name) => Some(ws.get(name)?.clone()),
            None => None,
        };
        ensure!(bottom.rank() >= 2, "Normalize expects at least 2 axes, got {:?}", bottom.shape());
        let (batch, channels, spatial) =
            (bottom.shape()[0], bottom.shape()[1], bottom.count_from(2));
        if let Some(scale) = &scale {
            let expected = if self.channel_shared { 1 } else { channels };
            ensure!(
                scale.len() >= expected,
                "Scale of shape {:?} for {} channels",
                scale.shape(),
                channels
            );
        }
        let scale = scale.as_ref().map(|s| s.as_slice::<f32>()).transpose()?;
        let mut top = ws.get_mut(self.base.top(0)?)?;
        top.reshape(bottom.shape())?;
        vision::normalize(
            bottom.as_slice::<f32>()?,
            (batch, channels, spatial),
            self.across_spatial,
            scale.map(|s| (s, self.channel_shared)),
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
    fn per_position_in_place() {
        let mut ws = Workspace::default();
        ws.create::<f32>("x", &[1, 2, 2]).unwrap().set_data(&[3f32, 0., 4., 2.]).unwrap();
        ws.create::<f32>("s", &[2]).unwrap().set_data(&[1f32, 10.]).unwrap();
        let param = OpParam::new(
            "norm",
            "Normalize",
            &["x", "s"],
            &["x"],
            vec![Argument::bool("across_spatial", false), Argument::bool("channel_shared", false)],
        );
        let mut op = Registry::native().build(&param, &ws).unwrap();
        op.forward(&ws).unwrap();
        let x = ws.get("x").unwrap();
        let x = x.as_slice::<f32>().unwrap();
        assert_abs_diff_eq!(x[0], 0.6, epsilon = 1e-5);
        assert_abs_diff_eq!(x[1], 0., epsilon = 1e-5);
        assert_abs_diff_eq!(x[2], 8., epsilon = 1e-5);
        assert_abs_diff_eq!(x[3], 10., epsilon = 1e-5);
    }
}
