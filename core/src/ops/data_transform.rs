use crate::internal::*;
use crate::vision;

/// Input preprocessing: `(x - mean) * scale`.
#[derive(Debug)]
pub struct DataTransform {
    base: OpBase,
    scale: f32,
    mean: Vec<f32>,
}

pub fn build(param: &OpParam, ws: &Workspace) -> UmbraResult<Box<dyn Operator>> {
    let base = OpBase::new(param, ws)?;
    let scale = base.args.single("scale", 1.0)?;
    let mean = base.args.repeated("mean_value")?;
    base.check_arity(1..=1, 1)?;
    Ok(Box::new(DataTransform { base, scale, mean }))
}

impl Operator for DataTransform {
    fn base(&self) -> &OpBase {
        &self.base
    }

    fn forward(&mut self, ws: &Workspace) -> UmbraResult<()> {
        let bottom = ws.get(self.base.bottom(0)?)?.clone();
        ensure!(
            bottom.rank() >= 2,
            "DataTransform expects at least 2 axes, got {:?}",
            bottom.shape()
        );
        let dims = (bottom.shape()[1], bottom.count_from(2));
        let mut top = ws.get_mut(self.base.top(0)?)?;
        top.reshape(bottom.shape())?;
        vision::data_transform(
            bottom.as_slice::<f32>()?,
            dims,
            self.scale,
            &self.mean,
            top.as_slice_mut::<f32>()?,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Registry;

    #[test]
    fn per_channel_in_place() {
        let mut ws = Workspace::default();
        ws.create::<f32>("x", &[1, 2, 2]).unwrap().set_data(&[10f32, 12., 20., 24.]).unwrap();
        let param = OpParam::new(
            "data",
            "DataTransform",
            &["x"],
            &["x"],
            vec![Argument::floats("mean_value", &[10., 20.]), Argument::float("scale", 0.5)],
        );
        let mut op = Registry::native().build(&param, &ws).unwrap();
        op.forward(&ws).unwrap();
        assert_eq!(ws.get("x").unwrap().as_slice::<f32>().unwrap(), &[0., 1., 0., 2.]);
    }

    #[test]
    fn bad_mean_length() {
        let mut ws = Workspace::default();
        ws.create::<f32>("x", &[1, 2, 2]).unwrap();
        let param = OpParam::new(
            "data",
            "DataTransform",
            &["x"],
            &["x"],
            vec![Argument::floats("mean_value", &[1., 2., 3.])],
        );
        let mut op = Registry::native().build(&param, &ws).unwrap();
        assert!(op.forward(&ws).is_err());
    }
}
