use crate::internal::*;
use crate::vision::{ReduceOperation, ReducePlan};

#[derive(Debug)]
pub struct Reduce {
    base: OpBase,
    operation: ReduceOperation,
    axes: Vec<i32>,
    keep_dims: bool,
    plan: Option<ReducePlan>,
}

pub fn build(param: &OpParam, ws: &Workspace) -> UmbraResult<Box<dyn Operator>> {
    let base = OpBase::new(param, ws)?;
    let operation = ReduceOperation::from_code(base.args.required("operation")?)?;
    let axes = base.args.repeated::<i32>("axes")?;
    let keep_dims = base.args.single("keep_dims", true)?;
    base.check_arity(1..=1, 1)?;
    base.check_not_in_place()?;
    Ok(Box::new(Reduce { base, operation, axes, keep_dims, plan: None }))
}

impl Reduce {
    fn canonical_axes(&self, input: &Tensor) -> UmbraResult<TVec<usize>> {
        if self.axes.is_empty() {
            Ok((0..input.rank()).collect())
        } else {
            self.axes.iter().map(|&a| input.canonical_axis(a)).collect()
        }
    }

    fn plan(&mut self, input: &Tensor) -> UmbraResult<(&ReducePlan, TVec<usize>)> {
        let axes = self.canonical_axes(input)?;
        if self.plan.as_ref().is_none_or(|p| &*p.input_shape != input.shape()) {
            trace!("{}: planning reduction of {:?} over {:?}", self.base.name, input.shape(), axes);
            self.plan = Some(ReducePlan::new(input.shape(), &axes)?);
        }
        let plan = self.plan.as_ref().context("Reduction plan missing")?;
        Ok((plan, axes))
    }
}

impl Operator for Reduce {
    fn base(&self) -> &OpBase {
        &self.base
    }

    fn forward(&mut self, ws: &Workspace) -> UmbraResult<()> {
        let bottom = ws.get(self.base.bottom(0)?)?;
        let mut top = ws.get_mut(self.base.top(0)?)?;
        let operation = self.operation;
        let keep_dims = self.keep_dims;
        let (plan, axes) = self.plan(&bottom)?;
        top.reshape(&plan.output_shape)?;
        plan.run(operation, bottom.as_slice::<f32>()?, top.as_slice_mut::<f32>()?);
        if !keep_dims {
            let mut shape = tvec!();
            for (axis, &dim) in plan.output_shape.iter().enumerate() {
                if axes.contains(&axis) {
                    ensure!(dim == 1, "Reduced axis {} has size {}", axis, dim);
                } else {
                    shape.push(dim);
                }
            }
            top.set_shape(&shape)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Registry;

    fn run(shape: &[usize], args: Vec<Argument>) -> Tensor {
        let mut ws = Workspace::default();
        let len = shape.iter().product::<usize>();
        let data: Vec<f32> = (0..len).map(|x| x as f32).collect();
        ws.create::<f32>("x", shape).unwrap().set_data(&data).unwrap();
        ws.create::<f32>("y", &[]).unwrap();
        let param = OpParam::new("reduce", "Reduce", &["x"], &["y"], args);
        let mut op = Registry::native().build(&param, &ws).unwrap();
        op.forward(&ws).unwrap();
        let y = ws.get("y").unwrap().clone();
        y
    }

    #[test]
    fn sum_keep_dims() {
        let y = run(&[2, 3], vec![Argument::int("operation", 1), Argument::ints("axes", &[1])]);
        assert_eq!(y.shape(), &[2, 1]);
        assert_eq!(y.as_slice::<f32>().unwrap(), &[3., 12.]);
    }

    #[test]
    fn max_negative_axis_drop_dims() {
        let y = run(
            &[2, 3],
            vec![
                Argument::int("operation", 2),
                Argument::ints("axes", &[-2]),
                Argument::bool("keep_dims", false),
            ],
        );
        assert_eq!(y.shape(), &[3]);
        assert_eq!(y.as_slice::<f32>().unwrap(), &[3., 4., 5.]);
    }

    #[test]
    fn average_of_everything() {
        let y =
            run(&[2, 2], vec![Argument::int("operation", 4), Argument::bool("keep_dims", false)]);
        assert_eq!(y.shape(), &[] as &[usize]);
        assert_eq!(y.as_slice::<f32>().unwrap(), &[1.5]);
    }

    #[test]
    fn replans_on_new_shape() {
        let mut ws = Workspace::default();
        ws.create::<f32>("x", &[2, 2]).unwrap().fill(1f32).unwrap();
        ws.create::<f32>("y", &[]).unwrap();
        let param =
            OpParam::new("reduce", "Reduce", &["x"], &["y"], vec![Argument::int("operation", 1)]);
        let mut op = Registry::native().build(&param, &ws).unwrap();
        op.forward(&ws).unwrap();
        assert_eq!(ws.get("y").unwrap().as_slice::<f32>().unwrap(), &[4.]);
        ws.create::<f32>("x", &[3, 3]).unwrap().fill(1f32).unwrap();
        op.forward(&ws).unwrap();
        assert_eq!(ws.get("y").unwrap().as_slice::<f32>().unwrap(), &[9.]);
    }

    #[test]
    fn bad_axis() {
        let mut ws = Workspace::default();
        ws.create::<f32>("x", &[2, 2]).unwrap();
        ws.create::<f32>("y", &[]).unwrap();
        let param = OpParam::new(
            "reduce",
            "Reduce",
            &["x"],
            &["y"],
            vec![Argument::int("operation", 1), Argument::ints("axes", &[2])],
        );
        let mut op = Registry::native().build(&param, &ws).unwrap();
        assert!(op.forward(&ws).is_err());
    }
}
