use crate::internal::*;

/// Drop unit axes. The output is a view on the input storage.
#[derive(Debug)]
pub struct Squeeze {
    base: OpBase,
    axes: Vec<i32>,
}

pub fn build(param: &OpParam, ws: &Workspace) -> UmbraResult<Box<dyn Operator>> {
    let base = OpBase::new(param, ws)?;
    let axes = base.args.repeated::<i32>("axes")?;
    base.check_arity(1..=1, 1)?;
    base.check_not_in_place()?;
    Ok(Box::new(Squeeze { base, axes }))
}

impl Squeeze {
    pub fn output_shape(&self, input: &[usize]) -> UmbraResult<TVec<usize>> {
        if self.axes.is_empty() {
            return Ok(input.iter().copied().filter(|&d| d != 1).collect());
        }
        let rank = input.len() as i32;
        let mut squeezed = tvec!();
        for &axis in &self.axes {
            ensure!(-rank <= axis && axis < rank, "Axis {} out of range for {:?}", axis, input);
            let axis = (if axis < 0 { axis + rank } else { axis }) as usize;
            ensure!(input[axis] == 1, "Can not squeeze axis {} of {:?}", axis, input);
            squeezed.push(axis);
        }
        Ok(input
            .iter()
            .enumerate()
            .filter(|(ix, _)| !squeezed.contains(ix))
            .map(|(_, &d)| d)
            .collect())
    }
}

impl Operator for Squeeze {
    fn base(&self) -> &OpBase {
        &self.base
    }

    fn forward(&mut self, ws: &Workspace) -> UmbraResult<()> {
        let bottom = ws.get(self.base.bottom(0)?)?;
        let mut top = ws.get_mut(self.base.top(0)?)?;
        let shape = self.output_shape(bottom.shape())?;
        ensure!(
            shape.iter().product::<usize>() == bottom.len(),
            "Squeezing {:?} to {:?} changes the element count",
            bottom.shape(),
            shape
        );
        top.share_from(&bottom, &shape)
    }
}
