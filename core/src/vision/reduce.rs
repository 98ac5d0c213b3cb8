use crate::internal::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOperation {
    Prod,
    Sum,
    Max,
    Min,
    Avg,
}

impl ReduceOperation {
    pub fn from_code(code: i32) -> UmbraResult<ReduceOperation> {
        use ReduceOperation::*;
        Ok(match code {
            0 => Prod,
            1 => Sum,
            2 => Max,
            3 => Min,
            4 => Avg,
            _ => bail!("Unknown reduce operation {}", code),
        })
    }
}

/// Precomputed offsets for reducing one input shape over a set of axes.
///
/// `list` enumerates the relative offsets of every index combination along
/// the reduced axes. `offsets` holds, for each output position, the input
/// offset of its first contributor.
#[derive(Debug, Clone, PartialEq)]
pub struct ReducePlan {
    pub input_shape: TVec<usize>,
    pub output_shape: TVec<usize>,
    list: Vec<usize>,
    offsets: Vec<usize>,
}

impl ReducePlan {
    /// `axes` must be canonical (non-negative, in range) and distinct.
    pub fn new(input_shape: &[usize], axes: &[usize]) -> UmbraResult<ReducePlan> {
        for (ix, &axis) in axes.iter().enumerate() {
            ensure!(axis < input_shape.len(), "Axis {} out of range for {:?}", axis, input_shape);
            ensure!(!axes[..ix].contains(&axis), "Axis {} reduced twice", axis);
            ensure!(input_shape[axis] > 0, "Can not reduce over empty axis {}", axis);
        }
        let strides = natural_strides(input_shape);
        let mut output_shape: TVec<usize> = input_shape.into();
        for &axis in axes {
            output_shape[axis] = 1;
        }
        let mut list = vec![0];
        for &axis in axes.iter().rev() {
            let num = list.len();
            for k in 1..input_shape[axis] {
                for j in 0..num {
                    list.push(list[j] + k * strides[axis]);
                }
            }
        }
        let count = output_shape.iter().product::<usize>();
        let offsets = (0..count)
            .map(|i| {
                let (mut offset, mut rest) = (0, i);
                for axis in (0..input_shape.len()).rev() {
                    offset += (rest % output_shape[axis]) * strides[axis];
                    rest /= output_shape[axis];
                }
                offset
            })
            .collect();
        Ok(ReducePlan { input_shape: input_shape.into(), output_shape, list, offsets })
    }

    pub fn reduced_len(&self) -> usize {
        self.list.len()
    }

    pub fn run(&self, op: ReduceOperation, input: &[f32], output: &mut [f32]) {
        debug_assert!(output.len() >= self.offsets.len());
        for (o, &base) in output.iter_mut().zip(self.offsets.iter()) {
            let values = self.list.iter().map(|&rel| input[base + rel]);
            *o = match op {
                ReduceOperation::Prod => values.product(),
                ReduceOperation::Sum => values.sum(),
                ReduceOperation::Max => values.fold(f32::NEG_INFINITY, f32::max),
                ReduceOperation::Min => values.fold(f32::INFINITY, f32::min),
                ReduceOperation::Avg => values.sum::<f32>() / self.list.len() as f32,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::collection::vec;
    use proptest::prelude::*;

    #[test]
    fn sum_over_middle_axis() {
        let input: Vec<f32> = (0..24).map(|x| x as f32).collect();
        let plan = ReducePlan::new(&[2, 3, 4], &[1]).unwrap();
        assert_eq!(&*plan.output_shape, &[2, 1, 4]);
        let mut output = vec![0f32; 8];
        plan.run(ReduceOperation::Sum, &input, &mut output);
        assert_eq!(output, [12., 15., 18., 21., 48., 51., 54., 57.]);
    }

    #[test]
    fn max_min_over_two_axes() {
        let input = [3f32, -1., 4., 1., -5., 9.];
        let plan = ReducePlan::new(&[3, 2], &[0, 1]).unwrap();
        assert_eq!(plan.reduced_len(), 6);
        let mut output = [0f32];
        plan.run(ReduceOperation::Max, &input, &mut output);
        assert_eq!(output, [9.]);
        plan.run(ReduceOperation::Min, &input, &mut output);
        assert_eq!(output, [-5.]);
        plan.run(ReduceOperation::Prod, &input, &mut output);
        assert_eq!(output, [540.]);
    }

    #[test]
    fn max_min_keep_infinities() {
        let plan = ReducePlan::new(&[2], &[0]).unwrap();
        let mut output = [0f32];
        plan.run(ReduceOperation::Max, &[f32::NEG_INFINITY; 2], &mut output);
        assert_eq!(output, [f32::NEG_INFINITY]);
        plan.run(ReduceOperation::Min, &[f32::INFINITY; 2], &mut output);
        assert_eq!(output, [f32::INFINITY]);
    }

    #[test]
    fn invalid_axes() {
        assert!(ReducePlan::new(&[2, 3], &[2]).is_err());
        assert!(ReducePlan::new(&[2, 3], &[1, 1]).is_err());
    }

    proptest! {
        #[test]
        fn no_axes_is_identity(shape in vec(1usize..4, 0..4)) {
            let len = shape.iter().product::<usize>();
            let input: Vec<f32> = (0..len).map(|x| x as f32 * 0.5 - 1.).collect();
            let plan = ReducePlan::new(&shape, &[]).unwrap();
            let mut output = vec![0f32; len];
            plan.run(ReduceOperation::Sum, &input, &mut output);
            prop_assert_eq!(output, input);
        }

        #[test]
        fn average_of_constant(shape in vec(1usize..4, 1..4), v in -10f32..10f32) {
            let len = shape.iter().product::<usize>();
            let axes: Vec<usize> = (0..shape.len()).collect();
            let plan = ReducePlan::new(&shape, &axes).unwrap();
            let mut output = [0f32];
            plan.run(ReduceOperation::Avg, &vec![v; len], &mut output);
            assert_abs_diff_eq!(output[0], v, epsilon = 1e-4);
        }
    }
}
