use crate::internal::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperation {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Max,
    Min,
}

impl BinaryOperation {
    pub fn from_code(code: i32) -> UmbraResult<BinaryOperation> {
        use BinaryOperation::*;
        Ok(match code {
            0 => Add,
            1 => Sub,
            2 => Mul,
            3 => Div,
            4 => Pow,
            5 => Max,
            6 => Min,
            _ => bail!("Unknown binary operation {}", code),
        })
    }

    /// IEEE semantics: division by zero gives an infinity or NaN.
    #[inline]
    pub fn eval(&self, a: f32, b: f32) -> f32 {
        match self {
            BinaryOperation::Add => a + b,
            BinaryOperation::Sub => a - b,
            BinaryOperation::Mul => a * b,
            BinaryOperation::Div => a / b,
            BinaryOperation::Pow => a.powf(b),
            BinaryOperation::Max => {
                if a < b {
                    b
                } else {
                    a
                }
            }
            BinaryOperation::Min => {
                if b < a {
                    b
                } else {
                    a
                }
            }
        }
    }
}

pub fn binary_scalar(a: &[f32], b: f32, op: BinaryOperation, output: &mut [f32]) {
    output.iter_mut().zip(a.iter()).for_each(|(o, &a)| *o = op.eval(a, b));
}

pub fn binary(a: &[f32], b: &[f32], op: BinaryOperation, output: &mut [f32]) {
    debug_assert!(a.len() == b.len() && a.len() == output.len());
    for ((o, &a), &b) in output.iter_mut().zip(a.iter()).zip(b.iter()) {
        *o = op.eval(a, b);
    }
}

/// Elementwise operation between two operands of broadcast-compatible shapes.
///
/// All three shapes have the same rank (see `broadcast_shapes`). Each output
/// index is decomposed against `out_shape`, and every coordinate reduced
/// modulo the operand dimension.
pub fn broadcast_binary(
    a: &[f32],
    a_shape: &[usize],
    b: &[f32],
    b_shape: &[usize],
    op: BinaryOperation,
    out_shape: &[usize],
    output: &mut [f32],
) {
    let rank = out_shape.len();
    debug_assert!(a_shape.len() == rank && b_shape.len() == rank);
    let a_strides = natural_strides(a_shape);
    let b_strides = natural_strides(b_shape);
    for (i, o) in output.iter_mut().enumerate() {
        let (mut a_ix, mut b_ix, mut rest) = (0, 0, i);
        for axis in (0..rank).rev() {
            let coord = rest % out_shape[axis];
            a_ix += (coord % a_shape[axis]) * a_strides[axis];
            b_ix += (coord % b_shape[axis]) * b_strides[axis];
            rest /= out_shape[axis];
        }
        *o = op.eval(a[a_ix], b[b_ix]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ieee_division() {
        assert_eq!(BinaryOperation::Div.eval(1., 0.), f32::INFINITY);
        assert!(BinaryOperation::Div.eval(0., 0.).is_nan());
        assert_eq!(BinaryOperation::Pow.eval(2., 3.), 8.);
        assert_eq!(BinaryOperation::Min.eval(2., -3.), -3.);
        assert!(BinaryOperation::from_code(7).is_err());
    }

    #[test]
    fn row_against_column() {
        let a = [1f32, 2., 3.];
        let b = [10f32, 20.];
        let (a_shape, b_shape, out_shape) = broadcast_shapes(&[1, 3], &[2, 1]).unwrap();
        let mut output = [0f32; 6];
        broadcast_binary(&a, &a_shape, &b, &b_shape, BinaryOperation::Add, &out_shape, &mut output);
        assert_eq!(output, [11., 12., 13., 21., 22., 23.]);
    }

    #[test]
    fn lower_rank_operand() {
        let a: Vec<f32> = (0..6).map(|x| x as f32).collect();
        let b = [2f32, 3., 4.];
        let (a_shape, b_shape, out_shape) = broadcast_shapes(&[2, 3], &[3]).unwrap();
        let mut output = [0f32; 6];
        broadcast_binary(&a, &a_shape, &b, &b_shape, BinaryOperation::Mul, &out_shape, &mut output);
        assert_eq!(output, [0., 3., 8., 6., 12., 20.]);
    }

    #[test]
    fn scalar() {
        let mut output = [0f32; 3];
        binary_scalar(&[1., 2., 3.], 2., BinaryOperation::Sub, &mut output);
        assert_eq!(output, [-1., 0., 1.]);
    }
}
