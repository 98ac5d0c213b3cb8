use crate::internal::*;

/// Copy one concatenation input into its slot of the output.
///
/// Tensors are seen as `[num_concats, axis, concat_size]`. The input has
/// `bottom_axis` items along the concatenation axis, the output has
/// `top_axis`, and the input lands at `offset_axis`.
pub fn concat<T: Datum>(
    input: &[T],
    num_concats: usize,
    concat_size: usize,
    top_axis: usize,
    bottom_axis: usize,
    offset_axis: usize,
    output: &mut [T],
) {
    let chunk = bottom_axis * concat_size;
    for n in 0..num_concats {
        let dst = (n * top_axis + offset_axis) * concat_size;
        output[dst..][..chunk].copy_from_slice(&input[n * chunk..][..chunk]);
    }
}

/// Transpose axes.
///
/// `old_steps` are the input strides, `new_steps` the output strides, and
/// output axis `j` reads input axis `order[j]`.
pub fn permute<T: Datum>(
    input: &[T],
    order: &[usize],
    old_steps: &[usize],
    new_steps: &[usize],
    output: &mut [T],
) {
    for (i, o) in output.iter_mut().enumerate() {
        let (mut old_ix, mut rest) = (0, i);
        for (j, &axis) in order.iter().enumerate() {
            old_ix += (rest / new_steps[j]) * old_steps[axis];
            rest %= new_steps[j];
        }
        *o = input[old_ix];
    }
}

/// Space-to-depth: `[b, c, h, w]` to `[b, c * s * s, h / s, w / s]`.
///
/// Output channel `c` reads input channel `c % in_c` at sub-position
/// `c / in_c` of each `s x s` block.
pub fn reorg<T: Datum>(
    input: &[T],
    (batch, in_c, in_h, in_w): (usize, usize, usize, usize),
    stride: usize,
    output: &mut [T],
) {
    let out_c = in_c * stride * stride;
    let (out_h, out_w) = (in_h / stride, in_w / stride);
    for b in 0..batch {
        for c in 0..out_c {
            let c_in = c % in_c;
            let area = c / in_c;
            for h in 0..out_h {
                for w in 0..out_w {
                    let h_in = h * stride + area / stride;
                    let w_in = w * stride + area % stride;
                    let in_ix = ((b * in_c + c_in) * in_h + h_in) * in_w + w_in;
                    let out_ix = ((b * out_c + c) * out_h + h) * out_w + w;
                    output[out_ix] = input[in_ix];
                }
            }
        }
    }
}
