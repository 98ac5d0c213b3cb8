use crate::internal::*;

/// `output = input * scale[c] + bias[c]`, `c = (i / inner_dim) % scale_dim`.
pub fn scale(
    input: &[f32],
    scale: &[f32],
    bias: Option<&[f32]>,
    (scale_dim, inner_dim): (usize, usize),
    output: &mut [f32],
) {
    for (i, (o, x)) in output.iter_mut().zip(input.iter()).enumerate() {
        let c = (i / inner_dim) % scale_dim;
        *o = x * scale[c] + bias.map(|b| b[c]).unwrap_or(0.);
    }
}

/// `output = input + bias[c]`, `c = (i / inner_dim) % bias_dim`.
pub fn bias(
    input: &[f32],
    bias: &[f32],
    (bias_dim, inner_dim): (usize, usize),
    output: &mut [f32],
) {
    for (i, (o, x)) in output.iter_mut().zip(input.iter()).enumerate() {
        *o = x + bias[(i / inner_dim) % bias_dim];
    }
}

#[derive(Debug, Clone, Copy, PartialEq, new)]
pub struct LrnParams {
    pub size: usize,
    pub alpha: f32,
    pub beta: f32,
    pub k: f32,
}

/// Local response normalisation across channels.
///
/// `scale` receives `k + alpha / size * sum(x^2)` over a window of `size`
/// channels centered on each value; the output is `x * scale^-beta`.
pub fn lrn(
    input: &[f32],
    (batch, channels, in_h, in_w): (usize, usize, usize, usize),
    params: &LrnParams,
    scale: &mut [f32],
    output: &mut [f32],
) {
    let step = in_h * in_w;
    let size = params.size as isize;
    let channels_i = channels as isize;
    let pre_pad = (size - 1) / 2;
    let post_pad = size - pre_pad - 1;
    let alpha_over_size = params.alpha / params.size as f32;
    for b in 0..batch {
        for s in 0..step {
            let offset = b * channels * step + s;
            let x = |c: isize| input[offset + c as usize * step];
            let mut accum = 0f32;
            let mut head = 0isize;
            while head < post_pad && head < channels_i {
                accum += x(head) * x(head);
                head += 1;
            }
            while head < channels_i + post_pad {
                if head < channels_i {
                    accum += x(head) * x(head);
                }
                if head - size >= 0 {
                    accum -= x(head - size) * x(head - size);
                }
                if head >= post_pad {
                    scale[offset + (head - post_pad) as usize * step] =
                        params.k + accum * alpha_over_size;
                }
                head += 1;
            }
        }
    }
    let count = batch * channels * step;
    for ((o, x), s) in output.iter_mut().zip(input.iter()).zip(scale.iter()).take(count) {
        *o = x * s.powf(-params.beta);
    }
}

/// Mean subtraction and scaling of `[batch, channels, spatial]`.
///
/// `mean` holds a single value, one per channel, or one per channel and
/// spatial position. An empty `mean` only scales.
pub fn data_transform(
    input: &[f32],
    (channels, spatial): (usize, usize),
    scale: f32,
    mean: &[f32],
    output: &mut [f32],
) -> UmbraResult<()> {
    let out = output.iter_mut().zip(input.iter()).enumerate();
    match mean.len() {
        0 => out.for_each(|(_, (o, x))| *o = x * scale),
        1 => out.for_each(|(_, (o, x))| *o = (x - mean[0]) * scale),
        n if n == channels => {
            out.for_each(|(i, (o, x))| *o = (x - mean[(i / spatial) % channels]) * scale)
        }
        n if n == channels * spatial => {
            out.for_each(|(i, (o, x))| *o = (x - mean[i % (channels * spatial)]) * scale)
        }
        n => bail!("{} mean values do not fit {} channels of {} values", n, channels, spatial),
    }
    Ok(())
}
