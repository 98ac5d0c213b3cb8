use crate::internal::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolMode {
    Max,
    Ave,
}

impl PoolMode {
    pub fn from_code(code: i32) -> UmbraResult<PoolMode> {
        match code {
            0 => Ok(PoolMode::Max),
            1 => Ok(PoolMode::Ave),
            _ => bail!("Unknown pooling mode {}", code),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, new)]
pub struct PoolGeometry {
    pub kernel_h: usize,
    pub kernel_w: usize,
    pub stride_h: usize,
    pub stride_w: usize,
    pub pad_h: usize,
    pub pad_w: usize,
}

impl PoolGeometry {
    pub fn output_size(&self, in_h: usize, in_w: usize, full: bool) -> UmbraResult<(usize, usize)> {
        Ok((
            pool_out_size(in_h, self.kernel_h, self.stride_h, self.pad_h, full)?,
            pool_out_size(in_w, self.kernel_w, self.stride_w, self.pad_w, full)?,
        ))
    }
}

/// Output extent of a pooling window sweep.
///
/// `full` rounds the window count up, so that the last window may hang past
/// the input. A window starting inside the right padding is then dropped.
pub fn pool_out_size(
    input: usize,
    kernel: usize,
    stride: usize,
    pad: usize,
    full: bool,
) -> UmbraResult<usize> {
    ensure!(
        kernel > 0 && stride > 0,
        "Invalid pooling window: kernel {}, stride {}",
        kernel,
        stride
    );
    ensure!(input > 0, "Can not pool over an empty input");
    ensure!(
        input + 2 * pad >= kernel,
        "Pooling kernel {} exceeds padded input size {}",
        kernel,
        input + 2 * pad
    );
    let span = input + 2 * pad - kernel;
    let mut out = if full { span.div_ceil(stride) + 1 } else { span / stride + 1 };
    if pad > 0 && (out - 1) * stride >= input + pad {
        out -= 1;
    }
    Ok(out)
}

/// Max or average pooling over `[batch, channels, in_h, in_w]`.
///
/// The average divides by the window area clipped to the padded input, not
/// by the number of input values actually summed: a corner window that only
/// overlaps one real value still divides by its full area.
pub fn pooling(
    input: &[f32],
    (batch, channels, in_h, in_w): (usize, usize, usize, usize),
    geo: &PoolGeometry,
    mode: PoolMode,
    (out_h, out_w): (usize, usize),
    output: &mut [f32],
) {
    debug_assert!(input.len() >= batch * channels * in_h * in_w);
    debug_assert!(output.len() >= batch * channels * out_h * out_w);
    let (in_h_i, in_w_i) = (in_h as isize, in_w as isize);
    for (plane, out_plane) in input
        .chunks(in_h * in_w)
        .zip(output.chunks_mut(out_h * out_w))
        .take(batch * channels)
    {
        for h in 0..out_h {
            for w in 0..out_w {
                let mut h_start = (h * geo.stride_h) as isize - geo.pad_h as isize;
                let mut w_start = (w * geo.stride_w) as isize - geo.pad_w as isize;
                let mut h_end = (h_start + geo.kernel_h as isize).min(in_h_i + geo.pad_h as isize);
                let mut w_end = (w_start + geo.kernel_w as isize).min(in_w_i + geo.pad_w as isize);
                let pool_size = ((h_end - h_start) * (w_end - w_start)) as f32;
                h_start = h_start.max(0);
                w_start = w_start.max(0);
                h_end = h_end.min(in_h_i);
                w_end = w_end.min(in_w_i);
                let mut max = f32::MIN;
                let mut sum = 0f32;
                for ki in h_start..h_end {
                    for kj in w_start..w_end {
                        let value = plane[ki as usize * in_w + kj as usize];
                        if value > max {
                            max = value;
                        }
                        sum += value;
                    }
                }
                out_plane[h * out_w + w] = match mode {
                    PoolMode::Max => max,
                    PoolMode::Ave => sum / pool_size,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn out_size_rounds_up_when_full() {
        assert_eq!(pool_out_size(5, 2, 2, 0, true).unwrap(), 3);
        assert_eq!(pool_out_size(5, 2, 2, 0, false).unwrap(), 2);
        assert_eq!(pool_out_size(4, 2, 2, 1, true).unwrap(), 3);
        // a fourth window would start in the right padding
        assert_eq!(pool_out_size(4, 3, 2, 2, true).unwrap(), 3);
        assert!(pool_out_size(1, 4, 1, 0, true).is_err());
    }

    #[test]
    fn average_with_padding_divides_by_window_area() {
        let input = [1f32; 16];
        let geo = PoolGeometry::new(2, 2, 2, 2, 1, 1);
        let (out_h, out_w) = geo.output_size(4, 4, true).unwrap();
        assert_eq!((out_h, out_w), (3, 3));
        let mut output = [0f32; 9];
        pooling(&input, (1, 1, 4, 4), &geo, PoolMode::Ave, (3, 3), &mut output);
        let expected = [0.25, 0.5, 0.25, 0.5, 1.0, 0.5, 0.25, 0.5, 0.25];
        for (o, e) in output.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(o, e, epsilon = 1e-6);
        }
        assert!(output[0] < 1.0);
    }

    #[test]
    fn max_ignores_padding() {
        let input = [-4f32, -3., -2., -1.];
        let geo = PoolGeometry::new(2, 2, 1, 1, 1, 1);
        let mut output = [0f32; 9];
        pooling(&input, (1, 1, 2, 2), &geo, PoolMode::Max, (3, 3), &mut output);
        assert_eq!(output, [-4., -3., -3., -2., -1., -1., -2., -1., -1.]);
    }

    #[test]
    fn global_average() {
        let input: Vec<f32> = (0..2 * 9).map(|x| x as f32).collect();
        let geo = PoolGeometry::new(3, 3, 1, 1, 0, 0);
        let mut output = [0f32; 2];
        pooling(&input, (1, 2, 3, 3), &geo, PoolMode::Ave, (1, 1), &mut output);
        assert_eq!(output, [4., 13.]);
    }
}
