/// Floor added to squared norms before the square root.
pub const NORMALIZE_EPS: f32 = 1e-10;

/// L2 normalisation of `[batch, channels, spatial]`.
///
/// With `across_spatial`, each batch item is divided by the norm of all its
/// values. Otherwise each spatial position is divided by the norm of its
/// channel vector. The result is then multiplied by `scale`, per channel or
/// by `scale[0]` if `channel_shared`.
pub fn normalize(
    input: &[f32],
    (batch, channels, spatial): (usize, usize, usize),
    across_spatial: bool,
    scale: Option<(&[f32], bool)>,
    output: &mut [f32],
) {
    let item = channels * spatial;
    debug_assert!(input.len() >= batch * item && output.len() >= batch * item);
    for b in 0..batch {
        let x = &input[b * item..][..item];
        let y = &mut output[b * item..][..item];
        if across_spatial {
            let norm = (x.iter().map(|v| v * v).sum::<f32>() + NORMALIZE_EPS).sqrt();
            y.iter_mut().zip(x.iter()).for_each(|(y, x)| *y = x / norm);
        } else {
            for s in 0..spatial {
                let sum: f32 = (0..channels).map(|c| x[c * spatial + s].powi(2)).sum();
                let norm = (sum + NORMALIZE_EPS).sqrt();
                for c in 0..channels {
                    y[c * spatial + s] = x[c * spatial + s] / norm;
                }
            }
        }
        if let Some((scale, channel_shared)) = scale {
            for c in 0..channels {
                let factor = if channel_shared { scale[0] } else { scale[c] };
                y[c * spatial..][..spatial].iter_mut().for_each(|v| *v *= factor);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn across_spatial() {
        let input = [3f32, 0., 0., 4.];
        let mut output = [0f32; 4];
        normalize(&input, (1, 2, 2), true, None, &mut output);
        assert_abs_diff_eq!(&output[..], &[0.6f32, 0., 0., 0.8][..], epsilon = 1e-6);
    }

    #[test]
    fn per_position_with_channel_scale() {
        // two channels, two positions: (3, 4) and (0, 2)
        let input = [3f32, 0., 4., 2.];
        let mut output = [0f32; 4];
        normalize(&input, (1, 2, 2), false, Some((&[1., 10.], false)), &mut output);
        assert_abs_diff_eq!(&output[..], &[0.6f32, 0., 8., 10.][..], epsilon = 1e-5);
    }
}
