use crate::internal::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Activation {
    /// Per-channel (or shared) slope read from a tensor.
    PRelu,
    Relu,
    Leaky(f32),
    Sigmoid,
    SoftPlus,
    Tanh,
}

impl Activation {
    pub fn from_code(code: i32, slope: f32) -> UmbraResult<Activation> {
        use Activation::*;
        Ok(match code {
            0 => PRelu,
            1 => Relu,
            2 => Leaky(slope),
            3 => Sigmoid,
            4 => SoftPlus,
            5 => Tanh,
            _ => bail!("Unknown activation type {}", code),
        })
    }

    #[inline]
    pub fn eval(&self, x: f32) -> f32 {
        match self {
            Activation::Relu => x.max(0.),
            Activation::Leaky(slope) => {
                if x > 0. {
                    x
                } else {
                    slope * x
                }
            }
            Activation::Sigmoid => 1. / (1. + (-x).exp()),
            Activation::SoftPlus => (1. + x.exp()).ln(),
            Activation::Tanh => {
                let exp_2x = (2. * x).exp();
                (exp_2x - 1.) / (exp_2x + 1.)
            }
            Activation::PRelu => x,
        }
    }
}

/// Apply a slope-free activation in place. `PRelu` goes through `prelu`.
pub fn activate(data: &mut [f32], activation: Activation) {
    data.iter_mut().for_each(|x| *x = activation.eval(*x));
}

/// Parametric relu over `[batch, channels, inner...]`.
///
/// `slope` has one value per channel, or a single one if `channel_shared`.
pub fn prelu(
    data: &mut [f32],
    (channels, inner): (usize, usize),
    channel_shared: bool,
    slope: &[f32],
) {
    let div_factor = if channel_shared { channels } else { 1 };
    for (i, x) in data.iter_mut().enumerate() {
        let c = (i / inner) % channels / div_factor;
        if *x <= 0. {
            *x *= slope[c];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn kinds() {
        let mut data = [-2f32, 0., 3.];
        activate(&mut data, Activation::Relu);
        assert_eq!(data, [0., 0., 3.]);
        let mut data = [-2f32, 3.];
        activate(&mut data, Activation::from_code(2, 0.1).unwrap());
        assert_abs_diff_eq!(data[0], -0.2);
        assert_eq!(data[1], 3.);
        assert_abs_diff_eq!(Activation::Sigmoid.eval(0.), 0.5);
        assert_abs_diff_eq!(Activation::Tanh.eval(0.5), 0.5f32.tanh(), epsilon = 1e-6);
        assert_abs_diff_eq!(Activation::SoftPlus.eval(0.), 2f32.ln());
        assert!(Activation::from_code(6, 0.).is_err());
    }

    #[test]
    fn prelu_per_channel_and_shared() {
        let mut data = [-1f32, -1., -1., -1.];
        prelu(&mut data, (2, 2), false, &[0.5, 2.]);
        assert_eq!(data, [-0.5, -0.5, -2., -2.]);
        let mut data = [-1f32, 1., -1., 1.];
        prelu(&mut data, (2, 2), true, &[0.25]);
        assert_eq!(data, [-0.25, 1., -0.25, 1.]);
    }
}
