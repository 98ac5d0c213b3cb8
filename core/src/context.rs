//! Execution context threaded through every kernel call.
use crate::internal::*;
use ndarray::linalg::general_mat_mul;
use ndarray::{ArrayView2, ArrayViewMut2};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Device {
    #[default]
    Cpu,
}

/// Owner of the compute resources the kernels run on.
///
/// The native context only knows the host CPU. It has no device memory,
/// so device-resident inputs are not supported.
#[derive(Debug, Clone, Default)]
pub struct DeviceContext {
    device: Device,
}

impl DeviceContext {
    pub fn cpu() -> DeviceContext {
        DeviceContext { device: Device::Cpu }
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn supports_device_input(&self) -> bool {
        match self.device {
            Device::Cpu => false,
        }
    }

    /// `c = alpha * op(a) * op(b) + beta * c`, row-major.
    ///
    /// `op(a)` is `m x k`, `op(b)` is `k x n`, `c` is `m x n`. With `trans_a`
    /// set, `a` is stored as `k x m` (same for `b`).
    #[allow(clippy::too_many_arguments)]
    pub fn sgemm(
        &self,
        trans_a: bool,
        trans_b: bool,
        m: usize,
        n: usize,
        k: usize,
        alpha: f32,
        a: &[f32],
        b: &[f32],
        beta: f32,
        c: &mut [f32],
    ) -> UmbraResult<()> {
        ensure!(
            a.len() >= m * k && b.len() >= k * n && c.len() >= m * n,
            "sgemm operands too short for m={} n={} k={}",
            m,
            n,
            k
        );
        let a = if trans_a {
            ArrayView2::from_shape((k, m), &a[..m * k])?.reversed_axes()
        } else {
            ArrayView2::from_shape((m, k), &a[..m * k])?
        };
        let b = if trans_b {
            ArrayView2::from_shape((n, k), &b[..k * n])?.reversed_axes()
        } else {
            ArrayView2::from_shape((k, n), &b[..k * n])?
        };
        let mut c = ArrayViewMut2::from_shape((m, n), &mut c[..m * n])?;
        general_mat_mul(alpha, &a, &b, beta, &mut c);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sgemm_plain() {
        let ctx = DeviceContext::cpu();
        let a = [1f32, 2., 3., 4., 5., 6.];
        let b = [1f32, 0., 0., 1., 1., 1.];
        let mut c = [0f32; 4];
        ctx.sgemm(false, false, 2, 2, 3, 1.0, &a, &b, 0.0, &mut c).unwrap();
        assert_eq!(c, [4., 5., 10., 11.]);
    }

    #[test]
    fn sgemm_transposed_accumulates() {
        let ctx = DeviceContext::cpu();
        // a stored as 3x2, used as its 2x3 transpose
        let a = [1f32, 4., 2., 5., 3., 6.];
        let b = [1f32, 1., 1.];
        let mut c = [1f32, 1.];
        ctx.sgemm(true, false, 2, 1, 3, 1.0, &a, &b, 1.0, &mut c).unwrap();
        assert_eq!(c, [7., 16.]);
    }

    #[test]
    fn cpu_has_no_device_input() {
        assert!(!DeviceContext::default().supports_device_input());
        assert_eq!(DeviceContext::default().device(), Device::Cpu);
    }
}
