use crate::internal::*;

/// Spatial parameters of a 2D convolution window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, new)]
pub struct ConvGeometry {
    pub kernel_h: usize,
    pub kernel_w: usize,
    pub stride_h: usize,
    pub stride_w: usize,
    pub pad_h: usize,
    pub pad_w: usize,
    pub dilation: usize,
}

impl ConvGeometry {
    pub fn square(kernel: usize, stride: usize, pad: usize, dilation: usize) -> ConvGeometry {
        ConvGeometry::new(kernel, kernel, stride, stride, pad, pad, dilation)
    }

    /// Output height and width for an input of `in_h x in_w`.
    pub fn output_size(&self, in_h: usize, in_w: usize) -> UmbraResult<(usize, usize)> {
        Ok((
            conv_out_size(in_h, self.kernel_h, self.stride_h, self.pad_h, self.dilation)?,
            conv_out_size(in_w, self.kernel_w, self.stride_w, self.pad_w, self.dilation)?,
        ))
    }

    pub fn kernel_len(&self) -> usize {
        self.kernel_h * self.kernel_w
    }
}

/// `floor((input + 2 * pad - dilation * (kernel - 1) - 1) / stride) + 1`
pub fn conv_out_size(
    input: usize,
    kernel: usize,
    stride: usize,
    pad: usize,
    dilation: usize,
) -> UmbraResult<usize> {
    ensure!(
        kernel > 0 && stride > 0 && dilation > 0,
        "Invalid convolution window: kernel {}, stride {}, dilation {}",
        kernel,
        stride,
        dilation
    );
    let extent = dilation * (kernel - 1) + 1;
    ensure!(
        input + 2 * pad >= extent,
        "Kernel extent {} exceeds padded input size {}",
        extent,
        input + 2 * pad
    );
    Ok((input + 2 * pad - extent) / stride + 1)
}

#[inline]
fn source_coord(out: usize, stride: usize, k: usize, dilation: usize, pad: usize) -> isize {
    (out * stride + k * dilation) as isize - pad as isize
}

/// Rearrange convolution windows of one image into columns.
///
/// `input` is `[in_c, in_h, in_w]`, `col` receives
/// `[in_c * kernel_h * kernel_w, out_h * out_w]`. Positions falling in the
/// padding read as `zero_point`.
pub fn im2col<T: Datum>(
    input: &[T],
    (in_c, in_h, in_w): (usize, usize, usize),
    geo: &ConvGeometry,
    (out_h, out_w): (usize, usize),
    zero_point: T,
    col: &mut [T],
) {
    let spatial = in_h * in_w;
    debug_assert!(input.len() >= in_c * spatial);
    debug_assert!(col.len() >= in_c * geo.kernel_len() * out_h * out_w);
    let mut ix = 0;
    for c in 0..in_c {
        let channel = &input[c * spatial..][..spatial];
        for kh in 0..geo.kernel_h {
            for kw in 0..geo.kernel_w {
                for h in 0..out_h {
                    let row = source_coord(h, geo.stride_h, kh, geo.dilation, geo.pad_h);
                    if row < 0 || row as usize >= in_h {
                        col[ix..][..out_w].iter_mut().for_each(|x| *x = zero_point);
                        ix += out_w;
                        continue;
                    }
                    let line = &channel[row as usize * in_w..][..in_w];
                    for w in 0..out_w {
                        let column = source_coord(w, geo.stride_w, kw, geo.dilation, geo.pad_w);
                        col[ix] = if column < 0 || column as usize >= in_w {
                            zero_point
                        } else {
                            line[column as usize]
                        };
                        ix += 1;
                    }
                }
            }
        }
    }
}

/// Depthwise convolution: one kernel per channel, no column buffer.
///
/// `weight` is `[channels, kernel_h, kernel_w]`, `bias` has one value per
/// channel.
pub fn depthwise(
    input: &[f32],
    (batch, channels, in_h, in_w): (usize, usize, usize, usize),
    weight: &[f32],
    bias: Option<&[f32]>,
    geo: &ConvGeometry,
    (out_h, out_w): (usize, usize),
    output: &mut [f32],
) {
    let kernel_len = geo.kernel_len();
    debug_assert!(weight.len() >= channels * kernel_len);
    debug_assert!(output.len() >= batch * channels * out_h * out_w);
    for b in 0..batch {
        for c in 0..channels {
            let plane = &input[(b * channels + c) * in_h * in_w..][..in_h * in_w];
            let out_plane = &mut output[(b * channels + c) * out_h * out_w..][..out_h * out_w];
            let kernel = &weight[c * kernel_len..][..kernel_len];
            for h in 0..out_h {
                for w in 0..out_w {
                    let mut sum = 0f32;
                    for kh in 0..geo.kernel_h {
                        let row = source_coord(h, geo.stride_h, kh, geo.dilation, geo.pad_h);
                        if row < 0 || row as usize >= in_h {
                            continue;
                        }
                        for kw in 0..geo.kernel_w {
                            let column = source_coord(w, geo.stride_w, kw, geo.dilation, geo.pad_w);
                            if column >= 0 && (column as usize) < in_w {
                                sum += plane[row as usize * in_w + column as usize]
                                    * kernel[kh * geo.kernel_w + kw];
                            }
                        }
                    }
                    if let Some(bias) = bias {
                        sum += bias[c];
                    }
                    out_plane[h * out_w + w] = sum;
                }
            }
        }
    }
}
