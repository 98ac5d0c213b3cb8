use crate::internal::*;
use crate::vision::{self, Activation, ConvGeometry};

/// 2D convolution over NCHW, with optional bias and fused relu.
///
/// Bottoms are the input, the weight `[num_output, in_c / group, kh, kw]`
/// and, with `bias_term`, the bias `[num_output]`.
#[derive(Debug)]
pub struct Conv {
    base: OpBase,
    num_output: usize,
    geometry: ConvGeometry,
    group: usize,
    bias_term: bool,
    activation: Option<Activation>,
}

/// Reads `name`, or `name_h` and `name_w`, falling back to `default`.
fn hw_arg(
    args: &ArgumentHelper,
    name: &str,
    default: Option<usize>,
) -> UmbraResult<(usize, usize)> {
    if let Some(v) = args.single_opt::<usize>(name)? {
        return Ok((v, v));
    }
    let h = args.single_opt::<usize>(&format!("{}_h", name))?;
    let w = args.single_opt::<usize>(&format!("{}_w", name))?;
    match (h, w, default) {
        (Some(h), Some(w), _) => Ok((h, w)),
        (h, w, Some(d)) => Ok((h.unwrap_or(d), w.unwrap_or(d))),
        _ => bail!("Required argument {} (or {}_h and {}_w) not found", name, name, name),
    }
}

pub fn build(param: &OpParam, ws: &Workspace) -> UmbraResult<Box<dyn Operator>> {
    let base = OpBase::new(param, ws)?;
    let args = &base.args;
    let num_output = args.required::<usize>("num_output")?;
    let (kernel_h, kernel_w) = hw_arg(args, "kernel_size", None)?;
    let (stride_h, stride_w) = hw_arg(args, "stride", Some(1))?;
    let (pad_h, pad_w) = hw_arg(args, "pad", Some(0))?;
    let dilation = args.single::<usize>("dilation", 1)?;
    let group = args.single::<usize>("group", 1)?;
    let bias_term = args.single("bias_term", true)?;
    let activation = match args.single::<i32>("type", 0)? {
        0 => None,
        1 => Some(Activation::Relu),
        other => bail!("Unsupported fused activation {}", other),
    };
    ensure!(
        group > 0 && num_output % group == 0,
        "{} outputs can not be split in {} groups",
        num_output,
        group
    );
    base.check_arity(2 + bias_term as usize..=2 + bias_term as usize, 1)?;
    base.check_not_in_place()?;
    let geometry =
        ConvGeometry::new(kernel_h, kernel_w, stride_h, stride_w, pad_h, pad_w, dilation);
    Ok(Box::new(Conv { base, num_output, geometry, group, bias_term, activation }))
}

impl Conv {
    pub fn is_depthwise(&self, in_c: usize) -> bool {
        self.group == in_c && self.group == self.num_output
    }
}

impl Operator for Conv {
    fn base(&self) -> &OpBase {
        &self.base
    }

    fn forward(&mut self, ws: &Workspace) -> UmbraResult<()> {
        let bottom = ws.get(self.base.bottom(0)?)?;
        let weight = ws.get(self.base.bottom(1)?)?;
        let bias = if self.bias_term { Some(ws.get(self.base.bottom(2)?)?) } else { None };
        let mut top = ws.get_mut(self.base.top(0)?)?;

        let &[batch, in_c, in_h, in_w] = bottom.shape() else {
            bail!("Conv expects NCHW input, got {:?}", bottom.shape())
        };
        ensure!(
            in_c % self.group == 0,
            "{} channels can not be split in {} groups",
            in_c,
            self.group
        );
        let geo = &self.geometry;
        let (out_h, out_w) = geo.output_size(in_h, in_w)?;
        top.reshape(&[batch, self.num_output, out_h, out_w])?;

        let kernel_dim = geo.kernel_len() * in_c / self.group;
        ensure!(
            weight.len() == self.num_output * kernel_dim,
            "Weight of shape {:?} does not fit {} outputs of {} values",
            weight.shape(),
            self.num_output,
            kernel_dim
        );
        if let Some(bias) = &bias {
            ensure!(
                bias.len() == self.num_output,
                "Bias of shape {:?} for {} outputs",
                bias.shape(),
                self.num_output
            );
        }

        let input = bottom.as_slice::<f32>()?;
        let weight = weight.as_slice::<f32>()?;
        let bias = bias.as_ref().map(|b| b.as_slice::<f32>()).transpose()?;
        let output = top.as_slice_mut::<f32>()?;

        if self.is_depthwise(in_c) {
            let dims = (batch, in_c, in_h, in_w);
            vision::depthwise(input, dims, weight, bias, geo, (out_h, out_w), output);
        } else {
            let out_spatial = out_h * out_w;
            let col_len = kernel_dim * self.group * out_spatial;
            let temp_len = col_len + if bias.is_some() { out_spatial } else { 0 };
            ws.grow_temp_buffer(temp_len * std::mem::size_of::<f32>())?;
            let mut temp = ws.temp_buffer::<f32>(temp_len)?;
            let (col, ones) = temp.split_at_mut(col_len);
            ones.fill(1.0);

            let m = self.num_output / self.group;
            let weight_offset = m * kernel_dim;
            let col_offset = kernel_dim * out_spatial;
            let output_offset = m * out_spatial;
            let bottom_num = in_c * in_h * in_w;
            let top_num = self.num_output * out_spatial;
            let ctx = ws.ctx();
            for b in 0..batch {
                vision::im2col(
                    &input[b * bottom_num..][..bottom_num],
                    (in_c, in_h, in_w),
                    geo,
                    (out_h, out_w),
                    0.0,
                    col,
                );
                let output = &mut output[b * top_num..][..top_num];
                for g in 0..self.group {
                    ctx.sgemm(
                        false,
                        false,
                        m,
                        out_spatial,
                        kernel_dim,
                        1.0,
                        &weight[weight_offset * g..][..weight_offset],
                        &col[col_offset * g..][..col_offset],
                        0.0,
                        &mut output[output_offset * g..][..output_offset],
                    )?;
                }
                if let Some(bias) = bias {
                    let m = self.num_output;
                    ctx.sgemm(false, false, m, out_spatial, 1, 1.0, bias, ones, 1.0, output)?;
                }
            }
        }
        if let Some(activation) = self.activation {
            vision::activate(output, activation);
        }
        Ok(())
    }
}
