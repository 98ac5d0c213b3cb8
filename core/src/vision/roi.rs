use crate::internal::*;

/// Max pooling of regions of interest onto a fixed grid.
///
/// `rois` holds 5 values per region: batch index then `x1, y1, x2, y2` in
/// image coordinates. Output is `[num_rois, channels, pooled_h, pooled_w]`.
/// An empty cell yields 0.
pub fn roi_pooling(
    input: &[f32],
    (batch, channels, in_h, in_w): (usize, usize, usize, usize),
    rois: &[f32],
    (pooled_h, pooled_w): (usize, usize),
    spatial_scale: f32,
    output: &mut [f32],
) -> UmbraResult<()> {
    let num_rois = rois.len() / 5;
    debug_assert!(output.len() >= num_rois * channels * pooled_h * pooled_w);
    let plane = in_h * in_w;
    let (in_h_i, in_w_i) = (in_h as i64, in_w as i64);
    for (n, roi) in rois.chunks_exact(5).enumerate() {
        let batch_id = roi[0] as i64;
        ensure!(
            0 <= batch_id && (batch_id as usize) < batch,
            "Region {} refers to batch item {} out of {}",
            n,
            roi[0],
            batch
        );
        let start_w = (roi[1] * spatial_scale).round() as i64;
        let start_h = (roi[2] * spatial_scale).round() as i64;
        let end_w = (roi[3] * spatial_scale).round() as i64;
        let end_h = (roi[4] * spatial_scale).round() as i64;
        let roi_h = (end_h - start_h + 1).max(1);
        let roi_w = (end_w - start_w + 1).max(1);
        let bin_h = roi_h as f32 / pooled_h as f32;
        let bin_w = roi_w as f32 / pooled_w as f32;
        let item = &input[batch_id as usize * channels * plane..][..channels * plane];
        for c in 0..channels {
            let channel = &item[c * plane..][..plane];
            for ph in 0..pooled_h {
                for pw in 0..pooled_w {
                    let clip = |v: i64, start: i64, max: i64| (v + start).clamp(0, max);
                    let h_start = clip((ph as f32 * bin_h).floor() as i64, start_h, in_h_i);
                    let h_end = clip(((ph + 1) as f32 * bin_h).ceil() as i64, start_h, in_h_i);
                    let w_start = clip((pw as f32 * bin_w).floor() as i64, start_w, in_w_i);
                    let w_end = clip(((pw + 1) as f32 * bin_w).ceil() as i64, start_w, in_w_i);
                    let mut max = 0f32;
                    if h_end > h_start && w_end > w_start {
                        max = f32::MIN;
                        for h in h_start..h_end {
                            for w in w_start..w_end {
                                max = max.max(channel[(h * in_w_i + w) as usize]);
                            }
                        }
                    }
                    output[((n * channels + c) * pooled_h + ph) * pooled_w + pw] = max;
                }
            }
        }
    }
    Ok(())
}

/// Parameters of region proposal decoding.
#[derive(Debug, Clone, PartialEq, new)]
pub struct ProposalConfig {
    /// 4 values per anchor: `x1, y1, x2, y2` relative to the cell origin.
    pub anchors: Vec<f32>,
    pub feat_stride: usize,
    pub min_size: usize,
}

impl ProposalConfig {
    pub fn num_anchors(&self) -> usize {
        self.anchors.len() / 4
    }
}

/// Decode anchors and deltas into boxes.
///
/// `scores` is `[2 * A, H, W]` with foreground scores in the second half,
/// `deltas` is `[4 * A, H, W]`, `info` is `(im_h, im_w, im_scale)`. Output
/// rows are `x1, y1, x2, y2, score, valid`, one per anchor per cell, cell
/// major. A box is valid when both sides are at least `min_size * im_scale`.
pub fn proposal(
    config: &ProposalConfig,
    scores: &[f32],
    deltas: &[f32],
    info: &[f32],
    (in_h, in_w): (usize, usize),
    output: &mut [f32],
) {
    let spatial = in_h * in_w;
    let num_anchors = config.num_anchors();
    let num_proposals = spatial * num_anchors;
    let (im_h, im_w, im_scale) = (info[0], info[1], info[2]);
    let min_box_size = config.min_size as f32 * im_scale;
    let stride = config.feat_stride as f32;
    for (n, anchor) in config.anchors.chunks_exact(4).enumerate() {
        let score = &scores[num_proposals + n * spatial..][..spatial];
        let delta = |k: usize| &deltas[(n * 4 + k) * spatial..][..spatial];
        let (dx, dy, dw, dh) = (delta(0), delta(1), delta(2), delta(3));
        let anchor_w = anchor[2] - anchor[0] + 1.;
        let anchor_h = anchor[3] - anchor[1] + 1.;
        for h in 0..in_h {
            for w in 0..in_w {
                let s = h * in_w + w;
                let anchor_cx = anchor[0] + w as f32 * stride + anchor_w * 0.5;
                let anchor_cy = anchor[1] + h as f32 * stride + anchor_h * 0.5;
                let cx = anchor_cx + anchor_w * dx[s];
                let cy = anchor_cy + anchor_h * dy[s];
                let bw = anchor_w * dw[s].exp();
                let bh = anchor_h * dh[s].exp();
                let row = &mut output[(s * num_anchors + n) * 6..][..6];
                row[0] = (cx - bw * 0.5).max(0.).min(im_w - 1.);
                row[1] = (cy - bh * 0.5).max(0.).min(im_h - 1.);
                row[2] = (cx + bw * 0.5).max(0.).min(im_w - 1.);
                row[3] = (cy + bh * 0.5).max(0.).min(im_h - 1.);
                row[4] = score[s];
                let valid = row[2] - row[0] + 1. >= min_box_size
                    && row[3] - row[1] + 1. >= min_box_size;
                row[5] = if valid { 1. } else { 0. };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roi_max_and_empty_cells() {
        let input: Vec<f32> = (0..16).map(|x| x as f32).collect();
        let mut output = [0f32; 4];
        roi_pooling(&input, (1, 1, 4, 4), &[0., 0., 0., 3., 3.], (2, 2), 1.0, &mut output).unwrap();
        assert_eq!(output, [5., 7., 13., 15.]);
        // region entirely right of the map: every cell is empty
        roi_pooling(&input, (1, 1, 4, 4), &[0., 8., 0., 9., 1.], (2, 2), 1.0, &mut output).unwrap();
        assert_eq!(output, [0.; 4]);
    }

    #[test]
    fn roi_bad_batch() {
        let mut output = [0f32; 1];
        let roi = [1., 0., 0., 1., 1.];
        assert!(roi_pooling(&[0.; 4], (1, 1, 2, 2), &roi, (1, 1), 1., &mut output).is_err());
    }

    #[test]
    fn proposal_identity_deltas() {
        let config = ProposalConfig::new(vec![0., 0., 15., 15.], 16, 16);
        // one anchor on a 1x2 grid: background then foreground scores
        let scores = [0.1f32, 0.2, 0.9, 0.8];
        let deltas = [0f32; 8];
        let info = [100f32, 100., 1.];
        let mut output = [0f32; 12];
        proposal(&config, &scores, &deltas, &info, (1, 2), &mut output);
        assert_eq!(&output[0..6], &[0., 0., 16., 16., 0.9, 1.]);
        assert_eq!(&output[6..12], &[16., 0., 32., 16., 0.8, 1.]);
    }

    #[test]
    fn proposal_clipping_invalidates() {
        let config = ProposalConfig::new(vec![0., 0., 15., 15.], 16, 16);
        let scores = [0f32, 1.];
        let deltas = [0f32; 4];
        // image smaller than the anchor: box gets clipped below min size
        let info = [8f32, 8., 1.];
        let mut output = [0f32; 6];
        proposal(&config, &scores, &deltas, &info, (1, 1), &mut output);
        assert_eq!(&output[0..4], &[0., 0., 7., 7.]);
        assert_eq!(output[5], 0.);
    }
}
