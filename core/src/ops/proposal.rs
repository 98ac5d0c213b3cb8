use crate::internal::*;
use crate::vision::{self, ProposalConfig};

/// Region proposal decoding, one row per anchor per feature map cell.
#[derive(Debug)]
pub struct Proposal {
    base: OpBase,
    config: ProposalConfig,
}

pub fn build(param: &OpParam, ws: &Workspace) -> UmbraResult<Box<dyn Operator>> {
    let base = OpBase::new(param, ws)?;
    let feat_stride = base.args.single("feat_stride", 16)?;
    let min_size = base.args.single("min_size", 16)?;
    let anchors = base.args.required_repeated::<f32>("anchors")?;
    ensure!(
        !anchors.is_empty() && anchors.len() % 4 == 0,
        "Anchors must be given as 4 values each, got {}",
        anchors.len()
    );
    base.check_arity(3..=3, 1)?;
    base.check_not_in_place()?;
    Ok(Box::new(Proposal { base, config: ProposalConfig::new(anchors, feat_stride, min_size) }))
}

impl Operator for Proposal {
    fn base(&self) -> &OpBase {
        &self.base
    }

    fn forward(&mut self, ws: &Workspace) -> UmbraResult<()> {
        let scores = ws.get(self.base.bottom(0)?)?;
        let deltas = ws.get(self.base.bottom(1)?)?;
        let info = ws.get(self.base.bottom(2)?)?;
        let mut top = ws.get_mut(self.base.top(0)?)?;
        let &[batch, score_c, in_h, in_w] = scores.shape() else {
            bail!("Proposal expects NCHW scores, got {:?}", scores.shape())
        };
        let num_anchors = self.config.num_anchors();
        ensure!(batch == 1, "Proposal only supports a batch of 1, got {}", batch);
        ensure!(
            score_c == 2 * num_anchors,
            "{} score channels for {} anchors",
            score_c,
            num_anchors
        );
        ensure!(
            deltas.shape() == [1, 4 * num_anchors, in_h, in_w],
            "Deltas of shape {:?} do not fit scores {:?}",
            deltas.shape(),
            scores.shape()
        );
        ensure!(info.len() >= 3, "Image info needs 3 values, got {:?}", info.shape());
        top.reshape(&[in_h * in_w * num_anchors, 6])?;
        vision::proposal(
            &self.config,
            scores.as_slice::<f32>()?,
            deltas.as_slice::<f32>()?,
            info.as_slice::<f32>()?,
            (in_h, in_w),
            top.as_slice_mut::<f32>()?,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Registry;

    #[test]
    fn decodes_grid() {
        let mut ws = Workspace::default();
        ws.create::<f32>("score", &[1, 2, 1, 2])
            .unwrap()
            .set_data(&[0.1f32, 0.2, 0.9, 0.8])
            .unwrap();
        ws.create::<f32>("delta", &[1, 4, 1, 2]).unwrap();
        ws.create::<f32>("info", &[3]).unwrap().set_data(&[100f32, 100., 1.]).unwrap();
        ws.create::<f32>("proposals", &[]).unwrap();
        let param = OpParam::new(
            "proposal",
            "Proposal",
            &["score", "delta", "info"],
            &["proposals"],
            vec![Argument::floats("anchors", &[0., 0., 15., 15.])],
        );
        let mut op = Registry::native().build(&param, &ws).unwrap();
        op.forward(&ws).unwrap();
        let y = ws.get("proposals").unwrap();
        assert_eq!(y.shape(), &[2, 6]);
        assert_eq!(
            y.as_slice::<f32>().unwrap(),
            &[0., 0., 16., 16., 0.9, 1., 16., 0., 32., 16., 0.8, 1.]
        );
    }

    #[test]
    fn rejects_bad_anchors() {
        let mut ws = Workspace::default();
        for name in ["score", "delta", "info", "proposals"] {
            ws.create::<f32>(name, &[]).unwrap();
        }
        let param = OpParam::new(
            "proposal",
            "Proposal",
            &["score", "delta", "info"],
            &["proposals"],
            vec![Argument::floats("anchors", &[0., 0., 15.])],
        );
        assert!(Registry::native().build(&param, &ws).is_err());
    }
}
