use crate::internal::*;

/// Constructor of one operator kind.
pub type OpBuilder = fn(&OpParam, &Workspace) -> UmbraResult<Box<dyn Operator>>;

/// Operator kinds by name.
#[derive(Clone, Default)]
pub struct Registry(pub HashMap<String, OpBuilder>);

impl Registry {
    /// All operators with a native implementation.
    pub fn native() -> Registry {
        let mut reg = Registry::default();
        reg.register("Activate", super::activate::build);
        reg.register("Binary", super::binary::build);
        reg.register("Concat", super::concat::build);
        reg.register("Conv", super::conv::build);
        reg.register("DataTransform", super::data_transform::build);
        reg.register("Input", super::input::build);
        reg.register("LRN", super::lrn::build);
        reg.register("Normalize", super::normalize::build);
        reg.register("Permute", super::permute::build);
        reg.register("Pooling", super::pooling::build);
        reg.register("Proposal", super::proposal::build);
        reg.register("Reduce", super::reduce::build);
        reg.register("Reorg", super::reorg::build);
        reg.register("ROIPooling", super::roi_pooling::build);
        reg.register("Scale", super::scale::build);
        reg.register("Squeeze", super::squeeze::build);
        reg
    }

    pub fn register(&mut self, kind: &str, builder: OpBuilder) {
        self.0.insert(kind.to_string(), builder);
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|s| &**s)
    }

    pub fn build(&self, param: &OpParam, ws: &Workspace) -> UmbraResult<Box<dyn Operator>> {
        let builder = self
            .0
            .get(&param.r#type)
            .with_context(|| format!("Unknown operator kind {} for {}", param.r#type, param.name))?;
        builder(param, ws)
            .with_context(|| format!("Building operator {} ({})", param.name, param.r#type))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Registry({})", self.kinds().sorted().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::input::Input;

    fn ws() -> Workspace {
        let mut ws = Workspace::default();
        ws.create::<f32>("x", &[]).unwrap();
        ws
    }

    #[test]
    fn builds_known_kind() {
        let ws = ws();
        let param = OpParam::new("in", "Input", &[], &["x"], vec![Argument::ints("x", &[1, 2])]);
        let op = Registry::native().build(&param, &ws).unwrap();
        assert!(op.downcast_ref::<Input>().is_some());
        assert_eq!(op.name(), "in");
        assert_eq!(ws.get("x").unwrap().shape(), &[1, 2]);
    }

    #[test]
    fn unknown_kind() {
        let param = OpParam::new("in", "Softmax", &["x"], &["x"], vec![]);
        let err = Registry::native().build(&param, &ws()).unwrap_err();
        assert!(format!("{:?}", err).contains("Softmax"));
    }

    #[test]
    fn unresolved_blob() {
        let param = OpParam::new("relu", "Activate", &["x"], &["y"], vec![]);
        assert!(Registry::native().build(&param, &ws()).is_err());
    }

    #[test]
    fn custom_kind() {
        fn noop(param: &OpParam, ws: &Workspace) -> UmbraResult<Box<dyn Operator>> {
            Ok(Box::new(Input { base: OpBase::new(param, ws)? }))
        }
        let mut reg = Registry::default();
        reg.register("Noop", noop);
        let param = OpParam::new("n", "Noop", &["x"], &["x"], vec![]);
        assert!(reg.build(&param, &ws()).is_ok());
    }
}
