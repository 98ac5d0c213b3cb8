//! The native engine: loads a network description into a workspace and
//! runs its operators in order.
use std::path::Path;

use crate::internal::*;

/// Engine-wide switches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOptions {
    /// Inputs are device pointers rather than host memory.
    pub device_input: bool,
}

/// Externally supplied weights, matched to the declared blobs in order.
#[derive(Debug, Clone)]
pub enum Weights {
    /// One buffer per declared blob.
    PerTensor(Vec<Arc<Buffer>>),
    /// A single buffer holding every blob back to back.
    Flat(Arc<Buffer>),
}

/// Raw content for one network input.
///
/// Built from a typed slice, the datum type is checked against the input
/// blob. Raw bytes are taken at face value.
#[derive(Debug, Clone, Copy)]
pub struct InputData<'a> {
    dt: Option<DatumType>,
    bytes: &'a [u8],
}

impl<'a> InputData<'a> {
    pub fn raw(bytes: &'a [u8]) -> InputData<'a> {
        InputData { dt: None, bytes }
    }

    pub fn datum_type(&self) -> Option<DatumType> {
        self.dt
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

impl<'a, T: Datum> From<&'a [T]> for InputData<'a> {
    fn from(data: &'a [T]) -> InputData<'a> {
        let bytes = unsafe {
            std::slice::from_raw_parts(data.as_ptr() as *const u8, std::mem::size_of_val(data))
        };
        InputData { dt: Some(T::datum_type()), bytes }
    }
}

impl<'a> From<&'a Tensor> for InputData<'a> {
    fn from(tensor: &'a Tensor) -> InputData<'a> {
        InputData { dt: Some(tensor.datum_type()), bytes: tensor.as_bytes() }
    }
}

/// Sequential executor of a network over a workspace.
#[derive(Debug)]
pub struct Native {
    ws: Workspace,
    ops: Vec<Box<dyn Operator>>,
    registry: Registry,
    options: EngineOptions,
    in_blobs: Vec<String>,
    out_blobs: Vec<String>,
}

impl Default for Native {
    fn default() -> Native {
        Native::new(Registry::native())
    }
}

impl Native {
    pub fn new(registry: Registry) -> Native {
        Native {
            ws: Workspace::default(),
            ops: vec![],
            registry,
            options: EngineOptions::default(),
            in_blobs: vec![],
            out_blobs: vec![],
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Native {
        self.options = options;
        self
    }

    pub fn load_model(&mut self, net: &NetParam) -> UmbraResult<()> {
        self.load(net, None)
    }

    /// Load a protobuf-encoded model.
    pub fn load_binary(&mut self, bytes: &[u8]) -> UmbraResult<()> {
        self.load(&NetParam::decode_binary(bytes)?, None)
    }

    pub fn load_binary_file(&mut self, path: impl AsRef<Path>) -> UmbraResult<()> {
        self.load(&NetParam::from_binary_file(path)?, None)
    }

    /// Load a JSON model, given either literally or as a file path.
    pub fn load_text(&mut self, text_or_path: &str) -> UmbraResult<()> {
        self.load(&NetParam::from_text_or_path(text_or_path)?, None)
    }

    /// Load a JSON model, then fill its blobs from `weights`.
    ///
    /// The network argument `share_weight` makes the blobs no operator
    /// writes to views on the weight buffers instead of copies.
    pub fn load_text_with_weights(
        &mut self,
        text_or_path: &str,
        weights: Weights,
    ) -> UmbraResult<()> {
        self.load(&NetParam::from_text_or_path(text_or_path)?, Some(weights))
    }

    /// Build everything aside and swap it in. A failed load leaves the
    /// engine unloaded.
    fn load(&mut self, net: &NetParam, weights: Option<Weights>) -> UmbraResult<()> {
        match self.build(net, weights) {
            Ok((ws, ops, in_blobs, out_blobs)) => {
                self.ws = ws;
                self.ops = ops;
                self.in_blobs = in_blobs;
                self.out_blobs = out_blobs;
                Ok(())
            }
            Err(e) => {
                self.unload();
                Err(e)
            }
        }
    }

    /// Drop the model, keeping registry and options.
    pub fn unload(&mut self) {
        self.ws = Workspace::new(self.ws.ctx().clone());
        self.ops.clear();
        self.in_blobs.clear();
        self.out_blobs.clear();
    }

    #[allow(clippy::type_complexity)]
    fn build(
        &self,
        net: &NetParam,
        weights: Option<Weights>,
    ) -> UmbraResult<(Workspace, Vec<Box<dyn Operator>>, Vec<String>, Vec<String>)> {
        let mut ws = Workspace::new(self.ws.ctx().clone());
        for blob in &net.blob {
            create_blob(&mut ws, blob).with_context(|| format!("Creating blob {}", blob.name))?;
        }
        let ops = net
            .op
            .iter()
            .map(|param| self.registry.build(param, &ws))
            .collect::<UmbraResult<Vec<_>>>()?;
        let args = ArgumentHelper::new(&net.arg)?;
        let in_blobs = net
            .op
            .iter()
            .find(|op| op.r#type == "Input")
            .map(|op| op.top.clone())
            .unwrap_or_default();
        let out_blobs = args
            .required_repeated::<String>("out_blob")
            .context("Network must have out_blob argument")?;
        for name in &out_blobs {
            ensure!(ws.has_blob(name), "Output blob {} is not declared", name);
        }
        if let Some(weights) = weights {
            let share = args.single("share_weight", false)?;
            copy_weights(&mut ws, net, weights, share)?;
        }
        debug!(
            "Loaded network {:?}: {} blobs, {} operators, inputs {:?}, outputs {:?}",
            net.name,
            ws.len(),
            ops.len(),
            in_blobs,
            out_blobs
        );
        Ok((ws, ops, in_blobs, out_blobs))
    }

    /// Copy inputs in, optionally reshaping them first, and run every
    /// operator in order. Does nothing until a model is loaded.
    pub fn forward(
        &mut self,
        inputs: &HashMap<String, InputData>,
        shapes: &HashMap<String, TVec<usize>>,
    ) -> UmbraResult<()> {
        if self.ops.is_empty() {
            return Ok(());
        }
        if self.options.device_input && !self.ws.ctx().supports_device_input() {
            bail!("Device input is not supported on {:?}", self.ws.ctx().device());
        }
        for (name, data) in inputs {
            let mut blob = self.ws.get_mut(name)?;
            if let Some(dt) = data.datum_type() {
                ensure!(
                    dt == blob.datum_type(),
                    "Input {} is {:?}, got {:?} data",
                    name,
                    blob.datum_type(),
                    dt
                );
            }
            // an empty override keeps the current shape
            if let Some(shape) = shapes.get(name).filter(|s| !s.is_empty()) {
                blob.reshape(shape)?;
            }
            let expected = blob.len() * blob.datum_type().size_of();
            ensure!(
                data.bytes().len() == expected,
                "Input {} of shape {:?} needs {} bytes, got {}",
                name,
                blob.shape(),
                expected,
                data.bytes().len()
            );
            blob.as_bytes_mut()?.copy_from_slice(data.bytes());
        }
        for op in &mut self.ops {
            op.forward(&self.ws).with_context(|| format!("Running operator {}", op.name()))?;
            trace!("{}", op.debug_log(&self.ws));
        }
        debug!("Forward network done");
        Ok(())
    }

    pub fn in_blobs(&self) -> &[String] {
        &self.in_blobs
    }

    pub fn out_blobs(&self) -> &[String] {
        &self.out_blobs
    }

    pub fn workspace(&self) -> &Workspace {
        &self.ws
    }

    pub fn ops(&self) -> &[Box<dyn Operator>] {
        &self.ops
    }

    pub fn is_loaded(&self) -> bool {
        !self.ops.is_empty()
    }

    /// Read access to a tensor, checking its type.
    pub fn output<T: Datum>(&self, name: &str) -> UmbraResult<Ref<'_, Tensor>> {
        self.ws.get_typed::<T>(name)
    }
}

fn create_blob(ws: &mut Workspace, blob: &BlobParam) -> UmbraResult<()> {
    let dt = blob.datum_type()?;
    let shape = blob.shape()?;
    let count = shape.iter().product::<usize>();
    let tensor = ws.create_dt(&blob.name, dt, &shape)?;
    match dt {
        DatumType::F32 if !blob.data_f.is_empty() => {
            let len = blob.data_f.len();
            ensure!(len == count, "{} values for shape {:?}", len, shape);
            tensor.set_data(&blob.data_f)?;
        }
        DatumType::I32 if !blob.data_i.is_empty() => {
            let len = blob.data_i.len();
            ensure!(len == count, "{} values for shape {:?}", len, shape);
            tensor.set_data(&blob.data_i)?;
        }
        DatumType::U8 if !blob.data_b.is_empty() => {
            ensure!(blob.data_b.len() == 1, "Byte data must come as a single string");
            let bytes = &blob.data_b[0];
            ensure!(bytes.len() == count, "{} values for shape {:?}", bytes.len(), shape);
            tensor.set_data(&bytes[..])?;
        }
        _ => (),
    }
    Ok(())
}

fn copy_weights(
    ws: &mut Workspace,
    net: &NetParam,
    weights: Weights,
    share: bool,
) -> UmbraResult<()> {
    // operator outputs must stay writable, they never share
    let written: Vec<&str> = net.op.iter().flat_map(|op| op.top.iter().map(|s| &**s)).collect();
    let mut flat_offset = 0;
    for (ix, blob) in net.blob.iter().enumerate() {
        let shape = blob.shape()?;
        let (source, offset) = match &weights {
            Weights::PerTensor(buffers) => {
                let buffer = buffers.get(ix).with_context(|| {
                    format!("{} weight buffers for {} blobs", buffers.len(), net.blob.len())
                })?;
                (buffer.clone(), 0)
            }
            Weights::Flat(buffer) => (buffer.clone(), flat_offset),
        };
        let mut tensor = ws.get_mut(&blob.name)?;
        let bytes = shape.iter().product::<usize>() * tensor.datum_type().size_of();
        ensure!(
            offset + bytes <= source.len(),
            "Weights for blob {} ({} bytes at {}) overrun a {} bytes buffer",
            blob.name,
            bytes,
            offset,
            source.len()
        );
        if share && !written.contains(&&*blob.name) {
            tensor.share_buffer(source, offset, &shape)?;
        } else {
            tensor.reshape(&shape)?;
            tensor.as_bytes_mut()?.copy_from_slice(&source.as_bytes()[offset..][..bytes]);
        }
        flat_offset += bytes;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_data_from_slices() {
        let data = [1f32, 2.];
        let input = InputData::from(&data[..]);
        assert_eq!(input.datum_type(), Some(DatumType::F32));
        assert_eq!(input.bytes().len(), 8);
        assert_eq!(InputData::raw(&[1, 2, 3]).datum_type(), None);
    }

    #[test]
    fn forward_without_model() {
        let mut engine = Native::default();
        assert!(!engine.is_loaded());
        engine.forward(&HashMap::new(), &HashMap::new()).unwrap();
    }

    #[test]
    fn device_input_unsupported() {
        let net = NetParam {
            blob: vec![BlobParam { name: "x".into(), shape: vec![1], ..BlobParam::default() }],
            op: vec![OpParam::new("input", "Input", &[], &["x"], vec![])],
            arg: vec![Argument::strings("out_blob", &["x"])],
            ..NetParam::default()
        };
        let mut engine = Native::default().with_options(EngineOptions { device_input: true });
        engine.load_model(&net).unwrap();
        assert!(engine.forward(&HashMap::new(), &HashMap::new()).is_err());
    }
}
