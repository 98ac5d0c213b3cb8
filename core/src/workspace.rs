//! Name-keyed tensor store shared by the operators of a network.
use crate::internal::*;
use std::cell::RefCell;
use std::collections::hash_map::Entry;

/// Tensors of a network, by name, plus one scratch buffer.
///
/// Each tensor sits in its own `RefCell`: an operator holds read guards on
/// its inputs and a write guard on its output at the same time. Asking for a
/// tensor that is already borrowed in a conflicting way is an error, not a
/// panic.
///
/// The scratch buffer only grows. It is not reentrant: one `forward` at a
/// time per workspace.
#[derive(Debug)]
pub struct Workspace {
    blobs: HashMap<String, RefCell<Tensor>>,
    scratch: RefCell<Buffer>,
    ctx: DeviceContext,
}

impl Default for Workspace {
    fn default() -> Workspace {
        Workspace::new(DeviceContext::default())
    }
}

impl Workspace {
    pub fn new(ctx: DeviceContext) -> Workspace {
        Workspace {
            blobs: HashMap::new(),
            scratch: RefCell::new(Buffer::default()),
            ctx,
        }
    }

    pub fn ctx(&self) -> &DeviceContext {
        &self.ctx
    }

    pub fn has_blob(&self, name: &str) -> bool {
        self.blobs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    pub fn blob_names(&self) -> impl Iterator<Item = &str> {
        self.blobs.keys().map(|s| &**s)
    }

    /// Create a tensor, or reshape the existing one of the same type.
    pub fn create_dt(
        &mut self,
        name: &str,
        dt: DatumType,
        shape: &[usize],
    ) -> UmbraResult<&mut Tensor> {
        match self.blobs.entry(name.to_string()) {
            Entry::Occupied(occupied) => {
                let existing = occupied.into_mut().get_mut();
                ensure!(
                    existing.datum_type() == dt,
                    "Blob {} already exists as {:?}, asked for {:?}",
                    name,
                    existing.datum_type(),
                    dt
                );
                existing.reshape(shape)?;
                Ok(existing)
            }
            Entry::Vacant(vacant) => {
                Ok(vacant.insert(RefCell::new(Tensor::zero_dt(dt, shape)?)).get_mut())
            }
        }
    }

    pub fn create<T: Datum>(&mut self, name: &str, shape: &[usize]) -> UmbraResult<&mut Tensor> {
        self.create_dt(name, T::datum_type(), shape)
    }

    fn cell(&self, name: &str) -> UmbraResult<&RefCell<Tensor>> {
        self.blobs.get(name).with_context(|| format!("Can not find blob {}", name))
    }

    /// Read access to a tensor.
    pub fn get(&self, name: &str) -> UmbraResult<Ref<'_, Tensor>> {
        self.cell(name)?
            .try_borrow()
            .map_err(|_| format_err!("Blob {} is being written to", name))
    }

    /// Read access to a tensor of a known element type.
    pub fn get_typed<T: Datum>(&self, name: &str) -> UmbraResult<Ref<'_, Tensor>> {
        let tensor = self.get(name)?;
        ensure!(
            tensor.datum_type() == T::datum_type(),
            "Blob {} is {:?}, asked for {:?}",
            name,
            tensor.datum_type(),
            T::datum_type()
        );
        Ok(tensor)
    }

    /// Write access to a tensor.
    pub fn get_mut(&self, name: &str) -> UmbraResult<RefMut<'_, Tensor>> {
        self.cell(name)?
            .try_borrow_mut()
            .map_err(|_| format_err!("Blob {} is already borrowed", name))
    }

    pub fn blob_type(&self, name: &str) -> UmbraResult<DatumType> {
        Ok(self.get(name)?.datum_type())
    }

    /// Scratch capacity in bytes.
    pub fn temp_capacity(&self) -> usize {
        self.scratch.borrow().len()
    }

    /// Make sure the scratch buffer holds at least `bytes` bytes.
    ///
    /// Content is not preserved across growth.
    pub fn grow_temp_buffer(&self, bytes: usize) -> UmbraResult<()> {
        let mut scratch = self
            .scratch
            .try_borrow_mut()
            .map_err(|_| format_err!("Scratch buffer is in use"))?;
        if bytes > scratch.len() {
            trace!("Growing scratch buffer from {} to {} bytes", scratch.len(), bytes);
            *scratch = Buffer::zeroed(bytes, DEFAULT_ALIGNMENT)?;
        }
        Ok(())
    }

    /// The first `len` items of the scratch buffer, typed.
    pub fn temp_buffer<T: Datum>(&self, len: usize) -> UmbraResult<RefMut<'_, [T]>> {
        let scratch = self
            .scratch
            .try_borrow_mut()
            .map_err(|_| format_err!("Scratch buffer is in use"))?;
        ensure!(
            len * std::mem::size_of::<T>() <= scratch.len(),
            "Scratch buffer holds {} bytes, {} {} asked for",
            scratch.len(),
            len,
            T::name()
        );
        Ok(RefMut::map(scratch, |s| s.slice_mut::<T>(0, len)))
    }
}
