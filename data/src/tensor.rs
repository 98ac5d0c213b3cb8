//! `Tensor`, the unit of data exchanged between operators.
use crate::datum::{Datum, DatumType};
use crate::{TVec, UmbraResult};
use anyhow::{bail, ensure};
use ndarray::prelude::*;
use std::fmt;
use std::sync::Arc;

mod storage;

pub use storage::{Buffer, Storage};

/// Alignment of every buffer allocated by a tensor.
pub const DEFAULT_ALIGNMENT: usize = 16;

/// Typed, shaped view over a `Storage`.
///
/// The element count never exceeds the storage capacity. Reshaping to a
/// count that fits keeps the allocation; reshaping an owned tensor beyond its
/// capacity reallocates without preserving the content.
///
/// Cloning is shallow: the clone shares the buffer, and the first mutable
/// access on either side detaches it.
#[derive(Clone)]
pub struct Tensor {
    dt: DatumType,
    shape: TVec<usize>,
    len: usize,
    storage: Storage,
}

/// Row-major stride accumulator of a shape: `strides[i]` is the product of
/// `shape[i+1..]`.
pub fn natural_strides(shape: &[usize]) -> TVec<usize> {
    let mut strides: TVec<usize> = tvec![1; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

impl Tensor {
    /// Zero-filled tensor (dt as regular parameter).
    pub fn zero_dt(dt: DatumType, shape: &[usize]) -> UmbraResult<Tensor> {
        let len = shape.iter().product::<usize>();
        let buffer = Buffer::zeroed(len * dt.size_of(), DEFAULT_ALIGNMENT.max(dt.alignment()))?;
        Ok(Tensor { dt, shape: shape.into(), len, storage: Storage::Owned(Arc::new(buffer)) })
    }

    /// Zero-filled tensor (dt as type parameter).
    pub fn zero<T: Datum>(shape: &[usize]) -> UmbraResult<Tensor> {
        Self::zero_dt(T::datum_type(), shape)
    }

    /// Create a tensor with a given shape and a slice of elements.
    pub fn from_shape<T: Datum>(shape: &[usize], data: &[T]) -> UmbraResult<Tensor> {
        ensure!(
            data.len() == shape.iter().product::<usize>(),
            "Shape product must be equal to data length ({:?} vs {})",
            shape,
            data.len()
        );
        let buffer = Buffer::from_slice(data)?;
        Ok(Tensor {
            dt: T::datum_type(),
            shape: shape.into(),
            len: data.len(),
            storage: Storage::Owned(Arc::new(buffer)),
        })
    }

    /// Create a tensor from an ndarray.
    pub fn from_array<T: Datum, D: Dimension>(array: Array<T, D>) -> UmbraResult<Tensor> {
        let shape = array.shape().to_vec();
        let data: Vec<T> = array.iter().copied().collect();
        Self::from_shape(&shape, &data)
    }

    #[inline]
    pub fn datum_type(&self) -> DatumType {
        self.dt
    }

    /// Get the number of dimensions (or axes) of the tensor.
    #[inline]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the number of values in the tensor.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of values in the axes starting at `start`.
    pub fn count_from(&self, start: usize) -> usize {
        self.shape[start.min(self.rank())..].iter().product()
    }

    /// Resolve a possibly negative axis against the rank.
    pub fn canonical_axis(&self, axis: i32) -> UmbraResult<usize> {
        let rank = self.rank() as i32;
        ensure!(
            -rank <= axis && axis < rank,
            "Axis {} out of range for tensor of shape {:?}",
            axis,
            self.shape
        );
        Ok(if axis < 0 { (axis + rank) as usize } else { axis as usize })
    }

    /// Number of elements the storage can hold without reallocation.
    pub fn capacity(&self) -> usize {
        self.storage.extent() / self.dt.size_of()
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn is_borrowed(&self) -> bool {
        self.storage.is_borrowed()
    }

    /// Change shape, growing the storage if needed.
    pub fn reshape(&mut self, shape: &[usize]) -> UmbraResult<()> {
        let len = shape.iter().product::<usize>();
        if len > self.capacity() {
            match self.storage {
                Storage::Owned(_) => {
                    let buffer = Buffer::zeroed(
                        len * self.dt.size_of(),
                        DEFAULT_ALIGNMENT.max(self.dt.alignment()),
                    )?;
                    self.storage = Storage::Owned(Arc::new(buffer));
                }
                Storage::Borrowed { .. } => bail!(
                    "Can not grow borrowed tensor from {:?} to {:?} (capacity {})",
                    self.shape,
                    shape,
                    self.capacity()
                ),
            }
        }
        if shape != &*self.shape {
            self.shape.clear();
            self.shape.extend_from_slice(shape);
        }
        self.len = len;
        Ok(())
    }

    /// Force the tensor shape, element count must be unchanged.
    pub fn set_shape(&mut self, shape: &[usize]) -> UmbraResult<()> {
        if self.len() != shape.iter().product::<usize>() {
            bail!("Invalid reshape {:?} to {:?}", self.shape, shape);
        }
        self.shape.clear();
        self.shape.extend_from_slice(shape);
        Ok(())
    }

    fn check_for_access<D: Datum>(&self) -> UmbraResult<()> {
        if self.datum_type() != D::datum_type() {
            bail!(
                "Tensor datum type error: tensor is {:?}, accessed as {:?}",
                self.datum_type(),
                D::datum_type(),
            );
        }
        Ok(())
    }

    /// Access the data as a slice.
    pub fn as_slice<D: Datum>(&self) -> UmbraResult<&[D]> {
        self.check_for_access::<D>()?;
        Ok(self.storage.buffer().slice(self.storage.offset(), self.len))
    }

    /// Access the data as a mutable slice.
    ///
    /// Detaches the storage from any outstanding clone or view first.
    pub fn as_slice_mut<D: Datum>(&mut self) -> UmbraResult<&mut [D]> {
        self.check_for_access::<D>()?;
        let len = self.len;
        match &mut self.storage {
            Storage::Owned(buffer) => Ok(Arc::make_mut(buffer).slice_mut(0, len)),
            Storage::Borrowed { .. } => {
                bail!("Borrowed tensor of shape {:?} is read-only", self.shape)
            }
        }
    }

    /// The tensor content as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        let offset = self.storage.offset();
        &self.storage.buffer().as_bytes()[offset..offset + self.len * self.dt.size_of()]
    }

    /// The tensor content as mutable bytes.
    pub fn as_bytes_mut(&mut self) -> UmbraResult<&mut [u8]> {
        let bytes = self.len * self.dt.size_of();
        match &mut self.storage {
            Storage::Owned(buffer) => Ok(&mut Arc::make_mut(buffer).as_bytes_mut()[..bytes]),
            Storage::Borrowed { .. } => {
                bail!("Borrowed tensor of shape {:?} is read-only", self.shape)
            }
        }
    }

    /// Copy `data` at the beginning of the tensor.
    pub fn set_data<D: Datum>(&mut self, data: &[D]) -> UmbraResult<()> {
        ensure!(
            data.len() <= self.len,
            "Can not copy {} items in tensor of shape {:?}",
            data.len(),
            self.shape
        );
        self.as_slice_mut::<D>()?[..data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Fill the whole tensor with a value.
    pub fn fill<D: Datum>(&mut self, value: D) -> UmbraResult<()> {
        self.as_slice_mut::<D>()?.iter_mut().for_each(|x| *x = value);
        Ok(())
    }

    /// Make this tensor a view on `other`'s storage, with a new shape.
    pub fn share_from(&mut self, other: &Tensor, shape: &[usize]) -> UmbraResult<()> {
        ensure!(
            self.dt == other.dt,
            "Can not share {:?} tensor storage with a {:?} tensor",
            other.dt,
            self.dt
        );
        let len = shape.iter().product::<usize>();
        ensure!(
            len <= other.len(),
            "View of shape {:?} is larger than its source {:?}",
            shape,
            other.shape()
        );
        self.storage = Storage::Borrowed {
            source: other.storage.buffer().clone(),
            offset: other.storage.offset(),
        };
        self.shape = shape.into();
        self.len = len;
        Ok(())
    }

    /// Make this tensor a view on a raw buffer starting at byte `offset`.
    pub fn share_buffer(
        &mut self,
        source: Arc<Buffer>,
        offset: usize,
        shape: &[usize],
    ) -> UmbraResult<()> {
        let len = shape.iter().product::<usize>();
        ensure!(
            offset + len * self.dt.size_of() <= source.len(),
            "View of shape {:?} at offset {} overruns a {} bytes buffer",
            shape,
            offset,
            source.len()
        );
        let aligned = dispatch_datum!(Buffer::is_aligned_for(self.dt)(&source, offset));
        ensure!(aligned, "Offset {} is misaligned for {:?} data", offset, self.dt);
        self.storage = Storage::Borrowed { source, offset };
        self.shape = shape.into();
        self.len = len;
        Ok(())
    }

    /// View the tensor as an ndarray.
    pub fn to_array_view<D: Datum>(&self) -> UmbraResult<ArrayViewD<'_, D>> {
        Ok(ArrayViewD::from_shape(&*self.shape, self.as_slice::<D>()?)?)
    }

    /// Compare content and shape with another tensor.
    pub fn close_enough(&self, other: &Tensor, epsilon: f32) -> UmbraResult<()> {
        ensure!(
            self.dt == other.dt && self.shape == other.shape,
            "Mismatch: {:?} vs {:?}",
            self,
            other
        );
        if self.dt == DatumType::F32 {
            let a = self.as_slice::<f32>()?;
            let b = other.as_slice::<f32>()?;
            if let Some((ix, (x, y))) =
                a.iter().zip(b.iter()).enumerate().find(|(_, (x, y))| (*x - *y).abs() > epsilon)
            {
                bail!("Mismatch at {}: {} vs {}", ix, x, y);
            }
        } else {
            ensure!(self.as_bytes() == other.as_bytes(), "Mismatch: {:?} vs {:?}", self, other);
        }
        Ok(())
    }

    fn fmt_values<D: Datum>(&self, f: &mut fmt::Formatter, max: usize) -> fmt::Result {
        let values = self.as_slice::<D>().map_err(|_| fmt::Error)?;
        write!(f, "[")?;
        for (ix, v) in values.iter().take(max).enumerate() {
            if ix > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        if values.len() > max {
            write!(f, ", ...")?;
        }
        write!(f, "]")
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let shape = self.shape.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(",");
        let kind = if self.is_borrowed() { " (borrowed)" } else { "" };
        write!(f, "{},{:?}{} ", shape, self.dt, kind)?;
        dispatch_datum!(Self::fmt_values(self.dt)(self, f, 12))
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::collection::vec;
    use proptest::prelude::*;

    #[test]
    fn strides() {
        assert_eq!(&*natural_strides(&[2, 3, 4]), &[12, 4, 1]);
        assert_eq!(&*natural_strides(&[5]), &[1]);
        assert!(natural_strides(&[]).is_empty());
    }

    #[test]
    fn shrink_keeps_allocation() {
        let mut t = Tensor::zero::<f32>(&[2, 3, 4]).unwrap();
        let before = Arc::as_ptr(t.storage().buffer());
        t.reshape(&[2, 3]).unwrap();
        assert_eq!(t.len(), 6);
        assert_eq!(t.capacity(), 24);
        assert_eq!(Arc::as_ptr(t.storage().buffer()), before);
        t.reshape(&[4, 6]).unwrap();
        assert_eq!(Arc::as_ptr(t.storage().buffer()), before);
    }

    #[test]
    fn grow_reallocates() {
        let mut t = Tensor::zero::<i32>(&[2]).unwrap();
        t.reshape(&[8]).unwrap();
        assert_eq!(t.capacity(), 8);
        assert_eq!(t.as_slice::<i32>().unwrap(), &[0; 8]);
    }

    #[test]
    fn wrong_type_access() {
        let t = Tensor::zero::<u8>(&[2]).unwrap();
        assert!(t.as_slice::<f32>().is_err());
    }

    #[test]
    fn scalar_has_one_element() {
        let t = Tensor::zero::<f32>(&[]).unwrap();
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn view_sees_source_and_can_not_grow() {
        let source = Tensor::from_shape(&[2, 1, 3], &[1f32, 2., 3., 4., 5., 6.]).unwrap();
        let mut view = Tensor::zero::<f32>(&[]).unwrap();
        view.share_from(&source, &[2, 3]).unwrap();
        assert!(view.is_borrowed());
        assert_eq!(view.as_slice::<f32>().unwrap(), source.as_slice::<f32>().unwrap());
        assert!(view.reshape(&[7]).is_err());
        assert!(view.as_slice_mut::<f32>().is_err());
        view.reshape(&[3]).unwrap();
        assert_eq!(view.as_slice::<f32>().unwrap(), &[1., 2., 3.]);
    }

    #[test]
    fn view_outlives_source_handle() {
        let mut view = Tensor::zero::<i32>(&[]).unwrap();
        {
            let source = Tensor::from_shape(&[3], &[7i32, 8, 9]).unwrap();
            view.share_from(&source, &[3]).unwrap();
        }
        assert_eq!(view.as_slice::<i32>().unwrap(), &[7, 8, 9]);
    }

    #[test]
    fn write_detaches_from_clone() {
        let mut a = Tensor::from_shape(&[2], &[1f32, 2.]).unwrap();
        let b = a.clone();
        a.as_slice_mut::<f32>().unwrap()[0] = 5.;
        assert_eq!(a.as_slice::<f32>().unwrap(), &[5., 2.]);
        assert_eq!(b.as_slice::<f32>().unwrap(), &[1., 2.]);
    }

    #[test]
    fn share_buffer_checks_extent_and_alignment() {
        let buffer = Arc::new(Buffer::from_slice(&[1f32, 2., 3., 4.]).unwrap());
        let mut t = Tensor::zero::<f32>(&[]).unwrap();
        t.share_buffer(buffer.clone(), 8, &[2]).unwrap();
        assert_eq!(t.as_slice::<f32>().unwrap(), &[3., 4.]);
        assert!(t.share_buffer(buffer.clone(), 8, &[3]).is_err());
        assert!(t.share_buffer(buffer, 2, &[1]).is_err());
    }

    proptest! {
        #[test]
        fn reshape_never_exceeds_capacity(shapes in vec(vec(0usize..5, 0..4), 1..6)) {
            let mut t = Tensor::zero::<f32>(&[]).unwrap();
            for shape in shapes {
                t.reshape(&shape).unwrap();
                prop_assert_eq!(t.len(), shape.iter().product::<usize>());
                prop_assert!(t.len() <= t.capacity());
                prop_assert_eq!(t.as_slice::<f32>().unwrap().len(), t.len());
            }
        }
    }
}
