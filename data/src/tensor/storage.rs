use crate::datum::Datum;
use crate::UmbraResult;
use std::alloc::{self, Layout};
use std::fmt;
use std::mem::{align_of, size_of, size_of_val};
use std::sync::Arc;

/// Aligned, zero-initialised heap allocation.
pub struct Buffer {
    layout: Layout,
    data: *mut u8,
}

unsafe impl Send for Buffer {}
unsafe impl Sync for Buffer {}

impl Buffer {
    /// Allocate `len` zeroed bytes aligned on `alignment`.
    pub fn zeroed(len: usize, alignment: usize) -> UmbraResult<Buffer> {
        let layout = Layout::from_size_align(len, alignment)?;
        let data = if len == 0 {
            std::ptr::null_mut()
        } else {
            let ptr = unsafe { alloc::alloc_zeroed(layout) };
            if ptr.is_null() {
                alloc::handle_alloc_error(layout)
            }
            ptr
        };
        Ok(Buffer { layout, data })
    }

    /// Copy raw bytes into a new buffer.
    pub fn from_bytes(content: &[u8], alignment: usize) -> UmbraResult<Buffer> {
        let mut buffer = Buffer::zeroed(content.len(), alignment)?;
        buffer.as_bytes_mut().copy_from_slice(content);
        Ok(buffer)
    }

    /// Copy a typed slice into a new buffer.
    pub fn from_slice<T: Datum>(content: &[T]) -> UmbraResult<Buffer> {
        let bytes = unsafe {
            std::slice::from_raw_parts(content.as_ptr() as *const u8, size_of_val(content))
        };
        Buffer::from_bytes(bytes, super::DEFAULT_ALIGNMENT.max(align_of::<T>()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.layout.size()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn alignment(&self) -> usize {
        self.layout.align()
    }

    pub fn as_bytes(&self) -> &[u8] {
        if self.data.is_null() {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(self.data, self.len()) }
        }
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        if self.data.is_null() {
            &mut []
        } else {
            unsafe { std::slice::from_raw_parts_mut(self.data, self.len()) }
        }
    }

    /// True if a `T` can be read at byte `offset`.
    pub fn is_aligned_for<T>(&self, offset: usize) -> bool {
        (self.data as usize + offset) % align_of::<T>() == 0
    }

    /// Typed view of `len` items starting at byte `offset`.
    pub fn slice<T: Datum>(&self, offset: usize, len: usize) -> &[T] {
        if len == 0 {
            return &[];
        }
        assert!(offset + len * size_of::<T>() <= self.len());
        debug_assert!(self.is_aligned_for::<T>(offset));
        unsafe { std::slice::from_raw_parts(self.data.add(offset) as *const T, len) }
    }

    /// Mutable typed view of `len` items starting at byte `offset`.
    pub fn slice_mut<T: Datum>(&mut self, offset: usize, len: usize) -> &mut [T] {
        if len == 0 {
            return &mut [];
        }
        assert!(offset + len * size_of::<T>() <= self.len());
        debug_assert!(self.is_aligned_for::<T>(offset));
        unsafe { std::slice::from_raw_parts_mut(self.data.add(offset) as *mut T, len) }
    }
}

impl Default for Buffer {
    fn default() -> Buffer {
        Buffer { layout: Layout::new::<()>(), data: std::ptr::null_mut() }
    }
}

impl Clone for Buffer {
    fn clone(&self) -> Buffer {
        let mut other = Buffer::zeroed(self.len(), self.alignment())
            .expect("layout already validated for the source buffer");
        other.as_bytes_mut().copy_from_slice(self.as_bytes());
        other
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if !self.data.is_null() && self.layout.size() > 0 {
            unsafe { alloc::dealloc(self.data, self.layout) }
        }
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Buffer({} bytes, align {})", self.len(), self.alignment())
    }
}

/// Where a tensor's elements live.
///
/// An `Owned` tensor has the buffer to itself, modulo copy-on-write clones.
/// A `Borrowed` tensor is a view on somebody else's buffer starting at a
/// byte offset: the strong reference keeps the source alive, and the view
/// can neither be written to nor grown past the source extent.
#[derive(Debug, Clone)]
pub enum Storage {
    Owned(Arc<Buffer>),
    Borrowed { source: Arc<Buffer>, offset: usize },
}

impl Storage {
    pub fn buffer(&self) -> &Arc<Buffer> {
        match self {
            Storage::Owned(buffer) => buffer,
            Storage::Borrowed { source, .. } => source,
        }
    }

    pub fn offset(&self) -> usize {
        match self {
            Storage::Owned(_) => 0,
            Storage::Borrowed { offset, .. } => *offset,
        }
    }

    /// Bytes reachable from the view start.
    pub fn extent(&self) -> usize {
        self.buffer().len() - self.offset()
    }

    pub fn is_borrowed(&self) -> bool {
        matches!(self, Storage::Borrowed { .. })
    }
}
