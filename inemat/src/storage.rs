//! Reference-counted, aligned storage blocks.
//!
//! A [`Storage`] is a single allocation holding a small header immediately followed by the
//! payload. The header carries an atomic reference count, so cloning a handle is cheap and
//! the block is freed when the last handle drops. Mutation goes through [`Storage::make_mut`],
//! which detaches (deep copies) a shared block first.

use std::{
    alloc::{self, Layout},
    marker::PhantomData,
    mem,
    ptr::{self, NonNull},
    slice,
    sync::atomic::{self, AtomicU32, Ordering},
};

use num_complex::Complex64;

use crate::error::{MatrixError, Result};
use crate::layout::{round_up, CACHE_LINE_BYTES};

/// A payload element that may live in a [`Storage`] block.
///
/// # Safety
///
/// Implementors must have no padding bytes, and the all-zero bit pattern must be a valid
/// value equal to the type's zero.
pub unsafe trait Unit: Copy + Send + Sync + 'static {}

// SAFETY: plain integers and floats; zero bits are `0` / `0.0`.
unsafe impl Unit for u64 {}
unsafe impl Unit for i64 {}
unsafe impl Unit for f64 {}
// SAFETY: `Complex<f64>` is `repr(C)` over two `f64`s.
unsafe impl Unit for Complex64 {}

const MAX_REFERENCES: u32 = i32::MAX as u32;

#[repr(C)]
struct Header {
    references: AtomicU32,
    capacity: usize,
}

/// A shared, zero-initialized block of `capacity` units aligned to at least a cache line.
pub struct Storage<U: Unit> {
    header: NonNull<Header>,
    marker: PhantomData<U>,
}

// SAFETY: the payload is only mutated through `&mut self` on a uniquely owned block, and
// the reference count is atomic.
unsafe impl<U: Unit> Send for Storage<U> {}
unsafe impl<U: Unit> Sync for Storage<U> {}

impl<U: Unit> Storage<U> {
    const ALIGN: usize = if mem::align_of::<U>() > CACHE_LINE_BYTES {
        mem::align_of::<U>()
    } else {
        CACHE_LINE_BYTES
    };

    const PAYLOAD_OFFSET: usize = round_up(mem::size_of::<Header>(), Self::ALIGN);

    fn layout(capacity: usize) -> Option<Layout> {
        let bytes = capacity
            .checked_mul(mem::size_of::<U>())?
            .checked_add(Self::PAYLOAD_OFFSET)?;
        Layout::from_size_align(bytes, Self::ALIGN).ok()
    }

    /// Allocates a zeroed block of `capacity` units.
    pub fn try_acquire(capacity: usize) -> Result<Self> {
        let layout = Self::layout(capacity).ok_or(MatrixError::InsufficientMemory {
            bytes: usize::MAX,
        })?;

        // SAFETY: the layout is never zero-sized because it always holds the header.
        let base = unsafe { alloc::alloc_zeroed(layout) };
        let header = NonNull::new(base.cast::<Header>()).ok_or(MatrixError::InsufficientMemory {
            bytes: layout.size(),
        })?;

        // SAFETY: `base` is a fresh allocation aligned for `Header` with room for it.
        unsafe {
            header.as_ptr().write(Header {
                references: AtomicU32::new(1),
                capacity,
            })
        };

        Ok(Self {
            header,
            marker: PhantomData,
        })
    }

    /// Allocates a zeroed block of `capacity` units, aborting on allocation failure.
    pub fn acquire(capacity: usize) -> Self {
        match Self::try_acquire(capacity) {
            Ok(storage) => storage,
            Err(_) => match Self::layout(capacity) {
                Some(layout) => alloc::handle_alloc_error(layout),
                None => panic!("capacity overflow"),
            },
        }
    }

    #[inline]
    fn header(&self) -> &Header {
        // SAFETY: the header stays alive as long as any handle does.
        unsafe { self.header.as_ref() }
    }

    #[inline]
    fn payload(&self) -> *mut U {
        // SAFETY: the payload offset is within (or one past the end of) the allocation.
        unsafe {
            self.header
                .as_ptr()
                .cast::<u8>()
                .add(Self::PAYLOAD_OFFSET)
                .cast::<U>()
        }
    }

    /// Number of units in the payload.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.header().capacity
    }

    /// Current number of handles sharing this block.
    #[inline]
    pub fn reference_count(&self) -> u32 {
        self.header().references.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_unique(&self) -> bool {
        self.reference_count() == 1
    }

    #[inline]
    pub fn as_ptr(&self) -> *const U {
        self.payload()
    }

    #[inline]
    pub fn as_slice(&self) -> &[U] {
        // SAFETY: the payload holds `capacity` initialized units.
        unsafe { slice::from_raw_parts(self.payload(), self.capacity()) }
    }

    /// The payload as raw bytes, in memory order.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: `Unit` types have no padding, so every byte is initialized.
        unsafe {
            slice::from_raw_parts(
                self.payload().cast::<u8>(),
                self.capacity() * mem::size_of::<U>(),
            )
        }
    }

    /// Returns the payload mutably if this is the only handle to the block.
    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut [U]> {
        if self.is_unique() {
            // SAFETY: unique ownership plus `&mut self` rules out any other reader.
            Some(unsafe { slice::from_raw_parts_mut(self.payload(), self.capacity()) })
        } else {
            None
        }
    }

    /// Returns the payload mutably, first detaching from other handles if the block is shared.
    #[inline]
    pub fn make_mut(&mut self) -> &mut [U] {
        if !self.is_unique() {
            *self = self.deep_copy();
        }
        // SAFETY: the block is now uniquely owned.
        unsafe { slice::from_raw_parts_mut(self.payload(), self.capacity()) }
    }

    /// Allocates a new block and copies every unit of the payload, residue included.
    pub fn try_deep_copy(&self) -> Result<Self> {
        let copy = Self::try_acquire(self.capacity())?;
        // SAFETY: both payloads hold `capacity` units and belong to different allocations.
        unsafe { ptr::copy_nonoverlapping(self.payload(), copy.payload(), self.capacity()) };
        Ok(copy)
    }

    pub fn deep_copy(&self) -> Self {
        let copy = Self::acquire(self.capacity());
        // SAFETY: both payloads hold `capacity` units and belong to different allocations.
        unsafe { ptr::copy_nonoverlapping(self.payload(), copy.payload(), self.capacity()) };
        copy
    }
}

impl<U: Unit> Clone for Storage<U> {
    #[inline]
    fn clone(&self) -> Self {
        let previous = self.header().references.fetch_add(1, Ordering::Relaxed);
        if previous >= MAX_REFERENCES {
            std::process::abort();
        }
        Self {
            header: self.header,
            marker: PhantomData,
        }
    }
}

impl<U: Unit> Drop for Storage<U> {
    fn drop(&mut self) {
        if self.header().references.fetch_sub(1, Ordering::Release) != 1 {
            return;
        }
        atomic::fence(Ordering::Acquire);

        // The layout was valid when the block was acquired, so this always succeeds.
        if let Some(layout) = Self::layout(self.capacity()) {
            // SAFETY: last handle; the block came from `alloc_zeroed` with this layout.
            unsafe { alloc::dealloc(self.header.as_ptr().cast::<u8>(), layout) }
        }
    }
}

impl<U: Unit + std::fmt::Debug> std::fmt::Debug for Storage<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("capacity", &self.capacity())
            .field("references", &self.reference_count())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn check_alignment<U: Unit>() {
        for capacity in [0, 1, 3, 64, 1000] {
            let storage = Storage::<U>::acquire(capacity);
            assert_eq!(storage.capacity(), capacity);
            assert_eq!((storage.as_ptr() as usize) % CACHE_LINE_BYTES, 0);
            assert!(storage.as_bytes().iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn aligned_and_zeroed() {
        check_alignment::<u64>();
        check_alignment::<i64>();
        check_alignment::<f64>();
        check_alignment::<Complex64>();
    }

    #[test]
    fn clone_shares() {
        let mut a = Storage::<i64>::acquire(8);
        a.make_mut()[3] = 7;
        let b = a.clone();
        assert_eq!(a.reference_count(), 2);
        assert_eq!(a.as_ptr(), b.as_ptr());
        assert_eq!(b.as_slice()[3], 7);
        drop(b);
        assert!(a.is_unique());
    }

    #[test]
    fn copy_on_write() {
        let a = Storage::<f64>::acquire(4);
        let mut b = a.clone();
        assert!(b.get_mut().is_none());

        b.make_mut()[0] = 1.5;
        assert_eq!(a.as_slice()[0], 0.0);
        assert_eq!(b.as_slice()[0], 1.5);
        assert!(a.is_unique());
        assert!(b.is_unique());
        assert!(b.get_mut().is_some());
    }

    #[test]
    fn deep_copy_includes_everything() {
        let mut a = Storage::<u64>::acquire(5);
        a.make_mut().copy_from_slice(&[1, 2, 3, 4, 5]);
        let b = a.deep_copy();
        assert_ne!(a.as_ptr(), b.as_ptr());
        assert_eq!(a.as_slice(), b.as_slice());
        assert!(a.is_unique());
    }

    #[test]
    fn shared_across_threads() {
        let a = Storage::<u64>::acquire(16);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let s = a.clone();
                std::thread::spawn(move || s.as_slice().iter().sum::<u64>())
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), 0);
        }
        assert!(a.is_unique());
    }
}
