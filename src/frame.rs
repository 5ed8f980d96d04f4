use std::slice;

use crate::{
    handle::{Handle, Resource},
    raw, Error,
};

/// A native frame: a blob of bytes plus a "more" flag.
///
/// # Example
/// ```
/// use zhandle::Frame;
///
/// let mut frame = Frame::new(b"hello").unwrap();
/// assert_eq!(frame.size().unwrap(), 5);
///
/// frame.destroy();
/// assert!(frame.is_null());
/// assert!(frame.data().is_err());
/// ```
pub type Frame = Handle<raw::zframe_t>;

impl Resource for raw::zframe_t {
    const NAME: &'static str = "zframe";

    unsafe fn destroy(self_p: *mut *mut Self) {
        raw::zframe_destroy(self_p)
    }
}

impl Handle<raw::zframe_t> {
    /// Creates a frame holding a copy of `data`.
    pub fn new(data: &[u8]) -> Result<Frame, Error> {
        let ptr = unsafe { raw::zframe_new(data.as_ptr() as _, data.len()) };
        Frame::own(ptr, "zframe_new")
    }

    pub fn size(&self) -> Result<usize, Error> {
        let frame = self.as_ptr()?;
        Ok(unsafe { raw::zframe_size(frame) })
    }

    /// The frame contents. The slice borrows the handle, so the frame cannot be
    /// destroyed while it is in use.
    pub fn data(&self) -> Result<&[u8], Error> {
        let frame = self.as_ptr()?;
        unsafe {
            let size = raw::zframe_size(frame);
            let data = raw::zframe_data(frame);
            if size == 0 || data.is_null() {
                return Ok(&[]);
            }
            Ok(slice::from_raw_parts(data, size))
        }
    }

    /// Copies the frame into a new, owned frame.
    pub fn dup(&self) -> Result<Frame, Error> {
        let frame = self.as_ptr()?;
        Frame::own(unsafe { raw::zframe_dup(frame) }, "zframe_dup")
    }

    /// True if more frames of the same message follow this one.
    pub fn more(&self) -> Result<bool, Error> {
        let frame = self.as_ptr()?;
        Ok(unsafe { raw::zframe_more(frame) } != 0)
    }

    pub fn set_more(&mut self, more: bool) -> Result<(), Error> {
        let frame = self.as_ptr()?;
        unsafe { raw::zframe_set_more(frame, more as _) };
        Ok(())
    }

    /// Compares the contents of two frames.
    pub fn content_eq(&self, other: &Frame) -> Result<bool, Error> {
        let frame = self.as_ptr()?;
        let other = other.as_ptr()?;
        Ok(unsafe { raw::zframe_eq(frame, other) })
    }

    /// Runs the native frame self-test.
    pub fn test(verbose: bool) {
        unsafe { raw::zframe_test(verbose) }
    }
}

// GRCOV_EXCL_STOP
