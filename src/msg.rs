use crate::{
    frame::Frame,
    handle::{Borrowed, Handle, Resource},
    raw, Error,
};

/// A native message: an ordered list of frames that owns its frames.
///
/// Frames passed to [`append`](Handle::append) and [`prepend`](Handle::prepend)
/// are handed over to the message and destroyed with it. Frames read with
/// [`first`](Handle::first)/[`next`](Handle::next) stay in the message and are
/// only borrowed. [`pop`](Handle::pop) hands ownership back to the caller.
///
/// # Example
/// ```
/// use zhandle::{Frame, Msg};
///
/// let mut msg = Msg::new().unwrap();
/// msg.append(Frame::new(b"header").unwrap()).unwrap();
/// msg.add_mem(b"body").unwrap();
/// assert_eq!(msg.size().unwrap(), 2);
///
/// let first = msg.first().unwrap().unwrap();
/// assert_eq!(first.data().unwrap(), b"header");
/// ```
pub type Msg = Handle<raw::zmsg_t>;

impl Resource for raw::zmsg_t {
    const NAME: &'static str = "zmsg";

    unsafe fn destroy(self_p: *mut *mut Self) {
        raw::zmsg_destroy(self_p)
    }
}

impl Handle<raw::zmsg_t> {
    pub fn new() -> Result<Msg, Error> {
        Msg::own(unsafe { raw::zmsg_new() }, "zmsg_new")
    }

    /// Number of frames in the message.
    pub fn size(&self) -> Result<usize, Error> {
        let msg = self.as_ptr()?;
        Ok(unsafe { raw::zmsg_size(msg) })
    }

    /// Total number of bytes over all frames.
    pub fn content_size(&self) -> Result<usize, Error> {
        let msg = self.as_ptr()?;
        Ok(unsafe { raw::zmsg_content_size(msg) })
    }

    /// Moves `frame` to the end of the message. If the message is already
    /// destroyed the frame is dropped as usual.
    pub fn append(&mut self, frame: Frame) -> Result<(), Error> {
        let msg = self.as_ptr()?;
        take_frame(frame, "zmsg_append", |frame_p| unsafe {
            raw::zmsg_append(msg, frame_p)
        })
    }

    /// Moves `frame` to the front of the message.
    pub fn prepend(&mut self, frame: Frame) -> Result<(), Error> {
        let msg = self.as_ptr()?;
        take_frame(frame, "zmsg_prepend", |frame_p| unsafe {
            raw::zmsg_prepend(msg, frame_p)
        })
    }

    /// Appends a new frame holding a copy of `data`.
    pub fn add_mem(&mut self, data: &[u8]) -> Result<(), Error> {
        let msg = self.as_ptr()?;
        match unsafe { raw::zmsg_addmem(msg, data.as_ptr() as _, data.len()) } {
            -1 => Err(Error::NativeOperationFailed("zmsg_addmem")),
            _ => Ok(()),
        }
    }

    /// Removes the first frame and gives it to the caller, or `None` when the
    /// message is empty.
    pub fn pop(&mut self) -> Result<Option<Frame>, Error> {
        let msg = self.as_ptr()?;
        let frame = unsafe { raw::zmsg_pop(msg) };
        Ok(if frame.is_null() {
            None
        } else {
            Some(unsafe { Frame::from_raw(frame, true) })
        })
    }

    /// Rewinds the frame cursor and borrows the first frame.
    pub fn first(&mut self) -> Result<Option<Borrowed<'_, raw::zframe_t>>, Error> {
        let msg = self.as_ptr()?;
        Ok(unsafe { Borrowed::new(raw::zmsg_first(msg)) })
    }

    /// Advances the frame cursor and borrows the frame under it.
    pub fn next(&mut self) -> Result<Option<Borrowed<'_, raw::zframe_t>>, Error> {
        let msg = self.as_ptr()?;
        Ok(unsafe { Borrowed::new(raw::zmsg_next(msg)) })
    }

    /// Runs the native message self-test.
    pub fn test(verbose: bool) {
        unsafe { raw::zmsg_test(verbose) }
    }
}

/// Gives `frame` to a native call that takes ownership through `*frame_p`. If the
/// call refuses the frame and leaves the pointer in place, the frame is destroyed
/// here.
fn take_frame<F>(frame: Frame, op: &'static str, call: F) -> Result<(), Error>
where
    F: FnOnce(*mut *mut raw::zframe_t) -> libc::c_int,
{
    let mut frame = frame.into_raw()?.as_ptr();
    if call(&mut frame) == -1 {
        unsafe { Frame::from_raw(frame, false) }.destroy();
        return Err(Error::NativeOperationFailed(op));
    }
    Ok(())
}
