use std::ptr;
use std::slice;

use libc::{c_int, c_void, size_t};

use crate::raw::zframe_t;

const TAG: u32 = 0xcafe_0002;

pub(super) struct Frame {
    tag: u32,
    data: Vec<u8>,
    more: bool,
}

impl Frame {
    pub(super) fn boxed(data: Vec<u8>, more: bool) -> *mut zframe_t {
        let frame = Box::new(Frame {
            tag: TAG,
            data,
            more,
        });
        Box::into_raw(frame) as *mut zframe_t
    }

    pub(super) fn len(&self) -> usize {
        self.data.len()
    }

    pub(super) fn bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Resolves a frame pointer, or `None` for null and non-frame pointers.
///
/// # Safety
///
/// `self_` must be null or point to memory readable as a [`Frame`].
pub(super) unsafe fn resolve<'a>(self_: *mut zframe_t, op: &str) -> Option<&'a mut Frame> {
    let frame = (self_ as *mut Frame).as_mut()?;
    if frame.tag != TAG {
        super::bad_object("zframe", op);
        return None;
    }
    Some(frame)
}

#[no_mangle]
pub unsafe extern "C" fn zframe_new(data: *const c_void, size: size_t) -> *mut zframe_t {
    let data = if data.is_null() {
        vec![0; size]
    } else {
        slice::from_raw_parts(data as *const u8, size).to_vec()
    };
    Frame::boxed(data, false)
}

#[no_mangle]
pub unsafe extern "C" fn zframe_destroy(self_p: *mut *mut zframe_t) {
    if self_p.is_null() {
        return;
    }
    if let Some(frame) = resolve(*self_p, "zframe_destroy") {
        frame.tag = 0;
        drop(Box::from_raw(frame as *mut Frame));
        *self_p = ptr::null_mut();
        #[cfg(test)]
        testmod::DESTROYED.with(|count| count.set(count.get() + 1));
    }
}

#[no_mangle]
pub unsafe extern "C" fn zframe_size(self_: *mut zframe_t) -> size_t {
    resolve(self_, "zframe_size").map_or(0, |frame| frame.len())
}

#[no_mangle]
pub unsafe extern "C" fn zframe_data(self_: *mut zframe_t) -> *mut u8 {
    resolve(self_, "zframe_data").map_or(ptr::null_mut(), |frame| frame.data.as_mut_ptr())
}

#[no_mangle]
pub unsafe extern "C" fn zframe_dup(self_: *mut zframe_t) -> *mut zframe_t {
    resolve(self_, "zframe_dup").map_or(ptr::null_mut(), |frame| {
        Frame::boxed(frame.data.clone(), frame.more)
    })
}

#[no_mangle]
pub unsafe extern "C" fn zframe_more(self_: *mut zframe_t) -> c_int {
    resolve(self_, "zframe_more").map_or(0, |frame| frame.more as c_int)
}

#[no_mangle]
pub unsafe extern "C" fn zframe_set_more(self_: *mut zframe_t, more: c_int) {
    if let Some(frame) = resolve(self_, "zframe_set_more") {
        frame.more = more != 0;
    }
}

#[no_mangle]
pub unsafe extern "C" fn zframe_eq(self_: *mut zframe_t, other: *mut zframe_t) -> bool {
    if self_ == other {
        return resolve(self_, "zframe_eq").is_some();
    }
    match (resolve(self_, "zframe_eq"), resolve(other, "zframe_eq")) {
        (Some(a), Some(b)) => a.data == b.data,
        _ => false,
    }
}

#[no_mangle]
pub unsafe extern "C" fn zframe_test(verbose: bool) {
    super::selftest("zframe", verbose, || {
        let mut frame = zframe_new(b"Hello".as_ptr() as _, 5);
        assert!(!frame.is_null());
        assert_eq!(zframe_size(frame), 5);
        assert_eq!(slice::from_raw_parts(zframe_data(frame), 5), b"Hello");
        assert_eq!(zframe_more(frame), 0);

        zframe_set_more(frame, 1);
        let mut copy = zframe_dup(frame);
        assert_eq!(zframe_more(copy), 1);
        assert!(zframe_eq(frame, copy));

        let mut blank = zframe_new(ptr::null(), 3);
        assert_eq!(zframe_size(blank), 3);
        assert!(!zframe_eq(frame, blank));

        zframe_destroy(&mut frame);
        zframe_destroy(&mut copy);
        zframe_destroy(&mut blank);
        assert!(frame.is_null() && copy.is_null() && blank.is_null());

        // destroying an already nulled pointer is a no-op
        zframe_destroy(&mut frame);
        zframe_destroy(ptr::null_mut());
    });
}

// GRCOV_EXCL_START
#[cfg(test)]
pub(super) mod testmod {
    use std::cell::Cell;

    thread_local! {
        /// Frames released on this thread. Tests run on their own threads, so
        /// each test sees only its own destroys.
        pub static DESTROYED: Cell<usize> = Cell::new(0);
    }

    pub fn destroyed() -> usize {
        DESTROYED.with(Cell::get)
    }
}
// GRCOV_EXCL_STOP
