use std::collections::VecDeque;
use std::ptr;

use libc::{c_int, c_void, size_t};

use super::frame::{self, zframe_destroy, zframe_new};
use crate::raw::{zframe_t, zmsg_t};

const TAG: u32 = 0xcafe_0003;

struct Msg {
    tag: u32,
    frames: VecDeque<*mut zframe_t>,
    content_size: usize,
    /// Index of the frame last returned by `zmsg_first`/`zmsg_next`.
    cursor: Option<usize>,
}

unsafe fn resolve<'a>(self_: *mut zmsg_t, op: &str) -> Option<&'a mut Msg> {
    let msg = (self_ as *mut Msg).as_mut()?;
    if msg.tag != TAG {
        super::bad_object("zmsg", op);
        return None;
    }
    Some(msg)
}

/// Takes the frame at `*frame_p` and nulls the caller's pointer. Leaves it
/// alone and returns `-1` if there is no frame to take.
unsafe fn take_frame(
    self_: *mut zmsg_t,
    frame_p: *mut *mut zframe_t,
    op: &str,
    push: fn(&mut VecDeque<*mut zframe_t>, *mut zframe_t),
) -> c_int {
    let msg = match resolve(self_, op) {
        Some(msg) => msg,
        None => return -1,
    };
    if frame_p.is_null() {
        return -1;
    }
    let size = match frame::resolve(*frame_p, op) {
        Some(frame) => frame.len(),
        None => return -1,
    };
    push(&mut msg.frames, *frame_p);
    msg.content_size += size;
    *frame_p = ptr::null_mut();
    0
}

#[no_mangle]
pub unsafe extern "C" fn zmsg_new() -> *mut zmsg_t {
    let msg = Box::new(Msg {
        tag: TAG,
        frames: VecDeque::new(),
        content_size: 0,
        cursor: None,
    });
    Box::into_raw(msg) as *mut zmsg_t
}

#[no_mangle]
pub unsafe extern "C" fn zmsg_destroy(self_p: *mut *mut zmsg_t) {
    if self_p.is_null() {
        return;
    }
    if let Some(msg) = resolve(*self_p, "zmsg_destroy") {
        msg.tag = 0;
        let mut msg = Box::from_raw(msg as *mut Msg);
        for mut frame in msg.frames.drain(..) {
            zframe_destroy(&mut frame);
        }
        *self_p = ptr::null_mut();
    }
}

#[no_mangle]
pub unsafe extern "C" fn zmsg_size(self_: *mut zmsg_t) -> size_t {
    resolve(self_, "zmsg_size").map_or(0, |msg| msg.frames.len())
}

#[no_mangle]
pub unsafe extern "C" fn zmsg_content_size(self_: *mut zmsg_t) -> size_t {
    resolve(self_, "zmsg_content_size").map_or(0, |msg| msg.content_size)
}

#[no_mangle]
pub unsafe extern "C" fn zmsg_append(self_: *mut zmsg_t, frame_p: *mut *mut zframe_t) -> c_int {
    take_frame(self_, frame_p, "zmsg_append", VecDeque::push_back)
}

#[no_mangle]
pub unsafe extern "C" fn zmsg_prepend(self_: *mut zmsg_t, frame_p: *mut *mut zframe_t) -> c_int {
    let rc = take_frame(self_, frame_p, "zmsg_prepend", VecDeque::push_front);
    if rc == 0 {
        // keep the cursor on the same frame
        if let Some(msg) = resolve(self_, "zmsg_prepend") {
            msg.cursor = msg.cursor.map(|cursor| cursor + 1);
        }
    }
    rc
}

#[no_mangle]
pub unsafe extern "C" fn zmsg_addmem(self_: *mut zmsg_t, data: *const c_void, size: size_t) -> c_int {
    if resolve(self_, "zmsg_addmem").is_none() {
        return -1;
    }
    let mut frame = zframe_new(data, size);
    zmsg_append(self_, &mut frame)
}

#[no_mangle]
pub unsafe extern "C" fn zmsg_pop(self_: *mut zmsg_t) -> *mut zframe_t {
    let msg = match resolve(self_, "zmsg_pop") {
        Some(msg) => msg,
        None => return ptr::null_mut(),
    };
    msg.cursor = None;
    match msg.frames.pop_front() {
        Some(frame) => {
            msg.content_size -= frame::resolve(frame, "zmsg_pop").map_or(0, |f| f.len());
            frame
        }
        None => ptr::null_mut(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn zmsg_first(self_: *mut zmsg_t) -> *mut zframe_t {
    let msg = match resolve(self_, "zmsg_first") {
        Some(msg) => msg,
        None => return ptr::null_mut(),
    };
    msg.cursor = Some(0);
    msg.frames.front().copied().unwrap_or(ptr::null_mut())
}

/// Without a preceding `zmsg_first` this starts at the first frame.
#[no_mangle]
pub unsafe extern "C" fn zmsg_next(self_: *mut zmsg_t) -> *mut zframe_t {
    let msg = match resolve(self_, "zmsg_next") {
        Some(msg) => msg,
        None => return ptr::null_mut(),
    };
    let cursor = msg.cursor.map_or(0, |cursor| cursor + 1);
    msg.cursor = Some(cursor);
    msg.frames.get(cursor).copied().unwrap_or(ptr::null_mut())
}

#[no_mangle]
pub unsafe extern "C" fn zmsg_test(verbose: bool) {
    super::selftest("zmsg", verbose, || {
        let mut msg = zmsg_new();
        assert!(!msg.is_null());
        assert_eq!(zmsg_size(msg), 0);
        assert!(zmsg_first(msg).is_null());

        let mut frame = zframe_new(b"World".as_ptr() as _, 5);
        assert_eq!(zmsg_append(msg, &mut frame), 0);
        assert!(frame.is_null());

        let mut frame = zframe_new(b"Hello".as_ptr() as _, 5);
        assert_eq!(zmsg_prepend(msg, &mut frame), 0);
        assert!(frame.is_null());

        assert_eq!(zmsg_addmem(msg, b"!".as_ptr() as _, 1), 0);
        assert_eq!(zmsg_size(msg), 3);
        assert_eq!(zmsg_content_size(msg), 11);

        let first = zmsg_first(msg);
        assert_eq!(frame::resolve(first, "zmsg_test").map(|f| f.bytes()), Some(&b"Hello"[..]));
        assert!(!zmsg_next(msg).is_null());
        assert!(!zmsg_next(msg).is_null());
        assert!(zmsg_next(msg).is_null());

        let mut popped = zmsg_pop(msg);
        assert_eq!(popped, first);
        assert_eq!(zmsg_size(msg), 2);
        assert_eq!(zmsg_content_size(msg), 6);
        zframe_destroy(&mut popped);

        // a null frame is refused and nothing changes
        let mut nothing: *mut zframe_t = ptr::null_mut();
        assert_eq!(zmsg_append(msg, &mut nothing), -1);
        assert_eq!(zmsg_size(msg), 2);

        zmsg_destroy(&mut msg);
        assert!(msg.is_null());
    });
}

#[cfg(test)]
mod tests {
    use super::super::frame::testmod::destroyed;
    use super::super::frame::zframe_size;
    use super::*;

    #[test]
    fn test_contained_frames_destroyed_once() {
        unsafe {
            let mut msg = zmsg_new();
            let mut head = zframe_new(b"head".as_ptr() as _, 4);
            let mut tail = zframe_new(b"tail".as_ptr() as _, 4);
            assert_eq!(zmsg_append(msg, &mut tail), 0);
            assert_eq!(zmsg_prepend(msg, &mut head), 0);
            assert_eq!(zmsg_addmem(msg, b"mem".as_ptr() as _, 3), 0);
            assert!(head.is_null() && tail.is_null());

            // a popped frame belongs to the caller and is not released by the message
            let mut popped = zmsg_pop(msg);
            assert!(!popped.is_null());

            let before = destroyed();
            zmsg_destroy(&mut msg);
            assert!(msg.is_null());
            assert_eq!(destroyed(), before + 2);

            zmsg_destroy(&mut msg);
            assert_eq!(destroyed(), before + 2);

            assert_eq!(zframe_size(popped), 4);
            zframe_destroy(&mut popped);
            assert_eq!(destroyed(), before + 3);
        }
    }

    #[test]
    fn test_destroy_takes_frames_along() {
        unsafe {
            let mut msg = zmsg_new();
            for word in [&b"one"[..], b"two", b"three"] {
                assert_eq!(zmsg_addmem(msg, word.as_ptr() as _, word.len()), 0);
            }
            assert_eq!(zmsg_size(msg), 3);
            assert_eq!(zmsg_content_size(msg), 11);

            zmsg_destroy(&mut msg);
            assert!(msg.is_null());
            zmsg_destroy(&mut msg);
        }
    }

    #[test]
    fn test_cursor() {
        unsafe {
            let mut msg = zmsg_new();
            zmsg_addmem(msg, b"a".as_ptr() as _, 1);
            zmsg_addmem(msg, b"b".as_ptr() as _, 1);

            let a = zmsg_first(msg);
            let b = zmsg_next(msg);
            assert!(!a.is_null() && !b.is_null() && a != b);
            assert!(zmsg_next(msg).is_null());

            // prepending keeps the cursor on the current frame
            assert_eq!(zmsg_first(msg), a);
            let mut front = zframe_new(b"z".as_ptr() as _, 1);
            zmsg_prepend(msg, &mut front);
            assert_eq!(zmsg_next(msg), b);

            // popping resets it
            let mut popped = zmsg_pop(msg);
            zframe_destroy(&mut popped);
            assert_eq!(zmsg_next(msg), a);

            zmsg_destroy(&mut msg);
        }
    }

    #[test]
    fn test_refused_frame_stays_with_caller() {
        unsafe {
            let mut frame = zframe_new(b"x".as_ptr() as _, 1);
            let before = frame;
            assert_eq!(zmsg_append(ptr::null_mut(), &mut frame), -1);
            assert_eq!(frame, before);
            zframe_destroy(&mut frame);
        }
    }

    #[test]
    fn test_null_inputs_give_sentinels() {
        unsafe {
            let null = ptr::null_mut();
            assert_eq!(zmsg_size(null), 0);
            assert_eq!(zmsg_content_size(null), 0);
            assert!(zmsg_pop(null).is_null());
            assert!(zmsg_first(null).is_null());
            assert!(zmsg_next(null).is_null());
            assert_eq!(zmsg_addmem(null, ptr::null(), 0), -1);
            zmsg_destroy(ptr::null_mut());
        }
    }

    #[test]
    fn test_selftest() {
        unsafe { zmsg_test(false) };
    }
}
