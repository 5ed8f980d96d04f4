//! `extern "C"` declarations for the native object library.
//!
//! Handle types are opaque: they are only ever passed back to the functions
//! below. Functions that take a `*mut *mut T` either destroy the object or take
//! ownership of it, and null the caller's pointer when they do.

#![allow(non_camel_case_types)]

use libc::{c_char, c_int, c_void, size_t};
#[cfg(test)]
use mockall::automock;

/// A single blob of bytes with a "more" flag.
pub enum zframe_t {}

/// An ordered list of frames that owns its frames.
pub enum zmsg_t {}

/// A UDP socket.
pub enum zudp_t {}

pub const ZUDP_UNICAST: c_int = 0;
pub const ZUDP_MULTICAST: c_int = 1;
pub const ZUDP_BROADCAST: c_int = 2;

/// Largest datagram `zudp_recv` will return; longer datagrams are truncated.
pub const UDP_FRAME_MAX: usize = 255;

/// Default size of the peer-name buffer handed to `zudp_recv`. This is
/// `NI_MAXHOST`, which fits any numeric IPv4 or IPv6 host including a scope suffix.
pub const PEER_NAME_MAX: usize = 1025;

#[cfg_attr(test, automock)]
pub mod ffi {
    use super::*;

    extern "C" {
        pub fn zframe_new(data: *const c_void, size: size_t) -> *mut zframe_t;
        pub fn zframe_destroy(self_p: *mut *mut zframe_t);
        pub fn zframe_size(self_: *mut zframe_t) -> size_t;
        pub fn zframe_data(self_: *mut zframe_t) -> *mut u8;
        pub fn zframe_dup(self_: *mut zframe_t) -> *mut zframe_t;
        pub fn zframe_more(self_: *mut zframe_t) -> c_int;
        pub fn zframe_set_more(self_: *mut zframe_t, more: c_int);
        pub fn zframe_eq(self_: *mut zframe_t, other: *mut zframe_t) -> bool;
        pub fn zframe_test(verbose: bool);

        pub fn zmsg_new() -> *mut zmsg_t;
        pub fn zmsg_destroy(self_p: *mut *mut zmsg_t);
        pub fn zmsg_size(self_: *mut zmsg_t) -> size_t;
        pub fn zmsg_content_size(self_: *mut zmsg_t) -> size_t;
        pub fn zmsg_append(self_: *mut zmsg_t, frame_p: *mut *mut zframe_t) -> c_int;
        pub fn zmsg_prepend(self_: *mut zmsg_t, frame_p: *mut *mut zframe_t) -> c_int;
        pub fn zmsg_addmem(self_: *mut zmsg_t, data: *const c_void, size: size_t) -> c_int;
        pub fn zmsg_pop(self_: *mut zmsg_t) -> *mut zframe_t;
        pub fn zmsg_first(self_: *mut zmsg_t) -> *mut zframe_t;
        pub fn zmsg_next(self_: *mut zmsg_t) -> *mut zframe_t;
        pub fn zmsg_test(verbose: bool);

        pub fn zudp_new(type_: c_int, reuse: bool) -> *mut zudp_t;
        pub fn zudp_destroy(self_p: *mut *mut zudp_t);
        pub fn zudp_sendto(
            self_: *mut zudp_t,
            frame: *mut zframe_t,
            address: *const c_char,
            port: c_int,
        ) -> c_int;
        pub fn zudp_recv(self_: *mut zudp_t, peername: *mut c_char, peerlen: c_int)
            -> *mut zframe_t;
        pub fn zudp_bind(self_: *mut zudp_t, address: *const c_char, port: c_int) -> c_int;
        pub fn zudp_fd(self_: *mut zudp_t) -> c_int;
        pub fn zudp_error(reason: *const c_char);
        pub fn zudp_test(verbose: bool);

        pub fn zsys_set_ipv6(ipv6: bool);
        pub fn zsys_ipv6() -> bool;
    }
}

#[cfg(not(test))]
pub use ffi::*;

#[cfg(test)]
pub use mock_ffi::*;

// GRCOV_EXCL_STOP
