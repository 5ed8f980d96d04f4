//! zhandle exposes CZMQ-style native objects (frames, messages and UDP endpoints)
//! through a single handle type that owns the native pointer and governs when the
//! native destructor runs.
//!
//! Every wrapped object is a [`Handle<T>`], parameterised by the opaque native type.
//! A handle is either live, destroyed or transferred:
//!
//! * [`Handle::destroy`] releases the native object once and is idempotent.
//! * [`Handle::give_reference`] and [`Handle::into_raw`] hand the raw pointer to
//!   the caller without running the destructor.
//! * Dropping an owning handle hands its destructor to the finalizer registry,
//!   which runs it immediately or on the next [`finalizer::collect`] pass,
//!   depending on [`Reclaim`].
//!
//! Any operation on a handle that no longer holds a pointer fails with
//! [`Error::DestroyedHandle`] before reaching native code.
//!
//! # Example
//!
//! ```no_run
//! use zhandle::{Frame, Udp, UdpType};
//!
//! let mut receiver = Udp::new(UdpType::Unicast, true).unwrap();
//! receiver.bind("127.0.0.1", 5670).unwrap();
//!
//! let mut sender = Udp::new(UdpType::Unicast, true).unwrap();
//! let frame = Frame::new(b"ping").unwrap();
//! sender.sendto(&frame, "127.0.0.1", 5670).unwrap();
//!
//! let (reply, peer) = receiver.recv().unwrap();
//! assert_eq!(reply.data().unwrap(), b"ping");
//! println!("from {}", peer);
//! ```

use std::ffi;
use std::fmt;

use self::Error::*;

pub mod config;
pub mod finalizer;
mod frame;
mod handle;
mod msg;
mod native;
pub mod raw;
mod udp;

pub use config::{Config, Reclaim};
pub use frame::Frame;
pub use handle::{Borrowed, Handle, Resource};
pub use msg::Msg;
pub use udp::{Udp, UdpType};

/// An error returned by a handle operation or by the native library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The handle was destroyed or its ownership was given away.
    DestroyedHandle(&'static str),
    /// The named native function returned its failure sentinel.
    NativeOperationFailed(&'static str),
    /// A string argument contained an interior NUL byte.
    InvalidString,
    /// The native library returned text that is not valid UTF-8.
    MalformedString(std::str::Utf8Error),
    /// A length does not fit the native integer type.
    BufferOverflow,
    /// A configuration value could not be parsed.
    InvalidConfig(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DestroyedHandle(name) => write!(f, "{} handle used after destroy or transfer", name),
            NativeOperationFailed(op) => write!(f, "native call {} failed", op),
            InvalidString => write!(f, "string contains an interior nul byte"),
            MalformedString(ref e) => write!(f, "native library returned invalid UTF-8: {}", e),
            BufferOverflow => write!(f, "length exceeds the native integer range"),
            InvalidConfig(ref msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            MalformedString(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<ffi::NulError> for Error {
    fn from(_: ffi::NulError) -> Error {
        InvalidString
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(obj: std::str::Utf8Error) -> Error {
        MalformedString(obj)
    }
}

/// Reads a NUL-terminated buffer filled in by native code.
fn buf_to_string(buf: &[u8]) -> Result<String, Error> {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Ok(std::str::from_utf8(&buf[..end])?.to_owned())
}

#[cfg(test)]
mod tests {
    use std::ffi::CString;

    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            format!("{}", Error::DestroyedHandle("zudp")),
            "zudp handle used after destroy or transfer"
        );
        assert_eq!(
            format!("{}", Error::NativeOperationFailed("zudp_bind")),
            "native call zudp_bind failed"
        );
        assert_eq!(
            format!("{}", Error::InvalidString),
            "string contains an interior nul byte"
        );
    }

    #[test]
    fn test_error_from_nul() {
        let err: Error = CString::new("a\0b").unwrap_err().into();
        assert_eq!(err, Error::InvalidString);
    }

    #[test]
    fn test_malformed_has_source() {
        let bytes = vec![0xff, 0xfe];
        let utf8 = std::str::from_utf8(&bytes).unwrap_err();
        let err: Error = utf8.into();
        assert!(std::error::Error::source(&err).is_some());
        assert!(std::error::Error::source(&Error::BufferOverflow).is_none());
    }

    #[test]
    fn test_buf_to_string() {
        let mut buf = [0u8; 16];
        buf[..9].copy_from_slice(b"127.0.0.1");
        assert_eq!(buf_to_string(&buf).unwrap(), "127.0.0.1");
        assert_eq!(buf_to_string(b"no-terminator").unwrap(), "no-terminator");
        assert!(buf_to_string(&[0xff, 0]).is_err());
    }
}
