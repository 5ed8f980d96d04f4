use std::ffi::CStr;
use std::sync::atomic::{AtomicBool, Ordering};

use libc::{c_char, c_int};

static IPV6: AtomicBool = AtomicBool::new(false);

/// Errors after which a socket is still usable; these are only worth a debug line.
const TRANSIENT: &[c_int] = &[
    libc::EAGAIN,
    libc::EWOULDBLOCK,
    libc::EINTR,
    libc::ENETDOWN,
    libc::ENETUNREACH,
    libc::EHOSTUNREACH,
    libc::EHOSTDOWN,
    libc::EPIPE,
    libc::ECONNRESET,
    libc::ENOPROTOOPT,
    libc::EOPNOTSUPP,
    libc::EPROTO,
];

pub(super) fn ipv6() -> bool {
    IPV6.load(Ordering::Acquire)
}

/// Logs the current `errno` for a failed socket call named by `reason`.
pub(super) fn socket_error(reason: &str) {
    let err = errno::errno();
    if TRANSIENT.contains(&err.0) {
        log::debug!("(UDP) transient error '{}' on {}", err, reason);
    } else {
        log::error!("(UDP) error '{}' on {}", err, reason);
    }
}

#[no_mangle]
pub unsafe extern "C" fn zsys_set_ipv6(ipv6: bool) {
    IPV6.store(ipv6, Ordering::Release);
}

#[no_mangle]
pub unsafe extern "C" fn zsys_ipv6() -> bool {
    ipv6()
}

#[no_mangle]
pub unsafe extern "C" fn zudp_error(reason: *const c_char) {
    if reason.is_null() {
        socket_error("(unknown)");
    } else {
        socket_error(&CStr::from_ptr(reason).to_string_lossy());
    }
}
