//! The native object library behind [`raw`](crate::raw).
//!
//! Everything here is exported with the C ABI under the names `raw` declares, and
//! Rust code in this crate only reaches it through those declarations. Objects are
//! boxed and carry a tag so a pointer of the wrong class, or one that was already
//! destroyed, is rejected instead of being dereferenced as something else. Null or
//! rejected inputs return the call's failure sentinel.

mod frame;
mod msg;
mod sys;
mod udp;

/// Reports a native object that failed its tag check.
fn bad_object(class: &str, op: &str) {
    log::error!("{}: not a live {} object", op, class);
}

/// Prints the self-test banner, and `OK` once the test body returns.
fn selftest<F: FnOnce()>(class: &str, verbose: bool, body: F) {
    print!(" * {}: ", class);
    if verbose {
        println!();
    }
    body();
    println!("OK");
}
