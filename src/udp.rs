use std::ffi::CString;

use libc::c_int;

use crate::{
    buf_to_string, config,
    frame::Frame,
    handle::{Handle, Resource},
    raw, Error,
};

/// Delivery mode of a [`Udp`] socket.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UdpType {
    Unicast = raw::ZUDP_UNICAST,
    /// Binding joins the multicast group given as the bind address.
    Multicast = raw::ZUDP_MULTICAST,
    /// Can send to broadcast addresses. Cannot be bound.
    Broadcast = raw::ZUDP_BROADCAST,
}

/// A native UDP socket.
///
/// The socket family (IPv4 or IPv6) is chosen when the socket is created, from
/// [`Config::ipv6`](crate::Config::ipv6).
pub type Udp = Handle<raw::zudp_t>;

impl Resource for raw::zudp_t {
    const NAME: &'static str = "zudp";

    unsafe fn destroy(self_p: *mut *mut Self) {
        raw::zudp_destroy(self_p)
    }
}

impl Handle<raw::zudp_t> {
    /// Creates a socket. With `reuse`, several sockets may bind the same address
    /// and port.
    pub fn new(kind: UdpType, reuse: bool) -> Result<Udp, Error> {
        Udp::own(unsafe { raw::zudp_new(kind as c_int, reuse) }, "zudp_new")
    }

    /// Binds the socket. `"*"` or an empty address binds every interface; for a
    /// multicast socket the address is the group to join.
    pub fn bind(&mut self, address: &str, port: u16) -> Result<(), Error> {
        let udp = self.as_ptr()?;
        let address = CString::new(address)?;
        match unsafe { raw::zudp_bind(udp, address.as_ptr(), port.into()) } {
            -1 => Err(Error::NativeOperationFailed("zudp_bind")),
            _ => Ok(()),
        }
    }

    /// Sends the contents of `frame` to a numeric address. Fails when the address
    /// does not parse or the datagram could not be sent, which happens easily when
    /// an interface disappears.
    pub fn sendto(&mut self, frame: &Frame, address: &str, port: u16) -> Result<(), Error> {
        let udp = self.as_ptr()?;
        let frame = frame.as_ptr()?;
        let address = CString::new(address)?;
        match unsafe { raw::zudp_sendto(udp, frame, address.as_ptr(), port.into()) } {
            -1 => Err(Error::NativeOperationFailed("zudp_sendto")),
            _ => Ok(()),
        }
    }

    /// Blocks until a datagram arrives. Returns it as an owned frame, together
    /// with the numeric host of the sender.
    pub fn recv(&mut self) -> Result<(Frame, String), Error> {
        let udp = self.as_ptr()?;
        let mut peer = vec![0u8; config::current().peer_name_max];
        let peerlen = c_int::try_from(peer.len()).map_err(|_| Error::BufferOverflow)?;

        let frame = unsafe { raw::zudp_recv(udp, peer.as_mut_ptr() as _, peerlen) };
        let frame = Frame::own(frame, "zudp_recv")?;
        Ok((frame, buf_to_string(&peer)?))
    }

    /// The underlying socket descriptor.
    pub fn fd(&self) -> Result<c_int, Error> {
        let udp = self.as_ptr()?;
        Ok(unsafe { raw::zudp_fd(udp) })
    }

    /// Reports the current socket error for `reason`. "Try again" errors are
    /// logged at debug level, everything else at error level.
    pub fn error(reason: &str) -> Result<(), Error> {
        let reason = CString::new(reason)?;
        unsafe { raw::zudp_error(reason.as_ptr()) };
        Ok(())
    }

    /// Runs the native UDP self-test, which uses port 7777 on loopback.
    pub fn test(verbose: bool) {
        unsafe { raw::zudp_test(verbose) }
    }
}
