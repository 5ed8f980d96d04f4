use std::ffi::CStr;
use std::mem;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::ptr;
use std::slice;

use libc::{c_char, c_int, c_void, sockaddr, sockaddr_in, sockaddr_in6, sockaddr_storage, socklen_t};

use super::frame::{self, Frame};
use super::sys::{self, socket_error};
use crate::raw::{zframe_t, zudp_t, UDP_FRAME_MAX, ZUDP_BROADCAST, ZUDP_MULTICAST, ZUDP_UNICAST};

const TAG: u32 = 0xcafe_0010;

struct Udp {
    tag: u32,
    fd: c_int,
    kind: c_int,
    /// Socket family, fixed when the socket is created.
    ipv6: bool,
}

impl Udp {
    fn parse(&self, address: &str) -> Option<IpAddr> {
        if self.ipv6 {
            address.parse::<Ipv6Addr>().ok().map(IpAddr::V6)
        } else {
            address.parse::<Ipv4Addr>().ok().map(IpAddr::V4)
        }
    }

    fn unspecified(&self) -> IpAddr {
        if self.ipv6 {
            IpAddr::V6(Ipv6Addr::UNSPECIFIED)
        } else {
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        }
    }

    fn bind_to(&self, ip: IpAddr, port: u16) -> c_int {
        let (addr, len) = socket_addr(ip, port);
        let rc = unsafe { libc::bind(self.fd, &addr as *const _ as *const sockaddr, len) };
        if rc == -1 {
            socket_error("bind");
        }
        rc
    }

    fn unicast_bind(&self, address: &str, port: u16) -> c_int {
        let ip = if is_wildcard(address) {
            self.unspecified()
        } else {
            match self.parse(address) {
                Some(ip) => ip,
                None => {
                    log::error!("zudp_bind: cannot parse address {:?}", address);
                    return -1;
                }
            }
        };
        self.bind_to(ip, port)
    }

    fn multicast_bind(&self, address: &str, port: u16) -> c_int {
        if is_wildcard(address) {
            log::error!("zudp_bind: a multicast socket needs a group address");
            return -1;
        }
        let group = match self.parse(address) {
            Some(group) => group,
            None => {
                log::error!("zudp_bind: cannot parse multicast group {:?}", address);
                return -1;
            }
        };
        if self.bind_to(self.unspecified(), port) == -1 {
            return -1;
        }
        let rc = match group {
            IpAddr::V4(group) => unsafe {
                let mut mreq: libc::ip_mreq = mem::zeroed();
                mreq.imr_multiaddr.s_addr = u32::from_ne_bytes(group.octets());
                mreq.imr_interface.s_addr = libc::INADDR_ANY;
                set_option(self.fd, libc::IPPROTO_IP, libc::IP_ADD_MEMBERSHIP, &mreq)
            },
            IpAddr::V6(group) => unsafe {
                let mut mreq: libc::ipv6_mreq = mem::zeroed();
                mreq.ipv6mr_multiaddr.s6_addr = group.octets();
                set_option(self.fd, libc::IPPROTO_IPV6, IPV6_JOIN, &mreq)
            },
        };
        if rc == -1 {
            socket_error("setsockopt (join multicast group)");
            return -1;
        }
        0
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
const IPV6_JOIN: c_int = libc::IPV6_ADD_MEMBERSHIP;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const IPV6_JOIN: c_int = libc::IPV6_JOIN_GROUP;

#[cfg(any(target_os = "linux", target_os = "android"))]
const SOCK_FLAGS: c_int = libc::SOCK_DGRAM | libc::SOCK_CLOEXEC;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const SOCK_FLAGS: c_int = libc::SOCK_DGRAM;

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
unsafe fn reuse_port(fd: c_int) {
    let on: c_int = 1;
    if set_option(fd, libc::SOL_SOCKET, libc::SO_REUSEPORT, &on) == -1 {
        socket_error("setsockopt (SO_REUSEPORT)");
    }
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
)))]
unsafe fn reuse_port(_fd: c_int) {}

fn is_wildcard(address: &str) -> bool {
    address.is_empty() || address == "*"
}

fn socket_addr(ip: IpAddr, port: u16) -> (sockaddr_storage, socklen_t) {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };
    let len = match ip {
        IpAddr::V4(ip) => {
            let sin = unsafe { &mut *(&mut storage as *mut _ as *mut sockaddr_in) };
            sin.sin_family = libc::AF_INET as _;
            sin.sin_port = port.to_be();
            sin.sin_addr.s_addr = u32::from_ne_bytes(ip.octets());
            mem::size_of::<sockaddr_in>()
        }
        IpAddr::V6(ip) => {
            let sin6 = unsafe { &mut *(&mut storage as *mut _ as *mut sockaddr_in6) };
            sin6.sin6_family = libc::AF_INET6 as _;
            sin6.sin6_port = port.to_be();
            sin6.sin6_addr.s6_addr = ip.octets();
            mem::size_of::<sockaddr_in6>()
        }
    };
    (storage, len as socklen_t)
}

unsafe fn set_option<T>(fd: c_int, level: c_int, name: c_int, value: &T) -> c_int {
    libc::setsockopt(
        fd,
        level,
        name,
        value as *const T as *const c_void,
        mem::size_of::<T>() as socklen_t,
    )
}

/// Appends `%ifname` to the NUL-terminated host in `peer` if it fits.
fn append_scope(peer: &mut [u8], ifname: &[u8]) -> bool {
    let end = match peer.iter().position(|&b| b == 0) {
        Some(end) => end,
        None => return false,
    };
    if peer[..end].contains(&b'%') {
        return true;
    }
    if end + 1 + ifname.len() >= peer.len() {
        return false;
    }
    peer[end] = b'%';
    peer[end + 1..end + 1 + ifname.len()].copy_from_slice(ifname);
    peer[end + 1 + ifname.len()] = 0;
    true
}

unsafe fn resolve<'a>(self_: *mut zudp_t, op: &str) -> Option<&'a mut Udp> {
    let udp = (self_ as *mut Udp).as_mut()?;
    if udp.tag != TAG {
        super::bad_object("zudp", op);
        return None;
    }
    Some(udp)
}

unsafe fn port_and_address<'a>(address: *const c_char, port: c_int, op: &str) -> Option<(&'a str, u16)> {
    if address.is_null() {
        log::error!("{}: no address", op);
        return None;
    }
    let address = match CStr::from_ptr(address).to_str() {
        Ok(address) => address,
        Err(_) => {
            log::error!("{}: address is not UTF-8", op);
            return None;
        }
    };
    match u16::try_from(port) {
        Ok(port) => Some((address, port)),
        Err(_) => {
            log::error!("{}: port {} out of range", op, port);
            None
        }
    }
}

#[no_mangle]
pub unsafe extern "C" fn zudp_new(type_: c_int, reuse: bool) -> *mut zudp_t {
    if !(ZUDP_UNICAST..=ZUDP_BROADCAST).contains(&type_) {
        log::error!("zudp_new: unknown socket type {}", type_);
        return ptr::null_mut();
    }

    let ipv6 = sys::ipv6();
    let family = if ipv6 { libc::AF_INET6 } else { libc::AF_INET };
    let fd = libc::socket(family, SOCK_FLAGS, libc::IPPROTO_UDP);
    if fd == -1 {
        socket_error("socket");
        return ptr::null_mut();
    }

    let on: c_int = 1;
    if reuse {
        // let several sockets bind the same port; datagrams go to each of them
        if set_option(fd, libc::SOL_SOCKET, libc::SO_REUSEADDR, &on) == -1 {
            socket_error("setsockopt (SO_REUSEADDR)");
        }
        reuse_port(fd);
    }
    if type_ == ZUDP_BROADCAST && set_option(fd, libc::SOL_SOCKET, libc::SO_BROADCAST, &on) == -1 {
        socket_error("setsockopt (SO_BROADCAST)");
    }

    let udp = Box::new(Udp {
        tag: TAG,
        fd,
        kind: type_,
        ipv6,
    });
    Box::into_raw(udp) as *mut zudp_t
}

#[no_mangle]
pub unsafe extern "C" fn zudp_destroy(self_p: *mut *mut zudp_t) {
    if self_p.is_null() {
        return;
    }
    if let Some(udp) = resolve(*self_p, "zudp_destroy") {
        libc::close(udp.fd);
        udp.tag = 0;
        drop(Box::from_raw(udp as *mut Udp));
        *self_p = ptr::null_mut();
    }
}

#[no_mangle]
pub unsafe extern "C" fn zudp_bind(self_: *mut zudp_t, address: *const c_char, port: c_int) -> c_int {
    let udp = match resolve(self_, "zudp_bind") {
        Some(udp) => udp,
        None => return -1,
    };
    let (address, port) = match port_and_address(address, port, "zudp_bind") {
        Some(parsed) => parsed,
        None => return -1,
    };
    match udp.kind {
        ZUDP_UNICAST => udp.unicast_bind(address, port),
        ZUDP_MULTICAST => udp.multicast_bind(address, port),
        _ => {
            log::error!("zudp_bind: broadcast sockets cannot be bound");
            -1
        }
    }
}

#[no_mangle]
pub unsafe extern "C" fn zudp_sendto(
    self_: *mut zudp_t,
    frame: *mut zframe_t,
    address: *const c_char,
    port: c_int,
) -> c_int {
    let udp = match resolve(self_, "zudp_sendto") {
        Some(udp) => udp,
        None => return -1,
    };
    let frame = match frame::resolve(frame, "zudp_sendto") {
        Some(frame) => frame,
        None => return -1,
    };
    let (address, port) = match port_and_address(address, port, "zudp_sendto") {
        Some(parsed) => parsed,
        None => return -1,
    };
    let ip = match udp.parse(address) {
        Some(ip) => ip,
        None => {
            log::error!("zudp_sendto: cannot parse address {:?}", address);
            return -1;
        }
    };

    let (addr, len) = socket_addr(ip, port);
    let data = frame.bytes();
    let sent = libc::sendto(
        udp.fd,
        data.as_ptr() as *const c_void,
        data.len(),
        0,
        &addr as *const _ as *const sockaddr,
        len,
    );
    if sent == -1 {
        log::debug!("zudp_sendto: failed, reason={}", errno::errno());
        return -1;
    }
    0
}

/// Blocks for one datagram, truncated to `UDP_FRAME_MAX` bytes, and writes the
/// numeric host of the sender into `peername`.
#[no_mangle]
pub unsafe extern "C" fn zudp_recv(self_: *mut zudp_t, peername: *mut c_char, peerlen: c_int) -> *mut zframe_t {
    let udp = match resolve(self_, "zudp_recv") {
        Some(udp) => udp,
        None => return ptr::null_mut(),
    };
    let peerlen = match usize::try_from(peerlen) {
        Ok(peerlen) if peerlen > 0 && !peername.is_null() => peerlen,
        _ => {
            log::error!("zudp_recv: no room for the peer name");
            return ptr::null_mut();
        }
    };

    let mut buffer = [0u8; UDP_FRAME_MAX];
    let mut addr: sockaddr_storage = mem::zeroed();
    let mut addr_len = mem::size_of::<sockaddr_storage>() as socklen_t;
    let size = libc::recvfrom(
        udp.fd,
        buffer.as_mut_ptr() as *mut c_void,
        buffer.len(),
        0,
        &mut addr as *mut _ as *mut sockaddr,
        &mut addr_len,
    );
    if size == -1 {
        socket_error("recvfrom");
        return ptr::null_mut();
    }

    let rc = libc::getnameinfo(
        &addr as *const _ as *const sockaddr,
        addr_len,
        peername,
        peerlen as socklen_t,
        ptr::null_mut(),
        0,
        libc::NI_NUMERICHOST,
    );
    if rc != 0 {
        let reason = CStr::from_ptr(libc::gai_strerror(rc));
        log::warn!("zudp_recv: getnameinfo failed, reason={}", reason.to_string_lossy());
        return ptr::null_mut();
    }

    // link-local peers are only reachable through their interface
    if c_int::from(addr.ss_family) == libc::AF_INET6 {
        let sin6 = &*(&addr as *const _ as *const sockaddr_in6);
        let ip = Ipv6Addr::from(sin6.sin6_addr.s6_addr);
        if ip.segments()[0] & 0xffc0 == 0xfe80 {
            let mut ifname = [0 as c_char; libc::IF_NAMESIZE];
            if !libc::if_indextoname(sin6.sin6_scope_id, ifname.as_mut_ptr()).is_null() {
                let peer = slice::from_raw_parts_mut(peername as *mut u8, peerlen);
                let ifname = CStr::from_ptr(ifname.as_ptr()).to_bytes();
                if !append_scope(peer, ifname) {
                    log::warn!("zudp_recv: no room for the scope of a link-local peer");
                }
            }
        }
    }

    Frame::boxed(buffer[..size as usize].to_vec(), false)
}

#[no_mangle]
pub unsafe extern "C" fn zudp_fd(self_: *mut zudp_t) -> c_int {
    resolve(self_, "zudp_fd").map_or(-1, |udp| udp.fd)
}

/// Sends one datagram over loopback port 7777 using the current socket family.
#[no_mangle]
pub unsafe extern "C" fn zudp_test(verbose: bool) {
    use super::frame::{zframe_destroy, zframe_new, zframe_size};

    super::selftest("zudp", verbose, || {
        let mut udp = zudp_new(ZUDP_UNICAST, true);
        assert!(!udp.is_null());
        zudp_destroy(&mut udp);
        assert!(udp.is_null());

        let loopback: &[u8] = if sys::ipv6() { b"::1\0" } else { b"127.0.0.1\0" };
        let mut sender = zudp_new(ZUDP_UNICAST, true);
        let mut recvr = zudp_new(ZUDP_UNICAST, true);
        assert!(!sender.is_null() && !recvr.is_null());
        assert_eq!(zudp_bind(recvr, b"*\0".as_ptr() as _, 7777), 0);

        let mut frame = zframe_new(b"hello".as_ptr() as _, 5);
        assert_eq!(zudp_sendto(sender, frame, loopback.as_ptr() as _, 7777), 0);

        let mut peername = [0 as c_char; 100];
        let mut received = zudp_recv(recvr, peername.as_mut_ptr(), 100);
        assert!(!received.is_null());
        assert_eq!(zframe_size(received), 5);
        assert_ne!(peername[0], 0);
        if verbose {
            println!("received from {}", CStr::from_ptr(peername.as_ptr()).to_string_lossy());
        }

        zframe_destroy(&mut frame);
        zframe_destroy(&mut received);
        zudp_destroy(&mut sender);
        zudp_destroy(&mut recvr);
    });
}
