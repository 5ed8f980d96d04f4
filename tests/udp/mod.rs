use zhandle::{Error, Frame, Udp, UdpType};

#[test]
fn ping_over_loopback() {
    let mut a = Udp::new(UdpType::Unicast, true).unwrap();
    a.bind("127.0.0.1", 5679).unwrap();

    let mut b = Udp::new(UdpType::Unicast, true).unwrap();
    b.bind("127.0.0.1", 5678).unwrap();

    let ping = Frame::new(b"ping").unwrap();
    a.sendto(&ping, "127.0.0.1", 5678).unwrap();

    let (frame, peer) = b.recv().unwrap();
    assert!(frame.owns());
    assert_eq!(frame.data().unwrap(), b"ping");
    assert_eq!(peer, "127.0.0.1");

    assert!(a.fd().unwrap() >= 0);
    assert_ne!(a.fd().unwrap(), b.fd().unwrap());
}

#[test]
fn wildcard_bind() {
    let mut recvr = Udp::new(UdpType::Unicast, true).unwrap();
    recvr.bind("*", 5680).unwrap();

    let mut sender = Udp::new(UdpType::Unicast, true).unwrap();
    let frame = Frame::new(b"any").unwrap();
    sender.sendto(&frame, "127.0.0.1", 5680).unwrap();

    let (received, _) = recvr.recv().unwrap();
    assert_eq!(received.data().unwrap(), b"any");
}

#[test]
fn operations_after_destroy_fail() {
    let mut udp = Udp::new(UdpType::Unicast, false).unwrap();
    let frame = Frame::new(b"late").unwrap();

    udp.destroy();
    assert!(udp.is_null());

    let destroyed = Error::DestroyedHandle("zudp");
    assert_eq!(udp.sendto(&frame, "127.0.0.1", 5681), Err(destroyed.clone()));
    assert_eq!(udp.bind("127.0.0.1", 5681), Err(destroyed.clone()));
    assert_eq!(udp.fd(), Err(destroyed.clone()));
    assert_eq!(udp.recv().unwrap_err(), destroyed);

    udp.destroy();
}

#[test]
fn native_failures_are_reported() {
    let mut broadcast = Udp::new(UdpType::Broadcast, false).unwrap();
    assert_eq!(
        broadcast.bind("*", 5682),
        Err(Error::NativeOperationFailed("zudp_bind"))
    );

    let mut multicast = Udp::new(UdpType::Multicast, true).unwrap();
    assert_eq!(
        multicast.bind("", 5682),
        Err(Error::NativeOperationFailed("zudp_bind"))
    );

    let mut unicast = Udp::new(UdpType::Unicast, false).unwrap();
    let frame = Frame::new(b"x").unwrap();
    assert_eq!(
        unicast.sendto(&frame, "no.such.host", 5682),
        Err(Error::NativeOperationFailed("zudp_sendto"))
    );
    assert_eq!(unicast.bind("127.0.0.1\0", 5682), Err(Error::InvalidString));

    Udp::error("sendto").unwrap();
}
