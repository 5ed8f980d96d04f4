use zhandle::{finalizer, Error, Frame, Handle, Msg, Udp};

mod udp;

#[test]
fn frame_lifecycle() {
    let mut frame = Frame::new(b"hello").unwrap();
    assert!(!frame.is_null());
    assert!(frame.owns());
    assert_eq!(frame.size().unwrap(), 5);
    assert_eq!(frame.data().unwrap(), b"hello");
    assert!(!frame.more().unwrap());

    frame.set_more(true).unwrap();
    let copy = frame.dup().unwrap();
    assert!(copy.more().unwrap());
    assert!(frame.content_eq(&copy).unwrap());

    frame.destroy();
    assert!(frame.is_null());
    assert_eq!(frame.size(), Err(Error::DestroyedHandle("zframe")));
    assert_eq!(frame.data(), Err(Error::DestroyedHandle("zframe")));
    assert_eq!(
        copy.content_eq(&frame),
        Err(Error::DestroyedHandle("zframe"))
    );

    // destroying again is a no-op
    frame.destroy();
    assert!(frame.is_null());
}

#[test]
fn null_pointer_gives_destroyed_handle() {
    for finalize in [true, false] {
        let frame = unsafe { Frame::from_raw(std::ptr::null_mut(), finalize) };
        assert!(frame.is_null());
        assert!(!frame.owns());
        assert!(!frame.is_transferred());
        assert_eq!(frame.size(), Err(Error::DestroyedHandle("zframe")));
    }
    assert_eq!(finalizer::pending(), 0);
}

#[test]
fn give_reference_then_rewrap() {
    let mut first = Frame::new(b"moved").unwrap();
    let raw = first.give_reference().unwrap();
    assert!(first.is_null());
    assert!(first.is_transferred());
    assert_eq!(
        first.give_reference(),
        Err(Error::DestroyedHandle("zframe"))
    );

    let mut second = unsafe { Frame::from_raw(raw.as_ptr(), true) };
    assert_eq!(second.data().unwrap(), b"moved");
    second.destroy();

    // neither handle has anything left to finalize
    drop(first);
    drop(second);
}

#[test]
fn into_raw_hands_over_the_pointer() {
    let frame = Frame::new(b"raw").unwrap();
    let raw = frame.into_raw().unwrap();

    let unowned = unsafe { Frame::from_raw(raw.as_ptr(), false) };
    assert!(!unowned.owns());
    assert_eq!(unowned.data().unwrap(), b"raw");
    drop(unowned);

    let mut owner = unsafe { Handle::from_raw(raw.as_ptr(), true) };
    owner.destroy();
}

#[test]
fn msg_takes_ownership_of_frames() {
    let mut msg = Msg::new().unwrap();
    msg.append(Frame::new(b"World").unwrap()).unwrap();
    msg.prepend(Frame::new(b"Hello").unwrap()).unwrap();
    msg.add_mem(b"!").unwrap();

    assert_eq!(msg.size().unwrap(), 3);
    assert_eq!(msg.content_size().unwrap(), 11);

    let mut seen = Vec::new();
    {
        let first = msg.first().unwrap().unwrap();
        assert!(!first.owns());
        seen.push(first.data().unwrap().to_vec());
    }
    while let Some(frame) = msg.next().unwrap() {
        seen.push(frame.data().unwrap().to_vec());
    }
    assert_eq!(seen, vec![b"Hello".to_vec(), b"World".to_vec(), b"!".to_vec()]);

    let popped = msg.pop().unwrap().unwrap();
    assert!(popped.owns());
    assert_eq!(popped.data().unwrap(), b"Hello");
    assert_eq!(msg.size().unwrap(), 2);

    // the popped frame outlives the message
    msg.destroy();
    assert_eq!(popped.size().unwrap(), 5);
}

#[test]
fn destroyed_msg_does_not_take_frames() {
    let mut msg = Msg::new().unwrap();
    msg.destroy();

    let frame = Frame::new(b"kept").unwrap();
    assert_eq!(msg.append(frame), Err(Error::DestroyedHandle("zmsg")));
    assert_eq!(msg.size(), Err(Error::DestroyedHandle("zmsg")));
    assert!(msg.pop().is_err());
}

#[test]
fn native_selftests() {
    Frame::test(false);
    Msg::test(false);
    Udp::test(false);
}
