use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ops::Deref;
use std::ptr::NonNull;

use crate::{
    finalizer::{self, Token},
    Error,
};

/// An opaque native type that can be held by a [`Handle`].
pub trait Resource {
    /// Short name of the native class, used in errors and logs.
    const NAME: &'static str;

    /// Native destructor. Takes the address of the pointer so the native side can
    /// null it.
    ///
    /// # Safety
    ///
    /// `*self_p` must be a live object of this type that nobody else will destroy.
    unsafe fn destroy(self_p: *mut *mut Self);
}

enum State<T> {
    Live {
        ptr: NonNull<T>,
        finalizer: Option<Token>,
    },
    Destroyed,
    Transferred,
}

/// MUST NOT IMPLEMENT COPY or CLONE
///
/// Holds at most one native pointer and decides whether the native destructor runs.
/// A handle is live until it is destroyed, or until its pointer is given away with
/// [`give_reference`](Handle::give_reference)/[`into_raw`](Handle::into_raw). Every
/// operation on a handle without a pointer fails with [`Error::DestroyedHandle`],
/// except [`is_null`](Handle::is_null) and [`destroy`](Handle::destroy).
///
/// An owning handle that is dropped while still live is finalized through the
/// [`finalizer`] registry.
pub struct Handle<T: Resource> {
    state: State<T>,
}

// A handle is the only owner of its pointer and the native objects are not tied to
// the thread that created them. Shared access is not promised, so no Sync.
unsafe impl<T: Resource> Send for Handle<T> {}

impl<T: Resource> Handle<T> {
    /// Wraps a raw native pointer.
    ///
    /// A null pointer gives a handle that is already destroyed and registers
    /// nothing, whatever `finalize` says. Otherwise `finalize` decides whether this
    /// handle owns destruction: with `false` nothing is registered, and the caller
    /// stays responsible for calling [`destroy`](Handle::destroy) or giving the
    /// pointer away.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live object of type `T`. With `finalize`, no other
    /// party may destroy it.
    pub unsafe fn from_raw(ptr: *mut T, finalize: bool) -> Handle<T> {
        match NonNull::new(ptr) {
            None => Handle {
                state: State::Destroyed,
            },
            Some(ptr) => {
                let finalizer = if finalize {
                    Some(finalizer::register(ptr))
                } else {
                    None
                };
                Handle {
                    state: State::Live { ptr, finalizer },
                }
            }
        }
    }

    /// Takes ownership of a pointer fresh from a native allocation call. A null
    /// return means `op` failed.
    pub(crate) fn own(ptr: *mut T, op: &'static str) -> Result<Handle<T>, Error> {
        if ptr.is_null() {
            return Err(Error::NativeOperationFailed(op));
        }
        Ok(unsafe { Handle::from_raw(ptr, true) })
    }

    pub fn is_null(&self) -> bool {
        !matches!(self.state, State::Live { .. })
    }

    /// True if the pointer was given away rather than destroyed.
    pub fn is_transferred(&self) -> bool {
        matches!(self.state, State::Transferred)
    }

    /// True if this handle is responsible for destroying its pointer.
    pub fn owns(&self) -> bool {
        matches!(
            self.state,
            State::Live {
                finalizer: Some(_),
                ..
            }
        )
    }

    /// The raw pointer, for passing to native calls.
    pub fn as_ptr(&self) -> Result<*mut T, Error> {
        match self.state {
            State::Live { ptr, .. } => Ok(ptr.as_ptr()),
            _ => Err(Error::DestroyedHandle(T::NAME)),
        }
    }

    /// Releases the native object. Does nothing if the handle is already
    /// destroyed or transferred.
    pub fn destroy(&mut self) {
        if let Some(ptr) = self.take(State::Destroyed) {
            let mut ptr = ptr.as_ptr();
            log::trace!("destroying {} handle {:p}", T::NAME, ptr);
            unsafe { T::destroy(&mut ptr) };
        }
    }

    /// Gives the raw pointer to the caller without destroying it. The handle is left
    /// transferred and the caller becomes responsible for the native object, for
    /// example by wrapping it again or by passing it to a native call that takes
    /// ownership.
    pub fn give_reference(&mut self) -> Result<NonNull<T>, Error> {
        self.take(State::Transferred)
            .ok_or(Error::DestroyedHandle(T::NAME))
    }

    /// Consuming form of [`give_reference`](Handle::give_reference).
    pub fn into_raw(mut self) -> Result<NonNull<T>, Error> {
        self.give_reference()
    }

    /// Moves a live pointer out and disarms its finalizer. Leaves the state alone
    /// when there is no pointer.
    fn take(&mut self, next: State<T>) -> Option<NonNull<T>> {
        match mem::replace(&mut self.state, next) {
            State::Live { ptr, finalizer } => {
                if let Some(token) = finalizer {
                    finalizer::cancel(token);
                }
                Some(ptr)
            }
            previous => {
                self.state = previous;
                None
            }
        }
    }
}

impl<T: Resource> Drop for Handle<T> {
    fn drop(&mut self) {
        if let State::Live { ptr, finalizer } = mem::replace(&mut self.state, State::Destroyed) {
            match finalizer {
                Some(token) => finalizer::release(token),
                None => log::trace!("dropping unowned {} handle {:p}", T::NAME, ptr),
            }
        }
    }
}

impl<T: Resource> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.state {
            State::Live { ptr, ref finalizer } => f
                .debug_struct("Handle")
                .field("type", &T::NAME)
                .field("ptr", &ptr)
                .field("owns", &finalizer.is_some())
                .finish(),
            State::Destroyed => write!(f, "Handle({}, destroyed)", T::NAME),
            State::Transferred => write!(f, "Handle({}, transferred)", T::NAME),
        }
    }
}

/// A non-owning handle to an object that belongs to something else, such as a
/// frame still held by its message. It can be read through but never destroyed or
/// given away, and it cannot outlive the borrow of its owner.
pub struct Borrowed<'a, T: Resource> {
    handle: Handle<T>,
    _marker: PhantomData<&'a ()>,
}

impl<'a, T: Resource> Borrowed<'a, T> {
    /// # Safety
    ///
    /// `ptr` must be null or stay live for `'a`.
    pub(crate) unsafe fn new(ptr: *mut T) -> Option<Borrowed<'a, T>> {
        NonNull::new(ptr).map(|ptr| Borrowed {
            handle: Handle {
                state: State::Live {
                    ptr,
                    finalizer: None,
                },
            },
            _marker: PhantomData,
        })
    }
}

impl<T: Resource> Deref for Borrowed<'_, T> {
    type Target = Handle<T>;

    fn deref(&self) -> &Handle<T> {
        &self.handle
    }
}

impl<T: Resource> fmt::Debug for Borrowed<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Borrowed").field(&self.handle).finish()
    }
}
