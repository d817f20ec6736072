use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

/// A thread-safe, reference-counted resource container with read-write
/// locking.
///
/// `MtResource` provides synchronized access to a value of type `T` that can
/// be shared across threads. It wraps an `Arc<RwLock<T>>`: any number of
/// readers may hold the resource concurrently, writers get exclusive access.
///
/// Chunks are the main user of this type. The world owns every chunk through
/// an `MtResource<Chunk>`, mesh workers clone the handle for the duration of
/// a build, and neighbor back-references are held as [`WeakResource`] so the
/// cyclic neighbor graph never keeps a chunk alive.
pub struct MtResource<T: Send + Sync> {
    resource: Arc<RwLock<T>>,
}

impl<T: Send + Sync + 'static> MtResource<T> {
    /// Creates a new `MtResource` containing the given value.
    pub fn new(resource: T) -> Self {
        Self {
            resource: Arc::new(RwLock::new(resource)),
        }
    }

    /// Returns a read guard for the contained value.
    ///
    /// # Panics
    /// Panics if the lock is poisoned.
    pub fn get(&self) -> RwLockReadGuard<'_, T> {
        self.resource.read().unwrap()
    }

    /// Returns a write guard for the contained value.
    ///
    /// # Panics
    /// Panics if the lock is poisoned.
    pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
        self.resource.write().unwrap()
    }

    /// Returns a non-owning handle to the same resource.
    pub fn downgrade(&self) -> WeakResource<T> {
        WeakResource {
            resource: Arc::downgrade(&self.resource),
        }
    }

    /// Whether two handles point at the same underlying resource.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.resource, &other.resource)
    }
}

impl<T: Send + Sync> Clone for MtResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}

/// A non-owning counterpart to [`MtResource`].
///
/// Upgrading yields `None` once the owner has dropped the resource, which is
/// exactly the semantics chunk neighbor pointers need: a relation, never
/// ownership.
pub struct WeakResource<T: Send + Sync> {
    resource: Weak<RwLock<T>>,
}

impl<T: Send + Sync + 'static> WeakResource<T> {
    /// Attempts to recover a strong handle. Returns `None` if the resource
    /// has been dropped.
    pub fn upgrade(&self) -> Option<MtResource<T>> {
        self.resource
            .upgrade()
            .map(|resource| MtResource { resource })
    }
}

impl<T: Send + Sync> Clone for WeakResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write() {
        let counter = MtResource::new(0);
        *counter.get_mut() += 1;
        assert_eq!(*counter.get(), 1);
    }

    #[test]
    fn test_shared_across_threads() {
        let counter = MtResource::new(0);
        let clone = counter.clone();
        let handle = std::thread::spawn(move || {
            *clone.get_mut() += 1;
        });
        handle.join().unwrap();
        assert_eq!(*counter.get(), 1);
    }

    #[test]
    fn test_weak_upgrade_fails_after_drop() {
        let strong = MtResource::new(5);
        let weak = strong.downgrade();
        assert!(weak.upgrade().is_some());
        drop(strong);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_ptr_eq() {
        let a = MtResource::new(1);
        let b = a.clone();
        let c = MtResource::new(1);
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
    }
}
