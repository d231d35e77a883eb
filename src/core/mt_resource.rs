use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A thread-safe, reference-counted resource container with read-write locking.
///
/// `MtResource` wraps a value in an `Arc<RwLock<T>>` so it can be shared
/// between the update workers and the thread driving the world. Reads are
/// concurrent; writes are exclusive.
///
/// Guards must not be held across calls that can take another lock (for
/// example a chunk guard held while calling back into the cache). The
/// update pipeline copies what it needs out of a guard and drops it before
/// crossing such a boundary.
///
/// # Examples
/// ```
/// use voxel_world::core::MtResource;
///
/// let counter = MtResource::new(0);
/// *counter.get_mut() += 1;
/// assert_eq!(*counter.get(), 1);
/// ```
pub struct MtResource<T: Send + Sync> {
    pub resource: Arc<RwLock<T>>,
}

impl<T: Send + Sync + 'static> MtResource<T> {
    /// Creates a new `MtResource` containing the given value.
    ///
    /// # Arguments
    /// * `resource` - The value to be stored in the resource
    ///
    /// # Returns
    /// A new `MtResource` containing the provided value
    pub fn new(resource: T) -> Self {
        Self {
            resource: Arc::new(RwLock::new(resource)),
        }
    }

    /// Returns a read-only guard that allows reading the contained value.
    ///
    /// # Panics
    /// Panics if the lock is poisoned.
    ///
    /// # Returns
    /// A guard that provides read access to the contained value
    pub fn get(&self) -> RwLockReadGuard<'_, T> {
        self.resource.read().unwrap()
    }

    /// Returns a mutable guard that allows modifying the contained value.
    ///
    /// # Panics
    /// Panics if the lock is poisoned.
    ///
    /// # Returns
    /// A guard that provides mutable access to the contained value
    pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
        self.resource.write().unwrap()
    }
}

impl<T: Send + Sync> Clone for MtResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}
