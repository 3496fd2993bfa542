// SPDX-FileCopyrightText: 2025 2025 Contributors to the pipekit project.
// SPDX-License-Identifier: Apache-2.0

//! Named components that messages can reference as their source.

use std::sync::{
    Arc, Mutex, RwLock, Weak,
    atomic::{AtomicU32, AtomicU64, Ordering},
};

use uuid::Uuid;

use crate::SignalHandlerId;

static NEXT_OBJECT_INDEX: AtomicU32 = AtomicU32::new(0);

fn default_name() -> String {
    format!("object{}", NEXT_OBJECT_INDEX.fetch_add(1, Ordering::Relaxed))
}

type NotifyCallback = dyn Fn(&Object) + Send + Sync + 'static;

struct ObjectInner {
    id: Uuid,
    name: RwLock<String>,
    name_watchers: Mutex<Vec<(SignalHandlerId, Arc<NotifyCallback>)>>,
    next_watch_id: AtomicU64,
}

/// A cheaply cloneable handle to a named component.
///
/// Clones share identity: renaming through one handle is visible through all
/// of them. Messages hold a [`WeakObject`] so that posting a message never
/// keeps its source alive.
///
/// # Examples
///
/// ```
/// use pipekit::Object;
///
/// let src = Object::new(None);
/// assert!(src.name().starts_with("object"));
/// src.set_name(Some("filesrc0"));
/// assert_eq!(src.name(), "filesrc0");
/// ```
#[derive(Clone)]
pub struct Object {
    inner: Arc<ObjectInner>,
}

impl Object {
    /// Creates an object. Without a name it is called `object<N>`.
    pub fn new(name: Option<&str>) -> Self {
        let name = name.map_or_else(default_name, str::to_owned);
        Self {
            inner: Arc::new(ObjectInner {
                id: Uuid::new_v4(),
                name: RwLock::new(name),
                name_watchers: Mutex::new(Vec::new()),
                next_watch_id: AtomicU64::new(1),
            }),
        }
    }

    /// Stable identity of this object, shared by all clones.
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Returns a copy of the current name.
    pub fn name(&self) -> String {
        self.inner
            .name
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Renames the object; `None` assigns a fresh default name.
    ///
    /// Every callback connected with [`Object::connect_notify_name`] runs
    /// once per call, after the new name is in place.
    pub fn set_name(&self, name: Option<&str>) {
        let name = name.map_or_else(default_name, str::to_owned);
        tracing::trace!("Renaming object {} to {name}", self.inner.id);
        *self
            .inner
            .name
            .write()
            .unwrap_or_else(|e| e.into_inner()) = name;

        // Snapshot so callbacks may connect or disconnect without deadlocking.
        let watchers: Vec<Arc<NotifyCallback>> = self
            .inner
            .name_watchers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in watchers {
            callback(self);
        }
    }

    /// Connects `callback` to name changes.
    ///
    /// # Returns
    ///
    /// An id for [`Object::disconnect_notify`].
    pub fn connect_notify_name<F>(&self, callback: F) -> SignalHandlerId
    where
        F: Fn(&Object) + Send + Sync + 'static,
    {
        let id = SignalHandlerId(self.inner.next_watch_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .name_watchers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(callback)));
        id
    }

    /// Disconnects a name-change callback.
    ///
    /// # Returns
    ///
    /// `true` if `id` was connected to this object.
    pub fn disconnect_notify(&self, id: SignalHandlerId) -> bool {
        let mut watchers = self
            .inner
            .name_watchers
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let before = watchers.len();
        watchers.retain(|(watch_id, _)| *watch_id != id);
        watchers.len() != before
    }

    /// Returns a non-owning handle to this object.
    pub fn downgrade(&self) -> WeakObject {
        WeakObject {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Object {}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object")
            .field("id", &self.inner.id)
            .field("name", &self.name())
            .finish()
    }
}

/// Non-owning reference to an [`Object`].
#[derive(Clone)]
pub struct WeakObject {
    inner: Weak<ObjectInner>,
}

impl WeakObject {
    /// Returns the object if it is still alive.
    pub fn upgrade(&self) -> Option<Object> {
        self.inner.upgrade().map(|inner| Object { inner })
    }
}

impl std::fmt::Debug for WeakObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.upgrade() {
            Some(object) => write!(f, "WeakObject({})", object.name()),
            None => f.write_str("WeakObject(<dropped>)"),
        }
    }
}
