use std::{
    ops::Deref,
    rc::{self, Rc},
    sync::{self, Arc},
};

/// Невладеющий (weak) указатель на подписчика.
///
/// `resolve` пытается получить временный сильный указатель. `None`
/// означает, что подписчик уже уничтожен.
pub trait WeakHandle {
    /// Тип объекта-подписчика.
    type Target: ?Sized;
    /// Временный сильный указатель, живущий только на время вызова.
    type Strong: Deref<Target = Self::Target>;

    fn resolve(&self) -> Option<Self::Strong>;
}

/// Владеющий указатель с разделяемым владением (`Rc`, `Arc`).
///
/// `Subject` никогда не хранит такой указатель: он сразу понижается
/// до [`WeakHandle`] через `downgrade_handle`.
pub trait SharedHandle {
    type Weak: WeakHandle;

    fn downgrade_handle(&self) -> Self::Weak;
}

impl<T: ?Sized> WeakHandle for rc::Weak<T> {
    type Target = T;
    type Strong = Rc<T>;

    fn resolve(&self) -> Option<Rc<T>> {
        self.upgrade()
    }
}

impl<T: ?Sized> WeakHandle for sync::Weak<T> {
    type Target = T;
    type Strong = Arc<T>;

    fn resolve(&self) -> Option<Arc<T>> {
        self.upgrade()
    }
}

impl<T: ?Sized> SharedHandle for Rc<T> {
    type Weak = rc::Weak<T>;

    fn downgrade_handle(&self) -> rc::Weak<T> {
        Rc::downgrade(self)
    }
}

impl<T: ?Sized> SharedHandle for Arc<T> {
    type Weak = sync::Weak<T>;

    fn downgrade_handle(&self) -> sync::Weak<T> {
        Arc::downgrade(self)
    }
}
