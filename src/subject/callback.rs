use std::{fmt, rc::Rc};

use super::handle::{SharedHandle, WeakHandle};

/// Способ, которым подписчик был зарегистрирован.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    /// Произвольное замыкание.
    Function,
    /// Заимствованная ссылка на объект + метод.
    Borrowed,
    /// Weak-указатель на объект + метод (в т.ч. понижённый `Rc`/`Arc`).
    Weak,
}

impl fmt::Display for CallbackKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name = match self {
            Self::Function => "function",
            Self::Borrowed => "borrowed",
            Self::Weak => "weak",
        };
        f.write_str(name)
    }
}

/// Типо-стёртый обработчик уведомления с сигнатурой `Fn(&A)`.
///
/// Все четыре формы подписки сводятся к этому типу через именованные
/// конструкторы: [`Callback::new`], [`Callback::from_ref`],
/// [`Callback::from_shared`] и [`Callback::from_weak`].
///
/// Клонирование дешёвое: клоны разделяют одно и то же замыкание.
pub struct Callback<'a, A: ?Sized> {
    kind: CallbackKind,
    invoke: Rc<dyn Fn(&A) + 'a>,
    /// Проверка, жив ли подписчик. Есть только у weak-обработчиков.
    probe: Option<Rc<dyn Fn() -> bool + 'a>>,
}

impl<'a, A: ?Sized + 'a> Callback<'a, A> {
    /// Обработчик из произвольного замыкания.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&A) + 'a,
    {
        Self {
            kind: CallbackKind::Function,
            invoke: Rc::new(f),
            probe: None,
        }
    }

    /// Обработчик, вызывающий `method` на конкретном объекте `object`.
    ///
    /// Ссылка не владеющая: время жизни `'a` гарантирует, что объект
    /// переживёт `Subject`, в котором хранится обработчик.
    pub fn from_ref<T, M>(
        object: &'a T,
        method: M,
    ) -> Self
    where
        T: ?Sized + 'a,
        M: Fn(&T, &A) + 'a,
    {
        let invoke: Rc<dyn Fn(&A) + 'a> = Rc::new(move |args: &A| method(object, args));
        Self {
            kind: CallbackKind::Borrowed,
            invoke,
            probe: None,
        }
    }

    /// Обработчик из владеющего указателя (`Rc`, `Arc`).
    ///
    /// Указатель сразу понижается до weak, сам `handle` не сохраняется и
    /// strong-счётчик подписчика не меняется.
    pub fn from_shared<H, M>(
        handle: &H,
        method: M,
    ) -> Self
    where
        H: SharedHandle + ?Sized,
        H::Weak: 'a,
        M: Fn(&<H::Weak as WeakHandle>::Target, &A) + 'a,
    {
        Self::from_weak(handle.downgrade_handle(), method)
    }

    /// Обработчик из weak-указателя.
    ///
    /// При каждом вызове weak разрешается во временный сильный указатель.
    /// Если подписчик уже уничтожен, вызов молча ничего не делает: ни
    /// ошибки, ни удаления из реестра.
    pub fn from_weak<W, M>(
        weak: W,
        method: M,
    ) -> Self
    where
        W: WeakHandle + 'a,
        M: Fn(&W::Target, &A) + 'a,
    {
        let weak = Rc::new(weak);
        let probe_target = Rc::clone(&weak);

        let invoke: Rc<dyn Fn(&A) + 'a> = Rc::new(move |args: &A| match weak.resolve() {
            Some(strong) => method(&*strong, args),
            None => {
                tracing::trace!("weak subscriber is gone, notification skipped");
            }
        });
        let probe: Rc<dyn Fn() -> bool + 'a> = Rc::new(move || probe_target.resolve().is_some());

        Self {
            kind: CallbackKind::Weak,
            invoke,
            probe: Some(probe),
        }
    }

    /// Вызывает обработчик с аргументами уведомления.
    #[inline]
    pub fn call(
        &self,
        args: &A,
    ) {
        (self.invoke)(args)
    }

    pub fn kind(&self) -> CallbackKind {
        self.kind
    }

    /// `false`, только если это weak-обработчик и подписчик уже уничтожен.
    pub fn is_live(&self) -> bool {
        self.probe.as_ref().map_or(true, |probe| probe())
    }
}

impl<A: ?Sized> Clone for Callback<'_, A> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            invoke: Rc::clone(&self.invoke),
            probe: self.probe.clone(),
        }
    }
}

impl<A: ?Sized> fmt::Debug for Callback<'_, A> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Callback")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
