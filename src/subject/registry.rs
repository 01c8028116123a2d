use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    fmt,
};

use obskit_error::ObskitResult;

use super::{
    callback::Callback,
    handle::{SharedHandle, WeakHandle},
    id::{IdGenerator, SubscriptionId},
};
use crate::{config::SubjectSettings, logging::log_error};

/// Реестр подписчиков с фиксированной сигнатурой `Fn(&A)`.
///
/// Поддерживает:
/// - Подписку замыканием, заимствованной ссылкой, `Rc`/`Arc` и weak
/// - Несколько подписок под одним идентификатором
/// - Синхронное уведомление всех подписчиков
///
/// `Subject` владеет только записями реестра, но не подписчиками: ссылки
/// ограничены временем жизни `'a`, а владеющие указатели хранятся в виде
/// weak. Подписчик, уничтоженный до уведомления, молча пропускается и из
/// реестра не удаляется.
///
/// Порядок вызова: по возрастанию идентификатора, внутри одного
/// идентификатора в порядке подписки.
///
/// `notify` работает по снимку реестра: подписки и отписки, сделанные
/// обработчиками во время уведомления, применяются сразу, но видны только
/// в следующем уведомлении.
///
/// Паника внутри обработчика прерывает уведомление и пробрасывается
/// вызывающему; оставшиеся обработчики в этом проходе не вызываются.
pub struct Subject<'a, A: ?Sized> {
    /// Идентификатор → обработчики в порядке подписки.
    entries: RefCell<BTreeMap<SubscriptionId, Vec<Callback<'a, A>>>>,
    /// Генератор автоматических идентификаторов этого экземпляра.
    ids: IdGenerator,
    /// Глубина вложенных `notify`.
    depth: Cell<usize>,
    /// Оборачивать ли каждый проход в `tracing` span.
    trace_notifications: bool,
}

impl<'a, A: ?Sized + 'a> Subject<'a, A> {
    /// Создаёт пустой реестр с генератором, начинающим с `0`.
    pub fn new() -> Self {
        Self::with_generator(IdGenerator::new())
    }

    /// Создаёт пустой реестр с заданным генератором идентификаторов.
    pub fn with_generator(ids: IdGenerator) -> Self {
        Self {
            entries: RefCell::new(BTreeMap::new()),
            ids,
            depth: Cell::new(0),
            trace_notifications: false,
        }
    }

    /// Создаёт пустой реестр по настройкам.
    ///
    /// Генератор начинает с `settings.id_start`. [`SubjectSettings::load`]
    /// не пропускает `u64::MAX`; если такое значение задано вручную,
    /// реестр выдаст один идентификатор, после чего `subscribe` запаникует,
    /// а `try_subscribe` вернёт `IdSpaceExhausted`.
    pub fn from_settings(settings: &SubjectSettings) -> Self {
        let mut subject = Self::with_generator(IdGenerator::starting_at(settings.id_start));
        subject.trace_notifications = settings.trace_notifications;
        subject
    }

    /// Регистрирует готовый обработчик под новым идентификатором.
    ///
    /// # Panics
    /// Если генератор исчерпан. См. [`Subject::try_attach`].
    pub fn attach(
        &self,
        callback: Callback<'a, A>,
    ) -> SubscriptionId {
        match self.try_attach(callback) {
            Ok(id) => id,
            Err(err) => {
                log_error("subscription rejected", &err);
                panic!("{err}")
            }
        }
    }

    /// Регистрирует готовый обработчик под новым идентификатором.
    ///
    /// # Возвращает
    /// - `Ok(id)` с выданным идентификатором
    /// - `Err(SubjectError::IdSpaceExhausted)` если идентификаторы кончились
    pub fn try_attach(
        &self,
        callback: Callback<'a, A>,
    ) -> ObskitResult<SubscriptionId> {
        let id = self.ids.next_id()?;
        self.insert(id, callback);
        Ok(id)
    }

    /// Регистрирует готовый обработчик под явным идентификатором.
    ///
    /// Идентификатор может совпадать с уже существующим: записи
    /// независимы, но снимаются одним `unsubscribe(id)`.
    pub fn attach_with_id(
        &self,
        id: SubscriptionId,
        callback: Callback<'a, A>,
    ) -> SubscriptionId {
        self.insert(id, callback);
        id
    }

    /// Подписка замыканием.
    ///
    /// ```
    /// use std::cell::Cell;
    /// use obskit::Subject;
    ///
    /// let total = Cell::new(0);
    /// let subject: Subject<'_, i32> = Subject::new();
    /// subject.subscribe(|v: &i32| total.set(total.get() + v));
    /// subject.notify(&8);
    /// assert_eq!(total.get(), 8);
    /// ```
    pub fn subscribe<F>(
        &self,
        f: F,
    ) -> SubscriptionId
    where
        F: Fn(&A) + 'a,
    {
        self.attach(Callback::new(f))
    }

    /// Как [`Subject::subscribe`], но возвращает ошибку вместо паники при
    /// исчерпании идентификаторов.
    pub fn try_subscribe<F>(
        &self,
        f: F,
    ) -> ObskitResult<SubscriptionId>
    where
        F: Fn(&A) + 'a,
    {
        self.try_attach(Callback::new(f))
    }

    /// Подписка замыканием под явным идентификатором.
    pub fn subscribe_with_id<F>(
        &self,
        id: SubscriptionId,
        f: F,
    ) -> SubscriptionId
    where
        F: Fn(&A) + 'a,
    {
        self.attach_with_id(id, Callback::new(f))
    }

    /// Подписка методом конкретного объекта по ссылке.
    ///
    /// Объект должен пережить реестр; это проверяет компилятор через `'a`.
    pub fn subscribe_ref<T, M>(
        &self,
        object: &'a T,
        method: M,
    ) -> SubscriptionId
    where
        T: ?Sized + 'a,
        M: Fn(&T, &A) + 'a,
    {
        self.attach(Callback::from_ref(object, method))
    }

    /// Подписка методом объекта по ссылке под явным идентификатором.
    pub fn subscribe_ref_with_id<T, M>(
        &self,
        id: SubscriptionId,
        object: &'a T,
        method: M,
    ) -> SubscriptionId
    where
        T: ?Sized + 'a,
        M: Fn(&T, &A) + 'a,
    {
        self.attach_with_id(id, Callback::from_ref(object, method))
    }

    /// Подписка методом объекта за `Rc`/`Arc`.
    ///
    /// Реестр сохраняет только weak-указатель: подписка не продлевает
    /// жизнь объекта.
    pub fn subscribe_shared<H, M>(
        &self,
        handle: &H,
        method: M,
    ) -> SubscriptionId
    where
        H: SharedHandle + ?Sized,
        H::Weak: 'a,
        M: Fn(&<H::Weak as WeakHandle>::Target, &A) + 'a,
    {
        self.attach(Callback::from_shared(handle, method))
    }

    /// Подписка методом объекта за `Rc`/`Arc` под явным идентификатором.
    pub fn subscribe_shared_with_id<H, M>(
        &self,
        id: SubscriptionId,
        handle: &H,
        method: M,
    ) -> SubscriptionId
    where
        H: SharedHandle + ?Sized,
        H::Weak: 'a,
        M: Fn(&<H::Weak as WeakHandle>::Target, &A) + 'a,
    {
        self.attach_with_id(id, Callback::from_shared(handle, method))
    }

    /// Подписка методом объекта по weak-указателю.
    pub fn subscribe_weak<W, M>(
        &self,
        weak: W,
        method: M,
    ) -> SubscriptionId
    where
        W: WeakHandle + 'a,
        M: Fn(&W::Target, &A) + 'a,
    {
        self.attach(Callback::from_weak(weak, method))
    }

    pub fn subscribe_weak_with_id<W, M>(
        &self,
        id: SubscriptionId,
        weak: W,
        method: M,
    ) -> SubscriptionId
    where
        W: WeakHandle + 'a,
        M: Fn(&W::Target, &A) + 'a,
    {
        self.attach_with_id(id, Callback::from_weak(weak, method))
    }

    /// Снимает все подписки с идентификатором `id`.
    ///
    /// Неизвестный идентификатор не является ошибкой.
    ///
    /// # Возвращает
    /// Количество удалённых записей.
    pub fn unsubscribe(
        &self,
        id: SubscriptionId,
    ) -> usize {
        let detached = self.entries.borrow_mut().remove(&id);
        let removed = detached.as_ref().map_or(0, Vec::len);
        tracing::debug!(%id, removed, "subscription removed");
        removed
    }

    /// Удаляет все подписки.
    ///
    /// # Возвращает
    /// Количество удалённых записей.
    pub fn clear(&self) -> usize {
        let drained = std::mem::take(&mut *self.entries.borrow_mut());
        let removed: usize = drained.values().map(Vec::len).sum();
        tracing::debug!(removed, "all subscriptions cleared");
        removed
    }

    /// Вызывает всех подписчиков с аргументами `args`.
    ///
    /// Weak-подписчики, которые уже уничтожены, пропускаются.
    pub fn notify(
        &self,
        args: &A,
    ) {
        let snapshot: Vec<Callback<'a, A>> =
            self.entries.borrow().values().flatten().cloned().collect();

        let _span = self
            .trace_notifications
            .then(|| tracing::trace_span!("notify", entries = snapshot.len()).entered());
        tracing::trace!(entries = snapshot.len(), "notifying subscribers");

        let _depth = DepthGuard::enter(&self.depth);
        for callback in &snapshot {
            callback.call(args);
        }
    }

    /// Общее количество записей (включая мёртвые weak).
    pub fn len(&self) -> usize {
        self.entries.borrow().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Есть ли хотя бы одна запись под `id`.
    pub fn contains(
        &self,
        id: SubscriptionId,
    ) -> bool {
        self.entries.borrow().contains_key(&id)
    }

    /// Количество записей под `id`.
    pub fn count(
        &self,
        id: SubscriptionId,
    ) -> usize {
        self.entries.borrow().get(&id).map_or(0, Vec::len)
    }

    /// Различные идентификаторы по возрастанию.
    pub fn ids(&self) -> Vec<SubscriptionId> {
        self.entries.borrow().keys().copied().collect()
    }

    /// Количество записей, чей подписчик ещё существует.
    pub fn live_count(&self) -> usize {
        self.entries
            .borrow()
            .values()
            .flatten()
            .filter(|callback| callback.is_live())
            .count()
    }

    /// `true`, пока выполняется `notify` (в том числе из обработчика).
    pub fn is_notifying(&self) -> bool {
        self.depth.get() > 0
    }

    /// Идентификатор, который получит следующая автоматическая подписка.
    pub fn peek_next_id(&self) -> Option<SubscriptionId> {
        self.ids.peek()
    }

    fn insert(
        &self,
        id: SubscriptionId,
        callback: Callback<'a, A>,
    ) {
        tracing::debug!(%id, kind = %callback.kind(), "subscriber attached");
        self.entries
            .borrow_mut()
            .entry(id)
            .or_default()
            .push(callback);
    }
}

impl<'a, A: ?Sized + 'a> Default for Subject<'a, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ?Sized> fmt::Debug for Subject<'_, A> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let entries = self.entries.borrow();
        f.debug_struct("Subject")
            .field("ids", &entries.len())
            .field("entries", &entries.values().map(Vec::len).sum::<usize>())
            .field("next_id", &self.ids.peek())
            .field("notifying", &(self.depth.get() > 0))
            .finish()
    }
}

/// Счётчик вложенности `notify`, восстанавливаемый и при панике.
struct DepthGuard<'g>(&'g Cell<usize>);

impl<'g> DepthGuard<'g> {
    fn enter(depth: &'g Cell<usize>) -> Self {
        depth.set(depth.get() + 1);
        Self(depth)
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        panic::{self, AssertUnwindSafe},
        rc::Rc,
    };

    use obskit_error::SubjectError;

    use super::*;

    /// Helper: реестр и общий журнал вызовов.
    fn setup() -> (Subject<'static, i32>, Rc<RefCell<Vec<String>>>) {
        (Subject::new(), Rc::new(RefCell::new(Vec::new())))
    }

    fn recorder(
        log: &Rc<RefCell<Vec<String>>>,
        name: &'static str,
    ) -> impl Fn(&i32) + 'static {
        let log = Rc::clone(log);
        move |v: &i32| log.borrow_mut().push(format!("{name}:{v}"))
    }

    /// Тест проверяет, что автоматические идентификаторы строго
    /// возрастают.
    #[test]
    fn test_auto_ids_increase() {
        let (subject, log) = setup();
        let a = subject.subscribe(recorder(&log, "a"));
        let b = subject.subscribe(recorder(&log, "b"));
        let c = subject.subscribe(recorder(&log, "c"));
        assert!(a < b && b < c);
        assert_eq!(subject.peek_next_id(), Some(SubscriptionId::new(3)));
    }

    /// Тест проверяет, что замыкание вызывается ровно один раз с
    /// переданным значением.
    #[test]
    fn test_notify_plain_callback_once() {
        let (subject, log) = setup();
        subject.subscribe(recorder(&log, "a"));
        subject.notify(&8);
        assert_eq!(*log.borrow(), vec!["a:8"]);
    }

    /// Тест проверяет, что `unsubscribe` снимает все записи под одним
    /// идентификатором.
    #[test]
    fn test_unsubscribe_removes_all_aliases() {
        let (subject, log) = setup();
        let shared = SubscriptionId::new(100);
        subject.subscribe_with_id(shared, recorder(&log, "x"));
        subject.subscribe_with_id(shared, recorder(&log, "y"));
        let keep = subject.subscribe(recorder(&log, "keep"));
        assert_eq!(subject.count(shared), 2);

        assert_eq!(subject.unsubscribe(shared), 2);
        assert!(!subject.contains(shared));
        subject.notify(&1);
        assert_eq!(*log.borrow(), vec!["keep:1"]);
        assert!(subject.contains(keep));
    }

    /// Тест проверяет, что формы подписки через ссылку, `Rc` и weak
    /// принимают явный идентификатор и снимаются одним `unsubscribe`.
    #[test]
    fn test_object_forms_with_explicit_id() {
        struct Target {
            log: Rc<RefCell<Vec<String>>>,
        }

        impl Target {
            fn on(
                &self,
                v: &i32,
            ) {
                self.log.borrow_mut().push(format!("on:{v}"));
            }
        }

        let log = Rc::new(RefCell::new(Vec::new()));
        let borrowed = Target {
            log: Rc::clone(&log),
        };
        let shared = Rc::new(Target {
            log: Rc::clone(&log),
        });
        let subject: Subject<'_, i32> = Subject::new();
        let id = SubscriptionId::new(42);

        assert_eq!(subject.subscribe_ref_with_id(id, &borrowed, Target::on), id);
        assert_eq!(subject.subscribe_shared_with_id(id, &shared, Target::on), id);
        assert_eq!(
            subject.subscribe_weak_with_id(id, Rc::downgrade(&shared), Target::on),
            id
        );
        assert_eq!(subject.count(id), 3);
        assert_eq!(subject.peek_next_id(), Some(SubscriptionId::new(0)));

        subject.notify(&1);
        assert_eq!(log.borrow().len(), 3);

        assert_eq!(subject.unsubscribe(id), 3);
        subject.notify(&2);
        assert_eq!(log.borrow().len(), 3);
    }

    /// Тест проверяет, что отписка от неизвестного идентификатора ничего
    /// не меняет.
    #[test]
    fn test_unsubscribe_unknown_is_noop() {
        let (subject, log) = setup();
        subject.subscribe(recorder(&log, "a"));
        assert_eq!(subject.unsubscribe(SubscriptionId::new(999)), 0);
        assert_eq!(subject.len(), 1);
    }

    #[test]
    fn test_clear_removes_everything() {
        let (subject, log) = setup();
        subject.subscribe(recorder(&log, "a"));
        subject.subscribe_with_id(SubscriptionId::new(7), recorder(&log, "b"));
        subject.subscribe_with_id(SubscriptionId::new(7), recorder(&log, "c"));

        assert_eq!(subject.clear(), 3);
        assert!(subject.is_empty());
        subject.notify(&1);
        assert!(log.borrow().is_empty());
    }

    /// Тест проверяет, что явный идентификатор может совпасть с
    /// автоматическим, и обе записи остаются независимыми.
    #[test]
    fn test_explicit_id_may_collide_with_auto() {
        let (subject, log) = setup();
        let auto = subject.subscribe(recorder(&log, "auto"));
        subject.subscribe_with_id(auto, recorder(&log, "explicit"));
        assert_eq!(subject.count(auto), 2);
        // генератор не переиспользует занятое явно значение
        let next = subject.subscribe(recorder(&log, "next"));
        assert!(next > auto);
    }

    /// Тест проверяет порядок вызова: по возрастанию идентификатора, внутри
    /// идентификатора в порядке подписки.
    #[test]
    fn test_notification_order() {
        let (subject, log) = setup();
        subject.subscribe_with_id(SubscriptionId::new(5), recorder(&log, "b1"));
        subject.subscribe_with_id(SubscriptionId::new(1), recorder(&log, "a"));
        subject.subscribe_with_id(SubscriptionId::new(5), recorder(&log, "b2"));
        subject.notify(&0);
        assert_eq!(*log.borrow(), vec!["a:0", "b1:0", "b2:0"]);
        assert_eq!(
            subject.ids(),
            vec![SubscriptionId::new(1), SubscriptionId::new(5)]
        );
    }

    /// Тест проверяет, что мёртвая weak-подписка не удаляется из реестра.
    #[test]
    fn test_dead_weak_entry_is_not_pruned() {
        let (subject, log) = setup();
        let id = {
            let owner = Rc::new(());
            let log = Rc::clone(&log);
            subject.subscribe_shared(&owner, move |_: &(), v: &i32| {
                log.borrow_mut().push(format!("dead:{v}"))
            })
        };

        subject.notify(&3);
        subject.notify(&4);
        assert!(log.borrow().is_empty());
        assert!(subject.contains(id));
        assert_eq!(subject.len(), 1);
        assert_eq!(subject.live_count(), 0);
    }

    /// Тест проверяет, что подписка, сделанная обработчиком во время
    /// уведомления, срабатывает только в следующем проходе.
    #[test]
    fn test_subscribe_during_notify_applies_to_next_pass() {
        let subject: Rc<Subject<'static, i32>> = Rc::new(Subject::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        let weak_subject = Rc::downgrade(&subject);
        let late = recorder(&log, "late");
        let late = Rc::new(late);
        subject.subscribe(move |_: &i32| {
            if let Some(subject) = weak_subject.upgrade() {
                assert!(subject.is_notifying());
                let late = Rc::clone(&late);
                subject.subscribe(move |v: &i32| (*late)(v));
            }
        });

        subject.notify(&1);
        assert!(log.borrow().is_empty());
        assert_eq!(subject.len(), 2);

        subject.notify(&2);
        assert_eq!(*log.borrow(), vec!["late:2"]);
        assert!(!subject.is_notifying());
    }

    /// Тест проверяет, что запись, снятая обработчиком во время
    /// уведомления, всё равно получает текущее уведомление, но не
    /// следующее.
    #[test]
    fn test_unsubscribe_during_notify_applies_to_next_pass() {
        let subject: Rc<Subject<'static, i32>> = Rc::new(Subject::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        let victim = SubscriptionId::new(10);
        let weak_subject = Rc::downgrade(&subject);
        subject.subscribe_with_id(SubscriptionId::new(1), move |_: &i32| {
            if let Some(subject) = weak_subject.upgrade() {
                subject.unsubscribe(victim);
            }
        });
        subject.subscribe_with_id(victim, recorder(&log, "victim"));

        subject.notify(&1);
        assert_eq!(*log.borrow(), vec!["victim:1"]);
        assert!(!subject.contains(victim));

        subject.notify(&2);
        assert_eq!(*log.borrow(), vec!["victim:1"]);
    }

    /// Тест проверяет, что паника обработчика прерывает проход, а реестр
    /// остаётся пригодным к использованию.
    #[test]
    fn test_panicking_subscriber_stops_the_pass() {
        let (subject, log) = setup();
        subject.subscribe_with_id(SubscriptionId::new(1), recorder(&log, "before"));
        subject.subscribe_with_id(SubscriptionId::new(2), |_: &i32| panic!("boom"));
        subject.subscribe_with_id(SubscriptionId::new(3), recorder(&log, "after"));

        let result = panic::catch_unwind(AssertUnwindSafe(|| subject.notify(&1)));
        assert!(result.is_err());
        assert_eq!(*log.borrow(), vec!["before:1"]);
        assert!(!subject.is_notifying());

        subject.unsubscribe(SubscriptionId::new(2));
        subject.notify(&2);
        assert_eq!(*log.borrow(), vec!["before:1", "before:2", "after:2"]);
    }

    /// Тест проверяет, что `try_subscribe` сообщает об исчерпании
    /// идентификаторов.
    #[test]
    fn test_try_subscribe_exhausted() {
        let subject: Subject<'_, i32> = Subject::with_generator(IdGenerator::starting_at(u64::MAX));
        assert_eq!(
            subject.try_subscribe(|_| {}),
            Ok(SubscriptionId::new(u64::MAX))
        );
        let rejected: ObskitResult<SubscriptionId> = subject.try_subscribe(|_| {});
        assert_eq!(
            rejected,
            Err(SubjectError::IdSpaceExhausted { last: u64::MAX })
        );
        assert_eq!(subject.len(), 1);
    }

    #[test]
    #[should_panic(expected = "exhausted")]
    fn test_subscribe_panics_when_exhausted() {
        let subject: Subject<'_, i32> = Subject::with_generator(IdGenerator::starting_at(u64::MAX));
        subject.subscribe(|_| {});
        subject.subscribe(|_| {});
    }

    #[test]
    fn test_from_settings_uses_id_start() {
        let settings = SubjectSettings {
            id_start: 500,
            trace_notifications: true,
        };
        let subject: Subject<'_, i32> = Subject::from_settings(&settings);
        assert_eq!(subject.subscribe(|_| {}), SubscriptionId::new(500));
        subject.notify(&0);
    }

    /// Тест проверяет, что после `mem::take` исходный реестр пуст, а
    /// записи переехали вместе с генератором.
    #[test]
    fn test_take_moves_entries() {
        let (mut subject, log) = setup();
        subject.subscribe(recorder(&log, "a"));
        let moved = std::mem::take(&mut subject);

        assert!(subject.is_empty());
        assert_eq!(moved.len(), 1);
        moved.notify(&9);
        assert_eq!(*log.borrow(), vec!["a:9"]);
    }

    #[test]
    fn test_debug_output() {
        let (subject, log) = setup();
        subject.subscribe(recorder(&log, "a"));
        assert_eq!(
            format!("{subject:?}"),
            "Subject { ids: 1, entries: 1, next_id: Some(SubscriptionId(1)), notifying: false }"
        );
    }
}
