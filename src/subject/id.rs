use std::{cell::Cell, fmt};

use obskit_error::{ObskitResult, SubjectError};

/// Идентификатор подписки.
///
/// Несколько подписок могут разделять один и тот же идентификатор:
/// в этом случае `Subject::unsubscribe` снимает их все за один вызов.
/// Уникальность гарантируется только в пределах одного [`IdGenerator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Создаёт идентификатор из произвольного значения.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Возвращает числовое значение идентификатора.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for SubscriptionId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<SubscriptionId> for u64 {
    fn from(id: SubscriptionId) -> Self {
        id.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Монотонный генератор идентификаторов, принадлежащий одному `Subject`.
///
/// Каждое значение выдаётся ровно один раз. После выдачи `u64::MAX`
/// генератор считается исчерпанным и возвращает
/// [`SubjectError::IdSpaceExhausted`].
#[derive(Debug)]
pub struct IdGenerator {
    /// Следующее значение; `None` после исчерпания.
    next: Cell<Option<u64>>,
    /// Последнее выданное значение (для сообщения об ошибке).
    last: Cell<Option<u64>>,
}

impl IdGenerator {
    /// Генератор, начинающий с `0`.
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Генератор, начинающий с `start`.
    pub fn starting_at(start: u64) -> Self {
        Self {
            next: Cell::new(Some(start)),
            last: Cell::new(None),
        }
    }

    /// Выдаёт следующий идентификатор.
    pub fn next_id(&self) -> ObskitResult<SubscriptionId> {
        let current = self.next.get().ok_or(SubjectError::IdSpaceExhausted {
            last: self.last.get().unwrap_or(u64::MAX),
        })?;
        self.next.set(current.checked_add(1));
        self.last.set(Some(current));
        Ok(SubscriptionId(current))
    }

    /// Следующий идентификатор без его потребления.
    pub fn peek(&self) -> Option<SubscriptionId> {
        self.next.get().map(SubscriptionId)
    }

    /// `true`, если генератор больше не может выдавать идентификаторы.
    pub fn is_exhausted(&self) -> bool {
        self.next.get().is_none()
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
