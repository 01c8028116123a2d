//! Внутрипроцессный реестр подписчиков (observer / subject).
//!
//! Модуль состоит из:
//!
//! - `registry`: сам `Subject`, хранение подписок и уведомление.
//! - `callback`: типо-стёртый обработчик и его именованные конструкторы.
//! - `handle`: трейты для владеющих и weak-указателей (`Rc`, `Arc`).
//! - `id`: идентификатор подписки и генератор идентификаторов.
//!
//! Публичный API переэкспортирует все четыре модуля.

pub mod callback;
pub mod handle;
pub mod id;
pub mod registry;

pub use callback::*;
pub use handle::*;
pub use id::*;
pub use registry::*;
