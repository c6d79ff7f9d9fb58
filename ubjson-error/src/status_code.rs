use std::fmt;

use num_enum::TryFromPrimitive;
#[cfg(feature = "serde")]
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Коды статуса для категоризации ошибок кодека.
///
/// # Диапазоны:
/// - 0xxx: Успех
/// - 1xxx: Общие ошибки и ошибки аргументов
/// - 6xxx: Ввод/вывод (источник или приёмник байтов)
/// - 8xxx: Нарушения формата протокола
///
/// `num_enum::TryFromPrimitive` даёт `TryFrom<u32>`, что удобно, когда код
/// передаётся дальше по сети или пишется в лог числом.
#[cfg_attr(feature = "serde", derive(Serialize_repr, Deserialize_repr))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    // === 0xxx: Успех ===
    Success = 0,

    // === 1xxx: Общие ошибки ===
    Unknown = 1000,
    Internal = 1003,
    InvalidArgs = 1004,

    // === 6xxx: Сеть/IO ===
    Io = 6000,
    UnexpectedEof = 6007,

    // === 8xxx: Протокол ===
    InvalidMarker = 8000,
    UnexpectedMarker = 8001,
    InvalidLength = 8002,
    InvalidUtf8 = 8004,
    InvalidNumber = 8005,
    DepthLimit = 8008,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    /// Числовое представление кода статуса.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Пытается получить вариант `StatusCode` из `u32`.
    pub fn from_u32(v: u32) -> Option<Self> {
        Self::try_from(v).ok()
    }

    /// Вернёт `true`, если переданный `code` означает успешный результат.
    pub fn is_success(code: u32) -> bool {
        Self::Success as u32 == code
    }

    /// Отказ источника/приёмника или усечённый поток (диапазон 6xxx).
    pub fn is_io_error(&self) -> bool {
        (6000..=6999).contains(&self.code())
    }

    /// Нарушение формата протокола (диапазон 8xxx).
    ///
    /// После такой ошибки позиция в потоке больше не совпадает с границей
    /// значения, и читатель продолжать нельзя.
    pub fn is_format_error(&self) -> bool {
        (8000..=8999).contains(&self.code())
    }

    /// Ошибка вызывающего кода: неверный аргумент.
    pub fn is_argument_error(&self) -> bool {
        matches!(self, Self::InvalidArgs)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для StatusCode
////////////////////////////////////////////////////////////////////////////////

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
