use std::{fmt, panic::Location, sync::Arc};

use crate::{ErrorExt, StatusCode, UbjError};

/// Основная структура ошибки с поддержкой контекста и трассировки.
///
/// Контекст добавляется по мере того, как ошибка поднимается от читателя или
/// писателя к вызывающему коду.
#[derive(Clone)]
pub struct StackError {
    inner: Arc<dyn ErrorExt>,
    contexts: Arc<Vec<ErrorContext>>,
}

/// Контекст ошибки с location tracking.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub message: String,
    pub location: Option<&'static Location<'static>>,
}

/// Грубая классификация ошибок кодека.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Отказ источника/приёмника или усечённый поток.
    Io,
    /// Нарушение формата: неизвестный или неожиданный маркер, неверная длина.
    Format,
    /// Неверный аргумент вызывающего кода.
    Argument,
    /// Всё остальное.
    Other,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl StackError {
    /// Создаёт новую ошибку.
    #[track_caller]
    pub fn new<E: ErrorExt>(err: E) -> Self {
        Self {
            inner: Arc::new(err),
            contexts: Arc::new(Vec::new()),
        }
    }

    /// Добавляет контекст к ошибке.
    #[track_caller]
    pub fn context(
        mut self,
        msg: impl Into<String>,
    ) -> Self {
        let mut new_contexts = (*self.contexts).clone();
        new_contexts.push(ErrorContext {
            message: msg.into(),
            location: Some(Location::caller()),
        });
        self.contexts = Arc::new(new_contexts);
        self
    }

    /// Возвращает код статуса
    pub fn status_code(&self) -> StatusCode {
        self.inner.status_code()
    }

    /// Категория ошибки, выведенная из кода статуса.
    pub fn kind(&self) -> ErrorKind {
        let code = self.status_code();
        if code.is_io_error() {
            ErrorKind::Io
        } else if code.is_format_error() {
            ErrorKind::Format
        } else if code.is_argument_error() {
            ErrorKind::Argument
        } else {
            ErrorKind::Other
        }
    }

    /// Позиция в потоке (в байтах), если корневая ошибка является [`UbjError`] и
    /// позиция известна.
    pub fn position(&self) -> Option<u64> {
        self.downcast_ref::<UbjError>().and_then(UbjError::position)
    }

    /// `true`, если поток закончился раньше, чем было прочитано тело значения.
    pub fn is_truncated(&self) -> bool {
        self.status_code() == StatusCode::UnexpectedEof
    }

    /// Возвращает корневую ошибку.
    pub fn root(&self) -> &dyn ErrorExt {
        self.inner.as_ref()
    }

    /// Возвращает все контексты
    pub fn contexts(&self) -> &[ErrorContext] {
        &self.contexts
    }

    /// Попытка downcast к конкретному типу ошибки
    pub fn downcast_ref<T: ErrorExt + 'static>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref::<T>()
    }

    fn format_contexts(&self) -> Vec<String> {
        self.contexts
            .iter()
            .map(|ctx| {
                if let Some(loc) = ctx.location {
                    format!("{} ({}:{})", ctx.message, loc.file(), loc.line())
                } else {
                    ctx.message.clone()
                }
            })
            .collect()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для StackError
////////////////////////////////////////////////////////////////////////////////

impl fmt::Debug for StackError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let mut debug = f.debug_struct("StackError");
        debug.field("inner", &self.inner.to_string());
        debug.field("status_code", &self.status_code());

        if !self.contexts.is_empty() {
            debug.field("contexts", &self.format_contexts());
        }

        debug.finish()
    }
}

impl fmt::Display for StackError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if !self.contexts.is_empty() {
            let contexts: Vec<&str> = self.contexts.iter().map(|c| c.message.as_str()).collect();
            write!(f, "{}: {}", contexts.join(" → "), self.inner)
        } else {
            write!(f, "{}", self.inner)
        }
    }
}

impl std::error::Error for StackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.inner.as_ref())
    }
}

impl<E: ErrorExt> From<E> for StackError {
    #[track_caller]
    fn from(e: E) -> Self {
        StackError::new(e)
    }
}

impl From<StackError> for std::io::Error {
    fn from(e: StackError) -> Self {
        let kind = match e.kind() {
            ErrorKind::Io if e.is_truncated() => std::io::ErrorKind::UnexpectedEof,
            ErrorKind::Format => std::io::ErrorKind::InvalidData,
            ErrorKind::Argument => std::io::ErrorKind::InvalidInput,
            _ => std::io::ErrorKind::Other,
        };
        std::io::Error::new(kind, e.to_string())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GenericError;

    #[test]
    fn test_context_chain() {
        let err = UbjError::UnexpectedEof {
            context: "reading int32 body".to_string(),
            position: 3,
            expected_bytes: 4,
            got_bytes: 1,
        };
        let stack = StackError::new(err)
            .context("reading array element")
            .context("loading document");

        assert_eq!(stack.contexts().len(), 2);
        assert_eq!(stack.contexts()[0].message, "reading array element");
        assert!(stack.contexts()[0].location.is_some());

        let display = stack.to_string();
        assert!(display.starts_with("reading array element → loading document: "));
    }

    /// Тест проверяет классификацию и извлечение позиции.
    #[test]
    fn test_kind_and_position() {
        let stack = StackError::new(UbjError::UnexpectedMarker {
            found: b'S',
            expected: vec![b'I'],
            position: 17,
        });
        assert_eq!(stack.kind(), ErrorKind::Format);
        assert_eq!(stack.position(), Some(17));
        assert!(!stack.is_truncated());

        let arg = StackError::new(UbjError::InvalidArgument {
            what: "count".to_string(),
            reason: "too large".to_string(),
        });
        assert_eq!(arg.kind(), ErrorKind::Argument);
        assert_eq!(arg.position(), None);

        let generic = StackError::new(GenericError::new(StatusCode::Internal, "boom"));
        assert_eq!(generic.kind(), ErrorKind::Other);
        assert_eq!(generic.position(), None);
    }

    #[test]
    fn test_downcast() {
        let stack = StackError::new(UbjError::UnknownMarker {
            byte: 0x01,
            position: 0,
        });
        assert!(stack.downcast_ref::<UbjError>().is_some());
        assert!(stack.downcast_ref::<GenericError>().is_none());
    }

    /// Тест проверяет обратную конвертацию в `std::io::Error`.
    #[test]
    fn test_into_io_error() {
        let truncated = StackError::new(UbjError::UnexpectedEof {
            context: "x".to_string(),
            position: 0,
            expected_bytes: 8,
            got_bytes: 0,
        });
        let io: std::io::Error = truncated.into();
        assert_eq!(io.kind(), std::io::ErrorKind::UnexpectedEof);

        let format = StackError::new(UbjError::InvalidLength {
            marker: b'S',
            length: -1,
            position: 1,
        });
        let io: std::io::Error = format.into();
        assert_eq!(io.kind(), std::io::ErrorKind::InvalidData);
    }
}
