use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибка потока UBJSON с контекстом для диагностики.
///
/// Маркеры хранятся сырыми байтами: ошибка должна уметь описать и байт,
/// который протоколу вообще неизвестен.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UbjError {
    /// Поток закончился посреди тела значения
    #[error(
        "Unexpected EOF: {context} (expected {expected_bytes} bytes, got {got_bytes}) [offset: {position}]"
    )]
    UnexpectedEof {
        context: String,
        position: u64,
        expected_bytes: u64,
        got_bytes: u64,
    },

    /// Источник или приёмник вернул ошибку
    #[error("I/O error while {context}: {message} ({kind:?}) [offset: {position}]")]
    Io {
        context: String,
        kind: std::io::ErrorKind,
        message: String,
        position: u64,
    },

    /// Байт не является маркером протокола
    #[error("Unknown marker {} [offset: {position}]", marker_ref(.byte))]
    UnknownMarker { byte: u8, position: u64 },

    /// Маркер известен, но не подходит вызванной операции чтения
    #[error(
        "Unexpected marker {} (expected: {}) [offset: {position}]",
        marker_ref(.found),
        markers_label(.expected)
    )]
    UnexpectedMarker {
        found: u8,
        expected: Vec<u8>,
        position: u64,
    },

    /// Отрицательная длина или счётчик в заголовке
    #[error(
        "Invalid length {length} for {} value [offset: {position}]",
        marker_ref(.marker)
    )]
    InvalidLength {
        marker: u8,
        length: i64,
        position: u64,
    },

    /// Тело строки не является корректным UTF-8
    #[error("Invalid UTF-8 in text body after {valid_up_to} valid bytes [offset: {position}]")]
    InvalidUtf8 { position: u64, valid_up_to: u64 },

    /// Текст HUGE-значения не разбирается как число запрошенного типа
    #[error("Invalid huge number {text:?}: {reason} [offset: {position}]")]
    InvalidNumber {
        text: String,
        reason: String,
        position: u64,
    },

    /// Превышена глубина вложенности при пропуске контейнеров
    #[error("Nesting depth {depth} exceeds limit {max} [offset: {position}]")]
    DepthLimit {
        depth: usize,
        max: usize,
        position: u64,
    },

    /// Ошибка вызывающего кода, ни один байт не записан
    #[error("Invalid argument {what}: {reason}")]
    InvalidArgument { what: String, reason: String },
}

impl UbjError {
    /// Позиция в потоке, к которой относится ошибка.
    pub fn position(&self) -> Option<u64> {
        match self {
            Self::UnexpectedEof { position, .. }
            | Self::Io { position, .. }
            | Self::UnknownMarker { position, .. }
            | Self::UnexpectedMarker { position, .. }
            | Self::InvalidLength { position, .. }
            | Self::InvalidUtf8 { position, .. }
            | Self::InvalidNumber { position, .. }
            | Self::DepthLimit { position, .. } => Some(*position),
            Self::InvalidArgument { .. } => None,
        }
    }

    /// Строит ошибку из `std::io::Error`, отличая усечённый поток от
    /// отказа источника.
    pub fn from_io(
        err: &std::io::Error,
        context: impl Into<String>,
        position: u64,
        expected_bytes: u64,
    ) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof => Self::UnexpectedEof {
                context: context.into(),
                position,
                expected_bytes,
                got_bytes: 0,
            },
            kind => Self::Io {
                context: context.into(),
                kind,
                message: err.to_string(),
                position,
            },
        }
    }

    pub fn invalid_argument(
        what: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            what: what.into(),
            reason: reason.into(),
        }
    }
}

/// Печатает маркер как символ и hex: `'S' (0x53)`.
pub fn marker_label(byte: u8) -> String {
    if byte.is_ascii_graphic() {
        format!("'{}' (0x{byte:02X})", byte as char)
    } else {
        format!("0x{byte:02X}")
    }
}

fn marker_ref(byte: &u8) -> String {
    marker_label(*byte)
}

fn markers_label(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| marker_label(*b))
        .collect::<Vec<_>>()
        .join(" or ")
}

impl ErrorExt for UbjError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::UnexpectedEof { .. } => StatusCode::UnexpectedEof,
            Self::Io { .. } => StatusCode::Io,
            Self::UnknownMarker { .. } => StatusCode::InvalidMarker,
            Self::UnexpectedMarker { .. } => StatusCode::UnexpectedMarker,
            Self::InvalidLength { .. } => StatusCode::InvalidLength,
            Self::InvalidUtf8 { .. } => StatusCode::InvalidUtf8,
            Self::InvalidNumber { .. } => StatusCode::InvalidNumber,
            Self::DepthLimit { .. } => StatusCode::DepthLimit,
            Self::InvalidArgument { .. } => StatusCode::InvalidArgs,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
