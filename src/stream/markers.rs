//! Таблица маркеров типов UBJSON.
//!
//! Каждое значение на проводе начинается с однобайтового маркера. Байтовые
//! константы используются там, где нужен сырой байт (сообщения об ошибках,
//! тесты на уровне байтов), а [`TypeMarker`] используется везде в коде кодека.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Null
pub const MARKER_NULL: u8 = b'Z';
/// Логическое `true`
pub const MARKER_TRUE: u8 = b'T';
/// Логическое `false`
pub const MARKER_FALSE: u8 = b'F';
/// Знаковый байт (i8)
pub const MARKER_BYTE: u8 = b'B';
/// Целое 16 бит, big-endian
pub const MARKER_INT16: u8 = b'i';
/// Целое 32 бита, big-endian
pub const MARKER_INT32: u8 = b'I';
/// Целое 64 бита, big-endian
pub const MARKER_INT64: u8 = b'L';
/// IEEE-754 single
pub const MARKER_FLOAT: u8 = b'd';
/// IEEE-754 double
pub const MARKER_DOUBLE: u8 = b'D';
/// Число произвольной точности, 4-байтовая длина
pub const MARKER_HUGE: u8 = b'H';
/// Число произвольной точности, 1-байтовая длина
pub const MARKER_HUGE_COMPACT: u8 = b'h';
/// Строка, 4-байтовая длина
pub const MARKER_STRING: u8 = b'S';
/// Строка, 1-байтовая длина
pub const MARKER_STRING_COMPACT: u8 = b's';
/// Массив, 4-байтовый счётчик
pub const MARKER_ARRAY: u8 = b'A';
/// Массив, 1-байтовый счётчик (255 = неизвестная длина)
pub const MARKER_ARRAY_COMPACT: u8 = b'a';
/// Объект, 4-байтовый счётчик
pub const MARKER_OBJECT: u8 = b'O';
/// Объект, 1-байтовый счётчик (255 = неизвестная длина)
pub const MARKER_OBJECT_COMPACT: u8 = b'o';
/// Пустышка, пропускается везде, где ожидается значение
pub const MARKER_NOOP: u8 = b'N';
/// Конец потокового контейнера
pub const MARKER_END: u8 = b'E';

/// Вид значения, определяемый маркером.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum TypeMarker {
    Null = MARKER_NULL,
    True = MARKER_TRUE,
    False = MARKER_FALSE,
    Byte = MARKER_BYTE,
    Int16 = MARKER_INT16,
    Int32 = MARKER_INT32,
    Int64 = MARKER_INT64,
    Float = MARKER_FLOAT,
    Double = MARKER_DOUBLE,
    Huge = MARKER_HUGE,
    HugeCompact = MARKER_HUGE_COMPACT,
    String = MARKER_STRING,
    StringCompact = MARKER_STRING_COMPACT,
    Array = MARKER_ARRAY,
    ArrayCompact = MARKER_ARRAY_COMPACT,
    Object = MARKER_OBJECT,
    ObjectCompact = MARKER_OBJECT_COMPACT,
    Noop = MARKER_NOOP,
    End = MARKER_END,
}

/// Форма тела значения после маркера.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Body {
    /// Тела нет
    Empty,
    /// Фиксированное кол-во байт
    Fixed(u64),
    /// Заголовок длины + столько же байт UTF-8
    Text { compact: bool },
    /// Заголовок счётчика + дочерние значения
    Container { compact: bool, object: bool },
}

impl TypeMarker {
    /// Все маркеры, с которых может начинаться значение (без NOOP и END).
    pub const VALUES: [TypeMarker; 17] = [
        TypeMarker::Null,
        TypeMarker::True,
        TypeMarker::False,
        TypeMarker::Byte,
        TypeMarker::Int16,
        TypeMarker::Int32,
        TypeMarker::Int64,
        TypeMarker::Float,
        TypeMarker::Double,
        TypeMarker::Huge,
        TypeMarker::HugeCompact,
        TypeMarker::String,
        TypeMarker::StringCompact,
        TypeMarker::Array,
        TypeMarker::ArrayCompact,
        TypeMarker::Object,
        TypeMarker::ObjectCompact,
    ];

    /// Маркер по байту; `None` для байта, неизвестного протоколу.
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::try_from(byte).ok()
    }

    pub fn as_byte(self) -> u8 {
        self.into()
    }

    /// Как устроено тело значения с этим маркером.
    pub fn body(self) -> Body {
        match self {
            Self::Null | Self::True | Self::False | Self::Noop | Self::End => Body::Empty,
            Self::Byte => Body::Fixed(1),
            Self::Int16 => Body::Fixed(2),
            Self::Int32 | Self::Float => Body::Fixed(4),
            Self::Int64 | Self::Double => Body::Fixed(8),
            Self::Huge | Self::String => Body::Text { compact: false },
            Self::HugeCompact | Self::StringCompact => Body::Text { compact: true },
            Self::Array => Body::Container {
                compact: false,
                object: false,
            },
            Self::ArrayCompact => Body::Container {
                compact: true,
                object: false,
            },
            Self::Object => Body::Container {
                compact: false,
                object: true,
            },
            Self::ObjectCompact => Body::Container {
                compact: true,
                object: true,
            },
        }
    }

    /// Использует ли маркер 1-байтовый заголовок длины.
    pub fn is_compact(self) -> bool {
        matches!(
            self.body(),
            Body::Text { compact: true } | Body::Container { compact: true, .. }
        )
    }

    pub fn is_string(self) -> bool {
        matches!(self, Self::String | Self::StringCompact)
    }

    pub fn is_container(self) -> bool {
        matches!(self.body(), Body::Container { .. })
    }

    /// Человекочитаемое имя вида значения, для логов и контекста ошибок.
    pub fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::True | Self::False => "boolean",
            Self::Byte => "byte",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float => "float",
            Self::Double => "double",
            Self::Huge | Self::HugeCompact => "huge",
            Self::String | Self::StringCompact => "string",
            Self::Array | Self::ArrayCompact => "array",
            Self::Object | Self::ObjectCompact => "object",
            Self::Noop => "noop",
            Self::End => "end",
        }
    }
}

impl std::fmt::Display for TypeMarker {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{} ('{}')", self.name(), self.as_byte() as char)
    }
}
