//! Заголовки длины: компактная (1 байт) и полная (4 байта) формы.
//!
//! Форма выбирается один раз на значение. Компактная используется для
//! длин `0..=254`; байт `255` в компактном заголовке контейнера означает
//! потоковый контейнер неизвестной длины, поэтому литеральная длина 255
//! всегда пишется в полной форме.

use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use ubjson_error::{UbjError, UbjResult};

/// Длины меньше этого значения пишутся в компактной форме.
pub const COMPACT_LIMIT: usize = 255;
/// Компактный счётчик потокового контейнера.
pub const UNKNOWN_LENGTH: u8 = 0xFF;
/// Максимальная длина, представимая в полной форме.
pub const MAX_LENGTH: usize = i32::MAX as usize;

/// Заголовок длины в той форме, в какой он лежит на проводе.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthHeader {
    Compact(u8),
    Full(i32),
}

/// Кол-во дочерних значений контейнера.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerLength {
    /// Ровно столько дочерних значений (для объекта это пары имя/значение)
    Bounded(usize),
    /// Потоковый контейнер, завершается маркером END
    Unbounded,
}

impl LengthHeader {
    /// Каноническая форма для длины `len`.
    ///
    /// Длина, не влезающая в знаковые 32 бита, считается ошибкой вызывающего кода.
    pub fn for_len(
        len: usize,
        what: &str,
    ) -> UbjResult<Self> {
        if len < COMPACT_LIMIT {
            Ok(Self::Compact(len as u8))
        } else if len <= MAX_LENGTH {
            Ok(Self::Full(len as i32))
        } else {
            Err(UbjError::invalid_argument(
                what,
                format!("length {len} exceeds {MAX_LENGTH}"),
            )
            .into())
        }
    }

    /// Заголовок для контейнера.
    pub fn for_container(
        len: ContainerLength,
        what: &str,
    ) -> UbjResult<Self> {
        match len {
            ContainerLength::Bounded(n) => Self::for_len(n, what),
            ContainerLength::Unbounded => Ok(Self::Compact(UNKNOWN_LENGTH)),
        }
    }

    pub fn is_compact(&self) -> bool {
        matches!(self, Self::Compact(_))
    }

    /// Размер заголовка на проводе.
    pub fn encoded_len(&self) -> u64 {
        match self {
            Self::Compact(_) => 1,
            Self::Full(_) => 4,
        }
    }

    pub fn read<R: Read>(
        r: &mut R,
        compact: bool,
    ) -> io::Result<Self> {
        if compact {
            r.read_u8().map(Self::Compact)
        } else {
            r.read_i32::<BigEndian>().map(Self::Full)
        }
    }

    pub fn write<W: Write>(
        &self,
        w: &mut W,
    ) -> io::Result<()> {
        match *self {
            Self::Compact(n) => w.write_u8(n),
            Self::Full(n) => w.write_i32::<BigEndian>(n),
        }
    }

    /// Длина текстового тела. Компактный байт читается буквально (0..=255).
    ///
    /// `Err` несёт отрицательное значение полного заголовка.
    pub fn text_len(&self) -> Result<usize, i64> {
        match *self {
            Self::Compact(n) => Ok(n as usize),
            Self::Full(n) if n >= 0 => Ok(n as usize),
            Self::Full(n) => Err(n as i64),
        }
    }

    /// Длина контейнера; компактный `255` означает потоковый контейнер.
    pub fn container_len(&self) -> Result<ContainerLength, i64> {
        match *self {
            Self::Compact(UNKNOWN_LENGTH) => Ok(ContainerLength::Unbounded),
            Self::Compact(n) => Ok(ContainerLength::Bounded(n as usize)),
            Self::Full(n) if n >= 0 => Ok(ContainerLength::Bounded(n as usize)),
            Self::Full(n) => Err(n as i64),
        }
    }
}

impl ContainerLength {
    /// Кол-во элементов, если оно объявлено.
    pub fn count(&self) -> Option<usize> {
        match self {
            Self::Bounded(n) => Some(*n),
            Self::Unbounded => None,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, Self::Unbounded)
    }
}

impl From<usize> for ContainerLength {
    fn from(n: usize) -> Self {
        Self::Bounded(n)
    }
}

/// Знаковый счётчик: `-1` означает потоковый контейнер, прочие отрицательные
/// значения отклоняются.
impl TryFrom<i64> for ContainerLength {
    type Error = UbjError;

    fn try_from(n: i64) -> Result<Self, Self::Error> {
        match n {
            -1 => Ok(Self::Unbounded),
            n if n >= 0 => Ok(Self::Bounded(n as usize)),
            n => Err(UbjError::invalid_argument(
                "count",
                format!("{n} is negative and not the unknown-length sentinel -1"),
            )),
        }
    }
}
