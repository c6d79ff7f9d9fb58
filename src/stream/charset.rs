//! Буферизованное кодирование и декодирование тел строк и HUGE-значений.
//!
//! Тело текста читается и пишется порциями не больше размера буфера, так
//! что длина значения никак не ограничивает расход памяти на буфер.
//! Многобайтовая последовательность UTF-8, разрезанная границей порции,
//! переносится в состоянии [`Utf8Transcoder`] и дособирается из следующей
//! порции.

use std::io::{self, Read, Write};

use thiserror::Error;
use tracing::trace;
use ubjson_error::{ensure, UbjError, UbjResult};

/// Размер буфера по умолчанию.
pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;
/// Минимальный буфер: в него должен влезать любой символ UTF-8.
pub const MIN_BUFFER_SIZE: usize = 4;

/// Ошибка кодирования/декодирования текста. Позиции считаются от начала
/// тела; читатель переводит их в абсолютные через [`TextError::into_ubj`].
#[derive(Debug, Error)]
pub enum TextError {
    #[error("stream ended after {got} of {expected} text bytes")]
    Truncated { expected: u64, got: u64 },
    #[error("invalid UTF-8 after {valid_up_to} valid bytes")]
    InvalidUtf8 { valid_up_to: u64 },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TextError {
    /// Переводит ошибку в [`UbjError`]; `body_start` задаёт позицию первого байта
    /// тела в потоке.
    pub fn into_ubj(
        self,
        context: &str,
        body_start: u64,
    ) -> UbjError {
        match self {
            Self::Truncated { expected, got } => UbjError::UnexpectedEof {
                context: context.to_string(),
                position: body_start,
                expected_bytes: expected,
                got_bytes: got,
            },
            Self::InvalidUtf8 { valid_up_to } => UbjError::InvalidUtf8 {
                position: body_start + valid_up_to,
                valid_up_to,
            },
            Self::Io(e) => UbjError::from_io(&e, context, body_start, 0),
        }
    }
}

/// Состояние потокового декодера UTF-8.
#[derive(Debug, Default)]
pub struct Utf8Transcoder {
    pending: [u8; 4],
    pending_len: usize,
    consumed: u64,
}

impl Utf8Transcoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Сбрасывает состояние перед новым телом.
    pub fn reset(&mut self) {
        self.pending_len = 0;
        self.consumed = 0;
    }

    /// Есть ли незавершённая последовательность.
    pub fn has_pending(&self) -> bool {
        self.pending_len > 0
    }

    /// Кол-во байт, уже превращённых в символы.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Декодирует порцию, дописывая символы в `out`. Неполный хвост порции
    /// запоминается до следующего вызова.
    pub fn decode(
        &mut self,
        mut chunk: &[u8],
        out: &mut String,
    ) -> Result<(), TextError> {
        if self.pending_len > 0 {
            let width = utf8_width(self.pending[0]);
            let take = (width - self.pending_len).min(chunk.len());
            self.pending[self.pending_len..self.pending_len + take].copy_from_slice(&chunk[..take]);
            self.pending_len += take;
            chunk = &chunk[take..];
            if self.pending_len < width {
                return Ok(());
            }

            let ch = simdutf8::basic::from_utf8(&self.pending[..width]).map_err(|_| {
                TextError::InvalidUtf8 {
                    valid_up_to: self.consumed,
                }
            })?;
            out.push_str(ch);
            self.consumed += width as u64;
            self.pending_len = 0;
            trace!(width, "joined split UTF-8 sequence");
        }

        match simdutf8::compat::from_utf8(chunk) {
            Ok(text) => {
                out.push_str(text);
                self.consumed += chunk.len() as u64;
                Ok(())
            }
            Err(e) => {
                let valid = e.valid_up_to();
                let prefix = simdutf8::basic::from_utf8(&chunk[..valid]).map_err(|_| {
                    TextError::InvalidUtf8 {
                        valid_up_to: self.consumed,
                    }
                })?;
                out.push_str(prefix);
                self.consumed += valid as u64;

                match e.error_len() {
                    Some(_) => Err(TextError::InvalidUtf8 {
                        valid_up_to: self.consumed,
                    }),
                    None => {
                        let tail = &chunk[valid..];
                        self.pending[..tail.len()].copy_from_slice(tail);
                        self.pending_len = tail.len();
                        Ok(())
                    }
                }
            }
        }
    }

    /// Завершает тело: незакрытая последовательность считается ошибкой.
    pub fn finish(&mut self) -> Result<(), TextError> {
        if self.pending_len > 0 {
            return Err(TextError::InvalidUtf8 {
                valid_up_to: self.consumed,
            });
        }
        Ok(())
    }
}

/// Ширина последовательности по ведущему байту.
fn utf8_width(lead: u8) -> usize {
    match lead {
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 1,
    }
}

fn check_capacity(capacity: usize) -> UbjResult<()> {
    ensure!(
        capacity >= MIN_BUFFER_SIZE,
        UbjError::invalid_argument(
            "buffer_size",
            format!("{capacity} is smaller than {MIN_BUFFER_SIZE}"),
        )
    );
    Ok(())
}

/// Декодер тел текста с переиспользуемым буфером.
#[derive(Debug)]
pub struct StreamDecoder {
    buffer: Box<[u8]>,
    transcoder: Utf8Transcoder,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self {
            buffer: vec![0; DEFAULT_BUFFER_SIZE].into_boxed_slice(),
            transcoder: Utf8Transcoder::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> UbjResult<Self> {
        check_capacity(capacity)?;
        Ok(Self {
            buffer: vec![0; capacity].into_boxed_slice(),
            transcoder: Utf8Transcoder::new(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Читает ровно `byte_len` байт из `source` и возвращает их как строку.
    pub fn decode<R: Read>(
        &mut self,
        source: &mut R,
        byte_len: usize,
    ) -> Result<String, TextError> {
        let mut out = String::new();
        self.decode_into(source, byte_len, &mut out)?;
        Ok(out)
    }

    /// То же, что [`decode`](Self::decode), но дописывает в `out`.
    ///
    /// Из источника никогда не читается больше `byte_len` байт. При ошибке
    /// `out` возвращается к исходной длине.
    pub fn decode_into<R: Read>(
        &mut self,
        source: &mut R,
        byte_len: usize,
        out: &mut String,
    ) -> Result<(), TextError> {
        let start = out.len();
        let result = self.fill(source, byte_len, out);
        if result.is_err() {
            out.truncate(start);
        }
        result
    }

    fn fill<R: Read>(
        &mut self,
        source: &mut R,
        byte_len: usize,
        out: &mut String,
    ) -> Result<(), TextError> {
        self.transcoder.reset();
        out.reserve(byte_len.min(self.buffer.len()));

        let mut remaining = byte_len;
        while remaining > 0 {
            let want = remaining.min(self.buffer.len());
            let n = match source.read(&mut self.buffer[..want]) {
                Ok(0) => {
                    return Err(TextError::Truncated {
                        expected: byte_len as u64,
                        got: (byte_len - remaining) as u64,
                    })
                }
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            remaining -= n;
            self.transcoder.decode(&self.buffer[..n], out)?;
        }

        self.transcoder.finish()
    }
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Кодировщик тел текста с переиспользуемым буфером.
#[derive(Debug)]
pub struct StreamEncoder {
    buffer: Box<[u8]>,
}

impl StreamEncoder {
    pub fn new() -> Self {
        Self {
            buffer: vec![0; DEFAULT_BUFFER_SIZE].into_boxed_slice(),
        }
    }

    pub fn with_capacity(capacity: usize) -> UbjResult<Self> {
        check_capacity(capacity)?;
        Ok(Self {
            buffer: vec![0; capacity].into_boxed_slice(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Пишет байты `text` прямо в `sink`, без копирования в буфер, порциями
    /// не больше его размера. Возвращает кол-во записанных байт.
    pub fn encode_str<W: Write>(
        &mut self,
        text: &str,
        sink: &mut W,
    ) -> io::Result<u64> {
        for chunk in text.as_bytes().chunks(self.buffer.len()) {
            sink.write_all(chunk)?;
        }
        Ok(text.len() as u64)
    }

    /// Кодирует символы в UTF-8 через буфер и сбрасывает его в `sink`,
    /// как только следующий символ может не влезть.
    pub fn encode_chars<W, I>(
        &mut self,
        chars: I,
        sink: &mut W,
    ) -> io::Result<u64>
    where
        W: Write,
        I: IntoIterator<Item = char>,
    {
        let mut used = 0;
        let mut total = 0u64;
        for ch in chars {
            if used + ch.len_utf8() > self.buffer.len() {
                sink.write_all(&self.buffer[..used])?;
                total += used as u64;
                used = 0;
            }
            used += ch.encode_utf8(&mut self.buffer[used..]).len();
        }
        if used > 0 {
            sink.write_all(&self.buffer[..used])?;
            total += used as u64;
        }
        Ok(total)
    }
}

impl Default for StreamEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Длина последовательности символов в UTF-8.
pub fn utf8_len(chars: &[char]) -> usize {
    chars.iter().map(|c| c.len_utf8()).sum()
}
