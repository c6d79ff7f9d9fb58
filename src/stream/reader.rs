use std::io::{self, Read};

use byteorder::{BigEndian, ReadBytesExt};
use tracing::{debug, trace, warn};
use ubjson_error::{ResultExt, StackError, UbjError, UbjResult};

use super::{
    charset::StreamDecoder,
    counting::CountingRead,
    length::{ContainerLength, LengthHeader},
    markers::{Body, TypeMarker},
};
use crate::config::{CodecConfig, DEFAULT_MAX_DEPTH};

const BOOLEAN_MARKERS: [TypeMarker; 2] = [TypeMarker::True, TypeMarker::False];
const HUGE_MARKERS: [TypeMarker; 2] = [TypeMarker::Huge, TypeMarker::HugeCompact];
const STRING_MARKERS: [TypeMarker; 2] = [TypeMarker::String, TypeMarker::StringCompact];
const ARRAY_MARKERS: [TypeMarker; 2] = [TypeMarker::Array, TypeMarker::ArrayCompact];
const OBJECT_MARKERS: [TypeMarker; 2] = [TypeMarker::Object, TypeMarker::ObjectCompact];

/// Незакрытый контейнер при пропуске значения.
#[derive(Debug)]
struct SkipFrame {
    parent: TypeMarker,
    object: bool,
    /// Сколько элементов осталось; `None` у потокового контейнера.
    remaining: Option<usize>,
    /// Имя пары уже пропущено, следующим идёт значение.
    value_next: bool,
}

/// Позиция курсора относительно текущего значения.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    /// Маркер текущего значения ещё не прочитан.
    Empty,
    /// Маркер прочитан и закеширован, тело не тронуто.
    Peeked { marker: TypeMarker, position: u64 },
}

/// Читатель потока UBJSON.
///
/// Держит не больше одного прочитанного, но не разобранного маркера. Это
/// позволяет и заглянуть в тип следующего значения через
/// [`next_type`](Self::next_type), и сразу звать нужный `read_*`, когда тип
/// известен заранее. Повторный `next_type` без чтения пропускает тело
/// закешированного значения целиком, включая вложенные контейнеры.
///
/// Любая ошибка, кроме чистого конца потока, фатальна для читателя: позиция
/// перестаёт совпадать с границей значения.
#[derive(Debug)]
pub struct UbjReader<R: Read> {
    source: CountingRead<R>,
    state: CursorState,
    decoder: StreamDecoder,
    max_depth: usize,
}

impl<R: Read> UbjReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            source: CountingRead::new(source),
            state: CursorState::Empty,
            decoder: StreamDecoder::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_config(
        source: R,
        config: &CodecConfig,
    ) -> UbjResult<Self> {
        config.validate().context("configuring UBJSON reader")?;
        debug!(
            "UBJSON reader created with {} byte text buffer, max depth {}",
            config.buffer_size, config.max_depth
        );
        Ok(Self {
            source: CountingRead::new(source),
            state: CursorState::Empty,
            decoder: StreamDecoder::with_capacity(config.buffer_size)?,
            max_depth: config.max_depth,
        })
    }

    /// Кол-во байт, полученных из источника.
    pub fn position(&self) -> u64 {
        self.source.bytes_read()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Закешированный маркер, если тип следующего значения уже известен.
    /// Ничего не читает и не пропускает.
    pub fn pending_marker(&self) -> Option<TypeMarker> {
        match self.state {
            CursorState::Peeked { marker, .. } => Some(marker),
            CursorState::Empty => None,
        }
    }

    /// Тип следующего значения или `None` на чистом конце потока.
    ///
    /// Если предыдущий маркер так и не был прочитан, его тело пропускается.
    /// Маркеры NOOP пропускаются всегда.
    pub fn next_type(&mut self) -> UbjResult<Option<TypeMarker>> {
        if let CursorState::Peeked { marker, position } = self.state {
            self.state = CursorState::Empty;
            trace!("Skipping unread {} from byte {}", marker.name(), position);
            self.skip_body(marker)
                .with_context(|| format!("skipping unread {} from byte {position}", marker.name()))?;
        }

        match self.scan()? {
            Some((marker, position)) => {
                self.state = CursorState::Peeked { marker, position };
                Ok(Some(marker))
            }
            None => Ok(None),
        }
    }

    /// Пропускает следующее (или закешированное) значение целиком.
    ///
    /// Возвращает маркер пропущенного значения, `None` на конце потока.
    pub fn skip_value(&mut self) -> UbjResult<Option<TypeMarker>> {
        let marker = match self.state {
            CursorState::Peeked { marker, .. } => marker,
            CursorState::Empty => match self.scan()? {
                Some((marker, _)) => marker,
                None => return Ok(None),
            },
        };
        self.state = CursorState::Empty;
        self.skip_body(marker)?;
        Ok(Some(marker))
    }

    pub fn read_null(&mut self) -> UbjResult<()> {
        self.take(&[TypeMarker::Null], "null")?;
        Ok(())
    }

    pub fn read_boolean(&mut self) -> UbjResult<bool> {
        let (marker, _) = self.take(&BOOLEAN_MARKERS, "boolean")?;
        Ok(marker == TypeMarker::True)
    }

    pub fn read_byte(&mut self) -> UbjResult<i8> {
        self.take(&[TypeMarker::Byte], "byte")?;
        self.read_body(TypeMarker::Byte, 1, |r| r.read_i8())
    }

    pub fn read_int16(&mut self) -> UbjResult<i16> {
        self.take(&[TypeMarker::Int16], "int16")?;
        self.read_body(TypeMarker::Int16, 2, |r| r.read_i16::<BigEndian>())
    }

    pub fn read_int32(&mut self) -> UbjResult<i32> {
        self.take(&[TypeMarker::Int32], "int32")?;
        self.read_body(TypeMarker::Int32, 4, |r| r.read_i32::<BigEndian>())
    }

    pub fn read_int64(&mut self) -> UbjResult<i64> {
        self.take(&[TypeMarker::Int64], "int64")?;
        self.read_body(TypeMarker::Int64, 8, |r| r.read_i64::<BigEndian>())
    }

    pub fn read_float(&mut self) -> UbjResult<f32> {
        self.take(&[TypeMarker::Float], "float")?;
        self.read_body(TypeMarker::Float, 4, |r| {
            r.read_u32::<BigEndian>().map(f32::from_bits)
        })
    }

    pub fn read_double(&mut self) -> UbjResult<f64> {
        self.take(&[TypeMarker::Double], "double")?;
        self.read_body(TypeMarker::Double, 8, |r| {
            r.read_u64::<BigEndian>().map(f64::from_bits)
        })
    }

    /// Текст числа произвольной точности как есть.
    pub fn read_huge(&mut self) -> UbjResult<String> {
        let mut text = String::new();
        self.read_huge_into(&mut text)?;
        Ok(text)
    }

    /// Дописывает текст HUGE-значения в `out`.
    pub fn read_huge_into(
        &mut self,
        out: &mut String,
    ) -> UbjResult<()> {
        let (marker, _) = self.take(&HUGE_MARKERS, "huge")?;
        self.read_text_into(marker, out)
    }

    /// HUGE-значение как целое, если оно влезает в 128 бит.
    pub fn read_huge_as_i128(&mut self) -> UbjResult<i128> {
        let (marker, position) = self.take(&HUGE_MARKERS, "huge")?;
        let mut text = String::new();
        self.read_text_into(marker, &mut text)?;
        match text.parse::<i128>() {
            Ok(value) => Ok(value),
            Err(e) => Err(invalid_number(text, e.to_string(), position)),
        }
    }

    /// HUGE-значение как десятичное число; понимает и экспоненциальную
    /// запись.
    #[cfg(feature = "decimal")]
    pub fn read_huge_as_decimal(&mut self) -> UbjResult<rust_decimal::Decimal> {
        use std::str::FromStr;

        use rust_decimal::Decimal;

        let (marker, position) = self.take(&HUGE_MARKERS, "huge")?;
        let mut text = String::new();
        self.read_text_into(marker, &mut text)?;
        match Decimal::from_str(&text).or_else(|_| Decimal::from_scientific(&text)) {
            Ok(value) => Ok(value),
            Err(e) => Err(invalid_number(text, e.to_string(), position)),
        }
    }

    pub fn read_string(&mut self) -> UbjResult<String> {
        let mut text = String::new();
        self.read_string_into(&mut text)?;
        Ok(text)
    }

    /// Дописывает строку в `out`, переиспользуя его память.
    pub fn read_string_into(
        &mut self,
        out: &mut String,
    ) -> UbjResult<()> {
        let (marker, _) = self.take(&STRING_MARKERS, "string")?;
        self.read_text_into(marker, out)
    }

    /// Заголовок массива. Для [`ContainerLength::Unbounded`] читать элементы
    /// до маркера END.
    pub fn read_array_length(&mut self) -> UbjResult<ContainerLength> {
        let (marker, _) = self.take(&ARRAY_MARKERS, "array")?;
        self.read_container_header(marker)
    }

    /// Заголовок объекта: кол-во пар имя/значение.
    pub fn read_object_length(&mut self) -> UbjResult<ContainerLength> {
        let (marker, _) = self.take(&OBJECT_MARKERS, "object")?;
        self.read_container_header(marker)
    }

    /// Закрывает потоковый контейнер.
    pub fn read_end(&mut self) -> UbjResult<()> {
        self.take(&[TypeMarker::End], "end")?;
        Ok(())
    }

    pub fn get_ref(&self) -> &R {
        self.source.get_ref()
    }

    pub fn get_mut(&mut self) -> &mut R {
        self.source.get_mut()
    }

    pub fn into_inner(self) -> R {
        self.source.into_inner()
    }

    ////////////////////////////////////////////////////////////////////////////
    // Разбор маркеров
    ////////////////////////////////////////////////////////////////////////////

    fn read_marker_byte(&mut self) -> UbjResult<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.source.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(UbjError::from_io(&e, "reading marker", self.position(), 1).into())
                }
            }
        }
    }

    /// Читает маркеры, отбрасывая NOOP, до первого значимого или до конца
    /// потока. Состояние курсора не меняет.
    fn scan(&mut self) -> UbjResult<Option<(TypeMarker, u64)>> {
        loop {
            let position = self.position();
            let Some(byte) = self.read_marker_byte()? else {
                trace!("End of stream at byte {}", position);
                return Ok(None);
            };

            match TypeMarker::from_byte(byte) {
                Some(TypeMarker::Noop) => trace!("Skipped NOOP at byte {}", position),
                Some(marker) => {
                    trace!("Scanned {} at byte {}", marker, position);
                    return Ok(Some((marker, position)));
                }
                None => {
                    let err = UbjError::UnknownMarker { byte, position };
                    warn!("{}", err);
                    return Err(err.into());
                }
            }
        }
    }

    /// Берёт маркер текущего значения (сканируя, если курсор пуст) и
    /// проверяет, что он из `accepted`. При успехе курсор пуст.
    fn take(
        &mut self,
        accepted: &[TypeMarker],
        what: &str,
    ) -> UbjResult<(TypeMarker, u64)> {
        let (marker, position) = match self.state {
            CursorState::Peeked { marker, position } => (marker, position),
            CursorState::Empty => match self.scan()? {
                Some(found) => found,
                None => {
                    return Err(UbjError::UnexpectedEof {
                        context: format!("reading {what} marker"),
                        position: self.position(),
                        expected_bytes: 1,
                        got_bytes: 0,
                    }
                    .into())
                }
            },
        };

        if !accepted.contains(&marker) {
            self.state = CursorState::Peeked { marker, position };
            return Err(unexpected(marker, accepted, position));
        }

        self.state = CursorState::Empty;
        Ok((marker, position))
    }

    ////////////////////////////////////////////////////////////////////////////
    // Тела значений
    ////////////////////////////////////////////////////////////////////////////

    fn read_body<T>(
        &mut self,
        marker: TypeMarker,
        size: u64,
        read: impl FnOnce(&mut CountingRead<R>) -> io::Result<T>,
    ) -> UbjResult<T> {
        let start = self.position();
        let result = read(&mut self.source);
        result.map_err(|e| self.body_error(&e, format!("reading {} body", marker.name()), start, size))
    }

    fn read_header(
        &mut self,
        marker: TypeMarker,
    ) -> UbjResult<(LengthHeader, u64)> {
        let start = self.position();
        let compact = marker.is_compact();
        let result = LengthHeader::read(&mut self.source, compact);
        let header = result.map_err(|e| {
            self.body_error(
                &e,
                format!("reading {} length", marker.name()),
                start,
                if compact { 1 } else { 4 },
            )
        })?;
        Ok((header, start))
    }

    /// Длина тела строки/HUGE. Компактный байт 255 здесь обычная длина.
    fn read_text_header(
        &mut self,
        marker: TypeMarker,
    ) -> UbjResult<usize> {
        let (header, start) = self.read_header(marker)?;
        header
            .text_len()
            .map_err(|length| invalid_length(marker, length, start))
    }

    fn read_container_header(
        &mut self,
        marker: TypeMarker,
    ) -> UbjResult<ContainerLength> {
        let (header, start) = self.read_header(marker)?;
        header
            .container_len()
            .map_err(|length| invalid_length(marker, length, start))
    }

    fn read_text_into(
        &mut self,
        marker: TypeMarker,
        out: &mut String,
    ) -> UbjResult<()> {
        let len = self.read_text_header(marker)?;
        let start = self.position();
        let result = self.decoder.decode_into(&mut self.source, len, out);
        result.map_err(|e| {
            let err = e.into_ubj(&format!("reading {} body", marker.name()), start);
            if let UbjError::InvalidUtf8 { .. } = err {
                warn!("{}", err);
            }
            err.into()
        })
    }

    fn body_error(
        &self,
        err: &io::Error,
        context: String,
        start: u64,
        expected: u64,
    ) -> StackError {
        let err = match err.kind() {
            io::ErrorKind::UnexpectedEof => UbjError::UnexpectedEof {
                context,
                position: start,
                expected_bytes: expected,
                got_bytes: self.position() - start,
            },
            _ => UbjError::from_io(err, context, start, expected),
        };
        debug!("{}", err);
        err.into()
    }

    ////////////////////////////////////////////////////////////////////////////
    // Пропуск значений
    ////////////////////////////////////////////////////////////////////////////

    /// Пропускает тело значения с уже прочитанным маркером.
    ///
    /// Вложенные контейнеры обходятся без рекурсии: незакрытые контейнеры
    /// лежат в `frames`, так что глубину ограничивает только `max_depth`, а
    /// не стек потока.
    fn skip_body(
        &mut self,
        marker: TypeMarker,
    ) -> UbjResult<()> {
        let mut frames: Vec<SkipFrame> = Vec::new();
        let mut current = Some(marker);

        loop {
            if let Some(marker) = current.take() {
                match marker.body() {
                    Body::Empty => {}
                    Body::Fixed(size) => self.skip_bytes(size, marker)?,
                    Body::Text { .. } => {
                        let len = self.read_text_header(marker)?;
                        self.skip_bytes(len as u64, marker)?;
                    }
                    Body::Container { object, .. } => {
                        let depth = frames.len();
                        if depth >= self.max_depth {
                            let err = UbjError::DepthLimit {
                                depth: depth + 1,
                                max: self.max_depth,
                                position: self.position(),
                            };
                            warn!("{}", err);
                            return Err(err.into());
                        }

                        let len = self.read_container_header(marker)?;
                        debug!(
                            "Skipping {} ({:?}) at byte {}, depth {}",
                            marker.name(),
                            len,
                            self.position(),
                            depth
                        );
                        frames.push(SkipFrame {
                            parent: marker,
                            object,
                            remaining: match len {
                                ContainerLength::Bounded(count) => Some(count),
                                ContainerLength::Unbounded => None,
                            },
                            value_next: false,
                        });
                    }
                }
            }

            let Some(frame) = frames.last_mut() else {
                return Ok(());
            };
            let parent = frame.parent;

            // после имени в объекте всегда идёт значение
            if frame.value_next {
                frame.value_next = false;
                current = Some(self.scan_child(parent, &TypeMarker::VALUES)?);
                continue;
            }

            let accepted: &[TypeMarker] = if frame.object {
                &STRING_MARKERS
            } else {
                &TypeMarker::VALUES
            };
            let remaining = frame.remaining;
            let child = match remaining {
                Some(0) => {
                    frames.pop();
                    continue;
                }
                Some(count) => {
                    frame.remaining = Some(count - 1);
                    self.scan_child(parent, accepted)?
                }
                None => {
                    let (child, position) = self.scan_any_child(parent)?;
                    if child == TypeMarker::End {
                        frames.pop();
                        continue;
                    }
                    if !accepted.contains(&child) {
                        return Err(unexpected(child, accepted, position));
                    }
                    child
                }
            };
            frame.value_next = frame.object;
            current = Some(child);
        }
    }

    fn scan_any_child(
        &mut self,
        parent: TypeMarker,
    ) -> UbjResult<(TypeMarker, u64)> {
        match self.scan()? {
            Some(found) => Ok(found),
            None => Err(UbjError::UnexpectedEof {
                context: format!("skipping {} element", parent.name()),
                position: self.position(),
                expected_bytes: 1,
                got_bytes: 0,
            }
            .into()),
        }
    }

    fn scan_child(
        &mut self,
        parent: TypeMarker,
        accepted: &[TypeMarker],
    ) -> UbjResult<TypeMarker> {
        let (child, position) = self.scan_any_child(parent)?;
        if !accepted.contains(&child) {
            return Err(unexpected(child, accepted, position));
        }
        Ok(child)
    }

    fn skip_bytes(
        &mut self,
        n: u64,
        marker: TypeMarker,
    ) -> UbjResult<()> {
        if n == 0 {
            return Ok(());
        }
        let start = self.position();
        trace!("Skipping {} body bytes of {} at byte {}", n, marker.name(), start);

        let result = io::copy(&mut (&mut self.source).take(n), &mut io::sink());
        let copied = result
            .map_err(|e| self.body_error(&e, format!("skipping {} body", marker.name()), start, n))?;
        if copied < n {
            let err = UbjError::UnexpectedEof {
                context: format!("skipping {} body", marker.name()),
                position: start,
                expected_bytes: n,
                got_bytes: copied,
            };
            debug!("{}", err);
            return Err(err.into());
        }
        Ok(())
    }
}

fn unexpected(
    found: TypeMarker,
    accepted: &[TypeMarker],
    position: u64,
) -> StackError {
    let err = UbjError::UnexpectedMarker {
        found: found.as_byte(),
        expected: accepted.iter().map(|m| m.as_byte()).collect(),
        position,
    };
    warn!("{}", err);
    err.into()
}

fn invalid_length(
    marker: TypeMarker,
    length: i64,
    position: u64,
) -> StackError {
    let err = UbjError::InvalidLength {
        marker: marker.as_byte(),
        length,
        position,
    };
    warn!("{}", err);
    err.into()
}

fn invalid_number(
    text: String,
    reason: String,
    position: u64,
) -> StackError {
    let err = UbjError::InvalidNumber {
        text,
        reason,
        position,
    };
    warn!("{}", err);
    err.into()
}
