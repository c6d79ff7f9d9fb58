use std::io::{self, Write};

use byteorder::{BigEndian, WriteBytesExt};
use tracing::debug;
use ubjson_error::{ResultExt, UbjError, UbjResult};

use super::{
    charset::{utf8_len, StreamEncoder},
    counting::CountingWrite,
    length::{ContainerLength, LengthHeader},
    markers::TypeMarker,
};
use crate::config::CodecConfig;

/// Писатель значений UBJSON поверх произвольного `Write`.
///
/// Каждый `write_*` выдаёт ровно маркер и тело одного значения. Писатель не
/// следит за вложенностью: после ограниченного заголовка вызывающий код
/// пишет ровно `count` дочерних значений, после потокового сколько угодно
/// и затем [`write_end`](Self::write_end).
#[derive(Debug)]
pub struct UbjWriter<W: Write> {
    sink: CountingWrite<W>,
    encoder: StreamEncoder,
}

impl<W: Write> UbjWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink: CountingWrite::new(sink),
            encoder: StreamEncoder::new(),
        }
    }

    pub fn with_config(
        sink: W,
        config: &CodecConfig,
    ) -> UbjResult<Self> {
        config.validate().context("configuring UBJSON writer")?;
        debug!("UBJSON writer created with {} byte text buffer", config.buffer_size);
        Ok(Self {
            sink: CountingWrite::new(sink),
            encoder: StreamEncoder::with_capacity(config.buffer_size)?,
        })
    }

    pub fn write_null(&mut self) -> UbjResult<()> {
        self.write_marker(TypeMarker::Null)
    }

    pub fn write_boolean(
        &mut self,
        value: bool,
    ) -> UbjResult<()> {
        self.write_marker(if value {
            TypeMarker::True
        } else {
            TypeMarker::False
        })
    }

    pub fn write_byte(
        &mut self,
        value: i8,
    ) -> UbjResult<()> {
        self.write_marker(TypeMarker::Byte)?;
        let at = self.bytes_written();
        self.sink
            .write_i8(value)
            .map_err(|e| sink_error(&e, "writing byte body", at, 1))
    }

    pub fn write_int16(
        &mut self,
        value: i16,
    ) -> UbjResult<()> {
        self.write_marker(TypeMarker::Int16)?;
        let at = self.bytes_written();
        self.sink
            .write_i16::<BigEndian>(value)
            .map_err(|e| sink_error(&e, "writing int16 body", at, 2))
    }

    pub fn write_int32(
        &mut self,
        value: i32,
    ) -> UbjResult<()> {
        self.write_marker(TypeMarker::Int32)?;
        let at = self.bytes_written();
        self.sink
            .write_i32::<BigEndian>(value)
            .map_err(|e| sink_error(&e, "writing int32 body", at, 4))
    }

    pub fn write_int64(
        &mut self,
        value: i64,
    ) -> UbjResult<()> {
        self.write_marker(TypeMarker::Int64)?;
        let at = self.bytes_written();
        self.sink
            .write_i64::<BigEndian>(value)
            .map_err(|e| sink_error(&e, "writing int64 body", at, 8))
    }

    /// Пишет битовый образ как есть, NaN-нагрузка сохраняется.
    pub fn write_float(
        &mut self,
        value: f32,
    ) -> UbjResult<()> {
        self.write_marker(TypeMarker::Float)?;
        let at = self.bytes_written();
        self.sink
            .write_u32::<BigEndian>(value.to_bits())
            .map_err(|e| sink_error(&e, "writing float body", at, 4))
    }

    pub fn write_double(
        &mut self,
        value: f64,
    ) -> UbjResult<()> {
        self.write_marker(TypeMarker::Double)?;
        let at = self.bytes_written();
        self.sink
            .write_u64::<BigEndian>(value.to_bits())
            .map_err(|e| sink_error(&e, "writing double body", at, 8))
    }

    /// Пишет число произвольной точности в виде десятичного текста.
    ///
    /// Текст не проверяется: разбор числа остаётся читающей стороне.
    pub fn write_huge(
        &mut self,
        text: &str,
    ) -> UbjResult<()> {
        self.write_text(TypeMarker::HugeCompact, TypeMarker::Huge, text)
    }

    pub fn write_huge_chars(
        &mut self,
        chars: &[char],
    ) -> UbjResult<()> {
        self.write_chars(TypeMarker::HugeCompact, TypeMarker::Huge, chars)
    }

    pub fn write_string(
        &mut self,
        text: &str,
    ) -> UbjResult<()> {
        self.write_text(TypeMarker::StringCompact, TypeMarker::String, text)
    }

    /// Пишет строку, заданную символами. Длина в заголовке считается в байтах UTF-8.
    pub fn write_string_chars(
        &mut self,
        chars: &[char],
    ) -> UbjResult<()> {
        self.write_chars(TypeMarker::StringCompact, TypeMarker::String, chars)
    }

    /// Заголовок массива. [`ContainerLength::Unbounded`] начинает потоковый
    /// массив, который закрывается [`write_end`](Self::write_end).
    pub fn write_array_header(
        &mut self,
        len: impl Into<ContainerLength>,
    ) -> UbjResult<()> {
        self.write_container_header(TypeMarker::ArrayCompact, TypeMarker::Array, len.into())
    }

    /// Заголовок объекта; далее идут пары (строка-имя, значение).
    pub fn write_object_header(
        &mut self,
        len: impl Into<ContainerLength>,
    ) -> UbjResult<()> {
        self.write_container_header(TypeMarker::ObjectCompact, TypeMarker::Object, len.into())
    }

    pub fn write_end(&mut self) -> UbjResult<()> {
        self.write_marker(TypeMarker::End)
    }

    pub fn write_noop(&mut self) -> UbjResult<()> {
        self.write_marker(TypeMarker::Noop)
    }

    pub fn flush(&mut self) -> UbjResult<()> {
        let at = self.bytes_written();
        self.sink
            .flush()
            .map_err(|e| sink_error(&e, "flushing sink", at, 0))
    }

    /// Сбрасывает приёмник и возвращает его.
    pub fn finish(mut self) -> UbjResult<W> {
        self.flush()?;
        Ok(self.sink.into_inner())
    }

    /// Кол-во байт, принятых приёмником.
    pub fn bytes_written(&self) -> u64 {
        self.sink.bytes_written()
    }

    pub fn get_ref(&self) -> &W {
        self.sink.get_ref()
    }

    pub fn get_mut(&mut self) -> &mut W {
        self.sink.get_mut()
    }

    pub fn into_inner(self) -> W {
        self.sink.into_inner()
    }

    fn write_marker(
        &mut self,
        marker: TypeMarker,
    ) -> UbjResult<()> {
        let at = self.bytes_written();
        self.sink
            .write_u8(marker.as_byte())
            .map_err(|e| sink_error(&e, &format!("writing {} marker", marker.name()), at, 1))
    }

    fn write_header(
        &mut self,
        compact: TypeMarker,
        full: TypeMarker,
        header: LengthHeader,
    ) -> UbjResult<()> {
        self.write_marker(if header.is_compact() { compact } else { full })?;
        let at = self.bytes_written();
        header.write(&mut self.sink).map_err(|e| {
            sink_error(
                &e,
                &format!("writing {} length", compact.name()),
                at,
                header.encoded_len(),
            )
        })
    }

    fn write_text(
        &mut self,
        compact: TypeMarker,
        full: TypeMarker,
        text: &str,
    ) -> UbjResult<()> {
        let header = LengthHeader::for_len(text.len(), compact.name())?;
        self.write_header(compact, full, header)?;
        let at = self.bytes_written();
        self.encoder
            .encode_str(text, &mut self.sink)
            .map_err(|e| sink_error(&e, &format!("writing {} body", compact.name()), at, text.len() as u64))?;
        Ok(())
    }

    fn write_chars(
        &mut self,
        compact: TypeMarker,
        full: TypeMarker,
        chars: &[char],
    ) -> UbjResult<()> {
        let byte_len = utf8_len(chars);
        let header = LengthHeader::for_len(byte_len, compact.name())?;
        self.write_header(compact, full, header)?;
        let at = self.bytes_written();
        self.encoder
            .encode_chars(chars.iter().copied(), &mut self.sink)
            .map_err(|e| sink_error(&e, &format!("writing {} body", compact.name()), at, byte_len as u64))?;
        Ok(())
    }

    fn write_container_header(
        &mut self,
        compact: TypeMarker,
        full: TypeMarker,
        len: ContainerLength,
    ) -> UbjResult<()> {
        let header = LengthHeader::for_container(len, compact.name())?;
        self.write_header(compact, full, header)
    }
}

fn sink_error(
    err: &io::Error,
    context: &str,
    position: u64,
    expected_bytes: u64,
) -> ubjson_error::StackError {
    UbjError::from_io(err, context, position, expected_bytes).into()
}
