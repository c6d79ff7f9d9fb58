//! Потоковый кодек UBJSON.
//!
//! ## Формат
//!
//! Каждое значение состоит из однобайтового маркера и тела (big-endian, без
//! выравнивания и внешнего кадрирования). Строки, HUGE-значения и
//! контейнеры несут заголовок длины в компактной (1 байт) или полной
//! (4 байта) форме, см. [`length`].
//!
//! ## Пример
//!
//! ```
//! use ubjson::{ContainerLength, TypeMarker, UbjReader, UbjWriter};
//!
//! let mut writer = UbjWriter::new(Vec::new());
//! writer.write_object_header(1usize)?;
//! writer.write_string("k")?;
//! writer.write_int32(42)?;
//! let bytes = writer.finish()?;
//!
//! let mut reader = UbjReader::new(bytes.as_slice());
//! assert_eq!(reader.read_object_length()?, ContainerLength::Bounded(1));
//! assert_eq!(reader.read_string()?, "k");
//! assert_eq!(reader.next_type()?, Some(TypeMarker::Int32));
//! assert_eq!(reader.read_int32()?, 42);
//! assert_eq!(reader.next_type()?, None);
//! # Ok::<(), ubjson::StackError>(())
//! ```

pub mod charset;
pub mod counting;
pub mod length;
pub mod markers;
pub mod reader;
pub mod writer;

pub use charset::{StreamDecoder, StreamEncoder, TextError, Utf8Transcoder};
pub use counting::{CountingRead, CountingWrite};
pub use length::{ContainerLength, LengthHeader};
pub use markers::{Body, TypeMarker};
pub use reader::UbjReader;
pub use writer::UbjWriter;
