//! Поведение читателя на потоке: заглядывание, потоковые контейнеры,
//! обрывы, файловый ввод-вывод.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Cursor, Read},
};

use ubjson::{
    ContainerLength, ErrorKind, StatusCode, TypeMarker, UbjError, UbjReader, UbjWriter,
};

use generators::*;

#[test]
fn object_example() {
    let mut w = UbjWriter::new(Vec::new());
    w.write_object_header(1usize).unwrap();
    w.write_string("k").unwrap();
    w.write_int32(42).unwrap();
    let bytes = w.finish().unwrap();
    assert_eq!(bytes, vec![b'o', 1, b's', 1, b'k', b'I', 0, 0, 0, 42]);

    let mut r = UbjReader::new(Cursor::new(bytes));
    assert_eq!(r.read_object_length().unwrap(), ContainerLength::Bounded(1));
    assert_eq!(r.read_string().unwrap(), "k");
    assert_eq!(r.next_type().unwrap(), Some(TypeMarker::Int32));
    assert_eq!(r.read_int32().unwrap(), 42);
}

/// Потоковый массив: заголовок, N значений, END; читаем через `next_type`
/// до END и получаем ровно эти значения.
#[test]
fn streaming_array_yields_values_in_order() {
    let values = [3i64, -1, i64::MAX, 0, 17];
    let mut w = UbjWriter::new(Vec::new());
    w.write_array_header(ContainerLength::Unbounded).unwrap();
    for v in values {
        w.write_int64(v).unwrap();
    }
    w.write_end().unwrap();
    w.write_boolean(true).unwrap();
    let bytes = w.into_inner();

    let mut r = UbjReader::new(bytes.as_slice());
    assert_eq!(r.read_array_length().unwrap(), ContainerLength::Unbounded);
    let mut got = Vec::new();
    while r.next_type().unwrap() != Some(TypeMarker::End) {
        got.push(r.read_int64().unwrap());
    }
    r.read_end().unwrap();
    assert_eq!(got, values);
    assert!(r.read_boolean().unwrap());
}

#[test]
fn streaming_object_with_nested_streams() {
    let node = Node::Object {
        entries: vec![
            (
                "rows".to_string(),
                Node::Array {
                    items: vec![
                        Node::Array {
                            items: vec![Node::Int16(1), Node::Str("one".into())],
                            streaming: true,
                        },
                        Node::Array {
                            items: vec![],
                            streaming: true,
                        },
                    ],
                    streaming: true,
                },
            ),
            ("total".to_string(), Node::Huge("99999999999999999999".into())),
        ],
        streaming: true,
    };
    let bytes = encode(&node, true);
    assert_eq!(decode(&bytes).unwrap(), node);
}

/// Заглядываем в INT32, не читаем его, заглядываем снова: тело INT32
/// пропущено, следующий маркер строковый.
#[test]
fn peek_twice_skips_unread_value() {
    let mut w = UbjWriter::new(Vec::new());
    w.write_int32(5).unwrap();
    w.write_string("x").unwrap();
    let bytes = w.into_inner();

    let mut r = UbjReader::new(bytes.as_slice());
    assert_eq!(r.next_type().unwrap(), Some(TypeMarker::Int32));
    assert_eq!(r.next_type().unwrap(), Some(TypeMarker::StringCompact));
    assert_eq!(r.read_string().unwrap(), "x");
}

/// Каждый строгий префикс потока любого вида значения даёт ошибку обрыва,
/// а не неверное значение.
#[test]
fn truncation_of_every_kind() {
    let nodes = vec![
        Node::Byte(1),
        Node::Int16(2),
        Node::Int32(3),
        Node::Int64(4),
        Node::Float(5.0),
        Node::Double(6.0),
        Node::Huge("12345".into()),
        Node::Str("héllo".into()),
        Node::Str("x".repeat(300)),
        Node::Array {
            items: vec![Node::Int32(1), Node::Int32(2)],
            streaming: false,
        },
        Node::Object {
            entries: vec![("a".into(), Node::Null)],
            streaming: true,
        },
    ];

    for node in nodes {
        let bytes = encode(&node, false);
        for cut in 1..bytes.len() {
            let err = decode(&bytes[..cut]).unwrap_err();
            assert!(
                err.is_truncated(),
                "{node:?} cut at {cut}: expected truncation, got {err}"
            );
            assert_eq!(err.kind(), ErrorKind::Io);
        }
    }
}

#[test]
fn empty_stream_is_clean_eof() {
    let mut r = UbjReader::new(&[0u8; 0][..]);
    assert_eq!(r.next_type().unwrap(), None);
    assert_eq!(r.skip_value().unwrap(), None);

    let mut r = UbjReader::new(&[b'N', b'N', b'N'][..]);
    assert_eq!(r.next_type().unwrap(), None);
    assert_eq!(r.position(), 3);
}

/// Несовпадение маркера даёт ошибку формата с найденным, ожидаемыми
/// маркерами и позицией.
#[test]
fn format_violation_details() {
    let mut w = UbjWriter::new(Vec::new());
    w.write_null().unwrap();
    w.write_double(1.0).unwrap();
    let bytes = w.into_inner();

    let mut r = UbjReader::new(bytes.as_slice());
    r.read_null().unwrap();
    let err = r.read_boolean().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
    assert_eq!(err.status_code(), StatusCode::UnexpectedMarker);
    assert_eq!(err.position(), Some(1));
    let msg = err.to_string();
    assert!(msg.contains("'D'"), "{msg}");
    assert!(msg.contains("'T' (0x54) or 'F' (0x46)"), "{msg}");

    assert!(matches!(
        err.downcast_ref::<UbjError>(),
        Some(UbjError::UnexpectedMarker { found: b'D', .. })
    ));
}

/// Источник, который ломается после `limit` байт.
struct BrokenSource {
    data: Vec<u8>,
    pos: usize,
    limit: usize,
}

impl Read for BrokenSource {
    fn read(
        &mut self,
        buf: &mut [u8],
    ) -> std::io::Result<usize> {
        if self.pos >= self.limit {
            return Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "peer went away",
            ));
        }
        let end = self.limit.min(self.data.len()).min(self.pos + buf.len());
        let n = end - self.pos;
        buf[..n].copy_from_slice(&self.data[self.pos..end]);
        self.pos = end;
        Ok(n)
    }
}

#[test]
fn source_failure_is_io_error_not_truncation() {
    let mut w = UbjWriter::new(Vec::new());
    w.write_string("abcdef").unwrap();
    let data = w.into_inner();

    let mut r = UbjReader::new(BrokenSource {
        data,
        pos: 0,
        limit: 4,
    });
    let err = r.read_string().unwrap_err();
    assert_eq!(err.status_code(), StatusCode::Io);
    assert!(!err.is_truncated());
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn file_roundtrip() {
    let node = Node::Object {
        entries: vec![
            ("name".into(), Node::Str("ubjson ✓".into())),
            ("pi".into(), Node::Double(std::f64::consts::PI)),
            (
                "tags".into(),
                Node::Array {
                    items: vec![Node::Str("a".into()), Node::Null, Node::Bool(false)],
                    streaming: false,
                },
            ),
        ],
        streaming: false,
    };

    let file = tempfile::NamedTempFile::new().unwrap();
    {
        let mut w = UbjWriter::new(BufWriter::new(File::create(file.path()).unwrap()));
        write_node(&mut w, &node, false).unwrap();
        w.write_int64(7).unwrap();
        let written = w.bytes_written();
        let sink = w.finish().unwrap();
        assert_eq!(sink.get_ref().metadata().unwrap().len(), written);
    }

    let mut r = UbjReader::new(BufReader::new(File::open(file.path()).unwrap()));
    assert_eq!(read_node(&mut r).unwrap(), node);
    assert_eq!(r.read_int64().unwrap(), 7);
    assert_eq!(r.next_type().unwrap(), None);
}

/// Включённый подписчик tracing не меняет поведение кодека.
#[test]
fn works_under_tracing_subscriber() {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let node = Node::Array {
            items: vec![Node::Str("é".repeat(10)), Node::Int32(1)],
            streaming: true,
        };
        let bytes = encode(&node, true);
        let mut r = UbjReader::new(bytes.as_slice());
        assert!(r.skip_value().unwrap().is_some());

        let mut r = UbjReader::new(&[0x00u8][..]);
        assert!(r.next_type().is_err());
    });
}
