use std::io::{self, Read, Write};

/// Обёртка над источником, считающая прочитанные байты.
///
/// Счётчик служит позицией для сообщений об ошибках читателя.
#[derive(Debug)]
pub struct CountingRead<R: Read> {
    inner: R,
    bytes_read: u64,
}

/// Обёртка над приёмником, считающая записанные байты.
#[derive(Debug)]
pub struct CountingWrite<W: Write> {
    inner: W,
    bytes_written: u64,
}

impl<R: Read> CountingRead<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            bytes_read: 0,
        }
    }

    /// Возвращает текущее кол-во прочитанных байт.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Прямое чтение из `inner` мимо обёртки сбивает счётчик.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<W: Write> CountingWrite<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            bytes_written: 0,
        }
    }

    /// Возвращает текущее кол-во записанных байт.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<R: Read> Read for CountingRead<R> {
    fn read(
        &mut self,
        buf: &mut [u8],
    ) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.bytes_read += n as u64;
        Ok(n)
    }
}

impl<W: Write> Write for CountingWrite<W> {
    fn write(
        &mut self,
        buf: &[u8],
    ) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.bytes_written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
