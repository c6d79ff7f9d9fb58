use serde::{Deserialize, Serialize};
use ubjson_error::{ensure, UbjError, UbjResult};

use crate::stream::charset::{DEFAULT_BUFFER_SIZE, MIN_BUFFER_SIZE};

/// Глубина вложенности по умолчанию при пропуске контейнеров.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Настройки читателя и писателя.
///
/// Может приходить из файла настроек приложения: отсутствующие поля
/// получают значения по умолчанию.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Размер буфера текстового кодировщика/декодировщика, в байтах
    pub buffer_size: usize,
    /// Максимальная вложенность контейнеров при пропуске значений
    pub max_depth: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl CodecConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer_size(
        mut self,
        buffer_size: usize,
    ) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_max_depth(
        mut self,
        max_depth: usize,
    ) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Проверяет настройки до того, как они попадут в читатель или писатель.
    pub fn validate(&self) -> UbjResult<()> {
        ensure!(
            self.buffer_size >= MIN_BUFFER_SIZE,
            UbjError::invalid_argument(
                "buffer_size",
                format!("{} is smaller than {MIN_BUFFER_SIZE}", self.buffer_size),
            )
        );
        ensure!(
            self.max_depth > 0,
            UbjError::invalid_argument("max_depth", "must be at least 1")
        );
        Ok(())
    }
}
