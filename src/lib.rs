/// Reader/writer configuration.
pub mod config;
/// Wire codec: marker table, length headers, text codec, reader and writer.
pub mod stream;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Constructor options.
pub use config::CodecConfig;
/// Reader, writer and the wire-level types they exchange.
pub use stream::{ContainerLength, TypeMarker, UbjReader, UbjWriter};
/// Error types and result alias.
pub use ubjson_error::{ErrorKind, StackError, StatusCode, UbjError, UbjResult};
