//! # Protocol Helpers
//!
//! Stateless utilities shared by the reflection client and the codec builder to turn the raw
//! bytes returned by a reflection server into something the registry can work with.
//!
//! Decoding is the only place where third-party parsing code runs on untrusted input, so every
//! entry point here catches panics and converts them into a [`ProtoError`]. A single malformed
//! descriptor must fail the current resolution, never the whole process.
use flate2::read::GzDecoder;
use prost::Message;
use prost_reflect::{DescriptorError, DescriptorPool};
use prost_types::FileDescriptorProto;
use std::any::Any;
use std::borrow::Cow;
use std::io::Read;
use std::panic::{AssertUnwindSafe, catch_unwind};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    #[error("Failed to inflate compressed file descriptor: '{0}'")]
    Decompress(#[source] std::io::Error),

    #[error("Failed to decode FileDescriptorProto: '{0}'")]
    Decode(#[from] prost::DecodeError),

    #[error("File descriptor has no name")]
    MissingName,

    #[error("Failed to build descriptor for file '{path}': '{source}'")]
    Descriptor {
        path: String,
        #[source]
        source: Box<DescriptorError>,
    },

    #[error("Descriptor parser panicked while processing '{context}': {message}")]
    Panicked { context: String, message: String },
}

/// Inflates gzip-compressed descriptor bytes.
///
/// Input without a gzip header is returned untouched.
pub fn decompress(raw: &[u8]) -> Result<Cow<'_, [u8]>, ProtoError> {
    if !raw.starts_with(&GZIP_MAGIC) {
        return Ok(Cow::Borrowed(raw));
    }

    let mut inflated = Vec::with_capacity(raw.len() * 2);
    GzDecoder::new(raw)
        .read_to_end(&mut inflated)
        .map_err(ProtoError::Decompress)?;

    Ok(Cow::Owned(inflated))
}

/// Decodes raw bytes into a [`FileDescriptorProto`].
pub fn decode_file(raw: &[u8]) -> Result<FileDescriptorProto, ProtoError> {
    catch_unwind(|| FileDescriptorProto::decode(raw))
        .map_err(|payload| ProtoError::Panicked {
            context: "FileDescriptorProto bytes".to_string(),
            message: panic_message(payload),
        })?
        .map_err(ProtoError::Decode)
}

/// Returns the path the file declares for itself.
pub fn file_path(fd: &FileDescriptorProto) -> Result<&str, ProtoError> {
    fd.name
        .as_deref()
        .filter(|name| !name.is_empty())
        .ok_or(ProtoError::MissingName)
}

/// Direct imports of the file, in declaration order. No recursion.
pub fn dependencies_of(fd: &FileDescriptorProto) -> Vec<String> {
    fd.dependency.clone()
}

/// Fully qualified names of every top-level symbol declared by the file.
///
/// The order is fixed: messages, enums, services and then extension fields, each group in
/// declaration order.
pub fn all_symbols_of(fd: &FileDescriptorProto) -> Vec<String> {
    let package = fd.package();

    let messages = fd.message_type.iter().map(|m| m.name());
    let enums = fd.enum_type.iter().map(|e| e.name());
    let services = fd.service.iter().map(|s| s.name());
    let extensions = fd.extension.iter().map(|x| x.name());

    messages
        .chain(enums)
        .chain(services)
        .chain(extensions)
        .map(|name| qualify(package, name))
        .collect()
}

/// Decompresses and decodes a blob, returning the file path together with its symbols.
pub fn symbols_from_bytes(raw: &[u8]) -> Result<(String, Vec<String>), ProtoError> {
    let raw = decompress(raw)?;
    let fd = decode_file(&raw)?;
    let path = file_path(&fd)?.to_string();

    Ok((path, all_symbols_of(&fd)))
}

/// Adds a file to the pool. All of its dependencies must already be present.
pub fn add_to_pool(pool: &mut DescriptorPool, fd: FileDescriptorProto) -> Result<(), ProtoError> {
    let path = file_path(&fd)?.to_string();

    catch_unwind(AssertUnwindSafe(|| pool.add_file_descriptor_proto(fd)))
        .map_err(|payload| ProtoError::Panicked {
            context: path.clone(),
            message: panic_message(payload),
        })?
        .map_err(|source| ProtoError::Descriptor {
            path,
            source: Box::new(source),
        })
}

fn qualify(package: &str, name: &str) -> String {
    if package.is_empty() {
        name.to_string()
    } else {
        format!("{package}.{name}")
    }
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
