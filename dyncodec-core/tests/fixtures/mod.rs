#![allow(dead_code)]

use dyncodec_core::{InterfaceDescriptor, InterfaceImplementer, InventoryProvider, SchemaSource};
use prost::Message;
use prost_types::{
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
    MessageOptions, MethodDescriptorProto, ServiceDescriptorProto,
    field_descriptor_proto::{Label, Type},
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn scalar(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    field(name, number, ty, None, Label::Optional)
}

pub fn message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    field(name, number, Type::Message, Some(type_name), Label::Optional)
}

pub fn repeated_message(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    field(name, number, Type::Message, Some(type_name), Label::Repeated)
}

fn field(
    name: &str,
    number: i32,
    ty: Type,
    type_name: Option<&str>,
    label: Label,
) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        r#type: Some(ty as i32),
        type_name: type_name.map(str::to_string),
        label: Some(label as i32),
        json_name: Some(json_name(name)),
        ..Default::default()
    }
}

fn json_name(name: &str) -> String {
    let mut out = String::new();
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

pub fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

/// A message with a `map<key, value>` field at `number`.
pub fn with_map(
    mut parent: DescriptorProto,
    package: &str,
    field_name: &str,
    number: i32,
    key: Type,
    value: Type,
) -> DescriptorProto {
    let entry_name = format!("{}Entry", capitalize(&json_name(field_name)));
    let type_name = format!(".{package}.{}.{entry_name}", parent.name());

    parent.nested_type.push(DescriptorProto {
        name: Some(entry_name),
        field: vec![scalar("key", 1, key), scalar("value", 2, value)],
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    });
    parent.field.push(field(
        field_name,
        number,
        Type::Message,
        Some(&type_name),
        Label::Repeated,
    ));
    parent
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn file(
    path: &str,
    package: &str,
    dependencies: &[&str],
    messages: Vec<DescriptorProto>,
) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(path.to_string()),
        package: Some(package.to_string()),
        dependency: dependencies.iter().map(|d| d.to_string()).collect(),
        message_type: messages,
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

pub fn with_service(
    mut fd: FileDescriptorProto,
    name: &str,
    method: &str,
    input: &str,
    output: &str,
) -> FileDescriptorProto {
    fd.service.push(ServiceDescriptorProto {
        name: Some(name.to_string()),
        method: vec![MethodDescriptorProto {
            name: Some(method.to_string()),
            input_type: Some(input.to_string()),
            output_type: Some(output.to_string()),
            ..Default::default()
        }],
        ..Default::default()
    });
    fd
}

pub fn any_proto() -> FileDescriptorProto {
    file(
        "google/protobuf/any.proto",
        "google.protobuf",
        &[],
        vec![message(
            "Any",
            vec![
                scalar("type_url", 1, Type::String),
                scalar("value", 2, Type::Bytes),
            ],
        )],
    )
}

pub fn common_proto() -> FileDescriptorProto {
    file(
        "pkg/common.proto",
        "pkg",
        &[],
        vec![message(
            "Coin",
            vec![
                scalar("denom", 1, Type::String),
                scalar("amount", 2, Type::String),
            ],
        )],
    )
}

/// `pkg.Q` and `pkg.Msg`, importing `pkg/common.proto`.
pub fn query_proto() -> FileDescriptorProto {
    let fd = file(
        "pkg/q.proto",
        "pkg",
        &["pkg/common.proto"],
        vec![
            message(
                "QueryBalanceRequest",
                vec![scalar("address", 1, Type::String)],
            ),
            message(
                "QueryBalanceResponse",
                vec![message_field("balance", 1, ".pkg.Coin")],
            ),
            message(
                "Msg",
                vec![
                    scalar("sender", 1, Type::String),
                    repeated_message("amount", 2, ".pkg.Coin"),
                ],
            ),
        ],
    );

    with_service(
        fd,
        "Q",
        "Balance",
        ".pkg.QueryBalanceRequest",
        ".pkg.QueryBalanceResponse",
    )
}

/// `pkg.ImplA`, importing `pkg/common.proto`.
pub fn impl_proto() -> FileDescriptorProto {
    let impl_a = message(
        "ImplA",
        vec![
            scalar("name", 1, Type::String),
            message_field("coin", 2, ".pkg.Coin"),
        ],
    );

    file(
        "pkg/impl.proto",
        "pkg",
        &["pkg/common.proto"],
        vec![with_map(impl_a, "pkg", "weights", 3, Type::String, Type::Int64)],
    )
}

/// `pkg.Tx`, carrying polymorphic payloads in `google.protobuf.Any`.
pub fn tx_proto() -> FileDescriptorProto {
    let tx = message(
        "Tx",
        vec![
            scalar("memo", 1, Type::String),
            repeated_message("msgs", 2, ".google.protobuf.Any"),
        ],
    );

    file(
        "pkg/tx.proto",
        "pkg",
        &["google/protobuf/any.proto", "pkg/common.proto"],
        vec![with_map(tx, "pkg", "labels", 3, Type::String, Type::String)],
    )
}

pub fn descriptor_set(files: Vec<FileDescriptorProto>) -> FileDescriptorSet {
    FileDescriptorSet { file: files }
}

pub fn implementer(full_name: &str, type_url: &str) -> InterfaceImplementer {
    InterfaceImplementer {
        full_name: full_name.to_string(),
        type_url: type_url.to_string(),
    }
}

pub fn interface(name: &str, implementers: Vec<InterfaceImplementer>) -> InterfaceDescriptor {
    InterfaceDescriptor {
        name: name.to_string(),
        implementers,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("Unknown symbol '{0}'")]
    UnknownSymbol(String),
    #[error("Unknown file '{0}'")]
    UnknownFile(String),
}

/// An in-memory schema source that records every file fetch.
#[derive(Default)]
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
    symbols: HashMap<String, String>,
    fetches: Mutex<Vec<String>>,
    resolutions: AtomicUsize,
}

impl MemorySource {
    pub fn new(files: Vec<FileDescriptorProto>) -> Self {
        let mut source = Self::default();
        for fd in files {
            source.add(fd.name().to_string(), fd.encode_to_vec(), &fd);
        }
        source
    }

    /// Serves every file gzip-compressed, as some reflection servers do.
    pub fn gzipped(files: Vec<FileDescriptorProto>) -> Self {
        use flate2::{Compression, write::GzEncoder};
        use std::io::Write;

        let mut source = Self::default();
        for fd in files {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&fd.encode_to_vec()).unwrap();
            source.add(fd.name().to_string(), encoder.finish().unwrap(), &fd);
        }
        source
    }

    fn add(&mut self, path: String, raw: Vec<u8>, fd: &FileDescriptorProto) {
        for symbol in dyncodec_core::proto::all_symbols_of(fd) {
            self.symbols.insert(symbol, path.clone());
        }
        self.files.insert(path, raw);
    }

    /// Paths fetched so far, in order.
    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn resolutions(&self) -> usize {
        self.resolutions.load(Ordering::SeqCst)
    }
}

impl SchemaSource for MemorySource {
    type Error = MemoryError;

    async fn file_path_for_symbol(&self, symbol: &str) -> Result<String, Self::Error> {
        self.resolutions.fetch_add(1, Ordering::SeqCst);
        self.symbols
            .get(symbol)
            .cloned()
            .ok_or_else(|| MemoryError::UnknownSymbol(symbol.to_string()))
    }

    async fn file_descriptor_bytes(&self, path: &str) -> Result<Vec<u8>, Self::Error> {
        self.fetches.lock().unwrap().push(path.to_string());
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| MemoryError::UnknownFile(path.to_string()))
    }
}

/// A schema source whose file fetches never complete.
pub struct StalledSource;

impl SchemaSource for StalledSource {
    type Error = MemoryError;

    async fn file_path_for_symbol(&self, symbol: &str) -> Result<String, Self::Error> {
        Ok(format!("{symbol}.proto"))
    }

    async fn file_descriptor_bytes(&self, _path: &str) -> Result<Vec<u8>, Self::Error> {
        std::future::pending().await
    }
}

/// A fixed inventory that counts how many times it was asked for each list.
#[derive(Default)]
pub struct StaticInventory {
    pub services: Vec<String>,
    pub messages: Vec<String>,
    pub interfaces: Vec<InterfaceDescriptor>,
    pub calls: AtomicUsize,
}

impl StaticInventory {
    pub fn new(services: &[&str], messages: &[&str], interfaces: Vec<InterfaceDescriptor>) -> Self {
        Self {
            services: services.iter().map(|s| s.to_string()).collect(),
            messages: messages.iter().map(|s| s.to_string()).collect(),
            interfaces,
            calls: AtomicUsize::new(0),
        }
    }
}

impl InventoryProvider for StaticInventory {
    type Error = MemoryError;

    async fn services(&self) -> Result<Vec<String>, Self::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.services.clone())
    }

    async fn messages(&self) -> Result<Vec<String>, Self::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.messages.clone())
    }

    async fn interfaces(&self) -> Result<Vec<InterfaceDescriptor>, Self::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.interfaces.clone())
    }
}
