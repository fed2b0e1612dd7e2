use dyncodec_core::{
    BuildError, BuilderState, CancellationToken, CodecBuilder, RegisteredType, RegistryError,
};
use fixtures::{
    MemorySource, StalledSource, StaticInventory, any_proto, common_proto, file, impl_proto,
    implementer, interface, message, message_field, query_proto, tx_proto,
};
use std::sync::atomic::Ordering;
use std::time::Duration;

mod fixtures;

fn full_source() -> MemorySource {
    MemorySource::new(vec![
        any_proto(),
        common_proto(),
        query_proto(),
        impl_proto(),
        tx_proto(),
    ])
}

#[tokio::test]
async fn test_build_registers_services_messages_and_interfaces() {
    let inventory = StaticInventory::new(
        &["pkg.Q"],
        &["pkg.Msg"],
        vec![interface("pkg.I", vec![implementer("pkg.ImplA", "/pkg.ImplA")])],
    );
    let builder = CodecBuilder::new(inventory, full_source());

    let codec = builder
        .build(&CancellationToken::new())
        .await
        .expect("Build should succeed");

    assert_eq!(builder.state(), BuilderState::Done);

    // Exactly the three files involved, each fetched once.
    assert_eq!(
        builder.source().fetches(),
        vec!["pkg/q.proto", "pkg/common.proto", "pkg/impl.proto"]
    );

    let registry = codec.registry();
    assert_eq!(
        registry.registration_order(),
        ["pkg/common.proto", "pkg/q.proto", "pkg/impl.proto"]
    );
    assert_eq!(
        registry.type_urls().collect::<Vec<_>>(),
        [("/pkg.ImplA", "pkg.ImplA")]
    );

    let service = registry
        .descriptor_pool()
        .get_service_by_name("pkg.Q")
        .expect("Service should be registered");
    let method = service.methods().next().unwrap();
    assert!(registry.find_message(method.input().full_name()).is_ok());

    assert!(matches!(
        registry.find_by_name("pkg.Msg"),
        Ok(RegisteredType::Message(_))
    ));
    assert_eq!(
        registry.find_by_url("/pkg.ImplA").unwrap().full_name(),
        "pkg.ImplA"
    );

    // Queries are answered by the registry alone.
    assert_eq!(builder.source().fetches().len(), 3);
    assert_eq!(builder.provider().calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_build_registers_dependencies_first() {
    let source = MemorySource::new(vec![
        file("pkg/a.proto", "pkg", &["pkg/b.proto"], vec![message("A", vec![])]),
        file("pkg/b.proto", "pkg", &["pkg/c.proto"], vec![message("B", vec![])]),
        file("pkg/c.proto", "pkg", &[], vec![message("C", vec![])]),
    ]);
    let builder = CodecBuilder::new(StaticInventory::new(&[], &["pkg.A"], vec![]), source);

    let codec = builder.build(&CancellationToken::new()).await.unwrap();

    assert_eq!(
        codec.registry().registration_order(),
        ["pkg/c.proto", "pkg/b.proto", "pkg/a.proto"]
    );
}

#[tokio::test]
async fn test_build_skips_files_already_registered() {
    let source = MemorySource::new(vec![
        file(
            "pkg/a.proto",
            "pkg",
            &["pkg/shared.proto"],
            vec![message("A", vec![message_field("s", 1, ".pkg.S")])],
        ),
        file(
            "pkg/b.proto",
            "pkg",
            &["pkg/shared.proto"],
            vec![message("B", vec![message_field("s", 1, ".pkg.S")])],
        ),
        file("pkg/shared.proto", "pkg", &[], vec![message("S", vec![])]),
    ]);
    let builder = CodecBuilder::new(
        StaticInventory::new(&[], &["pkg.A", "pkg.B", "pkg.S", "pkg.A"], vec![]),
        source,
    );

    builder.build(&CancellationToken::new()).await.unwrap();

    assert_eq!(
        builder.source().fetches(),
        vec!["pkg/a.proto", "pkg/shared.proto", "pkg/b.proto"]
    );
}

#[tokio::test]
async fn test_build_accepts_compressed_files() {
    let source = MemorySource::gzipped(vec![common_proto(), query_proto()]);
    let builder = CodecBuilder::new(StaticInventory::new(&["pkg.Q"], &[], vec![]), source);

    let codec = builder.build(&CancellationToken::new()).await.unwrap();

    assert!(codec.registry().contains_file("pkg/q.proto"));
    assert!(codec.registry().contains_file("pkg/common.proto"));
}

#[tokio::test]
async fn test_build_fails_on_cyclic_imports() {
    let source = MemorySource::new(vec![
        file("pkg/a.proto", "pkg", &["pkg/b.proto"], vec![message("A", vec![])]),
        file("pkg/b.proto", "pkg", &["pkg/a.proto"], vec![message("B", vec![])]),
    ]);
    let builder = CodecBuilder::new(StaticInventory::new(&[], &["pkg.A"], vec![]), source);

    let err = builder.build(&CancellationToken::new()).await.unwrap_err();

    assert!(
        matches!(err.root_cause(), BuildError::CyclicImport(path) if path == "pkg/a.proto"),
        "unexpected error: {err}"
    );
    assert!(err.is_integrity_error());
    assert_eq!(builder.state(), BuilderState::Failed);
    // Each file of the cycle is fetched once, then the cycle is detected.
    assert_eq!(builder.source().fetches(), vec!["pkg/a.proto", "pkg/b.proto"]);
}

#[tokio::test]
async fn test_build_fails_on_conflicting_type_urls() {
    let source = MemorySource::new(vec![
        common_proto(),
        impl_proto(),
        file("pkg/other.proto", "pkg", &[], vec![message("ImplB", vec![])]),
    ]);
    let inventory = StaticInventory::new(
        &[],
        &[],
        vec![
            interface("pkg.I", vec![implementer("pkg.ImplA", "/pkg.ImplA")]),
            interface(
                "pkg.J",
                vec![
                    implementer("pkg.ImplA", "/pkg.ImplA"),
                    implementer("pkg.ImplB", "/pkg.ImplA"),
                ],
            ),
        ],
    );
    let builder = CodecBuilder::new(inventory, source);

    let err = builder.build(&CancellationToken::new()).await.unwrap_err();

    assert!(
        matches!(
            err.root_cause(),
            BuildError::Registry(RegistryError::ConflictingUrl { url, existing, attempted })
                if url == "/pkg.ImplA" && existing == "pkg.ImplA" && attempted == "pkg.ImplB"
        ),
        "unexpected error: {err}"
    );
    assert!(err.is_integrity_error());
}

#[tokio::test]
async fn test_build_fails_when_a_dependency_is_missing() {
    let source = MemorySource::new(vec![query_proto()]);
    let builder = CodecBuilder::new(StaticInventory::new(&["pkg.Q"], &[], vec![]), source);

    let err = builder.build(&CancellationToken::new()).await.unwrap_err();

    match err.root_cause() {
        BuildError::FetchFile { path, .. } => assert_eq!(path, "pkg/common.proto"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!err.is_integrity_error());
}

#[tokio::test]
async fn test_build_fails_when_a_symbol_is_unknown() {
    let builder = CodecBuilder::new(
        StaticInventory::new(&["pkg.Missing"], &[], vec![]),
        full_source(),
    );

    let err = builder.build(&CancellationToken::new()).await.unwrap_err();

    assert!(matches!(
        err.root_cause(),
        BuildError::ResolveSymbol { symbol, .. } if symbol == "pkg.Missing"
    ));
}

#[tokio::test]
async fn test_build_runs_only_once() {
    let builder = CodecBuilder::new(StaticInventory::new(&["pkg.Q"], &[], vec![]), full_source());
    let cancel = CancellationToken::new();

    builder.build(&cancel).await.unwrap();
    let second = builder.build(&cancel).await;

    assert!(matches!(second, Err(BuildError::AlreadyBuilt)));
    assert_eq!(builder.state(), BuilderState::Done);
    assert_eq!(builder.source().fetches().len(), 2);
}

#[tokio::test]
async fn test_build_cannot_be_retried_after_failure() {
    let builder = CodecBuilder::new(
        StaticInventory::new(&["pkg.Missing"], &[], vec![]),
        full_source(),
    );
    let cancel = CancellationToken::new();

    assert!(builder.build(&cancel).await.is_err());
    assert!(matches!(
        builder.build(&cancel).await,
        Err(BuildError::AlreadyBuilt)
    ));
}

#[tokio::test]
async fn test_concurrent_builds_have_a_single_winner() {
    let builder = CodecBuilder::new(StaticInventory::new(&["pkg.Q"], &[], vec![]), full_source());
    let cancel = CancellationToken::new();

    let (first, second) = tokio::join!(builder.build(&cancel), builder.build(&cancel));

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(BuildError::AlreadyBuilt)))
            .count(),
        1
    );
    assert_eq!(builder.source().fetches().len(), 2);
}

#[tokio::test]
async fn test_build_is_cancellable() {
    let builder = CodecBuilder::new(StaticInventory::new(&["pkg.Q"], &[], vec![]), StalledSource);
    let cancel = CancellationToken::new();

    let (result, _) = tokio::join!(builder.build(&cancel), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
    });

    assert!(matches!(result, Err(BuildError::Cancelled)));
    assert_eq!(builder.state(), BuilderState::Failed);
}

#[tokio::test]
async fn test_build_with_cancelled_token_does_not_fetch() {
    let builder = CodecBuilder::new(StaticInventory::new(&["pkg.Q"], &[], vec![]), full_source());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = builder.build(&cancel).await;

    assert!(matches!(result, Err(BuildError::Cancelled)));
    assert!(builder.source().fetches().is_empty());
}
