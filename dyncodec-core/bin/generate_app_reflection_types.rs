use std::env;
use std::fs;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Generating application reflection types...");

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let out_dir = manifest_dir.join("src/metadata/generated");

    let proto_file = manifest_dir.join("proto/cosmos/base/reflection/v2alpha1/reflection.proto");
    let proto_folder = manifest_dir.join("proto");

    if !out_dir.exists() {
        fs::create_dir_all(&out_dir)?;
    }

    // The transport is written by hand in `metadata::service`, only the messages are generated.
    tonic_prost_build::configure()
        .build_server(false)
        .build_client(false)
        .out_dir(&out_dir)
        .compile_protos(&[proto_file], &[proto_folder])?;

    println!("Done! Generated files are in src/metadata/generated");

    Ok(())
}
