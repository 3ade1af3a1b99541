//! Build script for proto compilation.
//!
//! Compiles `proto/provider.proto` into the gRPC server stubs included by
//! `src/lib.rs` through `tonic::include_proto!`.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/provider.proto");

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(false)
        .compile_protos(&["proto/provider.proto"], &["proto"])?;

    Ok(())
}
