fn main() -> Result<(), Box<dyn std::error::Error>> {
    let protoc = protoc_bin_vendored::protoc_bin_path()?;
    unsafe {
        std::env::set_var("PROTOC", protoc);
    }
    let include_path = protoc_bin_vendored::include_path()?;
    let protos = [
        "../../proto/flwr/proto/error.proto",
        "../../proto/flwr/proto/recordset.proto",
        "../../proto/flwr/proto/message.proto",
        "../../proto/flwr/proto/run.proto",
        "../../proto/flwr/proto/clientappio.proto",
    ];
    for proto in protos {
        println!("cargo:rerun-if-changed={proto}");
    }
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(
            &protos,
            &[
                "../../proto",
                include_path.to_str().ok_or("invalid protoc include path")?,
            ],
        )?;
    Ok(())
}
