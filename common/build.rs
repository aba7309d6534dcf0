// Note: The service stubs are described in Rust instead of a `.proto` file,
//       so building the workspace does not need `protoc` on the machine.
//       The message types live in `src/proto.rs` and derive `prost::Message`
//       by hand; keep the two in sync when adding a method.
use tonic_build::manual::{Builder, Method, Service};

const CODEC: &str = "tonic::codec::ProstCodec";

fn unary(name: &str, route: &str, input: &str, output: &str) -> Method {
    Method::builder()
        .name(name)
        .route_name(route)
        .input_type(format!("crate::proto::{}", input))
        .output_type(format!("crate::proto::{}", output))
        .codec_path(CODEC)
        .build()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let balancer = Service::builder()
        .name("Balancer")
        .package("cp")
        .method(unary("register", "Register", "RegisterRequest", "RegisterReply"))
        .method(unary("run_job", "RunJob", "RunJobRequest", "RunJobReply"))
        .method(unary("workers", "Workers", "WorkersRequest", "WorkersReply"))
        .method(unary("jobs", "Jobs", "JobsRequest", "JobsReply"))
        .build();

    let worker = Service::builder()
        .name("Worker")
        .package("cp")
        .method(unary("ready", "Ready", "ReadyRequest", "ReadyReply"))
        .method(unary("execute", "Execute", "ExecuteRequest", "ExecuteReply"))
        .build();

    Builder::new().compile(&[balancer, worker]);

    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
