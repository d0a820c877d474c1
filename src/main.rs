#[tokio::main]
async fn main() -> std::io::Result<()> {
    block_runtime::run_with_config().await
}
