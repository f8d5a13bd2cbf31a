#[tokio::main]
async fn main() -> anyhow::Result<()> {
    debtx_lib::run().await
}
