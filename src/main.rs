#[tokio::main]
async fn main() -> anyhow::Result<()> {
    nebroker::run().await
}
