#[tokio::main]
async fn main() -> anyhow::Result<()> {
    homedash_client::app::run().await
}
