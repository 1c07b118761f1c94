#[tokio::main]
async fn main() -> anyhow::Result<()> {
    campus_life_lib::run().await
}
