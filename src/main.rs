#[tokio::main]
async fn main() -> anyhow::Result<()> {
    faq_assistant_lib::run().await
}
