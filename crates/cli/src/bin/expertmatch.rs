use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    expertmatch_cli::main_entry().await
}
