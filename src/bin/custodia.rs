use anyhow::Result;
use custodia::cli::{actions::run, start};

// Main function
#[tokio::main]
async fn main() -> Result<()> {
    // Start the program
    let (globals, action) = start()?;

    // Handle the action
    run::handle(action, &globals).await
}
