//! Push Worker Service - Entry Point
//!
//! Receives notification-created triggers and fans them out to push and email.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    fitwise_push_worker::run().await
}
