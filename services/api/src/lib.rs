mod cli;
mod demo;
mod infra;
mod routes;
mod server;

use arts_fest::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
