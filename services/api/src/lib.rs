mod assess;
mod cli;
mod infra;
mod routes;
mod server;

use otcc_assess::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
