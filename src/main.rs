use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match regreport_lib::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
