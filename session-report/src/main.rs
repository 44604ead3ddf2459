mod cli;
mod config;
mod error;
mod input;
mod telemetry;

fn main() {
    if let Err(err) = cli::run() {
        eprintln!("session-report: {err}");
        std::process::exit(1);
    }
}
