use log::error;

use garmin_cli::garmin_cli_opts::GarminCliOpts;

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(e) = GarminCliOpts::process_args().await {
        if e.to_string().contains("Broken pipe") {
            return;
        }
        error!("{e:?}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
