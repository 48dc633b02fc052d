use clap::Parser;
use postcraft::app::{handle_fatal_error, init_logging, AppConfig};
use postcraft::cli::{execute_command, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let app = AppConfig::new(cli.verbose)
        .with_config_path(cli.config)
        .with_data_dir(cli.data_dir);
    init_logging(&app);

    if let Err(e) = execute_command(cli.command, &app).await {
        handle_fatal_error(e, app.verbose);
    }
}
