use std::process::ExitCode;

fn main() -> ExitCode {
    match energy_forecast::app::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if !err.is_reported() {
                eprintln!("{err}");
            }
            ExitCode::from(err.exit_code())
        }
    }
}
