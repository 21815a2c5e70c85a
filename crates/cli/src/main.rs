use std::process::ExitCode;

fn main() -> ExitCode {
    askdesk_cli::run()
}
