use std::process::ExitCode;

use backstroke::engine::SyncError;
use backstroke::ui::output;

fn main() -> ExitCode {
    match backstroke::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(format!("{:#}", e));
            // Configuration problems won't go away on a rerun
            match e.downcast_ref::<SyncError>() {
                Some(sync) if sync.is_configuration() => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}
