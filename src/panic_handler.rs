use crossterm::{
    cursor::Show,
    execute,
    terminal::{LeaveAlternateScreen, disable_raw_mode},
};
use std::io::{self, Write};
use std::panic;
use std::path::Path;

/// Installs a hook that leaves the alternate screen before the panic report
/// is printed, then points at the log file and exits.
pub fn initialize_panic_handler(log_file: &Path) {
    better_panic::install();

    let log_file = log_file.to_path_buf();
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        restore_terminal();
        log::error!("Panic: {panic_info}");

        default_hook(panic_info);
        let _ = writeln!(io::stderr(), "{}", crash_notice(&log_file));

        std::process::exit(1);
    }));
}

fn crash_notice(log_file: &Path) -> String {
    format!("wikipanes crashed. The log is in {}", log_file.display())
}

pub fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
    let _ = execute!(io::stderr(), Show);
    let _ = writeln!(io::stderr());
}
