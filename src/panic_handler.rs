use std::io::{self, Write};
use std::panic;

/// Install the process panic hook.
///
/// Debug builds get full backtraces; release builds write a crash report and
/// point the user at it.
pub fn initialize_panic_handler() {
    #[cfg(debug_assertions)]
    better_panic::install();

    #[cfg(not(debug_assertions))]
    human_panic::setup_panic!();

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        log::error!("Panic: {panic_info}");
        default_hook(panic_info);
        let _ = io::stdout().flush();
        std::process::exit(1);
    }));
}
