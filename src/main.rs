#[macro_use]
extern crate log;

use std::io;
use std::sync::atomic::Ordering;

use ping_sweep::privilege::{self, EffectiveUser};
use ping_sweep::report::Table;
use ping_sweep::sweep::{self, RawConnector, Sweep};
use ping_sweep::cli::App;

fn main() {
    let config = match App::parse_args() {
        Ok(config) => config,
        Err(e) => {
            error!("Could not parse provided argument: {}", e);
            std::process::exit(1);
        }
    };
    let table = Table::new(config.layout);

    // This tool only runs with elevated privileges because it needs access to a raw socket
    if let Err(e) = privilege::ensure(&EffectiveUser) {
        error!("{}", e);
        std::process::exit(1);
    }

    trace!("Set up new sweep context");

    let sweep = match Sweep::new(config) {
        Ok(sweep) => sweep,
        Err(e) => {
            error!("Could not configure ping sweep: {}", e);
            std::process::exit(1);
        }
    };

    let interrupt = match sweep::interrupt_on_ctrlc() {
        Ok(signal) => signal,
        Err(e) => {
            error!("Could not register interrupt handler: {}", e);
            std::process::exit(1);
        }
    };

    trace!("Start ping sweep");

    let stdout = io::stdout();
    let mut printed = 0;
    let mut write_failed = false;
    let result = sweep.run(&mut RawConnector, &interrupt, |entry| {
        if write_failed {
            return;
        }
        if let Err(e) = table.stream_entry(&mut stdout.lock(), &sweep, entry, printed == 0) {
            // Nobody is reading anymore, stop after this size
            error!("Could not write results: {}", e);
            write_failed = true;
            interrupt.store(true, Ordering::SeqCst);
            return;
        }
        printed += 1;
    });

    match result {
        Ok(_) if write_failed => std::process::exit(1),
        Ok(result) => {
            if let Err(e) = table.write_footer(&mut stdout.lock(), result.interrupted()) {
                error!("Could not write results: {}", e);
                std::process::exit(1);
            }
            trace!("Successfully ended ping sweep");
        }
        Err(e) => {
            error!("An error occurred during the ping sweep: {}", e);
            std::process::exit(1);
        }
    }

    trace!("Shutting down...");
}
