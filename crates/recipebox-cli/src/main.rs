mod cli;

use recipebox_core::app::ActionFailed;

fn main() {
    if let Err(e) = cli::run() {
        // the notice has already been printed
        if e.downcast_ref::<ActionFailed>().is_some() {
            std::process::exit(1);
        }
        eprintln!("{e:#}"); // pretty anyhow chain
        std::process::exit(1);
    }
}
