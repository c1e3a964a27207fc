use structopt::StructOpt;
use svm::cli::command;

fn main() {
    env_logger::init();
    command::terminal_init();

    if let Err(err) = command::root(command::CommandRoot::from_args()) {
        command::report(&err);
        std::process::exit(1);
    }
}
