use structopt::StructOpt;
use svm::cli::command;

fn main() {
    env_logger::init();
    command::terminal_init();

    if let Err(err) = command::ast(command::SubcommandAst::from_args()) {
        command::report(&err);
        std::process::exit(1);
    }
}
