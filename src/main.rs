use clap::Parser;
use clef::cli::Cli;

fn main() {
    let cli = Cli::parse();

    let options = match cli.to_options() {
        Ok(options) => options,
        Err(message) => {
            eprintln!("clef: {}", message);
            std::process::exit(1);
        }
    };

    match clef::driver::run(&options) {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            eprintln!("clef: {}", error);
            std::process::exit(1);
        }
    }
}
