use clap::{CommandFactory, Parser};
use pdf_to_word::Error;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "pdf-to-word",
    about = "Convert a PDF file to a Word document",
    disable_help_flag = true,
    disable_version_flag = true
)]
struct Args {
    /// Input PDF file
    #[arg(allow_hyphen_values = true)]
    input: PathBuf,
    /// Output DOCX file
    #[arg(allow_hyphen_values = true)]
    output: PathBuf,
}

enum Outcome {
    Converted,
    Usage,
    InputNotFound(PathBuf),
    ConversionFailed(Error),
}

impl Outcome {
    fn exit_code(&self) -> u8 {
        match self {
            Outcome::Converted => 0,
            Outcome::Usage | Outcome::InputNotFound(_) | Outcome::ConversionFailed(_) => 1,
        }
    }
}

fn run<I: IntoIterator<Item = OsString>>(argv: I) -> Outcome {
    // Exactly two operands; clap alone would also accept a leading `--`.
    let argv: Vec<OsString> = argv.into_iter().collect();
    if argv.len() != 3 {
        return Outcome::Usage;
    }
    let Ok(args) = Args::try_parse_from(argv) else {
        return Outcome::Usage;
    };
    if !args.input.exists() {
        return Outcome::InputNotFound(args.input);
    }

    println!(
        "Starting conversion: {} -> {}",
        args.input.display(),
        args.output.display()
    );
    match pdf_to_word::convert_pdf_to_docx(&args.input, &args.output) {
        Ok(_) => Outcome::Converted,
        Err(e) => Outcome::ConversionFailed(e),
    }
}

fn report(outcome: &Outcome) {
    match outcome {
        Outcome::Converted => println!("Conversion successful"),
        Outcome::Usage => println!("{}", Args::command().render_usage()),
        Outcome::InputNotFound(path) => {
            println!("Error: Input file NOT found: {}", path.display());
        }
        Outcome::ConversionFailed(e) => eprintln!("Error during conversion: {e}"),
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let outcome = run(std::env::args_os());
    report(&outcome);
    ExitCode::from(outcome.exit_code())
}
