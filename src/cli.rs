//! Command line interface of the clef driver.

use crate::driver::{CompileMode, Options};
use clap::Parser;
use clef_front::warning::Warnings;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "clef")]
#[command(about = "A small C compiler front-end", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Input file
    pub input: PathBuf,

    /// Output path
    #[arg(short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Compile and assemble, but do not link
    #[arg(short = 'c')]
    pub compile_only: bool,

    /// Stop after emitting assembly
    #[arg(short = 'S')]
    pub assembly_only: bool,

    /// Print the classified token stream and exit
    #[arg(long)]
    pub lextest: bool,

    /// Print the annotated AST after parsing and exit
    #[arg(long = "print-ast")]
    pub print_ast: bool,

    /// Stop after semantic analysis
    #[arg(long = "fsyntax-only")]
    pub syntax_only: bool,

    /// Print the external commands being run
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Enable or disable a warning, e.g. `-w sign-compare` or
    /// `-w no-sign-compare`
    #[arg(short = 'w', value_name = "WARNING")]
    pub warn: Vec<String>,

    /// Reject extensions that plain C89/C99 does not allow
    #[arg(long)]
    pub strict: bool,

    /// Preprocessor command
    #[arg(long, value_name = "COMMAND", default_value = "gcc -E")]
    pub pp: String,
}

impl Cli {
    /// Resolves the flag soup into driver options; unknown warning
    /// names are rejected here.
    pub fn to_options(&self) -> Result<Options, String> {
        let mut warnings = Warnings::default();
        for flag in &self.warn {
            warnings
                .apply(flag)
                .map_err(|unknown| format!("unknown warning '{}'", unknown))?;
        }

        let mode = if self.lextest {
            CompileMode::LexTest
        } else if self.print_ast {
            CompileMode::PrintAst
        } else if self.syntax_only {
            CompileMode::SyntaxOnly
        } else if self.assembly_only {
            CompileMode::Compile
        } else if self.compile_only {
            CompileMode::CompileAssemble
        } else {
            CompileMode::CompileAssembleLink
        };

        Ok(Options {
            input: self.input.clone(),
            output: self.output.clone(),
            mode,
            verbose: self.verbose,
            warnings,
            strict: self.strict,
            pp: self.pp.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_select_the_full_pipeline() {
        let cli = Cli::parse_from(["clef", "t.c"]);
        let options = cli.to_options().unwrap();
        assert!(matches!(options.mode, CompileMode::CompileAssembleLink));
        assert_eq!(options.pp, "gcc -E");
    }

    #[test]
    fn mode_flags_map_to_modes() {
        let cli = Cli::parse_from(["clef", "t.c", "--lextest"]);
        assert!(matches!(
            cli.to_options().unwrap().mode,
            CompileMode::LexTest
        ));
        let cli = Cli::parse_from(["clef", "t.c", "-S"]);
        assert!(matches!(cli.to_options().unwrap().mode, CompileMode::Compile));
        let cli = Cli::parse_from(["clef", "t.c", "-c"]);
        assert!(matches!(
            cli.to_options().unwrap().mode,
            CompileMode::CompileAssemble
        ));
    }

    #[test]
    fn unknown_warning_flags_are_rejected() {
        let cli = Cli::parse_from(["clef", "t.c", "-w", "does-not-exist"]);
        assert!(cli.to_options().is_err());
    }

    #[test]
    fn warning_flags_toggle() {
        let cli = Cli::parse_from(["clef", "t.c", "-w", "sign-compare", "-w", "no-main"]);
        let options = cli.to_options().unwrap();
        assert!(options.warnings.sign_compare);
        assert!(!options.warnings.main);
    }
}
