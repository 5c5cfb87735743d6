//! afil command-line driver: parse, analyse, and run a single source file.
//!
//! Usage:
//!   afil file.afil
//!   afil file.afil --stack-size 4096
//!   afil file.afil --dump-program
//!
//! This is the one crate in the workspace allowed to print: `afil-core` and `afil-parser` are
//! libraries and never touch stdout/stderr themselves.

use std::fs;
use std::process;

use afil_core::DEFAULT_STACK_SIZE;

struct Args {
    input_file: String,
    stack_size: usize,
    verbose: bool,
    dump_program: bool,
}

impl Args {
    fn parse() -> Result<Self, String> {
        let raw: Vec<String> = std::env::args().collect();
        let mut input_file = None;
        let mut stack_size = DEFAULT_STACK_SIZE;
        let mut verbose = false;
        let mut dump_program = false;

        let mut i = 1;
        while i < raw.len() {
            match raw[i].as_str() {
                "--stack-size" => {
                    i += 1;
                    let value = raw.get(i).ok_or("--stack-size requires a value")?;
                    stack_size = value.parse().map_err(|_| format!("invalid --stack-size value `{value}`"))?;
                }
                "-v" | "--verbose" => verbose = true,
                "--dump-program" => dump_program = true,
                arg if arg.starts_with('-') => return Err(format!("unknown option `{arg}`")),
                arg => {
                    if input_file.is_some() {
                        return Err("only one input file may be given".to_string());
                    }
                    input_file = Some(arg.to_string());
                }
            }
            i += 1;
        }

        let input_file = input_file.ok_or("no input file given")?;
        Ok(Args { input_file, stack_size, verbose, dump_program })
    }
}

fn run() -> Result<i32, String> {
    let args = Args::parse()?;
    let source = fs::read_to_string(&args.input_file).map_err(|e| format!("reading `{}`: {e}", args.input_file))?;

    if args.verbose {
        eprintln!("afil: parsing `{}`", args.input_file);
    }
    let module = afil_parser::parse_module(&args.input_file, &source).map_err(|e| e.to_string())?;

    if args.verbose {
        eprintln!("afil: analysing module");
    }
    let program = afil_core::analyse(std::slice::from_ref(&module)).map_err(|e| e.to_string())?;

    if args.dump_program {
        println!("{program:#?}");
    }

    if args.verbose {
        eprintln!("afil: running (stack = {} bytes)", args.stack_size);
    }
    afil_core::run(&program, args.stack_size).map_err(|unmet| {
        format!(
            "precondition {} of function {:?} did not hold",
            unmet.precondition_index, unmet.function_id
        )
    })
}

fn main() {
    match run() {
        Ok(exit_code) => process::exit(exit_code),
        Err(message) => {
            eprintln!("afil: error: {message}");
            process::exit(1);
        }
    }
}
