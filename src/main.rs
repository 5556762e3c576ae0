// spvpatch - enable PhysicalStorageBuffer64 addressing in a SPIR-V module
// and resolve a source line to the function that contains it

use std::env;
use std::path::{Path, PathBuf};
use std::process;

use log::{debug, info};

use spvpatch::locator::{InexactLinePolicy, LineMatch};
use spvpatch::words::read_words;
use spvpatch::{ParsedModule, PatchConfig, PatchError, Patcher};

struct Options {
    input: PathBuf,
    config: PatchConfig,
    verbose: bool,
}

fn main() {
    // Initialize logging
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let options = parse_args(&args);

    if let Err(err) = run(&options) {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}

fn run(options: &Options) -> Result<(), PatchError> {
    debug!("Loading SPIR-V module: {}", options.input.display());
    let words = read_words(&options.input)?;
    let module = ParsedModule::parse(words)?;
    if options.verbose {
        print!("{}", module);
    }

    let patcher = Patcher::new(options.config.clone());
    let outcome = patcher.patch(&module)?;

    let location = &outcome.location;
    if let LineMatch::Inexact { found } = location.matched {
        println!("no exact match found: {} vs {}", location.line, found);
    }
    if location.function_name.is_empty() {
        println!("in function %{}", location.function_id);
    } else {
        println!("in function {}", location.function_name);
    }
    for var in &location.variables {
        println!(" >> var {}", var.name);
    }

    let output = &options.config.output;
    outcome.write(output)?;
    info!("Wrote {} words to {}", outcome.words.len(), output.display());

    if options.verbose {
        println!(
            "Patched {} -> {} ({} instructions inserted)",
            options.input.display(),
            output.display(),
            outcome.inserted.len()
        );
    }
    Ok(())
}

fn parse_args(args: &[String]) -> Options {
    let program = args.first().map(String::as_str).unwrap_or("spvpatch");
    if args.len() < 2 {
        print_usage(program);
        process::exit(1);
    }

    // The config file is applied first so flags override it wherever they
    // appear on the command line
    let mut config = match find_config_arg(args) {
        Some(path) => PatchConfig::load(Path::new(path)).unwrap_or_else(|err| {
            eprintln!("Error: {}", err);
            process::exit(1);
        }),
        None => PatchConfig::default(),
    };

    let mut input: Option<PathBuf> = None;
    let mut verbose = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-o" | "--output" => {
                config.output = PathBuf::from(value_for(args, i, "a filename"));
                i += 2;
            }
            "--file" => {
                config.target.file = parse_number(args, i);
                i += 2;
            }
            "--line" => {
                config.target.line = parse_number(args, i);
                i += 2;
            }
            "--config" => {
                // already loaded
                i += 2;
            }
            "--strict-lines" => {
                config.inexact_lines = InexactLinePolicy::Reject;
                i += 1;
            }
            "--no-dedup" => {
                config.dedup_declarations = false;
                i += 1;
            }
            "-v" | "--verbose" => {
                verbose = true;
                i += 1;
            }
            "-h" | "--help" => {
                print_usage(program);
                process::exit(0);
            }
            arg if arg.starts_with('-') => {
                eprintln!("Error: Unknown option '{}'", arg);
                print_usage(program);
                process::exit(1);
            }
            _ => {
                if input.is_some() {
                    eprintln!("Error: Multiple input files specified");
                    process::exit(1);
                }
                input = Some(PathBuf::from(&args[i]));
                i += 1;
            }
        }
    }

    let Some(input) = input else {
        eprintln!("Error: No input file specified");
        print_usage(program);
        process::exit(1);
    };

    Options {
        input,
        config,
        verbose,
    }
}

fn find_config_arg(args: &[String]) -> Option<&str> {
    let pos = args.iter().position(|a| a == "--config")?;
    Some(value_for(args, pos, "a TOML file"))
}

fn value_for<'a>(args: &'a [String], i: usize, what: &str) -> &'a str {
    match args.get(i + 1) {
        Some(value) => value.as_str(),
        None => {
            eprintln!("Error: {} requires {}", args[i], what);
            process::exit(1);
        }
    }
}

fn parse_number<T: std::str::FromStr>(args: &[String], i: usize) -> T {
    let value = value_for(args, i, "a number");
    value.parse().unwrap_or_else(|_| {
        eprintln!("Error: Invalid value '{}' for {}", value, args[i]);
        process::exit(1);
    })
}

fn print_usage(program_name: &str) {
    println!("Usage: {} [options] <input.spv>", program_name);
    println!();
    println!("Switches a SPIR-V module to PhysicalStorageBuffer64 addressing and");
    println!("reports the function and local variables at a source line.");
    println!();
    println!("Options:");
    println!("  -o, --output <file>    Output filename (default: out.spv)");
    println!("  --file <index>         Source file index in declaration order (default: 0)");
    println!("  --line <n>             Source line to resolve (default: 20)");
    println!("  --config <file.toml>   Load settings from a TOML file");
    println!("  --strict-lines         Fail instead of using the next line marker");
    println!("  --no-dedup             Always append extension/capability declarations");
    println!("  -v, --verbose          Verbose output");
    println!("  -h, --help             Show this help message");
    println!();
    println!("Examples:");
    println!("  {} shader.spv                     # Patch line 20 of file 0", program_name);
    println!("  {} --line 42 -o dbg.spv shader.spv", program_name);
}
