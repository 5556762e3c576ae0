// spv-lines - list the source files of a SPIR-V module with their line markers
//
// Handy for picking a --file/--line target for spvpatch.

use std::env;
use std::path::Path;
use std::process;

use spvpatch::words::read_words;
use spvpatch::ParsedModule;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 || args[1] == "-h" || args[1] == "--help" {
        println!("Usage: {} <input.spv>", args[0]);
        process::exit(if args.len() == 2 { 0 } else { 1 });
    }

    let module = match read_words(Path::new(&args[1])).and_then(ParsedModule::parse) {
        Ok(module) => module,
        Err(err) => {
            eprintln!("Error: {}", err);
            process::exit(1);
        }
    };

    if module.sources.is_empty() {
        println!("No OpString source files declared (compile with debug info, e.g. -g)");
        return;
    }

    for (index, source) in module.sources.iter().enumerate() {
        println!("[{}] {} (%{}, {} markers)", index, source.path, source.id, source.markers.len());
        for marker in &source.markers {
            let function = &module.functions[marker.function];
            let name = if function.name.is_empty() {
                format!("%{}", function.id)
            } else {
                function.name.clone()
            };
            println!("    line {:5} col {:3}  in {}", marker.line, marker.column, name);
        }
    }
}
