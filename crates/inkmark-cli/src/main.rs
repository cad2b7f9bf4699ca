use std::env;
use std::io::{self, Read, Write};
use std::process;

use inkmark_core::translate;

fn main() {
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                return;
            }
            _ => {
                eprintln!("unexpected argument: {}", arg);
                print_usage();
                process::exit(2);
            }
        }
    }

    let mut source = String::new();
    if let Err(err) = io::stdin().read_to_string(&mut source) {
        eprintln!("failed to read stdin: {}", err);
        process::exit(1);
    }

    let html = translate(&source);
    if let Err(err) = io::stdout().write_all(html.as_bytes()) {
        eprintln!("failed to write stdout: {}", err);
        process::exit(1);
    }
}

fn print_usage() {
    eprintln!("Usage: inkmark-cli < input.md > output.html");
}
