use std::io::{self, BufRead, Write};
use std::process::exit;

use loxvm::{
  utils::{get_args, Init},
  vm::{InterpretError, VM},
};

/// Line-at-a-time prompt; errors are reported and the loop keeps going.
fn repl(vm: &mut VM) {
  let stdin = io::stdin();
  loop {
    print!("> ");
    io::stdout().flush().unwrap();

    let mut line = String::new();
    match stdin.lock().read_line(&mut line) {
      Ok(0) => {
        println!();
        break;
      }
      Ok(_) => {
        let _ = vm.interpret(&line);
      }
      Err(_) => break,
    }
  }
}

fn run_file(vm: &mut VM, path: &str) -> ! {
  let source = match std::fs::read_to_string(path) {
    Ok(source) => source,
    Err(_) => {
      eprintln!("Could not open file \"{}\".", path);
      exit(74);
    }
  };
  match vm.interpret(&source) {
    Ok(()) => exit(0),
    Err(InterpretError::CompileError(_)) => exit(65),
    Err(InterpretError::RuntimeError(_)) => exit(70),
  }
}

pub fn main() {
  let mut vm = VM::init();
  let args = get_args();
  match args.len() {
    0 => repl(&mut vm),
    1 => run_file(&mut vm, &args[0]),
    _ => {
      eprintln!("Usage: loxvm [path]");
      exit(64);
    }
  }
  vm.free();
}
