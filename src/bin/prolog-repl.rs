//! Interactive REPL for the engine.

use plang_core::context::Context;
use plang_core::executor::Solved;
use plang_core::reader;
use plang_core::term::dereference;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Load `.env` from the current directory if present, setting any vars
/// not already in the environment.
fn load_dotenv() {
    let path = std::path::Path::new(".env");
    if let Ok(contents) = std::fs::read_to_string(path) {
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"');
                if std::env::var(key).is_err() {
                    std::env::set_var(key, value);
                }
            }
        }
    }
}

fn main() {
    load_dotenv();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    println!("plang-core REPL");
    println!("Type a goal ending in '.', ':load <path>' to consult a file, or 'quit' to exit.");
    println!("----------------------------------------------------------------------------");

    let ctx = Context::new();

    let mut rl = DefaultEditor::new().expect("Failed to create line editor");

    let history_path = dirs::home_dir()
        .map(|h| h.join(".plang-repl-history"))
        .unwrap_or_else(|| ".plang-repl-history".into());
    let _ = rl.load_history(&history_path);

    loop {
        let readline = rl.readline("?- ");
        let line = match readline {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Error reading input: {}", e);
                continue;
            }
        };

        let goal_text = line.trim();
        if goal_text.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(goal_text);

        if matches!(goal_text, "quit" | "halt" | "exit") {
            println!("Goodbye!");
            break;
        }

        if let Some(path) = goal_text.strip_prefix(":load ") {
            match std::fs::read_to_string(path.trim()) {
                Ok(source) => match ctx.consult_source(&source) {
                    Ok(()) => println!("loaded {}", path.trim()),
                    Err(e) => println!("Error: {}", e),
                },
                Err(e) => println!("could not read {}: {}", path.trim(), e),
            }
            continue;
        }

        let (goal, vars) = match reader::read_term_with_vars(&ctx, goal_text) {
            Ok(parsed) => parsed,
            Err(e) => {
                println!("syntax error: {}", e);
                continue;
            }
        };

        match ctx.execute_goal(goal) {
            Ok(Solved::True) => print_solution(&ctx, &vars),
            Ok(Solved::Fail) => println!("false."),
            Ok(Solved::Halt(code)) => {
                println!("Goodbye!");
                let _ = rl.save_history(&history_path);
                std::process::exit(code);
            }
            Err(e) => println!("Error: {}", e),
        }
    }

    let _ = rl.save_history(&history_path);
}

fn print_solution(ctx: &Context, vars: &std::collections::HashMap<String, plang_core::TermRef>) {
    if vars.is_empty() {
        println!("true.");
        return;
    }
    let mut names: Vec<&String> = vars.keys().collect();
    names.sort();
    let bindings: Vec<String> = names
        .into_iter()
        .map(|name| format!("{} = {}", name, dereference(ctx, &vars[name])))
        .collect();
    println!("{}.", bindings.join(",\n"));
}
