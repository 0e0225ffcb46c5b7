/// Script player — step through a dialogue script in the terminal.
///
/// Usage: script_player --script <path> [--cast <path>] [--config <path>] [--name <id>=<name>]
///
/// Commands:
///   (empty) / next   — advance to the next dialogue line
///   tick <ms>        — advance the stage clock by <ms>
///   settle           — tick until every tween has finished
///   stage            — print character and background transforms
///   scroll           — print the visible scroll blocks
///   backlog          — print backlog entries
///   help             — list commands
///   quit             — exit

use std::io::{self, BufRead, Write};
use std::path::Path;

use story_engine::core::config::StageConfig;
use story_engine::core::interpreter::DialogueInterpreter;
use story_engine::schema::identity::{IdentityRegistry, NameStore};
use story_engine::schema::line::Script;

/// Frame length used by `settle`.
const FRAME_MS: u64 = 16;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut script_path = None;
    let mut cast_path = None;
    let mut config_path = None;
    let mut names = NameStore::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--script" if i + 1 < args.len() => {
                i += 1;
                script_path = Some(args[i].clone());
            }
            "--cast" if i + 1 < args.len() => {
                i += 1;
                cast_path = Some(args[i].clone());
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--name" if i + 1 < args.len() => {
                i += 1;
                match args[i].split_once('=') {
                    Some((id, name)) => names.set(id, name),
                    None => {
                        eprintln!("--name expects <id>=<name>, got {}", args[i]);
                        std::process::exit(1);
                    }
                }
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(script_path) = script_path else {
        eprintln!("--script is required");
        print_usage();
        std::process::exit(1);
    };

    let config = match config_path {
        Some(ref path) => StageConfig::load_from_ron(Path::new(path)).unwrap_or_else(|e| {
            eprintln!("Error loading config {}: {}", path, e);
            std::process::exit(1);
        }),
        None => StageConfig::default(),
    };

    let cast = match cast_path {
        Some(ref path) => IdentityRegistry::load_from_ron(Path::new(path)).unwrap_or_else(|e| {
            eprintln!("Error loading cast {}: {}", path, e);
            std::process::exit(1);
        }),
        None => IdentityRegistry::new(),
    };

    let script = Script::load_from_ron(Path::new(&script_path)).unwrap_or_else(|e| {
        eprintln!("Error loading script {}: {}", script_path, e);
        std::process::exit(1);
    });

    println!("Loaded {} lines, {} characters", script.len(), cast.len());
    println!("Type 'help' for commands.\n");

    let mut interp = DialogueInterpreter::new(&config, cast, names);
    interp.load(script);
    let mut now: u64 = 0;

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("play> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts.first().map(|s| s.to_lowercase()).unwrap_or_default();

        match cmd.as_str() {
            "" | "next" | "n" => {
                if interp.is_finished() {
                    println!("(end of script)");
                    continue;
                }
                let outcome = interp.advance();
                print_current(&interp);
                if !outcome.waits_for_input {
                    println!("(end of script)");
                }
            }
            "tick" => {
                let ms: u64 = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(FRAME_MS);
                now += ms;
                interp.tick(now);
                println!("clock: {}ms", now);
            }
            "settle" => {
                while interp.stage().is_animating() {
                    now += FRAME_MS;
                    interp.tick(now);
                }
                println!("clock: {}ms", now);
            }
            "stage" => print_stage(&interp),
            "scroll" => print_scroll(&interp),
            "backlog" => {
                if interp.backlog().is_empty() {
                    println!("(backlog empty)");
                }
                for entry in interp.backlog() {
                    println!("[{}] {}", entry.speaker, entry.text);
                }
            }
            "help" | "h" | "?" => print_help(),
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            other => println!("Unknown command: {}. Type 'help'.", other),
        }
    }
}

fn print_current(interp: &DialogueInterpreter) {
    if interp.is_scroll_mode() {
        print_scroll(interp);
        return;
    }
    if let Some(line) = interp.current_line() {
        println!("{}: {}", line.display_name, line.text);
        if let Some(expression) = interp.expression(&line.speaker) {
            println!(
                "  ({} / {} / {} / {})",
                expression.eye.as_deref().unwrap_or("-"),
                expression.mouth.as_deref().unwrap_or("-"),
                expression.brow.as_deref().unwrap_or("-"),
                expression.cheek.as_deref().unwrap_or("-"),
            );
        }
    }
}

fn print_stage(interp: &DialogueInterpreter) {
    let stage = interp.stage();
    let background = stage.background();
    println!(
        "background {}: offset ({:.1}, {:.1}) zoom {:.2}{}",
        stage.background_name().unwrap_or("(none)"),
        background.position.0,
        background.position.1,
        background.zoom,
        if background.is_tweening() { " *" } else { "" },
    );
    if let Some(fill) = stage.background_fill() {
        println!("  margin fill rgba({}, {}, {}, {})", fill.r, fill.g, fill.b, fill.a);
    }
    let names = stage.active_names();
    if names.is_empty() {
        println!("(no characters on stage)");
    }
    for name in names {
        if let Some(t) = stage.transform(name) {
            println!(
                "{}: ({:.1}, {:.1}) zoom {:.2}{}",
                name,
                t.position.0,
                t.position.1,
                t.zoom,
                if t.is_tweening() { " *" } else { "" },
            );
        }
    }
}

fn print_scroll(interp: &DialogueInterpreter) {
    let scroll = interp.scroll();
    if !scroll.is_scrolling() {
        println!("(not scrolling)");
        return;
    }
    for block in scroll.visible_blocks() {
        if block.is_first_line_for_speaker {
            println!("{}:", block.speaker);
        }
        println!("  {}", block.text);
    }
}

fn print_usage() {
    println!("Script player — step through a dialogue script in the terminal.");
    println!();
    println!("Usage: script_player --script <path> [--cast <path>] [--config <path>] [--name <id>=<name>]");
    println!();
    println!("  --script <path>    RON list of dialogue lines");
    println!("  --cast <path>      RON cast manifest (characters and backgrounds)");
    println!("  --config <path>    RON stage config (default: 1280x720)");
    println!("  --name <id>=<name> Player-visible name for an identity (repeatable)");
    println!();
    println!("Set RUST_LOG=debug to trace every director command.");
}

fn print_help() {
    println!("Commands:");
    println!("  (enter) / next   Advance to the next dialogue line");
    println!("  tick <ms>        Advance the stage clock (default {}ms)", FRAME_MS);
    println!("  settle           Tick until every tween has finished");
    println!("  stage            Print character and background transforms");
    println!("  scroll           Print the visible scroll blocks");
    println!("  backlog          Print backlog entries");
    println!("  help             Show this help");
    println!("  quit             Exit");
}
