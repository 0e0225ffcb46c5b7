/// Event board — list the story events offerable at a calendar moment.
///
/// Usage: event_board --catalog <path> --date <Y/M/D> --slot <slot>
///                    [--state <path>] [--config <path>]
///                    [--location <name>] [--heroine <name>] [--complete <id>] [--all]

use std::path::Path;

use story_engine::core::config::StageConfig;
use story_engine::core::eligibility::EventEligibilityEngine;
use story_engine::core::store::RonFileStore;
use story_engine::schema::calendar::{GameDate, GameStamp, Slot};
use story_engine::schema::event::{EventCatalogRow, EventFilter};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut catalog_path = None;
    let mut state_path = None;
    let mut config_path = None;
    let mut date = None;
    let mut slot = None;
    let mut filter = EventFilter::any();
    let mut complete = None;
    let mut show_all = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--catalog" if i + 1 < args.len() => {
                i += 1;
                catalog_path = Some(args[i].clone());
            }
            "--state" if i + 1 < args.len() => {
                i += 1;
                state_path = Some(args[i].clone());
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--date" if i + 1 < args.len() => {
                i += 1;
                date = match parse_date(&args[i]) {
                    Some(d) => Some(d),
                    None => {
                        eprintln!("Invalid date: {} (expected Y/M/D)", args[i]);
                        std::process::exit(1);
                    }
                };
            }
            "--slot" if i + 1 < args.len() => {
                i += 1;
                slot = Some(Slot::new(args[i].clone()));
            }
            "--location" if i + 1 < args.len() => {
                i += 1;
                filter = filter.at_location(args[i].clone());
            }
            "--heroine" if i + 1 < args.len() => {
                i += 1;
                filter = filter.with_heroine(args[i].clone());
            }
            "--complete" if i + 1 < args.len() => {
                i += 1;
                complete = Some(args[i].clone());
            }
            "--all" => show_all = true,
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let (Some(catalog_path), Some(date), Some(slot)) = (catalog_path, date, slot) else {
        eprintln!("--catalog, --date and --slot are required");
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
    if !config.slots.contains(slot.as_str()) {
        eprintln!("Warning: slot {} is not defined in the config", slot);
    }

    let catalog = if Path::new(&catalog_path).exists() {
        EventCatalogRow::load_from_ron(Path::new(&catalog_path)).unwrap_or_else(|e| {
            eprintln!("Error loading catalog {}: {}", catalog_path, e);
            std::process::exit(1);
        })
    } else {
        eprintln!("Warning: no catalog at {}", catalog_path);
        Vec::new()
    };

    let mut store = state_path.map(RonFileStore::new);
    let mut engine = EventEligibilityEngine::new(config.slots.clone());
    engine.load(&catalog, &[]);
    if let Some(ref store) = store {
        engine.reload(store);
    }

    if let Some(ref id) = complete {
        if !engine.mark_completed_on(id, GameStamp::new(date, slot.clone())) {
            eprintln!("Unknown event: {}", id);
            std::process::exit(1);
        }
        match store {
            Some(ref mut store) => {
                if let Err(e) = engine.persist(store) {
                    eprintln!("Error saving state: {}", e);
                    std::process::exit(1);
                }
                println!("Marked {} completed.", id);
            }
            None => println!("Marked {} completed (no --state given; not saved).", id),
        }
    }

    println!("{} {}", date, slot);
    println!();

    if show_all {
        for event in engine.events() {
            let offerable = engine.is_offerable(&event.id, &date, &slot) && filter.matches(event);
            println!(
                "{} {:<24} {:<32} {}-{} {} x{}{}",
                if offerable { "*" } else { " " },
                event.id,
                event.title,
                format_marker(event.start.month_day()),
                format_marker(event.end.month_day()),
                event.heroine,
                event.completion_count,
                if event.active { "" } else { " (inactive)" },
            );
        }
        return;
    }

    let available = engine.list_available(&date, &slot, &filter);
    if available.is_empty() {
        println!("(nothing to offer)");
        return;
    }
    for event in available {
        println!("{:<24} {:<32} {} @ {}", event.id, event.title, event.heroine, event.location);
    }
}

fn parse_date(input: &str) -> Option<GameDate> {
    let parts: Vec<u32> = input
        .split('/')
        .map(|p| p.trim().parse().ok())
        .collect::<Option<Vec<u32>>>()?;
    match parts.as_slice() {
        [year, month, day] => Some(GameDate::new(*year, *month, *day)),
        _ => None,
    }
}

fn format_marker((month, day): (u32, u32)) -> String {
    format!("{:02}/{:02}", month, day)
}

fn print_usage() {
    println!("Event board — list the story events offerable at a calendar moment.");
    println!();
    println!("Usage: event_board --catalog <path> --date <Y/M/D> --slot <slot> [options]");
    println!();
    println!("  --catalog <path>   RON list of event catalog rows");
    println!("  --date <Y/M/D>     In-game date, e.g. 2025/6/1");
    println!("  --slot <slot>      Time-of-day slot, e.g. 朝");
    println!("  --state <path>     RON eligibility state file (read, and written by --complete)");
    println!("  --config <path>    RON stage config supplying the slot table");
    println!("  --location <name>  Only events at this location");
    println!("  --heroine <name>   Only events with this heroine");
    println!("  --complete <id>    Mark an event completed before listing");
    println!("  --all              Show every event, starring the offerable ones");
}
