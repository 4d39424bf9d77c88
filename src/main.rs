use std::env;
use std::fs;
use std::process;
use std::sync::Arc;

use gen_playback::playback::rendering::ArticulationsProfile;
use gen_playback::{playback_report, ResolverConfig, Score};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: gen-playback [--config <config.yaml>] <score.yaml> [output.yaml]";

fn read_file(path: &str) -> String {
    match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path, e);
            process::exit(1);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("{}", USAGE);
        process::exit(1);
    }

    let mut config = ResolverConfig::default();
    let mut input_index = 1;

    // Parse flags
    if args[1] == "--config" {
        let Some(config_path) = args.get(2) else {
            eprintln!("{}", USAGE);
            process::exit(1);
        };

        config = match ResolverConfig::from_yaml(&read_file(config_path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error in '{}': {}", config_path, e);
                process::exit(1);
            }
        };
        input_index = 3;
    }

    let Some(input_path) = args.get(input_index) else {
        eprintln!("{}", USAGE);
        process::exit(1);
    };
    let output_path = args.get(input_index + 1);

    let score = match Score::from_yaml(&read_file(input_path)) {
        Ok(score) => score,
        Err(e) => {
            eprintln!("Error in '{}': {}", input_path, e);
            process::exit(1);
        }
    };

    let report = match playback_report(&score, config, Arc::new(ArticulationsProfile::universal())) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Playback error: {}", e);
            process::exit(1);
        }
    };

    let yaml = match serde_yaml::to_string(&report) {
        Ok(yaml) => yaml,
        Err(e) => {
            eprintln!("Error serializing report: {}", e);
            process::exit(1);
        }
    };

    // Output
    match output_path {
        Some(path) => {
            if let Err(e) = fs::write(path, &yaml) {
                eprintln!("Error writing to '{}': {}", path, e);
                process::exit(1);
            }
            eprintln!("Wrote playback report for {} part(s) to {}", report.len(), path);
        }
        None => {
            print!("{}", yaml);
        }
    }
}
