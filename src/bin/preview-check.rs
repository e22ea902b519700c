use std::env;
use std::fs;
use std::process;

use tracing_subscriber::EnvFilter;
use workbench_preview::{
    assert_buildable, resolve_target, scope_stylesheet, PreviewConfig, PreviewError,
    PreviewResult, StaticTypeRegistry,
};

struct Options {
    ui_file: String,
    css_file: Option<String>,
    config_file: Option<String>,
    types_file: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(message) => {
            if !message.is_empty() {
                eprintln!("{}", message);
                eprintln!();
            }
            print_usage();
            process::exit(1);
        }
    };

    let mut exit_code = 0;
    if let Err(e) = check(&options) {
        print_error(&e);
        exit_code = 1;
    }
    process::exit(exit_code);
}

fn print_usage() {
    eprintln!("Usage: preview-check <file.ui> [file.css] [--config FILE] [--types FILE]");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  preview-check main.ui");
    eprintln!("  preview-check main.ui main.css --config preview.yaml");
    eprintln!("  preview-check main.ui --types my-widgets.yaml");
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut positional = Vec::new();
    let mut config_file = None;
    let mut types_file = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let value = iter.next().ok_or("--config needs a file")?;
                config_file = Some(value.clone());
            }
            "--types" => {
                let value = iter.next().ok_or("--types needs a file")?;
                types_file = Some(value.clone());
            }
            "-h" | "--help" => return Err(String::new()),
            flag if flag.starts_with("--") => return Err(format!("Unknown option {}", flag)),
            _ => positional.push(arg.clone()),
        }
    }

    let mut positional = positional.into_iter();
    let ui_file = positional.next().ok_or_else(String::new)?;
    let css_file = positional.next();
    if let Some(extra) = positional.next() {
        return Err(format!("Unexpected argument {}", extra));
    }

    Ok(Options {
        ui_file,
        css_file,
        config_file,
        types_file,
    })
}

fn read(path: &str) -> PreviewResult<String> {
    fs::read_to_string(path)
        .map_err(|e| PreviewError::Config(format!("Failed to read {}: {}", path, e)))
}

fn check(options: &Options) -> PreviewResult<()> {
    let config = match &options.config_file {
        Some(path) => PreviewConfig::load(path)?,
        None => PreviewConfig::default(),
    };

    let mut registry = StaticTypeRegistry::gtk();
    if let Some(path) = &options.types_file {
        registry.extend_from_yaml(&read(path)?)?;
    }

    let markup = read(&options.ui_file)?;
    eprintln!("Checking {}", options.ui_file);
    match resolve_target(markup.trim(), &registry, &config.target_id)? {
        Some(target) => {
            assert_buildable(&target.document, &registry)?;
            let kind = if target.type_info.is_toplevel() {
                "window"
            } else {
                "widget"
            };
            println!(
                "✓ {} previews {} '{}' ({})",
                options.ui_file, kind, target.id, target.type_info.name
            );
        }
        None => {
            // nothing to preview is not an error, the previewer just keeps the last surface
            println!("✓ {} has no previewable object", options.ui_file);
        }
    }

    if let Some(css_file) = &options.css_file {
        let css = read(css_file)?;
        let scoped = scope_stylesheet(&css, &config.scope_selector)?;
        println!("✓ {} scoped to {}", css_file, config.scope_selector);
        println!("{}", scoped);
    }

    Ok(())
}

fn print_error(error: &PreviewError) {
    match error {
        PreviewError::Markup(message) => {
            eprintln!("✗ Markup parse error:");
            eprintln!("    {}", message);
        }
        PreviewError::Stylesheet {
            line,
            column,
            message,
        } => {
            eprintln!("✗ Stylesheet parse error at line {}, column {}:", line, column);
            eprintln!("    {}", message);
        }
        PreviewError::NotBuildable { type_name } => {
            eprintln!("✗ {} is not buildable", type_name);
            eprintln!("    Objects of this type cannot appear in a builder document");
        }
        PreviewError::Config(message) => {
            eprintln!("✗ Configuration error:");
            eprintln!("    {}", message);
        }
        e => {
            eprintln!("✗ {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn ui_file_only() {
        let options = parse_args(&args(&["main.ui"])).unwrap();
        assert_eq!(options.ui_file, "main.ui");
        assert_eq!(options.css_file, None);
        assert_eq!(options.config_file, None);
        assert_eq!(options.types_file, None);
    }

    #[test]
    fn options_may_appear_anywhere() {
        let options = parse_args(&args(&[
            "--config",
            "preview.yaml",
            "main.ui",
            "--types",
            "widgets.yaml",
            "main.css",
        ]))
        .unwrap();
        assert_eq!(options.ui_file, "main.ui");
        assert_eq!(options.css_file.as_deref(), Some("main.css"));
        assert_eq!(options.config_file.as_deref(), Some("preview.yaml"));
        assert_eq!(options.types_file.as_deref(), Some("widgets.yaml"));
    }

    #[test]
    fn missing_ui_file_prints_usage_only() {
        assert_eq!(parse_args(&[]).err(), Some(String::new()));
        assert_eq!(parse_args(&args(&["--help"])).err(), Some(String::new()));
    }

    #[test]
    fn option_without_value_is_rejected() {
        assert_eq!(
            parse_args(&args(&["main.ui", "--config"])).err(),
            Some("--config needs a file".to_string())
        );
    }

    #[test]
    fn unknown_option_and_extra_argument_are_rejected() {
        assert_eq!(
            parse_args(&args(&["main.ui", "--verbose"])).err(),
            Some("Unknown option --verbose".to_string())
        );
        assert_eq!(
            parse_args(&args(&["a.ui", "b.css", "c.css"])).err(),
            Some("Unexpected argument c.css".to_string())
        );
    }
}
