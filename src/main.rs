use std::{
    io::{self, BufRead},
    path::PathBuf,
};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmsnav::{
    binding::{Binding, WritePolicy},
    check, config,
    nav::{Conditions, Engine, Gesture, TextConditions, Update},
    render::{render_window, TextRenderer},
    settings::{MemoryStore, SettingsStore},
    topology::{HookRegistry, Topology},
};

#[derive(Parser, Debug)]
#[command(name = "cmsnav", version, about = "Stack-based OSD menu navigator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Opens the root menu and drives it with a gesture script or stdin.
    Run {
        /// Topology JSON file. Falls back to `topology` in the config.
        #[arg(long)]
        topology: Option<PathBuf>,
        /// Name of the menu to open. Defaults to the topology's root.
        #[arg(long)]
        root: Option<String>,
        /// Display row capacity.
        #[arg(long)]
        rows: Option<usize>,
        /// Render width in characters.
        #[arg(long)]
        columns: Option<usize>,
        /// When edited values reach the store: "immediate" or "buffered".
        #[arg(long, value_parser = parse_policy)]
        policy: Option<WritePolicy>,
        /// Comma separated gestures, e.g. "down,select,+,confirm,save".
        /// Without it, one gesture is read per stdin line.
        #[arg(long)]
        script: Option<String>,
        /// Entry text to hide (repeatable).
        #[arg(long)]
        hide: Vec<String>,
        /// Entry text to disable (repeatable).
        #[arg(long)]
        disable: Vec<String>,
        /// Print every setting value when done.
        #[arg(long)]
        dump: bool,
    },
    /// Checks a topology for broken links, bad guards and cycles.
    Check {
        #[arg(long)]
        topology: Option<PathBuf>,
        #[arg(long)]
        root: Option<String>,
    },
    /// Prints the config path that would be used (if any).
    ConfigPath,
}

fn parse_policy(value: &str) -> Result<WritePolicy, String> {
    match value.to_ascii_lowercase().as_str() {
        "immediate" => Ok(WritePolicy::Immediate),
        "buffered" => Ok(WritePolicy::Buffered),
        other => Err(format!("unknown write policy '{other}' (expected immediate or buffered)")),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cmsnav=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_optional()?;

    match cli.command {
        Command::Run {
            topology,
            root,
            rows,
            columns,
            policy,
            script,
            hide,
            disable,
            dump,
        } => {
            let resolved = config::resolve(
                cfg.as_ref(),
                config::Overrides {
                    rows,
                    columns,
                    write_policy: policy,
                    topology,
                    root,
                },
            );
            let topo = load_topology(resolved.topology.as_ref())?;
            let root = topo.resolve_root(resolved.root.as_deref())?;
            let Topology { menus, store, .. } = topo;

            let conditions = TextConditions::new(hide, disable);
            let mut renderer = TextRenderer::new(resolved.columns);
            let mut engine: Engine<'_, MemoryStore> =
                Engine::new(&menus, Binding::new(store, resolved.write_policy))
                    .with_rows(resolved.rows);

            let update = engine.open(root, &conditions);
            report(&update);
            print_frame(&engine, &conditions, &mut renderer);

            match script {
                Some(script) => {
                    for token in script.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                        let gesture = Gesture::decode(token)
                            .ok_or_else(|| anyhow!("unknown gesture '{token}' in script"))?;
                        if !step(&mut engine, gesture, &conditions, &mut renderer) {
                            break;
                        }
                    }
                }
                None => {
                    for line in io::stdin().lock().lines() {
                        let line = line.context("reading gestures from stdin")?;
                        let token = line.trim();
                        if token.is_empty() {
                            continue;
                        }
                        let Some(gesture) = Gesture::decode(token) else {
                            eprintln!("unknown gesture '{token}'");
                            continue;
                        };
                        if !step(&mut engine, gesture, &conditions, &mut renderer) {
                            break;
                        }
                    }
                }
            }

            if dump {
                let binding = engine.binding();
                let store = binding.store();
                for id in store.ids() {
                    println!("{} = {}", store.name_of(id).unwrap_or("?"), binding.read(id));
                }
                if store.save_count() > 0 {
                    println!("(saved {} time(s))", store.save_count());
                }
            }
        }
        Command::Check { topology, root } => {
            let resolved = config::resolve(
                cfg.as_ref(),
                config::Overrides {
                    topology,
                    root,
                    ..config::Overrides::default()
                },
            );
            let topo = load_topology(resolved.topology.as_ref())?;
            let root = topo.resolve_root(resolved.root.as_deref())?;
            let issues = check::check_topology(&topo.menus, &topo.store, root);
            for issue in &issues {
                println!("{issue}");
            }
            if check::has_errors(&issues) {
                bail!("topology has errors");
            }
            println!("{} menus checked, {} warning(s)", topo.menus.len(), issues.len());
        }
        Command::ConfigPath => {
            if let Some(path) = config::resolve_config_path() {
                println!("{}", path.display());
            }
        }
    }

    Ok(())
}

fn load_topology(path: Option<&PathBuf>) -> Result<Topology> {
    let Some(path) = path else {
        bail!("no topology given (use --topology or set \"topology\" in the config)");
    };
    Topology::load(path, &HookRegistry::with_builtins())
}

/// Applies one gesture and redraws. Returns false once the menus are closed.
fn step<S: SettingsStore>(
    engine: &mut Engine<'_, S>,
    gesture: Gesture,
    conditions: &dyn Conditions,
    renderer: &mut TextRenderer,
) -> bool {
    let update = engine.handle(gesture, conditions);
    report(&update);
    if update.redraw {
        print_frame(engine, conditions, renderer);
    }
    !update.closed
}

fn report(update: &Update) {
    if let Some(diagnostic) = update.diagnostic {
        eprintln!("refused: {diagnostic}");
    }
}

fn print_frame<S: SettingsStore>(
    engine: &Engine<'_, S>,
    conditions: &dyn Conditions,
    renderer: &mut TextRenderer,
) {
    let Some(window) = engine.window(conditions) else {
        println!("(menus closed)");
        return;
    };
    println!("== {} ==", window.menu().name());
    render_window(renderer, &window);
    for line in renderer.take_lines() {
        println!("{line}");
    }
}
