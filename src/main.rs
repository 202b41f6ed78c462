#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use animloop::simulation::{Simulation, SimulationPlan, FRAME};
    use animloop::utils::{load_config, AssetsConfig, Config};
    use animloop::{AssetList, AssetLister, ControllerOptions};
    use anyhow::Result;
    use clap::{Args, Parser, Subcommand};
    use env_logger::Env;
    use log::{info, warn};
    use std::path::PathBuf;
    use std::time::Duration;

    /// animloop - random looping animations that pause off screen
    #[derive(Parser, Debug)]
    #[command(author, version, about, long_about = None)]
    struct Cli {
        /// Configuration file layered over the system and user files
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Enable debug logging
        #[arg(short, long)]
        debug: bool,

        #[command(subcommand)]
        command: Command,
    }

    #[derive(Subcommand, Debug)]
    enum Command {
        /// Print the animation files of a directory as a JSON array of public paths
        List(ListArgs),

        /// Drive the playback controller on a virtual clock and report what it did
        Simulate(SimulateArgs),

        /// Print the effective configuration
        Config,
    }

    #[derive(Args, Debug)]
    struct ListArgs {
        /// Directory to scan
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Public URL prefix
        #[arg(long)]
        prefix: Option<String>,

        /// File extension to match
        #[arg(long)]
        extension: Option<String>,
    }

    #[derive(Args, Debug)]
    struct SimulateArgs {
        /// Directory to scan for assets
        #[arg(long, value_name = "DIR", conflicts_with = "asset")]
        dir: Option<PathBuf>,

        /// Asset names to play instead of scanning a directory
        #[arg(long, value_name = "NAME")]
        asset: Vec<String>,

        /// Stop after this many loads
        #[arg(long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..))]
        loops: u32,

        /// Length of one animation loop in milliseconds
        #[arg(long, default_value = "2000", value_parser = clap::value_parser!(u64).range(1..))]
        loop_ms: u64,

        /// Rendered player height in pixels
        #[arg(long, default_value = "320")]
        height: u32,

        /// Selection seed
        #[arg(long)]
        seed: Option<u64>,

        /// Scroll the container out of view at this time
        #[arg(long, value_name = "MS")]
        hide_at_ms: Option<u64>,

        /// Scroll the container back into view at this time
        #[arg(long, value_name = "MS")]
        show_at_ms: Option<u64>,

        /// Resize the viewport at these times
        #[arg(long, value_name = "MS")]
        resize_at_ms: Vec<u64>,

        /// Pace the simulation in wall-clock time
        #[arg(long)]
        realtime: bool,
    }

    pub async fn run() -> Result<()> {
        let args = Cli::parse();

        let config = load_config(args.config.as_deref())?;

        let log_level = if args.debug {
            "debug"
        } else {
            config.general.log_level.as_str()
        };
        env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
            .format_timestamp_millis()
            .init();
        info!("Starting animloop v{}", env!("CARGO_PKG_VERSION"));

        match args.command {
            Command::List(list) => list_assets(&config, list),
            Command::Simulate(simulate) => run_simulation(&config, simulate).await,
            Command::Config => {
                print!("{}", config.to_toml()?);
                Ok(())
            }
        }
    }

    /// Configured asset settings with the command line overrides applied
    fn list_config(config: &Config, args: ListArgs) -> AssetsConfig {
        let mut assets_config = config.assets.clone();
        if let Some(dir) = args.dir {
            assets_config.directory = dir;
        }
        if let Some(prefix) = args.prefix {
            assets_config.url_prefix = prefix;
        }
        if let Some(extension) = args.extension {
            assets_config.extension = extension;
        }
        assets_config
    }

    fn list_assets(config: &Config, args: ListArgs) -> Result<()> {
        let lister = AssetLister::from_config(&list_config(config, args));
        info!("Listing assets in {}", lister.directory().display());

        let assets = lister.list()?;
        println!("{}", assets.to_json()?);
        Ok(())
    }

    async fn run_simulation(config: &Config, args: SimulateArgs) -> Result<()> {
        let assets = if args.asset.is_empty() {
            let mut assets_config = config.assets.clone();
            if let Some(dir) = args.dir {
                assets_config.directory = dir;
            }
            AssetLister::from_config(&assets_config).list()?
        } else {
            AssetList::with_prefix(&config.assets.url_prefix, &args.asset)
        };

        if assets.is_empty() {
            warn!("No assets found, the controller will stay idle");
        }

        let mut options = ControllerOptions::from(&config.playback);
        if args.seed.is_some() {
            options.seed = args.seed;
        }

        let plan = SimulationPlan {
            loops: args.loops,
            loop_duration: Duration::from_millis(args.loop_ms),
            height: args.height,
            hide_at: args.hide_at_ms.map(Duration::from_millis),
            show_at: args.show_at_ms.map(Duration::from_millis),
            resize_at: args.resize_at_ms.iter().copied().map(Duration::from_millis).collect(),
        };

        let mut simulation = Simulation::start(plan, assets, options)?;
        while !simulation.is_finished() {
            simulation.step();
            if args.realtime {
                tokio::time::sleep(FRAME).await;
            }
        }

        let summary = simulation.finish();
        println!("{}", serde_json::to_string_pretty(&summary)?);
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_simulate_defaults() {
            let cli = Cli::try_parse_from(["animloop", "simulate", "--asset", "a.json"]).unwrap();
            match cli.command {
                Command::Simulate(args) => {
                    assert_eq!(args.loops, 10);
                    assert_eq!(args.loop_ms, 2000);
                    assert_eq!(args.asset, vec!["a.json".to_string()]);
                }
                other => panic!("Expected simulate, got {:?}", other),
            }
        }

        #[test]
        fn test_loops_out_of_range_are_rejected() {
            for loops in ["0", "4294967296", "-1"] {
                let parsed = Cli::try_parse_from(["animloop", "simulate", "--loops", loops]);
                assert!(parsed.is_err(), "--loops {} should be rejected", loops);
            }

            let parsed = Cli::try_parse_from(["animloop", "simulate", "--loops", "4294967295"]).unwrap();
            let Command::Simulate(args) = parsed.command else {
                panic!("Expected simulate");
            };
            assert_eq!(args.loops, u32::MAX);
        }

        #[tokio::test]
        async fn test_huge_loop_count_is_an_error() {
            let args = SimulateArgs {
                dir: None,
                asset: vec!["a.json".to_string(), "b.json".to_string()],
                loops: u32::MAX,
                loop_ms: 1000,
                height: 320,
                seed: Some(1),
                hide_at_ms: None,
                show_at_ms: None,
                resize_at_ms: Vec::new(),
                realtime: false,
            };

            let err = run_simulation(&Config::default(), args).await.unwrap_err();
            assert!(err.to_string().contains("do not fit"));
        }

        #[test]
        fn test_list_overrides() {
            let cli = Cli::try_parse_from([
                "animloop",
                "list",
                "--dir",
                "/srv/anims",
                "--prefix",
                "/anims",
                "--extension",
                "lottie",
            ])
            .unwrap();
            let Command::List(args) = cli.command else {
                panic!("Expected list");
            };

            let assets = list_config(&Config::default(), args);
            assert_eq!(assets.directory, PathBuf::from("/srv/anims"));
            assert_eq!(assets.url_prefix, "/anims");
            assert_eq!(assets.extension, "lottie");
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
