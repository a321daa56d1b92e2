use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use webcrawl::config::{ConfigLoader, CrawlConfig};
use webcrawl::downloader::HttpClientFactory;
use webcrawl::output::create_output;
use webcrawl::parser::html;
use webcrawl::{
    CrawlSettings, DownloaderSource, HttpRequest, Monitor, MonitorConfig, Scheduler,
    SchedulerSummary,
};

#[derive(Parser)]
#[command(name = "webcrawl")]
#[command(version = "0.1.0")]
#[command(about = "Concurrent same-domain web crawler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl from the seed URL of a config file
    Run {
        /// Path to the configuration file (JSON/YAML/TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Show a progress bar (stderr)
        #[arg(short, long, default_value_t = true)]
        progress: bool,

        /// Log summaries with the permitted domain list
        #[arg(short, long, default_value_t = false)]
        detail: bool,
    },
    /// Validate a configuration file
    Check {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn http_client_factory(cfg: &CrawlConfig) -> HttpClientFactory {
    let timeout = cfg.request_timeout();
    let user_agent = cfg.user_agent.clone();
    Arc::new(move || {
        let mut builder = reqwest::Client::builder().timeout(timeout);
        if let Some(ua) = &user_agent {
            builder = builder.user_agent(ua.clone());
        }
        builder.build().unwrap_or_else(|e| {
            log::warn!("Falling back to the default HTTP client: {}", e);
            reqwest::Client::new()
        })
    })
}

fn progress_message(summary: &SchedulerSummary) -> String {
    format!(
        "Items: {} | Cache: {} | Downloaders: {} | Parsers: {}",
        summary.item_pipeline.processed,
        summary.request_cache.length,
        summary.downloader_pool,
        summary.parser_pool
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    let cli = Cli::parse();
    let logger = env_logger::Builder::from_default_env().build();
    let multi = Arc::new(indicatif::MultiProgress::new());

    match cli.command {
        Commands::Run {
            config,
            progress,
            detail,
        } => {
            if progress {
                indicatif_log_bridge::LogWrapper::new((*multi).clone(), logger).try_init()?;
            } else {
                log::set_boxed_logger(Box::new(logger))?;
                log::set_max_level(log::LevelFilter::Info);
            }

            log::info!("Loading config from {:?}", config);
            let cfg = ConfigLoader::load(&config)?;
            log::info!("Loaded crawl: {}", cfg.name);

            let output = create_output(cfg.output.as_ref(), Some(multi.clone())).await?;
            let settings =
                CrawlSettings::new(cfg.max_depth, cfg.channel_config(), cfg.pool_config())
                    .with_feed_interval(cfg.feed_interval());
            let scheduler = Scheduler::new(
                settings,
                DownloaderSource::HttpClient(Some(http_client_factory(&cfg))),
                vec![html::link_parser(), html::title_parser()],
                vec![output],
            )?;
            for domain in &cfg.permit_domains {
                scheduler.add_permit_domain(domain)?;
            }

            log::info!("Starting crawl from {}...", cfg.seed_url);
            scheduler.start(HttpRequest::parse(&cfg.seed_url)?)?;
            scheduler.pipeline().set_fail_fast(cfg.fail_fast);

            let monitor = Monitor::spawn(
                scheduler.clone(),
                MonitorConfig {
                    check_interval: cfg.monitor_interval(),
                    summary_interval: cfg.summary_interval(),
                    idle_confirmations: cfg.idle_confirmations,
                    detail,
                },
            );

            let mut progress_bar: Option<ProgressBar> = None;
            let mut progress_task = None;
            if progress {
                let pb = multi.add(ProgressBar::new(0));
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template(
                            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                        )?
                        .progress_chars("#>-"),
                );

                let mut summaries = monitor.summaries();
                let pb_clone = pb.clone();
                progress_bar = Some(pb);
                progress_task = Some(tokio::spawn(async move {
                    while summaries.changed().await.is_ok() {
                        let Some(summary) = summaries.borrow().clone() else {
                            continue;
                        };
                        pb_clone.set_length(summary.url_count as u64);
                        pb_clone.set_position(summary.item_pipeline.processed);
                        pb_clone.set_message(progress_message(&summary));
                    }
                }));
            }

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    log::info!("Interrupted, stopping the scheduler...");
                    if let Err(e) = scheduler.stop() {
                        log::warn!("{}", e);
                    }
                }
                _ = scheduler.stopped() => {}
            }

            monitor.wait().await;
            scheduler.join().await;

            if let Some(task) = progress_task {
                task.abort();
            }
            let summary = scheduler.summary();
            if let Some(pb) = progress_bar {
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template(
                            "✅ [{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} {msg}",
                        )?
                        .progress_chars("#>-"),
                );
                pb.set_length(summary.url_count as u64);
                pb.set_position(summary.item_pipeline.processed);
                pb.finish_with_message(format!("{} - Completed", progress_message(&summary)));
            }

            println!("\n✅ Crawl Completed:");
            println!("   Status: {}", summary.status);
            println!("   URLs Admitted: {}", summary.url_count);
            println!("   Items Processed: {}", summary.item_pipeline.processed);
            println!("   Permitted Domains: {:?}", summary.permitted_domains);
        }
        Commands::Check { config } => match ConfigLoader::load(&config) {
            Ok(cfg) => {
                println!("✅ Config is valid:");
                println!("   Name: {}", cfg.name);
                println!("   Seed URL: {}", cfg.seed_url);
                println!("   Max depth: {}", cfg.max_depth);
                println!("   Channels: {}", cfg.channel_config());
                println!("   Pools: {}", cfg.pool_config());
            }
            Err(e) => {
                eprintln!("❌ Config error: {}", e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
