use std::path::PathBuf;
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use extraction_client::core::{OutputFormat, ResultKind, SortField, SortOrder};
use extraction_client::sync::TASKS_LOCATION;
use extraction_client::ui::{render_ledger, render_view, run_watch};
use extraction_client::utils::{format_bytes, init_tracing};
use extraction_client::{
    AppContext,
    Config,
    ExtractionBackend,
    RefreshOutcome,
    RequestId,
    UploadTaskSettings,
};

#[derive(Parser)]
#[command(name = "extraction-client", about = "Client for the text extraction service")]
struct Cli {
    /// Config file; defaults apply when it does not exist
    #[arg(long, short, default_value = "extraction-client.toml")]
    config: PathBuf,

    /// Overrides the configured endpoint
    #[arg(long)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file for extraction
    Upload {
        file: PathBuf,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// List locally tracked requests
    List,
    /// Show one page of tasks with their current status
    Tasks {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        page_size: Option<u32>,
        /// started, fileName or status
        #[arg(long)]
        sort: Option<String>,
        /// ascend or descend; anything else uses the column default
        #[arg(long)]
        order: Option<String>,
    },
    /// Live task table
    Watch,
    /// Status of a single request
    Status {
        id: String,
    },
    /// Download a result of a finished request
    Download {
        id: String,
        /// txt or zip
        kind: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Last-used upload settings
    Settings {
        #[command(subcommand)]
        sub: SettingsCommands,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    Show,
    /// Forget the last-used settings
    Reset,
}

/// Upload options; anything not given keeps its last-used value
#[derive(Args)]
struct SettingsArgs {
    #[arg(long)]
    language: Option<String>,
    #[arg(long, overrides_with = "no_ocr")]
    ocr: bool,
    #[arg(long, overrides_with = "ocr")]
    no_ocr: bool,
    /// json or msgpack
    #[arg(long)]
    format: Option<String>,
    #[arg(long)]
    convert_timeout: Option<u32>,
    #[arg(long)]
    images_timeout: Option<u32>,
}

impl SettingsArgs {
    fn merge_into(self, mut settings: UploadTaskSettings) -> anyhow::Result<UploadTaskSettings> {
        if let Some(language) = self.language {
            settings.language = Some(language).filter(|l| !l.is_empty());
        }
        if self.ocr {
            settings.ocr_enable = true;
        }
        if self.no_ocr {
            settings.ocr_enable = false;
        }
        if let Some(format) = self.format {
            settings.output_format = format.parse::<OutputFormat>()?;
        }
        if let Some(timeout) = self.convert_timeout {
            settings.convert_to_pdf_timeout_sec = timeout;
        }
        if let Some(timeout) = self.images_timeout {
            settings.pdf_to_images_timeout_sec = timeout;
        }
        Ok(settings)
    }
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

async fn show_tasks(
    ctx: &AppContext,
    page: Option<u32>,
    page_size: Option<u32>,
    sort: Option<String>,
    order: Option<String>,
) -> anyhow::Result<()> {
    let synchronizer = ctx.synchronizer();
    let mut refreshed = false;

    if sort.is_some() || order.is_some() {
        let state = synchronizer.state().await?;
        let field = match sort {
            Some(sort) => sort.parse::<SortField>()?,
            None => state.sort_field,
        };
        let order = SortOrder::from_token(order.as_deref().unwrap_or_default());
        let outcome = synchronizer.update_sorting(field, order).await.context("Sorting tasks")?;
        refreshed |= outcome != RefreshOutcome::Unchanged;
    }

    if page.is_some() || page_size.is_some() {
        let state = synchronizer.state().await?;
        let outcome = synchronizer
            .update_page(page.unwrap_or(state.page), page_size.unwrap_or(state.page_size))
            .await
            .context("Paging tasks")?;
        refreshed |= outcome != RefreshOutcome::Unchanged;
    }

    if !refreshed {
        synchronizer
            .location_changed(TASKS_LOCATION)
            .await
            .context("Refreshing tasks")?;
    }

    let mut stdout = std::io::stdout();
    render_view(&mut stdout, &synchronizer.snapshot(), ctx.backend.base_url())?;
    Ok(())
}

async fn run(ctx: &AppContext, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Upload { file, settings } => {
            let settings = settings.merge_into(ctx.settings.restore_last())?;
            let request = ctx
                .upload(&file, &settings)
                .await
                .with_context(|| format!("Uploading {}", file.display()))?;
            println!("{}", request.id);
        }
        Commands::List => {
            render_ledger(&mut std::io::stdout(), &ctx.ledger.list())?;
        }
        Commands::Tasks { page, page_size, sort, order } => {
            show_tasks(ctx, page, page_size, sort, order).await?;
        }
        Commands::Watch => {
            run_watch(ctx.synchronizer(), ctx.backend.base_url()).await?;
        }
        Commands::Status { id } => {
            let request_id = RequestId::new(id);
            let record = ctx
                .backend
                .request_status(&request_id)
                .await
                .with_context(|| format!("Querying status of {}", request_id))?;

            let file_name = ctx
                .ledger
                .get(&request_id)
                .map(|r| r.file_name)
                .or(record.original_file_name)
                .unwrap_or_else(|| "-".to_string());
            println!("{}  {}  {}", record.request_id, record.status, file_name);

            if record.status.is_done() {
                for kind in [ResultKind::PlainText, ResultKind::PackedZip] {
                    println!("    {}", extraction_client::api::result_url(ctx.backend.base_url(), &request_id, kind));
                }
            }
        }
        Commands::Download { id, kind, out } => {
            let request_id = RequestId::new(id);
            let kind = kind.parse::<ResultKind>()?;
            let dest = out.unwrap_or_else(|| PathBuf::from(format!("{}_{}", request_id.short(), kind.file_name())));

            let written = ctx
                .client
                .download_result(&request_id, kind, &dest)
                .await
                .with_context(|| format!("Downloading {} of {}", kind.file_name(), request_id))?;
            println!("{} ({})", dest.display(), format_bytes(written));
        }
        Commands::Settings { sub } => match sub {
            SettingsCommands::Show => print_json(&ctx.settings.restore_last())?,
            SettingsCommands::Reset => print_json(&ctx.settings.reset()?)?,
        },
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config)
        .with_context(|| format!("Loading config {}", cli.config.display()))?;
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
        config.validate()?;
    }

    init_tracing(&config.log_level);

    let ctx = AppContext::start(config).context("Starting client")?;
    let result = run(&ctx, cli.command).await;
    ctx.shutdown().await?;

    result
}
