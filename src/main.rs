//! jenkdo CLI
//!
//! Entry point for the `jenkdo` command-line tool.

use std::fs;
use std::io::{self, BufRead, IsTerminal};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value};
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use jenkdo::client::{JenkinsClient, ReqwestTransport};
use jenkdo::config::{
    env_layer, ConfigError, ConfigFile, ConfigLayers, EffectiveConfig, Settings,
};
use jenkdo::diagnostics::Diagnostics;
use jenkdo::poll::{Pacer, SystemClock};
use jenkdo::script::ScriptRunner;
use jenkdo::signal::{SignalHandler, SignalState};
use jenkdo::terminal::Terminal;
use jenkdo::validate::Validator;
use jenkdo::{BuildOptions, Confirmation, ExitCode, JobError, Lifecycle, RemoteJob};

/// Default log filter when neither --log-level nor RUST_LOG is set
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Parser)]
#[command(name = "jenkdo")]
#[command(about = "Run a pipeline file as a throwaway Jenkins job", version)]
struct Cli {
    #[command(flatten)]
    globals: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Jenkins URL. Can be set via env var "JENKDO_URL"
    #[arg(short = 'j', long = "jenkins", global = true)]
    jenkins: Option<String>,

    /// User on Jenkins to execute as. Can be set via env var "JENKDO_USER"
    #[arg(short = 'u', long, global = true)]
    user: Option<String>,

    /// Jenkins password or token. Can be set via env var "JENKDO_PASSWORD";
    /// asked for on the terminal when not set anywhere
    #[arg(short = 'p', long, global = true)]
    password: Option<String>,

    /// Config file (default: $JENKDO_CONFIG or ~/.config/jenkdo/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter for diagnostics on stderr (default: RUST_LOG or "warn")
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a pipeline file as a build on Jenkins
    ///
    /// Creates a pipeline job from TEMPLATE with JENKINSFILE as its script.
    /// The template must contain '{{ jenkinsfile | forceescape() }}' in its
    /// <script> section; a bundled template is used when none is given.
    Build {
        /// File with the pipeline. Should end in '.groovy' or '.jenkinsfile'
        jenkinsfile: PathBuf,

        /// Job config template ('.xml')
        template: Option<PathBuf>,

        /// Don't delete the job when the build ends
        #[arg(short, long)]
        keep: bool,

        /// Print [Pipeline] rows in console output
        #[arg(short, long)]
        verbose: bool,

        /// Automatically agree with the validation result
        #[arg(short, long)]
        yes: bool,

        /// Delete the job first if it already exists
        #[arg(short, long)]
        force: bool,

        /// Exit 0 whatever the build result
        #[arg(long)]
        ignore_result: bool,
    },

    /// Execute a script file on the Jenkins script console
    Script {
        /// File with the script. Should end in '.groovy'
        script: PathBuf,
    },

    /// Validate a pipeline file without running it
    Validate {
        /// File with the pipeline
        jenkinsfile: PathBuf,
    },

    /// Print the effective configuration with secrets redacted
    Config,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.globals.log_level.as_deref());

    let terminal = Arc::new(Terminal::stdout());
    let code = match run(cli, Arc::clone(&terminal)) {
        Ok(code) => code,
        Err(e) => {
            report(&terminal, &e);
            e.exit_code()
        }
    };
    process::exit(code.as_i32());
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .try_init();
}

fn run(cli: Cli, terminal: Arc<Terminal>) -> Result<ExitCode, JobError> {
    let mut config = load_config(&cli.globals, None)?;
    let wants_server = !matches!(cli.command, Commands::Config);
    if wants_server && config.is_missing("password") && io::stdin().is_terminal() {
        let password = prompt_password()?;
        config = load_config(&cli.globals, Some(password))?;
    }

    match cli.command {
        Commands::Build {
            jenkinsfile,
            template,
            keep,
            verbose,
            yes,
            force,
            ignore_result,
        } => {
            let options = BuildOptions {
                keep,
                verbose,
                assume_yes: yes,
                force,
                ignore_result,
            };
            run_build(config.settings()?, &jenkinsfile, template.as_deref(), options, terminal)
        }
        Commands::Script { script } => run_script(config.settings()?, &script, terminal),
        Commands::Validate { jenkinsfile } => {
            run_validate(config.settings()?, &jenkinsfile, terminal)
        }
        Commands::Config => run_config(&config, &terminal),
    }
}

fn report(terminal: &Terminal, error: &JobError) {
    match error {
        // Already explained on screen by the component that failed
        JobError::Rejected { .. } | JobError::ScriptRejected { .. } => {}
        JobError::TeardownFailed { failures } => {
            for failure in failures {
                terminal.error(format!("> Cleanup failed: {}", failure));
            }
        }
        other => terminal.error(format!("> {}: {}", other.failure_kind().description(), other)),
    }
}

/// Merge the config layers; `password` is one typed at the prompt
fn load_config(globals: &GlobalArgs, password: Option<String>) -> Result<EffectiveConfig, JobError> {
    let lookup = |var: &str| std::env::var(var).ok();
    let password = password.or_else(|| globals.password.clone());

    let mut cli = Map::new();
    for (key, value) in [
        ("url", &globals.jenkins),
        ("user", &globals.user),
        ("password", &password),
    ] {
        if let Some(value) = value {
            cli.insert(key.to_string(), Value::String(value.clone()));
        }
    }

    let layers = ConfigLayers {
        file: ConfigFile::locate(globals.config.as_deref(), lookup),
        env: Some(env_layer(lookup)),
        cli: Some(Value::Object(cli)),
    };
    Ok(EffectiveConfig::build(layers)?)
}

/// Read the password without echoing it
fn prompt_password() -> Result<String, JobError> {
    rpassword::prompt_password("Password: ").map_err(|source| JobError::Input {
        path: PathBuf::from("<tty>"),
        source,
    })
}

fn client_for(settings: &Settings) -> Result<JenkinsClient, JobError> {
    let transport = ReqwestTransport::new(settings.credentials(), settings.request_timeout())?;
    Ok(JenkinsClient::new(Arc::new(transport), settings.endpoints()))
}

fn read_input(path: &Path) -> Result<String, JobError> {
    fs::read_to_string(path).map_err(|source| JobError::Input {
        path: path.to_path_buf(),
        source,
    })
}

fn install_handler(handler: &SignalHandler) {
    if let Err(e) = handler.install() {
        warn!(error = %e, "could not install interrupt handler");
    }
}

/// Waits for Enter; the interrupt handler goes in only once the user agreed,
/// so Ctrl+C at the prompt still ends the process right away.
struct PromptConfirmation<'a> {
    terminal: Arc<Terminal>,
    handler: &'a SignalHandler,
}

impl Confirmation for PromptConfirmation<'_> {
    fn confirm(&mut self) -> Result<bool, JobError> {
        self.terminal
            .prompt("> Press Enter to continue or Ctrl+C to exit");

        let mut answer = String::new();
        let read = io::stdin()
            .lock()
            .read_line(&mut answer)
            .map_err(|source| JobError::Input {
                path: PathBuf::from("<stdin>"),
                source,
            })?;
        if read == 0 {
            self.terminal.blank();
            return Ok(false);
        }

        install_handler(self.handler);
        Ok(true)
    }
}

fn run_build(
    settings: &Settings,
    jenkinsfile: &Path,
    template: Option<&Path>,
    options: BuildOptions,
    terminal: Arc<Terminal>,
) -> Result<ExitCode, JobError> {
    let mut job = RemoteJob::open(jenkinsfile, template)?;
    let client = client_for(settings)?;

    let signals = Arc::new(SignalState::new());
    let handler = SignalHandler::with_state(Arc::clone(&signals));
    if options.assume_yes {
        install_handler(&handler);
    }

    let pacer = Pacer::new(Arc::new(SystemClock::new()), signals, settings.poll_interval());
    let lifecycle = Lifecycle::new(
        client,
        Arc::clone(&terminal),
        pacer,
        Diagnostics::new(&settings.logs_dir),
        &settings.timeouts,
    );

    let mut confirmation = PromptConfirmation {
        terminal,
        handler: &handler,
    };
    let outcome = lifecycle.run(&mut job, &options, &mut confirmation)?;
    Ok(outcome.exit_code(options.ignore_result))
}

fn run_script(settings: &Settings, script: &Path, terminal: Arc<Terminal>) -> Result<ExitCode, JobError> {
    let content = read_input(script)?;
    ScriptRunner::new(client_for(settings)?, terminal).run(&content)?;
    Ok(ExitCode::Success)
}

fn run_validate(
    settings: &Settings,
    jenkinsfile: &Path,
    terminal: Arc<Terminal>,
) -> Result<ExitCode, JobError> {
    let pipeline = read_input(jenkinsfile)?;
    Validator::new(client_for(settings)?, terminal).validate(&pipeline)?;
    Ok(ExitCode::Success)
}

fn run_config(config: &EffectiveConfig, terminal: &Terminal) -> Result<ExitCode, JobError> {
    let json = config
        .to_json()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;
    terminal.line(json);
    config.settings()?;
    Ok(ExitCode::Success)
}
