use super::*;

pub(super) async fn run() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let label = command_label(&cli.command);
    let config = load_config(cli.config.as_deref(), cli.api_base_url.as_deref())?;
    info!(command = label, api_base_url = %config.api_base_url(), "Running command");

    if let Commands::Branch(args) = &cli.command {
        println!("{}", branch_name(&args.team, &args.leader));
        return Ok(());
    }

    let audit = AuditLogger::open()?;
    let shell = Shell::open(config, audit.clone())?;
    let result = match cli.command {
        Commands::Login(args) => handle_login(&shell, args).await,
        Commands::Signup(args) => handle_signup(&shell, args).await,
        Commands::Oauth(args) => handle_oauth(&shell, args).await,
        Commands::ForgotPassword(args) => handle_forgot_password(&shell, args).await,
        Commands::VerifyOtp(args) => handle_verify_otp(&shell, args).await,
        Commands::ResetPassword(args) => handle_reset_password(&shell, args).await,
        Commands::Whoami => handle_whoami(&shell).await,
        Commands::Logout => handle_logout(&shell),
        Commands::Run(args) => handle_run(&shell, args).await,
        Commands::Branch(_) => Ok(()),
    };

    if let Err(err) = &result {
        let _ = audit.failed(
            AuditEvent::CommandFailed,
            Some(json!({ "command": label })),
            &err.to_string(),
        );
    }

    result
}

/// Reads the config file (defaults when absent) and applies CLI overrides.
pub(super) fn load_config(
    path: Option<&Path>,
    api_base_url: Option<&str>,
) -> anyhow::Result<AppConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => default_config_path()?,
    };
    let mut config =
        AppConfig::load(&path).with_context(|| format!("load config {}", path.display()))?;
    if let Some(url) = api_base_url {
        config.api_base_url = url.to_string();
    }
    Ok(config)
}
