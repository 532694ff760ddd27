use super::*;

#[derive(Parser)]
#[command(author, version, about = "Launch and follow repository healing runs")]
pub(super) struct Cli {
    #[arg(long, global = true, help = "Path to the config file")]
    pub(super) config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the backend base URL")]
    pub(super) api_base_url: Option<String>,
    #[command(subcommand)]
    pub(super) command: Commands,
}

#[derive(clap::Subcommand)]
pub(super) enum Commands {
    #[command(about = "Log in with email and password")]
    Login(LoginArgs),
    #[command(about = "Create an account")]
    Signup(SignupArgs),
    #[command(about = "Log in through the identity provider")]
    Oauth(OauthArgs),
    #[command(about = "Request a password recovery code")]
    ForgotPassword(EmailArgs),
    #[command(about = "Verify a password recovery code")]
    VerifyOtp(VerifyOtpArgs),
    #[command(about = "Set a new password with a verified code")]
    ResetPassword(ResetPasswordArgs),
    #[command(about = "Show the logged in user")]
    Whoami,
    #[command(about = "Clear the stored session")]
    Logout,
    #[command(about = "Preview the branch name for a team and leader")]
    Branch(BranchArgs),
    #[command(about = "Launch a healing run and follow its log")]
    Run(RunArgs),
}

#[derive(Parser)]
pub(super) struct LoginArgs {
    #[arg(long)]
    pub(super) email: String,
    #[arg(long)]
    pub(super) password: String,
}

#[derive(Parser)]
pub(super) struct SignupArgs {
    #[arg(long)]
    pub(super) name: String,
    #[arg(long)]
    pub(super) email: String,
    #[arg(long)]
    pub(super) password: String,
}

#[derive(Parser)]
pub(super) struct OauthArgs {
    #[arg(long, help = "Give up after this many seconds without a token")]
    pub(super) timeout_secs: Option<u64>,
    #[arg(long, help = "Origin to attach to pasted callback messages")]
    pub(super) origin: Option<String>,
}

#[derive(Parser)]
pub(super) struct EmailArgs {
    #[arg(long)]
    pub(super) email: String,
}

#[derive(Parser)]
pub(super) struct VerifyOtpArgs {
    #[arg(long)]
    pub(super) email: String,
    #[arg(long)]
    pub(super) otp: String,
}

#[derive(Parser)]
pub(super) struct ResetPasswordArgs {
    #[arg(long)]
    pub(super) email: String,
    #[arg(long)]
    pub(super) otp: String,
    #[arg(long)]
    pub(super) password: String,
    #[arg(long)]
    pub(super) confirm: String,
}

#[derive(Parser)]
pub(super) struct BranchArgs {
    #[arg(long)]
    pub(super) team: String,
    #[arg(long)]
    pub(super) leader: String,
}

#[derive(Parser)]
pub(super) struct RunArgs {
    #[arg(long)]
    pub(super) repo_url: String,
    #[arg(long)]
    pub(super) team: String,
    #[arg(long)]
    pub(super) leader: String,
}

pub(super) fn command_label(command: &Commands) -> &'static str {
    match command {
        Commands::Login(_) => "login",
        Commands::Signup(_) => "signup",
        Commands::Oauth(_) => "oauth",
        Commands::ForgotPassword(_) => "forgot-password",
        Commands::VerifyOtp(_) => "verify-otp",
        Commands::ResetPassword(_) => "reset-password",
        Commands::Whoami => "whoami",
        Commands::Logout => "logout",
        Commands::Branch(_) => "branch",
        Commands::Run(_) => "run",
    }
}
