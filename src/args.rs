use clap::Parser;
use std::path::PathBuf;

/// Logs in, caches tokens and forwards API calls with them attached
#[derive(Parser, Debug)]
#[command(name = "nebroker", version, about)]
pub struct Cli {
    /// API path to request, e.g. api_v1_master_goods/search
    #[arg(required_unless_present_any = ["login", "clear_token", "print_token"])]
    pub path: Option<String>,

    /// key=value file with the request parameters
    #[arg(default_value = "api_params")]
    pub params_file: PathBuf,

    /// Env file holding credentials and server URLs
    #[arg(long, env = "NEBROKER_ENV")]
    pub env: Option<PathBuf>,

    /// Token cache location
    #[arg(long, env = "NEBROKER_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    /// Reject self-signed or otherwise invalid certificates
    #[arg(long)]
    pub verify_tls: bool,

    /// Log in again and store fresh tokens
    #[arg(long)]
    pub login: bool,

    /// Delete the saved token file
    #[arg(long)]
    pub clear_token: bool,

    /// Print the current access token (logging in if needed)
    #[arg(long)]
    pub print_token: bool,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_file_defaults() {
        let cli = Cli::try_parse_from(["nebroker", "/orders/search/"]).unwrap();
        assert_eq!(cli.path.as_deref(), Some("/orders/search/"));
        assert_eq!(cli.params_file, PathBuf::from("api_params"));
    }

    #[test]
    fn path_required_for_api_calls() {
        assert!(Cli::try_parse_from(["nebroker"]).is_err());
        assert!(Cli::try_parse_from(["nebroker", "--clear-token"]).is_ok());
    }
}
