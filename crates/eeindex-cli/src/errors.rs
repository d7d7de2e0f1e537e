use console::style;
use eeindex_core::IndexerError;
use std::fmt;

/// Error with context and suggested fixes, rendered on stderr
#[derive(Clone)]
pub struct CliError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
    pub help_command: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
            help_command: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_help(mut self, command: impl Into<String>) -> Self {
        self.help_command = Some(command.into());
        self
    }

    pub fn display(&self) {
        eprintln!("{} {}\n", style("✗").red().bold(), style(&self.message).red().bold());

        if let Some(ref context) = self.context {
            eprintln!("{}", context);
            eprintln!();
        }

        if !self.suggestions.is_empty() {
            eprintln!("{}", style("To fix this:").yellow().bold());
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, suggestion);
            }
            eprintln!();
        }

        if let Some(ref help_cmd) = self.help_command {
            eprintln!("{} {}", style("Need help?").cyan(), style(help_cmd).cyan().bold());
        }
    }

    /// JSON form for `--json` runs
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "status": "error",
            "message": self.message,
            "context": self.context,
            "suggestions": self.suggestions,
        })
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Turn any command failure into a renderable error
pub fn from_anyhow(error: &anyhow::Error) -> CliError {
    if let Some(cli_error) = error.downcast_ref::<CliError>() {
        return cli_error.clone();
    }
    match error.chain().find_map(|cause| cause.downcast_ref::<IndexerError>()) {
        Some(indexer_error) => from_indexer_error(indexer_error),
        None => CliError::new(format!("{:#}", error)),
    }
}

/// Map the indexing error taxonomy to remediation hints
pub fn from_indexer_error(error: &IndexerError) -> CliError {
    match error {
        IndexerError::Configuration { key, .. } => CliError::new("Invalid configuration")
            .with_context(error.to_string())
            .with_suggestion(format!("Check the value given for '{}'", key))
            .with_suggestion("Resolution and output CRS must be given together")
            .with_help("Run: eeindex index --help"),
        IndexerError::ProductNotFound { name } => CliError::new("Product not found")
            .with_context(format!("No product named '{}' is registered in the index.", name))
            .with_suggestion("Pass --asset to create it while indexing")
            .with_suggestion("Or register it first: eeindex new-product --asset <ASSET>")
            .with_help("Run: eeindex status"),
        IndexerError::CatalogUnavailable { .. } => CliError::new("Catalog unavailable")
            .with_context(error.to_string())
            .with_suggestion("Check network access to the catalog endpoint")
            .with_suggestion("Raise max_retries or request_timeout_secs in the config file"),
        IndexerError::CatalogRejected { status, .. } => CliError::new("Catalog rejected the request")
            .with_context(error.to_string())
            .with_suggestion(if *status == 401 || *status == 403 {
                "Set EE_API_KEY or EEDA_BEARER with valid credentials"
            } else {
                "Check the asset id and query parameters"
            }),
        IndexerError::IndexWrite { .. } => CliError::new("Index write failed")
            .with_context(format!("{}\n\nThe run was stopped; records already written are kept.", error))
            .with_suggestion("Check that the product schema matches the records being indexed")
            .with_help("Run: eeindex status"),
        IndexerError::IndexUnavailable(reason) => database_connection_failed(reason),
        _ => CliError::new(error.to_string()),
    }
}

/// Create error for database connection failure
pub fn database_connection_failed(error: &str) -> CliError {
    CliError::new("Cannot use the PostgreSQL index")
        .with_context(format!("DATABASE_URL is not set or the database rejected the request.\n\nError: {}", error))
        .with_suggestion("Set DATABASE_URL: export DATABASE_URL=\"postgresql://localhost/eeindex\"")
        .with_suggestion("Or index into memory with --storage memory")
        .with_help("Run: eeindex status --storage postgres")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_mapping() {
        let error = IndexerError::config("region", "unknown region 'atlantis'");
        let cli_error = from_indexer_error(&error);
        assert_eq!(cli_error.message, "Invalid configuration");
        assert!(cli_error.context.unwrap().contains("atlantis"));
        assert!(cli_error.suggestions[0].contains("region"));
    }

    #[test]
    fn test_anyhow_chain_is_searched() {
        let error = anyhow::Error::new(IndexerError::ProductNotFound { name: "s2".into() })
            .context("Indexing failed");
        let cli_error = from_anyhow(&error);
        assert_eq!(cli_error.message, "Product not found");
    }

    #[test]
    fn test_json_rendering() {
        let json = CliError::new("boom").with_suggestion("retry").to_json();
        assert_eq!(json["status"], "error");
        assert_eq!(json["suggestions"][0], "retry");
    }
}
