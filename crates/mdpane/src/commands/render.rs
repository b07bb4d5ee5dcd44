//! `mdpane render` command implementation.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;

use mdpane_renderer::{RenderOptions, Theme, markdown_to_html};

use crate::config::Config;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Markdown file to render.
    input: PathBuf,

    /// Stylesheet to inline into the fragment (overrides config).
    #[arg(long)]
    css: Option<PathBuf>,

    /// Theme for the built-in default styles: light or dark (overrides config).
    #[arg(long)]
    theme: Option<String>,

    /// Code block text color (overrides config).
    #[arg(long)]
    pre_color: Option<String>,

    /// Write the fragment to a file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose output (show pipeline debug logs).
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to configuration file (default: auto-discover mdpane.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, file reads, or rendering
    /// fail.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let config = Config::load(self.config.as_deref())?;
        let theme = self.resolve_theme(&config)?;

        // CLI flags override config values
        let pre_color = self.pre_color.or(config.preview.pre_color);
        let stylesheet = self.css.or(config.preview.stylesheet);

        let markdown = std::fs::read_to_string(&self.input)?;
        let css = match &stylesheet {
            Some(path) => {
                tracing::debug!(stylesheet = %path.display(), "reading stylesheet");
                std::fs::read_to_string(path)?
            }
            None => String::new(),
        };

        let options = RenderOptions { pre_color, theme };
        let html = markdown_to_html(&markdown, &css, &options)?;

        match &self.output {
            Some(path) => {
                std::fs::write(path, &html)?;
                output.success(&format!(
                    "Rendered {} to {}",
                    self.input.display(),
                    path.display()
                ));
            }
            None => {
                // Fragment goes to stdout; status and logs stay on stderr
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(html.as_bytes())?;
                stdout.write_all(b"\n")?;
            }
        }

        Ok(())
    }

    /// Resolve the theme from --theme or config, validating the name.
    fn resolve_theme(&self, config: &Config) -> Result<Option<Theme>, CliError> {
        match &self.theme {
            Some(name) => {
                let theme = Theme::parse(name).ok_or_else(|| {
                    CliError::Validation(format!(
                        "--theme must be \"light\" or \"dark\", got \"{name}\""
                    ))
                })?;
                Ok(Some(theme))
            }
            None => Ok(config.theme()?),
        }
    }
}
