use colored::*;
use dyncodec_core::{TypeRegistry, client::DialError};

/// A wrapper struct for a formatted, colored string.
///
/// Implements `Display` so it can be printed directly.
pub struct FormattedString(pub String);

/// The files and aliases a codec was built from.
pub struct RegistrySummary<'a>(pub &'a TypeRegistry);

/// Raw message bytes, rendered as lowercase hex.
pub struct Hex<'a>(pub &'a [u8]);

impl std::fmt::Display for FormattedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}", self.0)?;
        Ok(())
    }
}

impl From<serde_json::Value> for FormattedString {
    fn from(value: serde_json::Value) -> Self {
        FormattedString(serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()))
    }
}

impl From<DialError> for FormattedString {
    fn from(err: DialError) -> Self {
        let title = match err {
            DialError::InvalidUrl(..) | DialError::ConnectionFailed(..) => "Connection Error:",
            DialError::Cancelled(_) => "Cancelled:",
            DialError::Build(_) => "Codec Build Failed:",
        };
        FormattedString(format!("{}\n\n'{}'", title.red().bold(), err))
    }
}

impl From<anyhow::Error> for FormattedString {
    fn from(err: anyhow::Error) -> Self {
        FormattedString(format!("{}\n\n'{:#}'", "Error:".red().bold(), err))
    }
}

impl From<Hex<'_>> for FormattedString {
    fn from(Hex(bytes): Hex<'_>) -> Self {
        FormattedString(hex::encode(bytes))
    }
}

impl From<RegistrySummary<'_>> for FormattedString {
    fn from(RegistrySummary(registry): RegistrySummary<'_>) -> Self {
        let mut out = String::new();

        out.push_str(&format!("{}\n", "Registered Files:".cyan()));
        for (i, path) in registry.registration_order().iter().enumerate() {
            out.push_str(&format!("  {:>3}. {}\n", i + 1, path.green()));
        }

        let mut urls = registry.type_urls().peekable();
        if urls.peek().is_none() {
            out.push_str(&format!("\n{}", "No type URLs registered.".yellow()));
        } else {
            out.push_str(&format!("\n{}\n", "Type URLs:".cyan()));
            for (url, name) in urls {
                out.push_str(&format!("  {} -> {}\n", url.green(), name.yellow()));
            }
        }

        FormattedString(out.trim_end().to_string())
    }
}
