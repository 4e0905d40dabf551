//! Diff subcommand for primepass-settings
//!
//! Resolves both profiles against the same bindings and lists the keys
//! whose values differ.

use clap::Args;

/// Arguments for the diff subcommand
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Output format: text (default), json, or summary
    #[arg(short, long, default_value = "text", value_name = "FORMAT")]
    pub format: DiffFormat,

    /// Only show changes for specific sections (comma-separated)
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    pub sections: Option<Vec<String>>,

    /// Print secrets instead of masking them
    #[arg(long)]
    pub reveal: bool,
}

/// Output format for diff results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiffFormat {
    #[default]
    Text,
    Json,
    Summary,
}

impl std::str::FromStr for DiffFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(DiffFormat::Text),
            "json" => Ok(DiffFormat::Json),
            "summary" => Ok(DiffFormat::Summary),
            _ => Err(format!(
                "Invalid format '{}'. Valid options: text, json, summary",
                s
            )),
        }
    }
}

impl std::fmt::Display for DiffFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiffFormat::Text => write!(f, "text"),
            DiffFormat::Json => write!(f, "json"),
            DiffFormat::Summary => write!(f, "summary"),
        }
    }
}

impl DiffArgs {
    /// Check if a section passes the --sections filter
    pub fn should_include_section(&self, section: &str) -> bool {
        match &self.sections {
            Some(sections) => sections.iter().any(|s| s == section),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_format_parse() {
        assert_eq!("text".parse::<DiffFormat>().unwrap(), DiffFormat::Text);
        assert_eq!("json".parse::<DiffFormat>().unwrap(), DiffFormat::Json);
        assert_eq!("summary".parse::<DiffFormat>().unwrap(), DiffFormat::Summary);
        assert_eq!("JSON".parse::<DiffFormat>().unwrap(), DiffFormat::Json);
        assert!("invalid".parse::<DiffFormat>().is_err());
    }

    #[test]
    fn test_diff_args_section_filter() {
        let args = DiffArgs {
            format: DiffFormat::Text,
            sections: Some(vec!["core".to_string(), "cors".to_string()]),
            reveal: false,
        };

        assert!(args.should_include_section("core"));
        assert!(args.should_include_section("cors"));
        assert!(!args.should_include_section("cache"));
    }

    #[test]
    fn test_diff_args_no_filter() {
        let args = DiffArgs {
            format: DiffFormat::Summary,
            sections: None,
            reveal: false,
        };

        assert!(args.should_include_section("core"));
        assert!(args.should_include_section("logging"));
    }
}
