use is_terminal::IsTerminal;

/// When to color terminal output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Color when stdout is a terminal and NO_COLOR is unset
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    pub fn use_colors(self) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => should_use_colors(),
        }
    }
}

pub fn should_use_colors() -> bool {
    std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal()
}

/// ANSI color codes for logfmt and text output
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub key: &'static str,         // Cyan for field names
    pub equals: &'static str,      // White for = separator
    pub string: &'static str,      // Green for quoted strings
    pub timestamp: &'static str,   // Blue for timestamp fields
    pub application: &'static str, // Magenta for application names
    pub level_error: &'static str, // Red for error/fatal levels
    pub level_warn: &'static str,  // Yellow for warn levels
    pub level_info: &'static str,  // White for info levels
    pub level_debug: &'static str, // Gray for debug levels
    pub level_trace: &'static str, // Dim for trace levels
    pub reset: &'static str,       // Reset to default color
}

impl ColorScheme {
    pub fn new(use_colors: bool) -> Self {
        if use_colors {
            Self {
                key: "\x1b[36m",
                equals: "\x1b[37m",
                string: "\x1b[32m",
                timestamp: "\x1b[34m",
                application: "\x1b[35m",
                level_error: "\x1b[31m",
                level_warn: "\x1b[33m",
                level_info: "\x1b[37m",
                level_debug: "\x1b[90m",
                level_trace: "\x1b[2m",
                reset: "\x1b[0m",
            }
        } else {
            // All empty strings for no-color mode
            Self {
                key: "",
                equals: "",
                string: "",
                timestamp: "",
                application: "",
                level_error: "",
                level_warn: "",
                level_info: "",
                level_debug: "",
                level_trace: "",
                reset: "",
            }
        }
    }

    /// Color for a level value, empty for unknown levels
    pub fn level_color(&self, level: &str) -> &'static str {
        match level.to_lowercase().as_str() {
            "error" | "err" | "fatal" | "panic" | "crit" | "critical" => self.level_error,
            "warn" | "warning" => self.level_warn,
            "info" | "notice" => self.level_info,
            "debug" => self.level_debug,
            "trace" => self.level_trace,
            _ => "",
        }
    }

    /// Wrap `text` in `color` and a reset, or return it unchanged when uncolored
    pub fn paint(&self, color: &str, text: &str) -> String {
        if color.is_empty() {
            text.to_string()
        } else {
            format!("{}{}{}", color, text, self.reset)
        }
    }
}
