pub use colored::{Color, Colorize};

#[derive(Debug, Clone, Copy, Default)]
pub struct ColorScheme {
    pub foreground: Option<Color>,
    pub bold: bool,
    pub underline: bool,
}

impl ColorScheme {
    const fn fg(color: Color) -> Self {
        Self {
            foreground: Some(color),
            bold: false,
            underline: false,
        }
    }

    const fn bold(color: Color) -> Self {
        Self {
            foreground: Some(color),
            bold: true,
            underline: false,
        }
    }

    pub fn apply(&self, text: &str) -> colored::ColoredString {
        let mut colored_text: colored::ColoredString = text.into();

        if let Some(fg) = self.foreground {
            colored_text = colored_text.color(fg);
        }
        if self.bold {
            colored_text = colored_text.bold();
        }
        if self.underline {
            colored_text = colored_text.underline();
        }

        colored_text
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub header: ColorScheme,
    pub success: ColorScheme,
    pub failure: ColorScheme,
    pub warning: ColorScheme,
    pub path: ColorScheme,
    pub diff_added: ColorScheme,
    pub diff_removed: ColorScheme,
    pub muted: ColorScheme,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            header: ColorScheme::bold(Color::Blue),
            success: ColorScheme::bold(Color::Green),
            failure: ColorScheme::bold(Color::Red),
            warning: ColorScheme::fg(Color::Yellow),
            path: ColorScheme::fg(Color::Cyan),
            diff_added: ColorScheme::fg(Color::Green),
            diff_removed: ColorScheme::fg(Color::Red),
            muted: ColorScheme::fg(Color::BrightBlack),
        }
    }
}

impl Theme {
    pub fn monochrome() -> Self {
        let plain = ColorScheme::default();
        let strong = ColorScheme {
            foreground: None,
            bold: true,
            underline: false,
        };
        Self {
            header: ColorScheme {
                underline: true,
                ..strong
            },
            success: strong,
            failure: strong,
            warning: plain,
            path: plain,
            diff_added: plain,
            diff_removed: plain,
            muted: plain,
        }
    }

    pub fn for_display(color_output: bool) -> Self {
        if color_output {
            Self::default()
        } else {
            Self::monochrome()
        }
    }

    /// Color one line of a unified diff by its leading sign.
    pub fn diff_line(&self, line: &str) -> colored::ColoredString {
        if line.starts_with('+') {
            self.diff_added.apply(line)
        } else if line.starts_with('-') {
            self.diff_removed.apply(line)
        } else {
            self.muted.apply(line)
        }
    }
}
