//! Formatting and output helpers.
//!
//! We try to handle both textual output and interactive output (output to a
//! "TTY"). In the case of interactive output, we render with prettier non-ASCII
//! characters and with colors, using shell-specific escape codes.

use cursive_core::theme::{BaseColor, Color, ColorType, Effect, Style};
use cursive_core::utils::markup::StyledString;
use cursive_core::utils::span::Span;

/// Pluralize a quantity, as appropriate. Example:
///
/// ```
/// # use tracking::core::formatting::Pluralize;
/// let p = Pluralize {
///     determiner: None,
///     amount: 1,
///     unit: ("commit", "commits"),
/// };
/// assert_eq!(p.to_string(), "1 commit");
///
/// let p = Pluralize {
///     determiner: Some(("this", "these")),
///     amount: 2,
///     unit: ("commit", "commits"),
/// };
/// assert_eq!(p.to_string(), "these 2 commits");
/// ```
pub struct Pluralize<'a> {
    /// The string to render before the amount if the amount is singular vs
    /// plural.
    pub determiner: Option<(&'a str, &'a str)>,

    /// The amount of the quantity.
    pub amount: usize,

    /// The string to render after the amount if the amount is singular vs
    /// plural.
    pub unit: (&'a str, &'a str),
}

impl std::fmt::Display for Pluralize<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.amount, self.determiner) {
            (1, Some((singular_determiner, _))) => {
                write!(f, "{} {} {}", singular_determiner, self.amount, self.unit.0)
            }
            (_, Some((_, plural_determiner))) => {
                write!(f, "{} {} {}", plural_determiner, self.amount, self.unit.1)
            }
            (1, None) => write!(f, "{} {}", self.amount, self.unit.0),
            (_, None) => write!(f, "{} {}", self.amount, self.unit.1),
        }
    }
}

/// Glyphs to use for rendering branch reports.
#[derive(Clone, Debug)]
pub struct Glyphs {
    /// Whether or not ANSI escape codes should be emitted (e.g. to render
    /// color).
    pub should_write_ansi_escape_codes: bool,

    /// Marker for the currently checked-out branch.
    pub current_branch: &'static str,

    /// Marker for any branch which is not checked out.
    pub other_branch: &'static str,

    /// Indicates commits the local branch has which the remote branch lacks.
    pub ahead: &'static str,

    /// Indicates commits the remote branch has which the local branch lacks.
    pub behind: &'static str,
}

impl Glyphs {
    /// Make the `Glyphs` object appropriate for `stdout`.
    pub fn detect() -> Self {
        if console::user_attended() {
            Glyphs::pretty()
        } else {
            Glyphs::text()
        }
    }

    /// Glyphs used for output to a text file or non-TTY.
    pub fn text() -> Self {
        Glyphs {
            should_write_ansi_escape_codes: false,
            current_branch: "*",
            other_branch: " ",
            ahead: "+",
            behind: "-",
        }
    }

    /// Glyphs used for output to a TTY.
    pub fn pretty() -> Self {
        Glyphs {
            should_write_ansi_escape_codes: true,
            current_branch: "●",
            other_branch: " ",
            ahead: "↑",
            behind: "↓",
        }
    }

    /// Write the provided string to `out`, using ANSI escape codes as necessary to
    /// style it.
    pub fn render(&self, string: StyledString) -> eyre::Result<String> {
        let result = string
            .spans()
            .map(|span| {
                let Span {
                    content,
                    attr,
                    width: _,
                } = span;
                if self.should_write_ansi_escape_codes {
                    render_style_as_ansi(content, *attr)
                } else {
                    Ok(content.to_string())
                }
            })
            .collect::<eyre::Result<String>>()?;
        Ok(result)
    }
}

/// Helper to build `StyledString`s by combining multiple strings (both styled
/// and unstyled).
#[derive(Debug, Default)]
pub struct StyledStringBuilder {
    elements: Vec<StyledString>,
}

impl StyledStringBuilder {
    /// Constructor.
    pub fn new() -> Self {
        Default::default()
    }

    fn append_plain_inner(mut self, text: &str) -> Self {
        self.elements.push(StyledString::plain(text));
        self
    }

    /// Append a plain-text string to the internal buffer.
    pub fn append_plain(self, text: impl AsRef<str>) -> Self {
        self.append_plain_inner(text.as_ref())
    }

    /// Style the provided `text` using `style`, then append it to the internal
    /// buffer.
    pub fn append_styled(mut self, text: impl AsRef<str>, style: impl Into<Style>) -> Self {
        self.elements
            .push(StyledString::styled(text.as_ref(), style));
        self
    }

    /// Directly append the provided `StyledString` to the internal buffer.
    pub fn append(mut self, text: impl Into<StyledString>) -> Self {
        self.elements.push(text.into());
        self
    }

    /// Create a new `StyledString` using all the components in the internal
    /// buffer.
    pub fn build(self) -> StyledString {
        let mut result = StyledString::new();
        for element in self.elements {
            result.append(element);
        }
        result
    }
}

fn render_style_as_ansi(content: &str, style: Style) -> eyre::Result<String> {
    let Style { effects, color } = style;
    let output = {
        use console::style;
        let output = style(content.to_string()).force_styling(true);
        match color.front {
            ColorType::Palette(_) => {
                eyre::bail!("Not implemented: using cursive palette colors")
            }
            ColorType::Color(Color::Rgb(..)) | ColorType::Color(Color::RgbLowRes(..)) => {
                eyre::bail!("Not implemented: using raw RGB colors")
            }
            ColorType::InheritParent | ColorType::Color(Color::TerminalDefault) => output,
            ColorType::Color(Color::Dark(color)) => match color {
                BaseColor::Black => output.black(),
                BaseColor::Red => output.red(),
                BaseColor::Green => output.green(),
                BaseColor::Yellow => output.yellow(),
                BaseColor::Blue => output.blue(),
                BaseColor::Magenta => output.magenta(),
                BaseColor::Cyan => output.cyan(),
                BaseColor::White => output.white(),
            },
            ColorType::Color(Color::Light(color)) => match color {
                BaseColor::Black => output.black().bright(),
                BaseColor::Red => output.red().bright(),
                BaseColor::Green => output.green().bright(),
                BaseColor::Yellow => output.yellow().bright(),
                BaseColor::Blue => output.blue().bright(),
                BaseColor::Magenta => output.magenta().bright(),
                BaseColor::Cyan => output.cyan().bright(),
                BaseColor::White => output.white().bright(),
            },
        }
    };

    let output = effects
        .iter()
        .try_fold(output, |output, effect| -> eyre::Result<_> {
            Ok(match effect {
                Effect::Simple => output,
                Effect::Dim => output.dim(),
                Effect::Reverse => output.reverse(),
                Effect::Bold => output.bold(),
                Effect::Italic => output.italic(),
                Effect::Underline => output.underlined(),
                Effect::Blink => output.blink(),
                Effect::Strikethrough => eyre::bail!("Not implemented: Effect::Strikethrough"),
            })
        })?;
    Ok(output.to_string())
}
