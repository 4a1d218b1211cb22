//! Terminal rendering of batch reports.

use crate::headless::HeadSnapshot;
use lazyload::{BatchReport, Element, EntryReport, Outcome};
use std::io::IsTerminal;

/// Check if color output is enabled.
pub fn color_enabled() -> bool {
    if std::env::var("NO_COLOR").is_ok() || std::env::var("LAZYLOAD_NO_COLOR").is_ok() {
        return false;
    }
    std::io::stderr().is_terminal()
}

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Colored string builder.
pub struct Styled {
    use_color: bool,
}

impl Default for Styled {
    fn default() -> Self {
        Self::new()
    }
}

impl Styled {
    pub fn new() -> Self {
        Self {
            use_color: color_enabled(),
        }
    }

    pub fn plain() -> Self {
        Self { use_color: false }
    }

    pub fn ok_sym(&self) -> &str {
        if self.use_color {
            "\x1b[32m\u{2713}\x1b[0m"
        } else {
            "OK"
        }
    }

    pub fn fail_sym(&self) -> &str {
        if self.use_color {
            "\x1b[31m\u{2717}\x1b[0m"
        } else {
            "!!"
        }
    }

    /// Neutral marker for entries that were skipped.
    pub fn skip_sym(&self) -> &str {
        if self.use_color {
            "\x1b[34m\u{25cb}\x1b[0m"
        } else {
            "--"
        }
    }

    fn paint(&self, code: &str, s: &str) -> String {
        if self.use_color {
            format!("{code}{s}{RESET}")
        } else {
            s.to_string()
        }
    }

    pub fn green(&self, s: &str) -> String {
        self.paint(GREEN, s)
    }

    pub fn red(&self, s: &str) -> String {
        self.paint(RED, s)
    }

    pub fn dim(&self, s: &str) -> String {
        self.paint(DIM, s)
    }

    pub fn bold(&self, s: &str) -> String {
        self.paint(BOLD, s)
    }
}

pub fn print_header(s: &Styled) {
    eprintln!(
        "  {} {}",
        s.bold("lazyload"),
        s.dim(&format!("v{}", env!("CARGO_PKG_VERSION")))
    );
    eprintln!();
}

pub fn print_section(s: &Styled, title: &str) {
    eprintln!("  {}", s.bold(title));
}

pub fn print_check(symbol: &str, label: &str, value: &str) {
    eprintln!("    {symbol} {label:<24} {value}");
}

pub fn print_detail(msg: &str) {
    eprintln!("                               {msg}");
}

pub fn print_status(s: &Styled, status: &str, msg: &str) {
    eprintln!();
    eprintln!("  {}: {status} ({msg})", s.bold("Status"));
}

/// Check if --quiet mode is active.
pub fn is_quiet() -> bool {
    std::env::var("LAZYLOAD_QUIET").is_ok()
}

/// Check if --json mode is active.
pub fn is_json() -> bool {
    std::env::var("LAZYLOAD_JSON").is_ok()
}

/// Print JSON output to stdout.
pub fn print_json(value: &serde_json::Value) {
    if let Ok(s) = serde_json::to_string_pretty(value) {
        println!("{s}");
    }
}

/// One-line summary of how an entry settled.
pub fn describe(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Loaded { address } => format!("loaded {address}"),
        Outcome::AlreadyRequested { path } => format!("already requested {path}"),
        Outcome::Dropped { errors } => match errors.len() {
            1 => "dropped (1 error)".to_string(),
            n => format!("dropped ({n} errors)"),
        },
        Outcome::Empty => "empty request".to_string(),
    }
}

fn symbol<'a>(s: &'a Styled, outcome: &Outcome) -> &'a str {
    match outcome {
        Outcome::Loaded { .. } => s.ok_sym(),
        Outcome::Dropped { .. } => s.fail_sym(),
        Outcome::AlreadyRequested { .. } | Outcome::Empty => s.skip_sym(),
    }
}

fn print_entry(s: &Styled, entry: &EntryReport) {
    print_check(symbol(s, &entry.outcome), &entry.request, &describe(&entry.outcome));
    if let Outcome::Dropped { errors } = &entry.outcome {
        for error in errors {
            print_detail(&s.red(&error.to_string()));
        }
    }
    if entry.links.len() > 1 {
        for link in &entry.links {
            print_detail(&s.dim(&format!("{} -> {}", link.link, describe(&link.outcome))));
        }
    }
}

pub fn render_element(element: &Element) -> String {
    match element {
        Element::Script { src, script_type } => {
            format!("<script type=\"{script_type}\" src=\"{src}\"></script>")
        }
        Element::Link { href, rel } => format!("<link rel=\"{rel}\" href=\"{href}\">"),
        Element::Style { id } => format!("<style id=\"{id}\"></style>"),
    }
}

/// Human-readable report on stderr.
pub fn print_report(s: &Styled, report: &BatchReport, head: &HeadSnapshot) {
    print_header(s);
    print_section(s, "Requests");
    for entry in &report.entries {
        print_entry(s, entry);
    }

    if !head.elements.is_empty() {
        eprintln!();
        print_section(s, "Head");
        for element in &head.elements {
            eprintln!("    {}", s.dim(&render_element(element)));
        }
    }
    for (id, css) in &head.styles {
        eprintln!();
        print_section(s, &format!("Style #{id}"));
        for line in css.lines() {
            eprintln!("    {line}");
        }
    }

    let total = report.entries.len();
    let satisfied = total - report.dropped().count();
    let status = if report.all_satisfied() {
        s.green("ready")
    } else {
        s.red("incomplete")
    };
    print_status(
        s,
        &status,
        &format!("{satisfied}/{total} satisfied in {} ms", report.elapsed_ms),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazyload::{LoadError, TransportCause};

    #[test]
    fn test_plain_symbols() {
        let s = Styled::plain();
        assert_eq!(s.ok_sym(), "OK");
        assert_eq!(s.fail_sym(), "!!");
        assert_eq!(s.red("x"), "x");
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            describe(&Outcome::Loaded {
                address: "a.js".into()
            }),
            "loaded a.js"
        );
        let dropped = Outcome::Dropped {
            errors: vec![
                LoadError::UnsupportedType("csv".into()),
                LoadError::Transport {
                    path: "b.js".into(),
                    cause: TransportCause::ErrorEvent,
                },
            ],
        };
        assert_eq!(describe(&dropped), "dropped (2 errors)");
    }

    #[test]
    fn test_render_element() {
        let el = Element::Script {
            src: "a.js".into(),
            script_type: "text/javascript".into(),
        };
        assert_eq!(
            render_element(&el),
            "<script type=\"text/javascript\" src=\"a.js\"></script>"
        );
    }
}
