use colored::Colorize;

pub struct Theme {
    pub title: fn(&str) -> String,
    pub line: fn(&str) -> String,
    pub class: fn(&str) -> String,
    pub key: fn(&str) -> String,
    pub count: fn(&str) -> String,
    pub ok: fn(&str) -> String,
    pub error: fn(&str) -> String,
    pub dim: fn(&str) -> String,
}

impl Theme {
    pub fn from_name(name: &str) -> Self {
        match name {
            "plain" | "" => Self::plain(),
            "vivid" => Self::vivid(),
            "mono" => Self::mono(),
            _ => {
                eprintln!("{}", format!("✘ Unknown theme: {}", name).red());
                Self::plain()
            }
        }
    }

    fn plain() -> Self {
        Self {
            title: |s| s.green().bold().to_string(),
            line: |s| s.bright_black().dimmed().to_string(),
            class: |s| s.cyan().to_string(),
            key: |s| s.bright_white().to_string(),
            count: |s| s.yellow().to_string(),
            ok: |s| s.green().to_string(),
            error: |s| s.red().to_string(),
            dim: |s| s.bright_black().to_string(),
        }
    }

    fn vivid() -> Self {
        Self {
            title: |s| s.bright_magenta().italic().bold().underline().to_string(),
            line: |s| s.bright_black().dimmed().to_string(),
            class: |s| s.bright_cyan().bold().to_string(),
            key: |s| s.bright_white().bold().to_string(),
            count: |s| s.bright_yellow().to_string(),
            ok: |s| s.bright_green().to_string(),
            error: |s| s.bright_red().bold().to_string(),
            dim: |s| s.bright_black().italic().to_string(),
        }
    }

    fn mono() -> Self {
        Self {
            title: |s| s.bold().to_string(),
            line: |s| s.dimmed().to_string(),
            class: |s| s.normal().to_string(),
            key: |s| s.normal().to_string(),
            count: |s| s.bold().to_string(),
            ok: |s| s.normal().to_string(),
            error: |s| s.bold().underline().to_string(),
            dim: |s| s.dimmed().to_string(),
        }
    }
}
