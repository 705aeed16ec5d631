//! Presentación de diagnósticos.
//!
//! Cada fase reporta sus errores como `Located<E>`, donde `E` es el
//! tipo de error propio de la fase. [`Diagnostics`] reúne cualquier
//! cantidad de ellos y los despliega junto a la línea de código fuente
//! en donde ocurrieron.

use crate::source::{Located, Location};
use std::{
    error::Error,
    fmt::{self, Display},
};

/// Gravedad de un grupo de diagnósticos.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Un mensaje ya formateado junto a su ubicación.
#[derive(Debug, Clone)]
pub struct Entry {
    message: String,
    location: Location,
}

impl Entry {
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn location(&self) -> &Location {
        &self.location
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostics {
    kind: &'static str,
    severity: Severity,
    entries: Vec<Entry>,
}

impl Diagnostics {
    /// Cambia la etiqueta con la que se anteceden los mensajes.
    pub fn kind(self, kind: &'static str) -> Self {
        Diagnostics { kind, ..self }
    }

    /// Marca a todo el grupo como advertencias.
    pub fn warnings(self) -> Self {
        Diagnostics {
            kind: "warning",
            severity: Severity::Warning,
            ..self
        }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mensajes sin ubicación, en el orden en que fueron reportados.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(Entry::message)
    }

    fn entry<E: Error>(error: &Located<E>) -> Entry {
        Entry {
            message: error.as_ref().to_string(),
            location: error.location().clone(),
        }
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Diagnostics {
            kind: "error",
            severity: Severity::Error,
            entries: Default::default(),
        }
    }
}

impl<E: Error> From<Located<E>> for Diagnostics {
    fn from(error: Located<E>) -> Self {
        Diagnostics {
            entries: vec![Diagnostics::entry(&error)],
            ..Default::default()
        }
    }
}

impl<E: Error> From<&[Located<E>]> for Diagnostics {
    fn from(errors: &[Located<E>]) -> Self {
        Diagnostics {
            entries: errors.iter().map(Diagnostics::entry).collect(),
            ..Default::default()
        }
    }
}

impl<E: Error> From<Vec<Located<E>>> for Diagnostics {
    fn from(errors: Vec<Located<E>>) -> Self {
        Diagnostics::from(errors.as_slice())
    }
}

impl Error for Diagnostics {}

impl Display for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Diagnostics {
            kind,
            severity,
            entries,
        } = self;

        if entries.is_empty() {
            return match severity {
                Severity::Error => writeln!(fmt, "No errors were reported"),
                Severity::Warning => writeln!(fmt, "No warnings were reported"),
            };
        }

        for Entry { message, location } in entries {
            writeln!(fmt, "{}: {}", kind, message)?;
            writeln!(fmt, " --> {}", location)?;

            let (first, last) = (location.start().line(), location.end().line());
            let digits = last.to_string().chars().count();
            writeln!(fmt, "{:digits$} |", "", digits = digits)?;

            for line_number in first..=last {
                location.source().with_line(line_number, |line| {
                    writeln!(fmt, "{:>digits$} | {}", line_number, line, digits = digits)
                })?
            }

            // El final del rango es exclusivo; un rango vacío resalta una sola columna
            let from = location.start().column();
            let to = location.end().column().saturating_sub(1).max(1);
            let (min, max) = (from.min(to), from.max(to));

            writeln!(
                fmt,
                "{:digits$} | {:skip$}{:^<highlight$}",
                "",
                "",
                "",
                digits = digits,
                skip = (min - 1) as usize,
                highlight = (max - min + 1) as usize
            )?;

            writeln!(fmt)?;
        }

        let count = entries.len();
        let plural = if count == 1 { "" } else { "s" };
        match severity {
            Severity::Error => writeln!(fmt, "Build failed with {} error{}", count, plural),
            Severity::Warning => writeln!(fmt, "{} warning{} emitted", count, plural),
        }
    }
}
